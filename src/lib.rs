// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scene ECS - bitmask-filtered Entity Component System
//!
//! Entities carry components in per-type sparse containers; systems own the
//! entities whose component mask fits their requirements. Removed entities
//! keep their components in delete buffers until restored, and whole scenes
//! can be cloned.

pub mod bitmask;
pub mod command;
pub mod component;
pub mod config;
pub mod container;
pub mod debug;
pub mod draw;
pub mod entity;
pub mod entity_manager;
pub mod entity_view;
pub mod error;
pub mod message;
pub mod prelude;
#[cfg(feature = "profiling")]
pub mod profiling;
pub mod scene;
pub mod system;
pub mod system_manager;

#[cfg(test)]
mod tests;

pub use bitmask::*;
pub use command::*;
pub use component::*;
pub use config::*;
pub use container::*;
pub use debug::*;
pub use draw::*;
pub use entity::*;
pub use entity_manager::*;
pub use entity_view::*;
pub use error::*;
pub use message::*;
pub use scene::*;
pub use system::*;
pub use system_manager::*;
