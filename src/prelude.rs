//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use scene_ecs::prelude::*;
//! ```

pub use crate::bitmask::Bitmask;
pub use crate::command::CommandBuffer;
pub use crate::component::{Component, ComponentId, ComponentManager, SharedComponentManager};
pub use crate::config::SceneConfig;
pub use crate::debug::SceneInspector;
pub use crate::draw::{Drawable, RenderStates, RenderTarget};
pub use crate::entity::Entity;
pub use crate::entity_manager::EntityManager;
pub use crate::entity_view::{EntityMut, EntityRef};
pub use crate::error::{EcsError, Result};
pub use crate::message::Message;
pub use crate::scene::{Scene, SceneId};
pub use crate::system::{System, SystemBase, SystemContext};
pub use crate::system_manager::SystemManager;
pub use crate::system_base;
