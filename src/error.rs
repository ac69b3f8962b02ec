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

//! Error types

use std::fmt;

/// ECS error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// Entity index was never allocated by this manager
    EntityNotFound(u32),

    /// Operation attempted on the null entity handle
    NullEntity,

    /// Handle was issued before the manager was last cleared
    StaleEntity { index: u32, epoch: u32, current: u32 },

    /// Entity does not carry the requested component
    ComponentMissing(&'static str),

    /// Container kinds disagree (clone/restore between different component types)
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Bit position outside the mask width
    IndexOutOfRange { index: usize, width: usize },

    /// More distinct component kinds than the mask can address
    ComponentLimitReached(usize),

    /// Source and target entity managers use different component registries
    RegistryMismatch,

    /// System is bound to another scene
    SceneMismatch,

    /// No system of the requested type is registered
    SystemNotFound(&'static str),

    /// Deferred command failed
    CommandError(String),

    /// Invalid scene configuration
    ConfigError(String),
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::EntityNotFound(index) => write!(f, "Entity {index} not found"),
            EcsError::NullEntity => write!(f, "Null entity handle"),
            EcsError::StaleEntity {
                index,
                epoch,
                current,
            } => write!(
                f,
                "Stale entity {index}: handle epoch {epoch}, manager epoch {current}"
            ),
            EcsError::ComponentMissing(name) => write!(f, "Component not found: {name}"),
            EcsError::TypeMismatch { expected, found } => {
                write!(f, "Container type mismatch: expected {expected}, found {found}")
            }
            EcsError::IndexOutOfRange { index, width } => {
                write!(f, "Bit {index} out of range for {width}-bit mask")
            }
            EcsError::ComponentLimitReached(limit) => {
                write!(f, "Component limit reached ({limit} kinds)")
            }
            EcsError::RegistryMismatch => {
                write!(f, "Entity managers do not share a component registry")
            }
            EcsError::SceneMismatch => write!(f, "System is bound to a different scene"),
            EcsError::SystemNotFound(name) => write!(f, "System not found: {name}"),
            EcsError::CommandError(msg) => write!(f, "Command error: {msg}"),
            EcsError::ConfigError(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for EcsError {}

impl From<serde_json::Error> for EcsError {
    fn from(err: serde_json::Error) -> Self {
        EcsError::ConfigError(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
