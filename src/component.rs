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

//! Component trait and component ID registry
//!
//! Components are data attached to entities. Every component type gets a
//! stable numeric ID the first time it is requested; that ID is the bit
//! position in entity masks and the slot index of the type's container.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bitmask::MAX_COMPONENTS;
use crate::error::{EcsError, Result};

/// Marker trait for components
///
/// Components must be 'static and cloneable: duplication and scene cloning
/// copy values with the type's own `Clone`.
pub trait Component: 'static + Send + Sync + Clone {}

/// Automatically implement Component for all valid types
impl<T: 'static + Send + Sync + Clone> Component for T {}

/// Stable component type ID (bit position / container slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl ComponentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Registration {
    type_id: TypeId,
    type_name: &'static str,
}

/// Assigns component IDs in first-seen order.
///
/// IDs are never reused or renumbered while the manager lives.
#[derive(Debug, Clone, Default)]
pub struct ComponentManager {
    registry: Vec<Registration>,
}

/// Component manager shared between a scene, its entity manager and any
/// scene cloned from it, so all of them agree on IDs.
pub type SharedComponentManager = Arc<RwLock<ComponentManager>>;

impl ComponentManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedComponentManager {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Get the ID for `T`, allocating the next one on first sight.
    pub fn id<T: Component>(&mut self) -> Result<ComponentId> {
        self.id_by_type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Same as [`ComponentManager::id`] for an already-erased type token.
    pub fn id_by_type(&mut self, type_id: TypeId, type_name: &'static str) -> Result<ComponentId> {
        if let Some(id) = self.lookup_by_type(type_id) {
            return Ok(id);
        }

        if self.registry.len() >= MAX_COMPONENTS {
            return Err(EcsError::ComponentLimitReached(MAX_COMPONENTS));
        }

        self.registry.push(Registration { type_id, type_name });
        let id = ComponentId((self.registry.len() - 1) as u32);
        tracing::trace!(component = type_name, id = id.0, "registered component type");
        Ok(id)
    }

    /// Get the ID for `T` without allocating one.
    pub fn lookup<T: Component>(&self) -> Option<ComponentId> {
        self.lookup_by_type(TypeId::of::<T>())
    }

    /// Linear scan; the registry never exceeds [`MAX_COMPONENTS`] entries.
    pub fn lookup_by_type(&self, type_id: TypeId) -> Option<ComponentId> {
        self.registry
            .iter()
            .position(|reg| reg.type_id == type_id)
            .map(|pos| ComponentId(pos as u32))
    }

    pub fn type_name(&self, id: ComponentId) -> Option<&'static str> {
        self.registry.get(id.index()).map(|reg| reg.type_name)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
