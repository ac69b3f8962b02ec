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

//! Per-type component containers
//!
//! `ComponentContainer<T>` is a sparse set keyed by entity index:
//! `sparse[index]` points into the packed `dense` values, so lookups are O(1)
//! and iteration walks contiguous memory. `ErasedContainer` is the
//! non-generic surface the entity manager keeps in one array.

use std::any::Any;

use crate::component::{Component, ComponentId};
use crate::error::{EcsError, Result};

/// Marks an unused sparse slot
const EMPTY: u32 = u32::MAX;

/// Sparse storage for one component type
#[derive(Clone)]
pub struct ComponentContainer<T: Component> {
    component_id: ComponentId,
    sparse: Vec<u32>,
    dense: Vec<T>,
    indices: Vec<u32>,
}

impl<T: Component> ComponentContainer<T> {
    pub fn new(component_id: ComponentId) -> Self {
        Self {
            component_id,
            sparse: Vec::new(),
            dense: Vec::new(),
            indices: Vec::new(),
        }
    }

    #[inline]
    fn slot(&self, index: u32) -> Option<usize> {
        match self.sparse.get(index as usize) {
            Some(&slot) if slot != EMPTY => Some(slot as usize),
            _ => None,
        }
    }

    /// Insert or replace the value for `index`.
    pub fn insert(&mut self, index: u32, value: T) {
        if let Some(slot) = self.slot(index) {
            self.dense[slot] = value;
            return;
        }

        let idx = index as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, EMPTY);
        }
        self.sparse[idx] = self.dense.len() as u32;
        self.dense.push(value);
        self.indices.push(index);
    }

    /// Remove and return the value for `index`.
    ///
    /// Swap-remove: the last packed value takes the freed slot.
    pub fn take(&mut self, index: u32) -> Option<T> {
        let slot = self.slot(index)?;
        let value = self.dense.swap_remove(slot);
        self.indices.swap_remove(slot);

        if slot < self.indices.len() {
            let moved = self.indices[slot];
            self.sparse[moved as usize] = slot as u32;
        }
        self.sparse[index as usize] = EMPTY;
        Some(value)
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.slot(index).map(|slot| &self.dense[slot])
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slot(index).map(move |slot| &mut self.dense[slot])
    }

    pub fn contains(&self, index: u32) -> bool {
        self.slot(index).is_some()
    }

    /// Iterate `(entity_index, &T)` in packed order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.indices.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.indices.iter().copied().zip(self.dense.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    fn downcast_target<'a>(
        &self,
        target: &'a mut dyn ErasedContainer,
    ) -> Result<&'a mut ComponentContainer<T>> {
        if target.component_id() != self.component_id {
            return Err(EcsError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: target.type_name(),
            });
        }
        let found = target.type_name();
        target
            .as_any_mut()
            .downcast_mut::<ComponentContainer<T>>()
            .ok_or(EcsError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })
    }
}

/// Type-erased container interface
///
/// Lets heterogeneous containers live in one array and be cloned, duplicated
/// or drained without knowing `T`. Every cross-container operation checks the
/// component ID tag before downcasting.
pub trait ErasedContainer: Any + Send + Sync {
    fn component_id(&self) -> ComponentId;

    /// Name of the stored component type
    fn type_name(&self) -> &'static str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_entity(&self, index: u32) -> bool;

    /// Copy the value at `from` into slot `to`. Returns false if `from` is empty.
    fn duplicate(&mut self, from: u32, to: u32) -> bool;

    /// Erase the entry for `index`. Returns false if there was none.
    fn remove_entity(&mut self, index: u32) -> bool;

    /// New, empty container tagged with the same component ID.
    fn clone_empty(&self) -> Box<dyn ErasedContainer>;

    /// Copy the value for `index` into `target`, which must hold the same
    /// component type.
    fn clone_to(&self, target: &mut dyn ErasedContainer, index: u32) -> Result<()>;

    /// Move the value for `index` into `target`, leaving this slot empty.
    fn transfer_to(&mut self, target: &mut dyn ErasedContainer, index: u32) -> Result<()>;

    /// Entity indices currently holding a value, in packed order.
    fn entity_indices(&self) -> Vec<u32>;

    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedContainer for ComponentContainer<T> {
    fn component_id(&self) -> ComponentId {
        self.component_id
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn has_entity(&self, index: u32) -> bool {
        self.contains(index)
    }

    fn duplicate(&mut self, from: u32, to: u32) -> bool {
        match self.get(from).cloned() {
            Some(value) => {
                self.insert(to, value);
                true
            }
            None => false,
        }
    }

    fn remove_entity(&mut self, index: u32) -> bool {
        self.take(index).is_some()
    }

    fn clone_empty(&self) -> Box<dyn ErasedContainer> {
        Box::new(ComponentContainer::<T>::new(self.component_id))
    }

    fn clone_to(&self, target: &mut dyn ErasedContainer, index: u32) -> Result<()> {
        let value = self
            .get(index)
            .ok_or(EcsError::ComponentMissing(std::any::type_name::<T>()))?;
        let target = self.downcast_target(target)?;
        target.insert(index, value.clone());
        Ok(())
    }

    fn transfer_to(&mut self, target: &mut dyn ErasedContainer, index: u32) -> Result<()> {
        // Validate before taking so a mismatch leaves the value in place.
        let target = self.downcast_target(target)?;
        let value = self
            .take(index)
            .ok_or(EcsError::ComponentMissing(std::any::type_name::<T>()))?;
        target.insert(index, value);
        Ok(())
    }

    fn entity_indices(&self) -> Vec<u32> {
        self.indices.clone()
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.indices.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
