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

//! Entity manager: entity allocation, component containers, soft delete and
//! restore, duplication and whole-manager cloning.

use std::sync::Arc;

use rustc_hash::FxHashMap;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::bitmask::Bitmask;
use crate::component::{Component, ComponentId, SharedComponentManager};
use crate::container::{ComponentContainer, ErasedContainer};
use crate::entity::Entity;
use crate::error::{EcsError, Result};

/// Live container for one component kind and its delete buffer.
///
/// Both are created together, so every live container always has a matching
/// (possibly empty) delete buffer.
struct ContainerSlot {
    live: Box<dyn ErasedContainer>,
    deleted: Box<dyn ErasedContainer>,
}

impl ContainerSlot {
    fn new<T: Component>(id: ComponentId) -> Self {
        let live: Box<dyn ErasedContainer> = Box::new(ComponentContainer::<T>::new(id));
        let deleted = live.clone_empty();
        Self { live, deleted }
    }

    fn empty_like(&self) -> Self {
        Self {
            live: self.live.clone_empty(),
            deleted: self.deleted.clone_empty(),
        }
    }
}

pub struct EntityManager {
    components: SharedComponentManager,

    /// Next entity index. Indices are never reused until `clear_self`.
    entity_counter: u32,

    /// Bumped by `clear_self` to invalidate outstanding handles
    epoch: u32,

    /// Indexed by component ID
    slots: Vec<Option<ContainerSlot>>,

    /// Indexed by entity index; always `entity_counter` long
    destroy_flags: Vec<bool>,

    /// Masks of entities that are not destroyed
    masks: FxHashMap<u32, Bitmask>,
}

impl EntityManager {
    pub fn new(components: SharedComponentManager) -> Self {
        Self::with_capacity(components, 0)
    }

    pub fn with_capacity(components: SharedComponentManager, capacity: usize) -> Self {
        Self {
            components,
            entity_counter: 0,
            epoch: 0,
            slots: Vec::new(),
            destroy_flags: Vec::with_capacity(capacity),
            masks: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    pub fn component_manager(&self) -> &SharedComponentManager {
        &self.components
    }

    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Allocate the next entity index.
    ///
    /// # Panics
    /// Panics if the index space is exhausted.
    pub fn create_entity(&mut self) -> Entity {
        if self.entity_counter == u32::MAX {
            panic!("Entity index exhaustion: {:#x} entities allocated", self.entity_counter);
        }

        let index = self.entity_counter;
        self.entity_counter += 1;
        self.destroy_flags.push(false);
        self.masks.insert(index, Bitmask::new());

        tracing::debug!(entity = index, "created entity");
        Entity::new(index, self.epoch)
    }

    /// Handle for an index issued by this manager in the current epoch.
    pub fn entity_at(&self, index: u32) -> Entity {
        Entity::new(index, self.epoch)
    }

    /// Check that `entity` was issued by this manager and is not stale.
    pub fn validate(&self, entity: Entity) -> Result<u32> {
        if entity.is_null() {
            return Err(EcsError::NullEntity);
        }
        if entity.epoch() != self.epoch {
            return Err(EcsError::StaleEntity {
                index: entity.index(),
                epoch: entity.epoch(),
                current: self.epoch,
            });
        }
        if entity.index() >= self.entity_counter {
            return Err(EcsError::EntityNotFound(entity.index()));
        }
        Ok(entity.index())
    }

    fn validate_live(&self, entity: Entity) -> Result<u32> {
        let index = self.validate(entity)?;
        if self.destroy_flags[index as usize] {
            return Err(EcsError::EntityNotFound(index));
        }
        Ok(index)
    }

    /// True if the handle is valid and the entity has not been removed.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.validate_live(entity).is_ok()
    }

    pub fn is_destroyed(&self, entity: Entity) -> bool {
        match self.validate(entity) {
            Ok(index) => self.destroy_flags[index as usize],
            Err(_) => false,
        }
    }

    /// Current mask of a live entity.
    pub fn component_mask(&self, entity: Entity) -> Option<Bitmask> {
        let index = self.validate_live(entity).ok()?;
        self.masks.get(&index).copied()
    }

    fn slot_mut<T: Component>(&mut self, id: ComponentId) -> &mut ContainerSlot {
        let idx = id.index();
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, || None);
        }
        self.slots[idx].get_or_insert_with(|| ContainerSlot::new::<T>(id))
    }

    /// Typed view of the live container for `T`.
    pub fn container<T: Component>(&self) -> Option<&ComponentContainer<T>> {
        let id = self.components.read().lookup::<T>()?;
        self.slots
            .get(id.index())?
            .as_ref()?
            .live
            .as_any()
            .downcast_ref::<ComponentContainer<T>>()
    }

    pub fn container_mut<T: Component>(&mut self) -> Option<&mut ComponentContainer<T>> {
        let id = self.components.read().lookup::<T>()?;
        self.slots
            .get_mut(id.index())?
            .as_mut()?
            .live
            .as_any_mut()
            .downcast_mut::<ComponentContainer<T>>()
    }

    /// Live containers in component ID order.
    pub fn containers(&self) -> impl Iterator<Item = &dyn ErasedContainer> {
        self.slots.iter().flatten().map(|slot| slot.live.as_ref())
    }

    /// Delete buffers in component ID order.
    pub fn deleted_containers(&self) -> impl Iterator<Item = &dyn ErasedContainer> {
        self.slots.iter().flatten().map(|slot| slot.deleted.as_ref())
    }

    /// Attach (or overwrite) a component and set its mask bit.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<ComponentId> {
        let index = self.validate_live(entity)?;
        let id = self.components.write().id::<T>()?;

        let slot = self.slot_mut::<T>(id);
        let found = slot.live.type_name();
        let container = slot
            .live
            .as_any_mut()
            .downcast_mut::<ComponentContainer<T>>()
            .ok_or(EcsError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found,
            })?;
        container.insert(index, component);

        self.masks.entry(index).or_default().turn_on_bit(id.index())?;
        Ok(id)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T> {
        let index = self.validate_live(entity)?;
        self.container::<T>()
            .and_then(|container| container.get(index))
            .ok_or(EcsError::ComponentMissing(std::any::type_name::<T>()))
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        let index = self.validate_live(entity)?;
        self.container_mut::<T>()
            .and_then(|container| container.get_mut(index))
            .ok_or(EcsError::ComponentMissing(std::any::type_name::<T>()))
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match self.validate_live(entity) {
            Ok(index) => self
                .container::<T>()
                .is_some_and(|container| container.contains(index)),
            Err(_) => false,
        }
    }

    /// Remove a component and clear its bit. Returns false if it was absent.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<bool> {
        let index = self.validate_live(entity)?;
        let Some(id) = self.components.read().lookup::<T>() else {
            return Ok(false);
        };

        let removed = match self.slots.get_mut(id.index()).and_then(Option::as_mut) {
            Some(slot) => slot.live.remove_entity(index),
            None => false,
        };
        if removed {
            if let Some(mask) = self.masks.get_mut(&index) {
                mask.clear_bit(id.index())?;
            }
        }
        Ok(removed)
    }

    /// Soft delete: move every component of `entity` into the delete buffers
    /// and flag it destroyed. Removing an already destroyed entity is a no-op.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<()> {
        let index = self.validate(entity)?;
        if self.destroy_flags[index as usize] {
            return Ok(());
        }

        let mask = self.masks.remove(&index).unwrap_or_default();
        for bit in mask.ones() {
            let Some(ContainerSlot { live, deleted }) =
                self.slots.get_mut(bit).and_then(Option::as_mut)
            else {
                continue;
            };
            if !live.has_entity(index) {
                continue;
            }
            if let Err(err) = live.transfer_to(&mut **deleted, index) {
                tracing::warn!(entity = index, component = live.type_name(), %err, "failed to stage component for delete; dropping it");
                live.remove_entity(index);
            }
        }

        self.destroy_flags[index as usize] = true;
        tracing::debug!(entity = index, components = mask.count(), "removed entity");
        Ok(())
    }

    /// Move every staged component of `entity` back into the live containers
    /// and clear its destroy flag.
    ///
    /// Fails with `EntityNotFound` if the index is beyond the destroy-flag
    /// table, or `StaleEntity` if the manager was cleared since.
    pub fn restore_entity(&mut self, entity: Entity) -> Result<()> {
        let index = self.validate(entity)?;
        let mut mask = self.masks.get(&index).copied().unwrap_or_default();

        for ContainerSlot { live, deleted } in self.slots.iter_mut().flatten() {
            if !deleted.has_entity(index) {
                continue;
            }
            match deleted.transfer_to(&mut **live, index) {
                Ok(()) => mask.turn_on_bit(live.component_id().index())?,
                Err(err) => {
                    tracing::warn!(entity = index, component = deleted.type_name(), %err, "failed to restore component");
                    deleted.remove_entity(index);
                }
            }
        }

        self.masks.insert(index, mask);
        self.destroy_flags[index as usize] = false;
        tracing::debug!(entity = index, components = mask.count(), "restored entity");
        Ok(())
    }

    /// New entity carrying copies of every component of `source`.
    pub fn duplicate_entity(&mut self, source: Entity) -> Result<Entity> {
        let src = self.validate_live(source)?;
        let mask = self.masks.get(&src).copied().unwrap_or_default();

        let entity = self.create_entity();
        let dst = entity.index();
        for slot in self.slots.iter_mut().flatten() {
            if slot.live.has_entity(src) {
                slot.live.duplicate(src, dst);
            }
        }
        self.masks.entry(dst).or_default().turn_on_bits(&mask);

        tracing::debug!(source = src, entity = dst, "duplicated entity");
        Ok(entity)
    }

    /// Replace the contents of `target` with a copy of this manager.
    ///
    /// Entity indices and the epoch carry over so handles stay meaningful
    /// across the copy. Destroyed entities are not copied: their indices stay
    /// allocated and flagged destroyed in `target`, with nothing to restore.
    pub fn clone_self(&self, target: &mut EntityManager) -> Result<()> {
        if !Arc::ptr_eq(&self.components, &target.components) {
            return Err(EcsError::RegistryMismatch);
        }

        #[cfg(feature = "profiling")]
        let span = info_span!("entity_manager.clone_self", entities = self.entity_counter);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        target.slots.clear();
        target.slots.resize_with(self.slots.len(), || None);
        target.entity_counter = self.entity_counter;
        target.epoch = self.epoch;
        target.destroy_flags.clone_from(&self.destroy_flags);
        target.masks.clear();

        let mut skipped = 0usize;
        for (id, slot) in self.slots.iter().enumerate() {
            let Some(slot) = slot else { continue };
            let target_slot = target.slots[id].get_or_insert_with(|| slot.empty_like());

            for index in slot.live.entity_indices() {
                if self.destroy_flags[index as usize] {
                    continue;
                }
                if let Err(err) = slot.live.clone_to(&mut *target_slot.live, index) {
                    skipped += 1;
                    tracing::warn!(entity = index, component = slot.live.type_name(), %err, "component not cloned");
                }
            }
        }

        for (&index, mask) in &self.masks {
            if !self.destroy_flags[index as usize] {
                target.masks.insert(index, *mask);
            }
        }

        tracing::debug!(
            entities = target.masks.len(),
            skipped,
            "cloned entity manager"
        );
        Ok(())
    }

    /// Reset for reuse: counter back to zero, containers, flags and masks
    /// wiped. Outstanding handles become stale.
    pub fn clear_self(&mut self) {
        for slot in self.slots.iter_mut().flatten() {
            slot.live.clear();
            slot.deleted.clear();
        }
        self.entity_counter = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.destroy_flags.clear();
        self.masks.clear();
        tracing::debug!(epoch = self.epoch, "cleared entity manager");
    }

    /// Entities that are allocated and not destroyed, in index order.
    pub fn live_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        let epoch = self.epoch;
        (0..self.entity_counter)
            .filter(move |&index| !self.destroy_flags[index as usize])
            .map(move |index| Entity::new(index, epoch))
    }

    pub fn entity_count(&self) -> usize {
        self.masks.len()
    }

    /// Total indices allocated, destroyed ones included.
    pub fn allocated_count(&self) -> u32 {
        self.entity_counter
    }

    /// Type names of the components `entity` carries (debugging aid).
    pub fn component_names(&self, entity: Entity) -> Vec<&'static str> {
        let Some(mask) = self.component_mask(entity) else {
            return Vec::new();
        };
        mask.ones()
            .filter_map(|bit| self.slots.get(bit).and_then(Option::as_ref))
            .map(|slot| slot.live.type_name())
            .collect()
    }
}

impl std::fmt::Debug for EntityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityManager")
            .field("entity_counter", &self.entity_counter)
            .field("epoch", &self.epoch)
            .field("live", &self.masks.len())
            .field("containers", &self.slots.iter().flatten().count())
            .finish()
    }
}
