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

//! Scene: composition root for the component, entity and system managers

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashSet;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::bitmask::Bitmask;
use crate::command::CommandBuffer;
use crate::component::{Component, ComponentManager, SharedComponentManager};
use crate::config::SceneConfig;
use crate::draw::{Drawable, RenderStates, RenderTarget};
use crate::entity::Entity;
use crate::entity_manager::EntityManager;
use crate::entity_view::{EntityMut, EntityRef};
use crate::error::{EcsError, Result};
use crate::message::Message;
use crate::system::{System, SystemContext};
use crate::system_manager::SystemManager;

/// Process-unique scene identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneId(u64);

impl SceneId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

/// Owns one entity manager and one system manager over a shared component
/// registry.
///
/// Entities move between three sets: pending-add (staged for system
/// re-evaluation), live, and pending-delete. [`Scene::update`] is the only
/// place staged changes reach the systems, so a system iterating its entity
/// list never sees an entity vanish mid-frame.
pub struct Scene {
    id: SceneId,
    config: SceneConfig,
    components: SharedComponentManager,
    entities: EntityManager,
    systems: SystemManager,

    /// Entities whose membership must be re-evaluated at the next update
    add_buffer: Vec<Entity>,
    staged: AHashSet<Entity>,

    /// Double-buffered removals; `current_delete` receives new requests
    delete_buffers: [Vec<Entity>; 2],
    current_delete: usize,
    pending_delete: AHashSet<Entity>,

    /// Structural changes queued by systems
    commands: CommandBuffer,
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    pub fn with_config(config: SceneConfig) -> Self {
        Self::with_components(config, ComponentManager::shared())
    }

    fn with_components(config: SceneConfig, components: SharedComponentManager) -> Self {
        let id = SceneId::next();
        tracing::debug!(scene = %id, name = %config.name, "created scene");
        Self {
            id,
            entities: EntityManager::with_capacity(components.clone(), config.entity_capacity),
            components,
            systems: SystemManager::new(),
            add_buffer: Vec::new(),
            staged: AHashSet::new(),
            delete_buffers: [Vec::new(), Vec::new()],
            current_delete: 0,
            pending_delete: AHashSet::new(),
            commands: CommandBuffer::new(),
            config,
        }
    }

    pub fn id(&self) -> SceneId {
        self.id
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn component_manager(&self) -> &SharedComponentManager {
        &self.components
    }

    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    pub fn systems(&self) -> &SystemManager {
        &self.systems
    }

    /// Queue for structural changes applied at the end of the next update.
    pub fn commands(&mut self) -> &mut CommandBuffer {
        &mut self.commands
    }

    fn stage_add(&mut self, entity: Entity) {
        if self.staged.insert(entity) {
            self.add_buffer.push(entity);
        }
    }

    /// Allocate an entity, staging it for system registration unless the
    /// scene is configured otherwise.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.create_entity();
        if self.config.register_on_create {
            self.stage_add(entity);
        }
        entity
    }

    /// Allocate an entity that is never staged automatically.
    pub fn create_empty_entity(&mut self) -> Entity {
        self.entities.create_entity()
    }

    /// Stage a live entity for system registration.
    pub fn add_entity(&mut self, entity: Entity) -> Result<()> {
        if !self.entities.is_alive(entity) {
            self.entities.validate(entity)?;
            return Err(EcsError::EntityNotFound(entity.index()));
        }
        self.stage_add(entity);
        Ok(())
    }

    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<()> {
        self.entities.add_component(entity, component)?;
        self.stage_add(entity);
        Ok(())
    }

    /// Returns false if the entity did not carry `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<bool> {
        let removed = self.entities.remove_component::<T>(entity)?;
        if removed {
            self.stage_add(entity);
        }
        Ok(removed)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T> {
        self.entities.get_component(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        self.entities.get_component_mut(entity)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.entities.has_component::<T>(entity)
    }

    pub fn component_mask(&self, entity: Entity) -> Option<Bitmask> {
        self.entities.component_mask(entity)
    }

    pub fn duplicate_entity(&mut self, source: Entity) -> Result<Entity> {
        let entity = self.entities.duplicate_entity(source)?;
        self.stage_add(entity);
        Ok(entity)
    }

    /// Stage `entity` for removal at the next update. Staging twice is a
    /// no-op.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<()> {
        if !self.entities.is_alive(entity) {
            self.entities.validate(entity)?;
            return Err(EcsError::EntityNotFound(entity.index()));
        }
        if self.pending_delete.insert(entity) {
            self.delete_buffers[self.current_delete].push(entity);
            tracing::trace!(%entity, "staged entity for removal");
        }
        Ok(())
    }

    pub fn is_pending_removal(&self, entity: Entity) -> bool {
        self.pending_delete.contains(&entity)
    }

    pub fn is_destroyed(&self, entity: Entity) -> bool {
        self.entities.is_destroyed(entity)
    }

    /// Undo a removal. A staged removal is simply dropped; a finalized one
    /// moves the entity's components back out of the delete buffers.
    pub fn restore_entity(&mut self, entity: Entity) -> Result<()> {
        if self.pending_delete.remove(&entity) {
            for buffer in &mut self.delete_buffers {
                buffer.retain(|&staged| staged != entity);
            }
            tracing::trace!(%entity, "cancelled staged removal");
            return Ok(());
        }

        self.entities.restore_entity(entity)?;
        self.stage_add(entity);
        Ok(())
    }

    /// Register a system, or return the one of the same type already present.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<&mut S> {
        self.systems.add_system(self.id, &self.entities, system)
    }

    /// Like [`Scene::add_system`], but only constructs the system when none of
    /// its type is registered yet.
    pub fn add_system_with<S, F>(&mut self, build: F) -> Result<&mut S>
    where
        S: System,
        F: FnOnce() -> S,
    {
        self.systems.add_system_with(self.id, &self.entities, build)
    }

    pub fn get_system<S: System>(&self) -> Option<&S> {
        self.systems.get_system::<S>()
    }

    pub fn get_system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems.get_system_mut::<S>()
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.systems.has_system::<S>()
    }

    pub fn remove_system<S: System>(&mut self) -> Result<()> {
        self.systems.remove_system::<S>()
    }

    /// Route `msg` to every system, then apply the commands they queued.
    pub fn handle_message(&mut self, msg: &dyn Message) -> Result<()> {
        let mut ctx = SystemContext::new(self.id, &mut self.entities, &mut self.commands);
        let result = self.systems.handle_message(&mut ctx, msg);
        self.apply_commands();
        result
    }

    /// Advance one frame:
    /// 1. flip the delete buffers and finalize removals staged before this call
    /// 2. re-evaluate system membership for staged entities
    /// 3. run every system in registration order
    /// 4. apply commands the systems queued
    ///
    /// Removals requested while systems run land in the other buffer and are
    /// finalized by the next update.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("scene.update", scene = %self.id, entities = self.entities.entity_count());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        self.finalize_removals();
        self.flush_add_buffer();

        let mut ctx = SystemContext::new(self.id, &mut self.entities, &mut self.commands);
        let result = self.systems.update(&mut ctx, dt);
        self.apply_commands();
        result
    }

    fn flush_add_buffer(&mut self) {
        for entity in self.add_buffer.drain(..) {
            match self.entities.component_mask(entity) {
                Some(mask) => self.systems.add_entity(entity, &mask),
                None => tracing::trace!(%entity, "staged entity no longer alive"),
            }
        }
        self.staged.clear();
    }

    fn finalize_removals(&mut self) {
        let old = self.current_delete;
        self.current_delete ^= 1;

        let mut staged = std::mem::take(&mut self.delete_buffers[old]);
        for &entity in &staged {
            self.pending_delete.remove(&entity);
            self.systems.remove_entity(entity);
            if let Err(err) = self.entities.remove_entity(entity) {
                tracing::warn!(%entity, %err, "staged removal failed");
            }
        }
        staged.clear();
        self.delete_buffers[old] = staged;
    }

    /// Apply queued commands now rather than at the end of the next update.
    ///
    /// Every command runs even if an earlier one fails; the failures are
    /// reported together as [`EcsError::CommandError`].
    pub fn flush_commands(&mut self) -> Result<()> {
        match self.apply_commands() {
            0 => Ok(()),
            failed => Err(EcsError::CommandError(format!("{failed} deferred commands failed"))),
        }
    }

    fn apply_commands(&mut self) -> usize {
        if self.commands.is_empty() {
            return 0;
        }
        let mut commands = std::mem::take(&mut self.commands);
        let failed = commands.apply(self);
        if failed > 0 {
            tracing::warn!(scene = %self.id, failed, "some deferred commands failed");
        }
        // Commands queued by commands stay for the next frame
        if self.commands.is_empty() {
            self.commands = commands;
        }
        failed
    }

    /// Forward to every drawable system.
    pub fn draw(&self, target: &mut dyn RenderTarget, states: &RenderStates) {
        self.systems.draw(&self.entities, target, states);
    }

    /// Independent copy of this scene sharing the component registry.
    ///
    /// Destroyed entities are left out; pending removals carry over. Only
    /// systems that support cloning are copied, and they start with every
    /// live entity they fit already registered.
    pub fn clone_self(&self) -> Result<Scene> {
        let mut clone = Scene::with_components(self.config.clone(), self.components.clone());
        self.entities.clone_self(&mut clone.entities)?;
        clone.systems = self.systems.clone_systems(clone.id);

        for entity in clone.entities.live_entities() {
            if let Some(mask) = clone.entities.component_mask(entity) {
                clone.systems.add_entity(entity, &mask);
            }
        }

        for buffer in &self.delete_buffers {
            for &entity in buffer {
                if clone.entities.is_alive(entity) && clone.pending_delete.insert(entity) {
                    clone.delete_buffers[clone.current_delete].push(entity);
                }
            }
        }

        tracing::debug!(
            source = %self.id,
            scene = %clone.id,
            entities = clone.entities.entity_count(),
            systems = clone.systems.len(),
            "cloned scene"
        );
        Ok(clone)
    }

    /// Empty the scene for reuse. Systems stay registered with no members;
    /// outstanding entity handles become stale.
    pub fn clear_self(&mut self) {
        self.systems.clear_entities();
        self.entities.clear_self();
        self.add_buffer.clear();
        self.staged.clear();
        for buffer in &mut self.delete_buffers {
            buffer.clear();
        }
        self.pending_delete.clear();
        self.commands.clear();
        tracing::debug!(scene = %self.id, "cleared scene");
    }

    /// Read view of `entity`. Destroyed entities are allowed; null and stale
    /// handles are not.
    pub fn entity(&self, entity: Entity) -> Result<EntityRef<'_>> {
        self.entities.validate(entity)?;
        Ok(EntityRef::new(self, entity))
    }

    pub fn entity_mut(&mut self, entity: Entity) -> Result<EntityMut<'_>> {
        self.entities.validate(entity)?;
        Ok(EntityMut::new(self, entity))
    }

    pub fn live_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.live_entities()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.entity_count()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

/// A scene always draws its own entities; the `entities` argument is ignored.
impl Drawable for Scene {
    fn draw(&self, _entities: &EntityManager, target: &mut dyn RenderTarget, states: &RenderStates) {
        Scene::draw(self, target, states);
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("entities", &self.entities)
            .field("systems", &self.systems.len())
            .field("pending_add", &self.add_buffer.len())
            .field("pending_delete", &self.pending_delete.len())
            .finish()
    }
}
