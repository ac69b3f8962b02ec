//! System registry and dispatch
//!
//! Systems run in registration order. There is no priority or dependency
//! ordering between them.

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::bitmask::Bitmask;
use crate::draw::{RenderStates, RenderTarget};
use crate::entity::Entity;
use crate::entity_manager::EntityManager;
use crate::error::{EcsError, Result};
use crate::message::Message;
use crate::scene::SceneId;
use crate::system::{BoxedSystem, System, SystemContext};

#[derive(Default)]
pub struct SystemManager {
    systems: Vec<BoxedSystem>,
}

impl SystemManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Linear scan by concrete type
    fn position<S: System>(&self) -> Option<usize> {
        self.systems
            .iter()
            .position(|system| system.as_any().is::<S>())
    }

    /// Register a system of type `S`, constructing it with `build` only if no
    /// system of that type exists yet. Either way the registered instance is
    /// returned.
    ///
    /// A new system is bound to `scene`, has its requirements resolved, and
    /// is offered every live entity in `entities`.
    pub fn add_system_with<S, F>(
        &mut self,
        scene: SceneId,
        entities: &EntityManager,
        build: F,
    ) -> Result<&mut S>
    where
        S: System,
        F: FnOnce() -> S,
    {
        let index = match self.position::<S>() {
            Some(index) => index,
            None => {
                let mut system = build();
                system
                    .base_mut()
                    .process_requirements(&mut entities.component_manager().write())?;
                system.base_mut().bind(scene);

                for entity in entities.live_entities() {
                    if let Some(mask) = entities.component_mask(entity) {
                        if system.fits_requirements(&mask) {
                            system.add_entity(entity);
                        }
                    }
                }

                tracing::debug!(
                    system = system.name(),
                    entities = system.base().entities().len(),
                    "registered system"
                );
                self.systems.push(Box::new(system));
                self.systems.len() - 1
            }
        };

        self.systems[index]
            .as_any_mut()
            .downcast_mut::<S>()
            .ok_or(EcsError::SystemNotFound(std::any::type_name::<S>()))
    }

    /// Register `system` unless one of its type exists; an existing instance
    /// wins and `system` is dropped.
    pub fn add_system<S: System>(
        &mut self,
        scene: SceneId,
        entities: &EntityManager,
        system: S,
    ) -> Result<&mut S> {
        self.add_system_with(scene, entities, move || system)
    }

    pub fn get_system<S: System>(&self) -> Option<&S> {
        let index = self.position::<S>()?;
        self.systems[index].as_any().downcast_ref::<S>()
    }

    pub fn get_system_mut<S: System>(&mut self) -> Option<&mut S> {
        let index = self.position::<S>()?;
        self.systems[index].as_any_mut().downcast_mut::<S>()
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.position::<S>().is_some()
    }

    /// Unregister `S`, running `on_entity_removed` for each of its members.
    pub fn remove_system<S: System>(&mut self) -> Result<()> {
        let index = self
            .position::<S>()
            .ok_or(EcsError::SystemNotFound(std::any::type_name::<S>()))?;
        let mut system = self.systems.remove(index);
        for entity in system.base().entities().to_vec() {
            system.remove_entity(entity);
        }
        tracing::debug!(system = system.name(), "removed system");
        Ok(())
    }

    /// Re-evaluate membership of `entity` in every system: systems it fits
    /// gain it, systems it no longer fits lose it.
    pub fn add_entity(&mut self, entity: Entity, mask: &Bitmask) {
        for system in &mut self.systems {
            if system.fits_requirements(mask) {
                system.add_entity(entity);
            } else {
                system.remove_entity(entity);
            }
        }
    }

    pub fn remove_entity(&mut self, entity: Entity) {
        for system in &mut self.systems {
            system.remove_entity(entity);
        }
    }

    /// Empty every system's member list, running removal hooks.
    pub fn clear_entities(&mut self) {
        for system in &mut self.systems {
            for entity in system.base().entities().to_vec() {
                system.remove_entity(entity);
            }
        }
    }

    fn check_binding(system: &dyn System, scene: SceneId) -> Result<()> {
        if system.base().scene() != Some(scene) {
            tracing::error!(system = system.name(), ?scene, "system dispatched by a scene it is not bound to");
            return Err(EcsError::SceneMismatch);
        }
        Ok(())
    }

    /// Run every system once, in registration order.
    ///
    /// A failing system is logged and skipped; the rest still run. The first
    /// failure is returned once every system has had its turn.
    pub fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> Result<()> {
        let mut first_err = None;
        for system in &mut self.systems {
            if let Err(err) = Self::check_binding(&**system, ctx.scene()) {
                first_err.get_or_insert(err);
                continue;
            }

            #[cfg(feature = "profiling")]
            let span = info_span!("system.update", system = system.name(), entities = system.base().entities().len());
            #[cfg(feature = "profiling")]
            let _span_guard = span.enter();

            tracing::trace!(system = system.name(), dt, "update");
            if let Err(err) = system.update(ctx, dt) {
                tracing::warn!(system = system.name(), %err, "system update failed");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Deliver `msg` to every system, in registration order. Failures are
    /// handled as in [`SystemManager::update`].
    pub fn handle_message(&mut self, ctx: &mut SystemContext<'_>, msg: &dyn Message) -> Result<()> {
        let mut first_err = None;
        for system in &mut self.systems {
            if let Err(err) = Self::check_binding(&**system, ctx.scene()) {
                first_err.get_or_insert(err);
                continue;
            }
            if let Err(err) = system.on_message(ctx, msg) {
                tracing::warn!(system = system.name(), %err, "message handler failed");
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Forward a draw call to every system with the draw capability.
    pub fn draw(&self, entities: &EntityManager, target: &mut dyn RenderTarget, states: &RenderStates) {
        for system in &self.systems {
            if let Some(drawable) = system.as_drawable() {
                drawable.draw(entities, target, states);
            }
        }
    }

    /// Copies of the cloneable systems, bound to `scene` with empty member
    /// lists. Non-cloneable systems are skipped.
    pub fn clone_systems(&self, scene: SceneId) -> SystemManager {
        let mut cloned = SystemManager::new();
        for system in &self.systems {
            match system.clone_system() {
                Some(mut copy) => {
                    copy.base_mut().clear_entities();
                    copy.base_mut().bind(scene);
                    cloned.systems.push(copy);
                }
                None => {
                    tracing::warn!(system = system.name(), "system is not cloneable; left out of cloned scene");
                }
            }
        }
        cloned
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Registered systems in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn System> {
        self.systems.iter().map(|system| &**system)
    }
}
