//! Borrowed entity views
//!
//! [`Entity`] is a bare handle. These views pair it with its scene so
//! component access reads like methods on the entity itself.

use crate::bitmask::Bitmask;
use crate::component::Component;
use crate::entity::Entity;
use crate::error::Result;
use crate::scene::Scene;

/// Shared view of one entity
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    scene: &'a Scene,
    entity: Entity,
}

impl<'a> EntityRef<'a> {
    pub(crate) fn new(scene: &'a Scene, entity: Entity) -> Self {
        Self { scene, entity }
    }

    pub fn id(&self) -> Entity {
        self.entity
    }

    pub fn get_component<T: Component>(&self) -> Result<&'a T> {
        self.scene.get_component(self.entity)
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.scene.has_component::<T>(self.entity)
    }

    /// Empty once the entity is destroyed.
    pub fn component_mask(&self) -> Bitmask {
        self.scene.component_mask(self.entity).unwrap_or_default()
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.scene.entities().component_names(self.entity)
    }

    pub fn destroyed(&self) -> bool {
        self.scene.is_destroyed(self.entity)
    }

    /// False for null, stale and destroyed handles.
    pub fn is_valid(&self) -> bool {
        self.scene.entities().is_alive(self.entity)
    }
}

impl std::fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRef")
            .field("entity", &self.entity)
            .field("components", &self.component_names())
            .finish()
    }
}

/// Exclusive view of one entity. Structural changes go through the scene, so
/// they are staged for system re-evaluation like any other.
pub struct EntityMut<'a> {
    scene: &'a mut Scene,
    entity: Entity,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(scene: &'a mut Scene, entity: Entity) -> Self {
        Self { scene, entity }
    }

    pub fn id(&self) -> Entity {
        self.entity
    }

    /// Attach `component`; chainable.
    pub fn add_component<T: Component>(&mut self, component: T) -> Result<&mut Self> {
        self.scene.add_component(self.entity, component)?;
        Ok(self)
    }

    pub fn get_component<T: Component>(&self) -> Result<&T> {
        self.scene.get_component(self.entity)
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Result<&mut T> {
        self.scene.get_component_mut(self.entity)
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.scene.has_component::<T>(self.entity)
    }

    pub fn remove_component<T: Component>(&mut self) -> Result<bool> {
        self.scene.remove_component::<T>(self.entity)
    }

    pub fn component_mask(&self) -> Bitmask {
        self.scene.component_mask(self.entity).unwrap_or_default()
    }

    pub fn destroyed(&self) -> bool {
        self.scene.is_destroyed(self.entity)
    }

    /// Stage this entity for removal at the next update.
    pub fn remove_self(&mut self) -> Result<()> {
        self.scene.remove_entity(self.entity)
    }

    pub fn is_valid(&self) -> bool {
        self.scene.entities().is_alive(self.entity)
    }

    pub fn as_readonly(&self) -> EntityRef<'_> {
        EntityRef::new(self.scene, self.entity)
    }
}
