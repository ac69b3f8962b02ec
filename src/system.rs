//! System trait and per-system membership state

use std::any::{Any, TypeId};

use ahash::AHashSet;
use smallvec::SmallVec;

use crate::bitmask::Bitmask;
use crate::command::CommandBuffer;
use crate::component::{Component, ComponentManager};
use crate::draw::Drawable;
use crate::entity::Entity;
use crate::entity_manager::EntityManager;
use crate::error::Result;
use crate::message::Message;
use crate::scene::SceneId;

/// Component type declared as required but not yet resolved to an ID
#[derive(Debug, Clone, Copy)]
struct PendingRequirement {
    type_id: TypeId,
    type_name: &'static str,
}

/// State every system carries: its requirement mask, the entities it
/// currently owns and the scene it is registered with.
#[derive(Debug, Clone, Default)]
pub struct SystemBase {
    pending: SmallVec<[PendingRequirement; 8]>,
    mask: Bitmask,
    entities: Vec<Entity>,
    members: AHashSet<Entity>,
    scene: Option<SceneId>,
}

impl SystemBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that qualifying entities must carry `T`.
    pub fn add_requirement<T: Component>(&mut self) -> &mut Self {
        self.pending.push(PendingRequirement {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        });
        self
    }

    /// Builder form of [`SystemBase::add_requirement`].
    pub fn with_requirement<T: Component>(mut self) -> Self {
        self.add_requirement::<T>();
        self
    }

    /// Resolve declared requirements to component IDs and fold them into the
    /// mask. Called once by the system manager on registration.
    pub fn process_requirements(&mut self, components: &mut ComponentManager) -> Result<()> {
        for req in self.pending.drain(..) {
            let id = components.id_by_type(req.type_id, req.type_name)?;
            self.mask.turn_on_bit(id.index())?;
        }
        Ok(())
    }

    pub fn has_pending_requirements(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn mask(&self) -> Bitmask {
        self.mask
    }

    /// True iff every bit this system requires is set on `candidate`.
    pub fn fits_requirements(&self, candidate: &Bitmask) -> bool {
        candidate.matches(&self.mask, self.mask.bits())
    }

    /// Entities in the order they joined.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn has_entity(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    /// Returns false if `entity` was already a member.
    pub fn insert_entity(&mut self, entity: Entity) -> bool {
        if !self.members.insert(entity) {
            return false;
        }
        self.entities.push(entity);
        true
    }

    /// Returns false if `entity` was not a member.
    pub fn erase_entity(&mut self, entity: Entity) -> bool {
        if !self.members.remove(&entity) {
            return false;
        }
        if let Some(pos) = self.entities.iter().position(|&e| e == entity) {
            self.entities.remove(pos);
        }
        true
    }

    /// Drop every member without running hooks.
    pub fn clear_entities(&mut self) -> Vec<Entity> {
        self.members.clear();
        std::mem::take(&mut self.entities)
    }

    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    pub(crate) fn bind(&mut self, scene: SceneId) {
        self.scene = Some(scene);
    }
}

/// What a system sees while it runs.
///
/// Component values can be read and written in place. Anything that changes
/// an entity's mask or liveness (adding or removing components, spawning,
/// removing entities) is queued on `commands` and applied by the scene after
/// the last system has run, so membership is re-evaluated through the add
/// buffer and removals go through the delete buffers.
pub struct SystemContext<'a> {
    entities: &'a mut EntityManager,
    pub commands: &'a mut CommandBuffer,
    scene: SceneId,
}

impl<'a> SystemContext<'a> {
    pub fn new(scene: SceneId, entities: &'a mut EntityManager, commands: &'a mut CommandBuffer) -> Self {
        Self {
            entities,
            commands,
            scene,
        }
    }

    pub fn scene(&self) -> SceneId {
        self.scene
    }

    /// Read-only view of the scene's entities.
    pub fn entities(&self) -> &EntityManager {
        self.entities
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

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Queue `component` for `entity`; applied after dispatch.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) {
        self.commands.add_component(entity, component);
    }

    /// Queue removal of `T` from `entity`; applied after dispatch.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) {
        self.commands.remove_component::<T>(entity);
    }

    /// Queue `entity` for removal. It stays readable until the next update
    /// finalizes it.
    pub fn remove_entity(&mut self, entity: Entity) {
        self.commands.remove_entity(entity);
    }
}

/// Per-frame logic over the entities whose masks fit the system's
/// requirements.
///
/// Implementors declare requirements on their [`SystemBase`] when they are
/// constructed, e.g.
///
/// ```ignore
/// struct Movement { base: SystemBase }
///
/// impl Movement {
///     fn new() -> Self {
///         Self { base: SystemBase::new().with_requirement::<Position>().with_requirement::<Velocity>() }
///     }
/// }
///
/// impl System for Movement {
///     scene_ecs::system_base!(base);
///
///     fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> Result<()> {
///         for &entity in self.base.entities() {
///             let vel = *ctx.get_component::<Velocity>(entity)?;
///             ctx.get_component_mut::<Position>(entity)?.0 += vel.0 * dt;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait System: Any + Send + Sync {
    fn base(&self) -> &SystemBase;

    fn base_mut(&mut self) -> &mut SystemBase;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Get system name
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> Result<()> {
        Ok(())
    }

    fn on_message(&mut self, _ctx: &mut SystemContext<'_>, _msg: &dyn Message) -> Result<()> {
        Ok(())
    }

    fn on_entity_added(&mut self, _entity: Entity) {}

    fn on_entity_removed(&mut self, _entity: Entity) {}

    /// Copy of this system for a cloned scene. `None` means the system is not
    /// cloneable and is left out of the clone.
    fn clone_system(&self) -> Option<Box<dyn System>> {
        None
    }

    /// Draw capability, if the system renders anything.
    fn as_drawable(&self) -> Option<&dyn Drawable> {
        None
    }

    fn fits_requirements(&self, mask: &Bitmask) -> bool {
        self.base().fits_requirements(mask)
    }

    fn has_entity(&self, entity: Entity) -> bool {
        self.base().has_entity(entity)
    }

    /// Add a member and run `on_entity_added`. Adding twice is a no-op.
    fn add_entity(&mut self, entity: Entity) -> bool {
        if !self.base_mut().insert_entity(entity) {
            return false;
        }
        self.on_entity_added(entity);
        true
    }

    /// Remove a member and run `on_entity_removed`.
    fn remove_entity(&mut self, entity: Entity) -> bool {
        if !self.base_mut().erase_entity(entity) {
            return false;
        }
        self.on_entity_removed(entity);
        true
    }
}

/// Boxed system
pub type BoxedSystem = Box<dyn System>;

/// Implements the accessor half of [`System`] for a struct holding its
/// [`SystemBase`] in `$field`.
#[macro_export]
macro_rules! system_base {
    ($field:ident) => {
        fn base(&self) -> &$crate::system::SystemBase {
            &self.$field
        }

        fn base_mut(&mut self) -> &mut $crate::system::SystemBase {
            &mut self.$field
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }
    };
}
