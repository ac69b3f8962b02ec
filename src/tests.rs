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

//! Scene-level scenarios spanning entities, systems and the frame loop

#[cfg(test)]
mod tests {
    #![allow(clippy::module_inception)]
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use glam::{Mat4, Vec2, Vec3};

    use crate::{
        Drawable, EcsError, Entity, EntityManager, Message, RenderStates, RenderTarget, Result, Scene,
        SceneConfig, System, SystemBase, SystemContext,
    };

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position(Vec2);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity(Vec2);

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Lifetime(f32);

    struct Movement {
        base: SystemBase,
        frames: usize,
    }

    impl Movement {
        fn new() -> Self {
            Self {
                base: SystemBase::new()
                    .with_requirement::<Position>()
                    .with_requirement::<Velocity>(),
                frames: 0,
            }
        }
    }

    impl System for Movement {
        crate::system_base!(base);

        fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> Result<()> {
            self.frames += 1;
            for &entity in self.base.entities() {
                let vel = ctx.get_component::<Velocity>(entity)?.0;
                ctx.get_component_mut::<Position>(entity)?.0 += vel * dt;
            }
            Ok(())
        }

        fn clone_system(&self) -> Option<Box<dyn System>> {
            Some(Box::new(Movement {
                base: self.base.clone(),
                frames: self.frames,
            }))
        }
    }

    /// Expires entities once their lifetime runs out
    struct Expiry {
        base: SystemBase,
        seen_during_update: Vec<Entity>,
    }

    impl Expiry {
        fn new() -> Self {
            Self {
                base: SystemBase::new().with_requirement::<Lifetime>(),
                seen_during_update: Vec::new(),
            }
        }
    }

    impl System for Expiry {
        crate::system_base!(base);

        fn update(&mut self, ctx: &mut SystemContext<'_>, dt: f32) -> Result<()> {
            self.seen_during_update = self.base.entities().to_vec();
            for &entity in self.base.entities() {
                let lifetime = ctx.get_component_mut::<Lifetime>(entity)?;
                lifetime.0 -= dt;
                if lifetime.0 <= 0.0 {
                    ctx.commands.remove_entity(entity);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_membership_follows_mask_across_frames() -> Result<()> {
        let mut scene = Scene::new();
        scene.add_system(Movement::new())?;

        let entity = scene.create_entity();
        scene.add_component(entity, Position(Vec2::ZERO))?;
        scene.update(0.0)?;
        assert!(!scene.get_system::<Movement>().unwrap().has_entity(entity));

        // Gains the entity the frame after it has both components
        scene.add_component(entity, Velocity(Vec2::new(1.0, 0.0)))?;
        assert!(!scene.get_system::<Movement>().unwrap().has_entity(entity));
        scene.update(0.5)?;
        assert!(scene.get_system::<Movement>().unwrap().has_entity(entity));
        assert_eq!(scene.get_component::<Position>(entity)?.0, Vec2::new(0.5, 0.0));

        // Loses it once the mask stops fitting
        scene.remove_component::<Velocity>(entity)?;
        scene.update(0.5)?;
        assert!(!scene.get_system::<Movement>().unwrap().has_entity(entity));
        assert_eq!(scene.get_component::<Position>(entity)?.0, Vec2::new(0.5, 0.0));
        Ok(())
    }

    #[test]
    fn test_add_system_is_idempotent_per_scene() -> Result<()> {
        let constructed = AtomicUsize::new(0);
        let mut scene = Scene::new();

        for _ in 0..2 {
            scene.add_system_with(|| {
                constructed.fetch_add(1, Ordering::SeqCst);
                Movement::new()
            })?;
        }

        scene.update(0.016)?;
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert_eq!(scene.systems().len(), 1);
        assert_eq!(scene.get_system::<Movement>().unwrap().frames, 1);

        // Same instance comes back from add_system
        scene.get_system_mut::<Movement>().unwrap().frames = 10;
        let again = scene.add_system(Movement::new())?;
        assert_eq!(again.frames, 10);
        Ok(())
    }

    #[test]
    fn test_removal_during_update_is_deferred_one_frame() -> Result<()> {
        let mut scene = Scene::new();
        scene.add_system(Expiry::new())?;

        let short = scene.create_entity();
        let long = scene.create_entity();
        scene.add_component(short, Lifetime(0.5))?;
        scene.add_component(long, Lifetime(10.0))?;

        scene.update(1.0)?;
        // Requested during this frame, not yet applied
        assert!(scene.is_pending_removal(short));
        assert!(!scene.is_destroyed(short));
        assert!(scene.get_system::<Expiry>().unwrap().has_entity(short));

        scene.update(1.0)?;
        assert!(scene.is_destroyed(short));
        let expiry = scene.get_system::<Expiry>().unwrap();
        assert!(!expiry.has_entity(short));
        assert_eq!(expiry.seen_during_update, vec![long]);
        assert_eq!(scene.get_component::<Lifetime>(long)?, &Lifetime(8.0));
        Ok(())
    }

    #[test]
    fn test_restored_entity_rejoins_systems() -> Result<()> {
        let mut scene = Scene::new();
        scene.add_system(Movement::new())?;

        let entity = scene.create_entity();
        scene.add_component(entity, Position(Vec2::ZERO))?;
        scene.add_component(entity, Velocity(Vec2::ONE))?;
        scene.update(0.0)?;

        scene.remove_entity(entity)?;
        scene.update(0.0)?;
        assert!(!scene.get_system::<Movement>().unwrap().has_entity(entity));

        scene.restore_entity(entity)?;
        scene.update(1.0)?;
        assert!(scene.get_system::<Movement>().unwrap().has_entity(entity));
        assert_eq!(scene.get_component::<Position>(entity)?.0, Vec2::ONE);
        Ok(())
    }

    #[test]
    fn test_spawn_from_system_joins_next_frame() -> Result<()> {
        struct Spawner {
            base: SystemBase,
            spawned: bool,
        }

        impl System for Spawner {
            crate::system_base!(base);

            fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> Result<()> {
                if !self.spawned {
                    self.spawned = true;
                    ctx.commands.spawn(|scene, entity| {
                        scene.add_component(entity, Position(Vec2::ZERO))?;
                        scene.add_component(entity, Velocity(Vec2::X))
                    });
                }
                Ok(())
            }
        }

        let mut scene = Scene::new();
        scene.add_system(Spawner {
            base: SystemBase::new(),
            spawned: false,
        })?;
        scene.add_system(Movement::new())?;

        scene.update(1.0)?;
        assert_eq!(scene.entity_count(), 1);
        let entity = scene.live_entities().next().unwrap();
        assert!(!scene.get_system::<Movement>().unwrap().has_entity(entity));

        scene.update(1.0)?;
        assert!(scene.get_system::<Movement>().unwrap().has_entity(entity));
        assert_eq!(scene.get_component::<Position>(entity)?.0, Vec2::X);
        Ok(())
    }

    #[test]
    fn test_empty_entities_wait_for_add_entity() -> Result<()> {
        struct Everything {
            base: SystemBase,
        }

        impl System for Everything {
            crate::system_base!(base);
        }

        let mut scene = Scene::new();
        scene.add_system(Everything { base: SystemBase::new() })?;

        let empty = scene.create_empty_entity();
        let staged = scene.create_entity();
        scene.update(0.0)?;
        let system = scene.get_system::<Everything>().unwrap();
        assert!(!system.has_entity(empty));
        assert!(system.has_entity(staged));

        scene.add_entity(empty)?;
        scene.update(0.0)?;
        assert!(scene.get_system::<Everything>().unwrap().has_entity(empty));
        Ok(())
    }

    #[test]
    fn test_register_on_create_disabled() -> Result<()> {
        struct Everything {
            base: SystemBase,
        }

        impl System for Everything {
            crate::system_base!(base);
        }

        let mut scene = Scene::with_config(SceneConfig {
            register_on_create: false,
            ..SceneConfig::named("manual")
        });
        scene.add_system(Everything { base: SystemBase::new() })?;

        let entity = scene.create_entity();
        scene.update(0.0)?;
        assert!(!scene.get_system::<Everything>().unwrap().has_entity(entity));
        Ok(())
    }

    #[test]
    fn test_messages_reach_systems_in_order() -> Result<()> {
        struct Damage {
            target: Entity,
        }

        impl Message for Damage {
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        struct Ping;

        impl Message for Ping {
            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        struct Combat {
            base: SystemBase,
            handled: Arc<AtomicUsize>,
        }

        impl System for Combat {
            crate::system_base!(base);

            fn on_message(&mut self, ctx: &mut SystemContext<'_>, msg: &dyn Message) -> Result<()> {
                if let Some(damage) = msg.downcast_ref::<Damage>() {
                    self.handled.fetch_add(1, Ordering::SeqCst);
                    ctx.commands.remove_entity(damage.target);
                }
                Ok(())
            }
        }

        let handled = Arc::new(AtomicUsize::new(0));
        let mut scene = Scene::new();
        scene.add_system(Combat {
            base: SystemBase::new(),
            handled: handled.clone(),
        })?;

        let target = scene.create_entity();
        scene.handle_message(&Ping)?;
        assert_eq!(handled.load(Ordering::SeqCst), 0);

        scene.handle_message(&Damage { target })?;
        assert_eq!(handled.load(Ordering::SeqCst), 1);
        assert!(scene.is_pending_removal(target));
        Ok(())
    }

    #[test]
    fn test_draw_forwards_to_drawable_systems() -> Result<()> {
        #[derive(Default)]
        struct Recorder {
            points: Vec<Vec3>,
        }

        impl RenderTarget for Recorder {
            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }

        struct Sprites {
            base: SystemBase,
        }

        impl Drawable for Sprites {
            fn draw(&self, entities: &EntityManager, target: &mut dyn RenderTarget, states: &RenderStates) {
                let Some(recorder) = target.as_any_mut().downcast_mut::<Recorder>() else {
                    return;
                };
                for &entity in self.base.entities() {
                    if let Ok(pos) = entities.get_component::<Position>(entity) {
                        recorder
                            .points
                            .push(states.transform.transform_point3(pos.0.extend(0.0)));
                    }
                }
            }
        }

        impl System for Sprites {
            crate::system_base!(base);

            fn as_drawable(&self) -> Option<&dyn Drawable> {
                Some(self)
            }
        }

        let mut scene = Scene::new();
        scene.add_system(Sprites {
            base: SystemBase::new().with_requirement::<Position>(),
        })?;
        scene.add_system(Movement::new())?;

        let entity = scene.create_entity();
        scene.add_component(entity, Position(Vec2::new(1.0, 2.0)))?;
        scene.update(0.0)?;

        let mut recorder = Recorder::default();
        let states = RenderStates::with_transform(Mat4::from_translation(Vec3::Z));
        scene.draw(&mut recorder, &states);
        assert_eq!(recorder.points, vec![Vec3::new(1.0, 2.0, 1.0)]);
        Ok(())
    }

    #[test]
    fn test_clone_scene_copies_cloneable_systems() -> Result<()> {
        let mut scene = Scene::new();
        scene.add_system(Movement::new())?;
        scene.add_system(Expiry::new())?;

        let mover = scene.create_entity();
        scene.add_component(mover, Position(Vec2::ZERO))?;
        scene.add_component(mover, Velocity(Vec2::X))?;
        let dead = scene.duplicate_entity(mover)?;
        scene.update(1.0)?;
        scene.remove_entity(dead)?;
        scene.update(0.0)?;

        let mut play = scene.clone_self()?;
        assert!(play.has_system::<Movement>());
        assert!(!play.has_system::<Expiry>());

        let movement = play.get_system::<Movement>().unwrap();
        assert_eq!(movement.base().entities(), &[mover]);
        assert_eq!(movement.base().scene(), Some(play.id()));
        assert!(!play.has_component::<Position>(dead));

        // The copy runs independently of the source
        play.update(1.0)?;
        assert_eq!(play.get_component::<Position>(mover)?.0, Vec2::new(2.0, 0.0));
        assert_eq!(scene.get_component::<Position>(mover)?.0, Vec2::X);
        Ok(())
    }

    #[test]
    fn test_clear_self_keeps_systems_registered() -> Result<()> {
        let mut scene = Scene::new();
        scene.add_system(Movement::new())?;
        let old = scene.create_entity();
        scene.add_component(old, Position(Vec2::ZERO))?;
        scene.add_component(old, Velocity(Vec2::ONE))?;
        scene.update(0.0)?;

        scene.clear_self();
        assert!(scene.has_system::<Movement>());
        assert!(scene.get_system::<Movement>().unwrap().base().entities().is_empty());
        assert!(matches!(
            scene.get_component::<Position>(old),
            Err(EcsError::StaleEntity { .. })
        ));

        let fresh = scene.create_entity();
        scene.add_component(fresh, Position(Vec2::ZERO))?;
        scene.add_component(fresh, Velocity(Vec2::ONE))?;
        scene.update(0.0)?;
        assert!(scene.get_system::<Movement>().unwrap().has_entity(fresh));
        Ok(())
    }

    /// Hands a velocity to anything positioned that lacks one
    struct Launcher {
        base: SystemBase,
    }

    impl System for Launcher {
        crate::system_base!(base);

        fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> Result<()> {
            for &entity in self.base.entities() {
                if !ctx.has_component::<Velocity>(entity) {
                    ctx.add_component(entity, Velocity(Vec2::X));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_component_added_by_system_updates_membership() -> Result<()> {
        let mut scene = Scene::new();
        scene.add_system(Launcher {
            base: SystemBase::new().with_requirement::<Position>(),
        })?;
        scene.add_system(Movement::new())?;

        let entity = scene.create_entity();
        scene.add_component(entity, Position(Vec2::ZERO))?;

        scene.update(1.0)?;
        assert!(scene.has_component::<Velocity>(entity));
        assert!(!scene.get_system::<Movement>().unwrap().has_entity(entity));

        scene.update(1.0)?;
        assert!(scene.get_system::<Movement>().unwrap().has_entity(entity));
        assert_eq!(scene.get_component::<Position>(entity)?.0, Vec2::X);
        Ok(())
    }

    #[test]
    fn test_removal_requested_by_system_stays_readable_this_frame() -> Result<()> {
        struct Reaper {
            base: SystemBase,
        }

        impl System for Reaper {
            crate::system_base!(base);

            fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> Result<()> {
                for &entity in self.base.entities() {
                    ctx.remove_entity(entity);
                }
                Ok(())
            }
        }

        struct Watcher {
            base: SystemBase,
            reads: Vec<f32>,
        }

        impl System for Watcher {
            crate::system_base!(base);

            fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> Result<()> {
                for &entity in self.base.entities() {
                    assert!(ctx.is_alive(entity));
                    self.reads.push(ctx.get_component::<Lifetime>(entity)?.0);
                }
                Ok(())
            }
        }

        let mut scene = Scene::new();
        scene.add_system(Reaper {
            base: SystemBase::new().with_requirement::<Lifetime>(),
        })?;
        scene.add_system(Watcher {
            base: SystemBase::new().with_requirement::<Lifetime>(),
            reads: Vec::new(),
        })?;

        let entity = scene.create_entity();
        scene.add_component(entity, Lifetime(3.0))?;

        scene.update(0.0)?;
        assert!(scene.is_pending_removal(entity));
        assert_eq!(scene.get_system::<Watcher>().unwrap().reads, vec![3.0]);

        scene.update(0.0)?;
        assert!(scene.is_destroyed(entity));
        assert!(!scene.get_system::<Reaper>().unwrap().has_entity(entity));
        assert!(!scene.get_system::<Watcher>().unwrap().has_entity(entity));
        assert_eq!(scene.get_system::<Watcher>().unwrap().reads, vec![3.0]);
        Ok(())
    }

    #[test]
    fn test_failing_system_does_not_stall_the_frame() -> Result<()> {
        /// Expects a velocity that lifetime-only entities lack
        struct Strict {
            base: SystemBase,
        }

        impl System for Strict {
            crate::system_base!(base);

            fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> Result<()> {
                for &entity in self.base.entities() {
                    ctx.get_component::<Velocity>(entity)?;
                }
                Ok(())
            }
        }

        let mut scene = Scene::new();
        scene.add_system(Strict {
            base: SystemBase::new().with_requirement::<Lifetime>(),
        })?;
        scene.add_system(Expiry::new())?;

        let entity = scene.create_entity();
        scene.add_component(entity, Lifetime(1.0))?;

        let result = scene.update(1.0);
        assert_eq!(
            result,
            Err(EcsError::ComponentMissing(std::any::type_name::<Velocity>()))
        );
        // Expiry still ran and its removal was applied
        assert_eq!(scene.get_component::<Lifetime>(entity)?, &Lifetime(0.0));
        assert!(scene.is_pending_removal(entity));
        Ok(())
    }
}
