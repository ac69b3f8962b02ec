use scene_ecs::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq)]
struct A(i32);
#[derive(Debug, Clone, Copy, PartialEq)]
struct B(i32);

struct SpawnerSystem {
    base: SystemBase,
}

impl System for SpawnerSystem {
    system_base!(base);

    fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> Result<()> {
        ctx.commands.spawn(|scene, entity| {
            scene.add_component(entity, A(1))?;
            scene.add_component(entity, B(2))
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SpawnerSystem"
    }
}

struct MutatorSystem {
    base: SystemBase,
}

impl MutatorSystem {
    fn new() -> Self {
        Self {
            base: SystemBase::new().with_requirement::<A>(),
        }
    }
}

impl System for MutatorSystem {
    system_base!(base);

    fn update(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) -> Result<()> {
        for &entity in self.base.entities() {
            ctx.commands.add_component(entity, B(10));
        }
        Ok(())
    }
}

#[test]
fn test_deferred_spawn_and_apply() {
    let mut scene = Scene::new();
    scene
        .add_system(SpawnerSystem {
            base: SystemBase::new(),
        })
        .unwrap();

    // After 1 frame, the entity should be spawned
    scene.update(0.016).unwrap();

    let container = scene.entities().container::<B>().unwrap();
    assert_eq!(container.len(), 1);
    assert_eq!(scene.entity_count(), 1);
}

#[test]
fn test_deferred_mutation_sequential() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.create_entity();
    scene.add_component(entity, A(1))?;
    scene.add_system(MutatorSystem::new())?;

    // Registered with the entity already present, so B lands this frame
    assert!(!scene.has_component::<B>(entity));
    scene.update(0.016)?;
    assert_eq!(scene.get_component::<B>(entity)?, &B(10));
    Ok(())
}

#[test]
fn test_failed_commands_do_not_stop_the_rest() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.create_entity();

    let mut commands = CommandBuffer::new();
    commands.add(|_| Err(EcsError::CommandError("boom".into())));
    commands.remove_component::<A>(Entity::NULL);
    commands.add_component(entity, A(7));

    assert_eq!(commands.apply(&mut scene), 2);
    assert_eq!(scene.get_component::<A>(entity)?, &A(7));
    Ok(())
}

#[test]
fn test_queued_restore_reverses_queued_remove() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.create_entity();
    scene.add_component(entity, A(3))?;

    scene.commands().remove_entity(entity);
    scene.commands().restore_entity(entity);
    scene.update(0.0)?;
    scene.update(0.0)?;

    assert!(!scene.is_destroyed(entity));
    assert_eq!(scene.get_component::<A>(entity)?, &A(3));
    Ok(())
}

#[test]
fn test_flush_commands_reports_failures_as_command_error() -> Result<()> {
    let mut scene = Scene::new();
    let entity = scene.create_entity();

    scene.commands().remove_entity(Entity::NULL);
    scene.commands().add_component(entity, A(4));
    scene.commands().remove_component::<B>(Entity::NULL);

    match scene.flush_commands() {
        Err(EcsError::CommandError(msg)) => assert!(msg.starts_with("2 ")),
        other => panic!("expected CommandError, got {other:?}"),
    }
    // The good command still landed and the queue is drained
    assert_eq!(scene.get_component::<A>(entity)?, &A(4));
    assert!(scene.commands().is_empty());
    scene.flush_commands()?;
    Ok(())
}
