use crate::entity::Entity;
use crate::scene::Scene;

/// Scene inspector for debugging
pub struct SceneInspector;

impl SceneInspector {
    /// Live (not destroyed) entity count
    pub fn entity_count(scene: &Scene) -> usize {
        scene.entity_count()
    }

    /// Sizes of every component container and its delete buffer
    pub fn container_summary(scene: &Scene) -> Vec<ContainerInfo> {
        scene
            .entities()
            .containers()
            .zip(scene.entities().deleted_containers())
            .map(|(live, deleted)| ContainerInfo {
                component_id: live.component_id().index(),
                type_name: live.type_name(),
                live: live.len(),
                deleted: deleted.len(),
            })
            .collect()
    }

    /// Registered systems in dispatch order
    pub fn system_summary(scene: &Scene) -> Vec<SystemInfo> {
        scene
            .systems()
            .iter()
            .map(|system| SystemInfo {
                name: system.name(),
                entity_count: system.base().entities().len(),
                cloneable: system.clone_system().is_some(),
                drawable: system.as_drawable().is_some(),
            })
            .collect()
    }

    pub fn summary(scene: &Scene) -> SceneSummary {
        SceneSummary {
            name: scene.config().name.clone(),
            live_entities: Self::entity_count(scene),
            allocated_entities: scene.entities().allocated_count(),
            containers: Self::container_summary(scene),
            systems: Self::system_summary(scene),
        }
    }

    /// Log scene summary
    pub fn log_summary(scene: &Scene) {
        let summary = Self::summary(scene);
        tracing::info!(
            scene = %scene.id(),
            name = %summary.name,
            live = summary.live_entities,
            allocated = summary.allocated_entities,
            containers = summary.containers.len(),
            systems = summary.systems.len(),
            "scene summary"
        );

        for info in &summary.containers {
            tracing::info!(
                component = info.type_name,
                id = info.component_id,
                live = info.live,
                deleted = info.deleted,
                "container"
            );
        }

        for info in &summary.systems {
            tracing::info!(
                system = info.name,
                entities = info.entity_count,
                cloneable = info.cloneable,
                drawable = info.drawable,
                "system"
            );
        }
    }

    /// Log entity details
    pub fn log_entity(scene: &Scene, entity: Entity) {
        match scene.entity(entity) {
            Ok(view) => tracing::info!(
                %entity,
                destroyed = view.destroyed(),
                pending_removal = scene.is_pending_removal(entity),
                components = ?view.component_names(),
                "entity"
            ),
            Err(err) => tracing::info!(%entity, %err, "entity not inspectable"),
        }
    }
}

/// Container information for debugging
#[derive(Clone, Debug)]
pub struct ContainerInfo {
    pub component_id: usize,
    pub type_name: &'static str,
    pub live: usize,
    pub deleted: usize,
}

/// System information for debugging
#[derive(Clone, Debug)]
pub struct SystemInfo {
    pub name: &'static str,
    pub entity_count: usize,
    pub cloneable: bool,
    pub drawable: bool,
}

#[derive(Clone, Debug)]
pub struct SceneSummary {
    pub name: String,
    pub live_entities: usize,
    pub allocated_entities: u32,
    pub containers: Vec<ContainerInfo>,
    pub systems: Vec<SystemInfo>,
}
