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

//! Command buffer for structural scene changes requested while systems run

use crate::component::Component;
use crate::entity::Entity;
use crate::error::Result;
use crate::scene::Scene;

/// Type alias for scene mutation closures
pub type CommandClosure = Box<dyn FnOnce(&mut Scene) -> Result<()> + Send>;

/// Closure run against a freshly created entity
pub type SpawnClosure = Box<dyn FnOnce(&mut Scene, Entity) -> Result<()> + Send>;

/// Deferred command for scene mutations
pub enum Command {
    /// Create entity, then populate it with closure
    Spawn(SpawnClosure),

    /// Stage entity for removal
    Remove(Entity),

    /// Undo a staged or finalized removal
    Restore(Entity),

    /// Custom scene mutation
    Custom(CommandClosure),
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Spawn(_) => write!(f, "Spawn(...)"),
            Command::Remove(e) => f.debug_tuple("Remove").field(e).finish(),
            Command::Restore(e) => f.debug_tuple("Restore").field(e).finish(),
            Command::Custom(_) => write!(f, "Custom(...)"),
        }
    }
}

/// Command buffer for deferred operations
#[derive(Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Create new command buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    /// Queue creation of an entity populated by `f`
    pub fn spawn<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Scene, Entity) -> Result<()> + Send + 'static,
    {
        self.commands.push(Command::Spawn(Box::new(f)));
    }

    /// Queue entity removal
    pub fn remove_entity(&mut self, entity: Entity) {
        self.commands.push(Command::Remove(entity));
    }

    /// Queue entity restore
    pub fn restore_entity(&mut self, entity: Entity) {
        self.commands.push(Command::Restore(entity));
    }

    /// Queue a custom scene mutation
    pub fn add<F>(&mut self, f: F)
    where
        F: FnOnce(&mut Scene) -> Result<()> + Send + 'static,
    {
        self.commands.push(Command::Custom(Box::new(f)));
    }

    /// Queue add component command
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) {
        self.add(move |scene| scene.add_component(entity, component));
    }

    /// Queue remove component command
    pub fn remove_component<T: Component>(&mut self, entity: Entity) {
        self.add(move |scene| scene.remove_component::<T>(entity).map(|_| ()));
    }

    /// Apply all commands to the scene and clear the buffer.
    ///
    /// A failing command is logged and skipped; the rest still run.
    /// Returns the number of failed commands.
    pub fn apply(&mut self, scene: &mut Scene) -> usize {
        let mut failed = 0;
        for command in self.commands.drain(..) {
            let result = match command {
                Command::Spawn(f) => {
                    let entity = scene.create_entity();
                    f(scene, entity)
                }
                Command::Remove(entity) => scene.remove_entity(entity),
                Command::Restore(entity) => scene.restore_entity(entity),
                Command::Custom(f) => f(scene),
            };
            if let Err(err) = result {
                failed += 1;
                tracing::warn!(%err, "deferred command failed");
            }
        }
        failed
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Clear buffer
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
