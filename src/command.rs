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

//! Command buffer for deferred world mutation
//!
//! A view's `each` holds the world borrow for the whole pass, so structural
//! changes decided inside the callback cannot be applied immediately.
//! Queue them here and hand the buffer to [`World::flush`] after the pass;
//! commands apply in queue order.

use crate::component::Component;
use crate::entity::Entity;
use crate::error::Result;
use crate::world::World;

type BoxedInit = Box<dyn FnOnce(&mut World, Entity) -> Result<()> + Send>;
type BoxedApply = Box<dyn FnOnce(&mut World) -> Result<()> + Send>;

/// Deferred command for world mutations
pub enum Command {
    /// Create an entity, then run the closure on it
    Spawn(BoxedInit),

    /// Destroy an entity
    Destroy(Entity),

    /// Arbitrary deferred mutation (attach/detach closures)
    Apply(BoxedApply),
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

    /// Queue an entity creation; `init` runs with the fresh handle when the
    /// buffer is flushed.
    pub fn spawn<F>(&mut self, init: F)
    where
        F: FnOnce(&mut World, Entity) -> Result<()> + Send + 'static,
    {
        self.commands.push(Command::Spawn(Box::new(init)));
    }

    /// Queue an entity destruction.
    pub fn destroy(&mut self, entity: Entity) {
        self.commands.push(Command::Destroy(entity));
    }

    /// Queue a component attach.
    pub fn attach<T: Component>(&mut self, entity: Entity, value: T) {
        self.commands
            .push(Command::Apply(Box::new(move |world| {
                world.attach(entity, value)
            })));
    }

    /// Queue a component detach.
    pub fn detach<T: Component>(&mut self, entity: Entity) {
        self.commands
            .push(Command::Apply(Box::new(move |world| {
                world.detach::<T>(entity)
            })));
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Clear buffer without applying
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl IntoIterator for CommandBuffer {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_bookkeeping() {
        let mut buffer = CommandBuffer::new();
        assert!(buffer.is_empty());

        buffer.destroy(Entity::null());
        assert_eq!(buffer.len(), 1);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_flush_applies_in_order() -> Result<()> {
        let mut world = World::new();
        let entity = world.create_entity()?;

        let mut buffer = CommandBuffer::with_capacity(3);
        buffer.attach(entity, 1u32);
        buffer.attach(entity, 2u32);
        buffer.detach::<i64>(entity);
        world.flush(buffer)?;

        // Later attach overwrote the earlier one
        assert_eq!(world.get::<u32>(entity)?, &2);
        Ok(())
    }

    #[test]
    fn test_flush_spawn_runs_init() -> Result<()> {
        let mut world = World::new();

        let mut buffer = CommandBuffer::new();
        buffer.spawn(|world, entity| world.attach(entity, 5i32));
        world.flush(buffer)?;

        assert_eq!(world.entity_count(), 1);
        assert_eq!(world.singleton::<i32>()?, &5);
        Ok(())
    }

    #[test]
    fn test_flush_stops_on_error() -> Result<()> {
        let mut world = World::new();
        let entity = world.create_entity()?;
        world.destroy_entity(entity)?;

        let mut buffer = CommandBuffer::new();
        buffer.attach(entity, 1u32);
        buffer.spawn(|world, e| world.attach(e, 2u32));
        assert!(world.flush(buffer).is_err());

        // The failing command aborted the rest of the queue
        assert_eq!(world.entity_count(), 0);
        Ok(())
    }
}
