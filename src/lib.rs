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

//! Sparse-set Entity Component System
//!
//! A small in-process ECS runtime: generational entity handles, one
//! cache-friendly sparse-set pool per component type, and cached views that
//! iterate the intersection of several pools with mutable access.
//!
//! ```
//! use sparse_ecs::World;
//!
//! struct Position { x: f32, y: f32 }
//! struct Velocity { dx: f32, dy: f32 }
//!
//! let mut world = World::new();
//! let e = world.create_entity()?;
//! world.attach(e, Position { x: 0.0, y: 0.0 })?;
//! world.attach(e, Velocity { dx: 1.0, dy: 2.0 })?;
//!
//! world.view::<(Position, Velocity)>().each(|_entity, pos, vel| {
//!     pos.x += vel.dx;
//!     pos.y += vel.dy;
//! });
//!
//! assert_eq!(world.get::<Position>(e)?.y, 2.0);
//! # Ok::<(), sparse_ecs::EcsError>(())
//! ```

pub mod command;
pub mod component;
pub mod entity;
pub mod error;
pub mod pool;
pub mod prelude;
pub mod view;
pub mod world;

// Re-exports for convenience
pub use command::{Command, CommandBuffer};
pub use component::Component;
pub use entity::{Entity, EntityAllocator};
pub use error::{EcsError, Result};
pub use pool::{Pool, PAGE_SIZE};
pub use view::{View, ViewQuery};
pub use world::{EntityMut, World};
