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

//! World: entity allocator plus type-indexed component pools

use ahash::AHashMap;
use std::any::TypeId;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::command::{Command, CommandBuffer};
use crate::component::Component;
use crate::entity::{Entity, EntityAllocator};
use crate::error::{EcsError, Result};
use crate::pool::{AnyPool, Pool};
use crate::view::{View, ViewCache, ViewCaches, ViewKey, ViewQuery};

/// Central ECS world
///
/// Owns the entity allocator and one [`Pool`] per observed component type,
/// looked up by `TypeId`. Pools are per-world: independent worlds never
/// share storage. All mutation goes through the world, which pairs every
/// component access with a liveness check against the allocator.
pub struct World {
    allocator: EntityAllocator,

    /// One pool per component type, created on first use
    pools: AHashMap<TypeId, Box<dyn AnyPool>>,

    /// Cached view intersections keyed by the view's type list
    pub(crate) view_caches: ViewCaches,

    /// Advisory counter bumped on entity destruction, for consumers that
    /// track world-wide structural change without pinning a pool
    global_version: u64,
}

impl World {
    /// Create new world
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            pools: AHashMap::new(),
            view_caches: ViewCaches::default(),
            global_version: 0,
        }
    }

    /// Allocates a fresh entity with no components.
    ///
    /// # Errors
    /// Returns [`EcsError::CapacityExhausted`] once the 2^20 index space is
    /// fully live.
    pub fn create_entity(&mut self) -> Result<Entity> {
        self.allocator.create()
    }

    /// Destroys a live entity.
    ///
    /// Removal fans out across every registered pool before the allocator
    /// version is bumped, so pools observe a still-alive handle; the global
    /// structural version is bumped in between. Afterwards the handle is
    /// dead and `has` reports `false` for every component type.
    ///
    /// # Errors
    /// Returns [`EcsError::DoubleDestroy`] if the handle is already dead.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<()> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::DoubleDestroy);
        }

        #[cfg(feature = "profiling")]
        let span = info_span!("world.destroy_entity", pools = self.pools.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        for pool in self.pools.values_mut() {
            pool.remove_entity(entity);
        }
        self.global_version += 1;
        self.allocator.destroy(entity)
    }

    /// Returns `true` if the handle is alive in this world.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Ensures the pool for `T` exists.
    ///
    /// Idempotent; the pool instance is stable for the world's lifetime.
    pub fn register<T: Component>(&mut self) {
        self.pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Pool::<T>::new()));
    }

    /// Shared access to the pool for `T`, if any component of `T` was ever
    /// registered or attached.
    pub fn pool<T: Component>(&self) -> Option<&Pool<T>> {
        self.pools
            .get(&TypeId::of::<T>())
            .and_then(|p| p.as_any().downcast_ref::<Pool<T>>())
    }

    /// Mutable access to the pool for `T`, registering it on first use.
    ///
    /// Direct pool mutation bypasses the world's liveness checks: callers
    /// of [`Pool::insert`] must uphold its alive-entity contract, or prefer
    /// [`World::attach`], which enforces it.
    pub fn pool_mut<T: Component>(&mut self) -> &mut Pool<T> {
        let entry = self
            .pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Pool::<T>::new()));
        match entry.as_any_mut().downcast_mut::<Pool<T>>() {
            Some(pool) => pool,
            // The directory maps TypeId::of::<T>() to Pool<T> by construction
            None => unreachable!("pool directory type mismatch"),
        }
    }

    /// Membership test through the type-erased directory.
    pub(crate) fn pool_contains(&self, type_id: TypeId, entity: Entity) -> bool {
        self.pools.get(&type_id).is_some_and(|p| p.contains(entity))
    }

    pub(crate) fn view_cache_mut(&mut self, key: &ViewKey) -> &mut ViewCache {
        self.view_caches.entry(key.clone()).or_default()
    }

    /// Attaches a component to a live entity.
    ///
    /// An already-present component of the same type is overwritten in
    /// place; this is not an error and does not disturb pool layout.
    ///
    /// # Errors
    /// Returns [`EcsError::NotAlive`] for a dead handle.
    pub fn attach<T: Component>(&mut self, entity: Entity, value: T) -> Result<()> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::NotAlive);
        }
        self.pool_mut::<T>().insert(entity, value);
        Ok(())
    }

    /// Detaches the `T` component from a live entity.
    ///
    /// Idempotent: detaching an absent component is a no-op, not an error.
    ///
    /// # Errors
    /// Returns [`EcsError::NotAlive`] for a dead handle.
    pub fn detach<T: Component>(&mut self, entity: Entity) -> Result<()> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::NotAlive);
        }
        self.pool_mut::<T>().remove(entity);
        Ok(())
    }

    /// Returns `true` if `entity` is alive and carries a `T`.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity) && self.pool::<T>().is_some_and(|p| p.has(entity))
    }

    /// Shared reference to the `T` component of a live entity.
    ///
    /// # Errors
    /// [`EcsError::NotAlive`] for a dead handle, [`EcsError::NotPresent`]
    /// when the live entity lacks the component.
    pub fn get<T: Component>(&self, entity: Entity) -> Result<&T> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::NotAlive);
        }
        self.pool::<T>()
            .and_then(|p| p.get(entity))
            .ok_or(EcsError::NotPresent)
    }

    /// Mutable reference to the `T` component of a live entity.
    ///
    /// The reference stays valid until the next mutation of the `T` pool:
    /// insert of a new entity, any remove, or clear. Overwrite-inserts do
    /// not invalidate.
    ///
    /// # Errors
    /// [`EcsError::NotAlive`] for a dead handle, [`EcsError::NotPresent`]
    /// when the live entity lacks the component.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::NotAlive);
        }
        self.pool_mut::<T>()
            .get_mut(entity)
            .ok_or(EcsError::NotPresent)
    }

    /// Returns the `T` component of a live entity, attaching `value` first
    /// if the entity lacks one.
    ///
    /// Same reference-stability contract as [`World::get_mut`].
    ///
    /// # Errors
    /// Returns [`EcsError::NotAlive`] for a dead handle.
    pub fn get_or_attach<T: Component>(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::NotAlive);
        }
        let pool = self.pool_mut::<T>();
        if !pool.has(entity) {
            pool.insert(entity, value);
        }
        pool.get_mut(entity).ok_or(EcsError::NotPresent)
    }

    /// Shared reference to the sole `T` component in the world.
    ///
    /// # Errors
    /// Returns [`EcsError::SingletonViolation`] with the actual count when
    /// the `T` pool does not hold exactly one component.
    pub fn singleton<T: Component>(&self) -> Result<&T> {
        let pool = self.singleton_pool::<T>()?;
        pool.get(pool.entity_at(0)).ok_or(EcsError::NotPresent)
    }

    /// Mutable reference to the sole `T` component in the world.
    pub fn singleton_mut<T: Component>(&mut self) -> Result<&mut T> {
        let count = self.pool::<T>().map_or(0, Pool::len);
        if count != 1 {
            return Err(EcsError::SingletonViolation { count });
        }
        let pool = self.pool_mut::<T>();
        let entity = pool.entity_at(0);
        pool.get_mut(entity).ok_or(EcsError::NotPresent)
    }

    /// Entity owning the sole `T` component in the world.
    pub fn singleton_entity<T: Component>(&self) -> Result<Entity> {
        Ok(self.singleton_pool::<T>()?.entity_at(0))
    }

    fn singleton_pool<T: Component>(&self) -> Result<&Pool<T>> {
        let count = self.pool::<T>().map_or(0, Pool::len);
        if count != 1 {
            return Err(EcsError::SingletonViolation { count });
        }
        // count == 1 implies the pool exists
        self.pool::<T>().ok_or(EcsError::NotPresent)
    }

    /// Capacity hint: pre-grows the allocator and every registered pool for
    /// `n` total entities.
    pub fn reserve(&mut self, n: usize) {
        self.allocator.reserve(n);
        for pool in self.pools.values_mut() {
            pool.reserve(n);
        }
    }

    /// Creates a view over the component tuple `Q`.
    ///
    /// Registers the pools on first use. The view's entity cache persists in
    /// the world keyed by the type list, so a re-created view over the same
    /// tuple reuses a still-valid cache.
    pub fn view<Q: ViewQuery>(&mut self) -> View<'_, Q> {
        View::new(self)
    }

    /// Borrowed wrapper bundling a handle with the world for chained calls.
    pub fn entity_mut(&mut self, entity: Entity) -> EntityMut<'_> {
        EntityMut {
            world: self,
            entity,
        }
    }

    /// Applies every command queued in `buffer`, in order.
    ///
    /// # Errors
    /// Stops at and propagates the first failing command.
    pub fn flush(&mut self, buffer: CommandBuffer) -> Result<()> {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.flush", queued = buffer.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        for command in buffer {
            match command {
                Command::Spawn(init) => {
                    let entity = self.create_entity()?;
                    init(self, entity)?;
                }
                Command::Destroy(entity) => self.destroy_entity(entity)?,
                Command::Apply(apply) => apply(self)?,
            }
        }
        Ok(())
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.allocator.live_count()
    }

    /// Number of entity slots waiting for reuse (diagnostics).
    pub fn recycled_entity_count(&self) -> usize {
        self.allocator.recycled_count()
    }

    /// Advisory world-wide structural version; bumped on entity destruction.
    pub fn global_version(&self) -> u64 {
        self.global_version
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Entity handle bundled with a mutable world borrow.
///
/// The plain [`Entity`] stays a copyable value with no world reference; this
/// wrapper exists for call chaining:
///
/// ```
/// # use sparse_ecs::World;
/// # struct Position { x: f32 }
/// # struct Velocity { x: f32 }
/// # let mut world = World::new();
/// let e = world.create_entity()?;
/// world
///     .entity_mut(e)
///     .attach(Position { x: 0.0 })?
///     .attach(Velocity { x: 1.0 })?;
/// # Ok::<(), sparse_ecs::EcsError>(())
/// ```
pub struct EntityMut<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> EntityMut<'w> {
    /// The underlying plain handle.
    pub fn id(&self) -> Entity {
        self.entity
    }

    /// Attaches a component; see [`World::attach`].
    pub fn attach<T: Component>(&mut self, value: T) -> Result<&mut Self> {
        self.world.attach(self.entity, value)?;
        Ok(self)
    }

    /// Detaches a component; see [`World::detach`].
    pub fn detach<T: Component>(&mut self) -> Result<&mut Self> {
        self.world.detach::<T>(self.entity)?;
        Ok(self)
    }

    /// Returns `true` if the entity is alive and carries a `T`.
    pub fn has<T: Component>(&self) -> bool {
        self.world.has::<T>(self.entity)
    }

    /// Shared component access; see [`World::get`].
    pub fn get<T: Component>(&self) -> Result<&T> {
        self.world.get(self.entity)
    }

    /// Mutable component access; see [`World::get_mut`].
    pub fn get_mut<T: Component>(&mut self) -> Result<&mut T> {
        self.world.get_mut(self.entity)
    }

    /// Destroys the entity, consuming the wrapper.
    pub fn destroy(self) -> Result<()> {
        self.world.destroy_entity(self.entity)
    }
}
