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

//! Cached intersection views over component pools
//!
//! A [`View`] iterates every entity that carries all components of its type
//! tuple, with mutable access to each. The intersection is cached in the
//! world keyed by the type list and rebuilt lazily: each pool carries a
//! structural version, the view snapshots them, and drift triggers a rebuild
//! at the top of the next [`each`](View::each).
//!
//! Rebuilds walk the smallest pool (the *driver*) and membership-test the
//! candidates against the rest, so rebuild cost is proportional to the
//! smallest pool, not the world.

use std::any::TypeId;
use std::marker::PhantomData;

use rustc_hash::FxHashMap;
use smallvec::{smallvec, SmallVec};

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::component::Component;
use crate::entity::Entity;
use crate::pool::Pool;
use crate::world::World;

/// Inline capacity for per-view type lists and version snapshots
pub const MAX_VIEW_COMPONENTS: usize = 8;

/// Type list identifying a view's cache slot in the world
pub(crate) type ViewKey = SmallVec<[TypeId; MAX_VIEW_COMPONENTS]>;

/// Cached intersection plus the pool versions it was built against
pub(crate) struct ViewCache {
    pub(crate) entities: Vec<Entity>,
    pub(crate) seen: SmallVec<[u64; MAX_VIEW_COMPONENTS]>,
    pub(crate) built: bool,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            seen: SmallVec::new(),
            built: false,
        }
    }
}

pub(crate) type ViewCaches = FxHashMap<ViewKey, ViewCache>;

/// One-shot membership predicate added by `with`/`without`
#[derive(Clone, Copy)]
enum Filter {
    With(TypeId),
    Without(TypeId),
}

impl Filter {
    fn accepts(self, world: &World, entity: Entity) -> bool {
        match self {
            Filter::With(id) => world.pool_contains(id, entity),
            Filter::Without(id) => !world.pool_contains(id, entity),
        }
    }
}

/// Component tuples a [`View`] can drive.
///
/// Implemented for tuples of distinct component types up to arity 4.
pub trait ViewQuery {
    /// Type list, in tuple order
    fn type_ids() -> ViewKey;

    /// Ensure every pool in the tuple exists
    fn register(world: &mut World);
}

/// Cached, filterable query over the intersection of component pools.
///
/// Obtained from [`World::view`]. Holds the world borrow for its lifetime,
/// so structural mutation during iteration is impossible by construction;
/// queue deferred changes on a [`CommandBuffer`](crate::CommandBuffer) and
/// flush after the pass instead. Each `each` call iterates a snapshot taken
/// at rebuild time.
pub struct View<'w, Q: ViewQuery> {
    world: &'w mut World,
    filters: SmallVec<[Filter; 4]>,
    invalidated: bool,
    _marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: ViewQuery> View<'w, Q> {
    /// # Panics
    /// Panics if the tuple repeats a component type; aliasing two mutable
    /// references to one pool is never valid.
    pub(crate) fn new(world: &'w mut World) -> Self {
        let ids = Q::type_ids();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                assert!(ids[i] != ids[j], "view component types must be distinct");
            }
        }
        Q::register(world);
        Self {
            world,
            filters: SmallVec::new(),
            invalidated: false,
            _marker: PhantomData,
        }
    }

    /// Requires entities to also carry a `C`. One-shot: cleared when the
    /// next `each` finishes. Invalidates the cache.
    pub fn with<C: Component>(mut self) -> Self {
        self.world.register::<C>();
        self.filters.push(Filter::With(TypeId::of::<C>()));
        self.invalidated = true;
        self
    }

    /// Excludes entities carrying a `C`. One-shot, like [`View::with`].
    /// Invalidates the cache.
    pub fn without<C: Component>(mut self) -> Self {
        self.world.register::<C>();
        self.filters.push(Filter::Without(TypeId::of::<C>()));
        self.invalidated = true;
        self
    }

    /// Pre-grows the cached entity list.
    pub fn reserve(&mut self, n: usize) {
        let key = Q::type_ids();
        self.world.view_cache_mut(&key).entities.reserve(n);
    }
}

/// Returns the position of the first minimum: ties resolve to tuple order.
fn driver_index(lens: &[usize]) -> usize {
    let mut driver = 0;
    for (i, &len) in lens.iter().enumerate().skip(1) {
        if len < lens[driver] {
            driver = i;
        }
    }
    driver
}

macro_rules! impl_view {
    ($(($T:ident, $idx:tt)),+) => {
        impl<$($T: Component),+> ViewQuery for ($($T,)+) {
            fn type_ids() -> ViewKey {
                smallvec![$(TypeId::of::<$T>()),+]
            }

            fn register(world: &mut World) {
                $(world.register::<$T>();)+
            }
        }

        impl<'w, $($T: Component),+> View<'w, ($($T,)+)> {
            /// Invokes `callback` once per entity carrying every component
            /// of the tuple (and passing all active filters), with mutable
            /// access to each component.
            ///
            /// Rebuilds the cache first if it was never built, a filter was
            /// added, or any pool's structural version drifted since the
            /// last rebuild. Iteration covers the snapshot taken at rebuild
            /// time. If any filter was active, the filter list is cleared
            /// and the cache drops back to unbuilt when this returns.
            #[allow(non_snake_case)]
            pub fn each<F>(&mut self, mut callback: F)
            where
                F: FnMut(Entity, $(&mut $T),+),
            {
                let key: ViewKey = <($($T,)+) as ViewQuery>::type_ids();

                // Materialize the cache slot before taking raw pointers so
                // the cache map cannot rehash underneath them.
                self.world.view_cache_mut(&key);

                let world: *mut World = &mut *self.world;

                // SAFETY: pools are boxed, so each `Pool<T>` address is
                // stable for the world's lifetime. The tuple's types are
                // distinct (asserted at construction), so these pointers
                // never alias each other. All later accesses through
                // `world` touch either the view-cache map or other pools,
                // never the pools behind these pointers, and the callback
                // receives only component references, so it cannot reach
                // the world at all.
                let ($($T,)+) = unsafe { ($((*world).pool_mut::<$T>() as *mut Pool<$T>,)+) };

                let versions = unsafe { [$((*$T).structural_version()),+] };

                let (needs_rebuild, mut snapshot) = {
                    // SAFETY: exclusive access to the cache slot; no pool
                    // pointer is dereferenced while this borrow lives.
                    let cache = unsafe { (*world).view_cache_mut(&key) };
                    let stale = !cache.built
                        || self.invalidated
                        || cache.seen.as_slice() != versions.as_slice();
                    (stale, std::mem::take(&mut cache.entities))
                };

                if needs_rebuild {
                    #[cfg(feature = "profiling")]
                    let span = info_span!("view.rebuild", pools = versions.len());
                    #[cfg(feature = "profiling")]
                    let _span_guard = span.enter();

                    snapshot.clear();
                    let lens = unsafe { [$((*$T).len()),+] };
                    let driver = driver_index(&lens);
                    // SAFETY: shared reads of dense entity arrays; nothing
                    // mutates the pools during the rebuild.
                    let candidates: &[Entity] = match driver {
                        $($idx => unsafe { (*$T).entities() },)+
                        _ => &[],
                    };
                    for &entity in candidates {
                        if $(unsafe { (*$T).has(entity) })&&+ {
                            snapshot.push(entity);
                        }
                    }
                    self.invalidated = false;
                }

                let had_filters = !self.filters.is_empty();
                for &entity in &snapshot {
                    if had_filters {
                        // SAFETY: shared read of the pool directory; the
                        // mutable component borrows below are taken after
                        // this check, never concurrently with it.
                        let world_ref = unsafe { &*world };
                        if !self.filters.iter().all(|f| f.accepts(world_ref, entity)) {
                            continue;
                        }
                    }
                    // Component references are re-fetched through the pools
                    // at callback time, so dense swaps between passes can
                    // never leave a dangling slot here.
                    // SAFETY: one exclusive borrow per distinct pool.
                    match unsafe { ($((*$T).get_mut(entity),)+) } {
                        ($(Some($T),)+) => callback(entity, $($T),+),
                        _ => {}
                    }
                }

                // SAFETY: pool pointers are dead past this point.
                let cache = unsafe { (*world).view_cache_mut(&key) };
                cache.entities = snapshot;
                if needs_rebuild {
                    cache.seen.clear();
                    cache.seen.extend_from_slice(&versions);
                    cache.built = true;
                }
                if had_filters {
                    self.filters.clear();
                    cache.built = false;
                }
            }
        }
    };
}

impl_view!((A, 0));
impl_view!((A, 0), (B, 1));
impl_view!((A, 0), (B, 1), (C, 2));
impl_view!((A, 0), (B, 1), (C, 2), (D, 3));

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    #[derive(Debug, PartialEq)]
    struct Velocity {
        dx: i32,
        dy: i32,
    }

    struct Hidden;

    #[test]
    fn test_driver_index_prefers_first_minimum() {
        assert_eq!(driver_index(&[3]), 0);
        assert_eq!(driver_index(&[3, 1, 2]), 1);
        assert_eq!(driver_index(&[2, 2, 1]), 2);
        assert_eq!(driver_index(&[2, 2, 3]), 0);
    }

    #[test]
    fn test_single_pool_view() -> Result<()> {
        let mut world = World::new();
        for i in 0..4 {
            let e = world.create_entity()?;
            world.attach(e, Position { x: i, y: -i })?;
        }

        let mut seen = Vec::new();
        world.view::<(Position,)>().each(|e, pos| {
            pos.x += 100;
            seen.push(e);
        });
        assert_eq!(seen.len(), 4);

        for &e in &seen {
            assert!(world.get::<Position>(e)?.x >= 100);
        }
        Ok(())
    }

    #[test]
    fn test_intersection_view() -> Result<()> {
        let mut world = World::new();
        let a = world.create_entity()?;
        let b = world.create_entity()?;
        let c = world.create_entity()?;
        world.attach(a, Position { x: 0, y: 0 })?;
        world.attach(a, Velocity { dx: 1, dy: 1 })?;
        world.attach(b, Position { x: 0, y: 0 })?;
        world.attach(c, Velocity { dx: 2, dy: 2 })?;

        let mut hits = Vec::new();
        world.view::<(Position, Velocity)>().each(|e, pos, vel| {
            pos.x += vel.dx;
            hits.push(e);
        });
        assert_eq!(hits, vec![a]);
        assert_eq!(world.get::<Position>(a)?.x, 1);
        assert_eq!(world.get::<Position>(b)?.x, 0);
        Ok(())
    }

    #[test]
    fn test_cache_rebuilds_after_detach() -> Result<()> {
        let mut world = World::new();
        let mut entities = Vec::new();
        for _ in 0..3 {
            let e = world.create_entity()?;
            world.attach(e, Position { x: 0, y: 0 })?;
            world.attach(e, Velocity { dx: 0, dy: 0 })?;
            entities.push(e);
        }

        let mut count = 0;
        world.view::<(Position, Velocity)>().each(|_, _, _| count += 1);
        assert_eq!(count, 3);

        world.detach::<Velocity>(entities[1])?;

        count = 0;
        world.view::<(Position, Velocity)>().each(|_, _, _| count += 1);
        assert_eq!(count, 2);
        Ok(())
    }

    #[test]
    fn test_with_without_filters_are_one_shot() -> Result<()> {
        let mut world = World::new();
        let a = world.create_entity()?;
        let b = world.create_entity()?;
        for &e in &[a, b] {
            world.attach(e, Position { x: 0, y: 0 })?;
        }
        world.attach(a, Hidden)?;

        let mut seen = Vec::new();
        world
            .view::<(Position,)>()
            .without::<Hidden>()
            .each(|e, _| seen.push(e));
        assert_eq!(seen, vec![b]);

        // The filter must not leak into the next pass
        seen.clear();
        world.view::<(Position,)>().each(|e, _| seen.push(e));
        assert_eq!(seen.len(), 2);
        Ok(())
    }

    #[test]
    fn test_overwrite_does_not_invalidate_cache() -> Result<()> {
        let mut world = World::new();
        let e = world.create_entity()?;
        world.attach(e, Position { x: 1, y: 1 })?;

        world.view::<(Position,)>().each(|_, _| {});
        let version = world.pool::<Position>().map(Pool::structural_version);

        // Overwrite keeps membership, so the pool version must hold still
        world.attach(e, Position { x: 2, y: 2 })?;
        assert_eq!(
            world.pool::<Position>().map(Pool::structural_version),
            version
        );

        let mut count = 0;
        world.view::<(Position,)>().each(|_, pos| {
            assert_eq!(pos.x, 2);
            count += 1;
        });
        assert_eq!(count, 1);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "distinct")]
    fn test_duplicate_component_types_panic() {
        let mut world = World::new();
        world.view::<(Position, Position)>();
    }
}
