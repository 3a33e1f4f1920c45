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

//! Entity handles and the generational allocator
//!
//! An [`Entity`] is a packed 32-bit value: a 20-bit slot index in the low
//! bits and a 12-bit version in the high bits. The allocator recycles slot
//! indices LIFO and bumps the version on destruction, so stale copies of a
//! handle are detected instead of silently aliasing the recycled slot.

use std::fmt;

use crate::error::{EcsError, Result};

/// Bits reserved for the slot index (low bits)
pub const INDEX_BITS: u32 = 20;

/// Bits reserved for the version (high bits)
pub const VERSION_BITS: u32 = 12;

/// Mask for the index field
pub const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;

/// Mask for the version field
pub const VERSION_MASK: u32 = (1 << VERSION_BITS) - 1;

/// Maximum number of entity slots a world can hold
pub const MAX_ENTITIES: usize = 1 << INDEX_BITS;

#[inline]
const fn pack(index: u32, version: u32) -> u32 {
    (version << INDEX_BITS) | (index & INDEX_MASK)
}

/// Opaque, versioned handle to an entity.
///
/// Handles are plain `Copy` values carrying no reference to any world. Two
/// handles compare equal iff both index and version match. The bit layout is
/// part of the public contract (index: bits 0–19, version: bits 20–31), so
/// external code may round-trip handles through [`Entity::to_bits`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Entity(u32);

impl Entity {
    pub(crate) fn new(index: u32, version: u32) -> Self {
        debug_assert!(index <= INDEX_MASK);
        debug_assert!(version <= VERSION_MASK);
        Entity(pack(index, version))
    }

    /// The reserved invalid handle, `0xFFFFFFFF`.
    ///
    /// Note that the `(max index, max version)` pattern coincides with this
    /// sentinel; a world that wraps the version of the very last slot would
    /// mint it. This is the version wrap-around limit documented on
    /// [`EntityAllocator::destroy`].
    #[inline]
    pub const fn null() -> Self {
        Entity(u32::MAX)
    }

    /// Returns `true` if this is the invalid sentinel.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    /// Returns the slot index encoded in this handle.
    #[inline]
    pub const fn index(self) -> u32 {
        self.0 & INDEX_MASK
    }

    /// Returns the version encoded in this handle.
    #[inline]
    pub const fn version(self) -> u32 {
        self.0 >> INDEX_BITS
    }

    /// Raw `u32` representation, for serialization and networking.
    #[inline]
    pub const fn to_bits(self) -> u32 {
        self.0
    }

    /// Reconstructs a handle from its raw representation.
    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Entity(bits)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index(), self.version())
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl Default for Entity {
    fn default() -> Self {
        Entity::null()
    }
}

/// Generational entity allocator
///
/// Tracks one version counter per slot. A handle is alive iff its index is
/// within the table and its version equals the slot's current version.
/// Freed indices are recycled LIFO, so destroy-then-create deterministically
/// reuses the most recently freed slot under a fresh version.
#[derive(Default)]
pub struct EntityAllocator {
    versions: Vec<u32>,
    free_list: Vec<u32>,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh entity handle.
    ///
    /// Pops the tail of the free list if one is available, otherwise appends
    /// a new slot with version 0.
    ///
    /// # Errors
    /// Returns [`EcsError::CapacityExhausted`] once all 2^20 slots are live.
    pub fn create(&mut self) -> Result<Entity> {
        if let Some(index) = self.free_list.pop() {
            return Ok(Entity::new(index, self.versions[index as usize]));
        }
        if self.versions.len() >= MAX_ENTITIES {
            return Err(EcsError::CapacityExhausted);
        }
        let index = self.versions.len() as u32;
        self.versions.push(0);
        Ok(Entity::new(index, 0))
    }

    /// Destroys a live entity, invalidating every copy of its handle.
    ///
    /// The slot version is incremented modulo 2^12; after 4096 destructions
    /// of the same slot a long-retained stale handle could alias a fresh one.
    /// That wrap-around is a documented limit of the 32-bit handle layout.
    ///
    /// # Errors
    /// Returns [`EcsError::NotAlive`] if the handle is stale or unknown.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        if !self.is_alive(entity) {
            return Err(EcsError::NotAlive);
        }
        let index = entity.index();
        self.versions[index as usize] = (entity.version() + 1) & VERSION_MASK;
        self.free_list.push(index);
        Ok(())
    }

    /// Returns `true` if the handle's version matches its slot.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.index() as usize;
        index < self.versions.len() && self.versions[index] == entity.version()
    }

    /// Pre-grows the version table's capacity. Never fails; purely a hint.
    pub fn reserve(&mut self, additional: usize) {
        self.versions.reserve(additional);
        self.free_list.reserve(additional);
    }

    /// Number of slots ever allocated (live or free).
    pub fn slot_count(&self) -> usize {
        self.versions.len()
    }

    /// Number of currently live entities.
    pub fn live_count(&self) -> usize {
        self.versions.len() - self.free_list.len()
    }

    /// Number of slots waiting on the free list.
    pub fn recycled_count(&self) -> usize {
        self.free_list.len()
    }
}
