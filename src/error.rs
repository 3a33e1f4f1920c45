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

//! Error types

use std::fmt;

/// ECS error type
///
/// Every variant is a programmer error, not an environmental one.
/// Nothing is retried or recovered internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcsError {
    /// Entity handle is stale or was never allocated
    NotAlive,

    /// Component absent on a live entity
    NotPresent,

    /// Singleton accessor found `count` components instead of exactly one
    SingletonViolation {
        /// Actual number of components in the pool
        count: usize,
    },

    /// `destroy_entity` called on a handle that is not alive
    DoubleDestroy,

    /// Entity index space (2^20 slots) exhausted
    CapacityExhausted,
}

impl fmt::Display for EcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcsError::NotAlive => write!(f, "Entity is not alive"),
            EcsError::NotPresent => write!(f, "Component not present on entity"),
            EcsError::SingletonViolation { count } => {
                write!(f, "Singleton violation: pool holds {count} components")
            }
            EcsError::DoubleDestroy => write!(f, "Entity already destroyed"),
            EcsError::CapacityExhausted => write!(f, "Entity index space exhausted"),
        }
    }
}

impl std::error::Error for EcsError {}

/// Result type alias
pub type Result<T> = std::result::Result<T, EcsError>;
