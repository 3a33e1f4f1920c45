//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use sparse_ecs::prelude::*;
//! ```

pub use crate::command::CommandBuffer;
pub use crate::component::Component;
pub use crate::entity::Entity;
pub use crate::error::{EcsError, Result};
pub use crate::pool::Pool;
pub use crate::view::View;
pub use crate::world::{EntityMut, World};
