//! Domain layer: entities and hierarchy rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod entities;
pub mod error;

pub use arena::{Hierarchy, PostOrderIterator, PreOrderIterator};
pub use entities::{Member, MemberStatus, Topology};
pub use error::{DomainError, DomainResult};
