//! Multi-level sponsor tree with commission distribution.
//!
//! Layers, innermost first: `domain` (hierarchy rules), `application`
//! (commission, ranking, persistence), `infrastructure` (I/O and wiring),
//! `cli`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;
