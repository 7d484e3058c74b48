//! Dense display ordering within position groups.
//!
//! # Responsibility
//! - Derive which group an item or task belongs to (`group`).
//! - Compute append positions and density-preserving shifts (`position`).
//!
//! # Invariants
//! - Positions of live group members form a dense permutation of `0..len`.

pub mod group;
pub mod position;
