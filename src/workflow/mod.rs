//! Change workflow orchestration.
//!
//! A change request moves through code generation, planning, an operator
//! approval gate, apply, and an optional version-control sync. The module
//! follows hexagonal architecture:
//!
//! - Domain types and the stage transition table in [`domain`]
//! - Adapter and storage contracts in [`ports`]
//! - In-memory, scripted, and `PostgreSQL` implementations in [`adapters`]
//! - The supervisor, project locks, and stage driver in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
