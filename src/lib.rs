//! Infraflow: prompt-driven infrastructure change orchestration.
//!
//! Turns a natural-language change request into generated
//! infrastructure-as-code, computes a plan, holds it for operator approval,
//! applies it, and optionally commits the code to version control. Only one
//! workflow may change a project's infrastructure at a time.
//!
//! # Architecture
//!
//! Infraflow follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, scripted doubles)
//!
//! # Modules
//!
//! - [`workflow`]: Change workflow domain, supervisor, and adapters
//! - [`config`]: TOML configuration
//! - [`telemetry`]: Tracing subscriber installation

pub mod config;
pub mod telemetry;
pub mod workflow;
