//! Adapter implementations for workflow ports.

pub mod memory;
pub mod postgres;
pub mod scripted;
