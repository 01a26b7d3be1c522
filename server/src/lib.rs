//! Pendulum coordination server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod api;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod state;
pub mod store;
pub mod ws;
