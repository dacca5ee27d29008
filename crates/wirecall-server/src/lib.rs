//! wirecall server library entry.
//!
//! This crate wires the transports, the per-connection dispatch engine, the
//! correlation table, and the built-in actions into an axum application. It
//! is consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod correlation;
pub mod dispatch;
pub mod ops;
pub mod router;
pub mod services;
pub mod transport;
