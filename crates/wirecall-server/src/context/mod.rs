//! Per-connection context types shared across layers.
//!
//! `CallContext` is built once when a physical connection is accepted and
//! handed to every action executed on it. Embedding applications attach
//! their own policy (authentication, tenancy, ...) through a `ContextHook`.

pub mod call;

pub use call::{establish, Attributes, CallContext, ContextHook, TransportKind};
