//! Top-level facade crate for wirecall.
//!
//! Re-exports the protocol core and the server runtime so users can depend on a single crate.

pub mod core {
    pub use wirecall_core::*;
}

pub mod server {
    pub use wirecall_server::*;
}
