//! Protocol modules (envelope + framing).
//!
//! - `envelope`: the JSON control message exchanged in both directions.
//! - `rpc_error`: the structured error carried by error responses.
//! - `frame`: length-prefixed frames on a byte stream.
//! - `attachment`: 16-character attachment ids and the control/attachment
//!   assembler.
//! - `codec`: envelope encoder and incremental envelope decoder built on the
//!   two modules above.
//!
//! All parsers are panic-free: malformed input is reported as `WireCallError`
//! instead of panicking or indexing raw buffers.

pub mod attachment;
pub mod codec;
pub mod envelope;
pub mod frame;
pub mod rpc_error;
