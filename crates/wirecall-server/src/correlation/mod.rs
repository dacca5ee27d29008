//! Expiring correlation table for server-initiated calls.
//!
//! One table per connection. Entries are resolved exactly once: either taken
//! by a matching response or expired by the sweeper.

mod table;

pub use table::{CallKey, CorrelationTable};
