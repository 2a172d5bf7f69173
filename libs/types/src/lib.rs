//! Types library for the price feed pipeline
//!
//! Core type definitions shared by the feed server, the wire codec and the
//! client-side buffering and P&L layers.
//!
//! # Modules
//! - `directory`: Symbol directory sent once per connection
//! - `record`: Update records (7 fields) and enriched records (9 fields)
//! - `position`: Held positions and portfolio aggregates
//! - `numeric`: Fixed-point scaling helpers
//! - `reference`: Static reference table that seeds a session
//! - `errors`: Error taxonomy

pub mod directory;
pub mod errors;
pub mod numeric;
pub mod position;
pub mod record;
pub mod reference;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::directory::*;
    pub use crate::errors::*;
    pub use crate::numeric::*;
    pub use crate::position::*;
    pub use crate::record::*;
    pub use crate::reference::*;
}
