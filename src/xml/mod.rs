//! XML handling for storage REST API responses.

pub mod deserialize;

pub use deserialize::*;
