//! Request authentication for the storage REST APIs.

mod shared_key;

pub use shared_key::*;
