//! Data models for the docman client.
//!
//! Wire structs match the remote document management service field for field.

mod category;
mod document;
mod message;
mod tag;

pub use category::*;
pub use document::*;
pub use message::*;
pub use tag::*;
