//! HTTP surface: the exposition endpoint and its operational siblings.

pub mod server;
pub mod v0;

pub use server::SharedState;
