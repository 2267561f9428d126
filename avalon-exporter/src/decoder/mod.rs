//! Section decoders, one per telemetry facet.
//!
//! Each decoder is independent and best-effort: a missing section yields an
//! empty result and a field that cannot be parsed is simply omitted, so a
//! malformed facet never prevents the others from being decoded.

mod chips;
mod device;
mod pools;
mod version;

pub use chips::decode_chips;
pub use device::decode_device;
pub use pools::decode_pools;
pub use version::decode_version;
