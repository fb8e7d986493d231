//! Steer Ring - Consistent hashing for backend ownership
//!
//! Maps routing keys to backend endpoints so that keys keep their owner
//! across membership changes, re-homing only ~1/|E| of the key space when
//! one endpoint joins or leaves. The ring is a pure value: built once from
//! a membership set, immutable afterwards, compared by its full virtual
//! node sequence.

mod endpoint;
mod ring;

pub use endpoint::{Endpoint, DEFAULT_PORT};
pub use ring::{HashRing, VIRTUAL_NODES};
