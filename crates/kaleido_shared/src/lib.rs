//! # Kaleido Shared
//!
//! Value types and the save protocol used by every Kaleido crate.
//!
//! ## Contents
//!
//! - `math`: vectors, quaternions, transforms and colors
//! - `protocol`: the versioned binary reader/writer pair

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod math;
pub mod protocol;

pub use math::{Color, Quaternion, Transform, Vec3};
pub use protocol::{
    GameDataReader, GameDataWriter, ProtocolError, ProtocolResult, RandomState, SAVE_VERSION,
};
