//! # Save Protocol
//!
//! Versioned, positional binary encoding for save streams.
//!
//! ## Format
//!
//! ```text
//! [4 bytes: i32 leading value]
//!     negative  -> versioned stream, version = -value
//!     otherwise -> legacy stream, version 0, value = entity count
//! [fields...]   little endian, read back in the order they were written
//! ```
//!
//! A field introduced in version N is only present when the stream version
//! is at least N. Writers always emit [`SAVE_VERSION`]; readers accept any
//! version up to the maximum they were opened with.

use thiserror::Error;

use crate::math::{Color, Quaternion, Transform, Vec3};

/// Current (maximum) save format version.
pub const SAVE_VERSION: i32 = 6;

/// Errors raised while decoding a save stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The stream ended before a field could be read.
    #[error("unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes the field needs.
        needed: usize,
        /// Bytes left in the stream.
        remaining: usize,
    },

    /// The stream was written by a newer format than this build understands.
    #[error("unsupported future save version {found} (max {max})")]
    UnsupportedVersion {
        /// Version found in the stream.
        found: i32,
        /// Highest version this reader accepts.
        max: i32,
    },

    /// A length prefix was negative.
    #[error("negative count {0} in stream")]
    NegativeCount(i32),
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Captured state of a seekable random stream.
///
/// Enough to put a ChaCha generator back exactly where it was.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RandomState {
    /// Generator key.
    pub seed: [u8; 32],
    /// Stream id.
    pub stream: u64,
    /// Position within the stream, in 32-bit words.
    pub word_pos: u128,
}

/// Writes a save stream.
///
/// The buffer is reused across saves: call [`reset`](Self::reset) and write
/// again to avoid reallocating.
#[derive(Debug, Default)]
pub struct GameDataWriter {
    buffer: Vec<u8>,
}

impl GameDataWriter {
    /// Creates a writer and emits the leading `-SAVE_VERSION` header.
    #[must_use]
    pub fn new() -> Self {
        let mut writer = Self::headerless();
        writer.write_int(-SAVE_VERSION);
        writer
    }

    /// Creates a writer with no header.
    ///
    /// Used for sub-streams and for hand-built fixtures.
    #[must_use]
    pub const fn headerless() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Clears the buffer (keeping its allocation) and re-emits the header.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.write_int(-SAVE_VERSION);
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Returns the written bytes.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the writer, returning the stream.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Writes an i32.
    #[inline]
    pub fn write_int(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a collection length as an i32.
    #[inline]
    pub fn write_count(&mut self, count: usize) {
        self.write_int(count as i32);
    }

    /// Writes an f32.
    #[inline]
    pub fn write_float(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes three floats.
    pub fn write_vector3(&mut self, value: Vec3) {
        self.write_float(value.x);
        self.write_float(value.y);
        self.write_float(value.z);
    }

    /// Writes four floats, x y z w.
    pub fn write_quaternion(&mut self, value: Quaternion) {
        self.write_float(value.x);
        self.write_float(value.y);
        self.write_float(value.z);
        self.write_float(value.w);
    }

    /// Writes four floats, r g b a.
    pub fn write_color(&mut self, value: Color) {
        self.write_float(value.r);
        self.write_float(value.g);
        self.write_float(value.b);
        self.write_float(value.a);
    }

    /// Writes position, rotation and scale.
    pub fn write_transform(&mut self, value: &Transform) {
        self.write_vector3(value.position);
        self.write_quaternion(value.rotation);
        self.write_vector3(value.scale);
    }

    /// Writes the 32-byte key, the stream id and the word position.
    pub fn write_random_state(&mut self, value: &RandomState) {
        self.buffer.extend_from_slice(&value.seed);
        self.buffer.extend_from_slice(&value.stream.to_le_bytes());
        self.buffer.extend_from_slice(&value.word_pos.to_le_bytes());
    }
}

/// Reads a save stream.
///
/// The version is decoded once from the leading value when the reader is
/// opened; every versioned field decision is made against it.
#[derive(Debug)]
pub struct GameDataReader<'a> {
    buffer: &'a [u8],
    position: usize,
    version: i32,
    legacy_count: Option<usize>,
}

impl<'a> GameDataReader<'a> {
    /// Opens a stream, accepting versions up to [`SAVE_VERSION`].
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnsupportedVersion`] for future versions,
    /// [`ProtocolError::UnexpectedEof`] if the header is missing.
    pub fn open(buffer: &'a [u8]) -> ProtocolResult<Self> {
        Self::open_with_max(buffer, SAVE_VERSION)
    }

    /// Opens a stream, accepting versions up to `max_version`.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_max(buffer: &'a [u8], max_version: i32) -> ProtocolResult<Self> {
        let mut reader = Self {
            buffer,
            position: 0,
            version: 0,
            legacy_count: None,
        };
        let leading = reader.read_int()?;
        if leading >= 0 {
            reader.legacy_count = Some(leading as usize);
        } else {
            reader.version = leading.checked_neg().unwrap_or(i32::MAX);
        }
        if reader.version > max_version {
            return Err(ProtocolError::UnsupportedVersion {
                found: reader.version,
                max: max_version,
            });
        }
        Ok(reader)
    }

    /// Opens a headerless sub-stream at a known version.
    #[must_use]
    pub const fn with_version(buffer: &'a [u8], version: i32) -> Self {
        Self {
            buffer,
            position: 0,
            version,
            legacy_count: None,
        }
    }

    /// Format version of the stream.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> i32 {
        self.version
    }

    /// Entity count carried by the leading value of a legacy stream.
    #[inline]
    #[must_use]
    pub const fn legacy_count(&self) -> Option<usize> {
        self.legacy_count
    }

    /// Returns the number of bytes remaining.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Returns the current read offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    fn take<const N: usize>(&mut self) -> ProtocolResult<[u8; N]> {
        let remaining = self.remaining();
        if remaining < N {
            return Err(ProtocolError::UnexpectedEof {
                needed: N,
                remaining,
            });
        }
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(&self.buffer[self.position..self.position + N]);
        self.position += N;
        Ok(bytes)
    }

    /// Reads an i32.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedEof`] on a truncated stream.
    #[inline]
    pub fn read_int(&mut self) -> ProtocolResult<i32> {
        self.take::<4>().map(i32::from_le_bytes)
    }

    /// Reads a non-negative i32 length prefix.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::NegativeCount`] or a truncation error.
    pub fn read_count(&mut self) -> ProtocolResult<usize> {
        let count = self.read_int()?;
        usize::try_from(count).map_err(|_| ProtocolError::NegativeCount(count))
    }

    /// Reads an f32.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedEof`] on a truncated stream.
    #[inline]
    pub fn read_float(&mut self) -> ProtocolResult<f32> {
        self.take::<4>().map(f32::from_le_bytes)
    }

    /// Reads three floats.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedEof`] on a truncated stream.
    pub fn read_vector3(&mut self) -> ProtocolResult<Vec3> {
        Ok(Vec3::new(self.read_float()?, self.read_float()?, self.read_float()?))
    }

    /// Reads four floats, x y z w.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedEof`] on a truncated stream.
    pub fn read_quaternion(&mut self) -> ProtocolResult<Quaternion> {
        Ok(Quaternion::new(
            self.read_float()?,
            self.read_float()?,
            self.read_float()?,
            self.read_float()?,
        ))
    }

    /// Reads four floats, r g b a.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedEof`] on a truncated stream.
    pub fn read_color(&mut self) -> ProtocolResult<Color> {
        Ok(Color::new(
            self.read_float()?,
            self.read_float()?,
            self.read_float()?,
            self.read_float()?,
        ))
    }

    /// Reads position, rotation and scale.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedEof`] on a truncated stream.
    pub fn read_transform(&mut self) -> ProtocolResult<Transform> {
        Ok(Transform::new(
            self.read_vector3()?,
            self.read_quaternion()?,
            self.read_vector3()?,
        ))
    }

    /// Reads a captured random state.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedEof`] on a truncated stream.
    pub fn read_random_state(&mut self) -> ProtocolResult<RandomState> {
        Ok(RandomState {
            seed: self.take::<32>()?,
            stream: u64::from_le_bytes(self.take::<8>()?),
            word_pos: u128::from_le_bytes(self.take::<16>()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_encodes_version() {
        let writer = GameDataWriter::new();
        assert_eq!(writer.as_slice(), &(-SAVE_VERSION).to_le_bytes());

        let reader = GameDataReader::open(writer.as_slice()).unwrap();
        assert_eq!(reader.version(), SAVE_VERSION);
        assert_eq!(reader.legacy_count(), None);
    }

    #[test]
    fn test_legacy_leading_value_is_count() {
        let mut writer = GameDataWriter::headerless();
        writer.write_int(3);

        let reader = GameDataReader::open(writer.as_slice()).unwrap();
        assert_eq!(reader.version(), 0);
        assert_eq!(reader.legacy_count(), Some(3));
    }

    #[test]
    fn test_future_version_rejected() {
        let mut writer = GameDataWriter::headerless();
        writer.write_int(-(SAVE_VERSION + 1));

        let err = GameDataReader::open(writer.as_slice()).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::UnsupportedVersion {
                found: SAVE_VERSION + 1,
                max: SAVE_VERSION
            }
        );
    }

    #[test]
    fn test_lower_max_rejects_current() {
        let writer = GameDataWriter::new();
        assert!(GameDataReader::open_with_max(writer.as_slice(), 5).is_err());
        assert!(GameDataReader::open_with_max(writer.as_slice(), 7).is_ok());
    }

    #[test]
    fn test_compound_fields_in_order() {
        let state = RandomState {
            seed: [7; 32],
            stream: 3,
            word_pos: u128::from(u64::MAX) + 5,
        };
        let mut writer = GameDataWriter::new();
        writer.write_transform(&Transform::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::IDENTITY,
            Vec3::ONE,
        ));
        writer.write_color(Color::new(0.1, 0.2, 0.3, 0.4));
        writer.write_random_state(&state);
        writer.write_count(2);

        let mut reader = GameDataReader::open(writer.as_slice()).unwrap();
        assert_eq!(reader.read_transform().unwrap().position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(reader.read_color().unwrap(), Color::new(0.1, 0.2, 0.3, 0.4));
        assert_eq!(reader.read_random_state().unwrap(), state);
        assert_eq!(reader.read_count().unwrap(), 2);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_fails() {
        let bytes = [0xFA, 0xFF, 0xFF, 0xFF, 0x00, 0x00];
        let mut reader = GameDataReader::open(&bytes).unwrap();
        assert_eq!(
            reader.read_float().unwrap_err(),
            ProtocolError::UnexpectedEof {
                needed: 4,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_negative_count_is_corrupt() {
        let mut writer = GameDataWriter::new();
        writer.write_int(-4);
        let mut reader = GameDataReader::open(writer.as_slice()).unwrap();
        assert_eq!(reader.read_count().unwrap_err(), ProtocolError::NegativeCount(-4));
    }
}
