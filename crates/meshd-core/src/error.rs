//! Frame codec error types.

/// Errors produced while decoding a routing frame.
///
/// Decode errors are never fatal to the daemon; the caller discards the
/// datagram and bumps a counter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("unknown frame type: {0}")]
    UnknownFrameType(u8),

    #[error("frame truncated: need {min} bytes, got {actual}")]
    Truncated { min: usize, actual: usize },

    #[error("varint longer than 10 bytes or missing terminator")]
    VarintMalformed,

    #[error("varint value {0} exceeds u32 range")]
    VarintOutOfRange(u64),

    #[error("declared payload length {declared} does not match {actual} available bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("frame has {0} trailing bytes after payload")]
    TrailingBytes(usize),
}
