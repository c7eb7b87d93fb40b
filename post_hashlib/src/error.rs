// Copyright (c) 2025 Proof of Capacity Consortium
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

/// Error types for the post_hashlib crate
use std::fmt;

/// Main error type for proving parameter and packing operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostHashError {
    /// Parameters that cannot produce a meaningful difficulty
    InvalidParameters(String),
    /// Arithmetic on label counts left the u64 range
    Overflow(String),
    /// Hexadecimal decoding error
    HexDecodeError(String),
    /// Packed index stream does not hold the requested values
    PackedLength {
        expected_bytes: usize,
        actual_bytes: usize,
    },
    /// Bit width outside 1..=64
    InvalidBitWidth(usize),
}

impl fmt::Display for PostHashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostHashError::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
            PostHashError::Overflow(msg) => write!(f, "Arithmetic overflow: {}", msg),
            PostHashError::HexDecodeError(msg) => write!(f, "Hex decode error: {}", msg),
            PostHashError::PackedLength {
                expected_bytes,
                actual_bytes,
            } => write!(
                f,
                "Packed indices have {} bytes, expected {}",
                actual_bytes, expected_bytes
            ),
            PostHashError::InvalidBitWidth(bits) => {
                write!(f, "Bit width {} is outside 1..=64", bits)
            }
        }
    }
}

impl std::error::Error for PostHashError {}

impl From<hex::FromHexError> for PostHashError {
    fn from(err: hex::FromHexError) -> Self {
        PostHashError::HexDecodeError(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, PostHashError>;
