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

//! Label and proof-of-work difficulty derivation.
//!
//! A label qualifies for a nonce when the 8-byte prefix of its AES output,
//! read as an integer, falls below [`ProvingParams::difficulty`]. The cipher
//! output is inspected one byte at a time, so the threshold is split into a
//! most significant byte and a 56-bit remainder (see [`DifficultySplit`]).

use crate::error::{PostHashError, Result};
use primitive_types::U256;

/// Bits held by the remainder part of a split difficulty
pub const LSB_BITS: u32 = 56;
/// Mask selecting the low 56 bits of a label prefix
pub const LSB_MASK: u64 = (1 << LSB_BITS) - 1;

/// Thresholds derived once per proving attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvingParams {
    /// Label difficulty, `floor(2^64 * k1 / num_labels)`
    pub difficulty: u64,
    /// Global PoW difficulty divided by the number of space units (big-endian)
    pub pow_difficulty: [u8; 32],
}

impl ProvingParams {
    pub fn new(
        num_units: u32,
        labels_per_unit: u64,
        k1: u32,
        pow_difficulty: &[u8; 32],
    ) -> Result<Self> {
        let num_labels = num_labels(num_units, labels_per_unit)?;
        Ok(Self {
            difficulty: proving_difficulty(k1, num_labels)?,
            pow_difficulty: scale_pow_difficulty(pow_difficulty, num_units)?,
        })
    }

    pub fn split(&self) -> DifficultySplit {
        DifficultySplit::new(self.difficulty)
    }
}

/// Total number of 16-byte labels in a plot.
pub fn num_labels(num_units: u32, labels_per_unit: u64) -> Result<u64> {
    labels_per_unit
        .checked_mul(num_units as u64)
        .ok_or_else(|| {
            PostHashError::Overflow(format!(
                "{} units of {} labels exceed u64",
                num_units, labels_per_unit
            ))
        })
}

/// Computes `floor(2^64 * k1 / num_labels)` exactly.
///
/// Fails when `num_labels` is zero or not larger than `k1`, since the result
/// would not fit a u64 (or would make every label qualify).
pub fn proving_difficulty(k1: u32, num_labels: u64) -> Result<u64> {
    if k1 == 0 {
        return Err(PostHashError::InvalidParameters(
            "k1 must be greater than zero".to_owned(),
        ));
    }
    if num_labels == 0 {
        return Err(PostHashError::InvalidParameters(
            "plot holds no labels".to_owned(),
        ));
    }
    if num_labels <= k1 as u64 {
        return Err(PostHashError::InvalidParameters(format!(
            "number of labels ({}) must be bigger than k1 ({})",
            num_labels, k1
        )));
    }
    let difficulty = ((1u128 << 64) * k1 as u128) / num_labels as u128;
    Ok(difficulty as u64)
}

/// Divides a big-endian 256-bit PoW difficulty by the number of space units.
pub fn scale_pow_difficulty(difficulty: &[u8; 32], num_units: u32) -> Result<[u8; 32]> {
    let scaled = U256::from_big_endian(difficulty)
        .checked_div(U256::from(num_units))
        .ok_or_else(|| {
            PostHashError::InvalidParameters("number of units must be greater than zero".to_owned())
        })?;
    let mut out = [0u8; 32];
    scaled.to_big_endian(&mut out);
    Ok(out)
}

/// Parses a 64-character hex PoW difficulty.
pub fn decode_pow_difficulty(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))?;
    bytes.as_slice().try_into().map_err(|_| {
        PostHashError::InvalidParameters(format!(
            "pow difficulty must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}

/// Difficulty split into the threshold for the first output byte and the
/// threshold for the following 56 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultySplit {
    pub msb: u8,
    pub lsb: u64,
}

impl DifficultySplit {
    pub fn new(difficulty: u64) -> Self {
        Self {
            msb: (difficulty >> LSB_BITS) as u8,
            lsb: difficulty & LSB_MASK,
        }
    }

    /// Checks the 56-bit remainder of a label prefix given as the first 8
    /// bytes of a cipher output block (little endian).
    #[inline]
    pub fn lsb_passes(&self, block: &[u8; 16]) -> bool {
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&block[..8]);
        (u64::from_le_bytes(prefix) & LSB_MASK) < self.lsb
    }
}
