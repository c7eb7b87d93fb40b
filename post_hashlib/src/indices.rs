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

//! Bit packing of proof indices.
//!
//! Each index keeps its low `keep_bits` bits. The streams are concatenated
//! least significant bit first and bit 0 of every output byte holds the
//! earliest bit. The final byte is zero padded.

use crate::error::{PostHashError, Result};

/// Number of bits needed to represent `value` (0 for 0).
pub fn required_bits(value: u64) -> usize {
    (u64::BITS - value.leading_zeros()) as usize
}

/// Packs `indices` with `keep_bits` bits each.
pub fn compress_indices(indices: &[u64], keep_bits: usize) -> Result<Vec<u8>> {
    check_width(keep_bits)?;
    let mut out = vec![0u8; (indices.len() * keep_bits).div_ceil(8)];
    let mask = width_mask(keep_bits);

    let mut bit_pos = 0;
    for &index in indices {
        let mut value = index & mask;
        let mut remaining = keep_bits;
        while remaining > 0 {
            let shift = bit_pos % 8;
            let take = (8 - shift).min(remaining);
            out[bit_pos / 8] |= ((value & ((1 << take) - 1)) as u8) << shift;
            value >>= take;
            bit_pos += take;
            remaining -= take;
        }
    }
    Ok(out)
}

/// Unpacks every whole `keep_bits` run in `bytes`.
///
/// Yields `bytes.len() * 8 / keep_bits` values, so padding bits can surface
/// as a spurious trailing value. Use [`decompress_indices_exact`] when the
/// number of packed values is known.
pub fn decompress_indices(bytes: &[u8], keep_bits: usize) -> Result<Vec<u64>> {
    check_width(keep_bits)?;
    let count = bytes.len() * 8 / keep_bits;
    Ok(unpack(bytes, keep_bits, count))
}

/// Unpacks exactly `count` values and rejects a stream of the wrong length.
pub fn decompress_indices_exact(bytes: &[u8], keep_bits: usize, count: usize) -> Result<Vec<u64>> {
    check_width(keep_bits)?;
    let expected_bytes = (count * keep_bits).div_ceil(8);
    if bytes.len() != expected_bytes {
        return Err(PostHashError::PackedLength {
            expected_bytes,
            actual_bytes: bytes.len(),
        });
    }
    Ok(unpack(bytes, keep_bits, count))
}

fn unpack(bytes: &[u8], keep_bits: usize, count: usize) -> Vec<u64> {
    let mut indices = Vec::with_capacity(count);
    let mut bit_pos = 0;
    for _ in 0..count {
        let mut value = 0u64;
        let mut filled = 0;
        while filled < keep_bits {
            let shift = bit_pos % 8;
            let take = (8 - shift).min(keep_bits - filled);
            let bits = (bytes[bit_pos / 8] >> shift) as u64 & ((1 << take) - 1);
            value |= bits << filled;
            filled += take;
            bit_pos += take;
        }
        indices.push(value);
    }
    indices
}

fn check_width(keep_bits: usize) -> Result<()> {
    if keep_bits == 0 || keep_bits > 64 {
        return Err(PostHashError::InvalidBitWidth(keep_bits));
    }
    Ok(())
}

fn width_mask(keep_bits: usize) -> u64 {
    if keep_bits == 64 {
        u64::MAX
    } else {
        (1 << keep_bits) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN: [u64; 4] = [0, 0xFFF5, 0, 0xFF0F];

    #[test]
    fn test_required_bits() {
        assert_eq!(required_bits(0), 0);
        assert_eq!(required_bits(1), 1);
        assert_eq!(required_bits(255), 8);
        assert_eq!(required_bits(256), 9);
        assert_eq!(required_bits(1 << 34), 35);
        assert_eq!(required_bits(u64::MAX), 64);
    }

    #[test]
    fn test_golden_16_bits() {
        let packed = compress_indices(&GOLDEN, 16).unwrap();
        assert_eq!(packed, [0x00, 0x00, 0xF5, 0xFF, 0x00, 0x00, 0x0F, 0xFF]);
        assert_eq!(decompress_indices(&packed, 16).unwrap(), GOLDEN);
    }

    #[test]
    fn test_golden_35_bits() {
        let packed = compress_indices(&GOLDEN, 35).unwrap();
        assert_eq!(
            packed,
            [0, 0, 0, 0, 168, 255, 7, 0, 0, 0, 0, 0, 0, 30, 254, 1, 0, 0]
        );
        assert_eq!(decompress_indices_exact(&packed, 35, 4).unwrap(), GOLDEN);
    }

    #[test]
    fn test_high_bits_are_dropped() {
        let packed = compress_indices(&[0x1FF], 8).unwrap();
        assert_eq!(packed, [0xFF]);
    }

    #[test]
    fn test_spurious_trailing_value() {
        let packed = compress_indices(&[5], 3).unwrap();
        assert_eq!(packed.len(), 1);
        assert_eq!(decompress_indices(&packed, 3).unwrap(), [5, 0]);
        assert_eq!(decompress_indices_exact(&packed, 3, 1).unwrap(), [5]);
    }

    #[test]
    fn test_full_width() {
        let values = [u64::MAX, 0, 0x0123_4567_89AB_CDEF];
        let packed = compress_indices(&values, 64).unwrap();
        assert_eq!(packed.len(), 24);
        assert_eq!(decompress_indices(&packed, 64).unwrap(), values);
    }

    #[test]
    fn test_invalid_width_and_length() {
        assert_eq!(
            compress_indices(&[1], 0),
            Err(PostHashError::InvalidBitWidth(0))
        );
        assert!(decompress_indices(&[0], 65).is_err());
        assert_eq!(
            decompress_indices_exact(&[0; 17], 35, 4),
            Err(PostHashError::PackedLength {
                expected_bytes: 18,
                actual_bytes: 17
            })
        );
    }
}
