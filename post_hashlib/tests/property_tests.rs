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

//! Property-based tests for post_hashlib

use post_hashlib::{
    compress_indices, decompress_indices, decompress_indices_exact, proving_difficulty,
    required_bits, DifficultySplit, LSB_MASK,
};
use proptest::prelude::*;

/// Strategy for a bit width plus indices that fit in it
fn indices_strategy() -> impl Strategy<Value = (usize, Vec<u64>)> {
    (1usize..=64).prop_flat_map(|bits| {
        let max = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
        (Just(bits), prop::collection::vec(0..=max, 0..64))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_exact_roundtrip((bits, indices) in indices_strategy()) {
        let packed = compress_indices(&indices, bits).unwrap();
        prop_assert_eq!(packed.len(), (indices.len() * bits).div_ceil(8));
        let unpacked = decompress_indices_exact(&packed, bits, indices.len()).unwrap();
        prop_assert_eq!(unpacked, indices);
    }

    #[test]
    fn test_plain_decompress_is_prefix_extension((bits, indices) in indices_strategy()) {
        let packed = compress_indices(&indices, bits).unwrap();
        let unpacked = decompress_indices(&packed, bits).unwrap();
        prop_assert!(unpacked.len() >= indices.len());
        prop_assert_eq!(&unpacked[..indices.len()], &indices[..]);
        // padding is zero filled
        prop_assert!(unpacked[indices.len()..].iter().all(|&v| v == 0));
    }

    #[test]
    fn test_required_bits_bounds(value in 1u64..) {
        let bits = required_bits(value);
        prop_assert!(bits >= 1 && bits <= 64);
        prop_assert!(value >> (bits - 1) == 1);
    }

    #[test]
    fn test_difficulty_floor(k1 in 1u32..1000, num_labels in 1001u64..) {
        let d = proving_difficulty(k1, num_labels).unwrap() as u128;
        let exact = (1u128 << 64) * k1 as u128;
        prop_assert!(d * num_labels as u128 <= exact);
        prop_assert!((d + 1) * num_labels as u128 > exact);
    }

    #[test]
    fn test_split_recombines(d in any::<u64>()) {
        let split = DifficultySplit::new(d);
        prop_assert_eq!(((split.msb as u64) << 56) | split.lsb, d);
        prop_assert!(split.lsb <= LSB_MASK);
    }
}
