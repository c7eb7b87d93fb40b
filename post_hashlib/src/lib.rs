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

#![crate_name = "post_hashlib"]

//! # PoST Hashlib - Proving Primitives for Proof of Space-Time
//!
//! Building blocks shared by the prover and by tools that inspect proofs.
//!
//! ## Main Items
//!
//! - [`ProvingParams`] - label difficulty and per-unit PoW difficulty
//! - [`DifficultySplit`] - threshold split used by the byte-wise label scan
//! - [`group_key`] / [`nonce_key`] - AES key derivation for nonce groups
//! - [`CipherBackend`] / [`LabelCipher`] - swappable block cipher seam,
//!   [`SoftAes`] being the portable implementation
//! - [`compress_indices`] / [`decompress_indices_exact`] - proof index packing
//!
//! ## Example Usage
//!
//! ```rust
//! use post_hashlib::*;
//!
//! let params = ProvingParams::new(4, 1 << 32, 26, &[0xFF; 32])
//!     .expect("parameters should be valid");
//! assert_eq!(params.difficulty, 26 << 30);
//!
//! let key = group_key(&[0u8; 32], 0, 42);
//! let cipher = SoftAes.new_cipher(&key);
//! let label = [0u8; 16];
//! let out = cipher.encrypt_block(&label);
//! let qualifies = out[0] < params.split().msb;
//! # let _ = qualifies;
//!
//! let packed = compress_indices(&[3, 9, 27], required_bits(1 << 34))
//!     .expect("width should be valid");
//! assert_eq!(packed.len(), 14);
//! ```

mod cipher;
mod difficulty;
mod error;
mod indices;
mod keys;

pub use cipher::{AesLabelCipher, CipherBackend, LabelCipher, SoftAes, BLOCK_SIZE};
pub use difficulty::{
    decode_pow_difficulty, num_labels, proving_difficulty, scale_pow_difficulty,
    DifficultySplit, ProvingParams, LSB_BITS, LSB_MASK,
};
pub use error::{PostHashError, Result};
pub use indices::{compress_indices, decompress_indices, decompress_indices_exact, required_bits};
pub use keys::{
    group_key, group_of, nonce_at, nonce_key, pow_input, NONCES_PER_GROUP, POW_INPUT_LEN,
};
