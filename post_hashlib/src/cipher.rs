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

//! Block cipher seam for label encryption.
//!
//! Labels are encrypted as independent 16-byte blocks (no chaining). The
//! prover only needs [`CipherBackend`] and [`LabelCipher`], so a hardware or
//! GPU implementation can be swapped in without touching the scan logic.

use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Block};

/// Size of a cipher block, equal to the size of one label
pub const BLOCK_SIZE: usize = 16;

/// Blocks handed to the cipher in one call so AES-NI can pipeline them
const PAR_BLOCKS: usize = 8;

/// A keyed block cipher applied to runs of labels.
pub trait LabelCipher: Send + Sync {
    /// Encrypts every full 16-byte block of `input` into the same position of
    /// `output`. Trailing bytes that do not form a full block are ignored.
    fn encrypt_blocks(&self, input: &[u8], output: &mut [u8]);

    fn encrypt_block(&self, input: &[u8; 16]) -> [u8; 16] {
        let mut out = [0u8; 16];
        self.encrypt_blocks(input, &mut out);
        out
    }
}

/// Factory for keyed label ciphers.
pub trait CipherBackend: Send + Sync {
    fn name(&self) -> &'static str;
    fn new_cipher(&self, key: &[u8; 16]) -> Box<dyn LabelCipher>;
}

/// Portable AES-128 backend. The `aes` crate selects AES-NI or ARMv8 crypto
/// extensions at runtime and falls back to a constant time software path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftAes;

impl CipherBackend for SoftAes {
    fn name(&self) -> &'static str {
        "aes"
    }

    fn new_cipher(&self, key: &[u8; 16]) -> Box<dyn LabelCipher> {
        Box::new(AesLabelCipher::new(key))
    }
}

pub struct AesLabelCipher {
    aes: Aes128,
}

impl AesLabelCipher {
    pub fn new(key: &[u8; 16]) -> Self {
        Self {
            aes: Aes128::new(&(*key).into()),
        }
    }
}

impl LabelCipher for AesLabelCipher {
    fn encrypt_blocks(&self, input: &[u8], output: &mut [u8]) {
        let len = input.len().min(output.len()) / BLOCK_SIZE * BLOCK_SIZE;
        let (input, output) = (&input[..len], &mut output[..len]);

        let chunk = BLOCK_SIZE * PAR_BLOCKS;
        let mut par = [Block::default(); PAR_BLOCKS];
        let mut src_chunks = input.chunks_exact(chunk);
        let mut dst_chunks = output.chunks_exact_mut(chunk);
        for (src, dst) in (&mut src_chunks).zip(&mut dst_chunks) {
            for (block, label) in par.iter_mut().zip(src.chunks_exact(BLOCK_SIZE)) {
                block.copy_from_slice(label);
            }
            self.aes.encrypt_blocks(&mut par);
            for (block, out) in par.iter().zip(dst.chunks_exact_mut(BLOCK_SIZE)) {
                out.copy_from_slice(block);
            }
        }

        let tail = src_chunks
            .remainder()
            .chunks_exact(BLOCK_SIZE)
            .zip(dst_chunks.into_remainder().chunks_exact_mut(BLOCK_SIZE));
        for (src, dst) in tail {
            self.aes
                .encrypt_block_b2b(Block::from_slice(src), Block::from_mut_slice(dst));
        }
    }
}
