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

//! Shared fixtures for unit tests.

use crate::keyring::NonceGroupKeyring;
use crate::pow::MockPowOracle;
use post_datafile::segment_file_name;
use post_hashlib::{CipherBackend, LabelCipher, ProvingParams};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cipher that leaves labels untouched, so tests control the output bytes.
pub struct Identity;

impl LabelCipher for Identity {
    fn encrypt_blocks(&self, input: &[u8], output: &mut [u8]) {
        let len = input.len().min(output.len()) / 16 * 16;
        output[..len].copy_from_slice(&input[..len]);
    }
}

pub struct IdentityBackend;

impl CipherBackend for IdentityBackend {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn new_cipher(&self, _key: &[u8; 16]) -> Box<dyn LabelCipher> {
        Box::new(Identity)
    }
}

/// Keyring over `nonces` with identity ciphers and pow 0 for every group.
pub fn identity_keyring(nonces: Range<u64>) -> NonceGroupKeyring {
    let mut oracle = MockPowOracle::new();
    oracle.expect_prove().returning(|_, _| Ok(0));
    let params = ProvingParams::new(1, 1 << 20, 26, &[0xFF; 32]).unwrap();
    NonceGroupKeyring::new(
        &[0; 32],
        nonces,
        &params,
        &[0; 32],
        &oracle,
        Arc::new(IdentityBackend),
        &CancellationToken::new(),
        None,
    )
    .unwrap()
}

/// Splits `data` into `postdata_<n>.bin` files of `max_file_size` bytes.
pub fn write_plot(dir: &Path, data: &[u8], max_file_size: usize) {
    for (id, chunk) in data.chunks(max_file_size).enumerate() {
        std::fs::write(dir.join(segment_file_name(id as u64)), chunk).unwrap();
    }
}
