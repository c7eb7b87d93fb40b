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

//! Proof of work oracle.
//!
//! Every group of 16 nonces needs a PoW value before its AES key can be
//! derived, which makes grinding over nonces expensive. The prover only
//! depends on [`PowOracle`]; the search itself lives behind it.

use post_hashlib::POW_INPUT_LEN;
use std::sync::Mutex;
use thiserror::Error;

/// Bytes of the oracle input reserved for the search counter
pub const COUNTER_LEN: usize = 7;

#[derive(Debug, Error)]
pub enum PowError {
    #[error("proof of work not found")]
    NotFound,
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Finds a `u64` that satisfies `difficulty` for a 48-byte input.
///
/// Implementations may be non-reentrant; wrap them in [`SerializedOracle`]
/// when calls must not overlap.
#[cfg_attr(test, mockall::automock)]
pub trait PowOracle: Send + Sync {
    fn prove(&self, input: &[u8; POW_INPUT_LEN], difficulty: &[u8; 32]) -> Result<u64, PowError>;
}

/// Brute force search over the 7-byte counter prefix of `input`.
///
/// A counter qualifies when its hash, compared big-endian, is below
/// `difficulty`.
pub fn search_counter<F>(
    input: &[u8; POW_INPUT_LEN],
    difficulty: &[u8; 32],
    mut hash: F,
) -> Result<u64, PowError>
where
    F: FnMut(&[u8; POW_INPUT_LEN]) -> Result<[u8; 32], PowError>,
{
    let mut candidate = *input;
    for counter in 0..1u64 << (COUNTER_LEN * 8) {
        candidate[..COUNTER_LEN].copy_from_slice(&counter.to_le_bytes()[..COUNTER_LEN]);
        if hash(&candidate)?.as_slice() < difficulty.as_slice() {
            return Ok(counter);
        }
    }
    Err(PowError::NotFound)
}

/// Portable oracle hashing the input with BLAKE3.
///
/// Useful for local testing and benchmarking; networks that require RandomX
/// need [`RandomXOracle`] (feature `randomx`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Oracle;

impl Blake3Oracle {
    pub fn verify(
        &self,
        pow: u64,
        input: &[u8; POW_INPUT_LEN],
        difficulty: &[u8; 32],
    ) -> bool {
        let mut candidate = *input;
        candidate[..COUNTER_LEN].copy_from_slice(&pow.to_le_bytes()[..COUNTER_LEN]);
        pow >> (COUNTER_LEN * 8) == 0
            && blake3::hash(&candidate).as_bytes().as_slice() < difficulty.as_slice()
    }
}

impl PowOracle for Blake3Oracle {
    fn prove(&self, input: &[u8; POW_INPUT_LEN], difficulty: &[u8; 32]) -> Result<u64, PowError> {
        search_counter(input, difficulty, |candidate| {
            Ok(*blake3::hash(candidate).as_bytes())
        })
    }
}

/// Serializes calls into an oracle that must not run concurrently.
pub struct SerializedOracle<O> {
    inner: Mutex<O>,
}

impl<O: PowOracle> SerializedOracle<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            inner: Mutex::new(oracle),
        }
    }
}

impl<O: PowOracle> PowOracle for SerializedOracle<O> {
    fn prove(&self, input: &[u8; POW_INPUT_LEN], difficulty: &[u8; 32]) -> Result<u64, PowError> {
        let oracle = self
            .inner
            .lock()
            .map_err(|e| PowError::Internal(e.to_string().into()))?;
        oracle.prove(input, difficulty)
    }
}

#[cfg(feature = "randomx")]
pub use randomx::RandomXOracle;

#[cfg(feature = "randomx")]
mod randomx {
    use super::{search_counter, PowError, PowOracle};
    use post_hashlib::POW_INPUT_LEN;
    use randomx_rs::{RandomXCache, RandomXFlag, RandomXVM};

    /// Cache key shared by every prover on the network
    pub const RANDOMX_CACHE_KEY: &[u8] = b"spacemesh-randomx-cache-key";

    /// RandomX in light mode. The cache is built once, each call gets its
    /// own VM so the oracle can be shared between threads.
    pub struct RandomXOracle {
        flags: RandomXFlag,
        cache: RandomXCache,
    }

    impl RandomXOracle {
        pub fn new() -> Result<Self, PowError> {
            let flags = RandomXFlag::get_recommended_flags();
            info!("initializing RandomX cache, flags={:?}", flags);
            let cache = RandomXCache::new(flags, RANDOMX_CACHE_KEY)
                .map_err(|e| PowError::Internal(Box::new(e)))?;
            Ok(Self { flags, cache })
        }
    }

    impl PowOracle for RandomXOracle {
        fn prove(
            &self,
            input: &[u8; POW_INPUT_LEN],
            difficulty: &[u8; 32],
        ) -> Result<u64, PowError> {
            let vm = RandomXVM::new(self.flags, Some(self.cache.clone()), None)
                .map_err(|e| PowError::Internal(Box::new(e)))?;
            search_counter(input, difficulty, |candidate| {
                let hash = vm
                    .calculate_hash(candidate)
                    .map_err(|e| PowError::Internal(Box::new(e)))?;
                hash.try_into()
                    .map_err(|_| PowError::Internal("RandomX hash is not 32 bytes".into()))
            })
        }
    }
}
