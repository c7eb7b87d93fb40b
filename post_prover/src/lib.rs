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

//! # PoST Prover
//!
//! Generates proofs of space-time over a plot of AES labels. Each attempt
//! covers a window of nonces: the PoW oracle is run once per group of 16
//! nonces, the plot is streamed through a reader thread into a pool of
//! workers, and the first nonce collecting `k2` qualifying labels wins.
//!
//! ```ignore
//! use post_prover::{Blake3Oracle, Prover, ProverLimits, ProvingConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! let prover = Prover::new(data_dir, &ProvingConfig::default(), Arc::new(Blake3Oracle))?
//!     .with_limits(ProverLimits {
//!         max_attempts: Some(10),
//!         timeout: None,
//!     });
//! let proof = prover.generate_proof(&challenge, 0, &CancellationToken::new())?;
//! let wire = proof.to_bytes()?;
//! ```

#[macro_use]
extern crate log;

mod assembler;
mod buffer;
pub mod config;
mod error;
mod hasher;
mod keyring;
pub mod logger;
pub mod pow;
mod proof;
mod prover;
mod scanner;
#[cfg(test)]
mod test_utils;
mod utils;
pub mod verify;

pub use assembler::ProofAssembler;
pub use buffer::BufferPool;
pub use config::{load_cfg, validate_cfg, Cfg, PowBackend, ProvingConfig};
pub use error::{ProveError, Result};
pub use hasher::{scan_batch, ScanOutcome};
pub use keyring::{validate_nonce_range, GroupCipher, NonceGroupKeyring, NONCE_SPACE};
pub use pow::{Blake3Oracle, PowError, PowOracle, SerializedOracle};
#[cfg(feature = "randomx")]
pub use pow::RandomXOracle;
pub use proof::{Proof, MAX_INDICES_LEN};
pub use prover::{Prover, ProverLimits, DEFAULT_NONCES};
pub use scanner::{ScanOptions, ScanPipeline, ScanReport, DEFAULT_QUEUE_DEPTH};
pub use utils::{new_thread_pool, worker_count};
pub use verify::check_proof;
