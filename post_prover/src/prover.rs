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

//! Proving attempts over successive nonce windows.

use crate::assembler::ProofAssembler;
use crate::config::ProvingConfig;
use crate::error::{ProveError, Result};
use crate::keyring::{validate_nonce_range, NonceGroupKeyring, NONCE_SPACE};
use crate::pow::PowOracle;
use crate::proof::{Proof, MAX_INDICES_LEN};
use crate::scanner::{ScanOptions, ScanPipeline};
use post_datafile::{
    plot_complete, read_metadata, PlotReader, PostMetadata, DEFAULT_BATCH_SIZE, LABEL_SIZE,
};
use post_hashlib::{required_bits, CipherBackend, ProvingParams, SoftAes, NONCES_PER_GROUP};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Default nonces tried per attempt
pub const DEFAULT_NONCES: u32 = 128;

/// Caller imposed bounds on a proving run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProverLimits {
    /// Attempts before giving up, `None` for no bound
    pub max_attempts: Option<u32>,
    /// Wall clock budget for the whole run, `None` for no bound
    pub timeout: Option<Duration>,
}

/// Proves possession of the plot in one data directory.
///
/// Each attempt derives a fresh keyring for its nonce window, re-reads the
/// whole plot and either returns a proof or reports [`ProveError::NotFound`],
/// in which case the next disjoint window is tried. Every other error ends
/// the run.
pub struct Prover {
    data_dir: PathBuf,
    metadata: PostMetadata,
    params: ProvingParams,
    k2: u32,
    num_labels: u64,
    plot_size: u64,
    nonces: u32,
    batch_size: usize,
    scan: ScanOptions,
    limits: ProverLimits,
    oracle: Arc<dyn PowOracle>,
    backend: Arc<dyn CipherBackend>,
}

impl Prover {
    /// Reads the plot metadata in `data_dir` and derives the thresholds.
    pub fn new(
        data_dir: &Path,
        proving: &ProvingConfig,
        oracle: Arc<dyn PowOracle>,
    ) -> Result<Self> {
        let metadata = read_metadata(data_dir)?;
        proving.validate_plot(&metadata)?;
        let params = ProvingParams::new(
            metadata.num_units,
            metadata.labels_per_unit,
            proving.k1,
            &proving.pow_difficulty()?,
        )?;
        let (num_labels, plot_size) = metadata
            .num_labels()
            .zip(metadata.plot_size())
            .ok_or_else(|| ProveError::Configuration("plot size overflows u64".to_owned()))?;

        let packed_len = (proving.k2 as usize * required_bits(num_labels)).div_ceil(8);
        if proving.k2 == 0 || packed_len > MAX_INDICES_LEN {
            return Err(ProveError::Configuration(format!(
                "k2 ({}) must be positive and pack into {} bytes",
                proving.k2, MAX_INDICES_LEN
            )));
        }
        if !plot_complete(data_dir, &metadata)? {
            warn!(
                "plot in {} is incomplete, proving over the labels present",
                data_dir.display()
            );
        }

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            metadata,
            params,
            k2: proving.k2,
            num_labels,
            plot_size,
            nonces: DEFAULT_NONCES,
            batch_size: DEFAULT_BATCH_SIZE,
            scan: ScanOptions::default(),
            limits: ProverLimits::default(),
            oracle,
            backend: Arc::new(SoftAes),
        })
    }

    /// Nonces per attempt, a non-zero multiple of 16.
    pub fn with_nonces(mut self, nonces: u32) -> Result<Self> {
        if nonces == 0 || nonces % NONCES_PER_GROUP != 0 {
            return Err(ProveError::InvalidNonceRange {
                start: 0,
                end: u64::from(nonces),
            });
        }
        self.nonces = nonces;
        Ok(self)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 || batch_size as u64 % LABEL_SIZE != 0 {
            return Err(ProveError::Configuration(format!(
                "batch size {} is not a positive multiple of {}",
                batch_size, LABEL_SIZE
            )));
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_limits(mut self, limits: ProverLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cipher_backend(mut self, backend: Arc<dyn CipherBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn params(&self) -> &ProvingParams {
        &self.params
    }

    pub fn metadata(&self) -> &PostMetadata {
        &self.metadata
    }

    pub fn num_labels(&self) -> u64 {
        self.num_labels
    }

    pub fn k2(&self) -> u32 {
        self.k2
    }

    pub fn cipher_backend(&self) -> &dyn CipherBackend {
        self.backend.as_ref()
    }

    /// Runs attempts from `start_nonce` until a proof is found or a limit,
    /// cancellation or terminal error stops the run.
    ///
    /// The window that reaches the top of the nonce space is shortened to
    /// end at [`NONCE_SPACE`], so every nonce from `start_nonce` up to
    /// `u32::MAX` gets tried before the run reports exhaustion.
    pub fn generate_proof(
        &self,
        challenge: &[u8; 32],
        start_nonce: u32,
        cancel: &CancellationToken,
    ) -> Result<Proof> {
        let deadline = self.limits.timeout.map(|timeout| Instant::now() + timeout);
        let mut start = u64::from(start_nonce);
        let mut attempts = 0u32;
        info!(
            "proving {} labels with k2={} using the {} cipher backend",
            self.num_labels,
            self.k2,
            self.backend.name()
        );
        loop {
            if cancel.is_cancelled() {
                return Err(ProveError::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ProveError::DeadlineExceeded);
            }
            if let Some(max) = self.limits.max_attempts {
                if attempts >= max {
                    return Err(ProveError::AttemptsExhausted { attempts });
                }
            }
            if start >= NONCE_SPACE {
                return Err(ProveError::Configuration(format!(
                    "nonce space exhausted after {} attempts",
                    attempts
                )));
            }
            let end = (start + u64::from(self.nonces)).min(NONCE_SPACE);
            let window = start..end;
            validate_nonce_range(&window)?;

            attempts += 1;
            info!("attempt {}: nonces {}..{}", attempts, start, end);
            let started = Instant::now();
            match self.prove_window(challenge, window, cancel, deadline) {
                Ok(proof) => {
                    info!(
                        "proof found: nonce {} after {} attempts in {:.2}s",
                        proof.nonce,
                        attempts,
                        started.elapsed().as_secs_f64()
                    );
                    return Ok(proof);
                }
                Err(e) if e.is_retryable() => {
                    info!(
                        "{} after {:.2}s, moving to the next window",
                        e,
                        started.elapsed().as_secs_f64()
                    );
                    start = end;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One attempt over `nonces` with its own keyring and cancellation scope.
    pub fn prove_window(
        &self,
        challenge: &[u8; 32],
        nonces: Range<u64>,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<Proof> {
        validate_nonce_range(&nonces)?;
        // segment files may hold more than the metadata declares
        let reader = PlotReader::open(
            &self.data_dir,
            self.metadata.max_file_size,
            self.batch_size,
        )?
        .with_limit(self.plot_size);
        let attempt = cancel.child_token();
        let keyring = NonceGroupKeyring::new(
            challenge,
            nonces,
            &self.params,
            &self.metadata.node_id,
            self.oracle.as_ref(),
            Arc::clone(&self.backend),
            &attempt,
            deadline,
        )?;

        let assembler = ProofAssembler::new(self.k2, attempt.clone());
        let report = ScanPipeline::new(&keyring, &assembler, self.params.split(), &self.scan)
            .with_deadline(deadline)
            .run(reader, &attempt)?;

        if assembler.has_winner() {
            return assembler.finalize(&keyring, self.num_labels);
        }
        if cancel.is_cancelled() {
            return Err(ProveError::Cancelled);
        }
        if report.deadline_hit {
            return Err(ProveError::DeadlineExceeded);
        }
        assembler.finalize(&keyring, self.num_labels)
    }
}
