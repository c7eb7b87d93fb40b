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

//! End-to-end proving over plots written to temporary directories.

use post_datafile::{segment_file_name, write_metadata, PostMetadata};
use post_hashlib::{CipherBackend, LabelCipher, SoftAes, POW_INPUT_LEN};
use post_prover::{
    check_proof, Blake3Oracle, PowError, PowOracle, ProveError, Prover, ProverLimits,
    ProvingConfig, ScanOptions,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Identity;

impl LabelCipher for Identity {
    fn encrypt_blocks(&self, input: &[u8], output: &mut [u8]) {
        let len = input.len().min(output.len()) / 16 * 16;
        output[..len].copy_from_slice(&input[..len]);
    }
}

struct IdentityBackend;

impl CipherBackend for IdentityBackend {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn new_cipher(&self, _key: &[u8; 16]) -> Box<dyn LabelCipher> {
        Box::new(Identity)
    }
}

/// Returns the group byte as pow and records every group it was asked for.
#[derive(Default)]
struct RecordingOracle {
    groups: Mutex<Vec<u8>>,
}

impl PowOracle for RecordingOracle {
    fn prove(&self, input: &[u8; POW_INPUT_LEN], _difficulty: &[u8; 32]) -> Result<u64, PowError> {
        if let Ok(mut groups) = self.groups.lock() {
            groups.push(input[7]);
        }
        Ok(input[7] as u64)
    }
}

#[derive(Default)]
struct FailingOracle {
    calls: AtomicUsize,
}

impl PowOracle for FailingOracle {
    fn prove(&self, _input: &[u8; POW_INPUT_LEN], _difficulty: &[u8; 32]) -> Result<u64, PowError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(PowError::Internal("device lost".into()))
    }
}

fn write_plot(dir: &Path, labels_per_unit: u64, num_units: u32, labels: &[u8], max_file_size: u64) {
    let meta = PostMetadata {
        node_id: [0x11; 32],
        commitment_atx_id: [0x22; 32],
        labels_per_unit,
        num_units,
        max_file_size,
        nonce: None,
        nonce_value: None,
        last_position: None,
    };
    write_metadata(dir, &meta).unwrap();
    for (id, chunk) in labels.chunks(max_file_size as usize).enumerate() {
        std::fs::write(dir.join(segment_file_name(id as u64)), chunk).unwrap();
    }
}

fn proving(labels_per_unit: u64, k1: u32, k2: u32) -> ProvingConfig {
    ProvingConfig {
        labels_per_unit,
        k1,
        k2,
        k3: k2,
        ..ProvingConfig::default()
    }
}

fn scan_options() -> ScanOptions {
    ScanOptions {
        workers: 3,
        queue_depth: 4,
        ..ScanOptions::default()
    }
}

#[test]
fn test_proof_over_random_plot() {
    let mut labels = vec![0u8; 16 * 4096];
    StdRng::seed_from_u64(7).fill_bytes(&mut labels);
    let dir = TempDir::new().unwrap();
    // three segments, the last one short
    write_plot(dir.path(), 4096, 1, &labels, 16 * 1500);

    let config = proving(4096, 32, 8);
    let prover = Prover::new(dir.path(), &config, Arc::new(Blake3Oracle))
        .unwrap()
        .with_nonces(32)
        .unwrap()
        .with_batch_size(16 * 256)
        .unwrap()
        .with_scan_options(scan_options())
        .with_limits(ProverLimits {
            max_attempts: Some(4),
            timeout: Some(Duration::from_secs(120)),
        });

    let challenge = [0x42; 32];
    let proof = prover
        .generate_proof(&challenge, 0, &CancellationToken::new())
        .unwrap();

    let indices = proof.decode_indices(4096, 8).unwrap();
    assert_eq!(indices.len(), 8);
    assert!(indices.windows(2).all(|w| w[0] < w[1]));
    assert!(indices.iter().all(|&i| i < 4096));

    let checked = check_proof(&proof, &challenge, dir.path(), &config, &SoftAes).unwrap();
    assert_eq!(checked, 8);

    let decoded = post_prover::Proof::from_bytes(&proof.to_bytes().unwrap()).unwrap();
    assert_eq!(decoded, proof);

    // a different challenge does not accept the same indices
    assert!(check_proof(&proof, &[0x43; 32], dir.path(), &config, &SoftAes).is_err());
}

#[test]
fn test_single_qualifying_nonce_is_deterministic() {
    // nonce offset 6 of group 1 is the only one seeing a qualifying byte
    let mut labels = vec![0xFF; 16 * 1024];
    for i in [1000usize, 5, 333, 640, 64] {
        labels[i * 16 + 6] = 0x00;
    }
    let dir = TempDir::new().unwrap();
    write_plot(dir.path(), 512, 2, &labels, 16 * 300);

    let config = proving(512, 26, 5);
    let prove = || {
        Prover::new(dir.path(), &config, Arc::new(RecordingOracle::default()))
            .unwrap()
            .with_cipher_backend(Arc::new(IdentityBackend))
            .with_nonces(16)
            .unwrap()
            .with_batch_size(16 * 32)
            .unwrap()
            .with_scan_options(scan_options())
            .generate_proof(&[0; 32], 16, &CancellationToken::new())
            .unwrap()
    };

    let proof = prove();
    assert_eq!(proof.nonce, 22);
    assert_eq!(proof.pow, 1);
    assert_eq!(proof.decode_indices(1024, 5).unwrap(), [5, 64, 333, 640, 1000]);
    for _ in 0..3 {
        assert_eq!(prove(), proof);
    }
    check_proof(&proof, &[0; 32], dir.path(), &config, &IdentityBackend).unwrap();
}

fn identity_prover(dir: &Path, config: &ProvingConfig) -> Prover {
    Prover::new(dir, config, Arc::new(RecordingOracle::default()))
        .unwrap()
        .with_cipher_backend(Arc::new(IdentityBackend))
        .with_nonces(16)
        .unwrap()
        .with_batch_size(16 * 32)
        .unwrap()
        .with_scan_options(scan_options())
}

#[test]
fn test_oversized_plot_proves_only_declared_labels() {
    // 512 labels declared, 1024 on disk; the second segment straddles the end
    let mut labels = vec![0xFF; 16 * 1024];
    for i in [10usize, 480, 511, 512, 590, 1000] {
        labels[i * 16 + 6] = 0x00;
    }
    let dir = TempDir::new().unwrap();
    write_plot(dir.path(), 512, 1, &labels, 16 * 300);

    let config = proving(512, 26, 3);
    let proof = identity_prover(dir.path(), &config)
        .generate_proof(&[0; 32], 16, &CancellationToken::new())
        .unwrap();
    assert_eq!(proof.nonce, 22);
    let indices = proof.decode_indices(512, 3).unwrap();
    assert_eq!(indices, [10, 480, 511]);
    assert!(indices.iter().all(|&i| i < 512));
    check_proof(&proof, &[0; 32], dir.path(), &config, &IdentityBackend).unwrap();

    // the labels past the declared end never count towards k2
    let config = proving(512, 26, 4);
    let result = identity_prover(dir.path(), &config)
        .with_limits(ProverLimits {
            max_attempts: Some(1),
            timeout: None,
        })
        .generate_proof(&[0; 32], 16, &CancellationToken::new());
    assert!(matches!(
        result,
        Err(ProveError::AttemptsExhausted { attempts: 1 })
    ));
}

#[test]
fn test_short_plot_proves_over_present_labels() {
    // 1024 labels declared, 700 on disk
    let mut labels = vec![0xFF; 16 * 700];
    for i in [3usize, 650, 699] {
        labels[i * 16 + 6] = 0x00;
    }
    let dir = TempDir::new().unwrap();
    write_plot(dir.path(), 512, 2, &labels, 16 * 512);

    let config = proving(512, 26, 3);
    let proof = identity_prover(dir.path(), &config)
        .generate_proof(&[0; 32], 16, &CancellationToken::new())
        .unwrap();
    assert_eq!(proof.nonce, 22);
    let indices = proof.decode_indices(1024, 3).unwrap();
    assert_eq!(indices, [3, 650, 699]);
    assert!(indices.iter().all(|&i| i < 1024));
    check_proof(&proof, &[0; 32], dir.path(), &config, &IdentityBackend).unwrap();
}

#[test]
fn test_windows_advance_until_attempts_exhausted() {
    let dir = TempDir::new().unwrap();
    write_plot(dir.path(), 512, 1, &vec![0xFF; 16 * 512], 16 * 512);

    let oracle = Arc::new(RecordingOracle::default());
    let prover = Prover::new(dir.path(), &proving(512, 26, 4), oracle.clone())
        .unwrap()
        .with_cipher_backend(Arc::new(IdentityBackend))
        .with_nonces(32)
        .unwrap()
        .with_scan_options(scan_options())
        .with_limits(ProverLimits {
            max_attempts: Some(3),
            timeout: None,
        });

    let result = prover.generate_proof(&[0; 32], 64, &CancellationToken::new());
    assert!(matches!(result, Err(ProveError::AttemptsExhausted { attempts: 3 })));
    // three disjoint windows of two groups each, starting at group 4
    assert_eq!(*oracle.groups.lock().unwrap(), [4, 5, 6, 7, 8, 9]);
}

#[test]
fn test_oracle_failure_is_not_retried() {
    let dir = TempDir::new().unwrap();
    write_plot(dir.path(), 512, 1, &vec![0xFF; 16 * 512], 16 * 512);

    let oracle = Arc::new(FailingOracle::default());
    let prover = Prover::new(dir.path(), &proving(512, 26, 4), oracle.clone()).unwrap();

    let result = prover.generate_proof(&[0; 32], 0, &CancellationToken::new());
    assert!(matches!(result, Err(ProveError::Oracle { group: 0, .. })));
    assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_missing_plot_data_is_terminal() {
    let dir = TempDir::new().unwrap();
    write_plot(dir.path(), 512, 1, &[], 16 * 512);

    let oracle = Arc::new(RecordingOracle::default());
    let prover = Prover::new(dir.path(), &proving(512, 26, 4), oracle.clone()).unwrap();
    let result = prover.generate_proof(&[0; 32], 0, &CancellationToken::new());
    assert!(matches!(result, Err(ProveError::Io(_))));
    assert!(oracle.groups.lock().unwrap().is_empty());
}

#[test]
fn test_external_cancellation_stops_unbounded_run() {
    let dir = TempDir::new().unwrap();
    write_plot(dir.path(), 512, 1, &vec![0xFF; 16 * 512], 16 * 512);

    let prover = Prover::new(
        dir.path(),
        &proving(512, 26, 4),
        Arc::new(RecordingOracle::default()),
    )
    .unwrap()
    .with_cipher_backend(Arc::new(IdentityBackend))
    .with_nonces(16)
    .unwrap()
    .with_scan_options(scan_options());

    let cancel = CancellationToken::new();
    let result = std::thread::scope(|s| {
        let canceller = cancel.clone();
        s.spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            canceller.cancel();
        });
        prover.generate_proof(&[0; 32], 0, &cancel)
    });
    assert!(matches!(result, Err(ProveError::Cancelled)));
}

#[test]
fn test_deadline_bounds_unbounded_run() {
    let dir = TempDir::new().unwrap();
    write_plot(dir.path(), 512, 1, &vec![0xFF; 16 * 512], 16 * 512);

    let prover = Prover::new(
        dir.path(),
        &proving(512, 26, 4),
        Arc::new(RecordingOracle::default()),
    )
    .unwrap()
    .with_cipher_backend(Arc::new(IdentityBackend))
    .with_nonces(16)
    .unwrap()
    .with_limits(ProverLimits {
        max_attempts: None,
        timeout: Some(Duration::from_millis(100)),
    });

    let result = prover.generate_proof(&[0; 32], 0, &CancellationToken::new());
    assert!(matches!(result, Err(ProveError::DeadlineExceeded)));
}
