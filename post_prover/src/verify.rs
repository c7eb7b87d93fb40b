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

//! Self-check of a proof against local plot data.
//!
//! Confirms the index list is well formed and re-classifies a sample of up
//! to `k3` indexed labels under the proof's nonce. The PoW value is taken
//! as given.

use crate::config::ProvingConfig;
use crate::error::{ProveError, Result};
use crate::proof::Proof;
use post_datafile::{read_metadata, LabelReader};
use post_hashlib::{
    group_key, group_of, nonce_key, CipherBackend, DifficultySplit, LabelCipher, ProvingParams,
    NONCES_PER_GROUP,
};
use std::cmp::Ordering;
use std::path::Path;

/// Checks `proof` for `challenge` against the plot in `data_dir`.
///
/// Returns the number of labels re-classified.
pub fn check_proof(
    proof: &Proof,
    challenge: &[u8; 32],
    data_dir: &Path,
    proving: &ProvingConfig,
    backend: &dyn CipherBackend,
) -> Result<usize> {
    let metadata = read_metadata(data_dir)?;
    proving.validate_plot(&metadata)?;
    let num_labels = metadata
        .num_labels()
        .ok_or_else(|| ProveError::Configuration("label count overflows u64".to_owned()))?;
    let params = ProvingParams::new(
        metadata.num_units,
        metadata.labels_per_unit,
        proving.k1,
        &proving.pow_difficulty()?,
    )?;

    let indices = proof
        .decode_indices(num_labels, proving.k2 as usize)
        .map_err(|e| ProveError::InvalidProof(e.to_string()))?;
    check_indices(&indices, num_labels)?;

    let reader = LabelReader::open(data_dir, metadata.max_file_size)?;
    let group = group_of(proof.nonce);
    let group_cipher = backend.new_cipher(&group_key(challenge, group, proof.pow));
    let nonce_cipher =
        backend.new_cipher(&nonce_key(challenge, group, proof.pow, proof.nonce));
    let split = params.split();

    let sample = sample_positions(challenge, proof, indices.len(), proving.k3 as usize);
    for &pos in &sample {
        let index = indices[pos];
        let label = reader.read_label(index)?;
        if !label_qualifies(
            group_cipher.as_ref(),
            nonce_cipher.as_ref(),
            &split,
            proof.nonce,
            &label,
        ) {
            return Err(ProveError::InvalidProof(format!(
                "label {} does not qualify for nonce {}",
                index, proof.nonce
            )));
        }
    }
    debug!(
        "proof for nonce {}: {} of {} labels re-classified",
        proof.nonce,
        sample.len(),
        indices.len()
    );
    Ok(sample.len())
}

/// Indices must be strictly ascending and inside the plot.
pub fn check_indices(indices: &[u64], num_labels: u64) -> Result<()> {
    if let Some(pair) = indices.windows(2).find(|w| w[0] >= w[1]) {
        return Err(ProveError::InvalidProof(format!(
            "indices not strictly ascending: {} then {}",
            pair[0], pair[1]
        )));
    }
    match indices.last() {
        Some(&last) if last >= num_labels => Err(ProveError::InvalidProof(format!(
            "index {} outside a plot of {} labels",
            last, num_labels
        ))),
        _ => Ok(()),
    }
}

/// Applies the scan rule to one label: the group cipher's output byte at
/// the nonce's offset decides, a tie is settled by the nonce cipher.
pub fn label_qualifies(
    group_cipher: &dyn LabelCipher,
    nonce_cipher: &dyn LabelCipher,
    split: &DifficultySplit,
    nonce: u32,
    label: &[u8; 16],
) -> bool {
    let out = group_cipher.encrypt_block(label);
    match out[(nonce % NONCES_PER_GROUP) as usize].cmp(&split.msb) {
        Ordering::Less => true,
        Ordering::Greater => false,
        Ordering::Equal => split.lsb_passes(&nonce_cipher.encrypt_block(label)),
    }
}

/// Picks `k3` of `count` positions, seeded by the challenge and the proof.
fn sample_positions(challenge: &[u8; 32], proof: &Proof, count: usize, k3: usize) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..count).collect();
    if k3 >= count {
        return positions;
    }
    let mut hasher = blake3::Hasher::new();
    hasher.update(challenge);
    hasher.update(&proof.nonce.to_le_bytes());
    hasher.update(&proof.indices);
    let mut xof = hasher.finalize_xof();
    for i in 0..k3 {
        let mut word = [0u8; 8];
        xof.fill(&mut word);
        let j = i + (u64::from_le_bytes(word) % (count - i) as u64) as usize;
        positions.swap(i, j);
    }
    positions.truncate(k3);
    positions.sort_unstable();
    positions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{write_plot, Identity, IdentityBackend};
    use post_datafile::{write_metadata, PostMetadata};
    use post_hashlib::compress_indices;
    use tempfile::TempDir;

    fn plot(labels: &[u8]) -> TempDir {
        let dir = TempDir::new().unwrap();
        let meta = PostMetadata {
            node_id: [0; 32],
            commitment_atx_id: [0; 32],
            labels_per_unit: 512,
            num_units: 1,
            max_file_size: 16 * 512,
            nonce: None,
            nonce_value: None,
            last_position: None,
        };
        write_metadata(dir.path(), &meta).unwrap();
        write_plot(dir.path(), labels, 16 * 512);
        dir
    }

    fn proving() -> ProvingConfig {
        ProvingConfig {
            k2: 3,
            k3: 3,
            ..ProvingConfig::default()
        }
    }

    fn proof(nonce: u32, indices: &[u64]) -> Proof {
        Proof {
            nonce,
            // 512 labels -> 10 bits
            indices: compress_indices(indices, 10).unwrap(),
            pow: 0,
        }
    }

    fn labels_qualifying_at(nonce_offset: usize, at: &[usize]) -> Vec<u8> {
        let mut labels = vec![0xFF; 16 * 512];
        for &i in at {
            labels[i * 16 + nonce_offset] = 0x00;
        }
        labels
    }

    #[test]
    fn test_accepts_qualifying_labels() {
        let dir = plot(&labels_qualifying_at(4, &[10, 20, 30]));
        let checked = check_proof(
            &proof(20, &[10, 20, 30]),
            &[0; 32],
            dir.path(),
            &proving(),
            &IdentityBackend,
        )
        .unwrap();
        assert_eq!(checked, 3);
    }

    #[test]
    fn test_rejects_non_qualifying_label() {
        let dir = plot(&labels_qualifying_at(4, &[10, 20]));
        let result = check_proof(
            &proof(20, &[10, 20, 30]),
            &[0; 32],
            dir.path(),
            &proving(),
            &IdentityBackend,
        );
        assert!(matches!(result, Err(ProveError::InvalidProof(_))));
    }

    #[test]
    fn test_rejects_wrong_count() {
        let dir = plot(&labels_qualifying_at(4, &[10, 20, 30]));
        let result = check_proof(
            &proof(20, &[10, 20, 30, 40]),
            &[0; 32],
            dir.path(),
            &proving(),
            &IdentityBackend,
        );
        assert!(matches!(result, Err(ProveError::InvalidProof(_))));
    }

    #[test]
    fn test_check_indices() {
        assert!(check_indices(&[1, 2, 3], 4).is_ok());
        assert!(check_indices(&[], 4).is_ok());
        assert!(check_indices(&[1, 1, 3], 4).is_err());
        assert!(check_indices(&[3, 2], 4).is_err());
        assert!(check_indices(&[1, 4], 4).is_err());
    }

    #[test]
    fn test_tie_uses_nonce_cipher() {
        let split = DifficultySplit::new(0x10_80_0000_0000_0000);
        let mut label = [0xFF; 16];
        label[0] = 0x10;
        assert!(!label_qualifies(&Identity, &Identity, &split, 0, &label));
        label[1..8].fill(0);
        assert!(label_qualifies(&Identity, &Identity, &split, 0, &label));
        label[0] = 0x0F;
        assert!(label_qualifies(&Identity, &Identity, &split, 0, &label));
        label[0] = 0x11;
        assert!(!label_qualifies(&Identity, &Identity, &split, 0, &label));
    }

    #[test]
    fn test_sample_is_deterministic_subset() {
        let p = proof(5, &[1, 2, 3]);
        let a = sample_positions(&[9; 32], &p, 37, 10);
        assert_eq!(a, sample_positions(&[9; 32], &p, 37, 10));
        assert_eq!(a.len(), 10);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(a.iter().all(|&i| i < 37));
        assert_eq!(sample_positions(&[9; 32], &p, 5, 37), [0, 1, 2, 3, 4]);
    }
}
