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

//! Label classification for a single batch.

use crate::keyring::NonceGroupKeyring;
use post_hashlib::{nonce_at, DifficultySplit, BLOCK_SIZE};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Every group cipher was applied to the whole batch
    Completed { candidates: usize },
    /// Cancelled, or the candidate sink asked to stop
    Stopped,
}

/// Runs every group cipher of `keyring` over `labels` and reports each
/// qualifying `(nonce, label_index)` pair to `on_candidate`.
///
/// Output byte `o` of a group cipher belongs to nonce `group * 16 + o % 16`
/// and label `first_index + o / 16`. A byte above the threshold rejects, a
/// byte below accepts and a tie is settled by [`NonceGroupKeyring::refine`].
/// `on_candidate` returns `true` to stop scanning. `scratch` is reused
/// between calls to avoid reallocating the cipher output.
pub fn scan_batch<F>(
    keyring: &NonceGroupKeyring,
    split: &DifficultySplit,
    labels: &[u8],
    first_index: u64,
    scratch: &mut Vec<u8>,
    cancel: &CancellationToken,
    mut on_candidate: F,
) -> ScanOutcome
where
    F: FnMut(u32, u64) -> bool,
{
    let labels = &labels[..labels.len() / BLOCK_SIZE * BLOCK_SIZE];
    if scratch.len() < labels.len() {
        scratch.resize(labels.len(), 0);
    }
    let out = &mut scratch[..labels.len()];

    let mut candidates = 0;
    for group in keyring.groups() {
        if cancel.is_cancelled() {
            return ScanOutcome::Stopped;
        }
        group.cipher.encrypt_blocks(labels, out);

        for (offset, &msb) in out.iter().enumerate() {
            if msb > split.msb {
                continue;
            }
            let nonce = nonce_at(group.group, offset);
            let block = offset / BLOCK_SIZE;
            if msb == split.msb {
                let start = block * BLOCK_SIZE;
                let mut label = [0u8; BLOCK_SIZE];
                label.copy_from_slice(&labels[start..start + BLOCK_SIZE]);
                if !keyring.refine(nonce, &label, split) {
                    continue;
                }
            }
            candidates += 1;
            if on_candidate(nonce, first_index + block as u64) {
                return ScanOutcome::Stopped;
            }
        }
    }
    ScanOutcome::Completed { candidates }
}
