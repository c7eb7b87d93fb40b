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

//! Collects qualifying labels per nonce and elects the winning nonce.

use crate::error::{ProveError, Result};
use crate::keyring::NonceGroupKeyring;
use crate::proof::Proof;
use post_hashlib::{compress_indices, required_bits};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

const NO_WINNER: u64 = u64::MAX;

/// Candidate index sets of one proving attempt.
///
/// Workers report candidates concurrently. The first nonce whose set
/// reaches `k2` entries is written once into the winner slot and the
/// attempt token is cancelled so every worker winds down.
pub struct ProofAssembler {
    k2: usize,
    candidates: Mutex<HashMap<u32, Vec<u64>>>,
    winner: AtomicU64,
    cancel: CancellationToken,
}

impl ProofAssembler {
    pub fn new(k2: u32, cancel: CancellationToken) -> Self {
        Self {
            k2: k2 as usize,
            candidates: Mutex::new(HashMap::new()),
            winner: AtomicU64::new(NO_WINNER),
            cancel,
        }
    }

    /// Records `index` for `nonce`. Returns `true` once a winner exists and
    /// scanning can stop.
    pub fn report(&self, nonce: u32, index: u64) -> bool {
        let Ok(mut candidates) = self.candidates.lock() else {
            // a worker panicked while holding the lock; the attempt is lost
            self.cancel.cancel();
            return true;
        };
        let indices = candidates.entry(nonce).or_default();
        if indices.len() >= self.k2 {
            return self.has_winner();
        }
        indices.push(index);
        if indices.len() == self.k2
            && self
                .winner
                .compare_exchange(NO_WINNER, nonce as u64, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            debug!("nonce {} collected {} labels", nonce, self.k2);
            self.cancel.cancel();
        }
        self.has_winner()
    }

    pub fn has_winner(&self) -> bool {
        self.winner.load(Ordering::Acquire) != NO_WINNER
    }

    pub fn winner(&self) -> Option<u32> {
        match self.winner.load(Ordering::Acquire) {
            NO_WINNER => None,
            nonce => Some(nonce as u32),
        }
    }

    /// Number of candidates recorded for `nonce`.
    pub fn count(&self, nonce: u32) -> usize {
        self.candidates
            .lock()
            .map(|c| c.get(&nonce).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Builds the proof for the winning nonce: indices sorted ascending and
    /// packed with `required_bits(num_labels)` bits each.
    pub fn finalize(self, keyring: &NonceGroupKeyring, num_labels: u64) -> Result<Proof> {
        let nonces = keyring.nonces();
        let not_found = ProveError::NotFound {
            start: nonces.start,
            end: nonces.end,
        };
        let Some(nonce) = self.winner() else {
            return Err(not_found);
        };
        let mut candidates = self
            .candidates
            .into_inner()
            .map_err(|_| ProveError::Configuration("candidate set poisoned".to_owned()))?;
        let mut indices = candidates.remove(&nonce).ok_or(not_found)?;
        indices.sort_unstable();
        if let Some(&last) = indices.last().filter(|&&last| last >= num_labels) {
            return Err(ProveError::InvalidProof(format!(
                "label index {} outside a plot of {} labels",
                last, num_labels
            )));
        }

        let pow = keyring.pow_for_nonce(nonce).ok_or_else(|| {
            ProveError::Configuration(format!("winning nonce {} outside the keyring", nonce))
        })?;
        Ok(Proof {
            nonce,
            indices: compress_indices(&indices, required_bits(num_labels))?,
            pow,
        })
    }
}
