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

//! Per-attempt cipher material for a nonce window.

use crate::error::{ProveError, Result};
use crate::pow::PowOracle;
use post_hashlib::{
    group_key, group_of, nonce_key, pow_input, CipherBackend, DifficultySplit, LabelCipher,
    ProvingParams, NONCES_PER_GROUP,
};
use std::ops::Range;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// One past the largest nonce; windows may end exactly here.
pub const NONCE_SPACE: u64 = 1 << 32;

/// Cipher shared by the 16 nonces of one group.
pub struct GroupCipher {
    pub group: u32,
    pub pow: u64,
    pub cipher: Box<dyn LabelCipher>,
}

/// Group ciphers for every nonce in a window, plus per-nonce ciphers that
/// are derived on first use and cached for the rest of the attempt.
pub struct NonceGroupKeyring {
    challenge: [u8; 32],
    nonces: Range<u64>,
    groups: Vec<GroupCipher>,
    nonce_ciphers: Vec<OnceLock<Box<dyn LabelCipher>>>,
    backend: Arc<dyn CipherBackend>,
}

/// Checks that `nonces` is non-empty, aligned to whole groups and inside
/// the 32-bit nonce space.
pub fn validate_nonce_range(nonces: &Range<u64>) -> Result<()> {
    let invalid = || ProveError::InvalidNonceRange {
        start: nonces.start,
        end: nonces.end,
    };
    let group = u64::from(NONCES_PER_GROUP);
    if nonces.end <= nonces.start || nonces.end > NONCE_SPACE {
        return Err(invalid());
    }
    if nonces.start % group != 0 || (nonces.end - nonces.start) % group != 0 {
        return Err(invalid());
    }
    Ok(())
}

impl NonceGroupKeyring {
    /// Runs the PoW oracle once per group and derives the group keys.
    ///
    /// Any oracle failure aborts construction. `cancel` and `deadline` are
    /// checked before every oracle call.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        challenge: &[u8; 32],
        nonces: Range<u64>,
        params: &ProvingParams,
        miner_id: &[u8; 32],
        oracle: &dyn PowOracle,
        backend: Arc<dyn CipherBackend>,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<Self> {
        validate_nonce_range(&nonces)?;

        let first_group = (nonces.start / u64::from(NONCES_PER_GROUP)) as u32;
        let last_group = (nonces.end / u64::from(NONCES_PER_GROUP)) as u32;
        let mut groups = Vec::with_capacity((last_group - first_group) as usize);
        for group in first_group..last_group {
            if cancel.is_cancelled() {
                return Err(ProveError::Cancelled);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(ProveError::DeadlineExceeded);
            }
            let input = pow_input(group, challenge, miner_id);
            let pow = oracle
                .prove(&input, &params.pow_difficulty)
                .map_err(|source| ProveError::Oracle { group, source })?;
            debug!("nonce group {}: pow={}", group, pow);
            groups.push(GroupCipher {
                group,
                pow,
                cipher: backend.new_cipher(&group_key(challenge, group, pow)),
            });
        }

        let nonce_ciphers = (nonces.start..nonces.end)
            .map(|_| OnceLock::new())
            .collect();
        Ok(Self {
            challenge: *challenge,
            nonces,
            groups,
            nonce_ciphers,
            backend,
        })
    }

    pub fn nonces(&self) -> Range<u64> {
        self.nonces.clone()
    }

    pub fn groups(&self) -> &[GroupCipher] {
        &self.groups
    }

    pub fn challenge(&self) -> &[u8; 32] {
        &self.challenge
    }

    /// PoW value of the group that owns `nonce`.
    pub fn pow_for_nonce(&self, nonce: u32) -> Option<u64> {
        self.group_for_nonce(nonce).map(|g| g.pow)
    }

    fn group_for_nonce(&self, nonce: u32) -> Option<&GroupCipher> {
        if !self.nonces.contains(&u64::from(nonce)) {
            return None;
        }
        let first_group = (self.nonces.start / u64::from(NONCES_PER_GROUP)) as u32;
        self.groups.get((group_of(nonce) - first_group) as usize)
    }

    /// Cipher for a single nonce, derived on first use.
    pub fn nonce_cipher(&self, nonce: u32) -> Option<&dyn LabelCipher> {
        let group = self.group_for_nonce(nonce)?;
        let slot = &self.nonce_ciphers[(u64::from(nonce) - self.nonces.start) as usize];
        let cipher = slot.get_or_init(|| {
            self.backend
                .new_cipher(&nonce_key(&self.challenge, group.group, group.pow, nonce))
        });
        Some(cipher.as_ref())
    }

    /// Resolves a tie on the first output byte: re-encrypts `label` under
    /// the nonce's own key and compares the low 56 bits of the prefix.
    pub fn refine(&self, nonce: u32, label: &[u8; 16], split: &DifficultySplit) -> bool {
        match self.nonce_cipher(nonce) {
            Some(cipher) => split.lsb_passes(&cipher.encrypt_block(label)),
            None => false,
        }
    }
}
