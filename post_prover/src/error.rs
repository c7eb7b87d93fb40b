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

//! Error taxonomy of the prover.
//!
//! Only [`ProveError::NotFound`] means "try the next nonce window". Every
//! other variant ends a proving run.

use crate::pow::PowError;
use post_datafile::PostDataError;
use post_hashlib::PostHashError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProveError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid nonce range {start}..{end}: start and length must be non-zero multiples of 16")]
    InvalidNonceRange { start: u64, end: u64 },

    #[error("proof of work failed for nonce group {group}: {source}")]
    Oracle {
        group: u32,
        #[source]
        source: PowError,
    },

    #[error("plot data error: {0}")]
    Io(#[from] PostDataError),

    #[error("no proof found in nonce window {start}..{end}")]
    NotFound { start: u64, end: u64 },

    #[error("proving cancelled")]
    Cancelled,

    #[error("proving deadline exceeded")]
    DeadlineExceeded,

    #[error("no proof found after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },

    #[error("proof codec error: {0}")]
    Codec(String),

    #[error("invalid proof: {0}")]
    InvalidProof(String),
}

impl ProveError {
    /// Whether a retry with the next nonce window can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProveError::NotFound { .. })
    }
}

impl From<PostHashError> for ProveError {
    fn from(err: PostHashError) -> Self {
        ProveError::Configuration(err.to_string())
    }
}

impl From<parity_scale_codec::Error> for ProveError {
    fn from(err: parity_scale_codec::Error) -> Self {
        ProveError::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_found_is_retryable() {
        assert!(ProveError::NotFound { start: 0, end: 16 }.is_retryable());
        assert!(!ProveError::Cancelled.is_retryable());
        assert!(!ProveError::Configuration("k2".into()).is_retryable());
        assert!(!ProveError::Oracle {
            group: 0,
            source: PowError::NotFound
        }
        .is_retryable());
        assert!(!ProveError::Io(PostDataError::InvalidBatchSize(0)).is_retryable());
    }

    #[test]
    fn test_from_hash_error() {
        let err: ProveError = PostHashError::InvalidParameters("k1".into()).into();
        assert!(matches!(err, ProveError::Configuration(_)));
        assert_eq!(
            ProveError::InvalidNonceRange { start: 3, end: 19 }.to_string(),
            "invalid nonce range 3..19: start and length must be non-zero multiples of 16"
        );
    }
}
