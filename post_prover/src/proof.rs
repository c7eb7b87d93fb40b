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

//! Proof value and its SCALE wire encoding.
//!
//! Layout: compact `u32` nonce, compact length followed by the packed index
//! bytes, compact `u64` pow. Compact integers are the canonical SCALE form
//! and non-canonical encodings are rejected on decode.

use crate::error::{ProveError, Result};
use parity_scale_codec::{Compact, Decode, Encode};
use post_hashlib::{decompress_indices_exact, required_bits};
use serde::{Deserialize, Serialize};

/// Upper bound on the packed index bytes accepted on the wire
pub const MAX_INDICES_LEN: usize = 8000;

#[derive(Debug, Clone, PartialEq, Eq, Encode, Serialize, Deserialize)]
pub struct Proof {
    #[codec(compact)]
    pub nonce: u32,
    #[serde(with = "hex_bytes")]
    pub indices: Vec<u8>,
    #[codec(compact)]
    pub pow: u64,
}

impl Proof {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        check_indices_len(self.indices.len())?;
        Ok(self.encode())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut input = bytes;
        let nonce = Compact::<u32>::decode(&mut input)?.0;
        let len = Compact::<u32>::decode(&mut input)?.0 as usize;
        check_indices_len(len)?;
        if input.len() < len {
            return Err(ProveError::Codec(format!(
                "indices declare {} bytes, {} left",
                len,
                input.len()
            )));
        }
        let (indices, mut rest) = input.split_at(len);
        let pow = Compact::<u64>::decode(&mut rest)?.0;
        if !rest.is_empty() {
            return Err(ProveError::Codec(format!("{} trailing bytes", rest.len())));
        }
        Ok(Self {
            nonce,
            indices: indices.to_vec(),
            pow,
        })
    }

    /// Unpacks exactly `count` label indices of a plot with `num_labels`
    /// labels.
    pub fn decode_indices(&self, num_labels: u64, count: usize) -> Result<Vec<u64>> {
        Ok(decompress_indices_exact(
            &self.indices,
            required_bits(num_labels),
            count,
        )?)
    }
}

fn check_indices_len(len: usize) -> Result<()> {
    if len > MAX_INDICES_LEN {
        return Err(ProveError::Codec(format!(
            "{} index bytes exceed the limit of {}",
            len, MAX_INDICES_LEN
        )));
    }
    Ok(())
}

mod hex_bytes {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        hex::decode(String::deserialize(deserializer)?).map_err(D::Error::custom)
    }
}
