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

//! Plot metadata persisted next to the segment files.
//!
//! Byte fields are stored as base64 strings, integers as JSON numbers.

use crate::{PostDataError, Result, LABEL_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const METADATA_FILE_NAME: &str = "postdata_metadata.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PostMetadata {
    #[serde(with = "base64_array")]
    pub node_id: [u8; 32],
    #[serde(with = "base64_array")]
    pub commitment_atx_id: [u8; 32],
    pub labels_per_unit: u64,
    pub num_units: u32,
    pub max_file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(default, with = "base64_opt")]
    pub nonce_value: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_position: Option<u64>,
}

impl PostMetadata {
    /// Total number of labels, `None` on overflow.
    pub fn num_labels(&self) -> Option<u64> {
        self.labels_per_unit.checked_mul(self.num_units as u64)
    }

    /// Total plot size in bytes, `None` on overflow.
    pub fn plot_size(&self) -> Option<u64> {
        self.num_labels()?.checked_mul(LABEL_SIZE)
    }

    fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 || self.max_file_size % LABEL_SIZE != 0 {
            return Err(PostDataError::InvalidMetadata(format!(
                "MaxFileSize {} must be a positive multiple of {}",
                self.max_file_size, LABEL_SIZE
            )));
        }
        if self.plot_size().is_none() {
            return Err(PostDataError::InvalidMetadata(format!(
                "{} units of {} labels overflow",
                self.num_units, self.labels_per_unit
            )));
        }
        Ok(())
    }
}

/// Reads and validates `postdata_metadata.json` from `dir`.
pub fn read_metadata(dir: &Path) -> Result<PostMetadata> {
    let raw = fs::read(dir.join(METADATA_FILE_NAME))?;
    let meta: PostMetadata = serde_json::from_slice(&raw)?;
    meta.validate()?;
    Ok(meta)
}

pub fn write_metadata(dir: &Path, meta: &PostMetadata) -> Result<()> {
    let raw = serde_json::to_vec_pretty(meta)?;
    fs::write(dir.join(METADATA_FILE_NAME), raw)?;
    Ok(())
}

mod base64_array {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(encoded).map_err(D::Error::custom)?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::custom(format!("expected 32 bytes, got {}", v.len())))
    }
}

mod base64_opt {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(D::Error::custom))
            .transpose()
    }
}
