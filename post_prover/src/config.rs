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

//! YAML configuration of the prover binary.

use crate::error::{ProveError, Result};
use crate::scanner::{ScanOptions, DEFAULT_QUEUE_DEPTH};
use crate::utils::worker_count;
use post_datafile::{PostMetadata, DEFAULT_BATCH_SIZE, LABEL_SIZE};
use post_hashlib::{decode_pow_difficulty, NONCES_PER_GROUP};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAINNET_POW_DIFFICULTY: &str =
    "00037ec8ec25e6d2c00000000000000000000000000000000000000000000000";

/// Network wide proving parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvingConfig {
    pub min_num_units: u32,
    pub max_num_units: u32,
    pub labels_per_unit: u64,
    /// Expected number of qualifying labels per nonce over the whole plot
    pub k1: u32,
    /// Labels a nonce must collect to form a proof
    pub k2: u32,
    /// Labels re-checked by a verifier
    pub k3: u32,
    /// 32-byte big-endian PoW difficulty, hex encoded
    pub pow_difficulty: String,
}

impl ProvingConfig {
    /// Parameters of the production network: 64 GiB units.
    pub fn mainnet() -> Self {
        Self {
            min_num_units: 4,
            max_num_units: 1 << 20,
            labels_per_unit: 1 << 32,
            k1: 26,
            k2: 37,
            k3: 37,
            pow_difficulty: MAINNET_POW_DIFFICULTY.to_owned(),
        }
    }

    pub fn pow_difficulty(&self) -> Result<[u8; 32]> {
        Ok(decode_pow_difficulty(&self.pow_difficulty)?)
    }

    /// Checks the proving parameters against the plot described by `meta`.
    pub fn validate_plot(&self, meta: &PostMetadata) -> Result<()> {
        if meta.labels_per_unit != self.labels_per_unit {
            return Err(ProveError::Configuration(format!(
                "plot has {} labels per unit, network expects {}",
                meta.labels_per_unit, self.labels_per_unit
            )));
        }
        self.validate_units(meta.num_units)
    }

    /// Checks that `num_units` lies within bounds and that the label count
    /// and its product with `k1` fit a u64.
    pub fn validate_units(&self, num_units: u32) -> Result<()> {
        if num_units < self.min_num_units {
            return Err(ProveError::Configuration(format!(
                "invalid num_units; expected: >= {}, given: {}",
                self.min_num_units, num_units
            )));
        }
        if num_units > self.max_num_units {
            return Err(ProveError::Configuration(format!(
                "invalid num_units; expected: <= {}, given: {}",
                self.max_num_units, num_units
            )));
        }
        let num_labels = self
            .labels_per_unit
            .checked_mul(num_units as u64)
            .ok_or_else(|| {
                ProveError::Configuration(format!(
                    "u64 overflow: labels_per_unit ({}) * num_units ({})",
                    self.labels_per_unit, num_units
                ))
            })?;
        if num_labels.checked_mul(self.k1 as u64).is_none() {
            return Err(ProveError::Configuration(format!(
                "u64 overflow: num_labels ({}) * k1 ({})",
                num_labels, self.k1
            )));
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.k1 == 0 || self.k2 == 0 {
            return Err(ProveError::Configuration(
                "k1 and k2 must be greater than zero".to_owned(),
            ));
        }
        if self.k3 > self.k2 {
            return Err(ProveError::Configuration(format!(
                "k3 ({}) must not exceed k2 ({})",
                self.k3, self.k2
            )));
        }
        if self.min_num_units > self.max_num_units {
            return Err(ProveError::Configuration(format!(
                "min_num_units ({}) exceeds max_num_units ({})",
                self.min_num_units, self.max_num_units
            )));
        }
        self.pow_difficulty()?;
        Ok(())
    }
}

/// Small units and the easiest PoW difficulty, for tests and local setups.
impl Default for ProvingConfig {
    fn default() -> Self {
        Self {
            min_num_units: 1,
            max_num_units: 100,
            labels_per_unit: 512,
            k1: 26,
            k2: 37,
            k3: 37,
            pow_difficulty: hex::encode([0xFFu8; 32]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PowBackend {
    Blake3,
    RandomX,
}

impl<'de> Deserialize<'de> for PowBackend {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "blake3" => Ok(PowBackend::Blake3),
            "randomx" => Ok(PowBackend::RandomX),
            other => Err(serde::de::Error::custom(format!(
                "unknown pow backend '{}', expected blake3 or randomx",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cfg {
    pub data_dir: PathBuf,

    #[serde(default)]
    pub proving: ProvingConfig,

    /// Nonces tried per attempt, a multiple of 16
    #[serde(default = "default_nonces")]
    pub nonces: u32,

    #[serde(default)]
    pub cpu_threads: usize,

    #[serde(default = "default_cpu_thread_pinning")]
    pub cpu_thread_pinning: bool,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// 0 = unlimited
    #[serde(default)]
    pub max_attempts: u32,

    /// 0 = no deadline
    #[serde(default)]
    pub timeout_secs: u64,

    #[serde(default = "default_pow_backend")]
    pub pow_backend: PowBackend,

    #[serde(default = "default_show_progress")]
    pub show_progress: bool,

    #[serde(default = "default_console_log_level")]
    pub console_log_level: String,

    #[serde(default = "default_logfile_log_level")]
    pub logfile_log_level: String,

    #[serde(default = "default_logfile_max_count")]
    pub logfile_max_count: u32,

    #[serde(default = "default_logfile_max_size")]
    pub logfile_max_size: u64,

    #[serde(default = "default_console_log_pattern")]
    pub console_log_pattern: String,

    #[serde(default = "default_logfile_log_pattern")]
    pub logfile_log_pattern: String,
}

impl Cfg {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            workers: worker_count(self.cpu_threads),
            queue_depth: self.queue_depth,
            thread_pinning: self.cpu_thread_pinning,
            show_progress: self.show_progress,
        }
    }

    pub fn max_attempts(&self) -> Option<u32> {
        (self.max_attempts > 0).then_some(self.max_attempts)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn default_nonces() -> u32 {
    128
}

fn default_cpu_thread_pinning() -> bool {
    false
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_queue_depth() -> usize {
    DEFAULT_QUEUE_DEPTH
}

fn default_pow_backend() -> PowBackend {
    PowBackend::Blake3
}

fn default_show_progress() -> bool {
    true
}

fn default_console_log_level() -> String {
    "Info".to_owned()
}

fn default_logfile_log_level() -> String {
    "Warn".to_owned()
}

fn default_logfile_max_count() -> u32 {
    10
}

fn default_logfile_max_size() -> u64 {
    20
}

fn default_console_log_pattern() -> String {
    "{({d(%H:%M:%S)} [{l}]):16.16} {m}{n}".to_owned()
}

fn default_logfile_log_pattern() -> String {
    "{({d(%Y-%m-%d %H:%M:%S)} [{l}]):26.26} {m}{n}".to_owned()
}

pub fn load_cfg(path: &Path) -> Result<Cfg> {
    let cfg_str = fs::read_to_string(path).map_err(|e| {
        ProveError::Configuration(format!(
            "failed to open config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let cfg: Cfg = serde_yaml::from_str(&cfg_str)
        .map_err(|e| ProveError::Configuration(format!("failed to parse config: {}", e)))?;
    validate_cfg(cfg)
}

pub fn validate_cfg(cfg: Cfg) -> Result<Cfg> {
    cfg.proving.validate()?;
    if cfg.nonces == 0 || cfg.nonces % NONCES_PER_GROUP != 0 {
        return Err(ProveError::Configuration(format!(
            "nonces ({}) must be a positive multiple of {}",
            cfg.nonces, NONCES_PER_GROUP
        )));
    }
    if cfg.batch_size == 0 || cfg.batch_size as u64 % LABEL_SIZE != 0 {
        return Err(ProveError::Configuration(format!(
            "batch_size ({}) must be a positive multiple of {}",
            cfg.batch_size, LABEL_SIZE
        )));
    }
    if !cfg.data_dir.is_dir() {
        warn!("data dir {} is not a directory", cfg.data_dir.display());
    }
    if cfg.pow_backend == PowBackend::RandomX && !cfg!(feature = "randomx") {
        return Err(ProveError::Configuration(
            "pow_backend randomx requires the `randomx` feature".to_owned(),
        ));
    }
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Result<Cfg> {
        validate_cfg(serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_defaults() {
        let cfg = parse("data_dir: /tmp/post").unwrap();
        assert_eq!(cfg.proving, ProvingConfig::default());
        assert_eq!(cfg.nonces, 128);
        assert_eq!(cfg.batch_size, 1024 * 1024);
        assert_eq!(cfg.queue_depth, DEFAULT_QUEUE_DEPTH);
        assert_eq!(cfg.pow_backend, PowBackend::Blake3);
        assert_eq!(cfg.max_attempts(), None);
        assert_eq!(cfg.timeout(), None);
        assert_eq!(cfg.console_log_level, "Info");
        assert!(cfg.scan_options().workers >= 1);
    }

    #[test]
    fn test_full_config() {
        let cfg = parse(
            r#"
data_dir: /data/post
proving:
  min_num_units: 4
  max_num_units: 1048576
  labels_per_unit: 4294967296
  k1: 26
  k2: 37
  k3: 37
  pow_difficulty: "00037ec8ec25e6d2c00000000000000000000000000000000000000000000000"
nonces: 64
cpu_threads: 3
batch_size: 4096
max_attempts: 5
timeout_secs: 60
pow_backend: BLAKE3
show_progress: false
"#,
        )
        .unwrap();
        assert_eq!(cfg.proving, ProvingConfig::mainnet());
        assert_eq!(cfg.nonces, 64);
        assert_eq!(cfg.scan_options().workers, 3);
        assert_eq!(cfg.max_attempts(), Some(5));
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(60)));
        assert!(!cfg.show_progress);
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse("data_dir: x\nnonces: 20").is_err());
        assert!(parse("data_dir: x\nnonces: 0").is_err());
        assert!(parse("data_dir: x\nbatch_size: 100").is_err());
        assert!(serde_yaml::from_str::<Cfg>("data_dir: x\npow_backend: sha256").is_err());

        let mut proving = ProvingConfig::default();
        proving.k3 = 38;
        assert!(proving.validate().is_err());
        proving = ProvingConfig {
            pow_difficulty: "ff".to_owned(),
            ..ProvingConfig::default()
        };
        assert!(proving.validate().is_err());
    }

    #[test]
    fn test_validate_units() {
        let cfg = ProvingConfig::mainnet();
        assert!(cfg.validate_units(3).is_err());
        assert!(cfg.validate_units(4).is_ok());
        assert!(cfg.validate_units((1 << 20) + 1).is_err());

        let wide = ProvingConfig {
            labels_per_unit: u64::MAX / 2,
            max_num_units: u32::MAX,
            ..ProvingConfig::default()
        };
        assert!(wide.validate_units(3).is_err());
        // fits, but num_labels * k1 overflows
        assert!(wide.validate_units(1).is_err());
    }

    #[test]
    fn test_mainnet_difficulty() {
        let d = ProvingConfig::mainnet().pow_difficulty().unwrap();
        assert_eq!(&d[..5], &[0x00, 0x03, 0x7e, 0xc8, 0xec]);
        assert_eq!(ProvingConfig::default().pow_difficulty().unwrap(), [0xFF; 32]);
    }
}
