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

//! # PoST Datafile - Plot Segment Reader
//!
//! Reads the label data produced by plot initialization. A plot directory
//! holds:
//!
//! - `postdata_metadata.json` describing the identity and geometry of the plot
//! - segment files `postdata_<n>.bin`, each at most `MaxFileSize` bytes, that
//!   together form one logical byte stream of 16-byte labels
//!
//! Segment `n` starts at logical offset `n * MaxFileSize`, so the label index
//! of any byte is its logical offset divided by [`LABEL_SIZE`].
//!
//! ## Examples
//!
//! ### Streaming all labels in batches
//!
//! ```rust,no_run
//! use post_datafile::{read_metadata, PlotReader, DEFAULT_BATCH_SIZE};
//! use std::path::Path;
//!
//! let dir = Path::new("/data/post");
//! let meta = read_metadata(dir)?;
//! let mut reader = PlotReader::open(dir, meta.max_file_size, DEFAULT_BATCH_SIZE)?;
//! reader.for_each_batch(|batch| {
//!     println!("{} bytes at {}", batch.data.len(), batch.pos);
//!     true
//! })?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Fetching a single label
//!
//! ```rust,no_run
//! use post_datafile::LabelReader;
//! use std::path::Path;
//!
//! let labels = LabelReader::open(Path::new("/data/post"), 4096)?;
//! let label = labels.read_label(42)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[macro_use]
extern crate log;

mod metadata;
mod reader;
mod segments;

pub use metadata::{read_metadata, write_metadata, PostMetadata, METADATA_FILE_NAME};
pub use reader::{read_data, Batch, BatchInfo, LabelReader, PlotReader, DEFAULT_BATCH_SIZE};
pub use segments::{list_segments, parse_segment_id, plot_complete, segment_file_name, Segment};

use std::error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Size of a single label in bytes
pub const LABEL_SIZE: u64 = 16;

/// Result type for plot data operations
pub type Result<T> = std::result::Result<T, PostDataError>;

/// Errors that can occur while reading plot data
#[derive(Debug)]
pub enum PostDataError {
    /// I/O error occurred
    Io(io::Error),
    /// Directory contains no segment files
    NoSegments(PathBuf),
    /// Metadata file is malformed or inconsistent
    InvalidMetadata(String),
    /// Metadata JSON could not be parsed
    Json(serde_json::Error),
    /// Batch size is zero or not a whole number of labels
    InvalidBatchSize(usize),
    /// Label index lies beyond the plotted data
    LabelOutOfRange { index: u64, max: u64 },
}

impl fmt::Display for PostDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostDataError::Io(err) => write!(f, "I/O error: {}", err),
            PostDataError::NoSegments(dir) => {
                write!(f, "No plot segments found in {}", dir.display())
            }
            PostDataError::InvalidMetadata(msg) => write!(f, "Invalid metadata: {}", msg),
            PostDataError::Json(err) => write!(f, "Metadata parse error: {}", err),
            PostDataError::InvalidBatchSize(size) => write!(
                f,
                "Batch size {} must be a positive multiple of {}",
                size, LABEL_SIZE
            ),
            PostDataError::LabelOutOfRange { index, max } => {
                write!(f, "Label {} is out of range [0..{})", index, max)
            }
        }
    }
}

impl error::Error for PostDataError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            PostDataError::Io(err) => Some(err),
            PostDataError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for PostDataError {
    fn from(err: io::Error) -> Self {
        PostDataError::Io(err)
    }
}

impl From<serde_json::Error> for PostDataError {
    fn from(err: serde_json::Error) -> Self {
        PostDataError::Json(err)
    }
}
