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

use crate::{PostDataError, PostMetadata, Result, LABEL_SIZE};
use bytesize::ByteSize;
use std::fs;
use std::path::{Path, PathBuf};

const SEGMENT_PREFIX: &str = "postdata_";
const SEGMENT_SUFFIX: &str = ".bin";

/// A single segment file and its place in the logical label stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub id: u64,
    pub path: PathBuf,
    /// Logical byte offset of the first byte, `id * max_file_size`
    pub offset: u64,
    pub len: u64,
}

pub fn segment_file_name(id: u64) -> String {
    format!("{}{}{}", SEGMENT_PREFIX, id, SEGMENT_SUFFIX)
}

/// Extracts `n` from `postdata_<n>.bin`.
pub fn parse_segment_id(file_name: &str) -> Option<u64> {
    let digits = file_name
        .strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Lists the segment files of a plot ordered by their numeric id.
///
/// Segments whose size does not match the declared `max_file_size` (other
/// than the last one) and gaps in the numbering are logged, not rejected.
pub fn list_segments(dir: &Path, max_file_size: u64) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(id) = name.to_str().and_then(parse_segment_id) else {
            continue;
        };
        let offset = id.checked_mul(max_file_size).ok_or_else(|| {
            PostDataError::InvalidMetadata(format!(
                "segment {} at {} bytes per file overflows",
                id, max_file_size
            ))
        })?;
        segments.push(Segment {
            id,
            path: entry.path(),
            offset,
            len: entry.metadata()?.len(),
        });
    }
    if segments.is_empty() {
        return Err(PostDataError::NoSegments(dir.to_path_buf()));
    }
    segments.sort_by_key(|segment| segment.id);

    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        if segment.id != i as u64 {
            warn!(
                "segment {} found where segment {} was expected in {}",
                segment.id,
                i,
                dir.display()
            );
        }
        if i < last && segment.len != max_file_size {
            warn!(
                "segment {} has {} bytes, expected {}",
                segment.path.display(),
                segment.len,
                max_file_size
            );
        } else if segment.len > max_file_size {
            warn!(
                "last segment {} exceeds the declared file size ({} > {})",
                segment.path.display(),
                segment.len,
                max_file_size
            );
        }
        if segment.len % LABEL_SIZE != 0 {
            warn!(
                "segment {} ends with a partial label ({} bytes)",
                segment.path.display(),
                segment.len
            );
        }
    }

    debug!(
        "found {} segments in {}, {}",
        segments.len(),
        dir.display(),
        ByteSize::b(segments.iter().map(|s| s.len).sum())
    );
    Ok(segments)
}

/// Returns true when the segments hold every label declared by `meta`.
pub fn plot_complete(dir: &Path, meta: &PostMetadata) -> Result<bool> {
    let expected = meta.plot_size().ok_or_else(|| {
        PostDataError::InvalidMetadata("plot size overflows u64".to_owned())
    })?;
    let segments = match list_segments(dir, meta.max_file_size) {
        Ok(segments) => segments,
        Err(PostDataError::NoSegments(_)) => return Ok(false),
        Err(err) => return Err(err),
    };
    let actual: u64 = segments.iter().map(|s| s.len).sum();
    Ok(actual == expected)
}
