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

use crate::segments::{list_segments, Segment};
use crate::{PostDataError, Result, LABEL_SIZE};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// Default read unit, 1 MiB
pub const DEFAULT_BATCH_SIZE: usize = 1024 * 1024;

/// A run of labels handed to a consumer. `data` is only valid for the
/// duration of the callback.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub data: &'a [u8],
    /// Logical byte offset of `data[0]`
    pub pos: u64,
}

impl Batch<'_> {
    pub fn first_label_index(&self) -> u64 {
        self.pos / LABEL_SIZE
    }
}

/// Location of a batch read into a caller supplied buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchInfo {
    pub pos: u64,
    pub len: usize,
}

struct OpenSegment {
    file: File,
    pos: u64,
    remaining: u64,
}

/// Sequential reader over all segments of a plot.
///
/// Batches never span two segments and come out in strictly increasing
/// logical position.
pub struct PlotReader {
    segments: Vec<Segment>,
    batch_size: usize,
    next_segment: usize,
    open: Option<OpenSegment>,
    limit: Option<u64>,
}

impl PlotReader {
    pub fn open(dir: &Path, max_file_size: u64, batch_size: usize) -> Result<Self> {
        Self::from_segments(list_segments(dir, max_file_size)?, batch_size)
    }

    pub fn from_segments(segments: Vec<Segment>, batch_size: usize) -> Result<Self> {
        if batch_size == 0 || batch_size as u64 % LABEL_SIZE != 0 {
            return Err(PostDataError::InvalidBatchSize(batch_size));
        }
        Ok(Self {
            segments,
            batch_size,
            next_segment: 0,
            open: None,
            limit: None,
        })
    }

    /// Stops reading at logical byte `limit`. Data past it is never handed
    /// out, even when segment files are larger than the plot they belong to.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit - limit % LABEL_SIZE);
        self
    }

    /// Readable bytes of `segment` once the limit is applied.
    fn readable_len(&self, segment: &Segment) -> u64 {
        match self.limit {
            Some(limit) => segment.len.min(limit.saturating_sub(segment.offset)),
            None => segment.len,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Bytes across all segments, up to the limit.
    pub fn total_size(&self) -> u64 {
        self.segments.iter().map(|s| self.readable_len(s)).sum()
    }

    /// Reads the next batch into the front of `buf`.
    ///
    /// At most `min(batch_size, buf.len())` bytes are read. Returns `None`
    /// once every segment is exhausted.
    pub fn next_batch(&mut self, buf: &mut [u8]) -> Result<Option<BatchInfo>> {
        let want = self.batch_size.min(buf.len());
        if want == 0 {
            return Err(PostDataError::InvalidBatchSize(want));
        }
        loop {
            let mut open = match self.open.take() {
                Some(open) => open,
                None => match self.segments.get(self.next_segment) {
                    Some(segment) => {
                        self.next_segment += 1;
                        let remaining = self.readable_len(segment);
                        if remaining == 0 {
                            continue;
                        }
                        OpenSegment {
                            file: File::open(&segment.path)?,
                            pos: segment.offset,
                            remaining,
                        }
                    }
                    None => return Ok(None),
                },
            };
            if open.remaining == 0 {
                continue;
            }

            let len = (want as u64).min(open.remaining) as usize;
            open.file.read_exact(&mut buf[..len])?;
            let info = BatchInfo { pos: open.pos, len };
            open.pos += len as u64;
            open.remaining -= len as u64;
            if open.remaining > 0 {
                self.open = Some(open);
            }
            return Ok(Some(info));
        }
    }

    /// Feeds every batch to `consumer` until it returns `false`.
    ///
    /// Returns `Ok(true)` when all data was consumed and `Ok(false)` when the
    /// consumer stopped early.
    pub fn for_each_batch<F>(&mut self, mut consumer: F) -> Result<bool>
    where
        F: FnMut(Batch<'_>) -> bool,
    {
        let mut buf = vec![0u8; self.batch_size];
        while let Some(info) = self.next_batch(&mut buf)? {
            let batch = Batch {
                data: &buf[..info.len],
                pos: info.pos,
            };
            if !consumer(batch) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Streams the plot in `dir` through `consumer`.
pub fn read_data<F>(dir: &Path, batch_size: usize, max_file_size: u64, consumer: F) -> Result<bool>
where
    F: FnMut(Batch<'_>) -> bool,
{
    PlotReader::open(dir, max_file_size, batch_size)?.for_each_batch(consumer)
}

/// Random access to single labels.
pub struct LabelReader {
    segments: Vec<Segment>,
}

impl LabelReader {
    pub fn open(dir: &Path, max_file_size: u64) -> Result<Self> {
        Ok(Self {
            segments: list_segments(dir, max_file_size)?,
        })
    }

    /// One past the highest label index covered by a segment.
    pub fn label_bound(&self) -> u64 {
        self.segments
            .last()
            .map(|s| (s.offset + s.len) / LABEL_SIZE)
            .unwrap_or(0)
    }

    pub fn read_label(&self, index: u64) -> Result<[u8; 16]> {
        let out_of_range = || PostDataError::LabelOutOfRange {
            index,
            max: self.label_bound(),
        };
        let pos = index.checked_mul(LABEL_SIZE).ok_or_else(out_of_range)?;
        let at = self.segments.partition_point(|s| s.offset <= pos);
        let segment = at
            .checked_sub(1)
            .map(|i| &self.segments[i])
            .filter(|s| pos + LABEL_SIZE <= s.offset + s.len)
            .ok_or_else(out_of_range)?;

        let mut file = File::open(&segment.path)?;
        file.seek(SeekFrom::Start(pos - segment.offset))?;
        let mut label = [0u8; 16];
        file.read_exact(&mut label)?;
        Ok(label)
    }
}
