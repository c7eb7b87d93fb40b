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

//! Reader/worker pipeline driving [`scan_batch`] over a whole plot.
//!
//! One reader thread fills pooled buffers and pushes them into a bounded
//! channel. Workers on a dedicated rayon pool classify each batch against
//! every group cipher and hand the buffer back to the pool.

use crate::assembler::ProofAssembler;
use crate::buffer::{BufferPool, POLL_INTERVAL};
use crate::error::{ProveError, Result};
use crate::hasher::{scan_batch, ScanOutcome};
use crate::keyring::NonceGroupKeyring;
use crate::utils::new_thread_pool;
use bytesize::ByteSize;
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use indicatif::{ProgressBar, ProgressStyle};
use post_datafile::{BatchInfo, PlotReader, LABEL_SIZE};
use post_hashlib::DifficultySplit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Default number of filled batches allowed to wait for a worker
pub const DEFAULT_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Worker threads, at least one
    pub workers: usize,
    /// Capacity of the reader to worker channel
    pub queue_depth: usize,
    pub thread_pinning: bool,
    pub show_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            thread_pinning: false,
            show_progress: false,
        }
    }
}

/// Counters of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Batches scanned to the end
    pub batches: u64,
    /// Bytes handed to the scan kernel
    pub bytes: u64,
    /// Candidates found in batches scanned to the end
    pub candidates: u64,
    pub deadline_hit: bool,
}

#[derive(Default)]
struct ScanStats {
    batches: AtomicU64,
    bytes: AtomicU64,
    candidates: AtomicU64,
}

struct FilledBuffer {
    buffer: Vec<u8>,
    info: BatchInfo,
}

pub struct ScanPipeline<'a> {
    keyring: &'a NonceGroupKeyring,
    assembler: &'a ProofAssembler,
    split: DifficultySplit,
    options: &'a ScanOptions,
    deadline: Option<Instant>,
}

impl<'a> ScanPipeline<'a> {
    pub fn new(
        keyring: &'a NonceGroupKeyring,
        assembler: &'a ProofAssembler,
        split: DifficultySplit,
        options: &'a ScanOptions,
    ) -> Self {
        Self {
            keyring,
            assembler,
            split,
            options,
            deadline: None,
        }
    }

    /// Stops the scan once `deadline` passes.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Streams every batch of `reader` through the workers.
    ///
    /// Returns after the plot is exhausted, `cancel` fires or the deadline
    /// passes, with every worker joined. A read error cancels `cancel` and
    /// is returned once the workers have drained.
    pub fn run(&self, mut reader: PlotReader, cancel: &CancellationToken) -> Result<ScanReport> {
        let workers = self.options.workers.max(1);
        let queue_depth = self.options.queue_depth.max(1);
        let thread_pool = new_thread_pool(workers, self.options.thread_pinning)?;
        // every queue slot plus one batch in flight per worker and the reader
        let pool = BufferPool::new(queue_depth + workers + 1, reader.batch_size());
        let (tx_batch, rx_batch) = bounded::<FilledBuffer>(queue_depth);
        let stats = ScanStats::default();
        let deadline_hit = AtomicBool::new(false);
        let progress = self.progress_bar(reader.total_size());

        debug!(
            "scan: {} workers, {} segments, {}",
            workers,
            reader.segments().len(),
            ByteSize(reader.total_size())
        );

        let read_result = std::thread::scope(|s| {
            let pool = &pool;
            let deadline_hit = &deadline_hit;
            let reader_handle = std::thread::Builder::new()
                .name("post-reader".to_owned())
                .spawn_scoped(s, move || {
                    self.read_loop(&mut reader, pool, tx_batch, cancel, deadline_hit)
                });

            let reader_handle = match reader_handle {
                Ok(handle) => handle,
                Err(e) => {
                    cancel.cancel();
                    return Err(ProveError::Configuration(format!(
                        "failed to spawn reader thread: {}",
                        e
                    )));
                }
            };

            thread_pool.scope(|ws| {
                for _ in 0..workers {
                    let rx = rx_batch.clone();
                    let stats = &stats;
                    let progress = progress.as_ref();
                    ws.spawn(move |_| {
                        self.work_loop(rx, pool, cancel, deadline_hit, stats, progress)
                    });
                }
                drop(rx_batch);
            });

            match reader_handle.join() {
                Ok(result) => result,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        });

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let report = ScanReport {
            batches: stats.batches.load(Ordering::Relaxed),
            bytes: stats.bytes.load(Ordering::Relaxed),
            candidates: stats.candidates.load(Ordering::Relaxed),
            deadline_hit: deadline_hit.load(Ordering::Relaxed),
        };
        debug!(
            "scan done: {} batches, {} scanned, {} candidates",
            report.batches,
            ByteSize(report.bytes),
            report.candidates
        );
        read_result.map(|()| report)
    }

    fn read_loop(
        &self,
        reader: &mut PlotReader,
        pool: &BufferPool,
        tx_batch: Sender<FilledBuffer>,
        cancel: &CancellationToken,
        deadline_hit: &AtomicBool,
    ) -> Result<()> {
        loop {
            if self.deadline_reached(cancel, deadline_hit) {
                return Ok(());
            }
            let Some(mut buffer) = pool.checkout(cancel) else {
                return Ok(());
            };
            let info = match reader.next_batch(&mut buffer) {
                Ok(Some(info)) => info,
                Ok(None) => {
                    pool.checkin(buffer);
                    return Ok(());
                }
                Err(e) => {
                    pool.checkin(buffer);
                    cancel.cancel();
                    return Err(e.into());
                }
            };

            let mut batch = FilledBuffer { buffer, info };
            loop {
                match tx_batch.send_timeout(batch, POLL_INTERVAL) {
                    Ok(()) => break,
                    Err(SendTimeoutError::Timeout(pending)) => {
                        if cancel.is_cancelled() || self.deadline_reached(cancel, deadline_hit) {
                            pool.checkin(pending.buffer);
                            return Ok(());
                        }
                        batch = pending;
                    }
                    Err(SendTimeoutError::Disconnected(pending)) => {
                        pool.checkin(pending.buffer);
                        return Ok(());
                    }
                }
            }
        }
    }

    fn work_loop(
        &self,
        rx_batch: Receiver<FilledBuffer>,
        pool: &BufferPool,
        cancel: &CancellationToken,
        deadline_hit: &AtomicBool,
        stats: &ScanStats,
        progress: Option<&ProgressBar>,
    ) {
        let mut scratch = Vec::new();
        for FilledBuffer { buffer, info } in rx_batch.iter() {
            // keep draining after cancellation so the reader never blocks
            if !cancel.is_cancelled() && !self.deadline_reached(cancel, deadline_hit) {
                let outcome = scan_batch(
                    self.keyring,
                    &self.split,
                    &buffer[..info.len],
                    info.pos / LABEL_SIZE,
                    &mut scratch,
                    cancel,
                    |nonce, index| self.assembler.report(nonce, index),
                );
                stats.bytes.fetch_add(info.len as u64, Ordering::Relaxed);
                if let ScanOutcome::Completed { candidates } = outcome {
                    stats.batches.fetch_add(1, Ordering::Relaxed);
                    stats
                        .candidates
                        .fetch_add(candidates as u64, Ordering::Relaxed);
                }
                if let Some(pb) = progress {
                    pb.inc(info.len as u64);
                }
            }
            pool.checkin(buffer);
        }
    }

    fn deadline_reached(&self, cancel: &CancellationToken, deadline_hit: &AtomicBool) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                if !deadline_hit.swap(true, Ordering::Relaxed) {
                    warn!("proving deadline reached, stopping scan");
                }
                cancel.cancel();
                true
            }
            _ => false,
        }
    }

    fn progress_bar(&self, total: u64) -> Option<ProgressBar> {
        if !self.options.show_progress {
            return None;
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style);
        }
        pb.set_message("Scanning");
        Some(pb)
    }
}
