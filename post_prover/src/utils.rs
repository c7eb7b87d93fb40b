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

use crate::error::{ProveError, Result};

/// Builds the worker pool, optionally pinning worker `i` to core
/// `i % cores`.
pub fn new_thread_pool(num_threads: usize, thread_pinning: bool) -> Result<rayon::ThreadPool> {
    let core_ids = if thread_pinning {
        core_affinity::get_core_ids().unwrap_or_default()
    } else {
        Vec::new()
    };
    if thread_pinning && core_ids.is_empty() {
        warn!("cpu thread pinning requested but core ids are unavailable");
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|id| format!("post-worker-{}", id))
        .start_handler(move |id| {
            if !core_ids.is_empty() {
                core_affinity::set_for_current(core_ids[id % core_ids.len()]);
            }
        })
        .build()
        .map_err(|e| ProveError::Configuration(format!("failed to build worker pool: {}", e)))
}

/// Resolves a configured thread count, 0 meaning one per logical cpu.
pub fn worker_count(configured: usize) -> usize {
    if configured == 0 {
        num_cpus::get()
    } else {
        configured
    }
}
