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

//! Fixed set of read buffers cycled between the reader and the workers.
//!
//! A buffer is owned by exactly one side at a time: the reader checks one
//! out, fills it and hands it to a worker, the worker checks it back in
//! when its batch is classified.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How often blocked pipeline stages look at their cancellation token
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct BufferPool {
    tx_empty_buffer: Sender<Vec<u8>>,
    rx_empty_buffer: Receiver<Vec<u8>>,
    buffer_size: usize,
}

impl BufferPool {
    pub fn new(count: usize, buffer_size: usize) -> Self {
        let (tx_empty_buffer, rx_empty_buffer) = bounded(count);
        for _ in 0..count {
            // capacity equals count, cannot fail
            let _ = tx_empty_buffer.try_send(vec![0u8; buffer_size]);
        }
        Self {
            tx_empty_buffer,
            rx_empty_buffer,
            buffer_size,
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Buffers currently waiting in the pool.
    pub fn available(&self) -> usize {
        self.rx_empty_buffer.len()
    }

    /// Waits for a free buffer. Returns `None` once `cancel` fires.
    pub fn checkout(&self, cancel: &CancellationToken) -> Option<Vec<u8>> {
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            match self.rx_empty_buffer.recv_timeout(POLL_INTERVAL) {
                Ok(buffer) => return Some(buffer),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub fn checkin(&self, buffer: Vec<u8>) {
        if self.tx_empty_buffer.try_send(buffer).is_err() {
            debug!("buffer pool: returned buffer dropped (pool full)");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_and_checkin() {
        let pool = BufferPool::new(2, 64);
        let token = CancellationToken::new();
        assert_eq!(pool.available(), 2);

        let a = pool.checkout(&token).unwrap();
        let b = pool.checkout(&token).unwrap();
        assert_eq!(a.len(), 64);
        assert_eq!(pool.available(), 0);

        pool.checkin(a);
        pool.checkin(b);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_checkout_returns_none_when_cancelled() {
        let pool = BufferPool::new(1, 16);
        let token = CancellationToken::new();
        let _held = pool.checkout(&token).unwrap();

        let canceller = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });
        assert!(pool.checkout(&token).is_none());
        handle.join().unwrap();
    }

    #[test]
    fn test_checkout_wakes_on_checkin() {
        let pool = BufferPool::new(1, 16);
        let token = CancellationToken::new();
        let held = pool.checkout(&token).unwrap();
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(10));
                pool.checkin(held);
            });
            assert!(pool.checkout(&token).is_some());
        });
    }
}
