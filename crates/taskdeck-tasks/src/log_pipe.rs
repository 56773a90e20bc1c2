//! Batching of raw process output into log entries
//!
//! A [`LogPipe`] buffers output chunks and releases them as one batch when
//! either the chunk count reaches the batch size or the oldest buffered chunk
//! is older than the batch interval. Between chunks the pipe exposes a
//! debounced [`deadline`](LogPipe::deadline); whoever drives the pipe flushes
//! it once that instant passes.

use std::time::Duration;

use tokio::time::Instant;

use taskdeck_core::config::TasksConfig;

/// Output batcher for one stream of one process
#[derive(Debug)]
pub struct LogPipe {
    buffer: String,
    count: usize,
    oldest: Option<Instant>,
    last_add: Option<Instant>,
    max_chunks: usize,
    interval: Duration,
    /// Trailing bytes of an incomplete UTF-8 sequence
    partial: Vec<u8>,
}

impl LogPipe {
    pub fn new(max_chunks: usize, interval: Duration) -> Self {
        Self {
            buffer: String::new(),
            count: 0,
            oldest: None,
            last_add: None,
            max_chunks: max_chunks.max(1),
            interval,
            partial: Vec::new(),
        }
    }

    pub fn from_config(config: &TasksConfig) -> Self {
        Self::new(
            config.log_batch_size,
            Duration::from_millis(config.log_batch_interval_ms),
        )
    }

    /// Buffer a chunk; returns a batch if this chunk triggered a flush
    pub fn add(&mut self, chunk: &str) -> Option<String> {
        self.add_at(chunk, Instant::now())
    }

    pub fn add_at(&mut self, chunk: &str, now: Instant) -> Option<String> {
        self.buffer.push_str(chunk);
        self.count += 1;
        let oldest = *self.oldest.get_or_insert(now);
        self.last_add = Some(now);

        if self.count >= self.max_chunks || now.duration_since(oldest) > self.interval {
            return self.flush();
        }
        None
    }

    /// Buffer raw bytes, carrying an incomplete trailing UTF-8 sequence over to
    /// the next call. Invalid sequences are replaced.
    pub fn add_bytes(&mut self, bytes: &[u8]) -> Option<String> {
        let mut data = std::mem::take(&mut self.partial);
        data.extend_from_slice(bytes);

        let text = match std::str::from_utf8(&data) {
            Ok(text) => text.to_string(),
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                self.partial = data[valid..].to_vec();
                String::from_utf8_lossy(&data[..valid]).into_owned()
            }
            Err(_) => String::from_utf8_lossy(&data).into_owned(),
        };

        if text.is_empty() {
            return None;
        }
        self.add(&text)
    }

    /// Release everything buffered. Flushing an empty pipe yields nothing.
    pub fn flush(&mut self) -> Option<String> {
        self.last_add = None;
        self.oldest = None;
        if self.count == 0 {
            return None;
        }
        self.count = 0;
        Some(std::mem::take(&mut self.buffer))
    }

    /// Drain the pipe, including bytes of an unfinished UTF-8 sequence
    pub fn finish(&mut self) -> Option<String> {
        if !self.partial.is_empty() {
            let rest = String::from_utf8_lossy(&std::mem::take(&mut self.partial)).into_owned();
            self.buffer.push_str(&rest);
            self.count += 1;
        }
        self.flush()
    }

    /// Drop buffered output without delivering it
    pub fn cancel(&mut self) {
        self.buffer.clear();
        self.partial.clear();
        self.count = 0;
        self.oldest = None;
        self.last_add = None;
    }

    /// Instant at which the buffered output is due, `None` when empty
    pub fn deadline(&self) -> Option<Instant> {
        self.last_add.map(|at| at + self.interval)
    }

    /// Flush if the deadline has passed
    pub fn poll_at(&mut self, now: Instant) -> Option<String> {
        match self.deadline() {
            Some(deadline) if now >= deadline => self.flush(),
            _ => None,
        }
    }

    /// Number of buffered chunks
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}
