//! Bounded in-order FIFO channels between pipeline stages.
//!
//! Stage code works one element at a time; the transport batches elements
//! into fixed-size chunks over `mpsc::sync_channel` so backpressure stays
//! bounded without paying a rendezvous per scalar. `depth` counts chunks in
//! flight. Order is exactly emission order: no reordering, no drops, no
//! duplicates. Any depth >= 1 is correct; depth only affects how much the
//! stages overlap.

use std::mem;
use std::sync::mpsc::{self, Receiver, SyncSender};

/// Elements per transport chunk.
const CHUNK: usize = 1024;

/// Default number of in-flight chunks per channel.
pub const DEFAULT_DEPTH: usize = 4;

/// Creates a bounded stream holding at most `depth` chunks in flight.
pub fn channel<T>(depth: usize) -> (StreamWriter<T>, StreamReader<T>) {
    let (tx, rx) = mpsc::sync_channel(depth.max(1));
    (
        StreamWriter {
            tx,
            buf: Vec::with_capacity(CHUNK),
            closed: false,
        },
        StreamReader {
            rx,
            chunk: Vec::new(),
            pos: 0,
        },
    )
}

/// Producer half of a stream. Dropping it flushes the trailing partial
/// chunk and ends the stream.
pub struct StreamWriter<T> {
    tx: SyncSender<Vec<T>>,
    buf: Vec<T>,
    closed: bool,
}

impl<T> StreamWriter<T> {
    /// Appends one element, blocking while the channel is full.
    ///
    /// If the reader is gone the element is discarded and the writer goes
    /// quiet; whatever killed the reader is the failure worth reporting.
    pub fn push(&mut self, value: T) {
        if self.closed {
            return;
        }
        self.buf.push(value);
        if self.buf.len() == CHUNK {
            self.flush();
        }
    }

    fn flush(&mut self) {
        if self.buf.is_empty() || self.closed {
            return;
        }
        let full = mem::replace(&mut self.buf, Vec::with_capacity(CHUNK));
        if self.tx.send(full).is_err() {
            self.closed = true;
        }
    }
}

impl<T> Drop for StreamWriter<T> {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Consumer half of a stream.
pub struct StreamReader<T> {
    rx: Receiver<Vec<T>>,
    chunk: Vec<T>,
    pos: usize,
}

impl<T: Copy> StreamReader<T> {
    /// Takes the next element in emission order, blocking while the
    /// channel is empty.
    ///
    /// Panics if the stream already ended: element counts are fixed by
    /// geometry, so running dry mid-phase is a stage bug, not an input
    /// condition.
    pub fn pull(&mut self) -> T {
        if self.pos == self.chunk.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.chunk = chunk;
                    self.pos = 0;
                }
                Err(_) => panic!("stream ended early"),
            }
        }
        let value = self.chunk[self.pos];
        self.pos += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn preserves_order_across_chunk_boundaries() {
        let n = 2 * CHUNK + 37;
        let (mut tx, mut rx) = channel::<u32>(2);
        let producer = thread::spawn(move || {
            for i in 0..n {
                tx.push(i as u32);
            }
        });
        for i in 0..n {
            assert_eq!(rx.pull(), i as u32);
        }
        producer.join().unwrap();
    }

    #[test]
    fn drop_flushes_partial_chunk() {
        let (mut tx, mut rx) = channel::<f32>(1);
        for i in 0..5 {
            tx.push(i as f32);
        }
        drop(tx);
        for i in 0..5 {
            assert_eq!(rx.pull(), i as f32);
        }
    }

    #[test]
    #[should_panic(expected = "stream ended early")]
    fn pull_past_end_panics() {
        let (mut tx, mut rx) = channel::<f32>(1);
        tx.push(1.0);
        drop(tx);
        rx.pull();
        rx.pull();
    }

    #[test]
    fn depth_one_stays_live() {
        let n = 3 * CHUNK;
        let (mut tx, mut rx) = channel::<u32>(1);
        let producer = thread::spawn(move || {
            for i in 0..n {
                tx.push(i as u32);
            }
        });
        let mut last = 0;
        for _ in 0..n {
            last = rx.pull();
        }
        assert_eq!(last as usize, n - 1);
        producer.join().unwrap();
    }

    #[test]
    fn writer_outlives_dead_reader() {
        let (mut tx, rx) = channel::<u32>(1);
        drop(rx);
        // Neither blocks nor panics once the reader is gone.
        for i in 0..2 * CHUNK {
            tx.push(i as u32);
        }
    }
}
