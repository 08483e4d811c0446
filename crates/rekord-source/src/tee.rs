//! Bounded fan-out of one byte stream into two consumers.
//!
//! The producer pushes each chunk into two bounded queues, waiting whenever
//! either one is full, so it never runs ahead of the slower consumer by more
//! than the queue capacity. Chunks are [`Bytes`] handles; both consumers see
//! the same allocation.
//!
//! A consumer only sees a clean end of stream after [`FanOut::finish`]. If
//! the producer is dropped or closed with an error first, both consumers
//! receive a [`FanOutError::ProducerAborted`] instead, so a truncated
//! stream can never pass for a complete one.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use tokio::sync::mpsc;

use crate::error::FanOutError;

type Item = std::result::Result<Bytes, FanOutError>;

const DROPPED: &str = "producer dropped before end of stream";

/// Create a fan-out with `capacity` chunks of buffering per consumer.
///
/// A capacity of zero is treated as one.
pub fn fan_out(capacity: usize) -> (FanOut, Branch, Branch) {
    let capacity = capacity.max(1);
    let finished = Arc::new(AtomicBool::new(false));
    let (left_tx, left_rx) = mpsc::channel(capacity);
    let (right_tx, right_rx) = mpsc::channel(capacity);

    let producer = FanOut {
        senders:  [left_tx, right_tx],
        finished: Arc::clone(&finished),
    };
    (
        producer,
        Branch::new(left_rx, Arc::clone(&finished)),
        Branch::new(right_rx, finished),
    )
}

/// Producing end.
#[derive(Debug)]
pub struct FanOut {
    senders:  [mpsc::Sender<Item>; 2],
    finished: Arc<AtomicBool>,
}

impl FanOut {
    /// Deliver `chunk` to both consumers.
    ///
    /// # Errors
    ///
    /// [`FanOutError::ConsumerClosed`] if either consumer was dropped.
    pub async fn send(&self, chunk: Bytes) -> Result<(), FanOutError> {
        for sender in &self.senders {
            sender
                .send(Ok(chunk.clone()))
                .await
                .map_err(|_| FanOutError::ConsumerClosed)?;
        }
        Ok(())
    }

    /// Mark the stream complete. Consumers see end of stream once they have
    /// drained their queues.
    pub fn finish(self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Abort the stream with `reason`, delivered to both consumers.
    pub fn close_with_error(self, reason: impl Into<String>) {
        let reason = reason.into();
        for sender in &self.senders {
            // A full queue still ends in ProducerAborted once the sender drops.
            let _ = sender.try_send(Err(FanOutError::ProducerAborted(reason.clone())));
        }
    }
}

/// Consuming end. Yields chunks in order, then either ends or yields one
/// error and ends.
#[derive(Debug)]
pub struct Branch {
    receiver: mpsc::Receiver<Item>,
    finished: Arc<AtomicBool>,
    done:     bool,
}

impl Branch {
    fn new(receiver: mpsc::Receiver<Item>, finished: Arc<AtomicBool>) -> Self {
        Self {
            receiver,
            finished,
            done: false,
        }
    }
}

impl Stream for Branch {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Err(err))) => {
                self.done = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                self.done = true;
                if self.finished.load(Ordering::Acquire) {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Err(FanOutError::ProducerAborted(DROPPED.to_string()))))
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
