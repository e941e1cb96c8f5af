//! The streaming channel — a bounded, ordered, cancellable conduit of
//! decision tokens from the loop to a consumer.
//!
//! Single producer, single consumer. The producer pushes opaque tokens as
//! the decision source emits them, a `StepEnd` sentinel after each
//! non-terminal iteration, and `Done` exactly once after the terminal
//! decision, then closes. The consumer reads lazily; reading past `Done` or
//! a closed channel is a clean end, not an error.
//!
//! The channel is bounded. A producer facing a full queue either drops the
//! oldest item (`OverflowPolicy::DropOldest`) or fails the send
//! (`OverflowPolicy::Abort`, which cancels the turn) — it never blocks on a
//! stalled consumer. Closing the consumer end stops production promptly:
//! the next send returns `StreamError::Closed`.

use crate::error::StreamError;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One value on the streaming channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenEvent {
    /// A partial decision token.
    Token { content: String },

    /// An iteration's decision is complete and, if non-terminal, dispatched.
    StepEnd,

    /// The terminal action was observed. No further events follow.
    Done,
}

impl TokenEvent {
    /// Wire name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Token { .. } => "token",
            Self::StepEnd => "step_end",
            Self::Done => "done",
        }
    }
}

/// What the producer does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Drop the oldest queued event to make room.
    DropOldest,

    /// Fail the send; the loop cancels the turn.
    Abort,
}

struct Inner {
    queue: VecDeque<TokenEvent>,
    producer_closed: bool,
    consumer_closed: bool,
    done_pushed: bool,
}

struct Shared {
    inner: Mutex<Inner>,
    notify: Notify,
}

/// Create a bounded streaming channel.
pub fn channel(capacity: usize, policy: OverflowPolicy) -> (StreamProducer, StreamConsumer) {
    let shared = Arc::new(Shared {
        inner: Mutex::new(Inner {
            queue: VecDeque::with_capacity(capacity),
            producer_closed: false,
            consumer_closed: false,
            done_pushed: false,
        }),
        notify: Notify::new(),
    });
    (
        StreamProducer {
            shared: Arc::clone(&shared),
            capacity: capacity.max(1),
            policy,
        },
        StreamConsumer {
            shared,
            finished: false,
        },
    )
}

/// The producing half, held by the loop.
pub struct StreamProducer {
    shared: Arc<Shared>,
    capacity: usize,
    policy: OverflowPolicy,
}

impl StreamProducer {
    /// Push one event. Never blocks.
    pub fn send(&self, event: TokenEvent) -> std::result::Result<(), StreamError> {
        {
            let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
            if inner.consumer_closed || inner.producer_closed || inner.done_pushed {
                return Err(StreamError::Closed);
            }
            if inner.queue.len() >= self.capacity {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        inner.queue.pop_front();
                        tracing::debug!("Stream full, dropped oldest event");
                    }
                    OverflowPolicy::Abort => return Err(StreamError::Overflow),
                }
            }
            if matches!(event, TokenEvent::Done) {
                inner.done_pushed = true;
            }
            inner.queue.push_back(event);
        }
        self.shared.notify.notify_one();
        Ok(())
    }

    /// Push a partial decision token.
    pub fn token(&self, content: impl Into<String>) -> std::result::Result<(), StreamError> {
        self.send(TokenEvent::Token {
            content: content.into(),
        })
    }

    /// Mark a non-terminal iteration complete.
    pub fn step_end(&self) -> std::result::Result<(), StreamError> {
        self.send(TokenEvent::StepEnd)
    }

    /// Push the final sentinel and close the channel.
    pub fn done(&self) -> std::result::Result<(), StreamError> {
        self.send(TokenEvent::Done)?;
        self.close();
        Ok(())
    }

    /// Close the producing end. Queued events remain readable.
    pub fn close(&self) {
        {
            let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.producer_closed = true;
        }
        self.shared.notify.notify_one();
    }

    /// Has the consumer gone away?
    pub fn is_closed(&self) -> bool {
        let inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.consumer_closed
    }
}

impl Drop for StreamProducer {
    fn drop(&mut self) {
        self.close();
    }
}

/// The consuming half — a lazy sequence of events.
pub struct StreamConsumer {
    shared: Arc<Shared>,
    finished: bool,
}

impl StreamConsumer {
    /// Receive the next event, suspending until one is available.
    ///
    /// Returns `None` after `Done`, after `close()`, or once the producer
    /// closed and the queue drained.
    pub async fn recv(&mut self) -> Option<TokenEvent> {
        if self.finished {
            return None;
        }
        loop {
            {
                let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
                if inner.consumer_closed {
                    self.finished = true;
                    return None;
                }
                if let Some(event) = inner.queue.pop_front() {
                    if matches!(event, TokenEvent::Done) {
                        self.finished = true;
                    }
                    return Some(event);
                }
                if inner.producer_closed {
                    self.finished = true;
                    return None;
                }
            }
            self.shared.notify.notified().await;
        }
    }

    /// Cancel the channel: stop production and discard queued events.
    pub fn close(&mut self) {
        self.finished = true;
        {
            let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.consumer_closed = true;
            inner.queue.clear();
        }
        self.shared.notify.notify_one();
    }

    /// Adapt the consumer into a `futures::Stream` of events.
    pub fn into_stream(self) -> impl futures::Stream<Item = TokenEvent> {
        futures::stream::unfold(self, |mut consumer| async move {
            consumer.recv().await.map(|event| (event, consumer))
        })
    }
}

impl Drop for StreamConsumer {
    fn drop(&mut self) {
        // A dropped consumer cancels the turn the same way close() does.
        let mut inner = self.shared.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.consumer_closed = true;
        inner.queue.clear();
    }
}
