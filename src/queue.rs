//! Topic queue
//!
//! Watchers publish decoded events onto a bounded channel; the
//! [`Dispatcher`] routes each message to the handler registered for its
//! topic and runs it on its own task.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::event::BridgeEvent;
use crate::transfer::TransferRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    LockEvent,
    BurnEvent,
    FeeTransfer,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::LockEvent => "lock_event",
            Topic::BurnEvent => "burn_event",
            Topic::FeeTransfer => "fee_transfer",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Event(BridgeEvent),
    Transfer(TransferRecord),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub topic: Topic,
    pub payload: Payload,
}

impl Message {
    pub fn lock_event(event: BridgeEvent) -> Self {
        Self {
            topic: Topic::LockEvent,
            payload: Payload::Event(event),
        }
    }

    pub fn burn_event(event: BridgeEvent) -> Self {
        Self {
            topic: Topic::BurnEvent,
            payload: Payload::Event(event),
        }
    }

    pub fn fee_transfer(record: TransferRecord) -> Self {
        Self {
            topic: Topic::FeeTransfer,
            payload: Payload::Transfer(record),
        }
    }
}

/// Consumer of one topic
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, payload: Payload);
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue closed")]
    Closed,
}

/// Publishing side, cloned into every watcher
#[derive(Clone)]
pub struct QueueSender {
    tx: mpsc::Sender<Message>,
}

impl QueueSender {
    /// Waits for capacity when the queue is full
    pub async fn publish(&self, message: Message) -> Result<(), QueueError> {
        self.tx.send(message).await.map_err(|_| QueueError::Closed)
    }
}

pub struct QueueReceiver {
    rx: mpsc::Receiver<Message>,
}

impl QueueReceiver {
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }
}

/// Create a bounded queue
pub fn queue(buffer: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (QueueSender { tx }, QueueReceiver { rx })
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: FxHashMap<Topic, Arc<dyn Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`, replacing any previous one
    pub fn register(&mut self, topic: Topic, handler: Arc<dyn Handler>) {
        if self.handlers.insert(topic, handler).is_some() {
            warn!(topic = topic.as_str(), "Handler replaced");
        }
    }

    /// Consume until `cancel` fires or every sender is dropped, then wait for
    /// the in-flight handlers. Returns the number of dispatched messages.
    pub async fn run(&self, mut receiver: QueueReceiver, cancel: CancellationToken) -> usize {
        let mut tasks = JoinSet::new();
        let mut dispatched = 0usize;

        info!(topics = self.handlers.len(), "Dispatcher started");
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Handler task panicked");
                    }
                }
                message = receiver.recv() => {
                    let Some(Message { topic, payload }) = message else {
                        break;
                    };
                    let Some(handler) = self.handlers.get(&topic).cloned() else {
                        warn!(topic = topic.as_str(), "No handler for topic, dropping message");
                        continue;
                    };
                    debug!(topic = topic.as_str(), "Dispatching message");
                    tasks.spawn(async move { handler.handle(payload).await });
                    dispatched += 1;
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Handler task panicked");
            }
        }
        info!(dispatched, "Dispatcher stopped");
        dispatched
    }
}
