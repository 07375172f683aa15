//! Bot Response Multiplexer
//!
//! Routes an incrementally arriving bot response to topic subscribers as the
//! stream resolves, without ever waiting for the full response.
//!
//! # Ordering
//!
//! Streaming callers typically fire `publish` without awaiting each call.
//! Correctness cannot depend on caller discipline, so the multiplexer owns an
//! internal serial queue: [`ResponseMultiplexer::publish`] and
//! [`ResponseMultiplexer::notify_turn_complete`] enqueue their command
//! synchronously at call time and hand back a future that resolves when the
//! worker has processed it. Call order, not await order, fixes processing
//! order.
//!
//! # Backpressure
//!
//! The worker awaits every subscriber callback before touching the next
//! resolved run. A slow subscriber therefore delays the whole pipeline, and
//! `notify_turn_complete` cannot resolve past it. Content is never dropped or
//! reordered to make progress.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::scanner::{is_valid_topic, Span, TagScanner};
use crate::subscriber::TopicSubscriber;

/// The reserved topic receiving content not enclosed in any tag.
pub const DEFAULT_TOPIC: &str = "assistant";

/// Errors surfaced by [`ResponseMultiplexer::publish`] and
/// [`ResponseMultiplexer::notify_turn_complete`].
///
/// Malformed markup is never an error: sloppy tags from a generative model
/// are resolved leniently and flow through as content. The only failures a
/// caller can see are its own subscribers' failures, plus [`Closed`] when the
/// runtime tears the worker down underneath the multiplexer.
///
/// [`Closed`]: MultiplexError::Closed
#[derive(Debug, Error)]
pub enum MultiplexError {
    /// A subscriber callback failed. The multiplexer does not retry; whether
    /// to log and continue or abort the turn is the caller's call.
    #[error("subscriber for topic `{topic}` failed")]
    Subscriber {
        /// Topic whose subscriber failed.
        topic: String,
        /// The error the subscriber returned.
        #[source]
        source: anyhow::Error,
    },

    /// The worker task is gone.
    #[error("multiplexer worker has shut down")]
    Closed,
}

/// Commands processed one at a time by the worker task.
enum Command {
    Subscribe {
        topic: String,
        subscriber: Box<dyn TopicSubscriber>,
    },
    Publish {
        text: String,
        done: oneshot::Sender<Result<(), MultiplexError>>,
    },
    TurnComplete {
        done: oneshot::Sender<Result<(), MultiplexError>>,
    },
}

/// Demultiplexes a streaming bot response into per-topic subscriber
/// callbacks.
///
/// Content between `<topic>`/`</topic>` tags goes to the subscriber for
/// `topic`; content outside any tag goes to the [`DEFAULT_TOPIC`] subscriber.
/// Only names with a registered subscriber are treated as tags, so tag-like
/// noise in the response flows through as ordinary content. Content for a
/// topic nobody subscribes to is dropped silently.
///
/// The multiplexer persists across turns: subscriptions stay, while the
/// accumulation buffer and open-tag stack reset at every
/// [`notify_turn_complete`](Self::notify_turn_complete).
pub struct ResponseMultiplexer {
    commands: mpsc::UnboundedSender<Command>,
}

impl Default for ResponseMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseMultiplexer {
    /// Create a multiplexer and spawn its worker task.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new() -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(Worker::new(rx).run());
        Self { commands }
    }

    /// Register `subscriber` for `topic`, replacing any prior subscriber for
    /// the same topic.
    ///
    /// Effectively synchronous: the registration joins the same ordered
    /// command queue as publishes, with nothing to await. Topic names must
    /// match `[A-Za-z0-9-]+`; an invalid name is logged and the registration
    /// dropped, since no tag in the stream could ever address it.
    pub fn subscribe(&self, topic: impl Into<String>, subscriber: Box<dyn TopicSubscriber>) {
        let topic = topic.into();
        if !is_valid_topic(&topic) {
            tracing::warn!(topic = %topic, "ignoring subscriber for invalid topic name");
            return;
        }
        if self
            .commands
            .send(Command::Subscribe { topic, subscriber })
            .is_err()
        {
            tracing::warn!("subscribe after multiplexer shutdown");
        }
    }

    /// Append `chunk` to the stream.
    ///
    /// The chunk is enqueued before this function returns; the returned
    /// future resolves once every run of content the chunk made resolvable
    /// has been dispatched to subscribers and their callbacks awaited. Safe
    /// to call without awaiting: processing order is call order.
    pub fn publish(
        &self,
        chunk: impl Into<String>,
    ) -> impl Future<Output = Result<(), MultiplexError>> + Send {
        let (done, ack) = oneshot::channel();
        let queued = self
            .commands
            .send(Command::Publish {
                text: chunk.into(),
                done,
            })
            .is_ok();
        async move {
            if !queued {
                return Err(MultiplexError::Closed);
            }
            ack.await.unwrap_or(Err(MultiplexError::Closed))
        }
    }

    /// Signal the end of the current turn.
    ///
    /// Drains all previously published chunks, resolves any trailing partial
    /// tag as content of the topic it sits in, then delivers
    /// `on_turn_complete` to every registered subscriber and awaits each. The
    /// open-tag stack and buffer reset, so the next turn starts from
    /// [`DEFAULT_TOPIC`] even if this turn left tags unclosed.
    pub fn notify_turn_complete(
        &self,
    ) -> impl Future<Output = Result<(), MultiplexError>> + Send {
        let (done, ack) = oneshot::channel();
        let queued = self.commands.send(Command::TurnComplete { done }).is_ok();
        async move {
            if !queued {
                return Err(MultiplexError::Closed);
            }
            ack.await.unwrap_or(Err(MultiplexError::Closed))
        }
    }
}

/// Owns all mutable state. Processing one command at a time is what makes
/// subscriber callbacks the only suspension point and publish effects
/// strictly ordered.
struct Worker {
    commands: mpsc::UnboundedReceiver<Command>,
    subscribers: BTreeMap<String, Box<dyn TopicSubscriber>>,
    topics: BTreeSet<String>,
    scanner: TagScanner,
}

impl Worker {
    fn new(commands: mpsc::UnboundedReceiver<Command>) -> Self {
        Self {
            commands,
            subscribers: BTreeMap::new(),
            topics: BTreeSet::new(),
            scanner: TagScanner::new(),
        }
    }

    async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            match command {
                Command::Subscribe { topic, subscriber } => {
                    self.handle_subscribe(topic, subscriber);
                }
                Command::Publish { text, done } => {
                    let result = self.handle_publish(&text).await;
                    let _ = done.send(result);
                }
                Command::TurnComplete { done } => {
                    let result = self.handle_turn_complete().await;
                    let _ = done.send(result);
                }
            }
        }
        tracing::debug!("multiplexer worker exiting");
    }

    fn handle_subscribe(&mut self, topic: String, subscriber: Box<dyn TopicSubscriber>) {
        if self.subscribers.insert(topic.clone(), subscriber).is_some() {
            tracing::debug!(topic = %topic, "subscriber replaced");
        }
        self.topics.insert(topic);
    }

    async fn handle_publish(&mut self, text: &str) -> Result<(), MultiplexError> {
        self.scanner.push(text);
        let spans = self.scanner.scan(&self.topics);
        self.dispatch(spans).await
    }

    async fn handle_turn_complete(&mut self) -> Result<(), MultiplexError> {
        let spans = self.scanner.flush(&self.topics);
        let mut result = self.dispatch(spans).await;
        self.scanner.reset();

        // Every subscriber hears the turn boundary, content or not, even if
        // an earlier callback failed; the first error wins.
        for (topic, subscriber) in &mut self.subscribers {
            if let Err(source) = subscriber.on_turn_complete().await {
                tracing::warn!(topic = %topic, error = %source, "turn-complete callback failed");
                if result.is_ok() {
                    result = Err(MultiplexError::Subscriber {
                        topic: topic.clone(),
                        source,
                    });
                }
            }
        }
        result
    }

    async fn dispatch(&mut self, spans: Vec<Span>) -> Result<(), MultiplexError> {
        for span in spans {
            match self.subscribers.get_mut(&span.topic) {
                Some(subscriber) => {
                    subscriber
                        .on_response(&span.text)
                        .await
                        .map_err(|source| MultiplexError::Subscriber {
                            topic: span.topic.clone(),
                            source,
                        })?;
                }
                None => {
                    tracing::trace!(
                        topic = %span.topic,
                        bytes = span.text.len(),
                        "no subscriber, content dropped"
                    );
                }
            }
        }
        Ok(())
    }
}
