//! Topic Subscribers
//!
//! The subscriber trait the multiplexer dispatches to, plus ready-made
//! adapters for the two common consumption styles: whole-turn buffering and
//! channel/stream forwarding. Anything else implements [`TopicSubscriber`]
//! directly.

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Receives one topic's content as the bot stream resolves it.
///
/// A subscriber belongs to exactly one topic. Registering another subscriber
/// for the same topic replaces it.
#[async_trait]
pub trait TopicSubscriber: Send {
    /// Deliver a run of content belonging to this subscriber's topic.
    ///
    /// The multiplexer awaits the returned future before dispatching any
    /// further content, so a slow subscriber applies backpressure to the
    /// whole pipeline rather than seeing dropped or reordered content.
    async fn on_response(&mut self, content: &str) -> anyhow::Result<()>;

    /// Signal that no more content for this topic will arrive this turn.
    async fn on_turn_complete(&mut self) -> anyhow::Result<()>;
}

/// Callback invoked by [`BufferedSubscriber`] once per turn.
pub type TurnCallback =
    Box<dyn FnMut(Option<String>) -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// Collects a whole turn's content and delivers it in one piece.
///
/// For consumers that want the complete text of a topic rather than
/// incremental runs: the callback fires at turn completion with the joined
/// content, or `None` when the topic saw nothing that turn.
pub struct BufferedSubscriber {
    chunks: Vec<String>,
    callback: TurnCallback,
}

impl BufferedSubscriber {
    /// Create a subscriber delivering each turn's content to `callback`.
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(Option<String>) -> BoxFuture<'static, anyhow::Result<()>> + Send + 'static,
    {
        Self {
            chunks: Vec::new(),
            callback: Box::new(callback),
        }
    }
}

#[async_trait]
impl TopicSubscriber for BufferedSubscriber {
    async fn on_response(&mut self, content: &str) -> anyhow::Result<()> {
        self.chunks.push(content.to_string());
        Ok(())
    }

    async fn on_turn_complete(&mut self) -> anyhow::Result<()> {
        let content = if self.chunks.is_empty() {
            None
        } else {
            Some(self.chunks.drain(..).collect::<String>())
        };
        (self.callback)(content).await
    }
}

/// An event forwarded by [`ChannelSubscriber`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TopicEvent {
    /// A run of content for the topic.
    Content(String),
    /// The turn ended; no more content until the next turn.
    TurnComplete,
}

/// Forwards topic content into a bounded channel.
///
/// The bounded channel is the backpressure boundary: while the receiver lags,
/// `on_response` stays pending and the multiplexer pipeline waits. A dropped
/// receiver surfaces as a subscriber error on the publishing side.
pub struct ChannelSubscriber {
    tx: mpsc::Sender<TopicEvent>,
}

impl ChannelSubscriber {
    /// Wrap an existing sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<TopicEvent>) -> Self {
        Self { tx }
    }

    /// Create a subscriber and the receiver for its events.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TopicEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Create a subscriber and a `Stream` of its events.
    #[must_use]
    pub fn stream(capacity: usize) -> (Self, ReceiverStream<TopicEvent>) {
        let (subscriber, rx) = Self::channel(capacity);
        (subscriber, ReceiverStream::new(rx))
    }
}

#[async_trait]
impl TopicSubscriber for ChannelSubscriber {
    async fn on_response(&mut self, content: &str) -> anyhow::Result<()> {
        self.tx
            .send(TopicEvent::Content(content.to_string()))
            .await
            .map_err(|_| anyhow::anyhow!("topic event receiver dropped"))
    }

    async fn on_turn_complete(&mut self) -> anyhow::Result<()> {
        self.tx
            .send(TopicEvent::TurnComplete)
            .await
            .map_err(|_| anyhow::anyhow!("topic event receiver dropped"))
    }
}
