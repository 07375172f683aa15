//! Botmux Core - Streaming Topic Demultiplexer for Bot Output
//!
//! This crate routes an incrementally arriving bot response - model output
//! delivered as chunks before the full text is known - to per-topic
//! subscribers. Topics are delimited in the stream by a small pseudo-XML tag
//! vocabulary (`<topic>` ... `</topic>`); content outside any tag belongs to
//! the reserved [`DEFAULT_TOPIC`]. Generative models emit sloppy markup, so
//! unclosed, mismatched, and tag-like-but-bogus input is resolved leniently
//! and never crashes the pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ streaming client (network layer, out of scope)                   │
//! │     │ publish("…<cashier>one latte…")   fire-and-forget, ordered │
//! └─────┼────────────────────────────────────────────────────────────┘
//!       ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     ResponseMultiplexer                          │
//! │  command queue ──▶ worker task                                   │
//! │                      │  TagScanner: buffer + open-tag stack      │
//! │                      │  resolves runs as chunks arrive           │
//! │                      ▼                                           │
//! │            ┌─────────┴──────────┬───────────────┐                │
//! │            ▼                    ▼               ▼                │
//! │   sub("assistant")        sub("cashier")   sub("barista")        │
//! │   on_response(..) await   …                 …                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use botmux_core::{ChannelSubscriber, ResponseMultiplexer, DEFAULT_TOPIC};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mux = ResponseMultiplexer::new();
//!
//!     let (subscriber, mut rx) = ChannelSubscriber::channel(32);
//!     mux.subscribe(DEFAULT_TOPIC, Box::new(subscriber));
//!
//!     // The streaming client fires chunks without awaiting; the
//!     // multiplexer's internal queue keeps them in order.
//!     let _ = mux.publish("hello, ");
//!     let _ = mux.publish("world");
//!     mux.notify_turn_complete().await.unwrap();
//!
//!     while let Some(event) = rx.recv().await {
//!         println!("{event:?}");
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`multiplexer`]: the multiplexer itself - ordered command queue, worker
//!   task, dispatch with backpressure
//! - [`subscriber`]: the [`TopicSubscriber`] trait and the buffered/channel
//!   adapters
//! - `scanner` (private): the incremental tag scanner state machine
//!
//! # No UI or Network Dependencies
//!
//! This crate is pure routing logic. The component that produces the chunk
//! stream and the consumers rendering topic content live elsewhere.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod multiplexer;
mod scanner;
pub mod subscriber;

pub use multiplexer::{MultiplexError, ResponseMultiplexer, DEFAULT_TOPIC};
pub use subscriber::{
    BufferedSubscriber, ChannelSubscriber, TopicEvent, TopicSubscriber, TurnCallback,
};
