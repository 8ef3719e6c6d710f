#![forbid(unsafe_code)]

//! Renderer boundary for rxbridge.
//!
//! This crate owns everything that faces the external renderer: the
//! [`Channel`] that batches outgoing mutations and receives inbound edits,
//! the [`RendererTransport`] trait the host embeds, and the wire codec
//! (record tags, batch payloads, template references).
//!
//! The transport is deliberately tiny — four outbound verbs plus a
//! diagnostic log — so the reactive core stays independent of any concrete
//! webview or message bus.

pub mod channel;
pub mod codec;
pub mod config;
pub mod transport;

pub use channel::{CellTree, Channel};
pub use codec::{DecodeError, WireRecord};
pub use config::ChannelConfig;
pub use transport::{NullTransport, RecordingTransport, RendererTransport, TransportCall};
