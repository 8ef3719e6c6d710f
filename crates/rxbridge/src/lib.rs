#![forbid(unsafe_code)]

//! rxbridge public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use rxbridge_core as core;
pub use rxbridge_wire as wire;

pub mod prelude {
    pub use rxbridge_core::{
        CellId, Codec, ComputeError, Computed, ConvertError, EventCallbackId, EventCallbacks,
        EventError, Model, Mutation, Origin, Path, PathError, PathSeg, PropVar, PropVarId,
        Reactive, Registry, ScopedComputed, ScopedFnId, StateError, SyncChannel, Value,
    };
    pub use rxbridge_wire::{
        CellTree, Channel, ChannelConfig, DecodeError, NullTransport, RecordingTransport,
        RendererTransport, TransportCall, WireRecord,
    };
}
