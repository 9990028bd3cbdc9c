//! Message model for the axon runtime.
//!
//! Everything that flows through an axon graph is one of five message
//! kinds sharing a single routing envelope:
//!
//! | Kind | Direction | Payload | Use |
//! |------|-----------|---------|-----|
//! | [`Cmd`] | requester → target | sub-kind data | request expecting result(s) |
//! | [`CmdResult`] | target → requester | status + flags | (streamed) response |
//! | [`Data`] | producer → consumers | byte buffer | opaque payload |
//! | [`AudioFrame`] | producer → consumers | byte buffer + layout | PCM audio |
//! | [`VideoFrame`] | producer → consumers | byte buffer + layout | raster video |
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   set_dest/add_dest   ┌──────────────┐
//! │  extension   │ ────────────────────► │    Msg       │
//! │  (producer)  │                       │  ┌────────┐  │
//! └──────────────┘                       │  │ header │  │ name, src,
//!                                        │  └────────┘  │ dests, props
//!        routing pipeline  ◄──────────── │  kind data   │
//!                                        └──────────────┘
//!                                               │ to_wire / from_wire
//!                                               ▼
//!                                      structured wire value
//!                                      ("_axon" + properties)
//! ```
//!
//! # Field registry
//!
//! Each kind publishes a static table of [`FieldInfo`] descriptors with
//! ids that stay stable across versions. Generic code — cloning, wire
//! mapping, external codecs — works against the tables and the
//! [`Fields`] visitor instead of branching on kinds; see the
//! [`field`] module.
//!
//! # Locked buffers
//!
//! Payload kinds own a [`Buf`] whose lock count records outstanding
//! external raw views. Mutation or release while a view is out fails
//! with [`MsgError::BufLocked`]; clones always get fresh, unlocked
//! storage. This is what lets payloads cross the boundary without
//! copying and without use-after-free.

mod audio_frame;
mod buf;
mod cmd;
mod data;
mod error;
pub mod field;
mod header;
mod kind;
mod msg;
mod video_frame;
mod wire;

pub use audio_frame::AudioFrame;
pub use buf::Buf;
pub use cmd::{Cmd, CmdResult, StatusCode};
pub use data::Data;
pub use error::MsgError;
pub use field::{field_table, FieldId, FieldInfo, FieldRef, Fields};
pub use header::MsgHeader;
pub use kind::{CmdKind, MsgKind};
pub use msg::Msg;
pub use video_frame::{PixelFmt, VideoFrame};
pub use wire::{from_wire, to_wire, RESERVED_KEY};

// Re-export the coordinate types message APIs are expressed in.
pub use axon_types::{CmdId, Loc};
