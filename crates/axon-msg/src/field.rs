//! The field registry.
//!
//! Every message kind publishes a fixed, ordered table of field
//! descriptors. Generic operations — clone, wire mapping, "loop all
//! fields" — are written once against these tables; only the per-field
//! projection is kind-specific, expressed as one `match` per kind in its
//! [`Fields`] impl. Wire codecs outside this crate consume the same
//! tables through [`field_table`].
//!
//! # Field ids
//!
//! Ids are stable across versions; they are the contract concrete
//! codecs key binary layouts on. Negative ids mark virtual/structural
//! entries (the shared header block) that group real fields without
//! being one.

use crate::{Buf, Cmd, CmdKind, CmdResult, Data, MsgHeader, MsgKind, StatusCode};
use crate::{AudioFrame, PixelFmt, VideoFrame};
use axon_types::{CmdId, Loc};
use serde_json::{Map, Value};

/// Stable identity of one field within a message kind's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub i32);

impl FieldId {
    /// Virtual ids (< 0) mark structural groupings, not real fields.
    #[must_use]
    pub fn is_virtual(&self) -> bool {
        self.0 < 0
    }
}

/// Well-known field ids.
///
/// Header fields are shared by every kind; kind-specific fields start
/// at 10.
pub mod field_id {
    use super::FieldId;

    /// Virtual marker for the shared header block.
    pub const HEADER: FieldId = FieldId(-1);

    /// The kind tag (wire `type`).
    pub const KIND: FieldId = FieldId(1);
    /// Routable name.
    pub const NAME: FieldId = FieldId(2);
    /// Source coordinate.
    pub const SRC: FieldId = FieldId(3);
    /// Destination list.
    pub const DEST: FieldId = FieldId(4);
    /// Property bag.
    pub const PROPERTIES: FieldId = FieldId(5);

    /// Payload buffer (data and frame kinds).
    pub const BUF: FieldId = FieldId(10);
    /// Command sub-kind and its payload.
    pub const CMD_KIND: FieldId = FieldId(11);
    /// Command id.
    pub const CMD_ID: FieldId = FieldId(12);
    /// Result: id of the answered command.
    pub const ORIGINAL_CMD_ID: FieldId = FieldId(13);
    /// Result: outcome classification.
    pub const STATUS_CODE: FieldId = FieldId(14);
    /// Result: final flag.
    pub const IS_FINAL: FieldId = FieldId(15);
    /// Result: completed flag.
    pub const IS_COMPLETED: FieldId = FieldId(16);

    /// Audio: samples per second.
    pub const SAMPLE_RATE: FieldId = FieldId(20);
    /// Audio: channel count.
    pub const CHANNELS: FieldId = FieldId(21);
    /// Audio: sample width in bytes.
    pub const BYTES_PER_SAMPLE: FieldId = FieldId(22);
    /// Audio: samples per channel.
    pub const SAMPLES_PER_CHANNEL: FieldId = FieldId(23);
    /// Frame presentation timestamp.
    pub const TIMESTAMP_US: FieldId = FieldId(24);
    /// Frame end-of-stream flag.
    pub const EOF: FieldId = FieldId(25);

    /// Video: frame width.
    pub const WIDTH: FieldId = FieldId(30);
    /// Video: frame height.
    pub const HEIGHT: FieldId = FieldId(31);
    /// Video: pixel layout.
    pub const PIXEL_FMT: FieldId = FieldId(32);
}

/// One entry of a kind's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Stable field id.
    pub id: FieldId,
    /// Wire name of the field.
    pub name: &'static str,
}

const fn f(id: FieldId, name: &'static str) -> FieldInfo {
    FieldInfo { id, name }
}

/// Field table of [`Cmd`].
pub static CMD_FIELDS: &[FieldInfo] = &[
    f(field_id::HEADER, "_header"),
    f(field_id::KIND, "type"),
    f(field_id::NAME, "name"),
    f(field_id::SRC, "src"),
    f(field_id::DEST, "dest"),
    f(field_id::PROPERTIES, "properties"),
    f(field_id::CMD_KIND, "cmd_kind"),
    f(field_id::CMD_ID, "cmd_id"),
];

/// Field table of [`CmdResult`].
pub static CMD_RESULT_FIELDS: &[FieldInfo] = &[
    f(field_id::HEADER, "_header"),
    f(field_id::KIND, "type"),
    f(field_id::NAME, "name"),
    f(field_id::SRC, "src"),
    f(field_id::DEST, "dest"),
    f(field_id::PROPERTIES, "properties"),
    f(field_id::ORIGINAL_CMD_ID, "original_cmd_id"),
    f(field_id::STATUS_CODE, "status_code"),
    f(field_id::IS_FINAL, "is_final"),
    f(field_id::IS_COMPLETED, "is_completed"),
];

/// Field table of [`Data`].
pub static DATA_FIELDS: &[FieldInfo] = &[
    f(field_id::HEADER, "_header"),
    f(field_id::KIND, "type"),
    f(field_id::NAME, "name"),
    f(field_id::SRC, "src"),
    f(field_id::DEST, "dest"),
    f(field_id::PROPERTIES, "properties"),
    f(field_id::BUF, "buf"),
];

/// Field table of [`AudioFrame`].
pub static AUDIO_FRAME_FIELDS: &[FieldInfo] = &[
    f(field_id::HEADER, "_header"),
    f(field_id::KIND, "type"),
    f(field_id::NAME, "name"),
    f(field_id::SRC, "src"),
    f(field_id::DEST, "dest"),
    f(field_id::PROPERTIES, "properties"),
    f(field_id::BUF, "buf"),
    f(field_id::SAMPLE_RATE, "sample_rate"),
    f(field_id::CHANNELS, "channels"),
    f(field_id::BYTES_PER_SAMPLE, "bytes_per_sample"),
    f(field_id::SAMPLES_PER_CHANNEL, "samples_per_channel"),
    f(field_id::TIMESTAMP_US, "timestamp_us"),
    f(field_id::EOF, "eof"),
];

/// Field table of [`VideoFrame`].
pub static VIDEO_FRAME_FIELDS: &[FieldInfo] = &[
    f(field_id::HEADER, "_header"),
    f(field_id::KIND, "type"),
    f(field_id::NAME, "name"),
    f(field_id::SRC, "src"),
    f(field_id::DEST, "dest"),
    f(field_id::PROPERTIES, "properties"),
    f(field_id::BUF, "buf"),
    f(field_id::WIDTH, "width"),
    f(field_id::HEIGHT, "height"),
    f(field_id::PIXEL_FMT, "pixel_fmt"),
    f(field_id::TIMESTAMP_US, "timestamp_us"),
    f(field_id::EOF, "eof"),
];

/// Returns the immutable field table of a kind.
#[must_use]
pub fn field_table(kind: MsgKind) -> &'static [FieldInfo] {
    match kind {
        MsgKind::Cmd => CMD_FIELDS,
        MsgKind::CmdResult => CMD_RESULT_FIELDS,
        MsgKind::Data => DATA_FIELDS,
        MsgKind::AudioFrame => AUDIO_FRAME_FIELDS,
        MsgKind::VideoFrame => VIDEO_FRAME_FIELDS,
    }
}

/// Asserts `id` belongs to `kind`'s field table.
///
/// # Panics
///
/// A kind/field-table mismatch is a bug in the embedding code, not a
/// runtime condition; this panics rather than returning an error.
pub fn assert_in_table(kind: MsgKind, id: FieldId) {
    assert!(
        field_table(kind).iter().any(|info| info.id == id),
        "field {id:?} is not part of the {kind} field table"
    );
}

/// A borrowed view of one concrete field.
#[derive(Debug)]
pub enum FieldRef<'a> {
    /// The kind tag.
    Kind(MsgKind),
    /// The command sub-kind with its payload.
    CmdKind(&'a CmdKind),
    /// The routable name.
    Name(&'a str),
    /// The source coordinate.
    Src(&'a Loc),
    /// The destination list.
    Dest(&'a [Loc]),
    /// The property bag.
    Properties(&'a Map<String, Value>),
    /// A payload buffer.
    Buf(&'a Buf),
    /// A command id.
    CmdId(CmdId),
    /// A result status.
    StatusCode(StatusCode),
    /// A boolean flag field.
    Flag(bool),
    /// An unsigned scalar field.
    U32(u32),
    /// A signed 64-bit scalar field.
    I64(i64),
    /// A pixel layout.
    PixelFmt(PixelFmt),
}

/// Per-kind field projection.
///
/// Implementations iterate their kind's static table and hand the
/// visitor a [`FieldRef`] for every concrete (non-virtual) field, in
/// table order.
pub trait Fields {
    /// This kind's static field table.
    fn field_table(&self) -> &'static [FieldInfo];

    /// Invokes `visit` once per concrete field, in table order.
    fn visit_fields(&self, visit: &mut dyn FnMut(&FieldInfo, FieldRef<'_>));
}

/// Projects a shared-header field, or `None` for kind-specific ids.
fn header_field<'a>(kind: MsgKind, header: &'a MsgHeader, id: FieldId) -> Option<FieldRef<'a>> {
    Some(match id {
        field_id::KIND => FieldRef::Kind(kind),
        field_id::NAME => FieldRef::Name(header.name()),
        field_id::SRC => FieldRef::Src(header.src()),
        field_id::DEST => FieldRef::Dest(header.dests()),
        field_id::PROPERTIES => FieldRef::Properties(header.properties()),
        _ => return None,
    })
}

fn unknown_field(kind: MsgKind, id: FieldId) -> ! {
    panic!("field {id:?} listed in the {kind} table has no projection")
}

impl Fields for Cmd {
    fn field_table(&self) -> &'static [FieldInfo] {
        CMD_FIELDS
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&FieldInfo, FieldRef<'_>)) {
        for info in CMD_FIELDS.iter().filter(|i| !i.id.is_virtual()) {
            let field = header_field(MsgKind::Cmd, self.header(), info.id).unwrap_or_else(|| {
                match info.id {
                    field_id::CMD_KIND => FieldRef::CmdKind(self.kind()),
                    field_id::CMD_ID => FieldRef::CmdId(self.id()),
                    other => unknown_field(MsgKind::Cmd, other),
                }
            });
            visit(info, field);
        }
    }
}

impl Fields for CmdResult {
    fn field_table(&self) -> &'static [FieldInfo] {
        CMD_RESULT_FIELDS
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&FieldInfo, FieldRef<'_>)) {
        for info in CMD_RESULT_FIELDS.iter().filter(|i| !i.id.is_virtual()) {
            let field = header_field(MsgKind::CmdResult, self.header(), info.id).unwrap_or_else(
                || match info.id {
                    field_id::ORIGINAL_CMD_ID => FieldRef::CmdId(self.original_cmd_id()),
                    field_id::STATUS_CODE => FieldRef::StatusCode(self.status()),
                    field_id::IS_FINAL => FieldRef::Flag(self.is_final()),
                    field_id::IS_COMPLETED => FieldRef::Flag(self.is_completed()),
                    other => unknown_field(MsgKind::CmdResult, other),
                },
            );
            visit(info, field);
        }
    }
}

impl Fields for Data {
    fn field_table(&self) -> &'static [FieldInfo] {
        DATA_FIELDS
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&FieldInfo, FieldRef<'_>)) {
        for info in DATA_FIELDS.iter().filter(|i| !i.id.is_virtual()) {
            let field = header_field(MsgKind::Data, self.header(), info.id).unwrap_or_else(|| {
                match info.id {
                    field_id::BUF => FieldRef::Buf(self.buf()),
                    other => unknown_field(MsgKind::Data, other),
                }
            });
            visit(info, field);
        }
    }
}

impl Fields for AudioFrame {
    fn field_table(&self) -> &'static [FieldInfo] {
        AUDIO_FRAME_FIELDS
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&FieldInfo, FieldRef<'_>)) {
        for info in AUDIO_FRAME_FIELDS.iter().filter(|i| !i.id.is_virtual()) {
            let field = header_field(MsgKind::AudioFrame, self.header(), info.id)
                .unwrap_or_else(|| match info.id {
                    field_id::BUF => FieldRef::Buf(self.buf()),
                    field_id::SAMPLE_RATE => FieldRef::U32(self.sample_rate),
                    field_id::CHANNELS => FieldRef::U32(self.channels),
                    field_id::BYTES_PER_SAMPLE => FieldRef::U32(self.bytes_per_sample),
                    field_id::SAMPLES_PER_CHANNEL => FieldRef::U32(self.samples_per_channel),
                    field_id::TIMESTAMP_US => FieldRef::I64(self.timestamp_us),
                    field_id::EOF => FieldRef::Flag(self.eof),
                    other => unknown_field(MsgKind::AudioFrame, other),
                });
            visit(info, field);
        }
    }
}

impl Fields for VideoFrame {
    fn field_table(&self) -> &'static [FieldInfo] {
        VIDEO_FRAME_FIELDS
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&FieldInfo, FieldRef<'_>)) {
        for info in VIDEO_FRAME_FIELDS.iter().filter(|i| !i.id.is_virtual()) {
            let field = header_field(MsgKind::VideoFrame, self.header(), info.id)
                .unwrap_or_else(|| match info.id {
                    field_id::BUF => FieldRef::Buf(self.buf()),
                    field_id::WIDTH => FieldRef::U32(self.width),
                    field_id::HEIGHT => FieldRef::U32(self.height),
                    field_id::PIXEL_FMT => FieldRef::PixelFmt(self.pixel_fmt),
                    field_id::TIMESTAMP_US => FieldRef::I64(self.timestamp_us),
                    field_id::EOF => FieldRef::Flag(self.eof),
                    other => unknown_field(MsgKind::VideoFrame, other),
                });
            visit(info, field);
        }
    }
}
