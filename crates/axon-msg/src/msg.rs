//! The message envelope.
//!
//! [`Msg`] is the closed union routing code passes around. It delegates
//! the shared header to whichever concrete kind it wraps, so the
//! pipeline manipulates names, sources, and destination lists without
//! branching on kinds — and the generic field loop is one `match`
//! dispatching to the per-kind [`Fields`] impl.

use crate::field::{self, field_id, FieldId, FieldInfo, FieldRef, Fields};
use crate::{AudioFrame, Buf, Cmd, CmdResult, Data, MsgHeader, MsgKind, VideoFrame};
use axon_types::Loc;
use serde_json::Map;

/// A message of any kind.
///
/// The kind tag never changes after creation: there is no conversion
/// between variants, only construction of a new message.
///
/// # Ownership
///
/// Messages are plain owned values. Handing one across a thread
/// boundary means moving or cloning it — payload storage is never
/// shared mutably between two holders ([`Buf`] clones deep-copy).
#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// A command.
    Cmd(Cmd),
    /// A command result.
    CmdResult(CmdResult),
    /// An opaque data payload.
    Data(Data),
    /// An audio frame.
    AudioFrame(AudioFrame),
    /// A video frame.
    VideoFrame(VideoFrame),
}

impl Msg {
    /// The kind tag of this message.
    #[must_use]
    pub fn kind(&self) -> MsgKind {
        match self {
            Self::Cmd(_) => MsgKind::Cmd,
            Self::CmdResult(_) => MsgKind::CmdResult,
            Self::Data(_) => MsgKind::Data,
            Self::AudioFrame(_) => MsgKind::AudioFrame,
            Self::VideoFrame(_) => MsgKind::VideoFrame,
        }
    }

    /// Shared routing header.
    #[must_use]
    pub fn header(&self) -> &MsgHeader {
        match self {
            Self::Cmd(m) => m.header(),
            Self::CmdResult(m) => m.header(),
            Self::Data(m) => m.header(),
            Self::AudioFrame(m) => m.header(),
            Self::VideoFrame(m) => m.header(),
        }
    }

    /// Mutable routing header.
    pub fn header_mut(&mut self) -> &mut MsgHeader {
        match self {
            Self::Cmd(m) => m.header_mut(),
            Self::CmdResult(m) => m.header_mut(),
            Self::Data(m) => m.header_mut(),
            Self::AudioFrame(m) => m.header_mut(),
            Self::VideoFrame(m) => m.header_mut(),
        }
    }

    /// The payload buffer, for the kinds that carry one.
    #[must_use]
    pub fn buf(&self) -> Option<&Buf> {
        match self {
            Self::Data(m) => Some(m.buf()),
            Self::AudioFrame(m) => Some(m.buf()),
            Self::VideoFrame(m) => Some(m.buf()),
            Self::Cmd(_) | Self::CmdResult(_) => None,
        }
    }

    /// Mutable payload buffer, for the kinds that carry one.
    pub fn buf_mut(&mut self) -> Option<&mut Buf> {
        match self {
            Self::Data(m) => Some(m.buf_mut()),
            Self::AudioFrame(m) => Some(m.buf_mut()),
            Self::VideoFrame(m) => Some(m.buf_mut()),
            Self::Cmd(_) | Self::CmdResult(_) => None,
        }
    }

    /// Deep-copies this message, resetting the excluded fields.
    ///
    /// The copy shares nothing mutable with the original: destination
    /// list and properties are deep-copied, payload buffers get fresh
    /// storage with a zero lock count. Excluded fields are reset to
    /// their defaults in the copy.
    ///
    /// Excludable fields: `NAME`, `SRC`, `DEST`, `PROPERTIES`, `BUF`.
    ///
    /// # Panics
    ///
    /// Excluding a field that is not part of this kind's table, or an
    /// identity field (kind tag, command ids, result metadata), is a
    /// programming-logic fault and panics.
    #[must_use]
    pub fn clone_msg(&self, excluded: &[FieldId]) -> Msg {
        let mut copy = self.clone();
        for &id in excluded {
            field::assert_in_table(copy.kind(), id);
            copy.reset_field(id);
        }
        copy
    }

    fn reset_field(&mut self, id: FieldId) {
        match id {
            field_id::NAME => self.header_mut().set_name(""),
            field_id::SRC => self.header_mut().set_src(Loc::default()),
            field_id::DEST => self.header_mut().clear_dest(),
            field_id::PROPERTIES => self.header_mut().set_properties(Map::new()),
            field_id::BUF => {
                let buf = self
                    .buf_mut()
                    .expect("BUF is only listed in payload-carrying tables");
                *buf = Buf::default();
            }
            other => panic!(
                "field {other:?} of kind {} cannot be excluded from a clone",
                self.kind()
            ),
        }
    }
}

impl Fields for Msg {
    fn field_table(&self) -> &'static [FieldInfo] {
        match self {
            Self::Cmd(m) => m.field_table(),
            Self::CmdResult(m) => m.field_table(),
            Self::Data(m) => m.field_table(),
            Self::AudioFrame(m) => m.field_table(),
            Self::VideoFrame(m) => m.field_table(),
        }
    }

    fn visit_fields(&self, visit: &mut dyn FnMut(&FieldInfo, FieldRef<'_>)) {
        match self {
            Self::Cmd(m) => m.visit_fields(visit),
            Self::CmdResult(m) => m.visit_fields(visit),
            Self::Data(m) => m.visit_fields(visit),
            Self::AudioFrame(m) => m.visit_fields(visit),
            Self::VideoFrame(m) => m.visit_fields(visit),
        }
    }
}

impl From<Cmd> for Msg {
    fn from(cmd: Cmd) -> Self {
        Self::Cmd(cmd)
    }
}

impl From<CmdResult> for Msg {
    fn from(result: CmdResult) -> Self {
        Self::CmdResult(result)
    }
}

impl From<Data> for Msg {
    fn from(data: Data) -> Self {
        Self::Data(data)
    }
}

impl From<AudioFrame> for Msg {
    fn from(frame: AudioFrame) -> Self {
        Self::AudioFrame(frame)
    }
}

impl From<VideoFrame> for Msg {
    fn from(frame: VideoFrame) -> Self {
        Self::VideoFrame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dest(ext: &str) -> Loc {
        Loc::extension("", "g1", "grp", ext)
    }

    #[test]
    fn kind_tags() {
        assert_eq!(Msg::from(Cmd::new("c")).kind(), MsgKind::Cmd);
        assert_eq!(Msg::from(Data::new("d")).kind(), MsgKind::Data);
        assert_eq!(Msg::from(AudioFrame::new("a")).kind(), MsgKind::AudioFrame);
        assert_eq!(Msg::from(VideoFrame::new("v")).kind(), MsgKind::VideoFrame);
    }

    #[test]
    fn header_delegation() {
        let mut msg = Msg::from(Cmd::new("hello"));
        msg.header_mut().add_dest(dest("a"));
        msg.header_mut().add_dest(dest("b"));

        assert_eq!(msg.header().name(), "hello");
        assert_eq!(msg.header().dest_count(), 2);
        assert_eq!(msg.header().first_dest().unwrap().extension, "a");
    }

    #[test]
    fn clone_with_no_exclusions_is_fieldwise_equal() {
        let mut msg = Msg::from(Data::with_payload("blob", vec![1, 2, 3]));
        msg.header_mut().set_src(dest("producer"));
        msg.header_mut().set_dest([dest("consumer")]);
        msg.header_mut().set_property("k", json!("v")).unwrap();

        let copy = msg.clone_msg(&[]);
        assert_eq!(copy, msg);
    }

    #[test]
    fn clone_payload_storage_is_independent() {
        let msg = Msg::from(Data::with_payload("blob", vec![1]));
        let mut copy = msg.clone_msg(&[]);

        copy.buf_mut().unwrap().data_mut().unwrap().push(2);

        assert_eq!(msg.buf().unwrap().data(), &[1]);
        assert_eq!(copy.buf().unwrap().data(), &[1, 2]);
    }

    #[test]
    fn clone_excluding_dest_resets_it() {
        let mut msg = Msg::from(Cmd::new("c"));
        msg.header_mut().set_dest([dest("a"), dest("b")]);

        let copy = msg.clone_msg(&[field_id::DEST]);

        assert_eq!(copy.header().dest_count(), 0);
        assert_eq!(msg.header().dest_count(), 2);
        assert_eq!(copy.header().name(), "c");
    }

    #[test]
    #[should_panic(expected = "not part of the")]
    fn clone_excluding_foreign_field_panics() {
        let msg = Msg::from(Data::new("d"));
        let _ = msg.clone_msg(&[field_id::STATUS_CODE]);
    }

    #[test]
    #[should_panic(expected = "cannot be excluded")]
    fn clone_excluding_identity_field_panics() {
        let msg = Msg::from(Cmd::new("c"));
        let _ = msg.clone_msg(&[field_id::CMD_ID]);
    }

    #[test]
    fn generic_field_loop_dispatches_per_kind() {
        let msgs: Vec<Msg> = vec![
            Cmd::new("c").into(),
            Data::new("d").into(),
            VideoFrame::new("v").into(),
        ];
        for msg in &msgs {
            let mut kinds = Vec::new();
            msg.visit_fields(&mut |info, _| kinds.push(info.id));
            assert!(!kinds.is_empty());
            assert!(kinds.contains(&field_id::NAME));
        }
    }
}
