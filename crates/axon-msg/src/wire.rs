//! Structured wire mapping.
//!
//! The wire shape is a structured value, not a byte layout: concrete
//! codecs (JSON, binary-pack) sit outside this crate and only agree on
//! the field registry and this logical shape.
//!
//! ```json
//! {
//!   "_axon": {
//!     "type": "cmd",
//!     "name": "hello",
//!     "src":  { "graph": "g1", "extension_group": "grp", "extension": "me" },
//!     "dest": [ { "graph": "g1", "extension_group": "grp", "extension": "target" } ]
//!   },
//!   "answer": 42
//! }
//! ```
//!
//! Routing metadata lives under the reserved `_axon` key; the free-form
//! properties are merged at the top level outside it. A property named
//! `_axon` is therefore unrepresentable, by design of the format.
//!
//! Payload buffers are not part of the logical wire value; how bytes
//! travel is the concrete codec's business.

use crate::kind::{resolve_wire_type, ResolvedKind};
use crate::{
    AudioFrame, Buf, Cmd, CmdKind, CmdResult, Data, Msg, MsgError, MsgHeader, PixelFmt, StatusCode,
    VideoFrame,
};
use axon_types::{CmdId, Loc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// The reserved top-level key grouping routing metadata.
pub const RESERVED_KEY: &str = "_axon";

/// Encodes a message into its structured wire value.
#[must_use]
pub fn to_wire(msg: &Msg) -> Value {
    let header = msg.header();
    let mut root = header.properties().clone();

    let mut meta = Map::new();
    meta.insert("type".into(), json!(wire_type(msg)));
    meta.insert("name".into(), json!(header.name()));
    if !header.src().is_empty() {
        meta.insert(
            "src".into(),
            serde_json::to_value(header.src()).expect("Loc serialization is infallible"),
        );
    }
    if header.dest_count() > 0 {
        meta.insert(
            "dest".into(),
            serde_json::to_value(header.dests()).expect("Loc serialization is infallible"),
        );
    }

    match msg {
        Msg::Cmd(cmd) => encode_cmd(cmd, &mut meta),
        Msg::CmdResult(result) => encode_cmd_result(result, &mut meta),
        Msg::Data(_) => {}
        Msg::AudioFrame(frame) => encode_audio_frame(frame, &mut meta),
        Msg::VideoFrame(frame) => encode_video_frame(frame, &mut meta),
    }

    root.insert(RESERVED_KEY.into(), Value::Object(meta));
    Value::Object(root)
}

/// Decodes a structured wire value into a message.
///
/// # Errors
///
/// [`MsgError::MalformedWire`] when the reserved namespace or its
/// `type` is absent, the `(type, name)` pair is ambiguous, or a
/// required kind-specific field is missing or mistyped.
/// [`MsgError::InvalidLoc`] when a decoded coordinate violates its
/// structural invariant.
pub fn from_wire(value: Value) -> Result<Msg, MsgError> {
    let Value::Object(mut root) = value else {
        return Err(MsgError::MalformedWire("wire value is not an object".into()));
    };

    let meta = match root.remove(RESERVED_KEY) {
        Some(Value::Object(meta)) => meta,
        Some(_) => {
            return Err(MsgError::MalformedWire(format!(
                "'{RESERVED_KEY}' is not an object"
            )))
        }
        None => {
            return Err(MsgError::MalformedWire(format!(
                "missing reserved '{RESERVED_KEY}' namespace"
            )))
        }
    };

    let ty = meta
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| MsgError::MalformedWire("missing 'type' discriminant".into()))?;
    let name = meta.get("name").and_then(Value::as_str).unwrap_or("");
    let resolved = resolve_wire_type(ty, name)?;

    let src: Loc = match meta.get("src") {
        Some(v) => decode_loc(v)?,
        None => Loc::default(),
    };
    let mut dests = Vec::new();
    if let Some(v) = meta.get("dest") {
        let arr = v
            .as_array()
            .ok_or_else(|| MsgError::MalformedWire("'dest' is not an array".into()))?;
        for entry in arr {
            dests.push(decode_loc(entry)?);
        }
    }

    let mut header = MsgHeader::new(name);
    header.set_src(src);
    header.set_dest(dests);
    header.set_properties(root);

    match resolved {
        ResolvedKind::Cmd => Ok(Cmd::from_parts(header, CmdKind::Custom, cmd_id(&meta)?).into()),
        ResolvedKind::StartGraph => {
            let kind = CmdKind::StartGraph {
                predefined_graph: meta
                    .get("predefined_graph")
                    .and_then(Value::as_str)
                    .map(String::from),
                graph_json: meta.get("graph").cloned(),
            };
            Ok(Cmd::from_parts(header, kind, cmd_id(&meta)?).into())
        }
        ResolvedKind::StopGraph => {
            let kind = CmdKind::StopGraph {
                graph_id: required_str(&meta, "graph_id")?.to_string(),
            };
            Ok(Cmd::from_parts(header, kind, cmd_id(&meta)?).into())
        }
        ResolvedKind::CloseApp => {
            Ok(Cmd::from_parts(header, CmdKind::CloseApp, cmd_id(&meta)?).into())
        }
        ResolvedKind::Timer => {
            let kind = CmdKind::Timer {
                timer_id: required_u64(&meta, "timer_id")?,
                timeout_us: required_u64(&meta, "timeout_us")?,
                times: meta
                    .get("times")
                    .and_then(Value::as_i64)
                    .map_or(1, |v| v as i32),
            };
            Ok(Cmd::from_parts(header, kind, cmd_id(&meta)?).into())
        }
        ResolvedKind::Timeout => {
            let kind = CmdKind::Timeout {
                timer_id: required_u64(&meta, "timer_id")?,
            };
            Ok(Cmd::from_parts(header, kind, cmd_id(&meta)?).into())
        }
        ResolvedKind::CmdResult => {
            let original = required_str(&meta, "original_cmd_id")?;
            let original = Uuid::parse_str(original).map_err(|_| {
                MsgError::MalformedWire("'original_cmd_id' is not a uuid".into())
            })?;
            let status = required_str(&meta, "status_code")?;
            let status = StatusCode::from_wire(status).ok_or_else(|| {
                MsgError::MalformedWire(format!("unknown status_code '{status}'"))
            })?;
            Ok(CmdResult::from_parts(
                header,
                CmdId(original),
                status,
                meta.get("is_final").and_then(Value::as_bool).unwrap_or(true),
                meta.get("is_completed")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
            )
            .into())
        }
        ResolvedKind::Data => Ok(Data::from_parts(header, Buf::default()).into()),
        ResolvedKind::AudioFrame => {
            let mut frame = AudioFrame::from_parts(header, Buf::default());
            frame.sample_rate = optional_u64(&meta, "sample_rate")? as u32;
            frame.channels = optional_u64(&meta, "channels")? as u32;
            frame.bytes_per_sample = optional_u64(&meta, "bytes_per_sample")? as u32;
            frame.samples_per_channel = optional_u64(&meta, "samples_per_channel")? as u32;
            frame.timestamp_us = meta.get("timestamp_us").and_then(Value::as_i64).unwrap_or(0);
            frame.eof = meta.get("eof").and_then(Value::as_bool).unwrap_or(false);
            Ok(frame.into())
        }
        ResolvedKind::VideoFrame => {
            let mut frame = VideoFrame::from_parts(header, Buf::default());
            frame.width = optional_u64(&meta, "width")? as u32;
            frame.height = optional_u64(&meta, "height")? as u32;
            if let Some(fmt) = meta.get("pixel_fmt") {
                let fmt = fmt.as_str().and_then(PixelFmt::from_wire).ok_or_else(|| {
                    MsgError::MalformedWire("unknown pixel_fmt".into())
                })?;
                frame.pixel_fmt = fmt;
            }
            frame.timestamp_us = meta.get("timestamp_us").and_then(Value::as_i64).unwrap_or(0);
            frame.eof = meta.get("eof").and_then(Value::as_bool).unwrap_or(false);
            Ok(frame.into())
        }
    }
}

fn wire_type(msg: &Msg) -> &'static str {
    match msg {
        Msg::Cmd(cmd) => cmd.kind().wire_type(),
        other => other.kind().as_str(),
    }
}

fn encode_cmd(cmd: &Cmd, meta: &mut Map<String, Value>) {
    meta.insert("cmd_id".into(), json!(cmd.id().uuid().to_string()));
    match cmd.kind() {
        CmdKind::Custom | CmdKind::CloseApp => {}
        CmdKind::StartGraph {
            predefined_graph,
            graph_json,
        } => {
            if let Some(alias) = predefined_graph {
                meta.insert("predefined_graph".into(), json!(alias));
            }
            if let Some(graph) = graph_json {
                meta.insert("graph".into(), graph.clone());
            }
        }
        CmdKind::StopGraph { graph_id } => {
            meta.insert("graph_id".into(), json!(graph_id));
        }
        CmdKind::Timer {
            timer_id,
            timeout_us,
            times,
        } => {
            meta.insert("timer_id".into(), json!(timer_id));
            meta.insert("timeout_us".into(), json!(timeout_us));
            meta.insert("times".into(), json!(times));
        }
        CmdKind::Timeout { timer_id } => {
            meta.insert("timer_id".into(), json!(timer_id));
        }
    }
}

fn encode_cmd_result(result: &CmdResult, meta: &mut Map<String, Value>) {
    meta.insert(
        "original_cmd_id".into(),
        json!(result.original_cmd_id().uuid().to_string()),
    );
    meta.insert("status_code".into(), json!(result.status().as_str()));
    meta.insert("is_final".into(), json!(result.is_final()));
    meta.insert("is_completed".into(), json!(result.is_completed()));
}

fn encode_audio_frame(frame: &AudioFrame, meta: &mut Map<String, Value>) {
    meta.insert("sample_rate".into(), json!(frame.sample_rate));
    meta.insert("channels".into(), json!(frame.channels));
    meta.insert("bytes_per_sample".into(), json!(frame.bytes_per_sample));
    meta.insert(
        "samples_per_channel".into(),
        json!(frame.samples_per_channel),
    );
    meta.insert("timestamp_us".into(), json!(frame.timestamp_us));
    meta.insert("eof".into(), json!(frame.eof));
}

fn encode_video_frame(frame: &VideoFrame, meta: &mut Map<String, Value>) {
    meta.insert("width".into(), json!(frame.width));
    meta.insert("height".into(), json!(frame.height));
    meta.insert("pixel_fmt".into(), json!(frame.pixel_fmt.as_str()));
    meta.insert("timestamp_us".into(), json!(frame.timestamp_us));
    meta.insert("eof".into(), json!(frame.eof));
}

fn decode_loc(value: &Value) -> Result<Loc, MsgError> {
    let loc: Loc = serde_json::from_value(value.clone())
        .map_err(|e| MsgError::MalformedWire(format!("bad loc: {e}")))?;
    loc.validate()?;
    Ok(loc)
}

fn cmd_id(meta: &Map<String, Value>) -> Result<CmdId, MsgError> {
    match meta.get("cmd_id") {
        // A foreign encoder may omit the id; the decoded command gets a
        // fresh one.
        None => Ok(CmdId::new()),
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| MsgError::MalformedWire("'cmd_id' is not a string".into()))?;
            let uuid = Uuid::parse_str(s)
                .map_err(|_| MsgError::MalformedWire("'cmd_id' is not a uuid".into()))?;
            Ok(CmdId(uuid))
        }
    }
}

fn required_str<'a>(meta: &'a Map<String, Value>, key: &str) -> Result<&'a str, MsgError> {
    meta.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| MsgError::MalformedWire(format!("missing required field '{key}'")))
}

fn required_u64(meta: &Map<String, Value>, key: &str) -> Result<u64, MsgError> {
    meta.get(key)
        .and_then(Value::as_u64)
        .ok_or_else(|| MsgError::MalformedWire(format!("missing required field '{key}'")))
}

fn optional_u64(meta: &Map<String, Value>, key: &str) -> Result<u64, MsgError> {
    match meta.get(key) {
        None => Ok(0),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| MsgError::MalformedWire(format!("'{key}' is not an integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_namespace_is_malformed() {
        let err = from_wire(json!({"answer": 42})).unwrap_err();
        assert!(matches!(err, MsgError::MalformedWire(_)));
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = from_wire(json!({"_axon": {"name": "x"}})).unwrap_err();
        assert!(matches!(err, MsgError::MalformedWire(_)));
    }

    #[test]
    fn ambiguous_type_name_pair_is_malformed() {
        let err = from_wire(json!({"_axon": {"type": "cmd", "name": "timer"}})).unwrap_err();
        assert!(matches!(err, MsgError::MalformedWire(_)));
    }

    #[test]
    fn non_object_value_is_malformed() {
        assert!(from_wire(json!([1, 2])).is_err());
        assert!(from_wire(json!("cmd")).is_err());
    }

    #[test]
    fn invalid_loc_in_dest_is_rejected() {
        let err = from_wire(json!({
            "_axon": {
                "type": "cmd",
                "name": "x",
                "dest": [{"extension": "orphan"}]
            }
        }))
        .unwrap_err();
        assert!(matches!(err, MsgError::InvalidLoc(_)));
    }

    #[test]
    fn properties_sit_outside_the_namespace() {
        let msg = from_wire(json!({
            "_axon": {"type": "data", "name": "blob"},
            "a": 1,
            "b": {"c": true}
        }))
        .unwrap();

        assert_eq!(msg.header().property("a"), Some(&json!(1)));
        assert_eq!(msg.header().property("b.c"), Some(&json!(true)));

        let wire = to_wire(&msg);
        assert_eq!(wire["a"], json!(1));
        assert!(wire["_axon"].is_object());
    }

    #[test]
    fn timer_requires_its_fields() {
        let err = from_wire(json!({"_axon": {"type": "timer"}})).unwrap_err();
        assert!(matches!(err, MsgError::MalformedWire(_)));

        let msg = from_wire(json!({
            "_axon": {"type": "timer", "timer_id": 3, "timeout_us": 500, "times": -1}
        }))
        .unwrap();
        let Msg::Cmd(cmd) = msg else { panic!("expected cmd") };
        assert!(matches!(
            cmd.kind(),
            CmdKind::Timer { timer_id: 3, timeout_us: 500, times: -1 }
        ));
    }

    #[test]
    fn cmd_result_round_trips_metadata() {
        let cmd = Cmd::new("op");
        let result = CmdResult::for_cmd(&cmd, StatusCode::Error).partial();
        let wire = to_wire(&result.clone().into());

        let decoded = from_wire(wire).unwrap();
        let Msg::CmdResult(decoded) = decoded else {
            panic!("expected cmd_result")
        };
        assert_eq!(decoded.original_cmd_id(), cmd.id());
        assert_eq!(decoded.status(), StatusCode::Error);
        assert!(!decoded.is_final());
        assert!(!decoded.is_completed());
    }

    #[test]
    fn unknown_status_code_is_malformed() {
        let err = from_wire(json!({
            "_axon": {
                "type": "cmd_result",
                "original_cmd_id": uuid::Uuid::new_v4().to_string(),
                "status_code": "maybe"
            }
        }))
        .unwrap_err();
        assert!(matches!(err, MsgError::MalformedWire(_)));
    }
}
