//! Wire mapping round-trip tests across all message kinds.

use axon_msg::{
    from_wire, to_wire, AudioFrame, Cmd, CmdResult, Data, Loc, Msg, PixelFmt, StatusCode,
    VideoFrame,
};
use serde_json::json;

fn routed(mut msg: Msg) -> Msg {
    msg.header_mut()
        .set_src(Loc::extension("app://a", "g1", "grp", "producer"));
    msg.header_mut().set_dest([
        Loc::extension("app://a", "g1", "grp", "one"),
        Loc::extension("app://b", "g2", "grp2", "two"),
    ]);
    msg.header_mut().set_property("k", json!("v")).unwrap();
    msg.header_mut().set_property("nested.n", json!(7)).unwrap();
    msg
}

/// Round-trip must preserve (type, name, src, dest, properties).
fn assert_envelope_round_trips(msg: &Msg) {
    let decoded = from_wire(to_wire(msg)).unwrap();

    assert_eq!(decoded.kind(), msg.kind(), "kind tag");
    assert_eq!(decoded.header().name(), msg.header().name(), "name");
    assert_eq!(decoded.header().src(), msg.header().src(), "src");
    assert_eq!(decoded.header().dests(), msg.header().dests(), "dest");
    assert_eq!(
        decoded.header().properties(),
        msg.header().properties(),
        "properties"
    );
}

#[test]
fn cmd_round_trip() {
    assert_envelope_round_trips(&routed(Cmd::new("do_it").into()));
}

#[test]
fn specialized_cmds_round_trip() {
    for cmd in [
        Cmd::start_graph("default"),
        Cmd::start_graph_inline(json!({"nodes": []})),
        Cmd::stop_graph("1db51aa2-2e53-41a6-84c3-1c12c3b2a4f5"),
        Cmd::close_app(),
        Cmd::timer(1, 1_000, 3),
        Cmd::timeout(1),
    ] {
        let msg: Msg = cmd.into();
        let decoded = from_wire(to_wire(&msg)).unwrap();
        assert_eq!(decoded, msg);
    }
}

#[test]
fn cmd_result_round_trip() {
    let cmd = Cmd::new("ask");
    let result = CmdResult::for_cmd(&cmd, StatusCode::Ok);
    assert_envelope_round_trips(&routed(result.into()));
}

#[test]
fn data_round_trip() {
    assert_envelope_round_trips(&routed(Data::new("blob").into()));
}

#[test]
fn audio_frame_round_trip_keeps_layout() {
    let mut frame = AudioFrame::new("pcm");
    frame.sample_rate = 44_100;
    frame.channels = 2;
    frame.bytes_per_sample = 2;
    frame.samples_per_channel = 441;
    frame.timestamp_us = 123_456;
    frame.eof = true;

    let msg = routed(frame.into());
    assert_envelope_round_trips(&msg);

    let decoded = from_wire(to_wire(&msg)).unwrap();
    let Msg::AudioFrame(decoded) = decoded else {
        panic!("expected audio frame")
    };
    assert_eq!(decoded.sample_rate, 44_100);
    assert_eq!(decoded.channels, 2);
    assert_eq!(decoded.samples_per_channel, 441);
    assert!(decoded.eof);
}

#[test]
fn video_frame_round_trip_keeps_layout() {
    let mut frame = VideoFrame::new("raw");
    frame.width = 640;
    frame.height = 480;
    frame.pixel_fmt = PixelFmt::I420;
    frame.timestamp_us = 42;

    let msg = routed(frame.into());
    assert_envelope_round_trips(&msg);

    let decoded = from_wire(to_wire(&msg)).unwrap();
    let Msg::VideoFrame(decoded) = decoded else {
        panic!("expected video frame")
    };
    assert_eq!((decoded.width, decoded.height), (640, 480));
    assert_eq!(decoded.pixel_fmt, PixelFmt::I420);
}

/// A command named "hello" with one extension destination survives the
/// full encode/decode cycle with name, destination, and (empty)
/// properties intact.
#[test]
fn hello_cmd_end_to_end() {
    let mut cmd = Cmd::new("hello");
    cmd.header_mut()
        .set_dest([Loc::extension("", "g1", "grp", "target")]);
    let original: Msg = cmd.into();

    let decoded = from_wire(to_wire(&original)).unwrap();

    assert_eq!(decoded.header().name(), "hello");
    assert_eq!(decoded.header().dest_count(), 1);
    let dest = decoded.header().first_dest().unwrap();
    assert_eq!(dest.app, "");
    assert_eq!(dest.graph, "g1");
    assert_eq!(dest.extension_group, "grp");
    assert_eq!(dest.extension, "target");
    assert!(decoded.header().properties().is_empty());
    assert_eq!(decoded, original);
}

#[test]
fn empty_name_is_allowed() {
    let msg: Msg = Data::new("").into();
    let decoded = from_wire(to_wire(&msg)).unwrap();
    assert_eq!(decoded.header().name(), "");
}
