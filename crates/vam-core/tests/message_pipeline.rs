//! Integration tests for the vam-core message pipeline.
//!
//! These tests drive the public API the way a connection handler does:
//! bytes arrive in arbitrary pieces, a decoder built from a `FramingPolicy`
//! cuts frames, frames are decoded to text, and the filter decides what is
//! forwarded.

use vam_core::{
    decode_text, FrameDecoder, FramingMode, FramingPolicy, KeySequence, MessageError,
    PatternFilter,
};

/// Feeds `pieces` through a fresh decoder and returns every decoded message
/// (or error), flushing at end-of-stream.
fn run(policy: &FramingPolicy, pieces: &[&[u8]]) -> Vec<Result<String, MessageError>> {
    let mut decoder: Box<dyn FrameDecoder> = policy.decoder();
    let mut buf = Vec::new();
    let mut out = Vec::new();

    let mut drain = |decoder: &mut Box<dyn FrameDecoder>, buf: &mut Vec<u8>, eof: bool| loop {
        let step = if eof {
            decoder.decode_eof(buf)
        } else {
            decoder.decode(buf)
        };
        match step {
            Ok(Some(frame)) => out.push(decode_text(&frame).map(|m| m.as_str().to_string())),
            Ok(None) => break,
            Err(e) => out.push(Err(e.into())),
        }
    };

    for piece in pieces {
        buf.extend_from_slice(piece);
        drain(&mut decoder, &mut buf, false);
    }
    drain(&mut decoder, &mut buf, true);
    out
}

fn newline_policy() -> FramingPolicy {
    FramingPolicy {
        mode: FramingMode::Newline,
        chunk_size: 8,
        max_frame_len: 32,
    }
}

#[test]
fn test_newline_policy_reassembles_messages_split_across_reads() {
    let messages = run(
        &newline_policy(),
        &[b"gener", b"ic007rea", b"dy\nhello", b" world\ngeneric042-start"],
    );

    let texts: Vec<String> = messages.into_iter().map(Result::unwrap).collect();
    assert_eq!(texts, vec!["generic007ready", "hello world", "generic042-start"]);
}

#[test]
fn test_filter_over_decoded_stream_keeps_only_matching_messages() {
    let filter = PatternFilter::new();
    let messages = run(
        &newline_policy(),
        &[b"generic001\nhello world\ngeneric42\nxgeneric123\ngeneric999tail\n"],
    );

    let forwarded: Vec<String> = messages
        .into_iter()
        .filter_map(Result::ok)
        .filter(|m| filter.matches(m))
        .collect();
    assert_eq!(forwarded, vec!["generic001", "generic999tail"]);
}

#[test]
fn test_invalid_utf8_message_does_not_stop_the_stream() {
    let messages = run(&newline_policy(), &[b"generic001\n\xFF\xFE\ngeneric002\n"]);

    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].as_deref(), Ok("generic001"));
    assert!(matches!(messages[1], Err(MessageError::InvalidUtf8 { .. })));
    assert_eq!(messages[2].as_deref(), Ok("generic002"));
}

#[test]
fn test_oversized_line_is_reported_and_following_lines_survive() {
    let long = vec![b'g'; 40];
    let messages = run(&newline_policy(), &[&long, b"\ngeneric003\n"]);

    assert!(matches!(messages[0], Err(MessageError::Frame(_))));
    assert_eq!(messages[1].as_deref(), Ok("generic003"));
    assert_eq!(messages.len(), 2);
}

#[test]
fn test_chunk_policy_treats_each_read_as_one_message() {
    let policy = FramingPolicy::default();
    let messages = run(&policy, &[b"generic001\n", b"  generic002  "]);

    let texts: Vec<String> = messages.into_iter().map(Result::unwrap).collect();
    assert_eq!(texts, vec!["generic001", "generic002"]);
}

#[test]
fn test_forwarded_payload_parses_as_key_sequence_downstream() {
    // A consumer payload never passes the forwarding filter, but the same
    // text decoding applies to what the consumer receives.
    let msg = decode_text(b" [17, 18, 0x48]\n").unwrap();
    let seq = KeySequence::parse(msg.as_str()).unwrap();
    assert_eq!(seq.len(), 3);
}
