use prost::Message;

use loghub_proto::v1::{log_entry, trace, value, LogEntry, SpanContext, Trace, Value};

fn sample_entry() -> LogEntry {
    let mut entry = LogEntry {
        nano_ts: 1_234_567_890,
        trace: Some(Trace {
            span_context: Some(SpanContext {
                trace_id: (0u8..16).collect(),
                span_id: 42,
            }),
            event: Some(trace::Event::SpanStart(trace::SpanStart {
                name: "handler".to_string(),
                kind: 2,
                links: Vec::new(),
            })),
        }),
        level: log_entry::Level::Info as i32,
        location: "server.rs:17".to_string(),
        message: "request accepted".to_string(),
        attributes: Default::default(),
    };
    entry.attributes.insert(
        "method".to_string(),
        Value {
            value: Some(value::Value::StrValue("GET".to_string())),
        },
    );
    entry.attributes.insert(
        "elapsed".to_string(),
        Value {
            value: Some(value::Value::DoubleValue(0.25)),
        },
    );
    entry.attributes.insert(
        "payload".to_string(),
        Value {
            value: Some(value::Value::Proto(vec![0xde, 0xad, 0xbe, 0xef])),
        },
    );
    entry
}

#[test]
fn proto_roundtrip_preserves_entry() {
    let entry = sample_entry();
    let encoded = entry.encode_to_vec();
    let decoded = LogEntry::decode(&encoded[..]).expect("decode");
    assert_eq!(entry, decoded);
}

#[test]
fn json_roundtrip_preserves_entry() {
    let entry = sample_entry();
    let json = serde_json::to_string(&entry).expect("serialize");
    let decoded: LogEntry = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(entry, decoded);
}

#[test]
fn json_encodes_trace_id_as_base64() {
    let entry = sample_entry();
    let json = serde_json::to_value(&entry).expect("serialize");
    let trace_id = json["trace"]["span_context"]["trace_id"]
        .as_str()
        .expect("trace_id is a string");
    use base64::Engine;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(trace_id)
        .expect("valid base64");
    assert_eq!(decoded, (0u8..16).collect::<Vec<u8>>());
}

#[test]
fn json_tolerates_missing_fields() {
    let decoded: LogEntry = serde_json::from_str(r#"{"message":"hello"}"#).expect("deserialize");
    assert_eq!(decoded.message, "hello");
    assert_eq!(decoded.nano_ts, 0);
    assert!(decoded.trace.is_none());
}
