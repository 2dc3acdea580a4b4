//! Regenerates ../src/generated from ../proto. Requires protoc.
//!
//! The output is checked in so the workspace builds without protoc;
//! rerun this after editing logs.proto and commit the result.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = prost_build::Config::new();
    config.out_dir("../src/generated");

    config.type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]");

    for message in [
        "Value",
        "SpanContext",
        "Link",
        "Trace",
        "Trace.SpanStart",
        "Trace.SpanEnd",
        "LogEntry",
        "Span",
        "IngressBatch",
        "IngressEvent",
    ] {
        config.type_attribute(format!(".logs.v1.{message}"), "#[serde(default)]");
    }

    // Binary blobs cross JSON as base64 strings.
    for field in [".logs.v1.SpanContext.trace_id", ".logs.v1.Value.value.proto"] {
        config.field_attribute(field, "#[serde(with = \"crate::serde_base64\")]");
    }

    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile_protos_with_config(
            config,
            &["../proto/logs/v1/logs.proto"],
            &["../proto"],
        )?;

    Ok(())
}
