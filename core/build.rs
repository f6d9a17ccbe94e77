fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Central proto directory is at ../proto/ relative to core/
    let proto_root = "../proto";
    let gateway_proto = format!("{proto_root}/telemetrygateway/v1/telemetrygateway.proto");

    println!("cargo:rerun-if-changed={gateway_proto}");
    println!("cargo:rerun-if-env-changed=TELEMETRY_GATEWAY_REGENERATE_PROTO");

    // The generated file is checked in; regenerating needs protoc on PATH.
    if std::env::var_os("TELEMETRY_GATEWAY_REGENERATE_PROTO").is_none() {
        return Ok(());
    }

    if !std::path::Path::new(&gateway_proto).exists() {
        println!("cargo:warning=Proto source not found, using pre-generated file");
        return Ok(());
    }

    let mut config = tonic_build::Config::new();
    config.btree_map(["."]);

    let mut builder = tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .out_dir("src/proto")
        .type_attribute(".", "#[derive(::serde::Serialize)]")
        .type_attribute(".", "#[serde(rename_all = \"camelCase\")]")
        .field_attribute(
            ".telemetrygateway.v1.Event.timestamp",
            "#[serde(with = \"crate::json::timestamp\")]",
        )
        .field_attribute(
            ".telemetrygateway.v1.EventParameters.private_metadata",
            "#[serde(with = \"crate::json::private_metadata\", skip_serializing_if = \"::core::option::Option::is_none\")]",
        )
        .field_attribute(
            ".telemetrygateway.v1.Identifier.identifier",
            "#[serde(flatten)]",
        )
        .field_attribute(
            ".telemetrygateway.v1.RecordEventsRequest.payload",
            "#[serde(flatten)]",
        );

    // Absent optional fields are omitted from JSON rather than rendered as null.
    for field in [
        ".telemetrygateway.v1.Event.user",
        ".telemetrygateway.v1.Event.feature_flags",
        ".telemetrygateway.v1.Event.marketing_tracking",
        ".telemetrygateway.v1.Event.interaction",
        ".telemetrygateway.v1.EventSource.client",
        ".telemetrygateway.v1.EventSource.Client.version",
        ".telemetrygateway.v1.EventParameters.billing_metadata",
        ".telemetrygateway.v1.EventUser.user_id",
        ".telemetrygateway.v1.EventUser.anonymous_user_id",
        ".telemetrygateway.v1.EventInteraction.trace_id",
        ".telemetrygateway.v1.EventInteraction.interaction_id",
        ".telemetrygateway.v1.EventInteraction.geolocation",
    ] {
        builder = builder.field_attribute(
            field,
            "#[serde(skip_serializing_if = \"::core::option::Option::is_none\")]",
        );
    }

    builder.compile_protos_with_config(config, &[&gateway_proto], &[proto_root])?;

    Ok(())
}
