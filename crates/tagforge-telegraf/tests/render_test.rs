//! End-to-end tests for the configuration renderer.

use tagforge_core::{
    ClientIdentity, Device, DeviceSnapshot, IdentifierKind, InfluxTarget, ScanClass,
    SecurityPolicy, SystemDefaults, Tag, TagSnapshot,
};
use tagforge_telegraf::{render_config, RenderContext};

fn device(id: i64, name: &str, endpoint: &str) -> Device {
    Device {
        id,
        name: name.to_string(),
        endpoint_url: endpoint.to_string(),
        username: String::new(),
        password: String::new(),
        security_policy: SecurityPolicy::None,
        influx_target_id: None,
        enabled: true,
    }
}

fn tag(id: i64, device_id: i64, name: &str) -> Tag {
    Tag {
        id,
        device_id,
        node_id: format!("ns=2;s={name}"),
        namespace: 2,
        identifier: name.to_string(),
        identifier_type: IdentifierKind::Text,
        display_name: name.to_string(),
        path: String::new(),
        data_type: String::new(),
        measurement_name: String::new(),
        scan_class_id: Some(1),
        enabled: true,
    }
}

fn scan_class(id: i64, name: &str, interval_ms: u32) -> ScanClass {
    ScanClass {
        id,
        name: name.to_string(),
        interval_ms,
        description: String::new(),
        is_default: false,
    }
}

fn target(id: i64, name: &str) -> InfluxTarget {
    InfluxTarget {
        id,
        name: name.to_string(),
        url: "http://influx:8086".to_string(),
        token: "token".to_string(),
        org: "plant".to_string(),
        bucket: "telemetry".to_string(),
        is_default: false,
    }
}

fn identity() -> ClientIdentity {
    ClientIdentity::in_dir("/var/lib/tagforge")
}

fn snapshot_with(
    device: Device,
    tags: Vec<(Tag, Option<ScanClass>)>,
    influx: Option<InfluxTarget>,
) -> DeviceSnapshot {
    DeviceSnapshot {
        device,
        tags: tags
            .into_iter()
            .map(|(tag, scan_class)| TagSnapshot { tag, scan_class })
            .collect(),
        influx,
    }
}

#[test]
fn test_render_is_byte_identical_across_runs() {
    let defaults = SystemDefaults::default();
    let ident = identity();
    let class = scan_class(1, "fast", 1000);
    let devices = vec![
        snapshot_with(
            device(1, "press", "opc.tcp://press:4840"),
            vec![(tag(1, 1, "Force"), Some(class.clone()))],
            Some(target(1, "historian")),
        ),
        snapshot_with(
            device(2, "oven", "opc.tcp://oven:4840"),
            vec![(tag(2, 2, "Temp"), Some(class.clone()))],
            None,
        ),
    ];
    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };

    let first = render_config(&devices, &ctx);
    let second = render_config(&devices, &ctx);
    assert_eq!(first, second);
}

#[test]
fn test_shared_destination_and_class_merge_into_single_blocks() {
    // Two devices behind the same endpoint and credentials, one tag each,
    // sharing one destination and one 5000ms scan class.
    let defaults = SystemDefaults::default();
    let ident = identity();
    let class = scan_class(1, "default", 5000);
    let historian = target(1, "historian");
    let devices = vec![
        snapshot_with(
            device(1, "line-a", "opc.tcp://plc:4840"),
            vec![(tag(1, 1, "Temp"), Some(class.clone()))],
            Some(historian.clone()),
        ),
        snapshot_with(
            device(2, "line-b", "opc.tcp://plc:4840"),
            vec![(tag(2, 2, "Pressure"), Some(class.clone()))],
            Some(historian.clone()),
        ),
    ];
    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };

    let doc = render_config(&devices, &ctx);
    assert_eq!(doc.matches("[[inputs.opcua]]").count(), 1);
    assert_eq!(doc.matches("[[outputs.influxdb_v2]]").count(), 1);
    assert_eq!(doc.matches("[[inputs.opcua.nodes]]").count(), 2);
    assert!(doc.contains("interval = \"5000ms\""));
    assert!(doc.contains("name = \"Temp\""));
    assert!(doc.contains("name = \"Pressure\""));
}

#[test]
fn test_distinct_endpoints_get_distinct_inputs_but_share_output() {
    let defaults = SystemDefaults::default();
    let ident = identity();
    let class = scan_class(1, "fast", 1000);
    let historian = target(1, "historian");
    let devices = vec![
        snapshot_with(
            device(1, "press", "opc.tcp://press:4840"),
            vec![(tag(1, 1, "Force"), Some(class.clone()))],
            Some(historian.clone()),
        ),
        snapshot_with(
            device(2, "oven", "opc.tcp://oven:4840"),
            vec![(tag(2, 2, "Temp"), Some(class.clone()))],
            Some(historian.clone()),
        ),
    ];
    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };

    let doc = render_config(&devices, &ctx);
    assert_eq!(doc.matches("[[inputs.opcua]]").count(), 2);
    assert_eq!(doc.matches("[[outputs.influxdb_v2]]").count(), 1);
    // Both inputs route to the one output.
    assert_eq!(doc.matches("destination = \"historian\"").count(), 2);
    assert_eq!(doc.matches("destination = [\"historian\"]").count(), 1);
}

#[test]
fn test_encrypted_policy_carries_identity_paths_and_none_does_not() {
    let defaults = SystemDefaults::default();
    let ident = identity();
    let class = scan_class(1, "fast", 1000);

    let mut secured = device(1, "secured", "opc.tcp://secured:4840");
    secured.security_policy = SecurityPolicy::Basic256Sha256;
    let devices = vec![
        snapshot_with(secured, vec![(tag(1, 1, "A"), Some(class.clone()))], None),
        snapshot_with(
            device(2, "open", "opc.tcp://open:4840"),
            vec![(tag(2, 2, "B"), Some(class.clone()))],
            None,
        ),
    ];
    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };

    let doc = render_config(&devices, &ctx);
    let open_block = doc
        .split("[[inputs.opcua]]")
        .find(|block| block.contains("name = \"open\""))
        .unwrap();
    let secured_block = doc
        .split("[[inputs.opcua]]")
        .find(|block| block.contains("name = \"secured\""))
        .unwrap();

    assert!(secured_block.contains("security_policy = \"Basic256Sha256\""));
    assert!(secured_block.contains("security_mode = \"SignAndEncrypt\""));
    assert!(secured_block.contains("certificate = \"/var/lib/tagforge/client_cert.der\""));
    assert!(secured_block.contains("private_key = \"/var/lib/tagforge/client_key.pem\""));

    assert!(open_block.contains("security_policy = \"None\""));
    assert!(open_block.contains("security_mode = \"None\""));
    assert!(!open_block.contains("certificate"));
    assert!(!open_block.contains("private_key"));
}

#[test]
fn test_destination_resolution_order() {
    let mut defaults = SystemDefaults::default();
    defaults.influx_url = "http://fallback:8086".to_string();
    defaults.influx_bucket = "fallback-bucket".to_string();
    let ident = identity();
    let class = scan_class(1, "fast", 1000);

    let mut default_target = target(9, "site-default");
    default_target.is_default = true;
    let explicit = target(1, "explicit");

    // Three devices: explicit target, default target, system fallback.
    let devices = vec![
        snapshot_with(
            device(1, "a-explicit", "opc.tcp://a:4840"),
            vec![(tag(1, 1, "T1"), Some(class.clone()))],
            Some(explicit.clone()),
        ),
        snapshot_with(
            device(2, "b-default", "opc.tcp://b:4840"),
            vec![(tag(2, 2, "T2"), Some(class.clone()))],
            None,
        ),
    ];

    let ctx_with_default = RenderContext {
        defaults: &defaults,
        default_target: Some(&default_target),
        default_scan_class: None,
        identity: &ident,
    };
    let doc = render_config(&devices, &ctx_with_default);
    assert!(doc.contains("destination = [\"explicit\"]"));
    assert!(doc.contains("destination = [\"site-default\"]"));

    let ctx_without_default = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };
    let doc = render_config(&devices, &ctx_without_default);
    assert!(doc.contains("destination = [\"system-default\"]"));
    assert!(doc.contains("urls = [\"http://fallback:8086\"]"));
    assert!(doc.contains("bucket = \"fallback-bucket\""));
}

#[test]
fn test_device_without_enabled_tags_contributes_nothing() {
    let defaults = SystemDefaults::default();
    let ident = identity();
    let class = scan_class(1, "fast", 1000);

    let mut disabled_tag = tag(1, 1, "Off");
    disabled_tag.enabled = false;
    let devices = vec![
        snapshot_with(
            device(1, "empty", "opc.tcp://empty:4840"),
            vec![(disabled_tag, Some(class.clone()))],
            Some(target(1, "historian")),
        ),
        snapshot_with(
            device(2, "active", "opc.tcp://active:4840"),
            vec![(tag(2, 2, "On"), Some(class))],
            None,
        ),
    ];
    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };

    let doc = render_config(&devices, &ctx);
    assert_eq!(doc.matches("[[inputs.opcua]]").count(), 1);
    assert!(!doc.contains("opc.tcp://empty:4840"));
    // The idle device's destination is not emitted either.
    assert_eq!(doc.matches("[[outputs.influxdb_v2]]").count(), 1);
    assert!(!doc.contains("[\"historian\"]"));
}

#[test]
fn test_unassigned_tags_use_default_class_interval_then_constant() {
    let defaults = SystemDefaults::default();
    let ident = identity();
    let mut default_class = scan_class(7, "standard", 2500);
    default_class.is_default = true;

    let mut unassigned = tag(1, 1, "Loose");
    unassigned.scan_class_id = None;
    let devices = vec![snapshot_with(
        device(1, "plc", "opc.tcp://plc:4840"),
        vec![(unassigned, None)],
        None,
    )];

    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: Some(&default_class),
        identity: &ident,
    };
    assert!(render_config(&devices, &ctx).contains("interval = \"2500ms\""));

    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };
    assert!(render_config(&devices, &ctx).contains("interval = \"10000ms\""));
}

#[test]
fn test_measurement_override_and_identifier_codes() {
    let defaults = SystemDefaults::default();
    let ident = identity();
    let class = scan_class(1, "fast", 1000);

    let mut renamed = tag(1, 1, "Raw.Name");
    renamed.measurement_name = "line1_force".to_string();
    let mut numeric = tag(2, 1, "Counter");
    numeric.identifier = "2258".to_string();
    numeric.identifier_type = IdentifierKind::Numeric;
    let mut opaque = tag(3, 1, "Blob");
    opaque.identifier = "deadbeef".to_string();
    opaque.identifier_type = IdentifierKind::Opaque;

    let devices = vec![snapshot_with(
        device(1, "plc", "opc.tcp://plc:4840"),
        vec![
            (renamed, Some(class.clone())),
            (numeric, Some(class.clone())),
            (opaque, Some(class)),
        ],
        None,
    )];
    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };

    let doc = render_config(&devices, &ctx);
    assert!(doc.contains("name = \"line1_force\""));
    assert!(!doc.contains("name = \"Raw.Name\""));
    assert!(doc.contains("identifier_type = \"i\""));
    assert!(doc.contains("identifier_type = \"b\""));
    assert!(doc.contains("identifier_type = \"s\""));
}

#[test]
fn test_multiple_scan_classes_split_one_device_into_ordered_inputs() {
    let defaults = SystemDefaults::default();
    let ident = identity();
    let fast = scan_class(1, "fast", 500);
    let slow = scan_class(2, "slow", 30_000);

    let devices = vec![snapshot_with(
        device(1, "plc", "opc.tcp://plc:4840"),
        vec![
            (tag(1, 1, "Slow1"), Some(slow.clone())),
            (tag(2, 1, "Fast1"), Some(fast.clone())),
            (tag(3, 1, "Slow2"), Some(slow)),
        ],
        None,
    )];
    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };

    let doc = render_config(&devices, &ctx);
    assert_eq!(doc.matches("[[inputs.opcua]]").count(), 2);
    let fast_at = doc.find("interval = \"500ms\"").unwrap();
    let slow_at = doc.find("interval = \"30000ms\"").unwrap();
    // Groups are ordered by interval.
    assert!(fast_at < slow_at);
}

#[test]
fn test_empty_model_renders_header_only() {
    let defaults = SystemDefaults::default();
    let ident = identity();
    let ctx = RenderContext {
        defaults: &defaults,
        default_target: None,
        default_scan_class: None,
        identity: &ident,
    };

    let doc = render_config(&[], &ctx);
    assert!(doc.starts_with("# Telegraf configuration generated by TagForge."));
    assert!(doc.contains("[agent]"));
    assert!(!doc.contains("[[inputs.opcua]]"));
    assert!(!doc.contains("[[outputs.influxdb_v2]]"));
}
