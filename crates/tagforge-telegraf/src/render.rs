//! The renderer proper: model snapshots in, collector document out.

use std::collections::{BTreeMap, HashMap};

use tagforge_core::config::defaults;
use tagforge_core::{ClientIdentity, DeviceSnapshot, InfluxTarget, ScanClass, SystemDefaults, TagSnapshot};

/// Fallback values threaded into one render call. No ambient state: the
/// caller decides what "default" means every time.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub defaults: &'a SystemDefaults,
    /// The destination target marked default, if any.
    pub default_target: Option<&'a InfluxTarget>,
    /// The scan class marked default, if any; its interval covers tags
    /// with no class of their own.
    pub default_scan_class: Option<&'a ScanClass>,
    /// Provisioned identity whose artifact paths go into encrypted blocks.
    pub identity: &'a ClientIdentity,
}

const HEADER: &str = "\
# Telegraf configuration generated by TagForge.
# Rendered deterministically from the device model; manual edits are
# overwritten on the next render.
";

/// Tag metrics are routed to their output block through this metric tag,
/// which the outputs drop again before writing.
const ROUTING_TAG: &str = "destination";

/// Destination key used when a device falls through to system defaults.
const SYSTEM_DESTINATION: &str = "system-default";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct InputKey {
    endpoint_url: String,
    username: String,
    password: String,
    policy: String,
    interval_ms: u32,
    destination: String,
}

struct InputBlock {
    /// Metric name; the first contributing device names a merged block.
    name: String,
    key: InputKey,
    encrypted: bool,
    nodes: Vec<NodeEntry>,
}

struct NodeEntry {
    name: String,
    namespace: u16,
    identifier_type: &'static str,
    identifier: String,
}

#[derive(Debug, Clone)]
struct OutputBlock {
    key: String,
    url: String,
    token: String,
    org: String,
    bucket: String,
}

impl OutputBlock {
    fn from_target(target: &InfluxTarget) -> Self {
        Self {
            key: target.name.clone(),
            url: target.url.clone(),
            token: target.token.clone(),
            org: target.org.clone(),
            bucket: target.bucket.clone(),
        }
    }
}

/// Render the collector configuration for `devices`.
///
/// Input snapshots are pre-filtered to enabled devices/tags; devices are
/// re-sorted by (name, id) here so that callers cannot accidentally break
/// the byte-for-byte determinism contract. Missing optional references
/// always mean "use the fallback", never an error.
pub fn render_config(devices: &[DeviceSnapshot], ctx: &RenderContext) -> String {
    let mut ordered: Vec<&DeviceSnapshot> = devices.iter().collect();
    ordered.sort_by(|a, b| {
        a.device
            .name
            .cmp(&b.device.name)
            .then(a.device.id.cmp(&b.device.id))
    });

    let fallback_interval = ctx
        .default_scan_class
        .map(|class| class.interval_ms)
        .unwrap_or(defaults::FALLBACK_INTERVAL_MS);

    let mut inputs: Vec<InputBlock> = Vec::new();
    let mut input_index: HashMap<InputKey, usize> = HashMap::new();
    let mut outputs: Vec<OutputBlock> = Vec::new();

    for snapshot in ordered {
        // Enabled tags grouped by scan class, groups ordered by
        // (interval, class name); tags keep their declared order.
        let mut groups: BTreeMap<(u32, String), Vec<&TagSnapshot>> = BTreeMap::new();
        for entry in &snapshot.tags {
            if !entry.tag.enabled {
                continue;
            }
            let (interval_ms, class_name) = match &entry.scan_class {
                Some(class) => (class.interval_ms, class.name.clone()),
                None => (fallback_interval, String::new()),
            };
            groups.entry((interval_ms, class_name)).or_default().push(entry);
        }
        if groups.is_empty() {
            // A device with nothing to sample contributes nothing.
            continue;
        }

        let destination = resolve_destination(snapshot, ctx);
        if !outputs.iter().any(|output| output.key == destination.key) {
            outputs.push(destination.clone());
        }

        for ((interval_ms, _class_name), tags) in groups {
            let key = InputKey {
                endpoint_url: snapshot.device.endpoint_url.clone(),
                username: snapshot.device.username.clone(),
                password: snapshot.device.password.clone(),
                policy: snapshot.device.security_policy.name().to_string(),
                interval_ms,
                destination: destination.key.clone(),
            };
            let index = match input_index.get(&key) {
                Some(&index) => index,
                None => {
                    inputs.push(InputBlock {
                        name: snapshot.device.name.clone(),
                        encrypted: snapshot.device.security_policy.requires_encryption(),
                        key: key.clone(),
                        nodes: Vec::new(),
                    });
                    input_index.insert(key, inputs.len() - 1);
                    inputs.len() - 1
                }
            };
            for entry in tags {
                inputs[index].nodes.push(NodeEntry {
                    name: entry.tag.effective_name().to_string(),
                    namespace: entry.tag.namespace,
                    identifier_type: entry.tag.identifier_type.code(),
                    identifier: entry.tag.identifier.clone(),
                });
            }
        }
    }

    let mut doc = String::new();
    doc.push_str(HEADER);
    doc.push_str("\n[agent]\n  interval = \"10s\"\n  flush_interval = \"10s\"\n");
    for block in &inputs {
        emit_input(&mut doc, block, ctx);
    }
    for output in &outputs {
        emit_output(&mut doc, output);
    }
    doc
}

/// Resolution order is authoritative: explicit per-device target, then the
/// target marked default, then the system-wide fallback values.
fn resolve_destination(snapshot: &DeviceSnapshot, ctx: &RenderContext) -> OutputBlock {
    if let Some(target) = snapshot.influx.as_ref() {
        OutputBlock::from_target(target)
    } else if let Some(target) = ctx.default_target {
        OutputBlock::from_target(target)
    } else {
        OutputBlock {
            key: SYSTEM_DESTINATION.to_string(),
            url: ctx.defaults.influx_url.clone(),
            token: ctx.defaults.influx_token.clone(),
            org: ctx.defaults.influx_org.clone(),
            bucket: ctx.defaults.influx_bucket.clone(),
        }
    }
}

fn emit_input(doc: &mut String, block: &InputBlock, ctx: &RenderContext) {
    doc.push_str("\n[[inputs.opcua]]\n");
    doc.push_str(&format!("  name = {}\n", toml_string(&block.name)));
    doc.push_str(&format!(
        "  endpoint = {}\n",
        toml_string(&block.key.endpoint_url)
    ));
    doc.push_str("  connect_timeout = \"10s\"\n");
    doc.push_str("  request_timeout = \"5s\"\n");
    doc.push_str(&format!(
        "  security_policy = {}\n",
        toml_string(&block.key.policy)
    ));
    let mode = if block.encrypted { "SignAndEncrypt" } else { "None" };
    doc.push_str(&format!("  security_mode = {}\n", toml_string(mode)));
    if block.encrypted {
        doc.push_str(&format!(
            "  certificate = {}\n",
            toml_string(&ctx.identity.cert_path.display().to_string())
        ));
        doc.push_str(&format!(
            "  private_key = {}\n",
            toml_string(&ctx.identity.key_path.display().to_string())
        ));
    }
    if !block.key.username.is_empty() && !block.key.password.is_empty() {
        doc.push_str("  auth_method = \"Username\"\n");
        doc.push_str(&format!(
            "  username = {}\n",
            toml_string(&block.key.username)
        ));
        doc.push_str(&format!(
            "  password = {}\n",
            toml_string(&block.key.password)
        ));
    }
    doc.push_str(&format!("  interval = \"{}ms\"\n", block.key.interval_ms));

    doc.push_str("\n  [inputs.opcua.tags]\n");
    doc.push_str(&format!(
        "    {} = {}\n",
        ROUTING_TAG,
        toml_string(&block.key.destination)
    ));

    for node in &block.nodes {
        doc.push_str("\n  [[inputs.opcua.nodes]]\n");
        doc.push_str(&format!("    name = {}\n", toml_string(&node.name)));
        doc.push_str(&format!("    namespace = \"{}\"\n", node.namespace));
        doc.push_str(&format!(
            "    identifier_type = \"{}\"\n",
            node.identifier_type
        ));
        doc.push_str(&format!(
            "    identifier = {}\n",
            toml_string(&node.identifier)
        ));
    }
}

fn emit_output(doc: &mut String, output: &OutputBlock) {
    doc.push_str("\n[[outputs.influxdb_v2]]\n");
    doc.push_str(&format!("  urls = [{}]\n", toml_string(&output.url)));
    doc.push_str(&format!("  token = {}\n", toml_string(&output.token)));
    doc.push_str(&format!(
        "  organization = {}\n",
        toml_string(&output.org)
    ));
    doc.push_str(&format!("  bucket = {}\n", toml_string(&output.bucket)));
    doc.push_str(&format!("  tagexclude = [\"{}\"]\n", ROUTING_TAG));
    doc.push_str("\n  [outputs.influxdb_v2.tagpass]\n");
    doc.push_str(&format!(
        "    {} = [{}]\n",
        ROUTING_TAG,
        toml_string(&output.key)
    ));
}

/// Quote a value as a basic TOML string.
fn toml_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                quoted.push_str(&format!("\\u{:04X}", c as u32));
            }
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_string_escapes() {
        assert_eq!(toml_string("plain"), "\"plain\"");
        assert_eq!(toml_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(toml_string("a\\b"), "\"a\\\\b\"");
        assert_eq!(toml_string("a\nb"), "\"a\\nb\"");
        assert_eq!(toml_string("a\u{1}b"), "\"a\\u0001b\"");
    }
}
