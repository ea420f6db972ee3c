//! Relational model projections exchanged with the external store.
//!
//! The admin layer owns persistence; this module only defines the read-side
//! shapes the pipeline core consumes: devices with their selected tags,
//! sampling classes, destination targets, and the global system defaults.
//! `ModelDocument` bundles a full export of those entities (the form the
//! CLI reads from disk) and resolves it into the pre-joined snapshots the
//! config renderer takes as input.

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::security::SecurityPolicy;

/// Runtime kind of an OPC UA node identifier.
///
/// Decided once when the identifier is read off the wire and carried
/// explicitly afterwards; nothing downstream re-inspects the raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierKind {
    /// Integer identifier, e.g. `ns=0;i=2258`.
    #[serde(rename = "i")]
    Numeric,
    /// String (or otherwise textual) identifier, e.g. `ns=2;s=Line1.Temp`.
    #[serde(rename = "s")]
    Text,
    /// Opaque byte-string identifier, carried as lowercase hex.
    #[serde(rename = "b")]
    Opaque,
}

impl IdentifierKind {
    /// Single-letter code used in node addresses and collector config.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Numeric => "i",
            Self::Text => "s",
            Self::Opaque => "b",
        }
    }
}

impl Default for IdentifierKind {
    fn default() -> Self {
        Self::Text
    }
}

/// An automation device exposing a browsable address space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: i64,
    /// Unique human-readable name; also the metric name in generated config.
    pub name: String,
    /// e.g. `opc.tcp://10.0.0.5:4840`
    pub endpoint_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub security_policy: SecurityPolicy,
    /// Explicit destination target; `None` falls back to the default
    /// target, then to the system defaults.
    #[serde(default)]
    pub influx_target_id: Option<i64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A selected sampling point on a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub device_id: i64,
    /// Full protocol node address, e.g. `ns=2;s=Line1.Temp`.
    pub node_id: String,
    pub namespace: u16,
    pub identifier: String,
    #[serde(default)]
    pub identifier_type: IdentifierKind,
    pub display_name: String,
    /// Hierarchical display-name chain from the scan root.
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub data_type: String,
    /// Overrides the display name in generated config when non-empty.
    #[serde(default)]
    pub measurement_name: String,
    #[serde(default)]
    pub scan_class_id: Option<i64>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Tag {
    /// Name this tag's samples are written under.
    pub fn effective_name(&self) -> &str {
        if self.measurement_name.is_empty() {
            &self.display_name
        } else {
            &self.measurement_name
        }
    }
}

/// Named sampling interval applied to a group of tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanClass {
    pub id: i64,
    pub name: String,
    pub interval_ms: u32,
    #[serde(default)]
    pub description: String,
    /// At most one scan class is marked default across the whole set.
    #[serde(default)]
    pub is_default: bool,
}

/// Named time-series destination (InfluxDB v2 connection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfluxTarget {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
    /// At most one target is marked default across the whole set.
    #[serde(default)]
    pub is_default: bool,
}

/// Global fallback values used when a device has no destination target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemDefaults {
    #[serde(default)]
    pub influx_url: String,
    #[serde(default)]
    pub influx_token: String,
    #[serde(default)]
    pub influx_org: String,
    #[serde(default)]
    pub influx_bucket: String,
    #[serde(default = "default_telegraf_config_path")]
    pub telegraf_config_path: String,
    /// Opaque shell command the admin layer runs after writing the config.
    /// Data only; never invoked by this core.
    #[serde(default = "default_telegraf_reload_command")]
    pub telegraf_reload_command: String,
}

impl Default for SystemDefaults {
    fn default() -> Self {
        Self {
            influx_url: String::new(),
            influx_token: String::new(),
            influx_org: String::new(),
            influx_bucket: String::new(),
            telegraf_config_path: default_telegraf_config_path(),
            telegraf_reload_command: default_telegraf_reload_command(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_telegraf_config_path() -> String {
    defaults::TELEGRAF_CONFIG_PATH.to_string()
}

fn default_telegraf_reload_command() -> String {
    defaults::TELEGRAF_RELOAD_COMMAND.to_string()
}

/// An enabled tag joined with its resolved scan class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSnapshot {
    pub tag: Tag,
    pub scan_class: Option<ScanClass>,
}

/// An enabled device pre-loaded with its enabled tags and its explicitly
/// assigned destination target. This is the renderer's input shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub device: Device,
    pub tags: Vec<TagSnapshot>,
    pub influx: Option<InfluxTarget>,
}

/// Full model export, as read from the external store or from disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelDocument {
    pub devices: Vec<Device>,
    pub tags: Vec<Tag>,
    pub scan_classes: Vec<ScanClass>,
    pub influx_targets: Vec<InfluxTarget>,
    pub system: SystemDefaults,
}

impl ModelDocument {
    /// Resolve the export into renderer input: enabled devices ordered by
    /// (name, id), each carrying its enabled tags in declared order with
    /// scan classes joined, plus the explicitly assigned target if any.
    pub fn snapshots(&self) -> Vec<DeviceSnapshot> {
        let mut devices: Vec<&Device> = self.devices.iter().filter(|d| d.enabled).collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        devices
            .into_iter()
            .map(|device| {
                let tags = self
                    .tags
                    .iter()
                    .filter(|t| t.device_id == device.id && t.enabled)
                    .map(|tag| TagSnapshot {
                        tag: tag.clone(),
                        scan_class: tag
                            .scan_class_id
                            .and_then(|id| self.scan_classes.iter().find(|c| c.id == id))
                            .cloned(),
                    })
                    .collect();
                let influx = device
                    .influx_target_id
                    .and_then(|id| self.influx_targets.iter().find(|t| t.id == id))
                    .cloned();
                DeviceSnapshot {
                    device: device.clone(),
                    tags,
                    influx,
                }
            })
            .collect()
    }

    /// The target marked default, if any.
    pub fn default_target(&self) -> Option<&InfluxTarget> {
        self.influx_targets.iter().find(|t| t.is_default)
    }

    /// The scan class marked default, if any.
    pub fn default_scan_class(&self) -> Option<&ScanClass> {
        self.scan_classes.iter().find(|c| c.is_default)
    }
}

/// Check the model for the inconsistencies the admin layer must surface:
/// duplicate names, more than one default, and dangling references.
/// Returns human-readable issues; an empty list means the model is sound.
pub fn validate_model(model: &ModelDocument) -> Vec<String> {
    let mut issues = Vec::new();

    check_unique_names(
        model.devices.iter().map(|d| d.name.as_str()),
        "device",
        &mut issues,
    );
    check_unique_names(
        model.scan_classes.iter().map(|c| c.name.as_str()),
        "scan class",
        &mut issues,
    );
    check_unique_names(
        model.influx_targets.iter().map(|t| t.name.as_str()),
        "destination target",
        &mut issues,
    );

    if model.scan_classes.iter().filter(|c| c.is_default).count() > 1 {
        issues.push("more than one scan class is marked default".to_string());
    }
    if model.influx_targets.iter().filter(|t| t.is_default).count() > 1 {
        issues.push("more than one destination target is marked default".to_string());
    }

    for device in &model.devices {
        if let Some(target_id) = device.influx_target_id {
            if !model.influx_targets.iter().any(|t| t.id == target_id) {
                issues.push(format!(
                    "device '{}' references unknown destination target {}",
                    device.name, target_id
                ));
            }
        }
    }

    for tag in &model.tags {
        if !model.devices.iter().any(|d| d.id == tag.device_id) {
            issues.push(format!(
                "tag '{}' references unknown device {}",
                tag.effective_name(),
                tag.device_id
            ));
        }
        if let Some(class_id) = tag.scan_class_id {
            if !model.scan_classes.iter().any(|c| c.id == class_id) {
                issues.push(format!(
                    "tag '{}' references unknown scan class {}",
                    tag.effective_name(),
                    class_id
                ));
            }
        }
    }

    issues
}

fn check_unique_names<'a>(
    names: impl Iterator<Item = &'a str>,
    entity: &str,
    issues: &mut Vec<String>,
) {
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            issues.push(format!("duplicate {entity} name: {name}"));
        }
    }
}
