//! Core types for the TagForge pipeline admin.
//!
//! This crate defines the shapes shared across the project:
//! - the relational model projections the admin layer exchanges with the
//!   external store (devices, tags, scan classes, destination targets)
//! - the OPC UA security-policy vocabulary and the provisioned client
//!   identity paths
//! - global configuration defaults and environment helpers
//!
//! Persistence itself is an external collaborator; nothing in here performs
//! I/O beyond reading environment variables.

pub mod config;
pub mod model;
pub mod security;

pub use model::{
    Device, DeviceSnapshot, IdentifierKind, InfluxTarget, ModelDocument, ScanClass,
    SystemDefaults, Tag, TagSnapshot, validate_model,
};
pub use security::{ClientIdentity, SecurityPolicy};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
