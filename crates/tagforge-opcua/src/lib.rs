//! OPC UA address-space access for the TagForge pipeline admin.
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `client` | ✅ | Live sessions via the `opcua` client library |
//!
//! With `client` disabled the live operations (`browse`, `scan`,
//! `test_connection`, `ScanJobTracker::trigger`) compile away to a
//! structured [`OpcuaError::Unavailable`] report instead of failing the
//! whole process — the admin layer shows the message and keeps running.
//!
//! ## Architecture
//!
//! - **certs**: idempotent client identity provisioning (certificate + key)
//! - **session**: endpoint targets and session configuration
//! - **address_space**: the traversal seam between browse/scan logic and a
//!   live protocol session
//! - **browse** / **scan**: single-level listing and bounded recursive
//!   discovery of sampleable variables
//! - **jobs**: per-device scan job tracking with at-most-one-in-flight
//!
//! Every browse or scan opens and closes its own session; sessions are
//! never pooled, so one device's broken session cannot leak into another's.

pub mod address_space;
pub mod browse;
pub mod certs;
pub mod error;
pub mod jobs;
pub mod scan;
pub mod session;

#[cfg(feature = "client")]
mod client_space;

pub use address_space::{AddressSpace, ChildNode, DiscoveredNode};
pub use browse::{browse, test_connection};
pub use certs::ensure_client_identity;
pub use error::{CertError, OpcuaError};
pub use jobs::{ScanJob, ScanJobTracker, ScanStatus, TriggerOutcome};
pub use scan::scan;
pub use session::{ConnectionTest, EndpointTarget};
