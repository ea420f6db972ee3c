//! The traversal seam between browse/scan logic and a live session.
//!
//! Browse and scan only ever see an [`AddressSpace`]; the live
//! implementation wraps one protocol session, and the tests drive the same
//! code over a deterministic in-memory tree.

use serde::{Deserialize, Serialize};

use tagforge_core::IdentifierKind;

use crate::error::OpcuaError;

/// One node discovered by a browse or scan.
///
/// Transient: produced per request, never persisted by this crate. `path`
/// is the `/`-joined display-name chain from the scan root and stays empty
/// for single-level browses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredNode {
    pub node_id: String,
    pub namespace: u16,
    pub identifier: String,
    pub identifier_type: IdentifierKind,
    pub browse_name: String,
    pub display_name: String,
    pub node_class: String,
    pub is_variable: bool,
    pub has_children: bool,
    pub data_type: String,
    pub path: String,
}

/// A child row as returned by [`AddressSpace::children`].
#[derive(Debug, Clone)]
pub struct ChildNode<H> {
    /// Handle for descending into this child.
    pub handle: H,
    pub node_id: String,
    pub namespace: u16,
    pub identifier: String,
    pub identifier_kind: IdentifierKind,
    pub browse_name: String,
    pub display_name: String,
    pub node_class: String,
    pub is_variable: bool,
}

impl<H> ChildNode<H> {
    /// Finish classification into a result record.
    pub fn into_discovered(
        self,
        path: String,
        data_type: String,
        has_children: bool,
    ) -> DiscoveredNode {
        DiscoveredNode {
            node_id: self.node_id,
            namespace: self.namespace,
            identifier: self.identifier,
            identifier_type: self.identifier_kind,
            browse_name: self.browse_name,
            display_name: self.display_name,
            node_class: self.node_class,
            is_variable: self.is_variable,
            has_children,
            data_type,
            path,
        }
    }
}

/// Minimal view of a hierarchical address space.
pub trait AddressSpace {
    type Handle: Clone;

    /// The top-level objects container a walk starts from.
    fn root(&self) -> Self::Handle;

    /// Resolve a textual node id to a handle.
    fn resolve(&self, node_id: &str) -> Result<Self::Handle, OpcuaError>;

    /// Immediate children of a node. Malformed children are dropped by the
    /// implementation; `Err` means the listing itself failed.
    fn children(&self, handle: &Self::Handle)
        -> Result<Vec<ChildNode<Self::Handle>>, OpcuaError>;

    /// Declared data type of a variable node. Best effort: read failures
    /// come back as `None`, never as an error.
    fn variable_data_type(&self, handle: &Self::Handle) -> Option<String>;

    /// Whether a non-variable node has at least one child. Best effort:
    /// probe failures come back as `false`.
    fn has_grandchildren(&self, handle: &Self::Handle) -> bool;
}
