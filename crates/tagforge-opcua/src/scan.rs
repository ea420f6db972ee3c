//! Bounded-depth recursive discovery of sampleable variables.
//!
//! The walk is pre-order from the objects container at depth 0. Variables
//! are terminal results carrying their `/`-joined display-name path;
//! non-variables are descended into but never recorded. A subtree whose
//! listing fails is abandoned silently — partial address spaces are the
//! rule on plant floors, and a broken branch must not cost the whole scan.

use crate::address_space::{AddressSpace, DiscoveredNode};
use crate::error::OpcuaError;
use crate::session::EndpointTarget;

/// Walk `space` down to `max_depth`, collecting variables in traversal
/// order. Never fails: traversal-level errors shrink the result instead.
pub(crate) fn walk<A: AddressSpace>(space: &A, max_depth: u32) -> Vec<DiscoveredNode> {
    let mut found = Vec::new();
    visit(space, &space.root(), 0, "", max_depth, &mut found);
    found
}

fn visit<A: AddressSpace>(
    space: &A,
    node: &A::Handle,
    depth: u32,
    path: &str,
    max_depth: u32,
    found: &mut Vec<DiscoveredNode>,
) {
    if depth > max_depth {
        return;
    }
    let children = match space.children(node) {
        Ok(children) => children,
        Err(err) => {
            tracing::debug!("abandoning unreadable subtree at '{}': {}", path, err);
            return;
        }
    };
    for child in children {
        let child_path = if path.is_empty() {
            child.display_name.clone()
        } else {
            format!("{}/{}", path, child.display_name)
        };
        if child.is_variable {
            let data_type = space.variable_data_type(&child.handle).unwrap_or_default();
            found.push(child.into_discovered(child_path, data_type, false));
        } else {
            let handle = child.handle.clone();
            visit(space, &handle, depth + 1, &child_path, max_depth, found);
        }
    }
}

/// Scan `target`'s whole address space over a fresh session.
#[cfg(feature = "client")]
pub fn scan(
    target: &EndpointTarget,
    identity: &tagforge_core::ClientIdentity,
    max_depth: u32,
) -> Result<Vec<DiscoveredNode>, OpcuaError> {
    use tagforge_core::config::defaults;

    let session = crate::session::client::connect(target, identity, defaults::SCAN_TIMEOUT_MS)?;
    let space = crate::client_space::SessionSpace::new(session);
    let found = walk(&space, max_depth);
    space.disconnect();
    tracing::info!(
        "scan of {} finished with {} variables",
        target.endpoint_url,
        found.len()
    );
    Ok(found)
}

#[cfg(not(feature = "client"))]
pub fn scan(
    _target: &EndpointTarget,
    _identity: &tagforge_core::ClientIdentity,
    _max_depth: u32,
) -> Result<Vec<DiscoveredNode>, OpcuaError> {
    Err(OpcuaError::Unavailable)
}
