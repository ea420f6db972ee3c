//! Single-level address-space browse and connection test.
//!
//! Both operations run synchronously in the caller's context: one session
//! open, one listing, one close. The recursive variant lives in
//! [`crate::scan`].

use crate::address_space::{AddressSpace, DiscoveredNode};
use crate::error::OpcuaError;
use crate::session::{ConnectionTest, EndpointTarget};

/// List and classify the immediate children of one node (the objects
/// container when `node_id` is `None`).
///
/// `has_children` is probed only for non-variables and `data_type` read
/// only for variables; both are best effort. `path` stays empty — it is
/// computed during recursive scans only.
pub(crate) fn browse_level<A: AddressSpace>(
    space: &A,
    node_id: Option<&str>,
) -> Result<Vec<DiscoveredNode>, OpcuaError> {
    let node = match node_id {
        Some(id) => space.resolve(id)?,
        None => space.root(),
    };
    let children = space.children(&node)?;

    let mut nodes = Vec::with_capacity(children.len());
    for child in children {
        let has_children = if child.is_variable {
            false
        } else {
            space.has_grandchildren(&child.handle)
        };
        let data_type = if child.is_variable {
            space.variable_data_type(&child.handle).unwrap_or_default()
        } else {
            String::new()
        };
        nodes.push(child.into_discovered(String::new(), data_type, has_children));
    }
    Ok(nodes)
}

/// Browse one level of `target`'s address space over a fresh session.
#[cfg(feature = "client")]
pub fn browse(
    target: &EndpointTarget,
    identity: &tagforge_core::ClientIdentity,
    node_id: Option<&str>,
) -> Result<Vec<DiscoveredNode>, OpcuaError> {
    use tagforge_core::config::defaults;

    let session = crate::session::client::connect(target, identity, defaults::BROWSE_TIMEOUT_MS)?;
    let space = crate::client_space::SessionSpace::new(session);
    let result = browse_level(&space, node_id);
    space.disconnect();
    result
}

#[cfg(not(feature = "client"))]
pub fn browse(
    _target: &EndpointTarget,
    _identity: &tagforge_core::ClientIdentity,
    _node_id: Option<&str>,
) -> Result<Vec<DiscoveredNode>, OpcuaError> {
    Err(OpcuaError::Unavailable)
}

/// Open a short session and read the server's display name. All failures
/// are reported in-band.
#[cfg(feature = "client")]
pub fn test_connection(
    target: &EndpointTarget,
    identity: &tagforge_core::ClientIdentity,
) -> ConnectionTest {
    use opcua::client::prelude::*;
    use tagforge_core::config::defaults;

    let session = match crate::session::client::connect(target, identity, defaults::TEST_TIMEOUT_MS)
    {
        Ok(session) => session,
        Err(err) => return ConnectionTest::failed(err.to_string()),
    };

    let result = {
        let session = session.read();
        let read_value = ReadValueId {
            node_id: ObjectId::Server.into(),
            attribute_id: AttributeId::DisplayName as u32,
            index_range: UAString::null(),
            data_encoding: QualifiedName::null(),
        };
        session.read(&[read_value], TimestampsToReturn::Neither, 0.0)
    };

    let outcome = match result {
        Ok(mut values) => {
            let name = values
                .pop()
                .and_then(|value| value.value)
                .and_then(|variant| match variant {
                    Variant::LocalizedText(text) => Some(text.text.as_ref().to_string()),
                    _ => None,
                })
                .unwrap_or_else(|| target.endpoint_url.clone());
            ConnectionTest::ok(format!("Connected: {name}"))
        }
        Err(status) => ConnectionTest::failed(format!("server read failed: {status}")),
    };

    let session = session.read();
    session.disconnect();
    outcome
}

#[cfg(not(feature = "client"))]
pub fn test_connection(
    _target: &EndpointTarget,
    _identity: &tagforge_core::ClientIdentity,
) -> ConnectionTest {
    ConnectionTest::failed(OpcuaError::Unavailable.to_string())
}
