//! Live [`AddressSpace`] over an `opcua` client session.
//!
//! All best-effort reads (data types, grandchild probes) swallow their
//! failures here so traversal logic never sees a per-node error.

use std::str::FromStr;
use std::sync::Arc;

use opcua::client::prelude::*;
use opcua::sync::RwLock;
use opcua::types::node_id::Identifier;

use tagforge_core::IdentifierKind;

use crate::address_space::{AddressSpace, ChildNode};
use crate::error::OpcuaError;

/// All reference fields requested in browse results.
const BROWSE_RESULT_MASK: u32 = 0x3f;

pub(crate) struct SessionSpace {
    session: Arc<RwLock<Session>>,
}

impl SessionSpace {
    pub(crate) fn new(session: Arc<RwLock<Session>>) -> Self {
        Self { session }
    }

    pub(crate) fn disconnect(&self) {
        let session = self.session.read();
        session.disconnect();
    }

    /// One-shot hierarchical browse of a node, following continuation
    /// points until the server has returned every reference.
    fn browse_references(&self, node: &NodeId) -> Result<Vec<ReferenceDescription>, OpcuaError> {
        let session = self.session.read();
        let description = BrowseDescription {
            node_id: node.clone(),
            browse_direction: BrowseDirection::Forward,
            reference_type_id: ReferenceTypeId::HierarchicalReferences.into(),
            include_subtypes: true,
            node_class_mask: 0,
            result_mask: BROWSE_RESULT_MASK,
        };

        let mut references = Vec::new();
        let results = session
            .browse(&[description])
            .map_err(|status| OpcuaError::Browse(format!("browse of {node} failed: {status}")))?;
        let Some(result) = results.and_then(|mut r| r.pop()) else {
            return Ok(references);
        };
        if !result.status_code.is_good() {
            return Err(OpcuaError::Browse(format!(
                "browse of {node} returned {}",
                result.status_code
            )));
        }
        references.append(&mut result.references.unwrap_or_default());

        let mut continuation_point = result.continuation_point;
        while !continuation_point.is_null() {
            let more = session.browse_next(false, &[continuation_point.clone()]).map_err(
                |status| OpcuaError::Browse(format!("browse_next of {node} failed: {status}")),
            )?;
            match more.and_then(|mut r| r.pop()) {
                Some(result) => {
                    references.append(&mut result.references.unwrap_or_default());
                    continuation_point = result.continuation_point;
                }
                None => break,
            }
        }
        Ok(references)
    }
}

impl AddressSpace for SessionSpace {
    type Handle = NodeId;

    fn root(&self) -> NodeId {
        ObjectId::ObjectsFolder.into()
    }

    fn resolve(&self, node_id: &str) -> Result<NodeId, OpcuaError> {
        NodeId::from_str(node_id)
            .map_err(|_| OpcuaError::Browse(format!("malformed node id: {node_id}")))
    }

    fn children(&self, handle: &NodeId) -> Result<Vec<ChildNode<NodeId>>, OpcuaError> {
        let references = self.browse_references(handle)?;
        Ok(references.iter().map(child_from_reference).collect())
    }

    fn variable_data_type(&self, handle: &NodeId) -> Option<String> {
        let read_value = ReadValueId {
            node_id: handle.clone(),
            attribute_id: AttributeId::DataType as u32,
            index_range: UAString::null(),
            data_encoding: QualifiedName::null(),
        };
        let session = self.session.read();
        match session.read(&[read_value], TimestampsToReturn::Neither, 0.0) {
            Ok(mut values) => values
                .pop()
                .and_then(|value| value.value)
                .and_then(|variant| match variant {
                    Variant::NodeId(data_type) => Some(data_type.to_string()),
                    _ => None,
                }),
            Err(status) => {
                tracing::debug!("data type read failed for {}: {}", handle, status);
                None
            }
        }
    }

    fn has_grandchildren(&self, handle: &NodeId) -> bool {
        match self.browse_references(handle) {
            Ok(references) => !references.is_empty(),
            Err(err) => {
                tracing::debug!("child probe failed for {}: {}", handle, err);
                false
            }
        }
    }
}

fn child_from_reference(reference: &ReferenceDescription) -> ChildNode<NodeId> {
    let node_id = reference.node_id.node_id.clone();
    let (identifier_kind, identifier) = classify_identifier(&node_id);
    let browse_name = reference.browse_name.name.as_ref().to_string();
    let display_name = {
        let text = reference.display_name.text.as_ref();
        if text.is_empty() {
            browse_name.clone()
        } else {
            text.to_string()
        }
    };
    ChildNode {
        handle: node_id.clone(),
        node_id: node_id.to_string(),
        namespace: node_id.namespace,
        identifier,
        identifier_kind,
        browse_name,
        display_name,
        node_class: format!("{:?}", reference.node_class),
        is_variable: reference.node_class == NodeClass::Variable,
    }
}

/// Decide the identifier kind once, at read time. Numeric identifiers keep
/// their decimal form, opaque byte strings are carried as lowercase hex,
/// and everything else (strings, GUIDs) is treated as text.
pub(crate) fn classify_identifier(node_id: &NodeId) -> (IdentifierKind, String) {
    match &node_id.identifier {
        Identifier::Numeric(value) => (IdentifierKind::Numeric, value.to_string()),
        Identifier::String(value) => (IdentifierKind::Text, value.as_ref().to_string()),
        Identifier::Guid(guid) => (IdentifierKind::Text, guid.to_string()),
        Identifier::ByteString(bytes) => (
            IdentifierKind::Opaque,
            hex::encode(bytes.value.as_deref().unwrap_or_default()),
        ),
    }
}
