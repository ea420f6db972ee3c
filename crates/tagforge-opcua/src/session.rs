//! Endpoint targets and session configuration.
//!
//! Security configuration happens strictly before the session opens:
//! message protection is negotiated at connect time, so the client builder
//! must already carry the identity paths when the policy demands
//! encryption. Credentials are an independent axis — they ride on any
//! policy, including `None`.

use serde::{Deserialize, Serialize};

use tagforge_core::SecurityPolicy;

/// Everything needed to reach one automation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointTarget {
    /// e.g. `opc.tcp://10.0.0.5:4840`
    pub endpoint_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub security_policy: SecurityPolicy,
}

impl EndpointTarget {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            username: String::new(),
            password: String::new(),
            security_policy: SecurityPolicy::None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_policy(mut self, policy: SecurityPolicy) -> Self {
        self.security_policy = policy;
        self
    }

    /// Both parts must be non-empty for a username token to be attached.
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Outcome of a connection test, reported in-band rather than as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
}

impl ConnectionTest {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

#[cfg(feature = "client")]
pub(crate) mod client {
    use std::sync::Arc;

    use opcua::client::prelude::*;
    use opcua::sync::RwLock;

    use tagforge_core::config::defaults;
    use tagforge_core::ClientIdentity;

    use super::EndpointTarget;
    use crate::certs::APPLICATION_URI;
    use crate::error::OpcuaError;

    /// Open one session against the target.
    ///
    /// When the policy is in the encrypted set, the provisioned identity is
    /// attached to the builder and sign-and-encrypt protection is requested
    /// at that policy level. Unknown policy names pass through as the
    /// endpoint's security policy string without an identity.
    pub(crate) fn connect(
        target: &EndpointTarget,
        identity: &ClientIdentity,
        session_timeout_ms: u32,
    ) -> Result<Arc<RwLock<Session>>, OpcuaError> {
        let encrypted = target.security_policy.requires_encryption();

        let mut builder = ClientBuilder::new()
            .application_name("TagForge OPC UA Client")
            .application_uri(APPLICATION_URI)
            .product_uri(APPLICATION_URI)
            .trust_server_certs(true)
            .create_sample_keypair(false)
            .session_retry_limit(1)
            .session_timeout(session_timeout_ms);
        if encrypted {
            // Paths are resolved relative to the PKI directory.
            builder = builder
                .pki_dir(identity.data_dir.clone())
                .certificate_path(defaults::CERT_FILE)
                .private_key_path(defaults::KEY_FILE);
        }
        let mut client = builder
            .client()
            .ok_or_else(|| OpcuaError::Connection("invalid client configuration".to_string()))?;

        let security_mode = if encrypted {
            MessageSecurityMode::SignAndEncrypt
        } else {
            MessageSecurityMode::None
        };
        let endpoint: EndpointDescription = (
            target.endpoint_url.as_str(),
            target.security_policy.name(),
            security_mode,
            UserTokenPolicy::anonymous(),
        )
            .into();
        let token = if target.has_credentials() {
            IdentityToken::UserName(target.username.clone(), target.password.clone())
        } else {
            IdentityToken::Anonymous
        };

        client.connect_to_endpoint(endpoint, token).map_err(|status| {
            OpcuaError::Connection(format!(
                "cannot open session to {}: {}",
                target.endpoint_url, status
            ))
        })
    }
}
