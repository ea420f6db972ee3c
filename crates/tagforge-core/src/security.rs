//! OPC UA security-policy vocabulary and the provisioned client identity.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::defaults;

/// Named security policy of an OPC UA endpoint.
///
/// The three encrypted members require the provisioned client identity and
/// imply sign-and-encrypt message protection. Everything else, including
/// `None` and unrecognized names, connects without a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SecurityPolicy {
    None,
    Basic256Sha256,
    Aes128Sha256RsaOaep,
    Aes256Sha256RsaPss,
    /// Unrecognized policy name, passed through to the endpoint untouched.
    Other(String),
}

impl SecurityPolicy {
    /// Parse a policy name from the wire vocabulary.
    pub fn from_name(name: &str) -> Self {
        match name {
            "None" => Self::None,
            "Basic256Sha256" => Self::Basic256Sha256,
            "Aes128_Sha256_RsaOaep" => Self::Aes128Sha256RsaOaep,
            "Aes256_Sha256_RsaPss" => Self::Aes256Sha256RsaPss,
            other => Self::Other(other.to_string()),
        }
    }

    /// The exact policy name as it appears on the wire and in generated
    /// collector configuration.
    pub fn name(&self) -> &str {
        match self {
            Self::None => "None",
            Self::Basic256Sha256 => "Basic256Sha256",
            Self::Aes128Sha256RsaOaep => "Aes128_Sha256_RsaOaep",
            Self::Aes256Sha256RsaPss => "Aes256_Sha256_RsaPss",
            Self::Other(name) => name,
        }
    }

    /// Whether sessions under this policy must present the client identity
    /// and request sign-and-encrypt protection.
    pub fn requires_encryption(&self) -> bool {
        matches!(
            self,
            Self::Basic256Sha256 | Self::Aes128Sha256RsaOaep | Self::Aes256Sha256RsaPss
        )
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self::None
    }
}

impl From<String> for SecurityPolicy {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

impl From<SecurityPolicy> for String {
    fn from(policy: SecurityPolicy) -> Self {
        policy.name().to_string()
    }
}

impl std::fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Filesystem locations of the provisioned client certificate and key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    /// Directory both artifacts live under.
    pub data_dir: PathBuf,
    /// Binary DER certificate.
    pub cert_path: PathBuf,
    /// Unencrypted PEM private key.
    pub key_path: PathBuf,
}

impl ClientIdentity {
    /// Identity paths under `data_dir`, whether or not the files exist yet.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let cert_path = data_dir.join(defaults::CERT_FILE);
        let key_path = data_dir.join(defaults::KEY_FILE);
        Self {
            data_dir,
            cert_path,
            key_path,
        }
    }

    /// Both artifacts are present on disk. Presence is the sole
    /// "already provisioned" signal; content is not re-validated.
    pub fn is_provisioned(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_round_trip() {
        for name in [
            "None",
            "Basic256Sha256",
            "Aes128_Sha256_RsaOaep",
            "Aes256_Sha256_RsaPss",
        ] {
            assert_eq!(SecurityPolicy::from_name(name).name(), name);
        }
    }

    #[test]
    fn test_encrypted_subset() {
        assert!(SecurityPolicy::Basic256Sha256.requires_encryption());
        assert!(SecurityPolicy::Aes128Sha256RsaOaep.requires_encryption());
        assert!(SecurityPolicy::Aes256Sha256RsaPss.requires_encryption());
        assert!(!SecurityPolicy::None.requires_encryption());
        assert!(!SecurityPolicy::from_name("Basic128Rsa15").requires_encryption());
    }

    #[test]
    fn test_unknown_policy_passthrough() {
        let policy = SecurityPolicy::from_name("Basic128Rsa15");
        assert_eq!(policy, SecurityPolicy::Other("Basic128Rsa15".to_string()));
        assert_eq!(policy.name(), "Basic128Rsa15");
    }

    #[test]
    fn test_serde_as_wire_string() {
        let json = serde_json::to_string(&SecurityPolicy::Aes128Sha256RsaOaep).unwrap();
        assert_eq!(json, "\"Aes128_Sha256_RsaOaep\"");
        let back: SecurityPolicy = serde_json::from_str("\"Basic256Sha256\"").unwrap();
        assert_eq!(back, SecurityPolicy::Basic256Sha256);
    }

    #[test]
    fn test_identity_paths() {
        let identity = ClientIdentity::in_dir("/data");
        assert_eq!(identity.cert_path, PathBuf::from("/data/client_cert.der"));
        assert_eq!(identity.key_path, PathBuf::from("/data/client_key.pem"));
        assert!(!identity.is_provisioned());
    }
}
