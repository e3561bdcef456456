//! Read-only access credentials for a storage namespace
//!
//! A credential grants time-boxed read access to one blob container without
//! a bearer token, so the client can stream audio straight from storage.
//! It is an HMAC-SHA256 signature over the namespace, permissions and
//! validity window, carried as query parameters:
//!
//! ```text
//! sp=r&st=<unix start>&se=<unix expiry>&sig=<base64url signature>
//! ```

use crate::error::{PlaylistError, Result};
use crate::storage::StorageNamespace;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};

/// Only permission ever granted
pub const READ_PERMISSION: &str = "r";

/// Signed, time-boxed read grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCredential {
    #[serde(rename = "sp")]
    pub permissions: String,
    #[serde(rename = "st")]
    pub starts_at: i64,
    #[serde(rename = "se")]
    pub expires_at: i64,
    #[serde(rename = "sig")]
    pub signature: String,
}

impl AccessCredential {
    /// Render as a URL query string
    pub fn to_query_string(&self) -> String {
        format!(
            "sp={}&st={}&se={}&sig={}",
            self.permissions, self.starts_at, self.expires_at, self.signature
        )
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }
}

/// Issues and verifies access credentials
pub struct AccessCredentialIssuer {
    key: hmac::Key,
    validity: Duration,
}

impl AccessCredentialIssuer {
    pub fn new(signing_key: &str, validity_hours: i64) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA256, signing_key.as_bytes()),
            validity: Duration::hours(validity_hours),
        }
    }

    /// Issue a read credential valid from now
    pub fn issue(&self, namespace: &StorageNamespace) -> AccessCredential {
        self.issue_at(namespace, Utc::now())
    }

    pub fn issue_at(&self, namespace: &StorageNamespace, now: DateTime<Utc>) -> AccessCredential {
        let starts_at = now.timestamp();
        let expires_at = (now + self.validity).timestamp();
        let tag = hmac::sign(
            &self.key,
            string_to_sign(namespace, READ_PERMISSION, starts_at, expires_at).as_bytes(),
        );

        AccessCredential {
            permissions: READ_PERMISSION.to_string(),
            starts_at,
            expires_at,
            signature: URL_SAFE_NO_PAD.encode(tag.as_ref()),
        }
    }

    /// Check that `credential` grants read access to `namespace` now
    pub fn verify(&self, namespace: &StorageNamespace, credential: &AccessCredential) -> Result<()> {
        self.verify_at(namespace, credential, Utc::now())
    }

    pub fn verify_at(
        &self,
        namespace: &StorageNamespace,
        credential: &AccessCredential,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let signature = URL_SAFE_NO_PAD
            .decode(credential.signature.as_bytes())
            .map_err(|_| PlaylistError::Unauthorized("malformed signature".to_string()))?;

        let message = string_to_sign(
            namespace,
            &credential.permissions,
            credential.starts_at,
            credential.expires_at,
        );
        hmac::verify(&self.key, message.as_bytes(), &signature)
            .map_err(|_| PlaylistError::Unauthorized("signature mismatch".to_string()))?;

        if credential.permissions != READ_PERMISSION {
            return Err(PlaylistError::Unauthorized(format!(
                "permission {:?} not granted",
                credential.permissions
            )));
        }

        let now = now.timestamp();
        if now < credential.starts_at {
            return Err(PlaylistError::Unauthorized("credential not yet valid".to_string()));
        }
        if now >= credential.expires_at {
            return Err(PlaylistError::Unauthorized("credential expired".to_string()));
        }

        Ok(())
    }
}

fn string_to_sign(
    namespace: &StorageNamespace,
    permissions: &str,
    starts_at: i64,
    expires_at: i64,
) -> String {
    format!("{}\n{}\n{}\n{}", namespace, permissions, starts_at, expires_at)
}
