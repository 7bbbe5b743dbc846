//! Account configuration - the SIP identity registered with a registrar

use super::shared::{EngineError, SipUri};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a credential's secret is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretKind {
    /// Plain text password
    #[default]
    PlainPassword,
    /// Pre-computed digest (HA1)
    DigestHash,
}

/// One entry of an account's credential set
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub realm: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub username: String,
    pub secret: String,
    #[serde(default)]
    pub secret_kind: SecretKind,
}

fn default_scheme() -> String {
    "digest".to_string()
}

impl Credential {
    /// Digest credential with a plain text password
    pub fn digest(realm: &str, username: &str, password: &str) -> Self {
        Self {
            realm: realm.to_string(),
            scheme: default_scheme(),
            username: username.to_string(),
            secret: password.to_string(),
            secret_kind: SecretKind::PlainPassword,
        }
    }

    /// Digest credential with a pre-computed HA1, `MD5(username:realm:password)`
    pub fn hashed(realm: &str, username: &str, ha1: &str) -> Self {
        Self {
            secret_kind: SecretKind::DigestHash,
            ..Self::digest(realm, username, ha1)
        }
    }

    fn check_secret(&self) -> Result<(), EngineError> {
        match self.secret_kind {
            SecretKind::PlainPassword => Ok(()),
            SecretKind::DigestHash
                if self.secret.len() == 32
                    && self.secret.bytes().all(|b| b.is_ascii_hexdigit()) =>
            {
                Ok(())
            }
            SecretKind::DigestHash => Err(EngineError::InvalidArgument(format!(
                "Credential for realm {} is not a 32 digit hex digest",
                self.realm
            ))),
        }
    }
}

// Keep secrets out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("realm", &self.realm)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("secret", &"***")
            .field("secret_kind", &self.secret_kind)
            .finish()
    }
}

/// Account configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account identity, e.g. `sip:alice@example.com`
    pub identity: String,
    /// Registrar URI, e.g. `sip:example.com`
    pub registrar: String,
    pub credentials: Vec<Credential>,
}

impl AccountConfig {
    /// Account with the given identity, registrar and credentials
    pub fn new(identity: &str, registrar: &str, credentials: Vec<Credential>) -> Self {
        Self {
            identity: identity.to_string(),
            registrar: registrar.to_string(),
            credentials,
        }
    }

    /// Local validation performed before the account reaches the engine
    pub fn validate(&self) -> Result<(SipUri, SipUri), EngineError> {
        let identity = SipUri::parse(&self.identity).map_err(EngineError::InvalidArgument)?;
        let registrar = SipUri::parse(&self.registrar).map_err(EngineError::InvalidArgument)?;

        if self.credentials.is_empty() {
            return Err(EngineError::InvalidArgument(format!(
                "Account {} has no credentials",
                self.identity
            )));
        }

        if let Some(cred) = self.credentials.iter().find(|c| c.username.is_empty()) {
            return Err(EngineError::InvalidArgument(format!(
                "Credential for realm {} has an empty username",
                cred.realm
            )));
        }
        for cred in &self.credentials {
            cred.check_secret()?;
        }

        Ok((identity, registrar))
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self::new(
            "sip:VH_AC1_2@a10001.ac1.accounts.devvpc.vocal-dev.com",
            "sip:a10001.ac1.accounts.devvpc.vocal-dev.com",
            vec![Credential::digest(
                "a10001.ac1.accounts.devvpc.vocal-dev.com",
                "VH_AC1_2",
                "123",
            )],
        )
    }
}
