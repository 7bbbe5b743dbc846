//! Shared value objects used across the session, call and engine layers

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! engine_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn as_u32(&self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            fn from(raw: u32) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

engine_id!(
    /// Call identifier assigned by the signaling engine
    CallId,
    "call"
);

engine_id!(
    /// Account identifier assigned by the signaling engine
    AccountId,
    "acc"
);

engine_id!(
    /// Transport identifier assigned by the signaling engine
    TransportId,
    "tp"
);

engine_id!(
    /// Conference bridge slot (an audio source/sink endpoint)
    SlotId,
    "slot"
);

impl SlotId {
    /// Slot of the local sound device on the conference bridge
    pub const SOUND_DEVICE: SlotId = SlotId(0);
}

/// Validated SIP URI value object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SipUri {
    raw: String,
    user: Option<String>,
    host: String,
}

impl SipUri {
    /// Parse and validate a `sip:` or `sips:` URI
    pub fn parse(uri: &str) -> Result<Self, String> {
        let raw = uri.trim();
        if !(raw.starts_with("sip:") || raw.starts_with("sips:")) {
            return Err(format!("URI must start with 'sip:' or 'sips:': {}", uri));
        }

        let parsed = rsip::Uri::try_from(raw)
            .map_err(|e| format!("Invalid SIP URI {}: {}", uri, e))?;

        if !matches!(parsed.scheme, Some(rsip::Scheme::Sip) | Some(rsip::Scheme::Sips)) {
            return Err(format!("Unsupported URI scheme: {}", uri));
        }

        let host = parsed.host_with_port.host.to_string();
        if host.is_empty() {
            return Err(format!("SIP URI has no host: {}", uri));
        }

        Ok(Self {
            raw: raw.to_string(),
            user: parsed.auth.map(|auth| auth.user),
            host,
        })
    }

    /// User part, if the URI has one
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Host part
    pub fn host(&self) -> &str {
        &self.host
    }

    /// URI as it was given
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for SipUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sip_uri_parse() {
        let uri = SipUri::parse("sip:VH_AC1_2@a10001.ac1.accounts.devvpc.vocal-dev.com").unwrap();
        assert_eq!(uri.user(), Some("VH_AC1_2"));
        assert_eq!(uri.host(), "a10001.ac1.accounts.devvpc.vocal-dev.com");

        let registrar = SipUri::parse("sip:a10001.ac1.accounts.devvpc.vocal-dev.com").unwrap();
        assert_eq!(registrar.user(), None);
        assert_eq!(
            registrar.to_string(),
            "sip:a10001.ac1.accounts.devvpc.vocal-dev.com"
        );
    }

    #[test]
    fn test_sip_uri_rejects_other_schemes() {
        assert!(SipUri::parse("VH3@sip-10001.accounts.qos.vocal-dev.com").is_err());
        assert!(SipUri::parse("http://example.com").is_err());
        assert!(SipUri::parse("").is_err());
    }

    #[test]
    fn test_id_display() {
        assert_eq!(CallId::new(7).to_string(), "call#7");
        assert_eq!(SlotId::SOUND_DEVICE.to_string(), "slot#0");
        assert_eq!(AccountId::from(2).as_u32(), 2);
    }
}
