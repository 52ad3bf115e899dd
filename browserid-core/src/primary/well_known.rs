//! The `/.well-known/browserid` support document
//!
//! A domain publishes one of three shapes:
//!
//! ```json
//! {"public-key": {...}, "authentication": "/auth", "provisioning": "/prov"}
//! {"authority": "idp.example.net"}
//! {"disabled": true}
//! ```

use serde_json::{json, Map, Value};
use url::Url;

use crate::{Error, PublicKey, Result};

/// Path a domain serves its support document from
pub const WELL_KNOWN_PATH: &str = "/.well-known/browserid";

const REQUIRED_KEYS: [&str; 3] = ["public-key", "authentication", "provisioning"];

/// A parsed support document
#[derive(Debug, Clone, PartialEq)]
pub enum WellKnownDocument {
    Primary {
        public_key: PublicKey,
        authentication: String,
        provisioning: String,
    },
    Delegation {
        authority: String,
    },
    Disabled,
}

impl WellKnownDocument {
    /// Create a primary document
    pub fn primary(
        public_key: PublicKey,
        authentication: impl Into<String>,
        provisioning: impl Into<String>,
    ) -> Self {
        WellKnownDocument::Primary {
            public_key,
            authentication: authentication.into(),
            provisioning: provisioning.into(),
        }
    }

    /// Create a delegation document
    pub fn delegate(authority: impl Into<String>) -> Self {
        WellKnownDocument::Delegation {
            authority: authority.into(),
        }
    }

    /// Interpret a JSON body. The error string is the reason the document
    /// is malformed.
    pub fn from_value(value: &Value) -> std::result::Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "document is not a JSON object".to_string())?;

        if obj.get("disabled").and_then(Value::as_bool) == Some(true) {
            return Ok(WellKnownDocument::Disabled);
        }

        if let Some(authority) = obj.get("authority") {
            let authority = authority
                .as_str()
                .filter(|a| validate_domain(a).is_ok())
                .ok_or_else(|| "malformed authority".to_string())?;
            return Ok(WellKnownDocument::delegate(authority.to_ascii_lowercase()));
        }

        if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !obj.contains_key(**k)) {
            return Err(format!("missing required key: {missing}"));
        }

        let public_key: PublicKey = serde_json::from_value(obj["public-key"].clone())
            .map_err(|e| format!("malformed public key: {e}"))?;

        Ok(WellKnownDocument::Primary {
            public_key,
            authentication: string_field(obj, "authentication")?,
            provisioning: string_field(obj, "provisioning")?,
        })
    }

    /// Serialize in the published form
    pub fn to_json(&self) -> String {
        let value = match self {
            WellKnownDocument::Primary {
                public_key,
                authentication,
                provisioning,
            } => json!({
                "public-key": public_key,
                "authentication": authentication,
                "provisioning": provisioning,
            }),
            WellKnownDocument::Delegation { authority } => json!({ "authority": authority }),
            WellKnownDocument::Disabled => json!({ "disabled": true }),
        };
        value.to_string()
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> std::result::Result<String, String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("malformed {key}"))
}

/// Endpoints a primary serves to users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryUrls {
    pub auth: Url,
    pub prov: Url,
}

impl PrimaryUrls {
    /// Join document paths onto the origin that served the document. The
    /// error string is the reason the document is malformed.
    pub fn build(
        base_url: &str,
        authentication: &str,
        provisioning: &str,
    ) -> std::result::Result<Self, String> {
        let join = |path: &str, what: &str| {
            Url::parse(&format!("{base_url}{path}")).map_err(|_| format!("malformed {what} url"))
        };
        Ok(Self {
            auth: join(authentication, "authentication")?,
            prov: join(provisioning, "provisioning")?,
        })
    }
}

/// Accept `host` or `host:port` where host is a DNS name or IPv4 address
pub fn validate_domain(domain: &str) -> Result<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ':');
    if domain.is_empty() || !domain.chars().all(allowed) {
        return Err(Error::InvalidDomain(domain.to_string()));
    }

    let (host, port) = match domain.split_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (domain, None),
    };
    if host.is_empty()
        || host.starts_with('.')
        || host.ends_with('.')
        || host.contains("..")
        || host.split('.').any(|label| label.starts_with('-') || label.ends_with('-'))
    {
        return Err(Error::InvalidDomain(domain.to_string()));
    }
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(Error::InvalidDomain(domain.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Algorithm, KeyPair};

    fn key() -> PublicKey {
        KeyPair::generate(Algorithm::Ed25519).unwrap().public_key()
    }

    #[test]
    fn test_primary_document() {
        let pk = key();
        let doc = WellKnownDocument::primary(pk.clone(), "/auth", "/prov");
        let value: Value = serde_json::from_str(&doc.to_json()).unwrap();

        assert_eq!(WellKnownDocument::from_value(&value).unwrap(), doc);
        assert_eq!(value["authentication"], "/auth");
        assert_eq!(value["public-key"]["algorithm"], "Ed25519");
    }

    #[test]
    fn test_missing_required_key() {
        let value = json!({ "public-key": key(), "authentication": "/auth" });
        assert_eq!(
            WellKnownDocument::from_value(&value).unwrap_err(),
            "missing required key: provisioning"
        );
    }

    #[test]
    fn test_delegation_and_disabled_need_no_key() {
        assert_eq!(
            WellKnownDocument::from_value(&json!({ "authority": "IdP.example.net" })).unwrap(),
            WellKnownDocument::delegate("idp.example.net")
        );
        assert_eq!(
            WellKnownDocument::from_value(&json!({ "disabled": true, "authority": "x.com" }))
                .unwrap(),
            WellKnownDocument::Disabled
        );
    }

    #[test]
    fn test_malformed_authority() {
        for bad in [json!({ "authority": "not a domain" }), json!({ "authority": 42 })] {
            assert_eq!(
                WellKnownDocument::from_value(&bad).unwrap_err(),
                "malformed authority"
            );
        }
    }

    #[test]
    fn test_validate_domain() {
        for ok in ["example.com", "127.0.0.1:10005", "localhost", "a-b.example.org"] {
            assert!(validate_domain(ok).is_ok(), "{ok}");
        }
        for bad in ["", "exa mple.com", "example.com/path", "a..b", "-a.com", "a.com:port", "a@b"] {
            assert!(validate_domain(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_urls_join_base() {
        let urls = PrimaryUrls::build("https://idp.example.net", "/auth", "/prov").unwrap();
        assert_eq!(urls.auth.as_str(), "https://idp.example.net/auth");
        assert_eq!(urls.prov.as_str(), "https://idp.example.net/prov");
    }
}
