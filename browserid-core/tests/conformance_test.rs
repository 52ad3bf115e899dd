//! Conformance Tests
//!
//! Wire format compliance, so that tokens interoperate with other
//! implementations:
//! - Assertion format (3 parts, proper header/payload/signature)
//! - Certificate format (3 parts, proper header/payload/signature)
//! - Field presence and types, timestamps in milliseconds
//! - Base64url encoding
//! - Public key serialization for every supported algorithm

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use browserid_core::{Algorithm, Assertion, Certificate, KeyPair, Principal, PublicKey};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

// =============================================================================
// Helper Functions
// =============================================================================

/// Extract and parse signed object components without verification
fn extract_components(signed_object: &str) -> Result<Components, String> {
    let parts: Vec<&str> = signed_object.split('.').collect();
    if parts.len() != 3 {
        return Err(format!(
            "signed object must have three parts, this one has {}",
            parts.len()
        ));
    }

    let decode = |segment: &str, what: &str| {
        URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|e| format!("failed to decode {what}: {e}"))
    };

    let header: Value = serde_json::from_slice(&decode(parts[0], "header")?)
        .map_err(|e| format!("failed to parse header JSON: {e}"))?;
    let payload: Value = serde_json::from_slice(&decode(parts[1], "payload")?)
        .map_err(|e| format!("failed to parse payload JSON: {e}"))?;
    let signature = decode(parts[2], "signature")?;

    Ok(Components {
        header,
        payload,
        signature,
    })
}

#[derive(Debug)]
struct Components {
    header: Value,
    payload: Value,
    signature: Vec<u8>,
}

fn keypair(algorithm: Algorithm) -> KeyPair {
    match algorithm {
        // Small modulus keeps key generation quick
        Algorithm::Rs => KeyPair::generate_rsa(1024).unwrap(),
        other => KeyPair::generate(other).unwrap(),
    }
}

// =============================================================================
// Constants
// =============================================================================

const AUDIENCE: &str = "http://foobar.com";
const ISSUER: &str = "issuer.com";
const EMAIL: &str = "john@example.com";

fn in_a_minute() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(Utc::now().timestamp_millis() + 60_000).unwrap()
}

// =============================================================================
// Assertion Format Tests
// =============================================================================

mod assertion_format {
    use super::*;

    #[test]
    fn test_assertion_has_three_parts() {
        let user = keypair(Algorithm::Ed25519);
        let assertion = Assertion::create(AUDIENCE, Duration::minutes(1), user.secret_key()).unwrap();
        assert_eq!(assertion.encoded().split('.').count(), 3);
    }

    #[test]
    fn test_assertion_header_names_only_alg() {
        for (algorithm, alg) in [(Algorithm::Ds, "DS256"), (Algorithm::Ed25519, "EdDSA")] {
            let user = keypair(algorithm);
            let assertion =
                Assertion::create(AUDIENCE, Duration::minutes(1), user.secret_key()).unwrap();
            let components = extract_components(assertion.encoded()).unwrap();

            assert_eq!(components.header["alg"], alg);
            assert_eq!(components.header.as_object().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_assertion_payload_format() {
        let user = keypair(Algorithm::Ed25519);
        let exp = in_a_minute();
        let assertion = Assertion::create_at(AUDIENCE, exp, user.secret_key()).unwrap();
        let components = extract_components(assertion.encoded()).unwrap();

        let payload = components.payload.as_object().unwrap();
        assert_eq!(payload.len(), 2, "assertion payload has exactly exp and aud");
        assert_eq!(components.payload["aud"], AUDIENCE);
        assert_eq!(components.payload["exp"], exp.timestamp_millis());
    }

    #[test]
    fn test_assertion_signature_format() {
        let user = keypair(Algorithm::Ed25519);
        let assertion = Assertion::create(AUDIENCE, Duration::minutes(1), user.secret_key()).unwrap();
        let components = extract_components(assertion.encoded()).unwrap();
        assert_eq!(components.signature.len(), 64);

        // base64url without padding
        let crypto_segment = assertion.encoded().rsplit('.').next().unwrap();
        assert!(!crypto_segment.contains('='));
        assert!(!crypto_segment.contains('+'));
        assert!(!crypto_segment.contains('/'));
    }

    #[test]
    fn test_rsa_assertion_signature_length() {
        let user = keypair(Algorithm::Rs);
        let assertion = Assertion::create(AUDIENCE, Duration::minutes(1), user.secret_key()).unwrap();
        let components = extract_components(assertion.encoded()).unwrap();

        assert_eq!(components.header["alg"], "RS256");
        assert_eq!(components.signature.len(), 128);
        assertion.verify(&user.public_key()).unwrap();
    }
}

// =============================================================================
// Certificate Format Tests
// =============================================================================

mod certificate_format {
    use super::*;

    fn certificate(algorithm: Algorithm) -> (Certificate, KeyPair) {
        let domain = keypair(Algorithm::Ds);
        let user = keypair(algorithm);
        let now = Utc::now();
        let cert = Certificate::create_at(
            ISSUER,
            Principal::email(EMAIL),
            &user.public_key(),
            now,
            now + Duration::minutes(1),
            domain.secret_key(),
        )
        .unwrap();
        (cert, user)
    }

    #[test]
    fn test_certificate_payload_format() {
        let (cert, user) = certificate(Algorithm::Ed25519);
        let components = extract_components(cert.encoded()).unwrap();
        let payload = &components.payload;

        assert_eq!(components.header["alg"], "DS256");
        assert_eq!(payload["iss"], ISSUER);
        assert_eq!(payload["principal"]["email"], EMAIL);
        assert!(payload["iat"].is_i64());
        assert!(payload["exp"].as_i64().unwrap() > payload["iat"].as_i64().unwrap());
        assert_eq!(payload["exp"], cert.expires_at().timestamp_millis());

        let embedded: PublicKey = serde_json::from_value(payload["public-key"].clone()).unwrap();
        assert_eq!(embedded, user.public_key());
    }

    #[test]
    fn test_unverified_principal_format() {
        let domain = keypair(Algorithm::Ed25519);
        let user = keypair(Algorithm::Ed25519);
        let cert = Certificate::create(
            ISSUER,
            Principal::unverified_email(EMAIL),
            &user.public_key(),
            Duration::minutes(1),
            domain.secret_key(),
        )
        .unwrap();
        let components = extract_components(cert.encoded()).unwrap();

        assert_eq!(components.payload["principal"]["unverified-email"], EMAIL);
        assert!(components.payload["principal"].get("email").is_none());
    }

    #[test]
    fn test_dsa_signature_is_der() {
        let (cert, _) = certificate(Algorithm::Ed25519);
        let components = extract_components(cert.encoded()).unwrap();

        // DER SEQUENCE of two 256-bit integers
        assert_eq!(components.signature[0], 0x30);
        assert!(components.signature.len() <= 72);
    }
}

// =============================================================================
// Public Key Serialization Tests
// =============================================================================

mod public_key_format {
    use super::*;

    #[test]
    fn test_rsa_public_key_fields() {
        let key = keypair(Algorithm::Rs).public_key();
        let value: Value = serde_json::from_str(&key.to_json()).unwrap();

        assert_eq!(value["algorithm"], "RS");
        assert_eq!(value["e"], "65537");
        assert!(value["n"].as_str().unwrap().chars().all(|c| c.is_ascii_digit()));
        assert_eq!(PublicKey::from_json(&key.to_json()).unwrap(), key);
    }

    #[test]
    fn test_dsa_public_key_fields() {
        let key = keypair(Algorithm::Ds).public_key();
        let value: Value = serde_json::from_str(&key.to_json()).unwrap();

        assert_eq!(value["algorithm"], "DS");
        for field in ["y", "p", "q", "g"] {
            let hex = value[field].as_str().unwrap();
            assert!(hex.chars().all(|c| c.is_ascii_hexdigit()), "{field} is hex");
        }
        assert_eq!(value["q"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_ed25519_public_key_fields() {
        let key = keypair(Algorithm::Ed25519).public_key();
        let value: Value = serde_json::from_str(&key.to_json()).unwrap();

        assert_eq!(value["algorithm"], "Ed25519");
        let raw = URL_SAFE_NO_PAD
            .decode(value["publicKey"].as_str().unwrap())
            .unwrap();
        assert_eq!(raw.len(), 32);
    }

    #[test]
    fn test_canonical_form_round_trips_for_every_family() {
        for algorithm in [Algorithm::Rs, Algorithm::Ds, Algorithm::Ed25519] {
            let key = keypair(algorithm).public_key();
            let json = key.to_json();
            let parsed = PublicKey::from_json(&json).unwrap();
            assert_eq!(parsed, key);
            assert_eq!(parsed.to_json(), json, "{algorithm} canonical form is stable");
        }
    }
}
