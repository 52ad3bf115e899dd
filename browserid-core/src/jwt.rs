//! Three-part signed objects: `header.payload.signature`
//!
//! Each part is base64url without padding. The header only carries `alg`,
//! which must agree with the family of the key used to verify.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::keys::{Algorithm, PublicKey, SecretKey};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Header {
    alg: String,
}

/// Serialize `payload`, sign it with `key`, and return the encoded object
pub fn sign<T: Serialize>(payload: &T, key: &SecretKey) -> Result<String> {
    let header = Header {
        alg: key.algorithm().jws_alg().to_string(),
    };
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);

    let message = format!("{header_b64}.{payload_b64}");
    let signature = key.sign(message.as_bytes())?;

    Ok(format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// A decoded but not yet verified signed object
#[derive(Debug, Clone)]
pub struct SignedObject {
    encoded: String,
    algorithm: Algorithm,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl SignedObject {
    /// Split and decode an encoded object. Any structural problem is
    /// reported as [`Error::MalformedAssertion`].
    pub fn parse(encoded: &str) -> Result<Self> {
        let parts: Vec<&str> = encoded.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = parts[..] else {
            return Err(Error::MalformedAssertion);
        };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| Error::MalformedAssertion)?;
        let header: Header =
            serde_json::from_slice(&header_bytes).map_err(|_| Error::MalformedAssertion)?;
        let algorithm = Algorithm::from_jws_alg(&header.alg).ok_or(Error::MalformedAssertion)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| Error::MalformedAssertion)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| Error::MalformedAssertion)?;

        Ok(Self {
            encoded: encoded.to_string(),
            algorithm,
            payload,
            signature,
        })
    }

    /// Algorithm declared in the header
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Deserialize the payload
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload).map_err(|_| Error::MalformedAssertion)
    }

    /// Check the signature over `header.payload`
    pub fn verify(&self, key: &PublicKey) -> Result<()> {
        if key.algorithm() != self.algorithm {
            return Err(Error::SignatureVerificationFailed);
        }
        key.verify(self.signing_input().as_bytes(), &self.signature)
    }

    /// The original encoded form
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    fn signing_input(&self) -> &str {
        // parse() guarantees two dots
        match self.encoded.rfind('.') {
            Some(idx) => &self.encoded[..idx],
            None => &self.encoded,
        }
    }
}
