//! Cryptographic key types for BrowserID-NG
//!
//! Three signature families are supported:
//! - `RS`: RSA, PKCS#1 v1.5 padding over SHA-256
//! - `DS`: DSA over a fixed 2048/256-bit group, SHA-256
//! - `Ed25519`: EdDSA
//!
//! Public keys serialize to a JSON object tagged by `algorithm`, which is the
//! form that appears inside certificates and `/.well-known/browserid`
//! documents.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{SigningKey as EdSigningKey, VerifyingKey as EdVerifyingKey};
use rand::rngs::OsRng;
use rsa::pkcs1v15;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use signature::{DigestSigner, DigestVerifier, SignatureEncoding, Signer, Verifier};

use crate::{Error, Result};

/// Modulus size used by [`KeyPair::generate`] for RSA keys
pub const RSA_KEY_BITS: usize = 2048;

// Shared DSA group (L = 2048, N = 256). All DS keys issued or accepted by
// this crate may use any group, but locally generated keys use this one.
const DS_GROUP_P: &str = concat!(
    "a67ad85de0f9ef734cfba82b0991a9ec6fc3e79d39347c8fb1b1a93de45698f2",
    "16c4a34d9a9b01d1fb36ea4703dddd3531656ad94ab100cc99c748c457224241",
    "001f058ce524c7e770388a2b6d92d16e48a981bbfc9195045d4c66e2dc9d10cc",
    "541d8b8ff8818c7aff16fd9736d946adac97701519da0cd84a668847f77b0559",
    "53a43bf878fb15bc9917193c8eb7208afff1c98148bc0926ede030a4cfd729d8",
    "05650f15e60360566e954a13fbcd8ff044ed62e6571a8f9bab0ca773fdd5b0e2",
    "76f3a7add269061ea696cad9420651b53db2bc26c22c084e3c39ff2c4a55ed2a",
    "0e85485d5bcc55c3f071125ffb795c63293c4452070351550ed28443f3e1d6af",
);
const DS_GROUP_Q: &str = "fc1100b984ac01c31754bdfa49cc9817deec4ef36b954368b6ae13b568d1ae07";
const DS_GROUP_G: &str = concat!(
    "17a17a8d2d62a739a7d62473719b20c69fae1eac6e8b69d6f56b9985a3ce7645",
    "ce8cfab2876f528fcad82624d19781cbe35bd62092f722abdad860219a81e16b",
    "7ee06141b2841982fb6d0c670ae8106f77c927839ea87e3c51a4c2dc04256aee",
    "ed0c5e0c8a8e2de630b3e223c0f56aebe4039247c63a276d1283fd69fee09802",
    "4da625c51bb1f770cd36a219813d713473624ac8d489b28fbcd3277a58f7a87a",
    "2606d0656ff6005c92510b1b4f093d2d73cbd16ca550e7e61a62db0e5237b274",
    "d9663602478d027d35c94cce6b582ec039282d2b52fbc6ba8136153b3e214357",
    "c3371cc0b719058062d66503a49ceec7dffbc1822c1a57497a224d8d8d055912",
);

/// Signature algorithm family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Rs,
    Ds,
    Ed25519,
}

impl Algorithm {
    /// Tag used in the serialized key (`"RS"`, `"DS"`, `"Ed25519"`)
    pub fn tag(self) -> &'static str {
        match self {
            Algorithm::Rs => "RS",
            Algorithm::Ds => "DS",
            Algorithm::Ed25519 => "Ed25519",
        }
    }

    /// `alg` value used in signed object headers
    pub fn jws_alg(self) -> &'static str {
        match self {
            Algorithm::Rs => "RS256",
            Algorithm::Ds => "DS256",
            Algorithm::Ed25519 => "EdDSA",
        }
    }

    /// Map a signed object header `alg` back to a family
    pub fn from_jws_alg(alg: &str) -> Option<Self> {
        match alg {
            "RS256" => Some(Algorithm::Rs),
            "DS256" => Some(Algorithm::Ds),
            "EdDSA" => Some(Algorithm::Ed25519),
            _ => None,
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Clone)]
enum PublicKeyInner {
    Rs(RsaPublicKey),
    Ds(dsa::VerifyingKey),
    Ed25519(EdVerifyingKey),
}

/// A public key that can verify signatures
#[derive(Clone)]
pub struct PublicKey {
    inner: PublicKeyInner,
}

impl PublicKey {
    /// The algorithm family of this key
    pub fn algorithm(&self) -> Algorithm {
        match self.inner {
            PublicKeyInner::Rs(_) => Algorithm::Rs,
            PublicKeyInner::Ds(_) => Algorithm::Ds,
            PublicKeyInner::Ed25519(_) => Algorithm::Ed25519,
        }
    }

    /// Create an Ed25519 public key from raw bytes
    pub fn from_ed25519_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::InvalidKey("public key must be 32 bytes".into()))?;
        let inner = EdVerifyingKey::from_bytes(&bytes)
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        Ok(Self {
            inner: PublicKeyInner::Ed25519(inner),
        })
    }

    /// Verify a signature over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match &self.inner {
            PublicKeyInner::Rs(key) => {
                let signature = pkcs1v15::Signature::try_from(signature)
                    .map_err(|_| Error::SignatureVerificationFailed)?;
                pkcs1v15::VerifyingKey::<Sha256>::new(key.clone())
                    .verify(message, &signature)
                    .map_err(|_| Error::SignatureVerificationFailed)
            }
            PublicKeyInner::Ds(key) => {
                let signature = dsa::Signature::try_from(signature)
                    .map_err(|_| Error::SignatureVerificationFailed)?;
                key.verify_digest(Sha256::new_with_prefix(message), &signature)
                    .map_err(|_| Error::SignatureVerificationFailed)
            }
            PublicKeyInner::Ed25519(key) => {
                let sig_bytes: [u8; 64] = signature
                    .try_into()
                    .map_err(|_| Error::SignatureVerificationFailed)?;
                let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
                key.verify(message, &signature)
                    .map_err(|_| Error::SignatureVerificationFailed)
            }
        }
    }

    /// Canonical JSON serialization
    pub fn to_json(&self) -> String {
        // Serializing a map of strings cannot fail
        serde_json::to_string(&PublicKeyRepr::from(self)).unwrap_or_default()
    }

    /// Parse the canonical JSON serialization
    pub fn from_json(s: &str) -> Result<Self> {
        let repr: PublicKeyRepr = serde_json::from_str(s)?;
        repr.try_into()
    }

    /// Short hex digest of the canonical form, for logs
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.to_json().as_bytes());
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (PublicKeyInner::Rs(a), PublicKeyInner::Rs(b)) => a == b,
            (PublicKeyInner::Ds(a), PublicKeyInner::Ds(b)) => {
                a.y() == b.y()
                    && a.components().p() == b.components().p()
                    && a.components().q() == b.components().q()
                    && a.components().g() == b.components().g()
            }
            (PublicKeyInner::Ed25519(a), PublicKeyInner::Ed25519(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("algorithm", &self.algorithm())
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Wire form of a public key
#[derive(Serialize, Deserialize)]
#[serde(tag = "algorithm")]
enum PublicKeyRepr {
    #[serde(rename = "RS")]
    Rs { n: String, e: String },
    #[serde(rename = "DS")]
    Ds {
        y: String,
        p: String,
        q: String,
        g: String,
    },
    #[serde(rename = "Ed25519")]
    Ed25519 {
        #[serde(rename = "publicKey")]
        public_key: String,
    },
}

impl From<&PublicKey> for PublicKeyRepr {
    fn from(key: &PublicKey) -> Self {
        match &key.inner {
            PublicKeyInner::Rs(k) => PublicKeyRepr::Rs {
                n: k.n().to_str_radix(10),
                e: k.e().to_str_radix(10),
            },
            PublicKeyInner::Ds(k) => PublicKeyRepr::Ds {
                y: k.y().to_str_radix(16),
                p: k.components().p().to_str_radix(16),
                q: k.components().q().to_str_radix(16),
                g: k.components().g().to_str_radix(16),
            },
            PublicKeyInner::Ed25519(k) => PublicKeyRepr::Ed25519 {
                public_key: URL_SAFE_NO_PAD.encode(k.as_bytes()),
            },
        }
    }
}

impl TryFrom<PublicKeyRepr> for PublicKey {
    type Error = Error;

    fn try_from(repr: PublicKeyRepr) -> Result<Self> {
        let inner = match repr {
            PublicKeyRepr::Rs { n, e } => {
                let key = RsaPublicKey::new(rsa_int(&n, "n")?, rsa_int(&e, "e")?)
                    .map_err(|e| Error::InvalidKey(format!("bad RSA key: {e}")))?;
                PublicKeyInner::Rs(key)
            }
            PublicKeyRepr::Ds { y, p, q, g } => {
                let components = dsa::Components::from_components(
                    dsa_int(&p, "p")?,
                    dsa_int(&q, "q")?,
                    dsa_int(&g, "g")?,
                )
                .map_err(|_| Error::InvalidKey("bad DSA group parameters".into()))?;
                let key = dsa::VerifyingKey::from_components(components, dsa_int(&y, "y")?)
                    .map_err(|_| Error::InvalidKey("bad DSA public value".into()))?;
                PublicKeyInner::Ds(key)
            }
            PublicKeyRepr::Ed25519 { public_key } => {
                let bytes = URL_SAFE_NO_PAD.decode(public_key)?;
                return PublicKey::from_ed25519_bytes(&bytes);
            }
        };
        Ok(Self { inner })
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PublicKeyRepr::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = PublicKeyRepr::deserialize(deserializer)?;
        PublicKey::try_from(repr).map_err(serde::de::Error::custom)
    }
}

enum SecretKeyInner {
    Rs(RsaPrivateKey),
    Ds(dsa::SigningKey),
    Ed25519(EdSigningKey),
}

/// A signing key. Only ever stored locally, never sent over the wire.
pub struct SecretKey {
    inner: SecretKeyInner,
}

impl SecretKey {
    /// The algorithm family of this key
    pub fn algorithm(&self) -> Algorithm {
        match self.inner {
            SecretKeyInner::Rs(_) => Algorithm::Rs,
            SecretKeyInner::Ds(_) => Algorithm::Ds,
            SecretKeyInner::Ed25519(_) => Algorithm::Ed25519,
        }
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> PublicKey {
        let inner = match &self.inner {
            SecretKeyInner::Rs(k) => PublicKeyInner::Rs(k.to_public_key()),
            SecretKeyInner::Ds(k) => PublicKeyInner::Ds(k.verifying_key().clone()),
            SecretKeyInner::Ed25519(k) => PublicKeyInner::Ed25519(k.verifying_key()),
        };
        PublicKey { inner }
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match &self.inner {
            SecretKeyInner::Rs(key) => {
                let signature = pkcs1v15::SigningKey::<Sha256>::new(key.clone())
                    .try_sign(message)
                    .map_err(|e| Error::InvalidKey(format!("RSA signing failed: {e}")))?;
                Ok(signature.to_vec())
            }
            SecretKeyInner::Ds(key) => {
                let signature: dsa::Signature = key
                    .try_sign_digest(Sha256::new_with_prefix(message))
                    .map_err(|e| Error::InvalidKey(format!("DSA signing failed: {e}")))?;
                Ok(signature.to_vec())
            }
            SecretKeyInner::Ed25519(key) => {
                let signature: ed25519_dalek::Signature = key.sign(message);
                Ok(signature.to_bytes().to_vec())
            }
        }
    }

    /// Serialize for local key storage
    pub fn to_json(&self) -> String {
        serde_json::to_string(&SecretKeyRepr::from(self)).unwrap_or_default()
    }

    /// Parse a stored secret key
    pub fn from_json(s: &str) -> Result<Self> {
        let repr: SecretKeyRepr = serde_json::from_str(s)?;
        repr.try_into()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "algorithm")]
enum SecretKeyRepr {
    #[serde(rename = "RS")]
    Rs {
        n: String,
        e: String,
        d: String,
        p: String,
        q: String,
    },
    #[serde(rename = "DS")]
    Ds {
        x: String,
        y: String,
        p: String,
        q: String,
        g: String,
    },
    #[serde(rename = "Ed25519")]
    Ed25519 {
        #[serde(rename = "secretKey")]
        secret_key: String,
    },
}

impl From<&SecretKey> for SecretKeyRepr {
    fn from(key: &SecretKey) -> Self {
        match &key.inner {
            SecretKeyInner::Rs(k) => {
                let primes = k.primes();
                let prime = |i: usize| primes.get(i).map(|p| p.to_str_radix(10)).unwrap_or_default();
                SecretKeyRepr::Rs {
                    n: k.n().to_str_radix(10),
                    e: k.e().to_str_radix(10),
                    d: k.d().to_str_radix(10),
                    p: prime(0),
                    q: prime(1),
                }
            }
            SecretKeyInner::Ds(k) => {
                let public = k.verifying_key();
                SecretKeyRepr::Ds {
                    x: k.x().to_str_radix(16),
                    y: public.y().to_str_radix(16),
                    p: public.components().p().to_str_radix(16),
                    q: public.components().q().to_str_radix(16),
                    g: public.components().g().to_str_radix(16),
                }
            }
            SecretKeyInner::Ed25519(k) => SecretKeyRepr::Ed25519 {
                secret_key: URL_SAFE_NO_PAD.encode(k.as_bytes()),
            },
        }
    }
}

impl TryFrom<SecretKeyRepr> for SecretKey {
    type Error = Error;

    fn try_from(repr: SecretKeyRepr) -> Result<Self> {
        let inner = match repr {
            SecretKeyRepr::Rs { n, e, d, p, q } => {
                let key = RsaPrivateKey::from_components(
                    rsa_int(&n, "n")?,
                    rsa_int(&e, "e")?,
                    rsa_int(&d, "d")?,
                    vec![rsa_int(&p, "p")?, rsa_int(&q, "q")?],
                )
                .map_err(|e| Error::InvalidKey(format!("bad RSA key: {e}")))?;
                SecretKeyInner::Rs(key)
            }
            SecretKeyRepr::Ds { x, y, p, q, g } => {
                let components = dsa::Components::from_components(
                    dsa_int(&p, "p")?,
                    dsa_int(&q, "q")?,
                    dsa_int(&g, "g")?,
                )
                .map_err(|_| Error::InvalidKey("bad DSA group parameters".into()))?;
                let public = dsa::VerifyingKey::from_components(components, dsa_int(&y, "y")?)
                    .map_err(|_| Error::InvalidKey("bad DSA public value".into()))?;
                let key = dsa::SigningKey::from_components(public, dsa_int(&x, "x")?)
                    .map_err(|_| Error::InvalidKey("bad DSA secret value".into()))?;
                SecretKeyInner::Ds(key)
            }
            SecretKeyRepr::Ed25519 { secret_key } => {
                let seed = URL_SAFE_NO_PAD.decode(secret_key)?;
                let seed: [u8; 32] = seed
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::InvalidKey("seed must be 32 bytes".into()))?;
                SecretKeyInner::Ed25519(EdSigningKey::from_bytes(&seed))
            }
        };
        Ok(Self { inner })
    }
}

impl Serialize for SecretKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        SecretKeyRepr::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let repr = SecretKeyRepr::deserialize(deserializer)?;
        SecretKey::try_from(repr).map_err(serde::de::Error::custom)
    }
}

/// A keypair that can sign and verify
#[derive(Debug)]
pub struct KeyPair {
    public: PublicKey,
    secret: SecretKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate(algorithm: Algorithm) -> Result<Self> {
        let inner = match algorithm {
            Algorithm::Rs => return Self::generate_rsa(RSA_KEY_BITS),
            Algorithm::Ds => SecretKeyInner::Ds(dsa::SigningKey::generate(
                &mut OsRng,
                ds_group()?,
            )),
            Algorithm::Ed25519 => SecretKeyInner::Ed25519(EdSigningKey::generate(&mut OsRng)),
        };
        Ok(Self::from_secret(SecretKey { inner }))
    }

    /// Generate an RSA keypair with a specific modulus size
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| Error::InvalidKey(format!("RSA key generation failed: {e}")))?;
        Ok(Self::from_secret(SecretKey {
            inner: SecretKeyInner::Rs(key),
        }))
    }

    /// Wrap an existing secret key
    pub fn from_secret(secret: SecretKey) -> Self {
        Self {
            public: secret.public_key(),
            secret,
        }
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        self.public.clone()
    }

    /// Get the secret key
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn algorithm(&self) -> Algorithm {
        self.secret.algorithm()
    }

    /// Sign a message
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.secret.sign(message)
    }
}

fn ds_group() -> Result<dsa::Components> {
    dsa::Components::from_components(
        dsa_int(DS_GROUP_P, "p")?,
        dsa_int(DS_GROUP_Q, "q")?,
        dsa_int(DS_GROUP_G, "g")?,
    )
    .map_err(|_| Error::InvalidKey("bad DSA group parameters".into()))
}

fn rsa_int(s: &str, field: &str) -> Result<rsa::BigUint> {
    rsa::BigUint::parse_bytes(s.as_bytes(), 10)
        .ok_or_else(|| Error::InvalidKey(format!("RSA parameter {field} is not a decimal integer")))
}

fn dsa_int(s: &str, field: &str) -> Result<dsa::BigUint> {
    dsa::BigUint::parse_bytes(s.as_bytes(), 16)
        .ok_or_else(|| Error::InvalidKey(format!("DSA parameter {field} is not a hex integer")))
}
