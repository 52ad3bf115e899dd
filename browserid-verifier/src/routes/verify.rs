//! Assertion verification endpoint

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::Json;
use browserid_core::primary::WellKnownFetcher;
use browserid_core::{VerificationOutcome, VerifyOptions};
use serde_json::{json, Map, Value};

use crate::error::ServiceError;
use crate::state::AppState;

/// Verification request parameters, from the query string or the body
#[derive(Debug, Default)]
pub struct VerifyParams {
    pub assertion: Option<String>,
    pub audience: Option<String>,
    pub force_issuer: Option<String>,
    pub allow_unverified: Option<String>,
}

impl VerifyParams {
    /// Read parameters from a JSON object body
    pub fn from_json(body: &[u8]) -> Result<Self, ServiceError> {
        let object: Map<String, Value> = serde_json::from_slice(body)
            .map_err(|e| ServiceError::BadRequestBody(format!("malformed JSON body: {e}")))?;

        let string = |key: &str| match object.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };

        Ok(Self {
            assertion: string("assertion"),
            audience: string("audience"),
            force_issuer: string("forceIssuer"),
            allow_unverified: string("allowUnverified"),
        })
    }

    /// Read parameters from a urlencoded form body
    pub fn from_form(body: &[u8]) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(body) {
            let slot = match key.as_ref() {
                "assertion" => &mut params.assertion,
                "audience" => &mut params.audience,
                "forceIssuer" => &mut params.force_issuer,
                "allowUnverified" => &mut params.allow_unverified,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        params
    }

    fn options(&self) -> VerifyOptions {
        VerifyOptions {
            force_issuer: self.force_issuer.clone().filter(|s| !s.is_empty()),
            allow_unverified: self.allow_unverified.as_deref() == Some("true"),
        }
    }
}

/// GET /verify
///
/// The query string is read like a form body, so every request gets the
/// JSON envelope. Repeated keys keep the last value.
pub async fn verify_get<F>(
    State(state): State<Arc<AppState<F>>>,
    RawQuery(query): RawQuery,
) -> Result<Json<Value>, ServiceError>
where
    F: WellKnownFetcher + 'static,
{
    let params = VerifyParams::from_form(query.unwrap_or_default().as_bytes());
    verify(&state, params).await
}

/// POST /verify
///
/// Accepts a JSON or urlencoded form body.
pub async fn verify_post<F>(
    State(state): State<Arc<AppState<F>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ServiceError>
where
    F: WellKnownFetcher + 'static,
{
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let params = if content_type.starts_with("application/json") {
        VerifyParams::from_json(&body)?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        VerifyParams::from_form(&body)
    } else {
        return Err(ServiceError::UnsupportedContentType);
    };

    verify(&state, params).await
}

async fn verify<F: WellKnownFetcher>(
    state: &AppState<F>,
    params: VerifyParams,
) -> Result<Json<Value>, ServiceError> {
    let options = params.options();
    let (Some(assertion), Some(audience)) = (
        params.assertion.filter(|s| !s.is_empty()),
        params.audience.filter(|s| !s.is_empty()),
    ) else {
        return Err(ServiceError::MissingParameters);
    };

    let outcome = state.verifier.verify(&assertion, &audience, &options).await?;
    tracing::info!(
        email = %outcome.email,
        audience = %outcome.audience,
        issuer = %outcome.issuer,
        "Assertion verified"
    );

    Ok(Json(success_body(&outcome)))
}

fn success_body(outcome: &VerificationOutcome) -> Value {
    let email_key = if outcome.verified {
        "email"
    } else {
        "unverified-email"
    };

    json!({
        "status": "okay",
        email_key: outcome.email,
        "audience": outcome.audience,
        "valid-until": outcome.expires.timestamp_millis(),
        "issuer": outcome.issuer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_form_params() {
        let params = VerifyParams::from_form(
            b"assertion=a~b&audience=http%3A%2F%2Frp.com&allowUnverified=true&other=x",
        );
        assert_eq!(params.assertion.as_deref(), Some("a~b"));
        assert_eq!(params.audience.as_deref(), Some("http://rp.com"));
        assert!(params.options().allow_unverified);
        assert_eq!(params.options().force_issuer, None);
    }

    #[test]
    fn test_json_params_accept_boolean_flag() {
        let params = VerifyParams::from_json(
            br#"{"assertion": "a~b", "audience": "rp.com", "allowUnverified": true, "forceIssuer": "idp.org"}"#,
        )
        .unwrap();
        let options = params.options();
        assert!(options.allow_unverified);
        assert_eq!(options.force_issuer.as_deref(), Some("idp.org"));
    }

    #[test]
    fn test_json_params_reject_non_object() {
        assert!(VerifyParams::from_json(b"[1, 2]").is_err());
        assert!(VerifyParams::from_json(b"not json").is_err());
    }

    #[test]
    fn test_allow_unverified_needs_literal_true() {
        let params = VerifyParams::from_form(b"allowUnverified=yes");
        assert!(!params.options().allow_unverified);
    }

    #[test]
    fn test_success_body_keys() {
        let outcome = VerificationOutcome {
            email: "alice@example.com".into(),
            audience: "https://rp.com".into(),
            expires: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            issuer: "example.com".into(),
            verified: false,
        };

        let body = success_body(&outcome);
        assert_eq!(body["status"], "okay");
        assert_eq!(body["unverified-email"], "alice@example.com");
        assert!(body.get("email").is_none());
        assert_eq!(body["valid-until"], 1_700_000_000_123i64);
        assert_eq!(body["issuer"], "example.com");
    }
}
