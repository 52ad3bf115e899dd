//! Audience comparison
//!
//! The audience inside an assertion is a full origin minted by the user
//! agent. Relying parties are more relaxed about what they send, so the
//! supplied audience may be any of:
//!
//! - `scheme://host[:port]` (including app schemes)
//! - `host:port`
//! - `host`
//!
//! Only the components the relying party actually supplied are compared,
//! except the host, which is always compared.

use std::fmt;

use url::Url;

/// Why two audiences did not match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudienceMismatch {
    Scheme,
    Port,
    Domain,
    MalformedDomain,
    MalformedPort,
    MalformedAudience,
}

impl fmt::Display for AudienceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudienceMismatch::Scheme => "scheme mismatch",
            AudienceMismatch::Port => "port mismatch",
            AudienceMismatch::Domain => "domain mismatch",
            AudienceMismatch::MalformedDomain => "malformed domain",
            AudienceMismatch::MalformedPort => "malformed port",
            AudienceMismatch::MalformedAudience => "malformed audience",
        })
    }
}

impl std::error::Error for AudienceMismatch {}

#[derive(Debug, PartialEq, Eq)]
struct ParsedAudience {
    scheme: Option<String>,
    host: String,
    port: Option<u16>,
}

fn parse(audience: &str) -> Result<ParsedAudience, AudienceMismatch> {
    if audience.contains("://") {
        let url = Url::parse(audience).map_err(|_| AudienceMismatch::MalformedAudience)?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(AudienceMismatch::MalformedAudience)?;
        return Ok(ParsedAudience {
            scheme: Some(url.scheme().to_ascii_lowercase()),
            host: host.to_string(),
            port: url.port_or_known_default(),
        });
    }

    if audience.contains(':') {
        let parts: Vec<&str> = audience.split(':').collect();
        let [host, port] = parts[..] else {
            return Err(AudienceMismatch::MalformedDomain);
        };
        if host.is_empty() {
            return Err(AudienceMismatch::MalformedDomain);
        }
        let port = port.parse().map_err(|_| AudienceMismatch::MalformedPort)?;
        return Ok(ParsedAudience {
            scheme: None,
            host: host.to_string(),
            port: Some(port),
        });
    }

    if audience.is_empty() {
        return Err(AudienceMismatch::MalformedDomain);
    }
    Ok(ParsedAudience {
        scheme: None,
        host: audience.to_string(),
        port: None,
    })
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

/// Compare the audience from a verified assertion (`want`) against the
/// audience a relying party supplied (`got`).
///
/// `want` without a scheme is read as `http`.
pub fn compare_audiences(want: &str, got: &str) -> Result<(), AudienceMismatch> {
    let got = parse(got)?;

    let mut want = parse(want)?;
    let want_scheme = want.scheme.take().unwrap_or_else(|| "http".to_string());
    let want_port = want.port.or_else(|| default_port(&want_scheme));

    if got.scheme.as_ref().is_some_and(|s| *s != want_scheme) {
        return Err(AudienceMismatch::Scheme);
    }
    if got.port.is_some() && got.port != want_port {
        return Err(AudienceMismatch::Port);
    }
    if !got.host.eq_ignore_ascii_case(&want.host) {
        return Err(AudienceMismatch::Domain);
    }
    Ok(())
}
