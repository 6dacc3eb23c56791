//! Authentication scheme negotiation and Digest support
//!
//! WattBox firmware variants in the field implement exactly one of
//! three credential-presentation schemes (HTTP Basic, HTTP Digest per
//! RFC 2617 with MD5, or a cookie-backed login form) and offer no
//! capability-discovery endpoint. The client probes once, commits to
//! the accepted scheme, and reuses it for every subsequent request.

use crate::config::credentials::WattBoxCredentials;
use rand::{distributions::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication scheme a device accepted during negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// HTTP Basic credentials on every request
    Basic,
    /// HTTP Digest challenge/response on every request
    Digest,
    /// Form login once; the cookie jar carries the session
    Session,
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScheme::Basic => write!(f, "basic"),
            AuthScheme::Digest => write!(f, "digest"),
            AuthScheme::Session => write!(f, "session"),
        }
    }
}

/// Negotiated authentication state, owned by the client
///
/// Exactly one variant is active per client. `Unresolved` triggers
/// negotiation on the next call; `Failed` is remembered so a
/// misconfigured device does not get re-probed on every poll.
#[derive(Debug)]
pub(crate) enum AuthState {
    Unresolved,
    Basic,
    Digest(DigestAuth),
    Session,
    Failed(String),
}

impl AuthState {
    pub(crate) fn scheme(&self) -> Option<AuthScheme> {
        match self {
            AuthState::Basic => Some(AuthScheme::Basic),
            AuthState::Digest(_) => Some(AuthScheme::Digest),
            AuthState::Session => Some(AuthScheme::Session),
            AuthState::Unresolved | AuthState::Failed(_) => None,
        }
    }
}

/// Parsed `WWW-Authenticate: Digest ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value.
    ///
    /// Returns `None` unless the header names the Digest scheme and
    /// carries the mandatory `realm` and `nonce` parameters.
    pub(crate) fn parse(header: &str) -> Option<Self> {
        let rest = header.trim();
        if !rest.get(..6)?.eq_ignore_ascii_case("digest") {
            return None;
        }
        let rest = &rest[6..];

        let mut realm = None;
        let mut nonce = None;
        let mut qop = None;
        let mut opaque = None;
        let mut algorithm = None;

        for param in split_challenge_params(rest) {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"').to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "qop" => qop = Some(value),
                "opaque" => opaque = Some(value),
                "algorithm" => algorithm = Some(value),
                _ => {}
            }
        }

        Some(Self {
            realm: realm?,
            nonce: nonce?,
            qop,
            opaque,
            algorithm,
        })
    }

    /// The qop value to negotiate: `auth` when offered, otherwise none.
    /// `auth-int` is not used; these devices never offer it alone.
    fn negotiated_qop(&self) -> Option<&str> {
        self.qop
            .as_deref()
            .filter(|offered| offered.split(',').any(|q| q.trim() == "auth"))
            .map(|_| "auth")
    }
}

/// Split challenge parameters on commas, honoring quoted values
/// (qop lists arrive as `qop="auth,auth-int"`).
fn split_challenge_params(input: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => {
                if !current.trim().is_empty() {
                    params.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        params.push(current.trim().to_string());
    }
    params
}

/// Digest authentication state for one client
///
/// Holds the server challenge and the nonce-use counter. The counter
/// increments per request; the challenge is replaced when the server
/// reports a stale nonce.
#[derive(Debug)]
pub(crate) struct DigestAuth {
    challenge: DigestChallenge,
    nc: u32,
}

impl DigestAuth {
    pub(crate) fn new(challenge: DigestChallenge) -> Self {
        Self { challenge, nc: 0 }
    }

    /// Replace the challenge after a stale-nonce 401
    pub(crate) fn refresh(&mut self, challenge: DigestChallenge) {
        self.challenge = challenge;
        self.nc = 0;
    }

    /// Build the `Authorization` header value for one request
    pub(crate) fn authorization(
        &mut self,
        credentials: &WattBoxCredentials,
        method: &str,
        uri: &str,
    ) -> String {
        self.nc += 1;
        let cnonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        build_authorization(&self.challenge, credentials, method, uri, self.nc, &cnonce)
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input))
}

/// Compute the RFC 2617 digest response value
fn digest_response(
    challenge: &DigestChallenge,
    credentials: &WattBoxCredentials,
    method: &str,
    uri: &str,
    nc: u32,
    cnonce: &str,
) -> String {
    let ha1 = md5_hex(&format!(
        "{}:{}:{}",
        credentials.username, challenge.realm, credentials.password
    ));
    let ha2 = md5_hex(&format!("{method}:{uri}"));

    match challenge.negotiated_qop() {
        Some(qop) => md5_hex(&format!(
            "{ha1}:{nonce}:{nc:08x}:{cnonce}:{qop}:{ha2}",
            nonce = challenge.nonce
        )),
        None => md5_hex(&format!("{ha1}:{nonce}:{ha2}", nonce = challenge.nonce)),
    }
}

fn build_authorization(
    challenge: &DigestChallenge,
    credentials: &WattBoxCredentials,
    method: &str,
    uri: &str,
    nc: u32,
    cnonce: &str,
) -> String {
    let response = digest_response(challenge, credentials, method, uri, nc, cnonce);

    let mut header = format!(
        "Digest username=\"{user}\", realm=\"{realm}\", nonce=\"{nonce}\", uri=\"{uri}\", response=\"{response}\"",
        user = credentials.username,
        realm = challenge.realm,
        nonce = challenge.nonce,
    );
    if let Some(qop) = challenge.negotiated_qop() {
        header.push_str(&format!(", qop={qop}, nc={nc:08x}, cnonce=\"{cnonce}\""));
    }
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    if let Some(algorithm) = &challenge.algorithm {
        header.push_str(&format!(", algorithm={algorithm}"));
    }
    header
}
