//! HTTP client implementation for WattBox PDU communication
//!
//! This module provides HTTP-based communication with WattBox power
//! distribution units, scraping state from the generated status page
//! and issuing outlet commands.

use crate::client::auth::{AuthScheme, AuthState, DigestAuth, DigestChallenge};
use crate::client::status_page;
use crate::client::{
    DeviceMetrics, OutletInfo, StatusSnapshot, LOGIN_PATH, OUTLET_OFF_PATH, OUTLET_ON_PATH,
    OUTLET_RESET_PATH, STATUS_PATH,
};
use crate::config::credentials::WattBoxCredentials;
use crate::config::WattBoxConfig;
use crate::error::{Result, WattBoxError};
use reqwest::header::{AUTHORIZATION, LOCATION, WWW_AUTHENTICATE};
use reqwest::{redirect, Client, ClientBuilder, Response, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// HTTP client for a WattBox PDU
///
/// Owns one transport (with cookie jar) and the negotiated
/// authentication state. Negotiation runs at most once, serialized
/// behind a mutex so concurrent callers cannot race competing probe
/// sequences or interleave login POSTs; once negotiated, fetches and
/// commands share the transport freely. Dropping the client releases
/// the transport it created.
pub struct WattBoxHttpClient {
    /// HTTP client instance
    client: Client,

    /// Base URL of the device
    base_url: Url,

    /// Authentication credentials
    credentials: WattBoxCredentials,

    /// Negotiated authentication state
    auth: Mutex<AuthState>,
}

impl WattBoxHttpClient {
    /// Create a new HTTP client
    pub fn new(config: WattBoxConfig, credentials: WattBoxCredentials) -> Result<Self> {
        config.validate()?;
        credentials.validate()?;

        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(format!("wattbox-client/{}", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .redirect(redirect::Policy::none());

        if !config.verify_ssl {
            warn!("SSL verification disabled - this is insecure for production use");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| WattBoxError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url,
            credentials,
            auth: Mutex::new(AuthState::Unresolved),
        })
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The authentication scheme negotiation settled on, if any yet
    pub async fn auth_scheme(&self) -> Option<AuthScheme> {
        self.auth.lock().await.scheme()
    }

    /// Drop the negotiated authentication state.
    ///
    /// The next operation re-runs negotiation from scratch. Use after a
    /// credential change or a firmware update.
    pub async fn invalidate_auth(&self) {
        debug!("Dropping negotiated authentication state");
        *self.auth.lock().await = AuthState::Unresolved;
    }

    /// Fetch the status page once and derive outlets and metrics from
    /// the same HTML.
    ///
    /// When the page omits aggregate totals, they are filled in as the
    /// sum of the per-outlet readings that are present.
    pub async fn fetch_status(&self) -> Result<StatusSnapshot> {
        debug!("Fetching status page");
        let response = self.authorized_get(STATUS_PATH, None).await?;
        if !response.status().is_success() {
            return Err(WattBoxError::http_status(response.status(), "status page"));
        }
        let html = response.text().await?;

        let mut snapshot = StatusSnapshot {
            outlets: status_page::parse_outlets(&html),
            metrics: status_page::parse_metrics(&html),
        };
        snapshot.fill_derived_totals();
        debug!("Status page parsed: {} outlets", snapshot.outlets.len());
        Ok(snapshot)
    }

    /// Fetch the outlet list, sorted ascending by outlet number
    pub async fn fetch_outlets(&self) -> Result<Vec<OutletInfo>> {
        Ok(self.fetch_status().await?.outlets)
    }

    /// Fetch aggregate device metrics
    pub async fn fetch_metrics(&self) -> Result<DeviceMetrics> {
        Ok(self.fetch_status().await?.metrics)
    }

    /// Switch an outlet on
    pub async fn turn_on(&self, outlet: u32) -> Result<()> {
        self.outlet_command(OUTLET_ON_PATH, outlet, "turn-on").await
    }

    /// Switch an outlet off
    pub async fn turn_off(&self, outlet: u32) -> Result<()> {
        self.outlet_command(OUTLET_OFF_PATH, outlet, "turn-off").await
    }

    /// Power-cycle an outlet.
    ///
    /// Works for reset-only outlets as well; the device handles the
    /// off/on timing itself.
    pub async fn reset(&self, outlet: u32) -> Result<()> {
        self.outlet_command(OUTLET_RESET_PATH, outlet, "reset").await
    }

    /// Issue one outlet command GET. Success is 200 or 302; outlet
    /// state is not re-fetched here - callers decide whether to confirm.
    async fn outlet_command(&self, path: &str, outlet: u32, action: &str) -> Result<()> {
        if outlet == 0 {
            return Err(WattBoxError::invalid_input("Outlet numbers are 1-based"));
        }
        debug!("Sending {action} command to outlet {outlet}");
        let response = self.authorized_get(path, Some(outlet)).await?;
        match response.status() {
            StatusCode::OK | StatusCode::FOUND => Ok(()),
            status => Err(WattBoxError::http_status(
                status,
                format!("{action} command for outlet {outlet}"),
            )),
        }
    }

    /// Ensure an authentication scheme has been negotiated.
    ///
    /// A transport failure during negotiation leaves the state
    /// unresolved so a later call can retry; a definitive rejection is
    /// remembered and surfaced on every call until
    /// [`invalidate_auth`](Self::invalidate_auth).
    async fn ensure_authenticated(&self) -> Result<()> {
        let mut state = self.auth.lock().await;
        match &*state {
            AuthState::Unresolved => match self.negotiate().await {
                Ok(negotiated) => {
                    if let Some(scheme) = negotiated.scheme() {
                        info!("Authentication negotiated: {scheme}");
                    }
                    *state = negotiated;
                    Ok(())
                }
                Err(e) => {
                    if e.is_auth_error() {
                        *state = AuthState::Failed(e.to_string());
                    }
                    Err(e)
                }
            },
            AuthState::Failed(reason) => Err(WattBoxError::authentication(reason.clone())),
            _ => Ok(()),
        }
    }

    /// Probe-and-commit negotiation across the three known schemes
    async fn negotiate(&self) -> Result<AuthState> {
        debug!("Negotiating authentication scheme with {}", self.base_url);
        let url = self.endpoint_url(STATUS_PATH, None)?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .send()
            .await
            .map_err(map_send_error)?;
        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::NOT_MODIFIED {
            debug!("Basic credentials accepted");
            return Ok(AuthState::Basic);
        }

        if status.is_redirection() && location_is_login(&response) {
            debug!("Status page redirects to login form");
            self.form_login(None).await?;
            return Ok(AuthState::Session);
        }

        if status == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .and_then(DigestChallenge::parse);
            let Some(challenge) = challenge else {
                return Err(WattBoxError::authentication(
                    "Device rejected credentials (401) without offering a usable scheme",
                ));
            };
            return self.probe_digest(challenge).await;
        }

        // Unknown firmware variant: commit to basic optimistically and
        // let the first real operation surface the failure.
        warn!("Unexpected status {status} during auth negotiation; assuming basic auth");
        Ok(AuthState::Basic)
    }

    /// Re-probe the status page with a computed Digest header
    async fn probe_digest(&self, challenge: DigestChallenge) -> Result<AuthState> {
        debug!("Probing digest authentication");
        let mut digest = DigestAuth::new(challenge);
        let url = self.endpoint_url(STATUS_PATH, None)?;
        let header = digest.authorization(&self.credentials, "GET", &request_uri(&url));
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, header)
            .send()
            .await
            .map_err(map_send_error)?;
        let status = response.status();

        if status == StatusCode::OK || status == StatusCode::NOT_MODIFIED {
            debug!("Digest credentials accepted");
            return Ok(AuthState::Digest(digest));
        }

        // Some firmwares still want the login form after digest.
        if status.is_redirection() && location_is_login(&response) {
            self.form_login(Some(&mut digest)).await?;
            return Ok(AuthState::Session);
        }

        Err(WattBoxError::authentication(format!(
            "Digest probe rejected with HTTP {status}"
        )))
    }

    /// Cookie/form login: seed cookies with a GET, POST the credentials,
    /// then re-verify the status page is actually reachable.
    ///
    /// When reached from the digest probe, every step carries a Digest
    /// header on top of the cookie flow.
    async fn form_login(&self, mut digest: Option<&mut DigestAuth>) -> Result<()> {
        let login_url = self.endpoint_url(LOGIN_PATH, None)?;

        let mut request = self.client.get(login_url.clone());
        if let Some(d) = digest.as_deref_mut() {
            let header = d.authorization(&self.credentials, "GET", &request_uri(&login_url));
            request = request.header(AUTHORIZATION, header);
        }
        let _ = request.send().await.map_err(map_send_error)?;

        let mut request = self.client.post(login_url.clone()).form(&[
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ]);
        if let Some(d) = digest.as_deref_mut() {
            let header = d.authorization(&self.credentials, "POST", &request_uri(&login_url));
            request = request.header(AUTHORIZATION, header);
        }
        let response = request.send().await.map_err(map_send_error)?;
        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::FOUND {
            return Err(WattBoxError::authentication(format!(
                "Login failed: HTTP {status}"
            )));
        }

        let status_url = self.endpoint_url(STATUS_PATH, None)?;
        let mut request = self.client.get(status_url.clone());
        if let Some(d) = digest.as_deref_mut() {
            let header = d.authorization(&self.credentials, "GET", &request_uri(&status_url));
            request = request.header(AUTHORIZATION, header);
        }
        let response = request.send().await.map_err(map_send_error)?;
        if response.status() != StatusCode::OK {
            return Err(WattBoxError::authentication(format!(
                "Login did not grant access: HTTP {}",
                response.status()
            )));
        }

        info!("Form login established a device session");
        Ok(())
    }

    /// GET an endpoint with the negotiated scheme applied, retrying
    /// once when a digest nonce has gone stale.
    async fn authorized_get(&self, path: &str, outlet: Option<u32>) -> Result<Response> {
        self.ensure_authenticated().await?;
        let url = self.endpoint_url(path, outlet)?;
        let response = self.send_with_auth(&url).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let challenge = response
                .headers()
                .get(WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok())
                .and_then(DigestChallenge::parse);
            if let Some(challenge) = challenge {
                let mut state = self.auth.lock().await;
                if let AuthState::Digest(digest) = &mut *state {
                    debug!("Refreshing stale digest challenge");
                    digest.refresh(challenge);
                    drop(state);
                    return self.send_with_auth(&url).await;
                }
            }
        }
        Ok(response)
    }

    async fn send_with_auth(&self, url: &Url) -> Result<Response> {
        let mut request = self.client.get(url.clone());
        {
            let mut state = self.auth.lock().await;
            match &mut *state {
                AuthState::Basic => {
                    request = request
                        .basic_auth(&self.credentials.username, Some(&self.credentials.password));
                }
                AuthState::Digest(digest) => {
                    let header = digest.authorization(&self.credentials, "GET", &request_uri(url));
                    request = request.header(AUTHORIZATION, header);
                }
                // Session relies on the cookie jar alone.
                AuthState::Session | AuthState::Unresolved | AuthState::Failed(_) => {}
            }
        }
        request.send().await.map_err(map_send_error)
    }

    /// Build the URL for a device endpoint
    fn endpoint_url(&self, path: &str, outlet: Option<u32>) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| WattBoxError::config(format!("Invalid URL path {path}: {e}")))?;
        if let Some(number) = outlet {
            url.query_pairs_mut().append_pair("o", &number.to_string());
        }
        Ok(url)
    }
}

/// The request-URI as it appears in a Digest Authorization header
fn request_uri(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}

fn location_is_login(response: &Response) -> bool {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|location| location.contains("login"))
}

/// Classify a transport-level send failure
fn map_send_error(e: reqwest::Error) -> WattBoxError {
    if e.is_timeout() {
        WattBoxError::timeout(format!("HTTP request timed out: {e}"))
    } else if e.is_connect() {
        WattBoxError::connection(format!("HTTP connection failed: {e}"))
    } else {
        WattBoxError::Http(e)
    }
}
