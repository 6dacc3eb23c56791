//! WireMock-based WattBox mocking infrastructure
//!
//! Provides mock HTTP servers that simulate the device's generated
//! status pages and authentication behavior for testing without
//! requiring actual hardware.

use wiremock::http::HeaderMap;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

/// Mock WattBox device for testing
pub struct MockWattBoxServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockWattBoxServer {
    /// Create a new mock device with no endpoints mounted
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// Get the mock server's base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Serve a status page to every GET of `/main`, any credentials
    pub async fn mock_open_status_page(&self, html: &str) {
        Mock::given(method("GET"))
            .and(path("/main"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html.to_string()))
            .mount(&self.server)
            .await;
    }

    /// Serve an outlet command endpoint with a fixed status
    pub async fn mock_command(&self, command_path: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(command_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }
}

/// Matcher: the Authorization header contains the given fragment
pub struct AuthHeaderContains(pub &'static str);

impl wiremock::Match for AuthHeaderContains {
    fn matches(&self, request: &Request) -> bool {
        header_contains(&request.headers, "authorization", self.0)
    }
}

/// Matcher: the Cookie header contains the given fragment
pub struct CookieContains(pub &'static str);

impl wiremock::Match for CookieContains {
    fn matches(&self, request: &Request) -> bool {
        header_contains(&request.headers, "cookie", self.0)
    }
}

fn header_contains(headers: &HeaderMap, name: &str, fragment: &str) -> bool {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains(fragment))
}

/// One outlet card in the generated status-page layout
pub fn outlet_block(
    number: u32,
    name: &str,
    is_on: bool,
    reset_only: bool,
    stats: Option<(&str, &str)>,
) -> String {
    let mut attrs = String::new();
    if is_on {
        attrs.push_str(" checked");
    }
    if reset_only {
        attrs.push_str(" disabled");
    }
    let stats_html = match stats {
        Some((watts, amps)) => format!(
            r#"<div style="margin-top: 6px"><p>{watts}</p><p>{amps}</p></div>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<div class="grid-block">
             <div class="grid-index-label"><span>{number}</span></div>
             <ul class="grid-list"><li class="grid-head">{name}</li></ul>
             <input id="outlet{number}" type="checkbox"{attrs}/>
             {stats_html}
           </div>"#
    )
}

/// Assemble a full status page from outlet cards and optional
/// aggregate blocks
pub fn status_page(
    outlet_blocks: &[String],
    totals: Option<(&str, &str)>,
    voltage: Option<&str>,
) -> String {
    let totals_html = match totals {
        Some((watts, amps)) => format!(
            r#"<div class="grid-block"><div class="grid-text">
                 <ul class="primary-text"><li><table><tr>
                   <td>POWER<br/>CURRENT</td>
                   <td>{watts}<br/>{amps}</td>
                 </tr></table></li></ul>
               </div></div>"#
        ),
        None => String::new(),
    };
    let voltage_html = match voltage {
        Some(value) => format!(
            r#"<div class="grid-block" style="background: #7cb342"><span>{value}</span></div>"#
        ),
        None => String::new(),
    };
    format!(
        r#"<html><body>
             <div class="grid-grey">{}</div>
             {totals_html}
             {voltage_html}
           </body></html>"#,
        outlet_blocks.join("")
    )
}

/// The standard fixture: three outlets (one off, one reset-only),
/// page-reported totals and voltage
pub fn default_status_page() -> String {
    status_page(
        &[
            outlet_block(2, "Switch", false, false, Some(("0.0 W", "0.0 A"))),
            outlet_block(1, "Router", true, false, Some(("12.5 W", "0.11 A"))),
            outlet_block(3, "Modem", true, true, Some(("7.25 W", "0.06 A"))),
        ],
        Some(("250.4 W", "2.09 A")),
        Some("120.3 V"),
    )
}
