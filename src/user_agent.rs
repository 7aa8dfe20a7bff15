//! User-Agent string shared by catalog and transfer HTTP clients.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/streamdl";

/// Default User-Agent for all outgoing requests.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("streamdl/{version} (+{PROJECT_UA_URL})")
}
