//! Page location helpers: the `locationHost` sent in the handshake and the
//! origins used to scope messages.

use crate::{Error, Result};
use log::error;
use url::Url;

/// Location of the page hosting the bridge.
///
/// `host` is empty when the page cannot see its own host (e.g. it is itself
/// embedded); `ancestor_origins` lists the embedding chain, nearest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLocation {
    pub host: String,
    pub ancestor_origins: Vec<String>,
}

impl PageLocation {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ancestor_origins: Vec::new(),
        }
    }

    /// Location of a page embedded by the given origins
    pub fn embedded<I, S>(ancestors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host: String::new(),
            ancestor_origins: ancestors.into_iter().map(Into::into).collect(),
        }
    }
}

/// Host reported to the editor as `locationHost`.
///
/// Falls back to the first ancestor origin when the page host is empty, and
/// to `""` when that origin is missing or unparsable.
pub fn resolve_location_host(location: &PageLocation) -> String {
    if !location.host.is_empty() {
        return location.host.clone();
    }
    let ancestor = location.ancestor_origins.first().map(String::as_str).unwrap_or("");
    match host_from_url(ancestor) {
        Ok(host) => host,
        Err(e) => {
            error!("{}", e);
            String::new()
        }
    }
}

/// `host[:port]` of a URL; the port is omitted when it is the scheme default.
pub fn host_from_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| Error::HostParse(format!("{} ({:?})", e, raw)))?;
    let host = url.host_str().unwrap_or_default();
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Serialized origin (`scheme://host[:port]`) of a URL.
///
/// Opaque origins (`data:`, `about:blank`, ...) cannot be targeted and are
/// reported as errors.
pub fn origin_of(raw: &str) -> Result<String> {
    let url = Url::parse(raw).map_err(|e| Error::HostParse(format!("{} ({:?})", e, raw)))?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(Error::HostParse(format!("{:?} has an opaque origin", raw)));
    }
    Ok(origin.ascii_serialization())
}

/// Canonical form of an origin string for comparisons.
pub(crate) fn normalize_origin(raw: &str) -> String {
    origin_of(raw).unwrap_or_else(|_| raw.trim_end_matches('/').to_string())
}
