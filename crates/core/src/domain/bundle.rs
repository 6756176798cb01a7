use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};

/// Bundle name used when the location path carries no name of its own.
pub const DEFAULT_BUNDLE_NAME: &str = "index";

const BUNDLE_SUFFIX: &str = ".bundle";

/// Location of the code package a launched instance should run.
///
/// Always has a host, so a debug server descriptor can be derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BundleLocation {
    url: Url,
}

impl BundleLocation {
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| CoreError::InvalidBundleUrl {
            url: input.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_url(url)
    }

    pub fn from_url(url: Url) -> Result<Self> {
        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self { url }),
            _ => Err(CoreError::MissingHost(url.to_string())),
        }
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    /// Explicit port, falling back to the scheme's well-known port.
    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// `host:port` the runtime should contact for live updates.
    ///
    /// Schemes without a known default port and no explicit port yield the
    /// bare host.
    pub fn debug_server_host(&self) -> String {
        match self.port() {
            Some(port) => format!("{}:{}", self.host(), port),
            None => self.host().to_string(),
        }
    }

    /// Name of the bundle relative to the debug server.
    ///
    /// Drops a single leading `/` and the `.bundle` suffix, so
    /// `/main.bundle` becomes `main`. An empty result maps to
    /// [`DEFAULT_BUNDLE_NAME`]. Percent-escapes in the path are decoded.
    pub fn bundle_name(&self) -> String {
        let decoded = percent_decode_str(self.url.path()).decode_utf8_lossy();
        let path = decoded.as_ref();
        let path = path.strip_prefix('/').unwrap_or(path);
        let name = path.strip_suffix(BUNDLE_SUFFIX).unwrap_or(path);
        if name.is_empty() {
            DEFAULT_BUNDLE_NAME.to_string()
        } else {
            name.to_string()
        }
    }
}

impl fmt::Display for BundleLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl FromStr for BundleLocation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BundleLocation {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<BundleLocation> for String {
    fn from(value: BundleLocation) -> Self {
        value.url.into()
    }
}
