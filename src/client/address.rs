use std::fmt;

use crate::error::Error;

/// Destination identity keying pooled connections.
///
/// Pure value type: two addresses with the same host, port, and security
/// flag are the same pool partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub host: String,
    pub port: u16,
    pub secure: bool,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16, secure: bool) -> Self {
        Self {
            host: host.into(),
            port,
            secure,
        }
    }

    /// Derive an address from a URL.
    ///
    /// Schemes `http`/`ws` map to insecure (default port 80), `https`/`wss`
    /// to secure (default port 443).
    pub fn from_url(input: &str) -> Result<Self, Error> {
        let url = url::Url::parse(input).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let secure = match url.scheme() {
            "http" | "ws" => false,
            "https" | "wss" => true,
            other => {
                return Err(Error::InvalidUrl(format!("unsupported scheme: {other}")));
            }
        };
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidUrl("missing host".to_string()))?;
        let port = url.port().unwrap_or(if secure { 443 } else { 80 });

        Ok(Self::new(host, port, secure))
    }

    /// Value for a `Host` header: the port is included only when it is not
    /// the scheme default.
    pub fn host_header(&self) -> String {
        let default_port = if self.secure { 443 } else { 80 };
        if self.port == default_port {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_url_defaults() {
        let addr = Address::from_url("http://example.com/path").unwrap();
        assert_eq!(addr, Address::new("example.com", 80, false));

        let addr = Address::from_url("wss://example.com/socket").unwrap();
        assert_eq!(addr, Address::new("example.com", 443, true));
    }

    #[test]
    fn from_url_explicit_port() {
        let addr = Address::from_url("http://localhost:8080").unwrap();
        assert_eq!(addr, Address::new("localhost", 8080, false));
    }

    #[test]
    fn from_url_rejects_unknown_scheme() {
        assert!(matches!(
            Address::from_url("ftp://example.com"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn host_header_omits_default_port() {
        assert_eq!(Address::new("example.com", 80, false).host_header(), "example.com");
        assert_eq!(
            Address::new("example.com", 8080, false).host_header(),
            "example.com:8080"
        );
    }
}
