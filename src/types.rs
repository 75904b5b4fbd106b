//! Core value types for node addressing.
//!
//! These are small immutable values compared and hashed by value. Node
//! addresses are only ever produced from configuration seeds or from trusted
//! discovery-endpoint responses.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// URI scheme used to reach database nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Plain HTTP (the common in-cluster default).
    #[default]
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    /// The scheme as it appears in a URI.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(Error::Config(format!(
                "unknown scheme '{other}' (expected http or https)"
            ))),
        }
    }
}

/// Address of a single database coordinator node.
///
/// Equality is by value; the same host/port/scheme triple always compares
/// equal regardless of where it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeAddress {
    /// URI scheme.
    pub scheme: Scheme,
    /// Host name or IP literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl NodeAddress {
    /// Create a node address.
    pub fn new(scheme: Scheme, host: impl Into<String>, port: u16) -> Self {
        NodeAddress {
            scheme,
            host: host.into(),
            port,
        }
    }

    /// The URI for `path` on this node, e.g. `http://127.0.0.1:8000/localnodes`.
    pub fn uri_for(&self, path: &str) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, path)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_parse_roundtrip() {
        assert_eq!("http".parse::<Scheme>().unwrap(), Scheme::Http);
        assert_eq!("HTTPS".parse::<Scheme>().unwrap(), Scheme::Https);
        assert!("ftp".parse::<Scheme>().is_err());
    }

    #[test]
    fn test_uri_for() {
        let addr = NodeAddress::new(Scheme::Http, "127.0.0.2", 8000);
        assert_eq!(
            addr.uri_for("/localnodes"),
            "http://127.0.0.2:8000/localnodes"
        );
        assert_eq!(addr.to_string(), "http://127.0.0.2:8000");
    }

    #[test]
    fn test_equality_by_value() {
        let a = NodeAddress::new(Scheme::Http, "n1", 8000);
        let b = NodeAddress::new(Scheme::Http, "n1", 8000);
        let c = NodeAddress::new(Scheme::Https, "n1", 8000);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
