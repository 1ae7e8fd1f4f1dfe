use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Port used when a server entry omits one.
pub const DEFAULT_PORT: u16 = 4222;

/// One candidate middleware endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Server {
    pub scheme: Option<String>,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerParseError {
    #[error("empty server address")]
    Empty,

    #[error("missing host in server address '{0}'")]
    MissingHost(String),

    #[error("invalid port in server address '{0}'")]
    InvalidPort(String),
}

impl Server {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: None,
            host: host.into(),
            port,
        }
    }

    /// `(host, port)` pair suitable for `TcpStream::connect`.
    pub fn target(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}

impl FromStr for Server {
    type Err = ServerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ServerParseError::Empty);
        }

        let (scheme, rest) = match s.split_once("://") {
            Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
            None => (None, s),
        };

        // Bracketed IPv6 hosts keep their colons out of the port split.
        let (host, port) = if let Some(inner) = rest.strip_prefix('[') {
            let (host, tail) = inner
                .split_once(']')
                .ok_or_else(|| ServerParseError::MissingHost(s.to_string()))?;
            let port = match tail.strip_prefix(':') {
                Some(p) => p
                    .parse()
                    .map_err(|_| ServerParseError::InvalidPort(s.to_string()))?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(ServerParseError::InvalidPort(s.to_string())),
            };
            (host, port)
        } else {
            match rest.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port
                        .parse()
                        .map_err(|_| ServerParseError::InvalidPort(s.to_string()))?;
                    (host, port)
                }
                None => (rest, DEFAULT_PORT),
            }
        };

        if host.is_empty() {
            return Err(ServerParseError::MissingHost(s.to_string()));
        }

        Ok(Server {
            scheme,
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let s: Server = "broker1.example.net:4223".parse().unwrap();
        assert_eq!(s, Server::new("broker1.example.net", 4223));
        assert_eq!(s.to_string(), "broker1.example.net:4223");
    }

    #[test]
    fn missing_port_uses_default() {
        let s: Server = "broker1".parse().unwrap();
        assert_eq!(s.port, DEFAULT_PORT);
    }

    #[test]
    fn keeps_scheme() {
        let s: Server = "NATS://10.0.0.5:4222".parse().unwrap();
        assert_eq!(s.scheme.as_deref(), Some("nats"));
        assert_eq!(s.host, "10.0.0.5");
        assert_eq!(s.to_string(), "nats://10.0.0.5:4222");
    }

    #[test]
    fn bracketed_ipv6() {
        let s: Server = "[::1]:5000".parse().unwrap();
        assert_eq!(s.host, "::1");
        assert_eq!(s.port, 5000);
        assert_eq!(s.to_string(), "[::1]:5000");

        let s: Server = "[fe80::1]".parse().unwrap();
        assert_eq!(s.port, DEFAULT_PORT);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<Server>(), Err(ServerParseError::Empty));
        assert!(matches!(
            ":4222".parse::<Server>(),
            Err(ServerParseError::MissingHost(_))
        ));
        assert!(matches!(
            "host:notaport".parse::<Server>(),
            Err(ServerParseError::InvalidPort(_))
        ));
    }
}
