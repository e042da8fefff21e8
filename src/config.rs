//! Connection configuration and connection string parsing
//!
//! Supports Oracle EZConnect format:
//! - `host:port/service_name`
//! - `host/service_name`
//! - `host:port:sid`
//!
//! Besides the session address and credentials, a [`Config`] carries the
//! defaults every cursor of the connection starts with.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_ARRAYSIZE, DEFAULT_STMTCACHESIZE};
use crate::error::{Error, Result};

/// Default Oracle port
pub const DEFAULT_PORT: u16 = 1521;

/// Service identification method
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceMethod {
    /// Connect using service name
    ServiceName(String),
    /// Connect using SID (legacy)
    Sid(String),
}

impl ServiceMethod {
    /// Get the service name if this is a ServiceName variant
    pub fn service_name(&self) -> Option<&str> {
        match self {
            ServiceMethod::ServiceName(s) => Some(s),
            ServiceMethod::Sid(_) => None,
        }
    }

    /// Get the SID if this is a Sid variant
    pub fn sid(&self) -> Option<&str> {
        match self {
            ServiceMethod::ServiceName(_) => None,
            ServiceMethod::Sid(s) => Some(s),
        }
    }
}

/// Connection configuration.
///
/// # Examples
///
/// ```rust
/// use oracle_cursor::Config;
/// use std::time::Duration;
///
/// let config = Config::new("localhost", 1521, "FREEPDB1", "user", "password")
///     .arraysize(500)
///     .stmtcachesize(50)
///     .batch_timeout(Duration::from_secs(30));
///
/// assert_eq!(config.to_string(), "localhost:1521/FREEPDB1");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to connect to
    pub host: String,
    /// Port to connect to
    pub port: u16,
    /// Service name or SID
    pub service: ServiceMethod,
    /// Username for authentication
    pub username: String,
    /// Password for authentication
    password: String,
    /// Statement cache size (0 = disabled)
    pub stmtcachesize: usize,
    /// Rows fetched per round trip by new cursors
    pub arraysize: usize,
    /// Default deadline for batch executions
    pub batch_timeout: Option<Duration>,
}

impl Config {
    /// Create a new configuration with service name
    pub fn new(
        host: impl Into<String>,
        port: u16,
        service_name: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            service: ServiceMethod::ServiceName(service_name.into()),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Create a new configuration with SID
    pub fn with_sid(
        host: impl Into<String>,
        port: u16,
        sid: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            service: ServiceMethod::Sid(sid.into()),
            username: username.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Set statement cache size, 0 disables caching
    pub fn stmtcachesize(mut self, size: usize) -> Self {
        self.stmtcachesize = size;
        self
    }

    /// Set the number of rows fetched per round trip
    pub fn arraysize(mut self, size: usize) -> Self {
        self.arraysize = size;
        self
    }

    /// Set the default deadline for batch executions
    pub fn batch_timeout(mut self, timeout: Duration) -> Self {
        self.batch_timeout = Some(timeout);
        self
    }

    /// Get the password (for authentication)
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Set the password
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    /// Set the username
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            service: ServiceMethod::ServiceName("FREEPDB1".to_string()),
            username: String::new(),
            password: String::new(),
            stmtcachesize: DEFAULT_STMTCACHESIZE,
            arraysize: DEFAULT_ARRAYSIZE,
            batch_timeout: None,
        }
    }
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::InvalidConnectionString(reason.into())
}

fn parse_port(port: &str) -> Result<u16> {
    port.parse()
        .map_err(|_| invalid(format!("invalid port number: {}", port)))
}

/// Split `host[:port]` into its parts
fn split_host(address: &str) -> Result<(String, Option<u16>)> {
    let (host, port) = match address.split_once(':') {
        Some((host, port)) => (host, Some(parse_port(port)?)),
        None => (address, None),
    };
    if host.is_empty() {
        return Err(invalid("missing host"));
    }
    Ok((host.to_string(), port))
}

/// Parse an EZConnect-style connection string
///
/// Leading `//` is accepted and ignored. TNS descriptors are rejected.
impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_start_matches('/');
        if s.is_empty() {
            return Err(invalid("empty connection string"));
        }
        if s.starts_with('(') {
            return Err(invalid(
                "TNS descriptors are not supported, use host:port/service",
            ));
        }

        let (address, service) = match s.split_once('/') {
            Some((_, "")) => return Err(invalid("missing service name after /")),
            Some((address, name)) => {
                let service = ServiceMethod::ServiceName(name.to_string());
                (address, Some(service))
            }
            // host:port:sid
            None => match s.rsplitn(2, ':').collect::<Vec<_>>().as_slice() {
                [sid, address] if address.contains(':') => {
                    (*address, Some(ServiceMethod::Sid(sid.to_string())))
                }
                _ => (s, None),
            },
        };
        if address.matches(':').count() > 1 {
            return Err(invalid("too many colons in connection string"));
        }

        let (host, port) = split_host(address)?;
        let mut config = Config {
            host,
            ..Config::default()
        };
        if let Some(port) = port {
            config.port = port;
        }
        if let Some(service) = service {
            config.service = service;
        }
        Ok(config)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service {
            ServiceMethod::ServiceName(name) => write!(f, "{}:{}/{}", self.host, self.port, name),
            ServiceMethod::Sid(sid) => write!(f, "{}:{}:{}", self.host, self.port, sid),
        }
    }
}
