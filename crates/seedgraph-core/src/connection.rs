use std::fmt;

use serde::{Deserialize, Serialize};

/// Static connection parameters for the relational sink.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            dbname: "postgres".to_string(),
            user: "user".to_string(),
            password: "password".to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl ConnectionConfig {
    /// Connection metadata safe to log or persist.
    pub fn redacted(&self) -> RedactedConnection {
        RedactedConnection {
            user: self.user.clone(),
            host: self.host.clone(),
            port: self.port,
            database: self.dbname.clone(),
            redacted: format!(
                "postgres://{}:***@{}:{}/{}",
                self.user, self.host, self.port, self.dbname
            ),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Connection metadata with secrets redacted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub user: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub redacted: String,
}

impl fmt::Display for RedactedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}
