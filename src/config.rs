// Node configuration

use std::time::Duration;

/// Address the server listens on
pub const BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 10000;
/// Largest frame accepted or sent (1 MiB)
pub const MAX_FRAME_LEN: usize = 1 << 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings shared by the server and the client
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Host clients connect to
    pub host: String,
    pub port: u16,
    pub max_frame_len: usize,
    /// Limit on every connect, frame read and frame write
    pub io_timeout: Duration,
}

impl NodeConfig {
    /// Address the server binds
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", BIND_HOST, self.port)
    }

    /// Address clients dial
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_frame_len: MAX_FRAME_LEN,
            io_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}
