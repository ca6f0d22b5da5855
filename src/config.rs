use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub auth_token: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:3000".parse().unwrap(),
            auth_token: None,
        }
    }
}

impl NodeConfig {
    /// Default config with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(dir) = std::env::var("SNAPVAULT_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("SNAPVAULT_BIND") {
            match addr.parse() {
                Ok(parsed) => cfg.bind_addr = parsed,
                Err(e) => tracing::warn!("Ignoring invalid SNAPVAULT_BIND {:?}: {}", addr, e),
            }
        }
        if let Ok(token) = std::env::var("SNAPVAULT_AUTH_TOKEN") {
            if !token.is_empty() {
                cfg.auth_token = Some(token);
            }
        }
        cfg
    }
}
