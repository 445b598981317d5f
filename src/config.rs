use clap::Parser;
use tracing::Level;

use crate::codec::DEFAULT_MAX_FRAME_SIZE;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6379;

#[derive(Parser, Debug, Clone)]
#[command(name = "respkv", version, about)]
pub struct Config {
    /// The address to bind to
    #[arg(long, env = "RESPKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// The port to listen on
    #[arg(short, long, env = "RESPKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Largest number of bytes a single request may occupy before the connection is dropped
    #[arg(long, env = "RESPKV_MAX_FRAME_SIZE", default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    pub max_frame_size: usize,

    /// Maximum level of log messages to emit
    #[arg(long, env = "RESPKV_LOG_LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags() {
        let config = Config::try_parse_from([
            "respkv",
            "--host",
            "0.0.0.0",
            "-p",
            "7000",
            "--max-frame-size",
            "1024",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7000);
        assert_eq!(config.max_frame_size, 1024);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.bind_address(), "0.0.0.0:7000");
    }

    #[test]
    fn rejects_invalid_port() {
        assert!(Config::try_parse_from(["respkv", "--port", "not-a-port"]).is_err());
    }
}
