use std::path::PathBuf;

use clap::Parser;

/// Cryptek: terminal client for the Cryptek encrypted chat server.
#[derive(Parser, Debug)]
#[command(name = "cryptek", version, about)]
pub struct Args {
    /// Wallet address to connect as.
    #[arg(short, long)]
    pub address: String,

    /// Server URL override (ws:// or wss://). Takes precedence over
    /// CRYPTEK_WS_URL and the config file.
    #[arg(short, long)]
    pub url: Option<String>,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level override (debug, info, warn, error) or a full filter
    /// directive such as `cryptek_realtime=trace`. Takes precedence over
    /// `RUST_LOG`.
    #[arg(long)]
    pub log_level: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_required() {
        assert!(Args::try_parse_from(["cryptek"]).is_err());
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "cryptek",
            "--address",
            "0xabc",
            "--url",
            "wss://chat.example.org",
            "--config",
            "/tmp/cryptek.toml",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.address, "0xabc");
        assert_eq!(args.url.as_deref(), Some("wss://chat.example.org"));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/cryptek.toml")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }
}
