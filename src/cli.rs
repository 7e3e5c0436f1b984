//! Command-line arguments
//!
//! Flags override values from the config file and environment.

use clap::Parser;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "staticd", version, about = "Serve a directory over HTTP")]
pub struct Cli {
    /// Config file path without extension (config.toml, config.json, ...)
    #[arg(short, long, default_value = "config", env = "STATICD_CONFIG")]
    pub config: String,

    /// Address to bind, all interfaces by default
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Document root
    #[arg(short, long)]
    pub root: Option<String>,

    /// Tokio worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Answer 404 for directories without an index file
    #[arg(long)]
    pub no_listing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["staticd"]);
        assert_eq!(cli.config, "config");
        assert!(cli.port.is_none());
        assert!(!cli.no_listing);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "staticd", "--port", "9000", "--root", "/srv/www", "--no-listing", "-w", "2",
        ]);
        assert_eq!(cli.port, Some(9000));
        assert_eq!(cli.root.as_deref(), Some("/srv/www"));
        assert_eq!(cli.workers, Some(2));
        assert!(cli.no_listing);
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["staticd", "--port", "70000"]).is_err());
    }
}
