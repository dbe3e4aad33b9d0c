use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

/// Command line for the dashboard server
#[derive(Debug, Clone, Parser)]
#[command(name = "paralympics-dashboard", version, about = "Paralympics data dashboard")]
pub struct Args {
    /// Directory holding paralympics.csv and paralympics.db
    #[arg(long, env = "PARALYMPICS_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long, env = "PARALYMPICS_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    #[arg(long, env = "PARALYMPICS_PORT", default_value_t = 5050)]
    pub port: u16,

    /// Verbose logging
    #[arg(long, env = "PARALYMPICS_DEBUG")]
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTag {
    pub name: String,
    pub content: String,
}

/// Process-wide settings, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub title: String,
    pub data_dir: PathBuf,
    pub csv_path: PathBuf,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub debug: bool,
    pub meta_tags: Vec<MetaTag>,
    pub stylesheets: Vec<String>,
}

pub const BOOTSTRAP_CSS: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";

impl AppConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            title: "Paralympics Dashboard".to_string(),
            data_dir: args.data_dir.clone(),
            csv_path: args.data_dir.join("paralympics.csv"),
            db_path: args.data_dir.join("paralympics.db"),
            addr: SocketAddr::new(args.host, args.port),
            debug: args.debug,
            meta_tags: vec![MetaTag {
                name: "viewport".to_string(),
                content: "width=device-width, initial-scale=1".to_string(),
            }],
            stylesheets: vec![BOOTSTRAP_CSS.to_string()],
        }
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "paralympics_dashboard=debug,tower_http=debug,info"
        } else {
            "info"
        }
    }
}
