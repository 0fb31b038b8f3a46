use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// One export to register at startup: `name` or `name=path/to/snapshot.png`.
/// When a path is given the file is re-read and published periodically.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSpec {
    pub name: String,
    pub source: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ExportSpecParseError(String);

impl fmt::Display for ExportSpecParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid export '{}', expected NAME or NAME=PATH", self.0)
    }
}

impl std::error::Error for ExportSpecParseError {}

impl FromStr for ExportSpec {
    type Err = ExportSpecParseError;
    fn from_str(spec: &str) -> Result<ExportSpec, Self::Err> {
        let (name, source) = match spec.split_once('=') {
            Some((name, path)) if !path.trim().is_empty() => {
                (name.trim(), Some(PathBuf::from(path.trim())))
            }
            Some(_) => return Err(ExportSpecParseError(spec.to_string())),
            None => (spec.trim(), None),
        };

        if name.is_empty() {
            return Err(ExportSpecParseError(spec.to_string()));
        }

        Ok(ExportSpec {
            name: name.to_string(),
            source,
        })
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Reverse proxies, besides loopback peers, whose X-Forwarded-For and
    /// X-Real-IP headers identify the client for rate limiting. Headers from
    /// any other peer are ignored.
    #[arg(long, env, value_delimiter = ',', use_value_delimiter = true)]
    pub trusted_proxies: Vec<IpAddr>,

    /// Exports to register at startup, as NAME or NAME=PATH. A PATH points at an
    /// encoded image that an external renderer keeps rewriting.
    #[arg(
        short,
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "status"
    )]
    pub exports: Vec<ExportSpec>,

    /// Minimum period in milliseconds between snapshots of an export. Also the
    /// floor for the refresh period requested by landing page clients.
    #[arg(long, env, default_value_t = 500)]
    pub min_update_period_ms: u64,

    /// Period in milliseconds at which file-backed exports are re-read.
    #[arg(long, env, default_value_t = 1000)]
    pub producer_period_ms: u64,

    /// Upper bound in seconds a long-poll request waits for a newer snapshot
    /// before the current one is returned.
    #[arg(long, env, default_value_t = 30)]
    pub long_poll_timeout_secs: u64,

    /// Requests a single client may make to export endpoints per rate limit window.
    #[arg(long, env, default_value_t = 50)]
    pub max_requests_per_window: u32,

    /// Length of the rate limit window in milliseconds.
    #[arg(long, env, default_value_t = 1000)]
    pub rate_limit_window_ms: u64,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 8080)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("127.0.0.1")
    }

    /// Whether forwarding headers sent by `peer` can be trusted.
    pub fn is_trusted_proxy(&self, peer: IpAddr) -> bool {
        let peer = peer.to_canonical();
        peer.is_loopback() || self.trusted_proxies.contains(&peer)
    }

    pub fn min_update_period(&self) -> Duration {
        Duration::from_millis(self.min_update_period_ms)
    }

    pub fn producer_period(&self) -> Duration {
        Duration::from_millis(self.producer_period_ms)
    }

    pub fn long_poll_timeout(&self) -> Duration {
        Duration::from_secs(self.long_poll_timeout_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
