//! Command line definition and how flags override file configuration

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use mongotunnel_common::config::{
    LogFormat, LoggingConfig, ProxyConfig, TesterConfig, TlsConfig,
};
use mongotunnel_common::logging::level_for_verbosity;
use mongotunnel_tester::{Operation, OperationSet};

#[derive(Parser, Debug)]
#[command(name = "mongotunnel")]
#[command(author, version, about = "mongotunnel - MongoDB wire protocol proxy and smoke test", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (TOML or JSON); missing file means defaults
    #[arg(
        short,
        long,
        global = true,
        default_value = "mongotunnel.toml",
        env = "MONGOTUNNEL_CONFIG"
    )]
    pub config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, global = true, value_enum, env = "MONGOTUNNEL_LOG_FORMAT")]
    pub log_format: Option<LogFormatArg>,

    /// Disable ANSI colours in text logs
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the logging/mirroring proxy
    Proxy(ProxyArgs),

    /// Run the insert/query/drop smoke test
    Tester(TesterArgs),

    /// Show version information
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ProxyArgs {
    /// Address to accept driver connections on
    #[arg(short, long, env = "MONGOTUNNEL_LISTEN")]
    pub listen: Option<String>,

    /// MongoDB server to forward to
    #[arg(short, long, env = "MONGOTUNNEL_UPSTREAM")]
    pub upstream: Option<String>,

    /// Mirror insert commands into this collection
    #[arg(long, env = "MONGOTUNNEL_MIRROR_COLLECTION")]
    pub mirror_collection: Option<String>,

    /// Trace frames as hex instead of text
    #[arg(long)]
    pub hex: bool,

    /// Answer isMaster/hello handshakes without contacting the upstream
    #[arg(long)]
    pub answer_handshake: bool,

    /// Leave Nagle's algorithm enabled
    #[arg(long)]
    pub no_nodelay: bool,

    /// Connect to the upstream over TLS, verifying this server name
    #[arg(long, requires = "tls_ca_file", env = "MONGOTUNNEL_TLS_SERVER_NAME")]
    pub tls_server_name: Option<String>,

    /// PEM file with the root certificates trusted for the upstream
    #[arg(long, requires = "tls_server_name", env = "MONGOTUNNEL_TLS_CA_FILE")]
    pub tls_ca_file: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct TesterArgs {
    /// Operations to run: insert, query, drop (any order, case-insensitive)
    #[arg(value_name = "OPERATION")]
    pub operations: Vec<Operation>,

    /// host:port of the MongoDB endpoint
    #[arg(short, long, env = "MONGOTUNNEL_ADDRESS")]
    pub address: Option<String>,

    /// Database name
    #[arg(short, long, env = "MONGOTUNNEL_DATABASE")]
    pub database: Option<String>,

    /// Collection name
    #[arg(long, env = "MONGOTUNNEL_COLLECTION")]
    pub collection: Option<String>,

    /// Maximum number of records returned by the query step
    #[arg(long, env = "MONGOTUNNEL_QUERY_LIMIT")]
    pub limit: Option<i64>,
}

impl Cli {
    /// Apply `-v`, `--log-format` and `--no-color` onto the file settings
    pub fn apply_logging(&self, config: &mut LoggingConfig) {
        config.level = level_for_verbosity(&config.level, self.verbose);
        if let Some(format) = self.log_format {
            config.format = format.into();
        }
        if self.no_color {
            config.color = false;
        }
    }
}

impl ProxyArgs {
    pub fn apply(&self, config: &mut ProxyConfig) {
        if let Some(listen) = &self.listen {
            config.listen.clone_from(listen);
        }
        if let Some(upstream) = &self.upstream {
            config.upstream.clone_from(upstream);
        }
        if self.mirror_collection.is_some() {
            config.mirror_collection.clone_from(&self.mirror_collection);
        }
        if self.hex {
            config.hex = true;
        }
        if self.answer_handshake {
            config.answer_handshake = true;
        }
        if self.no_nodelay {
            config.nodelay = false;
        }
        if let (Some(server_name), Some(ca_file)) = (&self.tls_server_name, &self.tls_ca_file) {
            config.tls = Some(TlsConfig {
                server_name: server_name.clone(),
                ca_file: ca_file.clone(),
            });
        }
    }
}

impl TesterArgs {
    pub fn apply(&self, config: &mut TesterConfig) {
        if let Some(address) = &self.address {
            config.address.clone_from(address);
        }
        if let Some(database) = &self.database {
            config.database.clone_from(database);
        }
        if let Some(collection) = &self.collection {
            config.collection.clone_from(collection);
        }
        if let Some(limit) = self.limit {
            config.query_limit = limit;
        }
    }

    pub fn operations(&self) -> OperationSet {
        self.operations.iter().copied().collect()
    }
}
