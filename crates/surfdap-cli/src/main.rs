//! SurfDAP CLI
//!
//! Browse an LDAP directory tree from its base DN.
//!
//! # Commands
//!
//! - *(none)*: connect, bind, verify the base DN and print it
//! - `search`: search relative to the base DN and print the entries
//! - `children`: list the immediate children of the base DN
//! - `tree`: walk the tree below the base DN, one indented RDN per entry
//!
//! Settings are layered: built-in defaults, then `--config FILE`, then `SURFDAP_*`
//! environment variables, then command line flags.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use surfdap::{Directory, DirectoryConfig};
use tracing::{debug, error, warn};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// SurfDAP - browse an LDAP directory tree
#[derive(Debug, Parser)]
#[command(name = "surfdap")]
#[command(version)]
#[command(about = "Browse an LDAP directory tree from its base DN")]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Args)]
struct ConnectionArgs {
    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory host
    #[arg(short = 'H', long, global = true)]
    host: Option<String>,

    /// Directory port
    #[arg(short = 'P', long, global = true)]
    port: Option<u16>,

    /// Base DN the tree is rooted at
    #[arg(short = 'B', long = "base", global = true, value_name = "DN")]
    base_dn: Option<String>,

    /// Bind DN; anonymous when empty
    #[arg(short = 'U', long = "bind-dn", global = true, value_name = "DN")]
    bind_dn: Option<String>,

    /// Bind password
    #[arg(long, global = true)]
    password: Option<String>,

    /// Upgrade the connection with StartTLS before binding
    #[arg(long, global = true)]
    starttls: bool,

    /// Skip server certificate validation during StartTLS
    #[arg(long, global = true)]
    insecure_tls: bool,
}

impl ConnectionArgs {
    fn load(&self) -> surfdap::Result<DirectoryConfig> {
        self.load_with(|key| std::env::var(key).ok())
    }

    fn load_with<F>(&self, lookup: F) -> surfdap::Result<DirectoryConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = match &self.config {
            Some(path) => {
                debug!(path = %path.display(), "loading configuration file");
                DirectoryConfig::from_file(path)?
            }
            None => DirectoryConfig::default(),
        };
        let mut config = config.with_overrides_from(lookup)?;

        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(base_dn) = &self.base_dn {
            config.base_dn.clone_from(base_dn);
        }
        if let Some(bind_dn) = &self.bind_dn {
            config.bind_dn.clone_from(bind_dn);
        }
        if let Some(password) = &self.password {
            let bind_dn = config.bind_dn.clone();
            config = config.with_bind(bind_dn, password.as_str());
        }
        if self.starttls {
            config.use_starttls = true;
        }
        if self.insecure_tls {
            config.allow_insecure_tls = true;
        }

        config.validated()
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search relative to the base DN
    Search(commands::SearchArgs),
    /// List the immediate children of the base DN
    Children(commands::ChildrenArgs),
    /// Print the tree below the base DN
    Tree(commands::TreeArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(directory_error) = err.downcast_ref::<surfdap::Error>() {
                if directory_error.should_log() {
                    error!(code = directory_error.error_code(), "{directory_error}");
                }
            }
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = cli.connection.load()?;
    if let Some(Command::Search(args)) = &cli.command {
        config.limits = args.limits(config.limits);
    }

    let root = Directory::new(config).bind_root().await?;

    let outcome = match cli.command {
        None => {
            println!("{}", root.dn());
            Ok(())
        }
        Some(Command::Search(args)) => commands::search(&root, args).await,
        Some(Command::Children(args)) => commands::children(&root, args).await,
        Some(Command::Tree(args)) => commands::tree(&root, args).await,
    };

    if let Err(err) = root.connection().unbind().await {
        warn!(error = %err, "unbind failed");
    }
    outcome
}
