use album_convert::backend::remote::RemoteSettings;
use album_convert::backend::{LocalBackend, RecordStore, RemoteBackend};
use album_convert::clock::SystemClock;
use album_convert::config::{self, ConfigError, ConvertConfig};
use album_convert::convert::{
    self, CancelToken, ConvertError, ConvertOptions, ConvertSummary, DeletePolicy,
};
use album_convert::output;
use clap::{Parser, Subcommand};
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "album-convert")]
#[command(about = "Split album records into one portfolio record per photo")]
#[command(long_about = "\
Split album records into one portfolio record per photo

An album is a markdown file whose YAML header lists several photos:

  ---
  albumName: Summer
  category: Landscape
  baseTitle: Beach
  date: 2024-01-01
  images:
    - /images/uploads/a.jpg
    - /images/uploads/b.jpg
  ---

Each image becomes its own portfolio record titled \"Beach 1\", \"Beach 2\", ...
carrying the album's category, name and date.

Missing fields fall back to: albumName \"Unnamed Album\", category
\"Portrait\", baseTitle \"Photo\", date = now.

'local' works on a checkout; 'remote' commits straight to a GitHub
repository using the token in GITHUB_TOKEN.

Run 'album-convert gen-config' to generate a documented album-convert.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: album-convert.toml, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by the converting commands.
#[derive(clap::Args, Clone)]
struct RunArgs {
    /// Parse and plan without writing or deleting anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Convert albums in a local content directory
    Local {
        /// Directory holding album records
        #[arg(long)]
        albums_dir: Option<PathBuf>,
        /// Directory receiving portfolio records
        #[arg(long)]
        portfolio_dir: Option<PathBuf>,
        /// Remove each album once all of its photos were written
        #[arg(long)]
        delete_source: bool,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Convert albums in a GitHub repository through the contents API
    Remote {
        /// Repository owner
        #[arg(long)]
        owner: Option<String>,
        /// Repository name
        #[arg(long)]
        repo: Option<String>,
        /// Branch to read from and commit to
        #[arg(long)]
        branch: Option<String>,
        /// API root, for GitHub Enterprise
        #[arg(long)]
        api_base: Option<String>,
        /// When to delete a source album after conversion
        #[arg(long, value_enum)]
        delete_policy: Option<DeletePolicy>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Print a stock album-convert.toml with all options documented
    GenConfig,
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error("missing {what}: pass {flag} or set {env}")]
    Missing {
        what: &'static str,
        flag: &'static str,
        env: &'static str,
    },
    #[error("no access token: set the {0} environment variable")]
    MissingToken(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cancelled")]
    Cancelled,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Cancelled) => {
            eprintln!("Cancelled");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("fatal error: {}", error_chain(&e));
            ExitCode::FAILURE
        }
    }
}

/// `e: cause: cause` for the whole source chain.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        // thiserror messages often embed their source already
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "album_convert=debug"
    } else {
        "album_convert=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Local {
            albums_dir,
            portfolio_dir,
            delete_source,
            run: run_args,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(dir) = albums_dir {
                config.local.albums_dir = dir;
            }
            if let Some(dir) = portfolio_dir {
                config.local.portfolio_dir = dir;
            }
            config.local.delete_source |= delete_source;
            config.validate()?;

            let store = LocalBackend::new(&config.local.albums_dir, &config.local.portfolio_dir);
            let options = ConvertOptions {
                delete_policy: config.local.delete_policy(),
                dry_run: run_args.dry_run,
                cancel: CancelToken::new(),
            };
            run_conversion(&store, &options)?;
        }
        Command::Remote {
            owner,
            repo,
            branch,
            api_base,
            delete_policy,
            run: run_args,
        } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            config.apply_env(|key| std::env::var(key).ok());
            let remote = &mut config.remote;
            if owner.is_some() {
                remote.owner = owner;
            }
            if repo.is_some() {
                remote.repo = repo;
            }
            if branch.is_some() {
                remote.branch = branch;
            }
            if let Some(api_base) = api_base {
                remote.api_base = api_base;
            }
            if let Some(policy) = delete_policy {
                remote.delete_policy = policy;
            }
            config.validate()?;

            let settings = remote_settings(&config, |key| std::env::var(key).ok())?;
            let options = ConvertOptions {
                delete_policy: config.remote.delete_policy,
                dry_run: run_args.dry_run,
                cancel: CancelToken::new(),
            };
            let store = RemoteBackend::new(settings);
            run_conversion(&store, &options)?;
        }
    }
    Ok(())
}

/// Fill in anything the config layers left unset, prompting on a terminal.
///
/// The token is only ever taken from the environment, never prompted for:
/// typing it would echo a secret into the terminal and its scrollback.
fn remote_settings(
    config: &ConvertConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<RemoteSettings, CliError> {
    let token = config
        .token(env)
        .ok_or_else(|| CliError::MissingToken(config.remote.token_env.clone()))?;
    let owner = match &config.remote.owner {
        Some(owner) => owner.clone(),
        None => prompt("Repository owner", "repository owner", "--owner", config::OWNER_ENV)?,
    };
    let repo = match &config.remote.repo {
        Some(repo) => repo.clone(),
        None => prompt("Repository name", "repository name", "--repo", config::REPO_ENV)?,
    };
    Ok(RemoteSettings {
        api_base: config.remote.api_base.clone(),
        owner,
        repo,
        branch: config.remote.branch.clone(),
        token,
        albums_path: config.remote.albums_path.clone(),
        portfolio_path: config.remote.portfolio_path.clone(),
        timeout: Duration::from_secs(config.remote.timeout_secs),
    })
}

/// Ask for a value on an interactive terminal. Off a terminal the value is
/// simply missing; end of input cancels.
fn prompt(
    label: &str,
    what: &'static str,
    flag: &'static str,
    env: &'static str,
) -> Result<String, CliError> {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return Err(CliError::Missing { what, flag, env });
    }
    let mut input = stdin.lock();
    loop {
        print!("{label}: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            println!();
            return Err(CliError::Cancelled);
        }
        let value = line.trim();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }
}

/// Run the driver with a printer thread draining its events.
fn run_conversion(
    store: &impl RecordStore,
    options: &ConvertOptions,
) -> Result<ConvertSummary, CliError> {
    if options.dry_run {
        println!("==> Dry run: {}", store.location());
    } else {
        println!("==> Converting {}", store.location());
    }

    install_interrupt_handler(&options.cancel);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_event(&event);
        }
    });
    let result = convert::convert(store, &SystemClock, options, Some(tx));
    // The sender is gone once convert returns, so the printer finishes
    printer.join().ok();

    let summary = result?;
    output::print_summary(&summary);
    Ok(summary)
}

/// First Ctrl-C lets the current album finish and stops the run; a second
/// one aborts immediately.
fn install_interrupt_handler(cancel: &CancelToken) {
    let cancel = cancel.clone();
    let installed = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            std::process::exit(130);
        }
        eprintln!("\nInterrupted by user, stopping after the current album (Ctrl-C again to abort)");
        cancel.cancel();
    });
    if let Err(e) = installed {
        warn!(error = %e, "could not install Ctrl-C handler");
    }
}
