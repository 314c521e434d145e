//! Flow - a Pomodoro work/break interval timer
//!
//! The timer runs inside `flow daemon`; the other subcommands are thin
//! clients that talk to it over a Unix socket:
//! - 25 minutes of focused work
//! - 5 minute short breaks
//! - a 15 minute long break after every 4 work sessions

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};

use flow::cli::{Cli, Commands, DaemonArgs, Display, IpcClient, SetupsCommand};
use flow::daemon::{default_socket_path, Daemon, TerminalBell};
use flow::settings::{JsonFileStore, SettingsStore};

/// Main entry point
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if let Err(e) = execute(cli).await {
        Display::show_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Resolves the socket from `--socket` or the default location.
fn socket_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.socket {
        Some(path) => Ok(path.clone()),
        None => default_socket_path(),
    }
}

/// Executes the CLI command.
async fn execute(cli: Cli) -> Result<()> {
    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Daemon(args) => run_daemon(socket_path(&cli)?, args).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
        command => {
            let client = IpcClient::with_socket_path(socket_path(&cli)?);
            run_client(&client, command).await
        }
    }
}

/// Sends one command to the daemon and prints the result.
async fn run_client(client: &IpcClient, command: Commands) -> Result<()> {
    match command {
        Commands::Start => Display::show_command_result(&client.start().await?),
        Commands::Pause => Display::show_command_result(&client.pause().await?),
        Commands::Toggle => Display::show_command_result(&client.toggle().await?),
        Commands::Reset => Display::show_command_result(&client.reset().await?),
        Commands::Skip => Display::show_command_result(&client.skip().await?),
        Commands::Status => {
            let response = client.status().await?;
            let timer = response
                .data
                .and_then(|d| d.timer)
                .context("Daemon returned no timer status")?;
            Display::show_status(&timer);
        }
        Commands::Settings => {
            let response = client.settings().await?;
            let settings = response
                .data
                .and_then(|d| d.settings)
                .context("Daemon returned no settings")?;
            Display::show_settings(&settings);
        }
        Commands::Set { key, value } => {
            let setting = key.parse_value(&value).map_err(anyhow::Error::msg)?;
            Display::show_command_result(&client.set(setting).await?);
        }
        Commands::Setups { action } => run_setups(client, action).await?,
        other @ (Commands::Daemon(_) | Commands::Completions { .. }) => {
            anyhow::bail!("{other:?} is not a daemon request")
        }
    }

    Ok(())
}

async fn run_setups(client: &IpcClient, action: SetupsCommand) -> Result<()> {
    match action {
        SetupsCommand::List => {
            let setups = client
                .list_setups()
                .await?
                .data
                .and_then(|d| d.setups)
                .unwrap_or_default();
            let current = client.settings().await?.data.and_then(|d| d.settings);
            Display::show_setups(&setups, current.as_ref());
        }
        SetupsCommand::Save => {
            let response = client.save_setup().await?;
            println!("{}", response.message);
        }
        SetupsCommand::Apply { setup } => {
            Display::show_command_result(&client.apply_setup(&setup).await?);
        }
        SetupsCommand::Delete { setup } => {
            let response = client.delete_setup(&setup).await?;
            println!("{}", response.message);
        }
    }

    Ok(())
}

/// Runs the daemon in the foreground until Ctrl-C.
async fn run_daemon(socket_path: PathBuf, args: DaemonArgs) -> Result<()> {
    let settings_path = match args.settings {
        Some(path) => path,
        None => JsonFileStore::default_path()?,
    };

    let store = SettingsStore::load(JsonFileStore::open(&settings_path));
    let show_at_launch = store.show_window_at_launch();

    let daemon = Daemon::start(&socket_path, store, Arc::new(TerminalBell)).await?;
    tracing::info!(settings = %settings_path.display(), "settings loaded");

    println!("Flow daemon listening on {}", socket_path.display());
    if show_at_launch {
        Display::show_status(&daemon.engine().snapshot().await);
    }

    daemon
        .serve(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}

/// Generates shell completion scripts.
fn generate_completions(shell: clap_complete::Shell) {
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}

// ============================================================================
// Tests
// ============================================================================
