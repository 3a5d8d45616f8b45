//! commitcraft - CLI entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use dialoguer::Confirm;
use tracing_subscriber::EnvFilter;

use commitcraft::ai::build_gateway;
use commitcraft::presenter::{SyncPresenter, TerminalSurface};
use commitcraft::vcs::{GitGateway, spawn_watcher};
use commitcraft::{Config, FileId, Generation, Partition, PresenterError, Provider};

/// Stage, discard and commit changes, with AI-written commit messages.
#[derive(Parser, Debug)]
#[command(name = "commitcraft")]
#[command(about = "Stage, discard and commit changes, with AI-written commit messages")]
#[command(version)]
struct Cli {
    /// Repository to operate on (repeat for several; defaults to the current directory)
    #[arg(long = "repo", global = true)]
    repos: Vec<PathBuf>,

    /// Print projections as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show staged and unstaged changes
    Status,
    /// Stage a file
    Stage { path: PathBuf },
    /// Unstage a file
    Unstage { path: PathBuf },
    /// Throw away working-tree changes to a file
    Discard {
        path: PathBuf,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Stage every change
    StageAll,
    /// Unstage every change
    UnstageAll,
    /// Throw away every working-tree change, including untracked files
    DiscardAll {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Generate a commit message from the staged diff
    Generate(AiArgs),
    /// Commit the staged changes
    Commit {
        /// Commit message
        #[arg(short, long, conflicts_with = "generate")]
        message: Option<String>,

        /// Generate the message with AI first
        #[arg(long)]
        generate: bool,

        /// Commit the generated message without asking
        #[arg(long)]
        yes: bool,

        #[command(flatten)]
        ai: AiArgs,
    },
    /// Keep printing the changes as they happen until Ctrl-C
    Watch,
}

#[derive(Args, Debug, Default)]
struct AiArgs {
    /// AI backend: openai or claude
    #[arg(long)]
    provider: Option<Provider>,

    /// Model name for the OpenAI-compatible backend
    #[arg(long)]
    model: Option<String>,

    /// API key for the OpenAI-compatible backend
    #[arg(long, env = "COMMITCRAFT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Total generation attempts before giving up
    #[arg(long)]
    retries: Option<u32>,
}

impl AiArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(retries) = self.retries {
            config.max_attempts = retries;
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Command::Generate(ai) | Command::Commit { ai, .. } = &cli.command {
        ai.apply(&mut config);
    }
    config.validate().context("Invalid configuration")?;

    let repos = if cli.repos.is_empty() {
        vec![std::env::current_dir().context("Cannot read the current directory")?]
    } else {
        cli.repos.clone()
    };

    let gateway = Arc::new(GitGateway::open(&repos));
    if gateway.roots().is_empty() {
        bail!("Not a git repository. Run commitcraft inside a repository or pass --repo.");
    }

    let surface = Arc::new(TerminalSurface::new().json(cli.json));
    let presenter = SyncPresenter::new(gateway.clone(), build_gateway(&config), surface)
        .with_roots(gateway.roots().to_vec());

    let outcome = match cli.command {
        Command::Status => {
            presenter.refresh().await;
            Ok(())
        }
        Command::Stage { path } => {
            let id = file_id(Partition::Unstaged, &path)?;
            mutate(&presenter, presenter.request_stage(&id)).await
        }
        Command::Unstage { path } => {
            let id = file_id(Partition::Staged, &path)?;
            mutate(&presenter, presenter.request_unstage(&id)).await
        }
        Command::Discard { path, yes } => {
            let prompt = format!("Discard all changes to {}?", path.display());
            if !confirm(&prompt, yes)? {
                return Ok(ExitCode::SUCCESS);
            }
            let id = file_id(Partition::Unstaged, &path)?;
            mutate(&presenter, presenter.request_discard(&id)).await
        }
        Command::StageAll => mutate(&presenter, presenter.request_stage_all()).await,
        Command::UnstageAll => mutate(&presenter, presenter.request_unstage_all()).await,
        Command::DiscardAll { yes } => {
            if !confirm("Discard every working-tree change, including untracked files?", yes)? {
                return Ok(ExitCode::SUCCESS);
            }
            mutate(&presenter, presenter.request_discard_all()).await
        }
        Command::Generate(_) => presenter.request_generate().await.map(|_| ()),
        Command::Commit {
            message: Some(message),
            ..
        } => presenter.request_commit(&message).await.map(|_| ()),
        Command::Commit {
            generate: true,
            yes,
            ..
        } => match presenter.request_generate().await {
            Ok(Generation::Message(message)) => {
                if confirm("Commit with this message?", yes)? {
                    presenter.request_commit(message.as_str()).await.map(|_| ())
                } else {
                    Ok(())
                }
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        },
        Command::Commit { .. } => bail!("Pass a message with -m or use --generate"),
        Command::Watch => {
            let _watcher = spawn_watcher(&gateway, config.poll_interval);
            let _presenter = presenter.attach();
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            Ok(())
        }
    };

    // Presenter failures have already been shown on the surface.
    Ok(match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,commitcraft=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Run a mutation and show the resulting state.
async fn mutate(
    presenter: &SyncPresenter,
    request: impl Future<Output = Result<(), PresenterError>>,
) -> Result<(), PresenterError> {
    request.await?;
    presenter.refresh().await;
    Ok(())
}

fn file_id(partition: Partition, path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("Cannot resolve {}", path.display()))?;
    Ok(FileId::new(partition, absolute).to_string())
}

fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Confirmation prompt failed")
}
