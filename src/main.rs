use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use codex_bridge::agents::{AgentsClient, ListOptions, RunOptions, SubagentScope};
use codex_bridge::config::BridgeConfig;
use codex_bridge::hooks::{
    ExecLogOptions, HookListOptions, HookScope, HooksClient, ValidateOptions,
};
use codex_bridge::runner::CommandRunner;
use codex_bridge::runner::process::ProcessRunner;

#[derive(Parser)]
#[command(
    name = "codex-bridge",
    version,
    about = "Run codex engine commands and print normalized JSON."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Engine binary to use instead of the resolved one
    #[arg(long, global = true)]
    binary: Option<PathBuf>,

    /// State directory handed to the engine (defaults to $CODEX_HOME or ~/.codex)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Per-command timeout in milliseconds; 0 disables it
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Subagent definitions
    #[command(subcommand)]
    Agents(AgentsCommand),
    /// Lifecycle hooks
    #[command(subcommand)]
    Hooks(HooksCommand),
}

#[derive(Subcommand)]
enum AgentsCommand {
    /// List subagents
    List {
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,
        /// Include definitions that failed validation
        #[arg(long, default_value_t = false)]
        invalid: bool,
    },
    /// Show one subagent
    Show { name: String },
    /// Invoke a subagent
    Run {
        name: String,
        /// Restrict the run to this tool (repeatable)
        #[arg(long = "tool")]
        tools: Vec<String>,
    },
}

#[derive(Subcommand)]
enum HooksCommand {
    /// List loaded hooks per layer and event
    List {
        #[arg(long)]
        event: Option<String>,
        #[arg(long, value_enum)]
        scope: Option<LayerArg>,
    },
    /// Validate hook configuration
    Validate {
        #[arg(long, value_enum)]
        scope: Option<LayerArg>,
    },
    /// Show the hook execution log
    ExecLog {
        /// Only records at or after this RFC 3339 timestamp
        #[arg(long)]
        since: Option<String>,
        #[arg(long)]
        event: Option<String>,
        #[arg(long)]
        hook_id: Option<String>,
        /// Keep only the last N records
        #[arg(long)]
        tail: Option<u32>,
    },
    /// Ask a running session to reload its hooks
    Reload,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ScopeArg {
    Project,
    User,
    All,
}

impl From<ScopeArg> for SubagentScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Project => Self::Project,
            ScopeArg::User => Self::User,
            ScopeArg::All => Self::All,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LayerArg {
    Managed,
    Project,
    Local,
}

impl From<LayerArg> for HookScope {
    fn from(arg: LayerArg) -> Self {
        match arg {
            LayerArg::Managed => Self::Managed,
            LayerArg::Project => Self::Project,
            LayerArg::Local => Self::Local,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = BridgeConfig::from_env();
    if let Some(binary) = cli.binary {
        config = config.with_binary_override(binary);
    }
    if let Some(home) = cli.home {
        config = config.with_home(home);
    }
    let timeout = cli.timeout_ms.map(Duration::from_millis);
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new(config));

    match cli.command {
        Command::Agents(command) => {
            let client = AgentsClient::new(runner);
            match command {
                AgentsCommand::List { scope, invalid } => {
                    let options = ListOptions {
                        scope: scope.map(Into::into),
                        include_invalid: invalid,
                        timeout,
                    };
                    print_json(&client.list(&options).await?)
                }
                AgentsCommand::Show { name } => print_json(&client.show(&name, timeout).await?),
                AgentsCommand::Run { name, tools } => {
                    let options = RunOptions { tools, timeout };
                    print_json(&client.run(&name, &options).await?)
                }
            }
        }
        Command::Hooks(command) => {
            let client = HooksClient::new(runner);
            match command {
                HooksCommand::List { event, scope } => {
                    let options = HookListOptions {
                        event,
                        scope: scope.map(Into::into),
                        timeout,
                    };
                    print_json(&client.list(&options).await?)
                }
                HooksCommand::Validate { scope } => {
                    let options = ValidateOptions {
                        scope: scope.map(Into::into),
                        timeout,
                    };
                    print_json(&client.validate(&options).await?)
                }
                HooksCommand::ExecLog {
                    since,
                    event,
                    hook_id,
                    tail,
                } => {
                    let options = ExecLogOptions {
                        since,
                        event,
                        hook_id,
                        tail,
                        timeout,
                    };
                    print_json(&client.exec_log(&options).await?)
                }
                HooksCommand::Reload => print_json(&client.reload(timeout).await?),
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to render result as JSON")?;
    println!("{text}");
    Ok(())
}
