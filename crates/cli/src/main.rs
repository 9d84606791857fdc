mod commands;
mod logging;
mod repl;
mod strings;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use providers::groq::{models, GroqClient, GroqConfig};
use tutor_core::llm::ModelClient;
use tutor_core::modes::{ComplexityLevel, Mode, ModeDispatcher, ModeSelection, ProjectType};
use tutor_core::session::SessionStore;

#[derive(Parser)]
#[command(name = "tutor")]
#[command(about = "Study assistant backed by Groq-hosted models")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone, Debug)]
struct ModeArgs {
    /// Learning mode: socratic, inventor, explainer or default
    #[arg(short, long, default_value = "default")]
    mode: Mode,

    /// Explanation depth (explainer mode): beginner, intermediate, advanced
    #[arg(short, long)]
    level: Option<ComplexityLevel>,

    /// Project focus (inventor mode): web, mobile, data, hardware, ai_ml, general
    #[arg(short, long)]
    project: Option<ProjectType>,

    /// Extra context appended to the system prompt
    #[arg(short, long)]
    context: Option<String>,
}

impl ModeArgs {
    fn selection(&self) -> ModeSelection {
        ModeSelection {
            mode: self.mode,
            complexity: self.level,
            project_type: self.project,
            extra_context: self.context.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Ask a single question and print the answer
    Ask {
        question: String,

        #[command(flatten)]
        mode: ModeArgs,

        /// Print the full response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive chat session
    Chat {
        #[command(flatten)]
        mode: ModeArgs,

        /// Wait for whole replies instead of streaming tokens
        #[arg(long)]
        no_stream: bool,
    },

    /// Check that the provider answers
    Health,

    /// List known models
    Models,

    /// Describe the learning modes
    Modes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::init()?;

    match cli.command {
        Command::Models => {
            for m in models::available_models() {
                println!("{}", strings::format_model(m));
            }
            Ok(())
        }
        Command::Modes => {
            for mode in Mode::ALL {
                println!("{}", strings::format_mode(mode));
            }
            Ok(())
        }
        Command::Health => {
            let client = open_client()?;
            if client.health_check().await {
                println!("ok: {}", client.config().base_url);
                Ok(())
            } else {
                anyhow::bail!("provider at {} is not answering", client.config().base_url)
            }
        }
        Command::Ask {
            question,
            mode,
            json,
        } => {
            let client = open_client()?;
            let dispatcher = ModeDispatcher::new(client.config().model.clone());
            let out = dispatcher
                .process_query(&*client, &question, &mode.selection(), &[])
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!("{}", out.response);
                println!();
                print!("{}", strings::format_suggestions(&out.suggestions));
                println!("{}", strings::format_metadata(&out.metadata));
            }
            Ok(())
        }
        Command::Chat { mode, no_stream } => {
            let client = open_client()?;
            let dispatcher = ModeDispatcher::new(client.config().model.clone());
            let store = SessionStore::new();
            repl::run(&client, &dispatcher, &store, mode.selection(), !no_stream).await
        }
    }
}

fn open_client() -> Result<providers::groq::ClientGuard> {
    let cfg = GroqConfig::from_env_and_file().context("load provider config")?;
    GroqClient::open(cfg).context("build provider client")
}
