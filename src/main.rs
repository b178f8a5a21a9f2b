//! Ghostline CLI entry point.
//!
//! Each advisor feature is a subcommand. Conversational features run a
//! line-oriented loop over stdin; one-shot features print their result and
//! exit. Logs go to stderr (and optionally a JSON file), replies to stdout.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use ghostline::app::App;
use ghostline::config::{config_dir, Config};
use ghostline::conversation::{Speaker, Turn};
use ghostline::credentials::load_credentials;
use ghostline::features::dossier::{DossierInput, DossierState};
use ghostline::features::live::TargetProfile;
use ghostline::features::training::SimulationProfile;
use ghostline::features::{FeatureError, PersonaForge};
use ghostline::logging;

/// Ghostline: advisor personas over a generative-text API.
#[derive(Parser)]
#[command(name = "ghostline", version, about)]
struct Cli {
    /// Path to config.toml (defaults to ~/.ghostline/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Open-ended counsel from the advisor.
    Chat,
    /// Tactical counsel during a live conversation with a target.
    Live {
        /// Target name.
        #[arg(long, default_value = "")]
        name: String,
        /// Description of the target.
        #[arg(long)]
        description: String,
        /// What you want to achieve.
        #[arg(long)]
        objective: String,
    },
    /// Compile a one-shot psychological dossier.
    Dossier {
        /// Target designation.
        #[arg(long)]
        designation: String,
        /// Observable trait (the mask).
        #[arg(long = "trait")]
        observable_trait: String,
        /// Hypothesized core vulnerability (the shadow).
        #[arg(long, default_value = "")]
        vulnerability: String,
    },
    /// Build a persona through a guided interview.
    Forge,
    /// Rehearse against a simulated target with live feedback.
    Train {
        /// Personality profile of the simulated target.
        #[arg(long)]
        personality: String,
        /// What you want to achieve.
        #[arg(long)]
        objective: String,
    },
    /// Browse the codex, or generate an anecdote for one principle.
    Codex {
        /// Section key (e.g. `persona`).
        #[arg(long, requires = "index")]
        section: Option<String>,
        /// Principle index within the section, starting at 0.
        #[arg(long, requires = "section")]
        index: Option<usize>,
    },
    /// Report configuration status.
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let _logging_guard = match &config.logging.dir {
        Some(dir) => Some(logging::init_production(dir, &config.logging.level)?),
        None => {
            logging::init_cli(&config.logging.level);
            None
        }
    };

    let env_file = config_dir()?.join(".env");
    let credentials = load_credentials(&env_file)
        .with_context(|| format!("failed to load {}", env_file.display()))?;
    let app = App::from_config(config, &credentials, |key| std::env::var(key).ok());

    match &cli.command {
        Command::Check => {
            handle_check(&app);
            return Ok(());
        }
        Command::Codex {
            section: None,
            index: None,
        } => {
            handle_codex_list(&app);
            return Ok(());
        }
        _ => {}
    }

    if let Some(notice) = app.configuration_notice() {
        println!("{notice}");
        return Ok(());
    }

    match cli.command {
        Command::Chat => handle_chat(&app).await,
        Command::Live {
            name,
            description,
            objective,
        } => {
            handle_live(
                &app,
                TargetProfile {
                    name,
                    description,
                    objective,
                },
            )
            .await
        }
        Command::Dossier {
            designation,
            observable_trait,
            vulnerability,
        } => {
            handle_dossier(
                &app,
                DossierInput {
                    designation,
                    observable_trait,
                    vulnerability,
                },
            )
            .await
        }
        Command::Forge => handle_forge(&app).await,
        Command::Train {
            personality,
            objective,
        } => {
            handle_train(
                &app,
                SimulationProfile {
                    personality,
                    objective,
                },
            )
            .await
        }
        Command::Codex {
            section: Some(section),
            index: Some(index),
        } => handle_codex_generate(&app, &section, index).await,
        Command::Codex { .. } | Command::Check => Ok(()),
    }
}

/// Print configuration status without calling the model.
fn handle_check(app: &App) {
    let config = app.config();
    println!("endpoint: {}", config.model.endpoint);
    println!("model:    {}", config.model.model);
    if app.has_api_key() {
        println!("api key:  present ({})", config.model.api_key_env);
    } else {
        println!("api key:  missing");
    }
    if let Some(notice) = app.configuration_notice() {
        println!("{notice}");
    }
}

fn handle_codex_list(app: &App) {
    for section in app.codex().sections() {
        println!("[{}] {}", section.key, section.title);
        for (index, principle) in section.principles.iter().enumerate() {
            println!("  {index}. {}: {}", principle.title, principle.text);
        }
    }
}

async fn handle_codex_generate(app: &App, section: &str, index: usize) -> anyhow::Result<()> {
    let codex = app.codex();
    let anecdote = codex.generate_anecdote(section, index).await?;
    if let Some(error) = codex.error() {
        eprintln!("{error}");
    }
    println!("{anecdote}");
    Ok(())
}

async fn handle_dossier(app: &App, input: DossierInput) -> anyhow::Result<()> {
    match app.dossier().compile(&input).await? {
        DossierState::Compiled {
            title,
            analysis,
            tactic,
        } => {
            println!(
                "{title}\n\nPsychological Profile:\n{analysis}\n\nActionable Tactic:\n{tactic}"
            );
        }
        DossierState::Failed { message, raw_reply } => {
            println!("{message}");
            if let Some(raw) = raw_reply {
                println!("\n{raw}");
            }
        }
    }
    Ok(())
}

async fn handle_chat(app: &App) -> anyhow::Result<()> {
    let chat = app.chat();
    print_turns(&chat.conversation().turns().await);
    let chat = &chat;
    repl(|line| async move { chat.send(&line).await.map(|turn| print_turn(&turn)) }).await
}

async fn handle_live(app: &App, profile: TargetProfile) -> anyhow::Result<()> {
    let mut live = app.live();
    live.start(profile)?;
    print_turns(&live.conversation().turns().await);
    let live = &live;
    repl(|line| async move { live.send(&line).await.map(|turn| print_turn(&turn)) }).await
}

async fn handle_forge(app: &App) -> anyhow::Result<()> {
    let forge = app.forge();
    print_turns(&forge.conversation().turns().await);
    let forge = &forge;
    repl(|line| async move {
        let turn = forge.send(&line).await?;
        match PersonaForge::dossier_in(&turn) {
            Ok(Some(dossier)) => println!(
                "Persona Dossier: {}\n  Objective:    {}\n  Environment:  {}\n  Core Emotion: {}\n  Anchor:       {}",
                dossier.codename,
                dossier.objective,
                dossier.environment,
                dossier.core_emotion,
                dossier.anchor
            ),
            Ok(None) | Err(_) => print_turn(&turn),
        }
        Ok(())
    })
    .await
}

async fn handle_train(app: &App, profile: SimulationProfile) -> anyhow::Result<()> {
    let mut training = app.training();
    training.start(profile)?;
    print_turns(&training.conversation().turns().await);
    println!("[feedback] {}", training.feedback());
    let training = &training;
    repl(|line| async move {
        let exchange = training.send(&line).await?;
        print_turn(&exchange.target);
        println!("[feedback] {}", exchange.feedback);
        Ok(())
    })
    .await
}

/// Feed stdin lines to `step` until EOF. Busy and blank input are reported
/// and skipped.
async fn repl<F, Fut>(step: F) -> anyhow::Result<()>
where
    F: Fn(String) -> Fut,
    Fut: std::future::Future<Output = Result<(), FeatureError>>,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match step(line).await {
            Ok(()) => {}
            Err(FeatureError::EmptyInput) => debug!("ignoring blank input"),
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}

fn print_turns(turns: &[Turn]) {
    for turn in turns {
        print_turn(turn);
    }
}

fn print_turn(turn: &Turn) {
    let label = match turn.speaker {
        Speaker::User => "you",
        Speaker::Advisor => "ghost",
        Speaker::SimulatedTarget => "target",
    };
    println!("[{label}] {}", turn.text);
}
