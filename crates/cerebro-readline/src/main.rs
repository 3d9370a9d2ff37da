mod commands;
mod helper;
mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use tokio::sync::mpsc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use cerebro_application::{MessagePipeline, SendOutcome};
use cerebro_core::config::RootConfig;
use cerebro_core::session::{MessageBody, Session, SessionId, SessionStore};
use cerebro_core::{CompletionClient, SessionPersistence};
use cerebro_infrastructure::{CerebroPaths, ConfigService, FileKeyValueStore, SecretService};
use cerebro_interaction::{CommonMarkRenderer, GeminiApiAgent};

use crate::commands::{Command, resolve_target};
use crate::helper::CliHelper;
use crate::render::html_to_terminal;

const LOG_ENV: &str = "CEREBRO_LOG";
const LIMIT_NOTICE: &str = "Chat limit reached. Please delete an old chat.";

#[derive(Parser)]
#[command(name = "cerebro")]
#[command(about = "Cerebro - multi-session chat with Gemini", long_about = None)]
struct Cli {
    /// Keep config, chats and logs under this directory instead of the
    /// platform defaults
    #[arg(long, value_name = "DIR")]
    home: Option<PathBuf>,

    /// Model to use for this run (overrides config.toml)
    #[arg(long, value_name = "ID")]
    model: Option<String>,
}

/// Installs a file logger; the returned guard flushes it on drop.
fn init_logging(logs_dir: &Path) -> Result<WorkerGuard> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("cerebro.log")
        .build(logs_dir)
        .with_context(|| format!("Failed to open log directory {}", logs_dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e))?;

    Ok(guard)
}

/// Wires storage, persistence, the session store and the completion client.
fn bootstrap(cli: &Cli, paths: &CerebroPaths) -> Result<Arc<MessagePipeline>> {
    let mut config = ConfigService::new(paths.config_file()?).get_config();
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    tracing::info!(
        "[Bootstrap] model={} session_limit={} save_debounce={:?}",
        config.model,
        config.session_limit,
        config.save_debounce()
    );

    let api_key = SecretService::new(paths.secret_file()?).gemini_api_key()?;

    let storage = Arc::new(FileKeyValueStore::new(paths.store_dir()?)?);
    let persistence = Arc::new(SessionPersistence::new(storage, config.save_debounce())?);
    let store = Arc::new(SessionStore::restore(persistence, config.session_limit));

    let client = build_client(&config, api_key);

    Ok(Arc::new(MessagePipeline::new(store, client)))
}

/// Builds the Gemini-backed completion client from the loaded configuration.
fn build_client(config: &RootConfig, api_key: String) -> CompletionClient {
    let agent = GeminiApiAgent::new(api_key).with_base_url(config.api_base_url.as_str());
    CompletionClient::new(Arc::new(agent), Arc::new(CommonMarkRenderer::new()), config.model.as_str())
        .with_timeout(config.request_timeout())
}

fn print_message_body(body: MessageBody<'_>, timestamp: &str) {
    match body {
        MessageBody::PlainText(text) => {
            println!("{} {}", timestamp.bright_black(), format!("> {}", text).green());
        }
        MessageBody::TrustedHtml(html) => {
            println!("{}", timestamp.bright_black());
            for line in html_to_terminal(html).lines() {
                println!("{}", line.bright_blue());
            }
        }
    }
}

fn print_session(session: &Session) {
    println!("{}", format!("=== {} ===", session.display_id).bright_magenta().bold());
    if session.messages.is_empty() {
        println!("{}", "(no messages yet)".bright_black());
    }
    for message in &session.messages {
        print_message_body(message.body(), &message.timestamp);
    }
}

fn print_sessions(store: &SessionStore) {
    let summaries = store.summaries();
    if summaries.is_empty() {
        println!("{}", "No chats yet. Type a message or /new to start one.".bright_black());
        return;
    }
    for (index, summary) in summaries.iter().enumerate() {
        let marker = if summary.is_active { "*" } else { " " };
        let id = summary.id.to_string();
        let line = format!(
            "{} {:>2}. {}  ({} messages)  {}",
            marker,
            index + 1,
            summary.display_id,
            summary.message_count,
            &id[..8]
        );
        if summary.is_active {
            println!("{}", line.bright_green());
        } else {
            println!("{}", line);
        }
    }
    println!("{}", format!("{}/{} chats", store.len(), store.limit()).bright_black());
}

fn print_outcome(store: &SessionStore, outcome: SendOutcome) {
    match outcome {
        SendOutcome::Ignored => {}
        SendOutcome::SessionCreated(id) => {
            if let Some(session) = store.get_session(id) {
                println!("{}", format!("Started {}", session.display_id).bright_green());
            }
        }
        SendOutcome::LimitReached { .. } => println!("{}", LIMIT_NOTICE.red()),
        SendOutcome::Busy(_) => {
            println!("{}", "Still waiting for the previous reply in this chat.".yellow());
        }
        SendOutcome::Replied(id) => {
            let Some(session) = store.get_session(id) else {
                return;
            };
            if store.active_id() != Some(id) {
                println!("{}", format!("[{}]", session.display_id).bright_magenta());
            }
            if let Some(reply) = session.messages.last() {
                print_message_body(reply.body(), &reply.timestamp);
            }
        }
        SendOutcome::NoReply(_) => {
            println!("{}", "No reply received. See the log for details.".red());
        }
        SendOutcome::Discarded(_) => {
            println!("{}", "Reply dropped: its chat was deleted.".bright_black());
        }
    }
}

fn print_help() {
    println!("{}", "Type a message to send it to the active chat.".bright_black());
    println!("{}", "  /new [text]        start a chat (optionally with a first message)".bright_black());
    println!("{}", "  /list              list chats".bright_black());
    println!("{}", "  /select <n|id>     switch to a chat".bright_black());
    println!("{}", "  /delete <n|id>     delete a chat".bright_black());
    println!("{}", "  /show              show the active chat".bright_black());
    println!("{}", "  /quit              save and exit".bright_black());
}

fn target_id(store: &SessionStore, target: &str) -> Option<SessionId> {
    let resolved = resolve_target(target, &store.summaries());
    if resolved.is_none() {
        println!("{}", format!("No chat matches '{}'", target).yellow());
    }
    resolved
}

/// The main entry point for the Cerebro readline REPL.
///
/// Sends run on background tasks so the prompt stays usable while a reply is
/// pending; outcomes are printed by a single reporter task.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = CerebroPaths::new(cli.home.as_deref());
    let _log_guard = init_logging(&paths.logs_dir()?)?;

    let pipeline = bootstrap(&cli, &paths)?;
    let store = Arc::clone(pipeline.store());

    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<SendOutcome>();
    let reporter_store = Arc::clone(&store);
    let reporter = tokio::spawn(async move {
        while let Some(outcome) = outcome_rx.recv().await {
            print_outcome(&reporter_store, outcome);
        }
    });

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== Cerebro ===".bright_magenta().bold());
    println!("{}", "Type a message to chat, /help for commands, /quit to exit.".bright_black());
    if let Some(session) = store.active_session() {
        println!("{}", format!("Resuming {}", session.display_id).bright_black());
    }
    println!();

    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line.as_str());

                match Command::parse(&line) {
                    Command::Send(text) => {
                        let pipeline = Arc::clone(&pipeline);
                        let tx = outcome_tx.clone();
                        tokio::spawn(async move {
                            let outcome = pipeline.send(&text).await;
                            let _ = tx.send(outcome);
                        });
                    }
                    Command::New(text) => match store.create_session(text.as_deref()) {
                        Ok(id) => print_outcome(&store, SendOutcome::SessionCreated(id)),
                        Err(e) if e.is_limit_reached() => println!("{}", LIMIT_NOTICE.red()),
                        Err(e) => println!("{}", format!("Error: {}", e).red()),
                    },
                    Command::List => print_sessions(&store),
                    Command::Select(target) => {
                        if let Some(id) = target_id(&store, &target) {
                            match store.select_session(id) {
                                Ok(()) => {
                                    if let Some(session) = store.get_session(id) {
                                        print_session(&session);
                                    }
                                }
                                Err(e) => println!("{}", format!("Error: {}", e).red()),
                            }
                        }
                    }
                    Command::Delete(target) => {
                        if let Some(id) = target_id(&store, &target) {
                            let name = store.get_session(id).map(|s| s.display_id);
                            match store.delete_session(id) {
                                Ok(()) => {
                                    println!("{}", format!("Deleted {}", name.unwrap_or_default()).yellow());
                                    if let Some(active) = store.active_session() {
                                        println!("{}", format!("Active: {}", active.display_id).bright_black());
                                    }
                                }
                                Err(e) => println!("{}", format!("Error: {}", e).red()),
                            }
                        }
                    }
                    Command::Show => match store.active_session() {
                        Some(session) => {
                            print_session(&session);
                            if pipeline.is_sending(session.id) {
                                println!("{}", "(waiting for reply...)".bright_black());
                            }
                        }
                        None => println!("{}", "No active chat.".bright_black()),
                    },
                    Command::Help => print_help(),
                    Command::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Command::Invalid(message) => println!("{}", message.yellow()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    drop(outcome_tx);
    reporter.abort();

    if store.flush() {
        tracing::info!("[Shutdown] Flushed pending chat save");
    }

    Ok(())
}
