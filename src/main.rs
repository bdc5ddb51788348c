//! agendacx daemon entry point
//!
//! Wires the configured components together and feeds the dispatcher from
//! stdin, one `chat_id: message` line per turn (`chat_id:: data` injects a
//! callback). Production transports replace this loop and call the same
//! dispatcher entry points.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use agendacx::calendar::HttpCalendarClient;
use agendacx::channel::{ChannelError, ChannelSender, Keyboard, RetryingSender};
use agendacx::cli::{Cli, Command};
use agendacx::config::Config;
use agendacx::llm::OpenAiClient;
use agendacx::session::TurnEngine;
use agendacx::store::{RecordStore, SqliteStore};
use agendacx::teams::{FixedTeamResolver, MemoryDirectory};
use agendacx::Dispatcher;

/// Sender that prints replies to stdout, for the line-based harness
struct StdoutSender;

#[async_trait]
impl ChannelSender for StdoutSender {
    async fn send(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> Result<(), ChannelError> {
        println!("[{chat_id}] {text}");
        if let Some(keyboard) = keyboard {
            for row in &keyboard.rows {
                let labels: Vec<&str> = row.iter().map(|b| b.label.as_str()).collect();
                println!("[{chat_id}] botones: {}", labels.join(" | "));
            }
        }
        Ok(())
    }
}

fn setup_logging(verbose: u8) {
    let default = match verbose {
        0 => "agendacx=info",
        1 => "agendacx=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run) {
        Command::CheckConfig => {
            config.validate()?;
            println!("configuration ok");
            Ok(())
        }
        Command::Run => run(config).await,
    }
}

async fn run(config: Config) -> Result<()> {
    let model = Arc::new(OpenAiClient::from_config(&config.llm).wrap_err("initializing model client")?);
    let calendar = Arc::new(HttpCalendarClient::from_config(&config.calendar).wrap_err("initializing calendar client")?);
    let store = Arc::new(SqliteStore::open(&config.storage.path).wrap_err("opening record store")?);
    let sender = Arc::new(RetryingSender::with_policy(
        StdoutSender,
        config.channel.max_attempts,
        Duration::from_millis(config.channel.base_delay_ms),
    ));
    let teams = Arc::new(FixedTeamResolver(config.team.default_team));
    let directory = Arc::new(MemoryDirectory::new());

    let engine = Arc::new(TurnEngine::new(
        model,
        store.clone(),
        calendar,
        sender.clone(),
        teams,
        directory,
    ));
    let dispatcher = Arc::new(Dispatcher::new(engine));

    tokio::spawn(reminder_sweep(store, sender));

    info!("agendacx listening on stdin, lines of \"chat_id: message\"");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some((chat, rest)) = parse_line(&line) else {
            warn!(line, "Ignoring malformed line");
            continue;
        };

        let dispatcher = dispatcher.clone();
        // turns for different chats run concurrently; the session lock
        // serializes turns within one chat
        tokio::spawn(async move {
            let result = match rest {
                Inbound::Message(text) => dispatcher.handle_inbound_message(chat, &text).await,
                Inbound::Callback(data) => dispatcher.handle_callback(chat, &data).await,
            };
            if let Err(e) = result {
                warn!(chat_id = chat, error = %e, "Turn failed");
            }
        });
    }

    Ok(())
}

/// Periodic reminder pass: one message per record scheduled within the next
/// 24 hours that has not been reminded yet
async fn reminder_sweep(store: Arc<dyn RecordStore>, sender: Arc<dyn ChannelSender>) {
    let mut tick = tokio::time::interval(Duration::from_secs(600));
    loop {
        tick.tick().await;
        let now = chrono::Utc::now().naive_utc();
        let due = match store.reminders_due(now).await {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "Reminder query failed");
                continue;
            }
        };
        for record in due {
            let Some(id) = record.id else { continue };
            let when = record
                .scheduled_at
                .map(|dt| dt.format("%d/%m %H:%M").to_string())
                .unwrap_or_default();
            let text = format!(
                "⏰ Recordatorio: {} el {}.",
                record.procedure.as_deref().unwrap_or("cirugía"),
                when
            );
            if sender.send(record.chat_id, &text, None).await.is_ok()
                && let Err(e) = store.mark_reminder_sent(id, now).await
            {
                warn!(record_id = id, error = %e, "Could not mark reminder as sent");
            }
        }
    }
}

enum Inbound {
    Message(String),
    Callback(String),
}

fn parse_line(line: &str) -> Option<(i64, Inbound)> {
    if let Some((chat, data)) = line.split_once("::") {
        let chat = chat.trim().parse().ok()?;
        return Some((chat, Inbound::Callback(data.trim().to_string())));
    }
    let (chat, text) = line.split_once(':')?;
    let chat = chat.trim().parse().ok()?;
    Some((chat, Inbound::Message(text.trim().to_string())))
}
