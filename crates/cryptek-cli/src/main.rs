//! cryptek: interactive terminal client for the Cryptek chat server.
//!
//! Connects as one wallet address, prints chat events as they arrive, and
//! turns stdin lines into chat requests.

mod cli;
mod commands;
mod display;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use cryptek_common::ConfigError;
use cryptek_config::{
    apply_env_overrides, toml_loader, validation, CryptekConfig, LogLevel, RealtimeSection,
};
use cryptek_realtime::protocol::{ChatMessage, ChatRoom, ConnectedPayload, ErrorPayload};
use cryptek_realtime::{events, ChatSession, ConnectionManager, ManagerConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;
use crate::commands::{Command, HELP};

/// Resolve configuration: file, then `CRYPTEK_WS_URL`, then `--url`.
fn load_config(args: &Args) -> Result<CryptekConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => toml_loader::load_from_path(path)?,
        None => toml_loader::load_default()?,
    };
    apply_env_overrides(&mut config);
    if let Some(url) = &args.url {
        config.realtime.url = url.clone();
    }
    validation::validate(&config)?;
    Ok(config)
}

/// Build the log filter. `RUST_LOG` replaces the configured default
/// entirely; `--log-level` is applied last and wins for its target. A bare
/// level (`debug`) targets every `cryptek*` crate, anything containing `=`
/// is taken as a full directive.
fn log_filter(cli_level: Option<&str>, rust_log: Option<&str>, config_level: LogLevel) -> EnvFilter {
    let mut filter = match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(env) => EnvFilter::new(env),
        None => EnvFilter::new(format!("cryptek={}", config_level.as_filter())),
    };

    if let Some(level) = cli_level {
        let directive = if level.contains('=') {
            level.to_string()
        } else {
            format!("cryptek={level}")
        };
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("cryptek: ignoring --log-level {level:?}: {e}"),
        }
    }
    filter
}

fn init_logging(args: &Args, config: &CryptekConfig) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(args.log_level.as_deref(), rust_log.as_deref(), config.logging.level);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn manager_config(section: &RealtimeSection) -> ManagerConfig {
    ManagerConfig {
        url: section.url.clone(),
        max_reconnect_attempts: section.max_reconnect_attempts,
        reconnect_delay: Duration::from_millis(section.reconnect_delay_ms),
        connect_timeout: Duration::from_secs(section.connect_timeout_secs),
    }
}

/// Print connection and chat events to stdout.
fn print_events(manager: &ConnectionManager) {
    manager.on(events::CONNECTED, |payload| {
        match serde_json::from_value::<ConnectedPayload>(payload.clone()) {
            Ok(p) => println!("-- connected as {}", p.user_address),
            Err(_) => println!("-- connected"),
        }
    });
    manager.on(events::DISCONNECTED, |payload| {
        println!("{}", display::disconnected_line(payload));
    });
    manager.on(events::ERROR, |payload| {
        if let Ok(p) = serde_json::from_value::<ErrorPayload>(payload.clone()) {
            println!("-- error: {}", p.error);
        }
    });
    manager.on(events::NEW_MESSAGE, |payload| {
        if let Ok(msg) = serde_json::from_value::<ChatMessage>(payload.clone()) {
            println!("{}", display::message_line(&msg));
        }
    });
    manager.on(events::CHAT_CREATED, |payload| {
        if let Ok(room) = serde_json::from_value::<ChatRoom>(payload.clone()) {
            println!("-- chat created: {}", display::chat_line(&room, false));
        }
    });
}

/// Apply one command. Returns false when the user asked to quit.
fn execute(session: &ChatSession, command: Command) -> bool {
    match command {
        Command::Empty => {}
        Command::Help => println!("{HELP}"),
        Command::Quit => return false,
        Command::Create { participant, name } => {
            if !session.create_chat(&participant, name.as_deref()) {
                println!("-- not connected, chat not created");
            }
        }
        Command::Join(chat_id) => {
            if session.join_chat(&chat_id) {
                session.select_chat(Some(chat_id));
            } else {
                println!("-- not connected, cannot join");
            }
        }
        Command::Select(chat_id) => {
            println!("-- selected {chat_id}");
            session.select_chat(Some(chat_id));
        }
        Command::Chats => {
            let state = session.state_snapshot();
            if state.chats.is_empty() {
                println!("-- no chats yet");
            }
            for room in &state.chats {
                let selected = state.selected_chat.as_deref() == Some(room.id.as_str());
                println!("{}", display::chat_line(room, selected));
            }
        }
        Command::Public(text) => send(session, &text, false),
        Command::Message(text) => send(session, &text, true),
    }
    true
}

fn send(session: &ChatSession, text: &str, encrypted: bool) {
    if session.selected_chat().is_none() {
        println!("-- select a chat first (/select <chatId>)");
        return;
    }
    if !session.send_to_selected(text, encrypted) {
        println!("-- not connected, message not sent");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("cryptek: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&args, &config);
    tracing::info!(url = %config.realtime.url, address = %args.address, "starting cryptek");

    let manager = Arc::new(ConnectionManager::new(manager_config(&config.realtime)));
    print_events(&manager);
    let session = ChatSession::new(Arc::clone(&manager));
    session.start(args.address.as_str());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Ok(command) => {
                        if !execute(&session, command) {
                            break;
                        }
                    }
                    Err(e) => println!("-- {e}"),
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read stdin");
                    break;
                }
            },
        }
    }

    session.stop();
    tracing::info!("cryptek exiting");
    ExitCode::SUCCESS
}
