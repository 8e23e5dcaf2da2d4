// SPDX-FileCopyrightText: 2026 Barangay Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `barangay shell` command implementation.
//!
//! An interactive REPL acting as one resident or one staff member against
//! the configured store. Live feed updates are printed as they arrive while
//! readline keeps the prompt on its own thread.

use std::sync::Arc;

use barangay_bot::BotResponder;
use barangay_chat::{
    ClaimOutcome, EscalationCoordinator, EscalationOutcome, FeedUpdate, InboxEntry,
    RenderedMessage, ResidentChatView, SessionResolver, StaffConsole, StoreResidentDirectory,
    StoreStaffDirectory, TransferOutcome, report,
};
use barangay_config::model::BarangayConfig;
use barangay_core::{
    BarangayError, ConversationId, ConversationStatus, Identity, Notice, NoticeKind,
    PluginAdapter, Sender,
};
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::Role;

/// A command typed by a resident.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ResidentCommand {
    Say(String),
    TalkToStaff,
    NewConversation,
    Help,
    Quit,
    Nothing,
}

fn parse_resident(line: &str) -> ResidentCommand {
    let line = line.trim();
    match line {
        "" => ResidentCommand::Nothing,
        "/staff" => ResidentCommand::TalkToStaff,
        "/new" => ResidentCommand::NewConversation,
        "/help" => ResidentCommand::Help,
        "/quit" | "/exit" => ResidentCommand::Quit,
        text => ResidentCommand::Say(text.to_string()),
    }
}

/// A command typed by a staff member.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StaffCommand {
    Say(String),
    Inbox,
    Open(ConversationId),
    Claim(Option<ConversationId>),
    Transfer { target: String, reason: Option<String> },
    Accept,
    Reject,
    Resolve(Option<String>),
    Reopen,
    Close,
    Help,
    Quit,
    Nothing,
    Unknown(String),
}

fn parse_staff(line: &str) -> StaffCommand {
    let line = line.trim();
    if line.is_empty() {
        return StaffCommand::Nothing;
    }
    let Some(command) = line.strip_prefix('/') else {
        return StaffCommand::Say(line.to_string());
    };
    let (verb, rest) = match command.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (command, ""),
    };
    let arg = (!rest.is_empty()).then(|| rest.to_string());
    match verb {
        "inbox" => StaffCommand::Inbox,
        "open" => match arg {
            Some(id) => StaffCommand::Open(ConversationId(id)),
            None => StaffCommand::Unknown("usage: /open <conversation id>".into()),
        },
        "claim" => StaffCommand::Claim(arg.map(ConversationId)),
        "transfer" => match rest.split_once(char::is_whitespace) {
            Some((target, reason)) => StaffCommand::Transfer {
                target: target.to_string(),
                reason: Some(reason.trim().to_string()),
            },
            None if !rest.is_empty() => StaffCommand::Transfer {
                target: rest.to_string(),
                reason: None,
            },
            None => StaffCommand::Unknown("usage: /transfer <staff uid> [reason]".into()),
        },
        "accept" => StaffCommand::Accept,
        "reject" => StaffCommand::Reject,
        "resolve" => StaffCommand::Resolve(arg),
        "reopen" => StaffCommand::Reopen,
        "close" => StaffCommand::Close,
        "help" => StaffCommand::Help,
        "quit" | "exit" => StaffCommand::Quit,
        other => StaffCommand::Unknown(format!("unknown command /{other}; try /help")),
    }
}

/// Readline on a dedicated thread, lines delivered over a channel.
///
/// A plain thread rather than a blocking task so the runtime can shut down
/// while readline is still waiting for input.
fn spawn_reader(prompt: String) -> Result<mpsc::Receiver<String>, BarangayError> {
    let mut rl = DefaultEditor::new()
        .map_err(|e| BarangayError::Internal(format!("failed to initialize readline: {e}")))?;
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = rl.add_history_entry(&line);
                    }
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("{}: {e}", "error".red());
                    break;
                }
            }
        }
    });
    Ok(rx)
}

fn sender_label(sender: Sender) -> colored::ColoredString {
    match sender {
        Sender::User => "resident".blue().bold(),
        Sender::Bot => "bot".cyan().bold(),
        Sender::Staff => "staff".green().bold(),
        Sender::System => "system".dimmed(),
    }
}

fn format_message(message: &RenderedMessage) -> String {
    let at = message
        .timestamp
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".into());
    let mut line = format!("{} {}: {}", at.dimmed(), sender_label(message.sender), message.text);
    if message.escalation_offer {
        line.push_str(&format!("\n      {}", "(type /staff to talk to a staff member)".yellow()));
    }
    line
}

fn format_update(update: &FeedUpdate) -> Option<String> {
    Some(match update {
        FeedUpdate::HistoryLoaded(items) if items.is_empty() => return None,
        FeedUpdate::HistoryLoaded(items) => items
            .iter()
            .map(format_message)
            .collect::<Vec<_>>()
            .join("\n"),
        FeedUpdate::MessageAppended { message, .. } => format_message(message),
        FeedUpdate::StatusChanged(status) => format!("[conversation is now {status}]").dimmed().to_string(),
        FeedUpdate::ComposerChanged { enabled: false } => "(sending is disabled)".dimmed().to_string(),
        FeedUpdate::ComposerChanged { enabled: true } => return None,
        FeedUpdate::Resolved(card) => {
            let by = card.resolved_by.as_deref().unwrap_or("staff");
            format!(
                "{}\n  {}\n  {}",
                "── resolved ──".bold(),
                card.note,
                format!("by {by}").dimmed()
            )
        }
        FeedUpdate::Reopened => "[conversation reopened]".yellow().to_string(),
        FeedUpdate::TransferPending(request) => format!(
            "{} {} asks for a {}{}. /accept or /reject",
            "transfer:".magenta().bold(),
            request.from,
            request.kind,
            request
                .reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default()
        ),
        FeedUpdate::NotificationChanged(true) => "(new message)".yellow().to_string(),
        FeedUpdate::NotificationChanged(false) => return None,
        FeedUpdate::ConversationGone => "[this conversation no longer exists]".red().to_string(),
    })
}

fn print_update(update: &FeedUpdate) {
    if let Some(text) = format_update(update) {
        println!("{text}");
    }
}

fn print_notice(notice: &Notice) {
    let text = match notice.kind {
        NoticeKind::Info => notice.text.normal(),
        NoticeKind::Warning => notice.text.yellow(),
        NoticeKind::Error => notice.text.red(),
    };
    println!("{text}");
}

fn format_inbox(rows: &[InboxEntry]) -> String {
    if rows.is_empty() {
        return "inbox is empty".dimmed().to_string();
    }
    rows.iter()
        .map(|row| {
            let c = &row.conversation;
            let status = match c.status {
                ConversationStatus::Waiting => c.status.to_string().yellow().bold(),
                _ => c.status.to_string().normal(),
            };
            let unread = if c.unread_staff { "●" } else { " " };
            let transfer = if row.transfer_for_me.is_some() { " [transfer for you]" } else { "" };
            format!(
                "{unread} {} {status:<8} {:<20} {}{}",
                c.id,
                c.resident_name,
                c.last_message.as_ref().map(|m| m.text.as_str()).unwrap_or(""),
                transfer.magenta()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn run_shell(config: BarangayConfig, role: Role, who: &str) -> Result<(), BarangayError> {
    let store = barangay_storage::open_store(&config.storage, config.chat.subscription_buffer).await?;
    let staff = Arc::new(StoreStaffDirectory::new(store.clone()));
    let residents = Arc::new(StoreResidentDirectory::new(store.clone()));
    let coordinator = Arc::new(EscalationCoordinator::new(
        store.clone(),
        staff,
        BotResponder::new(config.bot.clone()),
        config.chat.clone(),
    ));
    let sessions = Arc::new(SessionResolver::new(store.clone(), residents));
    info!(store = store.name(), role = ?role, "shell starting");

    println!("{}", config.portal.name.bold().green());
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    let result = match role {
        Role::Resident => resident_shell(coordinator, sessions, who).await,
        Role::Staff => staff_shell(coordinator, who).await,
    };
    store.shutdown().await?;
    println!("{}", "goodbye".dimmed());
    result
}

async fn resident_shell(
    coordinator: Arc<EscalationCoordinator>,
    sessions: Arc<SessionResolver>,
    email: &str,
) -> Result<(), BarangayError> {
    let identity = Identity::new(email, email);
    let mut view = ResidentChatView::attach(coordinator, sessions, identity, true).await?;
    let mut lines = spawn_reader(format!("{}> ", "you".blue()))?;

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                match parse_resident(&line) {
                    ResidentCommand::Quit => break,
                    ResidentCommand::Nothing => {}
                    ResidentCommand::Help => println!(
                        "type a message to send it\n/staff  talk to a staff member\n/new    start a new conversation after resolution\n/quit   exit"
                    ),
                    ResidentCommand::Say(text) => {
                        if let Err(e) = view.send_resident_message(&text).await {
                            print_notice(&report("send", &e));
                        }
                    }
                    ResidentCommand::TalkToStaff => match view.accept_escalation_offer().await {
                        Ok(EscalationOutcome::Escalated) => {}
                        Ok(EscalationOutcome::AlreadyEscalated(status)) => {
                            println!("{}", format!("already with staff ({status})").dimmed());
                        }
                        Err(e) => print_notice(&report("talk to staff", &e)),
                    },
                    ResidentCommand::NewConversation => {
                        match view.start_new_conversation_after_resolution().await {
                            Ok(id) => debug!(conversation_id = %id, "switched conversation"),
                            Err(e) => print_notice(&report("start a new conversation", &e)),
                        }
                    }
                }
            }
            update = view.next_update() => match update {
                Some(update) => print_update(&update),
                None => break,
            },
        }
    }
    view.detach().await;
    Ok(())
}

async fn staff_shell(coordinator: Arc<EscalationCoordinator>, uid: &str) -> Result<(), BarangayError> {
    let mut console = StaffConsole::sign_in(coordinator, uid).await?;
    let mut inbox = console.inbox().await?;
    let mut lines = spawn_reader(format!("{}> ", uid.green()))?;

    loop {
        tokio::select! {
            line = lines.recv() => {
                let Some(line) = line else { break };
                if !staff_command(&mut console, &inbox.rows(), parse_staff(&line)).await {
                    break;
                }
            }
            update = console.next_update(), if console.current().is_some() => match update {
                Some(update) => print_update(&update),
                None => console.close().await,
            },
            changed = inbox.changed() => {
                if !changed {
                    break;
                }
                let rows = inbox.rows();
                let waiting = rows
                    .iter()
                    .filter(|r| r.conversation.status == ConversationStatus::Waiting)
                    .count();
                debug!(rows = rows.len(), waiting, "inbox changed");
            }
        }
    }
    inbox.detach().await;
    console.sign_out().await;
    Ok(())
}

/// Run one staff command. Returns false to leave the shell.
async fn staff_command(console: &mut StaffConsole, rows: &[InboxEntry], command: StaffCommand) -> bool {
    if command == StaffCommand::Quit {
        return false;
    }
    let current = console.current().cloned();
    let open = || {
        current.clone().ok_or_else(|| {
            BarangayError::InputRejected("Open a conversation first with /open <id>.".into())
        })
    };

    let result: Result<(), BarangayError> = async {
        match command {
            StaffCommand::Quit | StaffCommand::Nothing => {}
            StaffCommand::Help => println!(
                "/inbox  /open <id>  /claim [id]  /transfer <uid> [reason]\n/accept  /reject  /resolve [note]  /reopen  /close  /quit\nanything else is sent to the open conversation"
            ),
            StaffCommand::Unknown(message) => println!("{}", message.dimmed()),
            StaffCommand::Inbox => println!("{}", format_inbox(rows)),
            StaffCommand::Open(id) => console.open(&id).await?,
            StaffCommand::Close => console.close().await,
            StaffCommand::Claim(id) => {
                let id = match id {
                    Some(id) => id,
                    None => open()?,
                };
                match console.claim(&id).await? {
                    ClaimOutcome::Claimed => {
                        if console.current() != Some(&id) {
                            console.open(&id).await?;
                        }
                    }
                    ClaimOutcome::AlreadyClaimed { by } => println!(
                        "{}",
                        format!("already claimed by {}", by.as_deref().unwrap_or("someone")).yellow()
                    ),
                }
            }
            StaffCommand::Say(text) => {
                if console.send(&open()?, &text).await?.is_none() {
                    println!("{}", "(still sending, try again)".dimmed());
                }
            }
            StaffCommand::Transfer { target, reason } => {
                match console.request_transfer(&open()?, &target, reason.as_deref()).await? {
                    TransferOutcome::Requested(r) => println!("{}", format!("asked {} for a {}", r.to, r.kind).dimmed()),
                    TransferOutcome::Superseded => println!("{}", "the conversation changed; try again".yellow()),
                    _ => {}
                }
            }
            StaffCommand::Accept => {
                if let TransferOutcome::Superseded = console.accept_transfer(&open()?).await? {
                    println!("{}", "the transfer was withdrawn".yellow());
                }
            }
            StaffCommand::Reject => {
                if let TransferOutcome::Superseded = console.reject_transfer(&open()?).await? {
                    println!("{}", "the transfer was withdrawn".yellow());
                }
            }
            StaffCommand::Resolve(note) => console.resolve(&open()?, note.as_deref()).await?,
            StaffCommand::Reopen => console.reopen(&open()?).await?,
        }
        Ok(())
    }
    .await;

    if let Err(e) = result {
        print_notice(&report("staff command", &e));
    }
    true
}
