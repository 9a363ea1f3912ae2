//! Deskline support console
//!
//! Lists tickets waiting on a customer reply and runs one live chat at a time
//! from the terminal.

use std::sync::Arc;
use std::time::Duration;

use deskline_console::channel::{ChannelConnection, ChannelSession, InboundMessage, ServerEvent};
use deskline_console::{
    telemetry, Config, FileTranscriptCache, SessionCoordinator, TicketDirectory,
};
use deskline_shared::{Message, Ticket};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const CLOCK: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]:[second]");
const DATE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// A line typed by the agent
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Open(String),
    Close,
    Minimize,
    Rejoin,
    List,
    Back,
    Send(String),
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Some(Command::Send(line.to_string()));
        };

        let (name, arg) = rest.split_once(' ').unwrap_or((rest, ""));
        match (name, arg.trim()) {
            ("open", id) if !id.is_empty() => Some(Command::Open(id.to_string())),
            ("close", _) => Some(Command::Close),
            ("min", _) => Some(Command::Minimize),
            ("rejoin", _) => Some(Command::Rejoin),
            ("list", _) => Some(Command::List),
            ("back", _) | ("quit", _) => Some(Command::Back),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    telemetry::init(config.log_format);

    tracing::info!(api_url = %config.api_url, channel_url = %config.channel_url, "Starting Deskline console");

    let directory = TicketDirectory::new(
        config.api_url.as_str(),
        Duration::from_millis(config.request_timeout_ms),
    )?;
    let tickets = directory.list_waiting_tickets().await;
    print_tickets(&tickets);

    let (connection, mut events) = match ChannelConnection::connect(&config.channel_url).await {
        Ok((connection, events)) => (connection, Some(events)),
        Err(e) => {
            tracing::error!(error = %e, "Chat channel unavailable");
            println!("! Chat is unavailable: {e}");
            // Emits on a queue with no writer fail, which surfaces as notices
            let (tx, _) = mpsc::unbounded_channel();
            (ChannelConnection::new(tx), None)
        }
    };

    let channel = ChannelSession::new(Arc::new(connection));
    let cache = Arc::new(FileTranscriptCache::new(config.transcript_dir.clone()));
    let mut coordinator = SessionCoordinator::new(channel, cache, config.inbound_persistence);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to read input");
                        break;
                    }
                };

                match Command::parse(&line) {
                    Some(Command::Back) => break,
                    Some(command) => run_command(command, &mut coordinator, &tickets),
                    None => println!("? Commands: /open <ticket>, /close, /min, /rejoin, /list, /back"),
                }
            }
            event = next_event(&mut events) => {
                match event {
                    Some(event) => {
                        if let Some(message) = visible_inbound(&mut coordinator, event) {
                            print_inbound(&message);
                        }
                    }
                    None => {
                        events = None;
                        coordinator.connection_lost();
                    }
                }
            }
        }

        for notice in coordinator.take_notices() {
            println!("! {notice}");
        }
    }

    coordinator.deselect_ticket();
    Ok(())
}

fn run_command(command: Command, coordinator: &mut SessionCoordinator, tickets: &[Ticket]) {
    match command {
        Command::Open(id) => match tickets.iter().find(|t| t.ticket_id == id) {
            Some(ticket) => {
                coordinator.select_ticket(ticket);
                println!("== Support Chat - Ticket {} ==", ticket.ticket_id);
                if let Some(transcript) = coordinator.transcript() {
                    transcript.iter().for_each(print_message);
                }
            }
            None => println!("? No waiting ticket {id}"),
        },
        Command::Close => coordinator.deselect_ticket(),
        Command::Minimize => {
            if coordinator.active_ticket().is_some() {
                if coordinator.toggle_minimized() {
                    println!("(chat minimized)");
                } else {
                    println!("(chat expanded)");
                    if let Some(transcript) = coordinator.transcript() {
                        transcript.iter().for_each(print_message);
                    }
                }
            }
        }
        Command::Rejoin => {
            let _ = coordinator.rejoin();
        }
        Command::List => print_tickets(tickets),
        Command::Send(text) => {
            if coordinator.active_ticket().is_none() {
                println!("? Open a ticket first");
                return;
            }
            if let Ok(Some(message)) = coordinator.send_outbound(&text) {
                print_message(&message);
            }
        }
        Command::Back => {}
    }
}

/// Route a channel event and return it for display unless the chat is minimized
///
/// Messages arriving while minimized are still recorded in the transcript.
fn visible_inbound(
    coordinator: &mut SessionCoordinator,
    event: ServerEvent,
) -> Option<InboundMessage> {
    let message = coordinator.handle_event(event)?;
    (!coordinator.is_minimized()).then_some(message)
}

async fn next_event(events: &mut Option<mpsc::UnboundedReceiver<ServerEvent>>) -> Option<ServerEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

fn print_tickets(tickets: &[Ticket]) {
    println!("Tickets Waiting for Customer Response");
    if tickets.is_empty() {
        println!("No tickets are currently waiting for customer response.");
        return;
    }

    println!(
        "{:<12} {:<28} {:<22} {:<28} {:<17} {:<17} {:<16} {}",
        "Ticket ID", "Issue", "Status", "User Message", "Created At", "Updated At", "User", "Mobile Number"
    );
    for ticket in tickets {
        println!(
            "{:<12} {:<28} {:<22} {:<28} {:<17} {:<17} {:<16} {}",
            ticket.ticket_id,
            ticket.issue,
            ticket.status.as_str(),
            ticket.user_message_or_default(),
            format_time(ticket.created_at, DATE_TIME),
            format_time(ticket.updated_at, DATE_TIME),
            ticket.user_name_or_default(),
            ticket.mobile_number_or_default(),
        );
    }
}

fn print_inbound(message: &InboundMessage) {
    let time = message
        .time
        .map(|t| format_time(t, CLOCK))
        .unwrap_or_default();
    println!("[{time}] {}: {}", message.role, message.text);
}

fn print_message(message: &Message) {
    let time = message
        .time
        .map(|t| format_time(t, CLOCK))
        .unwrap_or_default();
    println!("[{time}] {}: {}", message.sender, message.text);
}

fn format_time(t: OffsetDateTime, format: &[BorrowedFormatItem<'_>]) -> String {
    t.format(format).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskline_console::channel::events::InboundPayload;
    use deskline_console::channel::ClientEvent;
    use deskline_console::{InboundPersistence, MemoryTranscriptCache};
    use deskline_shared::TicketStatus;
    use time::macros::datetime;

    fn coordinator() -> (mpsc::UnboundedReceiver<ClientEvent>, SessionCoordinator) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = ChannelSession::new(Arc::new(ChannelConnection::new(tx)));
        let coordinator = SessionCoordinator::new(
            channel,
            Arc::new(MemoryTranscriptCache::new()),
            InboundPersistence::Skip,
        );
        (rx, coordinator)
    }

    fn user_event(text: &str) -> ServerEvent {
        ServerEvent::UserMessage(InboundPayload {
            ticket_id: "T1".to_string(),
            message: text.to_string(),
            timestamp: None,
        })
    }

    #[test]
    fn test_minimized_chat_hides_but_records_inbound() {
        let (_rx, mut coordinator) = coordinator();
        coordinator.select_ticket(&Ticket {
            ticket_id: "T1".to_string(),
            issue: "Refund".to_string(),
            status: TicketStatus::WaitingForResponse,
            user_message: None,
            created_at: datetime!(2024-05-01 09:00:00 UTC),
            updated_at: datetime!(2024-05-01 09:00:00 UTC),
            user_name: None,
            mobile_number: None,
        });

        assert!(visible_inbound(&mut coordinator, user_event("shown")).is_some());

        assert!(coordinator.toggle_minimized());
        assert!(visible_inbound(&mut coordinator, user_event("hidden")).is_none());
        assert_eq!(coordinator.transcript().unwrap().last().unwrap().text, "hidden");

        assert!(!coordinator.toggle_minimized());
        assert!(visible_inbound(&mut coordinator, user_event("shown again")).is_some());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/open TCK-1"), Some(Command::Open("TCK-1".to_string())));
        assert_eq!(Command::parse("/close"), Some(Command::Close));
        assert_eq!(Command::parse("/min"), Some(Command::Minimize));
        assert_eq!(Command::parse("/back"), Some(Command::Back));
        assert_eq!(Command::parse("/open"), None);
        assert_eq!(Command::parse("/unknown"), None);
    }

    #[test]
    fn test_plain_text_is_sent_verbatim() {
        assert_eq!(
            Command::parse(" hello there "),
            Some(Command::Send(" hello there ".to_string()))
        );
        assert_eq!(Command::parse(""), Some(Command::Send(String::new())));
    }
}
