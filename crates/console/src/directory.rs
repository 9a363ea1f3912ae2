//! Ticket directory client
//!
//! Reads the ticket list from the directory service and narrows it to the
//! tickets that are waiting on a customer reply.

use std::time::Duration;

use deskline_shared::Ticket;
use reqwest::Client;
use serde::Deserialize;

/// Error type for ticket directory operations
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Directory returned status {0}")]
    Status(u16),

    #[error("Directory reported an unsuccessful response")]
    Unsuccessful,
}

/// Response body of `GET /api/tickets`
#[derive(Debug, Deserialize)]
struct TicketsListResponse {
    success: bool,
    #[serde(default)]
    tickets: Vec<serde_json::Value>,
}

/// Client for the external ticket directory
#[derive(Clone)]
pub struct TicketDirectory {
    http_client: Client,
    base_url: String,
}

impl TicketDirectory {
    /// Create a directory client for `base_url` (e.g. `http://localhost:3000`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http_client, base_url))
    }

    /// Create a directory client around an existing HTTP client
    pub fn with_client(http_client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
        }
    }

    /// Fetch every ticket the directory knows about, in directory order
    pub async fn fetch_tickets(&self) -> Result<Vec<Ticket>, DirectoryError> {
        let url = format!("{}/api/tickets", self.base_url);
        let response = self.http_client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let body: TicketsListResponse = response.json().await?;
        if !body.success {
            return Err(DirectoryError::Unsuccessful);
        }

        let tickets = decode_tickets(body.tickets);
        tracing::debug!(count = tickets.len(), "Fetched tickets from directory");
        Ok(tickets)
    }

    /// Tickets waiting for a customer response, newest first
    ///
    /// Failures are logged and yield an empty list.
    pub async fn list_waiting_tickets(&self) -> Vec<Ticket> {
        match self.fetch_tickets().await {
            Ok(tickets) => waiting_tickets(tickets),
            Err(e) => {
                tracing::error!(error = %e, base_url = %self.base_url, "Error fetching tickets");
                Vec::new()
            }
        }
    }
}

/// Decode each ticket on its own, skipping malformed entries
fn decode_tickets(raw: Vec<serde_json::Value>) -> Vec<Ticket> {
    raw.into_iter()
        .filter_map(|value| {
            let ticket_id = value
                .get("ticketId")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            match serde_json::from_value::<Ticket>(value) {
                Ok(ticket) => Some(ticket),
                Err(e) => {
                    tracing::warn!(ticket_id = ?ticket_id, error = %e, "Skipping malformed ticket");
                    None
                }
            }
        })
        .collect()
}

/// Keep tickets waiting for a response and order them by creation time, newest first
///
/// The sort is stable, so tickets created at the same instant keep directory order.
pub fn waiting_tickets(tickets: Vec<Ticket>) -> Vec<Ticket> {
    let mut waiting: Vec<Ticket> = tickets
        .into_iter()
        .filter(Ticket::is_waiting_for_response)
        .collect();
    waiting.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    waiting
}
