//! Ticket statistics for the administrator dashboard

use crate::types::{Ticket, TicketStatus};
use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Days covered by the activity series, ending today
pub const TREND_DAYS: i64 = 7;

/// A labelled count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub value: usize,
}

/// Tickets created on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    /// `DD/MM`
    pub date: String,
    /// `YYYY-MM-DD`
    pub full_date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub rejected: usize,
    /// Completed share of all tickets, as a rounded percentage
    pub approval_rate: u32,
    /// Ticket count per type, in order of first appearance
    pub by_type: Vec<NamedCount>,
    /// Non-zero status counts
    pub by_status: Vec<NamedCount>,
    pub last_7_days: Vec<DailyCount>,
}

impl DashboardStats {
    pub fn from_tickets(tickets: &[Ticket], today: NaiveDate) -> Self {
        let count = |status: TicketStatus| tickets.iter().filter(|t| t.status == status).count();

        let total = tickets.len();
        let pending = count(TicketStatus::Pending);
        let in_progress = count(TicketStatus::InProgress);
        let completed = count(TicketStatus::Completed);
        let rejected = count(TicketStatus::Rejected);

        let approval_rate = if total > 0 {
            (completed as f64 / total as f64 * 100.0).round() as u32
        } else {
            0
        };

        let mut by_type: Vec<NamedCount> = Vec::new();
        for ticket in tickets {
            match by_type.iter_mut().find(|c| c.name == ticket.kind) {
                Some(entry) => entry.value += 1,
                None => by_type.push(NamedCount {
                    name: ticket.kind.clone(),
                    value: 1,
                }),
            }
        }

        let by_status = [
            (TicketStatus::Completed, completed),
            (TicketStatus::InProgress, in_progress),
            (TicketStatus::Pending, pending),
            (TicketStatus::Rejected, rejected),
        ]
        .into_iter()
        .filter(|(_, value)| *value > 0)
        .map(|(status, value)| NamedCount {
            name: status.as_str().to_string(),
            value,
        })
        .collect();

        let last_7_days = (0..TREND_DAYS)
            .rev()
            .map(|offset| {
                let day = today - Duration::days(offset);
                let full_date = day.format("%Y-%m-%d").to_string();
                DailyCount {
                    date: day.format("%d/%m").to_string(),
                    count: tickets.iter().filter(|t| t.date_created == full_date).count(),
                    full_date,
                }
            })
            .collect();

        Self {
            total,
            pending,
            in_progress,
            completed,
            rejected,
            approval_rate,
            by_type,
            by_status,
            last_7_days,
        }
    }
}
