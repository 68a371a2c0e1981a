use std::fmt::Write as _;
use tabsplit_application::{HistoryEntry, HistoryEvent};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub struct HistoryPresenter;

impl HistoryPresenter {
    pub fn render(entries: &[HistoryEntry]) -> String {
        if entries.is_empty() {
            return "No activity yet.\n".to_owned();
        }

        let mut reply = String::with_capacity(entries.len() * 48);
        for entry in entries {
            let _ = writeln!(
                &mut reply,
                "{}  {}",
                entry.created_at.format(TIMESTAMP_FORMAT),
                Self::describe(&entry.event)
            );
        }
        reply
    }

    pub fn describe(event: &HistoryEvent) -> String {
        match event {
            HistoryEvent::ExpenseAdded {
                title,
                amount,
                paid_by: Some(payer),
            } => format!("{payer} added \"{title}\" ({amount})"),
            HistoryEvent::ExpenseAdded { title, amount, .. } => {
                format!("expense \"{title}\" added ({amount})")
            }
            HistoryEvent::ExpenseDeleted {
                expense_id,
                by,
                title,
            } => {
                let subject = match title {
                    Some(title) => format!("\"{title}\""),
                    None => format!("expense {expense_id}"),
                };
                match by {
                    Some(member) => format!("{member} deleted {subject}"),
                    None => format!("{subject} deleted"),
                }
            }
            HistoryEvent::SettlementRecorded { from, to, amount } => {
                format!("{from} paid {to} {amount}")
            }
        }
    }
}
