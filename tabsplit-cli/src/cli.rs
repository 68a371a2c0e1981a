use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use std::{path::PathBuf, str::FromStr};
use tabsplit_domain::{MemberId, Money};

#[derive(Debug, Parser)]
#[command(name = "tabsplit", about = "Shared expense ledger for small groups")]
pub struct Cli {
    /// Realtime-database export holding the groups.
    #[arg(long, env = "TABSPLIT_SNAPSHOT", default_value = "tabsplit.json")]
    pub snapshot: PathBuf,

    /// Group to operate on.
    #[arg(long, short, env = "TABSPLIT_GROUP")]
    pub group: String,

    /// Log filter directive, e.g. "debug" or "tabsplit_domain=trace".
    /// Falls back to RUST_LOG, then "warn".
    #[arg(long, env = "TABSPLIT_LOG")]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show balances, suggested payments and skipped records.
    Report,
    /// Show the group activity log, oldest first.
    History,
    /// Preview an equal split without recording anything.
    Split {
        #[arg(long, value_parser = parse_money)]
        amount: Money,
        /// Members to split between; the whole group when omitted.
        members: Vec<String>,
    },
    /// Validate and record a new expense.
    AddExpense(AddExpenseArgs),
    /// Delete an expense; the removal is logged in the group history.
    DeleteExpense {
        /// Key of the expense in the snapshot. Push keys start with `-`.
        #[arg(long, allow_hyphen_values = true)]
        id: String,
        /// Member performing the deletion.
        #[arg(long)]
        by: String,
    },
    /// Record a payment made to settle a debt.
    Settle {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_parser = parse_money)]
        amount: Money,
        /// RFC 3339 timestamp; defaults to now.
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug, Args)]
pub struct AddExpenseArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long, value_parser = parse_money)]
    pub amount: Money,
    #[arg(long)]
    pub paid_by: String,
    /// Split equally between these members (the whole group when given no values).
    #[arg(long, num_args = 0.., conflicts_with = "share")]
    pub equal: Option<Vec<String>>,
    /// Explicit share as `member=amount`; repeat for each member.
    #[arg(long, value_parser = parse_share)]
    pub share: Vec<(MemberId, Money)>,
    /// RFC 3339 timestamp; defaults to now.
    #[arg(long, value_parser = parse_timestamp)]
    pub at: Option<DateTime<Utc>>,
}

pub fn parse_money(raw: &str) -> Result<Money, String> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map(Money::from_decimal)
        .map_err(|err| format!("invalid amount '{raw}': {err}"))
}

pub fn parse_share(raw: &str) -> Result<(MemberId, Money), String> {
    let Some((member, amount)) = raw.split_once('=') else {
        return Err(format!("expected member=amount, got '{raw}'"));
    };
    let member = member.trim();
    if member.is_empty() {
        return Err(format!("missing member in '{raw}'"));
    }
    Ok((MemberId::from(member), parse_money(amount)?))
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| format!("invalid timestamp '{raw}': {err}"))
}
