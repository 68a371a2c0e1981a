#![warn(clippy::uninlined_format_args)]

mod bootstrap;
mod cli;

use chrono::Utc;
use clap::Parser;
use cli::{AddExpenseArgs, Cli, Command};
use std::{borrow::Cow, process};
use tabsplit_application::{GroupSnapshotSource, LedgerService};
use tabsplit_domain::{
    ExpenseDraft, ExpenseId, MemberId, RecordedSettlement, SplitRequest, SplitShares, equal_split,
};
use tabsplit_infrastructure::JsonFileStore;
use tabsplit_presentation::{HistoryPresenter, LedgerPresenter, SplitPresenter};

type CliResult<T> = Result<T, Cow<'static, str>>;

fn main() {
    bootstrap::load_env();
    let cli = Cli::parse();
    bootstrap::init_logging(cli.log.as_deref());

    if let Err(err) = run(cli) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let store = JsonFileStore::new(cli.snapshot);
    let service = LedgerService::new(&store, &store);
    let group = cli.group.as_str();
    tracing::debug!(path = %store.path().display(), group, "Using snapshot");

    match cli.command {
        Command::Report => {
            let report = service.report(group).map_err(|err| err.to_string())?;
            print!("{}", LedgerPresenter::render(&report));
        }
        Command::History => {
            let history = service.history(group).map_err(|err| err.to_string())?;
            print!("{}", HistoryPresenter::render(&history));
        }
        Command::Split { amount, members } => {
            let members: Vec<MemberId> = if members.is_empty() {
                let snapshot = store.load(group).map_err(|err| err.to_string())?;
                snapshot.members.into_iter().collect()
            } else {
                members.into_iter().map(MemberId::from).collect()
            };
            let shares = equal_split(amount, members).map_err(|err| err.to_string())?;
            print!("{}", SplitPresenter::render(amount, &shares));
        }
        Command::AddExpense(args) => add_expense(&service, group, args)?,
        Command::DeleteExpense { id, by } => {
            let expense_id = ExpenseId(id);
            let removed = service
                .delete_expense(group, &expense_id, &MemberId::from(by))
                .map_err(|err| err.to_string())?;
            match removed {
                Some(expense) => println!(
                    "Deleted expense {expense_id}: \"{}\" ({})",
                    expense.title, expense.amount
                ),
                None => println!("Deleted unreadable expense record {expense_id}"),
            }
        }
        Command::Settle {
            from,
            to,
            amount,
            at,
        } => {
            let settlement = service
                .record_settlement(
                    group,
                    RecordedSettlement {
                        from: MemberId::from(from),
                        to: MemberId::from(to),
                        amount,
                        created_at: at.unwrap_or_else(Utc::now),
                    },
                )
                .map_err(|err| err.to_string())?;
            println!(
                "Recorded: {} paid {} {}",
                settlement.from, settlement.to, settlement.amount
            );
        }
    }

    Ok(())
}

fn add_expense(service: &LedgerService<'_>, group: &str, args: AddExpenseArgs) -> CliResult<()> {
    let AddExpenseArgs {
        title,
        amount,
        paid_by,
        equal,
        share,
        at,
    } = args;

    if title.trim().is_empty() {
        return Err("Expense title must not be empty".into());
    }

    let split = if share.is_empty() {
        SplitRequest::Equal(
            equal
                .unwrap_or_default()
                .into_iter()
                .map(MemberId::from)
                .collect(),
        )
    } else {
        SplitRequest::Explicit(share.into_iter().collect::<SplitShares>())
    };

    let expense = service
        .admit_expense(
            group,
            ExpenseDraft {
                title,
                amount,
                paid_by: MemberId::from(paid_by),
                created_at: at.unwrap_or_else(Utc::now),
                split,
            },
        )
        .map_err(|err| err.to_string())?;

    let id = expense
        .id
        .as_ref()
        .map_or_else(|| "-".to_owned(), ToString::to_string);
    println!("Recorded expense {id}: \"{}\"", expense.title);
    print!("{}", SplitPresenter::render(expense.amount, &expense.split));
    Ok(())
}
