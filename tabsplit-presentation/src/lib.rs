#![warn(clippy::uninlined_format_args)]

pub mod history_presenter;
pub mod ledger_presenter;
pub mod split_presenter;

pub use history_presenter::HistoryPresenter;
pub use ledger_presenter::LedgerPresenter;
pub use split_presenter::SplitPresenter;

use tabsplit_domain::Money;

/// Signed two-decimal rendering; non-negative values carry an explicit `+`.
pub(crate) fn format_signed(amount: Money) -> String {
    let sign = if amount.is_negative() { "" } else { "+" };
    format!("{sign}{amount}")
}
