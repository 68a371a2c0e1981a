#![warn(clippy::uninlined_format_args)]

pub mod error;
pub mod model;
pub mod services;

pub use error::{BalanceError, RecordRef, SplitError};
pub use model::{
    Expense, ExpenseDraft, ExpenseId, MemberBalances, MemberId, Money, RecordedSettlement,
    SettlementTransaction, SplitRequest, SplitShares,
};
pub use services::{
    BalanceAccumulator, BalanceCalculator, BalanceReport, SettlementPlanner, SplitValidator,
    apply_settlements, compute_balances, equal_split, suggest_settlements, validate_split,
};
