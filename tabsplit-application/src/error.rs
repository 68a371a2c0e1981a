use std::error::Error as StdError;
use tabsplit_domain::{ExpenseId, MemberId, Money, SplitError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("group {0} not found")]
    GroupNotFound(String),
    #[error("expense {0} not found")]
    ExpenseNotFound(ExpenseId),
    #[error("store backend failure: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    InvalidSplit(#[from] SplitError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{member} is not a member of group {group_id}")]
    NotAMember { group_id: String, member: MemberId },
    #[error("a member cannot settle with themselves ({0})")]
    SelfSettlement(MemberId),
    #[error("settlement amount must be positive (got {0})")]
    NonPositiveSettlement(Money),
    #[error("expense {expense_id} does not exist in group {group_id}")]
    UnknownExpense {
        group_id: String,
        expense_id: ExpenseId,
    },
}
