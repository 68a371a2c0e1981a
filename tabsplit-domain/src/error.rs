use crate::model::{ExpenseId, MemberId, Money};
use std::fmt;

/// Raised before an expense is admitted; blocks recording of the malformed record.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    #[error("split must name at least one member")]
    EmptySplit,
    #[error("amount must not be negative (got {0})")]
    NegativeAmount(Money),
    #[error("share for {member} must not be negative (got {share})")]
    NegativeShare { member: MemberId, share: Money },
    #[error("shares sum to {actual} but the amount is {expected}")]
    SumMismatch { expected: Money, actual: Money },
    #[error("amount or shares exceed the representable range")]
    AmountOverflow,
}

/// Position of a record inside the snapshot it was read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordRef {
    pub index: usize,
    pub id: Option<ExpenseId>,
}

impl RecordRef {
    pub fn new(index: usize, id: Option<ExpenseId>) -> Self {
        Self { index, id }
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "#{} ({id})", self.index),
            None => write!(f, "#{}", self.index),
        }
    }
}

/// Non-fatal diagnostic: the offending record was skipped, everything else was applied.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    #[error("expense {expense} is paid by unknown member {payer}")]
    UnknownPayer { expense: RecordRef, payer: MemberId },
    #[error("expense {expense} assigns a share to unknown member {member}")]
    UnknownParticipant { expense: RecordRef, member: MemberId },
    #[error("expense {expense} has an invalid split: {source}")]
    InvalidSplit {
        expense: RecordRef,
        #[source]
        source: SplitError,
    },
    #[error("settlement #{index} involves unknown member {member}")]
    UnknownSettlementParty { index: usize, member: MemberId },
    #[error("settlement #{index} has non-positive amount {amount}")]
    NonPositiveSettlement { index: usize, amount: Money },
    #[error("expense {expense} would push a balance out of range")]
    ExpenseOverflow { expense: RecordRef },
    #[error("settlement #{index} would push a balance out of range")]
    SettlementOverflow { index: usize },
    #[error("record {path} could not be read: {reason}")]
    MalformedRecord { path: String, reason: String },
}
