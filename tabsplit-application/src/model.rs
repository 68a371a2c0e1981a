use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tabsplit_domain::{
    BalanceError, Expense, ExpenseId, MemberBalances, MemberId, Money, RecordedSettlement,
    SettlementTransaction,
};

/// Immutable view of one group as read from the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupSnapshot {
    pub group_id: String,
    pub name: String,
    pub created_by: Option<MemberId>,
    pub members: BTreeSet<MemberId>,
    pub expenses: Vec<Expense>,
    pub settlements: Vec<RecordedSettlement>,
    pub history: Vec<HistoryEntry>,
    /// Stored records that could not be read; reported, never applied.
    pub rejected_records: Vec<BalanceError>,
}

impl GroupSnapshot {
    pub fn is_member(&self, member: &MemberId) -> bool {
        self.members.contains(member)
    }

    pub fn expense(&self, expense_id: &ExpenseId) -> Option<&Expense> {
        self.expenses
            .iter()
            .find(|expense| expense.id.as_ref() == Some(expense_id))
    }

    /// Whether `expense_id` names a stored expense that failed to decode.
    pub fn has_rejected_expense(&self, expense_id: &ExpenseId) -> bool {
        let path = format!("expenses/{expense_id}");
        self.rejected_records.iter().any(|record| {
            matches!(record, BalanceError::MalformedRecord { path: rejected, .. } if *rejected == path)
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryEvent {
    ExpenseAdded {
        title: String,
        amount: Money,
        paid_by: Option<MemberId>,
    },
    ExpenseDeleted {
        expense_id: ExpenseId,
        by: Option<MemberId>,
        title: Option<String>,
    },
    SettlementRecorded {
        from: MemberId,
        to: MemberId,
        amount: Money,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    pub created_at: DateTime<Utc>,
    pub event: HistoryEvent,
}

/// Everything the group view shows: balances, suggested payments, and the
/// records that were skipped while computing them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerReport {
    pub balances: MemberBalances,
    pub suggestions: Vec<SettlementTransaction>,
    pub diagnostics: Vec<BalanceError>,
}

impl LedgerReport {
    pub fn is_settled(&self) -> bool {
        self.suggestions.is_empty()
    }
}
