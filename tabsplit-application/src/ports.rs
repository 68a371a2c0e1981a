use crate::{error::StoreError, model::GroupSnapshot};
use tabsplit_domain::{Expense, ExpenseId, MemberId, RecordedSettlement};

/// Supplies a consistent snapshot of a group. Writes still in flight may be absent.
pub trait GroupSnapshotSource: Send + Sync {
    fn load(&self, group_id: &str) -> Result<GroupSnapshot, StoreError>;
}

/// Persists admitted records and removals. Only ever called with validated data.
pub trait ExpenseRecorder: Send + Sync {
    fn record_expense(&self, group_id: &str, expense: &Expense) -> Result<ExpenseId, StoreError>;

    fn record_settlement(
        &self,
        group_id: &str,
        settlement: &RecordedSettlement,
    ) -> Result<(), StoreError>;

    /// Removes an expense and logs who removed it.
    fn delete_expense(
        &self,
        group_id: &str,
        expense_id: &ExpenseId,
        by: &MemberId,
    ) -> Result<(), StoreError>;
}
