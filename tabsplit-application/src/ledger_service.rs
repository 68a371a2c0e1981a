use crate::{
    error::LedgerError,
    model::{GroupSnapshot, HistoryEntry, LedgerReport},
    ports::{ExpenseRecorder, GroupSnapshotSource},
};
use tabsplit_domain::{
    BalanceCalculator, Expense, ExpenseDraft, ExpenseId, MemberId, Money, RecordedSettlement,
    SettlementPlanner, SplitRequest, SplitValidator,
};

#[derive(Clone, Copy)]
pub struct LedgerService<'a> {
    source: &'a dyn GroupSnapshotSource,
    recorder: &'a dyn ExpenseRecorder,
}

impl<'a> LedgerService<'a> {
    pub fn new(source: &'a dyn GroupSnapshotSource, recorder: &'a dyn ExpenseRecorder) -> Self {
        Self { source, recorder }
    }

    /// Recomputes the report from a freshly loaded snapshot.
    pub fn report(&self, group_id: &str) -> Result<LedgerReport, LedgerError> {
        let snapshot = self.source.load(group_id)?;
        Ok(Self::build_report(&snapshot))
    }

    /// Pure recomputation over a snapshot; holds no state between calls.
    pub fn build_report(snapshot: &GroupSnapshot) -> LedgerReport {
        let balance_report = BalanceCalculator.calculate(
            &snapshot.members,
            &snapshot.expenses,
            &snapshot.settlements,
        );
        let suggestions = SettlementPlanner.plan(&balance_report.balances);

        tracing::debug!(
            group_id = %snapshot.group_id,
            member_count = snapshot.members.len(),
            expense_count = snapshot.expenses.len(),
            settlement_count = snapshot.settlements.len(),
            suggestion_count = suggestions.len(),
            diagnostic_count = balance_report.diagnostics.len(),
            rejected_count = snapshot.rejected_records.len(),
            "Ledger report built"
        );

        let mut diagnostics = snapshot.rejected_records.clone();
        diagnostics.extend(balance_report.diagnostics);

        LedgerReport {
            balances: balance_report.balances,
            suggestions,
            diagnostics,
        }
    }

    /// Validates a new expense against the group and records it.
    ///
    /// An equal split without explicit participants divides across the whole group.
    /// Nothing is written when validation fails.
    pub fn admit_expense(
        &self,
        group_id: &str,
        mut draft: ExpenseDraft,
    ) -> Result<Expense, LedgerError> {
        let snapshot = self.source.load(group_id)?;
        Self::ensure_member(&snapshot, &draft.paid_by)?;

        match &mut draft.split {
            SplitRequest::Equal(members) if members.is_empty() => {
                members.extend(snapshot.members.iter().cloned());
            }
            SplitRequest::Equal(members) => {
                for member in members.iter() {
                    Self::ensure_member(&snapshot, member)?;
                }
            }
            SplitRequest::Explicit(shares) => {
                for member in shares.members() {
                    Self::ensure_member(&snapshot, member)?;
                }
            }
        }

        let mut expense = SplitValidator.admit(draft)?;
        let id = self.recorder.record_expense(group_id, &expense)?;
        tracing::info!(
            group_id,
            expense_id = %id,
            amount = %expense.amount,
            paid_by = %expense.paid_by,
            "Expense recorded"
        );
        expense.id = Some(id);
        Ok(expense)
    }

    /// Records a realized payment between two members of the group.
    pub fn record_settlement(
        &self,
        group_id: &str,
        settlement: RecordedSettlement,
    ) -> Result<RecordedSettlement, LedgerError> {
        if settlement.amount <= Money::ZERO {
            return Err(LedgerError::NonPositiveSettlement(settlement.amount));
        }
        if settlement.from == settlement.to {
            return Err(LedgerError::SelfSettlement(settlement.from));
        }

        let snapshot = self.source.load(group_id)?;
        Self::ensure_member(&snapshot, &settlement.from)?;
        Self::ensure_member(&snapshot, &settlement.to)?;

        self.recorder.record_settlement(group_id, &settlement)?;
        tracing::info!(
            group_id,
            from = %settlement.from,
            to = %settlement.to,
            amount = %settlement.amount,
            "Settlement recorded"
        );
        Ok(settlement)
    }

    /// Deletes an expense on behalf of a group member.
    ///
    /// Returns the removed expense, or `None` when the stored record was
    /// unreadable; such records can still be deleted.
    pub fn delete_expense(
        &self,
        group_id: &str,
        expense_id: &ExpenseId,
        by: &MemberId,
    ) -> Result<Option<Expense>, LedgerError> {
        let snapshot = self.source.load(group_id)?;
        Self::ensure_member(&snapshot, by)?;

        let removed = snapshot.expense(expense_id).cloned();
        if removed.is_none() && !snapshot.has_rejected_expense(expense_id) {
            return Err(LedgerError::UnknownExpense {
                group_id: group_id.to_owned(),
                expense_id: expense_id.clone(),
            });
        }

        self.recorder.delete_expense(group_id, expense_id, by)?;
        tracing::info!(
            group_id,
            expense_id = %expense_id,
            by = %by,
            readable = removed.is_some(),
            "Expense deleted"
        );
        Ok(removed)
    }

    /// Group history, oldest first. Entries with equal timestamps keep store order.
    pub fn history(&self, group_id: &str) -> Result<Vec<HistoryEntry>, LedgerError> {
        let mut history = self.source.load(group_id)?.history;
        history.sort_by_key(|entry| entry.created_at);
        Ok(history)
    }

    fn ensure_member(snapshot: &GroupSnapshot, member: &MemberId) -> Result<(), LedgerError> {
        if snapshot.is_member(member) {
            Ok(())
        } else {
            Err(LedgerError::NotAMember {
                group_id: snapshot.group_id.clone(),
                member: member.clone(),
            })
        }
    }
}
