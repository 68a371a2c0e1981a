use crate::{
    error::{BalanceError, RecordRef},
    model::{Expense, MemberBalances, MemberId, Money, RecordedSettlement},
    services::validate_split,
};

/// Balances plus every record that had to be skipped while producing them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BalanceReport {
    pub balances: MemberBalances,
    pub diagnostics: Vec<BalanceError>,
}

impl BalanceReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Sum of all balances. Zero for any report built from valid records;
    /// `None` if the sum itself is out of range.
    pub fn total(&self) -> Option<Money> {
        Money::checked_sum(self.balances.values().copied())
    }
}

/// Folds expenses and recorded settlements into per-member balances.
///
/// Records referencing non-members, or carrying a malformed split, are skipped
/// and kept as diagnostics; they never abort the fold.
pub struct BalanceAccumulator {
    balances: MemberBalances,
    diagnostics: Vec<BalanceError>,
}

impl BalanceAccumulator {
    pub fn new<'a, I>(members: I) -> Self
    where
        I: IntoIterator<Item = &'a MemberId>,
    {
        let balances = members
            .into_iter()
            .map(|member| (member.clone(), Money::ZERO))
            .collect();

        Self {
            balances,
            diagnostics: Vec::new(),
        }
    }

    pub fn from_report(report: BalanceReport) -> Self {
        Self {
            balances: report.balances,
            diagnostics: report.diagnostics,
        }
    }

    pub fn apply_expense(&mut self, index: usize, expense: &Expense) {
        if let Err(err) = self.check_expense(index, expense) {
            tracing::warn!(
                index,
                title = %expense.title,
                error = %err,
                "Skipping expense during balance computation"
            );
            self.diagnostics.push(err);
            return;
        }

        let credits = std::iter::once((&expense.paid_by, expense.amount))
            .chain(expense.split.iter().map(|(member, share)| (member, -share)));
        if !self.apply_all(credits) {
            let err = BalanceError::ExpenseOverflow {
                expense: RecordRef::new(index, expense.id.clone()),
            };
            tracing::warn!(
                index,
                title = %expense.title,
                error = %err,
                "Skipping expense during balance computation"
            );
            self.diagnostics.push(err);
        }
    }

    pub fn apply_settlement(&mut self, index: usize, settlement: &RecordedSettlement) {
        if let Err(err) = self.check_settlement(index, settlement) {
            tracing::warn!(
                index,
                error = %err,
                "Skipping recorded settlement during balance computation"
            );
            self.diagnostics.push(err);
            return;
        }

        // Paying off a debt moves the payer up and the receiver down.
        let credits = [
            (&settlement.from, settlement.amount),
            (&settlement.to, -settlement.amount),
        ];
        if !self.apply_all(credits) {
            let err = BalanceError::SettlementOverflow { index };
            tracing::warn!(
                index,
                error = %err,
                "Skipping recorded settlement during balance computation"
            );
            self.diagnostics.push(err);
        }
    }

    /// Adds every delta, or none of them when any balance would overflow.
    fn apply_all<'a, I>(&mut self, deltas: I) -> bool
    where
        I: IntoIterator<Item = (&'a MemberId, Money)>,
    {
        let mut staged = MemberBalances::new();
        for (member, delta) in deltas {
            let Some(current) = staged
                .get(member)
                .or_else(|| self.balances.get(member))
                .copied()
            else {
                continue;
            };
            let Some(next) = current.checked_add(delta) else {
                return false;
            };
            staged.insert(member.clone(), next);
        }
        self.balances.extend(staged);
        true
    }

    pub fn balances(&self) -> &MemberBalances {
        &self.balances
    }

    pub fn diagnostics(&self) -> &[BalanceError] {
        &self.diagnostics
    }

    pub fn into_report(self) -> BalanceReport {
        BalanceReport {
            balances: self.balances,
            diagnostics: self.diagnostics,
        }
    }

    fn check_expense(&self, index: usize, expense: &Expense) -> Result<(), BalanceError> {
        let record = || RecordRef::new(index, expense.id.clone());

        if !self.balances.contains_key(&expense.paid_by) {
            return Err(BalanceError::UnknownPayer {
                expense: record(),
                payer: expense.paid_by.clone(),
            });
        }
        if let Some(member) = expense
            .split
            .members()
            .find(|member| !self.balances.contains_key(*member))
        {
            return Err(BalanceError::UnknownParticipant {
                expense: record(),
                member: member.clone(),
            });
        }
        validate_split(expense.amount, &expense.split).map_err(|source| {
            BalanceError::InvalidSplit {
                expense: record(),
                source,
            }
        })
    }

    fn check_settlement(
        &self,
        index: usize,
        settlement: &RecordedSettlement,
    ) -> Result<(), BalanceError> {
        for member in [&settlement.from, &settlement.to] {
            if !self.balances.contains_key(member) {
                return Err(BalanceError::UnknownSettlementParty {
                    index,
                    member: member.clone(),
                });
            }
        }
        if settlement.amount <= Money::ZERO {
            return Err(BalanceError::NonPositiveSettlement {
                index,
                amount: settlement.amount,
            });
        }
        Ok(())
    }
}

/// Computes net balances for `members` from the full expense list of a group.
///
/// Every member appears in the result, including those without expenses.
/// The result does not depend on expense order.
pub fn compute_balances<'a, M, E>(members: M, expenses: E) -> BalanceReport
where
    M: IntoIterator<Item = &'a MemberId>,
    E: IntoIterator<Item = &'a Expense>,
{
    let mut accumulator = BalanceAccumulator::new(members);
    let mut expense_count = 0usize;
    for (index, expense) in expenses.into_iter().enumerate() {
        accumulator.apply_expense(index, expense);
        expense_count += 1;
    }

    tracing::debug!(
        member_count = accumulator.balances().len(),
        expense_count,
        skipped = accumulator.diagnostics().len(),
        "Balance computation finished"
    );
    accumulator.into_report()
}

/// Applies realized settlements on top of an existing report.
pub fn apply_settlements<'a, S>(report: BalanceReport, settlements: S) -> BalanceReport
where
    S: IntoIterator<Item = &'a RecordedSettlement>,
{
    let mut accumulator = BalanceAccumulator::from_report(report);
    for (index, settlement) in settlements.into_iter().enumerate() {
        accumulator.apply_settlement(index, settlement);
    }
    accumulator.into_report()
}

/// Balance service over a whole group ledger.
pub struct BalanceCalculator;

impl BalanceCalculator {
    pub fn calculate<'a, M>(
        &self,
        members: M,
        expenses: &'a [Expense],
        settlements: &'a [RecordedSettlement],
    ) -> BalanceReport
    where
        M: IntoIterator<Item = &'a MemberId>,
    {
        apply_settlements(compute_balances(members, expenses), settlements)
    }
}
