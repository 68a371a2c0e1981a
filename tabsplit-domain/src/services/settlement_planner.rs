//! Greedy settlement suggestions.
//!
//! Largest debtor pays largest creditor until everyone is inside the tolerance
//! band. This is a heuristic: it emits at most one payment fewer than there are
//! non-zero balances, but it does not search for the minimum number of
//! payments, which is NP-hard in general.

use crate::model::{MemberBalances, MemberId, Money, SettlementTransaction};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use std::{cmp::Ordering, collections::BinaryHeap};

/// A party with an outstanding remainder. Heap order: larger remainder first,
/// then ascending member id.
#[derive(Debug, PartialEq, Eq)]
struct Party {
    remaining: Money,
    member: MemberId,
}

impl Ord for Party {
    fn cmp(&self, other: &Self) -> Ordering {
        self.remaining
            .cmp(&other.remaining)
            .then_with(|| other.member.cmp(&self.member))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

type PartyHeap = BinaryHeap<Party>;

/// Settlement planning service.
pub struct SettlementPlanner;

impl SettlementPlanner {
    /// Suggests payments that bring every balance to within [`Money::TOLERANCE`] of zero.
    ///
    /// Members inside the tolerance band count as settled. They are only drawn
    /// on when the remaining parties cannot close the book among themselves.
    /// Output is deterministic for identical input and empty when nobody is
    /// outside the band.
    pub fn plan(&self, balances: &MemberBalances) -> Vec<SettlementTransaction> {
        match Money::checked_sum(balances.values().copied()) {
            Some(total) if total.is_within_tolerance() => {}
            Some(total) => tracing::warn!(
                member_count = balances.len(),
                total = %total,
                "Planning settlements for balances that do not sum to zero"
            ),
            None => tracing::warn!(
                member_count = balances.len(),
                "Planning settlements for balances whose sum is out of range"
            ),
        }

        if balances.values().all(|balance| balance.is_within_tolerance()) {
            return Vec::new();
        }

        let mut debtors = PartyHeap::new();
        let mut creditors = PartyHeap::new();
        let mut settled_debtors = PartyHeap::new();
        let mut settled_creditors = PartyHeap::new();
        for ((member, balance), cents) in balances.iter().zip(cent_balances(balances)) {
            if cents.is_zero() {
                continue;
            }
            let party = Party {
                remaining: cents.abs(),
                member: member.clone(),
            };
            match (cents.is_negative(), balance.is_within_tolerance()) {
                (true, false) => debtors.push(party),
                (false, false) => creditors.push(party),
                (true, true) => settled_debtors.push(party),
                (false, true) => settled_creditors.push(party),
            }
        }

        let party_count =
            debtors.len() + creditors.len() + settled_debtors.len() + settled_creditors.len();
        let mut transactions = Vec::with_capacity(party_count.saturating_sub(1));

        match_largest_first(&mut debtors, &mut creditors, &mut transactions);
        match_largest_first(&mut debtors, &mut settled_creditors, &mut transactions);
        match_largest_first(&mut settled_debtors, &mut creditors, &mut transactions);
        match_largest_first(&mut settled_debtors, &mut settled_creditors, &mut transactions);

        tracing::debug!(
            party_count,
            transaction_count = transactions.len(),
            unmatched_debtors = debtors.len() + settled_debtors.len(),
            unmatched_creditors = creditors.len() + settled_creditors.len(),
            "Settlement planning finished"
        );
        transactions
    }
}

/// Whole-cent view of `balances`, in the same order, with the same sum.
///
/// Every balance is floored to cents; the cents lost that way are handed back
/// one at a time to the members with the largest dropped fraction (ties by
/// ascending member id). Each result is less than a cent away from its input.
fn cent_balances(balances: &MemberBalances) -> Vec<Money> {
    let mut cents: Vec<Money> = balances.values().map(|b| b.floor_cents()).collect();
    let fractions: Vec<Money> = balances
        .values()
        .zip(&cents)
        .map(|(balance, floor)| *balance - *floor)
        .collect();

    let dropped: Decimal = fractions.iter().map(|fraction| fraction.as_decimal()).sum();
    let owed = (dropped / Money::TOLERANCE.as_decimal())
        .round()
        .to_usize()
        .unwrap_or(0)
        .min(cents.len());
    if owed == 0 {
        return cents;
    }

    let members: Vec<&MemberId> = balances.keys().collect();
    let mut order: Vec<usize> = (0..cents.len()).collect();
    order.sort_by(|&a, &b| {
        fractions[b]
            .cmp(&fractions[a])
            .then_with(|| members[a].cmp(members[b]))
    });
    for idx in order.into_iter().take(owed) {
        cents[idx] += Money::TOLERANCE;
    }
    cents
}

/// Pairs the largest debtor with the largest creditor until one side runs out.
///
/// A party leaves its heap once less than a cent remains.
fn match_largest_first(
    debtors: &mut PartyHeap,
    creditors: &mut PartyHeap,
    transactions: &mut Vec<SettlementTransaction>,
) {
    while !debtors.is_empty() && !creditors.is_empty() {
        let (Some(mut debtor), Some(mut creditor)) = (debtors.pop(), creditors.pop()) else {
            break;
        };
        let amount = debtor.remaining.min(creditor.remaining).round_cents();
        debtor.remaining -= amount;
        creditor.remaining -= amount;

        if !amount.is_zero() {
            transactions.push(SettlementTransaction {
                from: debtor.member.clone(),
                to: creditor.member.clone(),
                amount,
            });
        }

        if debtor.remaining.abs() >= Money::TOLERANCE {
            debtors.push(debtor);
        }
        if creditor.remaining.abs() >= Money::TOLERANCE {
            creditors.push(creditor);
        }
    }
}

/// Free-function form of [`SettlementPlanner::plan`].
pub fn suggest_settlements(balances: &MemberBalances) -> Vec<SettlementTransaction> {
    SettlementPlanner.plan(balances)
}
