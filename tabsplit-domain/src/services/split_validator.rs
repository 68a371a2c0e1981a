use crate::{
    error::SplitError,
    model::{Expense, ExpenseDraft, MemberId, Money, SplitRequest, SplitShares},
};
use rust_decimal::Decimal;
use std::collections::BTreeSet;

/// Checks that `split` is a well-formed breakdown of `amount`.
///
/// Checks run in a fixed order: empty split, negative amount, negative shares,
/// then the sum. The sum may differ from `amount` by at most [`Money::TOLERANCE`];
/// a sum that does not fit in [`Money`] is [`SplitError::AmountOverflow`].
pub fn validate_split(amount: Money, split: &SplitShares) -> Result<(), SplitError> {
    if split.is_empty() {
        return Err(SplitError::EmptySplit);
    }
    if amount.is_negative() {
        return Err(SplitError::NegativeAmount(amount));
    }
    if let Some((member, share)) = split.iter().find(|(_, share)| share.is_negative()) {
        return Err(SplitError::NegativeShare {
            member: member.clone(),
            share,
        });
    }

    let actual = split.total().ok_or(SplitError::AmountOverflow)?;
    if !(actual - amount).is_within_tolerance() {
        return Err(SplitError::SumMismatch {
            expected: amount,
            actual,
        });
    }

    Ok(())
}

/// Divides `amount` evenly across `members`.
///
/// Members are deduplicated and ordered by id. Every share except the last is
/// rounded to cents (midpoint away from zero); the last member absorbs the
/// residue so the shares add up to `amount` exactly. When half-up rounding would
/// push the residue below zero, the shares are rounded toward zero instead.
pub fn equal_split<I>(amount: Money, members: I) -> Result<SplitShares, SplitError>
where
    I: IntoIterator,
    I::Item: Into<MemberId>,
{
    let members: BTreeSet<MemberId> = members.into_iter().map(Into::into).collect();
    let Some(last) = members.last().cloned() else {
        return Err(SplitError::EmptySplit);
    };
    if amount.is_negative() {
        return Err(SplitError::NegativeAmount(amount));
    }

    let others = Decimal::from(members.len() - 1);
    let exact = Money::from_decimal(amount.as_decimal() / Decimal::from(members.len()));
    let spread = |share: Money| {
        share
            .as_decimal()
            .checked_mul(others)
            .filter(|spread| *spread <= amount.as_decimal())
            .map(|spread| (share, spread))
    };
    let (share, spread) = spread(exact.round_cents())
        .or_else(|| spread(exact.truncate_cents()))
        .ok_or(SplitError::AmountOverflow)?;
    let residue = amount - Money::from_decimal(spread);

    let shares: SplitShares = members
        .into_iter()
        .map(|member| {
            let value = if member == last { residue } else { share };
            (member, value)
        })
        .collect();

    debug_assert_eq!(shares.total(), Some(amount));
    Ok(shares)
}

/// Gatekeeper for new expenses. Produces a recordable [`Expense`] only when the
/// requested split is valid.
pub struct SplitValidator;

impl SplitValidator {
    pub fn admit(&self, draft: ExpenseDraft) -> Result<Expense, SplitError> {
        let ExpenseDraft {
            title,
            amount,
            paid_by,
            created_at,
            split,
        } = draft;

        let split = match split {
            SplitRequest::Explicit(shares) => shares,
            SplitRequest::Equal(members) => equal_split(amount, members)?,
        };

        if let Err(err) = validate_split(amount, &split) {
            tracing::debug!(
                title = %title,
                amount = %amount,
                paid_by = %paid_by,
                error = %err,
                "Expense rejected by split validation"
            );
            return Err(err);
        }

        Ok(Expense {
            id: None,
            title,
            amount,
            paid_by,
            created_at,
            split,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use rstest::{fixture, rstest};
    use rust_decimal_macros::dec;

    fn shares(entries: &[(&str, Decimal)]) -> SplitShares {
        entries
            .iter()
            .map(|(member, share)| (*member, Money::from(*share)))
            .collect()
    }

    #[fixture]
    fn validator() -> SplitValidator {
        SplitValidator
    }

    #[rstest]
    #[case::exact(dec!(90), &[("A", dec!(30)), ("B", dec!(30)), ("C", dec!(30))])]
    #[case::within_tolerance_above(dec!(10), &[("A", dec!(3.34)), ("B", dec!(3.34)), ("C", dec!(3.33))])]
    #[case::within_tolerance_below(dec!(10), &[("A", dec!(3.33)), ("B", dec!(3.33)), ("C", dec!(3.33))])]
    #[case::zero_amount(dec!(0), &[("A", dec!(0))])]
    #[case::zero_share_for_someone(dec!(25), &[("A", dec!(25)), ("B", dec!(0))])]
    fn accepts_valid_splits(#[case] amount: Decimal, #[case] entries: &[(&str, Decimal)]) {
        assert_eq!(validate_split(Money::from(amount), &shares(entries)), Ok(()));
    }

    #[test]
    fn custom_split_below_amount_is_sum_mismatch() {
        let result = validate_split(
            Money::from_i64(30),
            &shares(&[("A", dec!(10)), ("B", dec!(15))]),
        );
        assert_eq!(
            result,
            Err(SplitError::SumMismatch {
                expected: Money::from_i64(30),
                actual: Money::from_i64(25),
            })
        );
    }

    #[test]
    fn deviation_just_past_tolerance_is_rejected() {
        let result = validate_split(
            Money::from_i64(10),
            &shares(&[("A", dec!(5)), ("B", dec!(4.98))]),
        );
        assert!(matches!(result, Err(SplitError::SumMismatch { .. })));
    }

    #[test]
    fn oversized_shares_are_an_overflow_not_a_panic() {
        let huge = Decimal::from_scientific("7e28").expect("in range");
        let result = validate_split(
            Money::from(huge),
            &shares(&[("A", huge), ("B", huge)]),
        );
        assert_eq!(result, Err(SplitError::AmountOverflow));
    }

    #[test]
    fn equal_split_of_the_largest_amount_stays_in_range() {
        let amount = Money::from(Decimal::MAX);
        let split = equal_split(amount, ["A", "B", "C"]).expect("split");
        assert_eq!(split.total(), Some(amount));
        assert_eq!(validate_split(amount, &split), Ok(()));
    }

    #[test]
    fn empty_split_is_rejected_before_anything_else() {
        assert_eq!(
            validate_split(Money::from_i64(-5), &SplitShares::new()),
            Err(SplitError::EmptySplit)
        );
    }

    #[test]
    fn negative_share_is_reported_with_member() {
        let result = validate_split(
            Money::from_i64(10),
            &shares(&[("A", dec!(15)), ("B", dec!(-5))]),
        );
        assert_eq!(
            result,
            Err(SplitError::NegativeShare {
                member: MemberId::from("B"),
                share: Money::from_i64(-5),
            })
        );
    }

    #[test]
    fn negative_amount_is_rejected() {
        let result = validate_split(Money::from_i64(-10), &shares(&[("A", dec!(-10))]));
        assert_eq!(result, Err(SplitError::NegativeAmount(Money::from_i64(-10))));
    }

    #[rstest]
    #[case::even(dec!(90), 3, dec!(30), dec!(30))]
    #[case::residue_on_last(dec!(10), 3, dec!(3.33), dec!(3.34))]
    #[case::half_up_pushes_residue_down(dec!(20), 3, dec!(6.67), dec!(6.66))]
    #[case::single_member(dec!(12.345), 1, dec!(12.345), dec!(12.345))]
    #[case::tiny_amount_many_members(dec!(0.05), 7, dec!(0), dec!(0.05))]
    fn equal_split_cases(
        #[case] amount: Decimal,
        #[case] count: usize,
        #[case] expected_share: Decimal,
        #[case] expected_last: Decimal,
    ) {
        let members: Vec<String> = (0..count).map(|idx| format!("m{idx}")).collect();
        let split = equal_split(Money::from(amount), members.iter().map(String::as_str))
            .expect("equal split should succeed");

        assert_eq!(split.len(), count);
        let last = members.last().expect("at least one member");
        assert_eq!(split.get(last), Some(Money::from(expected_last)));
        for member in &members[..count - 1] {
            assert_eq!(split.get(member), Some(Money::from(expected_share)));
        }
        assert_eq!(split.total(), Some(Money::from(amount)));
    }

    #[test]
    fn equal_split_deduplicates_members() {
        let split = equal_split(Money::from_i64(10), ["b", "a", "b"]).expect("split");
        assert_eq!(split.len(), 2);
        assert_eq!(split.get("a"), Some(Money::from_i64(5)));
        assert_eq!(split.get("b"), Some(Money::from_i64(5)));
    }

    #[test]
    fn equal_split_rejects_empty_and_negative() {
        assert_eq!(
            equal_split(Money::from_i64(10), Vec::<MemberId>::new()),
            Err(SplitError::EmptySplit)
        );
        assert_eq!(
            equal_split(Money::from_i64(-1), ["a"]),
            Err(SplitError::NegativeAmount(Money::from_i64(-1)))
        );
    }

    #[rstest]
    fn admit_builds_expense_from_equal_request(validator: SplitValidator) {
        let created_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let expense = validator
            .admit(ExpenseDraft {
                title: "Taxi".to_owned(),
                amount: Money::from_i64(10),
                paid_by: MemberId::from("A"),
                created_at,
                split: SplitRequest::Equal(vec!["A".into(), "B".into(), "C".into()]),
            })
            .expect("equal split is always valid");

        assert_eq!(expense.id, None);
        assert_eq!(expense.split.get("C"), Some(Money::new(334, 2)));
        assert_eq!(expense.created_at, created_at);
    }

    #[rstest]
    fn admit_rejects_mismatched_explicit_split(validator: SplitValidator) {
        let result = validator.admit(ExpenseDraft {
            title: "Lunch".to_owned(),
            amount: Money::from_i64(30),
            paid_by: MemberId::from("A"),
            created_at: Utc::now(),
            split: SplitRequest::Explicit(shares(&[("A", dec!(10)), ("B", dec!(15))])),
        });

        assert!(matches!(result, Err(SplitError::SumMismatch { .. })));
    }

    proptest! {
        #[test]
        fn equal_split_sums_exactly_and_stays_non_negative(
            cents in 0i64..=10_000_000,
            scale in 0u32..=4,
            count in 1usize..=25,
        ) {
            let amount = Money::new(cents, scale);
            let members: Vec<String> = (0..count).map(|idx| format!("member-{idx:02}")).collect();
            let split = equal_split(amount, members.iter().map(String::as_str)).unwrap();

            prop_assert_eq!(split.len(), count);
            prop_assert_eq!(split.total(), Some(amount));
            prop_assert!(split.iter().all(|(_, share)| !share.is_negative()));
            prop_assert_eq!(validate_split(amount, &split), Ok(()));
        }
    }
}
