use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::{
    borrow::Borrow,
    collections::BTreeMap,
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

/// Opaque participant identifier. Ordered lexically so every derived listing is stable.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for MemberId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for MemberId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpenseId(pub String);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExpenseId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Decimal currency amount. Arithmetic is exact; rounding only happens through
/// [`Money::round_cents`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Threshold below which a balance or split discrepancy counts as zero.
    pub const TOLERANCE: Self = Self(Decimal::from_parts(1, 0, 0, false, 2));

    pub const CENT_SCALE: u32 = 2;

    pub fn new(num: i64, scale: u32) -> Self {
        Self(Decimal::new(num, scale))
    }

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn from_i64(value: i64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn abs(self) -> Self {
        Self(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn signum(self) -> i64 {
        if self.0.is_zero() {
            0
        } else if self.0.is_sign_negative() {
            -1
        } else {
            1
        }
    }

    /// Rounds to two decimal places, midpoints away from zero (half-up on magnitude).
    pub fn round_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(Self::CENT_SCALE, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Rounds to two decimal places toward negative infinity.
    pub fn floor_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(Self::CENT_SCALE, RoundingStrategy::ToNegativeInfinity),
        )
    }

    /// Rounds to two decimal places toward zero.
    pub fn truncate_cents(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(Self::CENT_SCALE, RoundingStrategy::ToZero),
        )
    }

    pub fn is_within_tolerance(self) -> bool {
        self.abs() <= Self::TOLERANCE
    }

    /// `None` when the result leaves the representable range.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Overflow-aware counterpart of `Iterator::sum`.
    pub fn checked_sum<I>(iter: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        iter.into_iter()
            .try_fold(Self::ZERO, |total, value| total.checked_add(value))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.round_cents().0)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

/// Panics on overflow like `Decimal`; use [`Money::checked_sum`] on untrusted input.
impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Net position per member: positive is owed money, negative owes money.
pub type MemberBalances = BTreeMap<MemberId, Money>;

/// Per-member share breakdown of an expense.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitShares(BTreeMap<MemberId, Money>);

impl SplitShares {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, member: MemberId, share: Money) -> Option<Money> {
        self.0.insert(member, share)
    }

    pub fn get(&self, member: &str) -> Option<Money> {
        self.0.get(member).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MemberId, Money)> + '_ {
        self.0.iter().map(|(member, share)| (member, *share))
    }

    pub fn members(&self) -> impl Iterator<Item = &MemberId> + '_ {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all shares, or `None` if it overflows.
    pub fn total(&self) -> Option<Money> {
        Money::checked_sum(self.0.values().copied())
    }
}

impl FromIterator<(MemberId, Money)> for SplitShares {
    fn from_iter<I: IntoIterator<Item = (MemberId, Money)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, Money)> for SplitShares {
    fn from_iter<I: IntoIterator<Item = (&'a str, Money)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(member, share)| (MemberId::from(member), share))
                .collect(),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expense {
    pub id: Option<ExpenseId>,
    pub title: String,
    pub amount: Money,
    pub paid_by: MemberId,
    pub created_at: DateTime<Utc>,
    pub split: SplitShares,
}

/// How a new expense should be divided among participants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SplitRequest {
    Explicit(SplitShares),
    Equal(Vec<MemberId>),
}

/// An expense as submitted, before its split has been validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseDraft {
    pub title: String,
    pub amount: Money,
    pub paid_by: MemberId,
    pub created_at: DateTime<Utc>,
    pub split: SplitRequest,
}

/// Suggested payment; derived, never persisted by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementTransaction {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
}

/// A payment that actually happened and was logged against the group.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedSettlement {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}
