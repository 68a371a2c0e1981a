use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};
use rust_decimal_macros::dec;
use std::sync::Mutex;
use tabsplit_application::{
    ExpenseRecorder, GroupSnapshot, GroupSnapshotSource, HistoryEntry, HistoryEvent,
    LedgerError, LedgerService, StoreError,
};
use tabsplit_domain::{
    BalanceError, Expense, ExpenseDraft, ExpenseId, MemberId, Money, RecordedSettlement,
    SettlementTransaction, SplitError, SplitRequest, SplitShares,
};

const GROUP: &str = "trip";

struct InMemoryStore {
    snapshot: Mutex<GroupSnapshot>,
    writes: Mutex<usize>,
}

impl InMemoryStore {
    fn new(snapshot: GroupSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            writes: Mutex::new(0),
        }
    }

    fn writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

impl GroupSnapshotSource for InMemoryStore {
    fn load(&self, group_id: &str) -> Result<GroupSnapshot, StoreError> {
        let snapshot = self.snapshot.lock().unwrap();
        if snapshot.group_id == group_id {
            Ok(snapshot.clone())
        } else {
            Err(StoreError::GroupNotFound(group_id.to_owned()))
        }
    }
}

impl ExpenseRecorder for InMemoryStore {
    fn record_expense(&self, _group_id: &str, expense: &Expense) -> Result<ExpenseId, StoreError> {
        let mut writes = self.writes.lock().unwrap();
        *writes += 1;
        let id = ExpenseId(format!("e{}", *writes));
        let mut stored = expense.clone();
        stored.id = Some(id.clone());
        self.snapshot.lock().unwrap().expenses.push(stored);
        Ok(id)
    }

    fn record_settlement(
        &self,
        _group_id: &str,
        settlement: &RecordedSettlement,
    ) -> Result<(), StoreError> {
        *self.writes.lock().unwrap() += 1;
        self.snapshot
            .lock()
            .unwrap()
            .settlements
            .push(settlement.clone());
        Ok(())
    }

    fn delete_expense(
        &self,
        _group_id: &str,
        expense_id: &ExpenseId,
        by: &MemberId,
    ) -> Result<(), StoreError> {
        *self.writes.lock().unwrap() += 1;
        let mut snapshot = self.snapshot.lock().unwrap();
        let path = format!("expenses/{expense_id}");
        snapshot
            .rejected_records
            .retain(|record| !matches!(record, BalanceError::MalformedRecord { path: p, .. } if *p == path));
        let Some(position) = snapshot
            .expenses
            .iter()
            .position(|expense| expense.id.as_ref() == Some(expense_id))
        else {
            return Ok(());
        };
        let removed = snapshot.expenses.remove(position);
        snapshot.history.push(HistoryEntry {
            created_at: removed.created_at,
            event: HistoryEvent::ExpenseDeleted {
                expense_id: expense_id.clone(),
                by: Some(by.clone()),
                title: Some(removed.title),
            },
        });
        Ok(())
    }
}

fn at(millis: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

fn dinner() -> Expense {
    Expense {
        id: Some(ExpenseId::from("e0")),
        title: "Dinner".to_owned(),
        amount: Money::from_i64(90),
        paid_by: MemberId::from("A"),
        created_at: at(1_000),
        split: [
            ("A", Money::from_i64(30)),
            ("B", Money::from_i64(30)),
            ("C", Money::from_i64(30)),
        ]
        .into_iter()
        .collect(),
    }
}

#[fixture]
fn store() -> InMemoryStore {
    InMemoryStore::new(GroupSnapshot {
        group_id: GROUP.to_owned(),
        name: "Trip".to_owned(),
        created_by: Some(MemberId::from("A")),
        members: ["A", "B", "C"].into_iter().map(MemberId::from).collect(),
        expenses: vec![dinner()],
        settlements: Vec::new(),
        history: Vec::new(),
        rejected_records: Vec::new(),
    })
}

fn tx(from: &str, to: &str, amount: i64) -> SettlementTransaction {
    SettlementTransaction {
        from: MemberId::from(from),
        to: MemberId::from(to),
        amount: Money::from_i64(amount),
    }
}

#[rstest]
fn report_for_dinner_suggests_two_payments(store: InMemoryStore) {
    let service = LedgerService::new(&store, &store);
    let report = service.report(GROUP).expect("report");

    assert_eq!(report.balances.get("A"), Some(&Money::from_i64(60)));
    assert_eq!(report.balances.get("B"), Some(&Money::from_i64(-30)));
    assert_eq!(report.balances.get("C"), Some(&Money::from_i64(-30)));
    assert_eq!(report.suggestions, vec![tx("B", "A", 30), tx("C", "A", 30)]);
    assert!(report.diagnostics.is_empty());
}

#[rstest]
fn report_keeps_going_past_a_ghost_payer(store: InMemoryStore) {
    let mut ghost = dinner();
    ghost.id = Some(ExpenseId::from("boo"));
    ghost.paid_by = MemberId::from("ghost");
    store.snapshot.lock().unwrap().expenses.push(ghost);

    let report = LedgerService::new(&store, &store)
        .report(GROUP)
        .expect("report");

    assert_eq!(report.balances.get("A"), Some(&Money::from_i64(60)));
    assert_eq!(report.diagnostics.len(), 1);
    assert!(matches!(
        &report.diagnostics[0],
        BalanceError::UnknownPayer { payer, .. } if payer.as_str() == "ghost"
    ));
}

#[rstest]
fn unknown_group_is_a_store_error(store: InMemoryStore) {
    let result = LedgerService::new(&store, &store).report("elsewhere");
    assert!(matches!(
        result,
        Err(LedgerError::Store(StoreError::GroupNotFound(id))) if id == "elsewhere"
    ));
}

#[rstest]
fn equal_split_without_participants_covers_whole_group(store: InMemoryStore) {
    let service = LedgerService::new(&store, &store);
    let expense = service
        .admit_expense(
            GROUP,
            ExpenseDraft {
                title: "Groceries".to_owned(),
                amount: Money::from_i64(10),
                paid_by: MemberId::from("B"),
                created_at: at(2_000),
                split: SplitRequest::Equal(Vec::new()),
            },
        )
        .expect("admitted");

    assert_eq!(expense.id, Some(ExpenseId::from("e1")));
    assert_eq!(expense.split.len(), 3);
    assert_eq!(expense.split.get("C"), Some(Money::from(dec!(3.34))));
    assert_eq!(store.writes(), 1);

    let report = service.report(GROUP).expect("report");
    assert_eq!(report.balances.values().sum::<Money>(), Money::ZERO);
}

#[rstest]
fn mismatched_split_is_never_written(store: InMemoryStore) {
    let service = LedgerService::new(&store, &store);
    let result = service.admit_expense(
        GROUP,
        ExpenseDraft {
            title: "Lunch".to_owned(),
            amount: Money::from_i64(30),
            paid_by: MemberId::from("A"),
            created_at: at(3_000),
            split: SplitRequest::Explicit(
                [("A", Money::from_i64(10)), ("B", Money::from_i64(15))]
                    .into_iter()
                    .collect::<SplitShares>(),
            ),
        },
    );

    assert!(matches!(
        result,
        Err(LedgerError::InvalidSplit(SplitError::SumMismatch { .. }))
    ));
    assert_eq!(store.writes(), 0);
}

#[rstest]
#[case::payer_outside_group("Z", &["A"])]
#[case::participant_outside_group("A", &["A", "Z"])]
fn non_members_are_rejected(
    store: InMemoryStore,
    #[case] payer: &str,
    #[case] participants: &[&str],
) {
    let result = LedgerService::new(&store, &store).admit_expense(
        GROUP,
        ExpenseDraft {
            title: "Snacks".to_owned(),
            amount: Money::from_i64(4),
            paid_by: MemberId::from(payer),
            created_at: at(4_000),
            split: SplitRequest::Equal(participants.iter().copied().map(MemberId::from).collect()),
        },
    );

    assert!(matches!(
        result,
        Err(LedgerError::NotAMember { member, .. }) if member.as_str() == "Z"
    ));
    assert_eq!(store.writes(), 0);
}

#[rstest]
fn recorded_settlement_clears_suggestion(store: InMemoryStore) {
    let service = LedgerService::new(&store, &store);
    service
        .record_settlement(
            GROUP,
            RecordedSettlement {
                from: MemberId::from("B"),
                to: MemberId::from("A"),
                amount: Money::from_i64(30),
                created_at: at(5_000),
            },
        )
        .expect("recorded");

    let report = service.report(GROUP).expect("report");
    assert_eq!(report.balances.get("B"), Some(&Money::ZERO));
    assert_eq!(report.suggestions, vec![tx("C", "A", 30)]);
}

#[rstest]
#[case::zero_amount("B", "A", 0)]
#[case::self_payment("B", "B", 5)]
#[case::outsider("Z", "A", 5)]
fn invalid_settlements_are_rejected(
    store: InMemoryStore,
    #[case] from: &str,
    #[case] to: &str,
    #[case] amount: i64,
) {
    let result = LedgerService::new(&store, &store).record_settlement(
        GROUP,
        RecordedSettlement {
            from: MemberId::from(from),
            to: MemberId::from(to),
            amount: Money::from_i64(amount),
            created_at: at(6_000),
        },
    );

    assert!(result.is_err());
    assert_eq!(store.writes(), 0);
}

#[rstest]
fn history_is_sorted_oldest_first(store: InMemoryStore) {
    let added = HistoryEntry {
        created_at: at(10),
        event: HistoryEvent::ExpenseAdded {
            title: "Dinner".to_owned(),
            amount: Money::from_i64(90),
            paid_by: Some(MemberId::from("A")),
        },
    };
    let settled = HistoryEntry {
        created_at: at(20),
        event: HistoryEvent::SettlementRecorded {
            from: MemberId::from("B"),
            to: MemberId::from("A"),
            amount: Money::from_i64(30),
        },
    };
    store.snapshot.lock().unwrap().history = vec![settled.clone(), added.clone()];

    let history = LedgerService::new(&store, &store)
        .history(GROUP)
        .expect("history");
    assert_eq!(history, vec![added, settled]);
}

#[rstest]
fn deleting_an_expense_removes_its_effect(store: InMemoryStore) {
    let service = LedgerService::new(&store, &store);
    let removed = service
        .delete_expense(GROUP, &ExpenseId::from("e0"), &MemberId::from("B"))
        .expect("deleted");

    assert_eq!(removed.map(|expense| expense.title), Some("Dinner".to_owned()));
    let report = service.report(GROUP).expect("report");
    assert!(report.balances.values().all(|balance| balance.is_zero()));
    assert!(report.is_settled());
    assert!(matches!(
        &service.history(GROUP).expect("history")[..],
        [HistoryEntry { event: HistoryEvent::ExpenseDeleted { by: Some(by), .. }, .. }]
            if by.as_str() == "B"
    ));
}

#[rstest]
#[case::outsider_deletes("e0", "Z")]
#[case::unknown_expense("nope", "A")]
fn invalid_deletions_are_rejected(
    store: InMemoryStore,
    #[case] expense_id: &str,
    #[case] by: &str,
) {
    let result = LedgerService::new(&store, &store).delete_expense(
        GROUP,
        &ExpenseId::from(expense_id),
        &MemberId::from(by),
    );

    assert!(matches!(
        result,
        Err(LedgerError::NotAMember { .. } | LedgerError::UnknownExpense { .. })
    ));
    assert_eq!(store.writes(), 0);
}

#[rstest]
fn unreadable_records_are_reported_and_deletable(store: InMemoryStore) {
    store
        .snapshot
        .lock()
        .unwrap()
        .rejected_records
        .push(BalanceError::MalformedRecord {
            path: "expenses/-bad".to_owned(),
            reason: "invalid type: string \"12\", expected a number".to_owned(),
        });
    let service = LedgerService::new(&store, &store);

    let report = service.report(GROUP).expect("report");
    assert_eq!(report.balances.get("A"), Some(&Money::from_i64(60)));
    assert!(matches!(
        report.diagnostics.as_slice(),
        [BalanceError::MalformedRecord { path, .. }] if path == "expenses/-bad"
    ));

    let removed = service
        .delete_expense(GROUP, &ExpenseId::from("-bad"), &MemberId::from("A"))
        .expect("deleted");
    assert_eq!(removed, None);
    assert!(service.report(GROUP).expect("report").diagnostics.is_empty());
}
