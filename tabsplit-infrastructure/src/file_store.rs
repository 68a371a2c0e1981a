use chrono::Utc;
use crate::snapshot::{
    self, DatabaseDto, GroupDto, HistoryDto, SnapshotError, encode_expense, encode_settlement,
};
use serde_json::{Value, json};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tabsplit_application::{ExpenseRecorder, GroupSnapshot, GroupSnapshotSource, StoreError};
use tabsplit_domain::{Expense, ExpenseId, MemberId, RecordedSettlement};
use uuid::Uuid;

impl From<SnapshotError> for StoreError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::GroupNotFound(group_id) => StoreError::GroupNotFound(group_id),
            SnapshotError::ExpenseNotFound(expense_id) => {
                StoreError::ExpenseNotFound(ExpenseId(expense_id))
            }
            other => StoreError::backend(other),
        }
    }
}

/// Store backed by an export of the realtime database.
///
/// Every call re-reads the file, so each load is a fresh snapshot. Writes
/// rewrite the whole document and keep unrelated nodes untouched.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<DatabaseDto, SnapshotError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => snapshot::parse_database(&json),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(DatabaseDto::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, database: &DatabaseDto) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(database)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn update<T>(
        &self,
        group_id: &str,
        apply: impl FnOnce(&mut GroupDto) -> Result<T, SnapshotError>,
    ) -> Result<T, SnapshotError> {
        let mut database = self.read()?;
        let group = database
            .groups
            .get_mut(group_id)
            .ok_or_else(|| SnapshotError::GroupNotFound(group_id.to_owned()))?;
        let result = apply(group)?;
        self.write(&database)?;
        Ok(result)
    }

    pub fn load_group(&self, group_id: &str) -> Result<GroupSnapshot, SnapshotError> {
        let database = self.read()?;
        let group = database
            .groups
            .get(group_id)
            .ok_or_else(|| SnapshotError::GroupNotFound(group_id.to_owned()))?;
        let snapshot = snapshot::decode_group(group_id, group)?;
        tracing::debug!(
            path = %self.path.display(),
            group_id,
            member_count = snapshot.members.len(),
            expense_count = snapshot.expenses.len(),
            "Loaded group snapshot"
        );
        Ok(snapshot)
    }
}

fn push_key() -> String {
    format!("-{}", Uuid::new_v4().simple())
}

impl GroupSnapshotSource for JsonFileStore {
    fn load(&self, group_id: &str) -> Result<GroupSnapshot, StoreError> {
        Ok(self.load_group(group_id)?)
    }
}

impl ExpenseRecorder for JsonFileStore {
    fn record_expense(&self, group_id: &str, expense: &Expense) -> Result<ExpenseId, StoreError> {
        let dto = encode_expense(expense)?;
        let record = serde_json::to_value(&dto).map_err(SnapshotError::from)?;
        let key = self.update(group_id, |group| {
            let key = push_key();
            group.history.insert(
                push_key(),
                HistoryDto {
                    kind: "expense_added".to_owned(),
                    created_at: dto.created_at,
                    by: Some(dto.paid_by.clone()),
                    data: record.clone(),
                },
            );
            group.expenses.insert(key.clone(), record);
            Ok(key)
        })?;
        Ok(ExpenseId(key))
    }

    fn record_settlement(
        &self,
        group_id: &str,
        settlement: &RecordedSettlement,
    ) -> Result<(), StoreError> {
        let dto = encode_settlement(settlement)?;
        let record = serde_json::to_value(&dto).map_err(SnapshotError::from)?;
        self.update(group_id, |group| {
            group.history.insert(
                push_key(),
                HistoryDto {
                    kind: "settlement".to_owned(),
                    created_at: dto.created_at,
                    by: Some(dto.from.clone()),
                    data: record.clone(),
                },
            );
            group.settlements.insert(push_key(), record);
            Ok(())
        })?;
        Ok(())
    }

    fn delete_expense(
        &self,
        group_id: &str,
        expense_id: &ExpenseId,
        by: &MemberId,
    ) -> Result<(), StoreError> {
        self.update(group_id, |group| {
            let Some(slot) = group
                .expenses
                .get_mut(expense_id.0.as_str())
                .filter(|record| !record.is_null())
            else {
                return Err(SnapshotError::ExpenseNotFound(expense_id.to_string()));
            };
            let prev = std::mem::replace(slot, Value::Null);
            group.history.insert(
                push_key(),
                HistoryDto {
                    kind: "expense_deleted".to_owned(),
                    created_at: Utc::now().timestamp_millis(),
                    by: Some(by.to_string()),
                    data: json!({ "id": expense_id.0, "prev": prev }),
                },
            );
            Ok(())
        })?;
        Ok(())
    }
}
