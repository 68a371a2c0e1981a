//! Codec for the realtime-database JSON layout.
//!
//! Groups live under `groups/<groupId>`; members, expenses, settlements and
//! history are keyed maps whose key order is the insertion order of the store.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::str::FromStr;
use tabsplit_application::{GroupSnapshot, HistoryEntry, HistoryEvent};
use tabsplit_domain::{
    BalanceError, Expense, ExpenseId, MemberId, Money, RecordedSettlement, SplitShares,
};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read or write snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("group {0} not found in snapshot")]
    GroupNotFound(String),
    #[error("expense {0} not found in snapshot")]
    ExpenseNotFound(String),
    #[error("invalid amount {value} at {field}")]
    InvalidAmount { field: String, value: String },
    #[error("invalid timestamp {value} at {field}")]
    InvalidTimestamp { field: String, value: i64 },
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DatabaseDto {
    #[serde(default)]
    pub groups: IndexMap<String, GroupDto>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub members: IndexMap<String, bool>,
    /// Raw records, decoded one by one so a corrupt entry only loses itself.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub expenses: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub settlements: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub history: IndexMap<String, HistoryDto>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDto {
    pub title: String,
    pub amount: Number,
    pub paid_by: String,
    pub created_at: i64,
    #[serde(default)]
    pub split: IndexMap<String, Number>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDto {
    pub from: String,
    pub to: String,
    pub amount: Number,
    pub created_at: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDto {
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddedData {
    title: String,
    amount: Number,
    #[serde(default)]
    paid_by: Option<String>,
}

#[derive(Deserialize)]
struct DeletedData {
    id: String,
    #[serde(default)]
    prev: Option<DeletedPrev>,
}

#[derive(Deserialize)]
struct DeletedPrev {
    title: String,
}

pub fn parse_database(json: &str) -> Result<DatabaseDto, SnapshotError> {
    Ok(serde_json::from_str(json)?)
}

pub fn decode_amount(field: &str, number: &Number) -> Result<Money, SnapshotError> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Money::from_decimal)
        .map_err(|_| SnapshotError::InvalidAmount {
            field: field.to_owned(),
            value: text,
        })
}

pub fn encode_amount(field: &str, amount: Money) -> Result<Number, SnapshotError> {
    let text = amount.as_decimal().normalize().to_string();
    Number::from_str(&text).map_err(|_| SnapshotError::InvalidAmount {
        field: field.to_owned(),
        value: text,
    })
}

pub fn decode_timestamp(field: &str, millis: i64) -> Result<DateTime<Utc>, SnapshotError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| SnapshotError::InvalidTimestamp {
        field: field.to_owned(),
        value: millis,
    })
}

pub fn decode_expense(key: &str, dto: &ExpenseDto) -> Result<Expense, SnapshotError> {
    let base = format!("expenses/{key}");
    let split = dto
        .split
        .iter()
        .map(|(member, share)| {
            decode_amount(&format!("{base}/split/{member}"), share)
                .map(|share| (MemberId::from(member.as_str()), share))
        })
        .collect::<Result<SplitShares, _>>()?;

    Ok(Expense {
        id: Some(ExpenseId::from(key)),
        title: dto.title.clone(),
        amount: decode_amount(&format!("{base}/amount"), &dto.amount)?,
        paid_by: MemberId::from(dto.paid_by.as_str()),
        created_at: decode_timestamp(&format!("{base}/createdAt"), dto.created_at)?,
        split,
    })
}

pub fn encode_expense(expense: &Expense) -> Result<ExpenseDto, SnapshotError> {
    let split = expense
        .split
        .iter()
        .map(|(member, share)| {
            encode_amount(&format!("split/{member}"), share).map(|share| (member.to_string(), share))
        })
        .collect::<Result<IndexMap<_, _>, _>>()?;

    Ok(ExpenseDto {
        title: expense.title.clone(),
        amount: encode_amount("amount", expense.amount)?,
        paid_by: expense.paid_by.to_string(),
        created_at: expense.created_at.timestamp_millis(),
        split,
    })
}

pub fn decode_settlement(
    key: &str,
    dto: &SettlementDto,
) -> Result<RecordedSettlement, SnapshotError> {
    let base = format!("settlements/{key}");
    Ok(RecordedSettlement {
        from: MemberId::from(dto.from.as_str()),
        to: MemberId::from(dto.to.as_str()),
        amount: decode_amount(&format!("{base}/amount"), &dto.amount)?,
        created_at: decode_timestamp(&format!("{base}/createdAt"), dto.created_at)?,
    })
}

pub fn encode_settlement(settlement: &RecordedSettlement) -> Result<SettlementDto, SnapshotError> {
    Ok(SettlementDto {
        from: settlement.from.to_string(),
        to: settlement.to.to_string(),
        amount: encode_amount("amount", settlement.amount)?,
        created_at: settlement.created_at.timestamp_millis(),
    })
}

/// Decodes one history record. Unknown or malformed entries yield `None`;
/// history is informational and never blocks loading a group.
pub fn decode_history(key: &str, dto: &HistoryDto) -> Option<HistoryEntry> {
    let created_at = decode_timestamp(&format!("history/{key}/createdAt"), dto.created_at).ok()?;
    let event = match dto.kind.as_str() {
        "expense_added" => {
            let data = AddedData::deserialize(&dto.data).ok()?;
            HistoryEvent::ExpenseAdded {
                title: data.title,
                amount: decode_amount("history/data/amount", &data.amount).ok()?,
                paid_by: data.paid_by.map(MemberId::from),
            }
        }
        "expense_deleted" => {
            let data = DeletedData::deserialize(&dto.data).ok()?;
            HistoryEvent::ExpenseDeleted {
                expense_id: ExpenseId(data.id),
                by: dto.by.clone().map(MemberId::from),
                title: data.prev.map(|prev| prev.title),
            }
        }
        "settlement" => {
            let data = SettlementDto::deserialize(&dto.data).ok()?;
            HistoryEvent::SettlementRecorded {
                from: MemberId::from(data.from),
                to: MemberId::from(data.to),
                amount: decode_amount("history/data/amount", &data.amount).ok()?,
            }
        }
        other => {
            tracing::warn!(key, kind = other, "Ignoring history entry of unknown type");
            return None;
        }
    };
    tracing::trace!(key, kind = %dto.kind, "Decoded history entry");
    Some(HistoryEntry { created_at, event })
}

/// Decodes every non-null record of one collection. Records that fail are
/// returned as [`BalanceError::MalformedRecord`] instead of failing the group.
fn decode_records<D, T>(
    collection: &str,
    records: &IndexMap<String, Value>,
    decode: impl Fn(&str, &D) -> Result<T, SnapshotError>,
    rejected: &mut Vec<BalanceError>,
) -> Vec<T>
where
    D: serde::de::DeserializeOwned,
{
    let mut decoded = Vec::with_capacity(records.len());
    for (key, raw) in records {
        if raw.is_null() {
            continue;
        }
        let result = D::deserialize(raw)
            .map_err(SnapshotError::from)
            .and_then(|dto| decode(key, &dto));
        match result {
            Ok(record) => decoded.push(record),
            Err(err) => {
                let path = format!("{collection}/{key}");
                tracing::warn!(path = %path, error = %err, "Skipping unreadable record");
                rejected.push(BalanceError::MalformedRecord {
                    path,
                    reason: err.to_string(),
                });
            }
        }
    }
    decoded
}

pub fn decode_group(group_id: &str, dto: &GroupDto) -> Result<GroupSnapshot, SnapshotError> {
    let mut rejected_records = Vec::new();
    let expenses = decode_records::<ExpenseDto, _>(
        "expenses",
        &dto.expenses,
        decode_expense,
        &mut rejected_records,
    );
    let settlements = decode_records::<SettlementDto, _>(
        "settlements",
        &dto.settlements,
        decode_settlement,
        &mut rejected_records,
    );
    let history: Vec<HistoryEntry> = dto
        .history
        .iter()
        .filter_map(|(key, entry)| decode_history(key, entry))
        .collect();

    Ok(GroupSnapshot {
        group_id: group_id.to_owned(),
        name: dto.name.clone(),
        created_by: dto.created_by.clone().map(MemberId::from),
        members: dto
            .members
            .iter()
            .filter(|(_, active)| **active)
            .map(|(member, _)| MemberId::from(member.as_str()))
            .collect(),
        expenses,
        settlements,
        history,
        rejected_records,
    })
}
