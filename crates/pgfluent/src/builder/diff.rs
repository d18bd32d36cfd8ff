//! Insert and update payloads.

use crate::error::{OrmError, OrmResult};
use crate::model::ModelMeta;
use crate::row::Record;

/// Keys of `current` whose value differs from `original`.
///
/// Values compare with [`Value::loose_eq`](crate::Value::loose_eq); a key
/// missing from `original` is always dirty.
pub fn dirty_fields(current: &Record, original: &Record) -> Record {
    current
        .iter()
        .filter(|(column, value)| {
            original
                .get(column.as_str())
                .is_none_or(|before| !before.loose_eq(value))
        })
        .map(|(column, value)| (column.clone(), value.clone()))
        .collect()
}

/// Columns an UPDATE should set: the dirty fields minus the primary key.
pub fn update_payload(current: &Record, original: &Record, primary_key: &str) -> Record {
    let mut payload = dirty_fields(current, original);
    payload.shift_remove(primary_key);
    payload
}

/// Columns an INSERT should write.
///
/// Caller data is restricted to the fillable columns; defaults then fill in
/// keys the caller left out without overriding anything provided.
pub fn insert_payload(data: Record, meta: &ModelMeta) -> OrmResult<Record> {
    let Some(fillable) = &meta.fillable else {
        return Err(OrmError::MissingFillableConfiguration(meta.table.clone()));
    };

    let mut payload: Record = data
        .into_iter()
        .filter(|(column, _)| fillable.iter().any(|f| f == column))
        .collect();
    if payload.is_empty() {
        return Err(OrmError::NoInsertableColumns(meta.table.clone()));
    }

    if let Some(defaults) = &meta.defaults {
        for (column, value) in defaults {
            payload
                .entry(column.clone())
                .or_insert_with(|| value.clone());
        }
    }
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::value::Value;

    fn meta(fillable: Option<&[&str]>, defaults: Option<Record>) -> ModelMeta {
        ModelMeta {
            table: "t".to_string(),
            primary_key: "id".to_string(),
            fillable: fillable.map(|cols| cols.iter().map(|c| c.to_string()).collect()),
            defaults,
        }
    }

    #[test]
    fn only_changed_columns_are_dirty() {
        let original = record! { "id" => 1, "name" => "a", "age" => 30 };
        let current = record! { "id" => 1, "name" => "b", "age" => "30" };
        assert_eq!(dirty_fields(&current, &original), record! { "name" => "b" });
    }

    #[test]
    fn keys_missing_from_original_are_dirty() {
        let original = record! { "id" => 1 };
        let current = record! { "id" => 1, "nickname" => Value::Null };
        assert_eq!(
            dirty_fields(&current, &original),
            record! { "nickname" => Value::Null }
        );
    }

    #[test]
    fn update_payload_never_sets_the_primary_key() {
        let original = record! { "id" => 1, "name" => "a" };
        let current = record! { "id" => 2, "name" => "b" };
        assert_eq!(
            update_payload(&current, &original, "id"),
            record! { "name" => "b" }
        );
    }

    #[test]
    fn insert_keeps_fillable_columns_in_caller_order() {
        let payload = insert_payload(
            record! { "name" => "x", "is_admin" => true, "age" => 5 },
            &meta(Some(&["age", "name"]), None),
        )
        .unwrap();
        assert_eq!(payload, record! { "name" => "x", "age" => 5 });
        assert_eq!(payload.keys().collect::<Vec<_>>(), vec!["name", "age"]);
    }

    #[test]
    fn defaults_never_override_caller_data() {
        let payload = insert_payload(
            record! { "name" => "x", "status" => "banned" },
            &meta(
                Some(&["name", "status"]),
                Some(record! { "status" => "active", "score" => 0 }),
            ),
        )
        .unwrap();
        assert_eq!(
            payload,
            record! { "name" => "x", "status" => "banned", "score" => 0 }
        );
    }

    #[test]
    fn insert_requires_fillable_configuration() {
        let err = insert_payload(record! { "name" => "x" }, &meta(None, None)).unwrap_err();
        assert!(matches!(err, OrmError::MissingFillableConfiguration(t) if t == "t"));

        let err = insert_payload(record! { "secret" => "x" }, &meta(Some(&["name"]), None))
            .unwrap_err();
        assert!(matches!(err, OrmError::NoInsertableColumns(_)));
    }
}
