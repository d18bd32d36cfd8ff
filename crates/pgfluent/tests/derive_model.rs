//! Derived model metadata and row decoding.
//!
//! These tests do NOT touch a database.

#![allow(dead_code)]

use pgfluent::{FromRecord, Model, ModelMeta, OrmError, Value, record};

#[derive(Debug, PartialEq, Model)]
#[orm(table = "members", primary_key = "member_id")]
struct Member {
    member_id: i64,
    #[orm(fillable)]
    name: String,
    #[orm(fillable, column = "email_address")]
    email: Option<String>,
    #[orm(fillable, default = "active")]
    status: String,
    #[orm(default = -1)]
    score: i32,
}

#[derive(Debug, Model)]
struct AuditEntry {
    #[orm(id)]
    entry_id: i64,
    message: String,
}

#[test]
fn struct_attributes_drive_metadata() {
    assert_eq!(Member::TABLE, "members");
    assert_eq!(Member::PRIMARY_KEY, "member_id");
    assert_eq!(
        Member::fillable(),
        Some(&["name", "email_address", "status"][..])
    );
    assert_eq!(
        Member::defaults(),
        Some(record! { "status" => "active", "score" => -1 })
    );
}

#[test]
fn table_and_key_fall_back_to_type_and_id_field() {
    assert_eq!(
        AuditEntry::meta(),
        ModelMeta::table("audit_entrys", "entry_id")
    );
    assert_eq!(AuditEntry::fillable(), None);
}

#[test]
fn from_record_reads_mapped_columns() {
    let member = Member::from_record(&record! {
        "member_id" => 3,
        "name" => "ana",
        "email_address" => Value::Null,
        "status" => "active",
        "score" => 12,
    })
    .unwrap();

    assert_eq!(
        member,
        Member {
            member_id: 3,
            name: "ana".into(),
            email: None,
            status: "active".into(),
            score: 12,
        }
    );
}

#[test]
fn from_record_reports_the_failing_column() {
    let err = AuditEntry::from_record(&record! { "entry_id" => 1 }).unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "message"));
}

#[test]
fn builders_use_derived_metadata() {
    let sql = Member::where_op("score", ">=", 10).latest(None).to_sql();
    assert_eq!(
        sql,
        "SELECT * FROM members WHERE score >= ? ORDER BY member_id DESC"
    );
}
