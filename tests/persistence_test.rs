//! Integration tests for record persistence
//!
//! Store, retrieve, update, delete and refresh records, and count rows
//! through rendered queries.

mod common;

use chrono::{NaiveDate, TimeZone};
use recordhaus::prelude::*;
use serde_json::json;
use std::collections::HashMap;

#[record]
#[table(name = "it_notes")]
#[derive(PartialEq)]
pub struct Note {
    pub id: RecordId,
    pub title: String,
    pub body: Option<String>,
    pub priority: i32,
    pub views: i64,
    pub rank: i16,
    pub score: f64,
    pub active: bool,
    pub token: Uuid,
    pub due: NaiveDate,
    pub tags: Vec<String>,
    pub meta: serde_json::Value,
    pub properties: HashMap<String, String>,
    #[field(handler = "StringListHandler")]
    pub labels: Vec<String>,
    #[field(insert_timestamp)]
    pub stamped_at: Option<DateTime<Utc>>,
    #[transient]
    pub scratch: String,
}

#[record]
#[table(name = "it_memos")]
pub struct Memo {
    pub id: RecordId,
    pub text: Option<String>,
    pub due: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub token: Option<Uuid>,
    pub tags: Option<Vec<String>>,
}

#[record]
#[table(name = "it_counters")]
pub struct Counter {
    pub id: RecordId,
    pub name: String,
    pub amount: i64,
}

#[record]
#[table(name = "it_tallies")]
pub struct Tally {
    pub id: RecordId,
    pub name: String,
    pub amount: i64,
}

#[record]
#[table(name = "it_bulk_items")]
pub struct BulkItem {
    pub id: RecordId,
    pub name: String,
    pub amount: i64,
}

#[record]
#[table(name = "it_ghosts")]
pub struct Ghost {
    pub id: RecordId,
    pub name: String,
}

#[record]
#[table(name = "it_fixture_events")]
pub struct FixtureEvent {
    pub id: RecordId,
    pub name: String,
    pub happened_at: DateTime<Utc>,
}

#[record]
#[table(name = "it_drafts")]
pub struct Draft {
    pub id: RecordId,
    pub title: String,
    #[field(handler = "StringListHandler")]
    pub labels: Vec<String>,
    #[field(insert_timestamp)]
    pub created_at: Option<DateTime<Utc>>,
}

#[record]
#[table(name = "it_sketches")]
pub struct Sketch {
    pub id: RecordId,
    pub title: String,
    #[field(insert_timestamp)]
    pub created_at: Option<DateTime<Utc>>,
}

fn sample_note() -> Note {
    let mut properties = HashMap::new();
    properties.insert("color".to_string(), "teal".to_string());

    Note {
        title: "groceries".to_string(),
        body: Some("milk, eggs".to_string()),
        priority: 3,
        views: 9_000_000_000,
        rank: -2,
        score: 4.25,
        active: true,
        token: Uuid::new_v4(),
        due: NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
        tags: vec!["home".to_string(), "weekly".to_string()],
        meta: json!({"source": "mobile", "version": 2}),
        properties,
        labels: vec!["a".to_string(), "b".to_string()],
        scratch: "not stored".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_round_trip() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.ensure_table::<Note>(true).await.unwrap();
    assert!(services.table_exists::<Note>().await.unwrap());

    let mut note = sample_note();
    assert!(!note.id.is_persisted());
    services.store_object(&mut note).await.unwrap();
    assert!(note.id.is_persisted());

    let stamped = note.stamped_at.expect("insert timestamp is set on insert");
    assert_eq!(stamped.timestamp_subsec_nanos() % 1_000, 0);

    let loaded: Note = services
        .retrieve_by_id(note.id)
        .await
        .unwrap()
        .expect("stored note is found");

    let expected = Note {
        scratch: String::new(),
        ..note.clone()
    };
    assert_eq!(loaded, expected);
}

#[tokio::test]
async fn test_nulls_round_trip() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.ensure_table::<Memo>(true).await.unwrap();

    let mut empty = Memo::default();
    services.store_object(&mut empty).await.unwrap();
    let loaded: Memo = services.retrieve_by_id(empty.id).await.unwrap().unwrap();
    assert_eq!(loaded.text, None);
    assert_eq!(loaded.due, None);
    assert_eq!(loaded.weight, None);
    assert_eq!(loaded.token, None);
    assert_eq!(loaded.tags, None);

    // Setting a value and clearing it again
    let mut memo = loaded;
    memo.text = Some("call back".to_string());
    memo.tags = Some(vec![]);
    services.store_object(&mut memo).await.unwrap();
    memo.text = None;
    services.store_object(&mut memo).await.unwrap();

    let reloaded: Memo = services.retrieve_by_id(memo.id).await.unwrap().unwrap();
    assert_eq!(reloaded.text, None);
    assert_eq!(reloaded.tags, Some(vec![]));
}

#[tokio::test]
async fn test_identity_and_updates() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.ensure_table::<Counter>(true).await.unwrap();

    let mut first = Counter {
        name: "first".to_string(),
        amount: 1,
        ..Default::default()
    };
    let mut second = Counter {
        name: "second".to_string(),
        amount: 2,
        ..Default::default()
    };
    services.store_object(&mut first).await.unwrap();
    services.store_object(&mut second).await.unwrap();
    assert!(second.id.value() > first.id.value());

    // Updating keeps the identity
    let id = first.id;
    first.amount = 10;
    services.store_object(&mut first).await.unwrap();
    services.store_object(&mut first).await.unwrap();
    assert_eq!(first.id, id);

    let loaded: Counter = services.retrieve_by_id(id).await.unwrap().unwrap();
    assert_eq!(loaded.amount, 10);

    // Query by column
    let query = SelectQuery::<Counter>::new()
        .where_clause("name = ?", vec!["second".into()])
        .where_clause("id = ?", vec![second.id.into()]);
    let found = services.retrieve_object(&query).await.unwrap().unwrap();
    assert_eq!(found.id, second.id);
    assert_eq!(found.amount, 2);

    let missing = SelectQuery::<Counter>::new().where_clause("id = ?", vec![(-5i64).into()]);
    assert!(services.retrieve_object(&missing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_of_missing_row_is_not_found() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.ensure_table::<Ghost>(true).await.unwrap();

    let mut ghost = Ghost {
        id: RecordId::new(i64::MAX),
        name: "ghost".to_string(),
    };
    let err = services.store_object(&mut ghost).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
    assert_eq!(err.class(), ErrorClass::Data);
}

#[tokio::test]
async fn test_delete_and_refresh() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.ensure_table::<Tally>(true).await.unwrap();

    let mut counter = Tally {
        name: "to-delete".to_string(),
        amount: 5,
        ..Default::default()
    };
    services.store_object(&mut counter).await.unwrap();
    let id = counter.id;

    // Refresh overwrites local changes with the stored row
    counter.amount = 99;
    services.refresh(&mut counter).await.unwrap();
    assert_eq!(counter.amount, 5);
    assert_eq!(counter.id, id);

    services.delete_object(&mut counter).await.unwrap();
    assert_eq!(counter.id, RecordId::UNSET);
    assert!(services.retrieve_by_id::<Tally>(id).await.unwrap().is_none());

    // Deleting a transient record is a caller error
    let err = services.delete_object(&mut counter).await.unwrap_err();
    assert!(matches!(err, DbError::NotPersisted { .. }));

    // Refresh and delete of a row that is gone
    let mut stale = Tally {
        id,
        name: "stale".to_string(),
        amount: 0,
    };
    assert!(matches!(
        services.refresh(&mut stale).await.unwrap_err(),
        DbError::NotFound { .. }
    ));
    assert!(matches!(
        services.delete_object(&mut stale).await.unwrap_err(),
        DbError::NotFound { .. }
    ));
    assert_eq!(stale.id, id);
}

#[tokio::test]
async fn test_delete_where_and_invalid_queries() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.ensure_table::<BulkItem>(true).await.unwrap();

    for amount in 0..4 {
        let mut item = BulkItem {
            name: "bulk".to_string(),
            amount,
            ..Default::default()
        };
        services.store_object(&mut item).await.unwrap();
    }

    let deleted = services
        .delete_where(
            &DeleteQuery::<BulkItem>::new()
                .where_clause("name = ?", vec!["bulk".into()])
                .filter(QueryFilter::gte("amount", 2i64)),
        )
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    let remaining = services
        .retrieve_list(
            &SelectQuery::<BulkItem>::new()
                .where_clause("name = ?", vec!["bulk".into()])
                .order_by("amount", SortOrder::Desc),
        )
        .await
        .unwrap();
    let amounts: Vec<i64> = remaining.iter().map(|item| item.amount).collect();
    assert_eq!(amounts, vec![1, 0]);

    // Rejected by the server: a statement error, not retried
    let broken = SelectQuery::<BulkItem>::new().where_clause("no_such_column = ?", vec![1i64.into()]);
    let err = services.retrieve_list(&broken).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::Statement);

    // Rejected before reaching the server
    let bad_alias = SelectQuery::<BulkItem>::new().alias("b; DROP TABLE it_bulk_items");
    assert!(matches!(
        services.retrieve_list(&bad_alias).await.unwrap_err(),
        DbError::Configuration(_)
    ));
}

#[tokio::test]
async fn test_count_by_date_range() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.ensure_table::<FixtureEvent>(true).await.unwrap();

    let at = |day: u32, hour: u32, minute: u32, second: u32| {
        Utc.with_ymd_and_hms(2024, 1, day, hour, minute, second).unwrap()
    };
    let midnight = |year: i32, month: u32, day: u32| {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    };

    let fixture = [
        at(1, 0, 0, 0),
        at(1, 12, 0, 0),
        at(1, 23, 59, 59),
        at(2, 0, 0, 0),
        at(2, 8, 30, 0),
        at(3, 0, 0, 0),
        at(3, 18, 0, 0),
        at(4, 0, 0, 0),
        at(5, 9, 15, 0),
    ];
    for (index, happened_at) in fixture.into_iter().enumerate() {
        let mut event = FixtureEvent {
            name: format!("event-{}", index),
            happened_at,
            ..Default::default()
        };
        services.store_object(&mut event).await.unwrap();
    }

    let total = services
        .retrieve_count(&SelectQuery::<FixtureEvent>::new().select("COUNT(*)"))
        .await
        .unwrap();
    assert_eq!(total, 9);

    // (from, until, until included, expected rows)
    let ranges = [
        (midnight(2024, 1, 1), midnight(2024, 1, 2), false, 3),
        (midnight(2024, 1, 1), midnight(2024, 1, 2), true, 4),
        (midnight(2024, 1, 2), midnight(2024, 1, 3), false, 2),
        (midnight(2024, 1, 2), midnight(2024, 1, 4), true, 5),
        (midnight(2024, 1, 4), midnight(2024, 1, 6), false, 2),
        (midnight(2023, 12, 31), midnight(2024, 1, 1), false, 0),
    ];

    for (from, until, inclusive, expected) in ranges {
        let upper = if inclusive {
            "happened_at <= ?"
        } else {
            "happened_at < ?"
        };
        let query = SelectQuery::<FixtureEvent>::new()
            .select("COUNT(*)")
            .where_clause("happened_at >= ?", vec![from.into()])
            .where_clause(upper, vec![until.into()]);

        let count = services.retrieve_count(&query).await.unwrap();
        assert_eq!(
            count, expected,
            "range {} .. {} (inclusive: {}) rendered as {}",
            from, until, inclusive, query.query_string()
        );
    }

    let in_order = services
        .retrieve_list(
            &SelectQuery::<FixtureEvent>::new()
                .alias("e")
                .where_clause("e.happened_at >= ?", vec![midnight(2024, 1, 3).into()])
                .order_by("e.happened_at", SortOrder::Asc),
        )
        .await
        .unwrap();
    let names: Vec<&str> = in_order.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["event-5", "event-6", "event-7", "event-8"]);
}

#[tokio::test]
async fn test_failed_insert_leaves_record_transient() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.drop_table::<Sketch>().await.unwrap();

    let mut sketch = Sketch {
        title: "lost".to_string(),
        ..Default::default()
    };
    let err = services.store_object(&mut sketch).await.unwrap_err();
    assert!(matches!(err, DbError::MissingTable { .. }), "{err:?}");
    assert!(!sketch.id.is_persisted());
    assert_eq!(sketch.created_at, None);
}

#[tokio::test]
async fn test_string_list_that_cannot_round_trip_is_rejected() {
    let Some(services) = common::setup_services().await else {
        return;
    };
    services.ensure_table::<Draft>(true).await.unwrap();

    for labels in [vec!["a,b".to_string()], vec![String::new()]] {
        let mut draft = Draft {
            title: "labels".to_string(),
            labels: labels.clone(),
            ..Default::default()
        };
        let err = services.store_object(&mut draft).await.unwrap_err();
        assert!(matches!(err, DbError::Mapping { .. }), "{labels:?}: {err:?}");
        assert!(!draft.id.is_persisted());
        assert_eq!(draft.created_at, None);
    }

    let mut draft = Draft {
        title: "labels".to_string(),
        labels: vec![String::new(), "x".to_string()],
        ..Default::default()
    };
    services.store_object(&mut draft).await.unwrap();
    let loaded: Draft = services.retrieve_by_id(draft.id).await.unwrap().unwrap();
    assert_eq!(loaded.labels, draft.labels);
    assert_eq!(
        services
            .retrieve_count(&SelectQuery::<Draft>::new().select("COUNT(*)"))
            .await
            .unwrap(),
        1
    );
}
