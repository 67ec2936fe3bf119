mod common;

use common::{Catalog, filter_named, seed_catalog, setup_db};
use libsql::params;
use rulekeeper_core::{Database, IntegrityError, Rule, Session, SessionError, TypedValue};

/// Saves an empty rule on "SMS Received" and returns its id plus the id of
/// the text "contains" filter on the Body attribute.
async fn empty_rule(session: &Session, catalog: &Catalog) -> (i64, i64) {
    let event = session.event(catalog.sms_received).expect("event");
    let rule_id = session
        .save_rule(&Rule::new("Hand written", event))
        .await
        .expect("save");
    let body = session.attribute(catalog.body).expect("body");
    let contains = filter_named(session, &body, "contains").await;
    (rule_id, contains.id)
}

async fn insert_filter_row(
    db: &Database,
    id: i64,
    rule_id: i64,
    attribute_id: i64,
    filter_id: i64,
    parent: Option<i64>,
    data: &str,
) {
    let conn = db.connection().await.expect("connection");
    conn.execute(
        "INSERT INTO rule_filters (id, rule_id, event_attribute_id, data_filter_id, parent_rule_filter_id, data)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, rule_id, attribute_id, filter_id, parent, data],
    )
    .await
    .expect("insert filter row");
}

#[tokio::test]
async fn rows_stored_out_of_order_assemble_into_a_chain() {
    let (db, _dir) = setup_db().await;
    let catalog = seed_catalog(&db).await;
    let session = Session::open(db.clone()).await.expect("open session");
    let (rule_id, contains) = empty_rule(&session, &catalog).await;

    insert_filter_row(&db, 12, rule_id, catalog.body, contains, Some(11), "c").await;
    insert_filter_row(&db, 10, rule_id, catalog.body, contains, Some(-1), "a").await;
    insert_filter_row(&db, 11, rule_id, catalog.body, contains, Some(10), "b").await;

    let rule = session.load_rule(rule_id).await.expect("load");
    assert_eq!(rule.filters.len(), 1);
    let root = &rule.filters[0];
    assert_eq!(root.id, Some(10));
    assert_eq!(root.value, TypedValue::Text("a".into()));
    assert_eq!(root.children[0].id, Some(11));
    assert_eq!(root.children[0].children[0].id, Some(12));
    assert_eq!(root.depth(), 3);
}

#[tokio::test]
async fn null_and_zero_parents_read_as_root() {
    let (db, _dir) = setup_db().await;
    let catalog = seed_catalog(&db).await;
    let session = Session::open(db.clone()).await.expect("open session");
    let (rule_id, contains) = empty_rule(&session, &catalog).await;

    insert_filter_row(&db, 21, rule_id, catalog.body, contains, Some(0), "zero").await;
    insert_filter_row(&db, 20, rule_id, catalog.body, contains, None, "null").await;

    let rule = session.load_rule(rule_id).await.expect("load");
    let ids: Vec<Option<i64>> = rule.filters.iter().map(|node| node.id).collect();
    assert_eq!(ids, vec![Some(20), Some(21)]);
}

#[tokio::test]
async fn dangling_parent_is_reported() {
    let (db, _dir) = setup_db().await;
    let catalog = seed_catalog(&db).await;
    let session = Session::open(db.clone()).await.expect("open session");
    let (rule_id, contains) = empty_rule(&session, &catalog).await;

    insert_filter_row(&db, 30, rule_id, catalog.body, contains, Some(-1), "ok").await;
    insert_filter_row(&db, 31, rule_id, catalog.body, contains, Some(99), "lost").await;

    let err = session.load_rule(rule_id).await.expect_err("dangling");
    assert!(matches!(
        err,
        SessionError::DataIntegrity(IntegrityError::UnresolvedFilters(ref ids)) if ids == &vec![31]
    ));
}

#[tokio::test]
async fn parent_cycle_is_reported() {
    let (db, _dir) = setup_db().await;
    let catalog = seed_catalog(&db).await;
    let session = Session::open(db.clone()).await.expect("open session");
    let (rule_id, contains) = empty_rule(&session, &catalog).await;

    insert_filter_row(&db, 40, rule_id, catalog.body, contains, Some(41), "x").await;
    insert_filter_row(&db, 41, rule_id, catalog.body, contains, Some(40), "y").await;

    let err = session.load_rule(rule_id).await.expect_err("cycle");
    assert!(matches!(
        err,
        SessionError::DataIntegrity(IntegrityError::UnresolvedFilters(ref ids)) if ids == &vec![40, 41]
    ));
}

#[tokio::test]
async fn unknown_action_is_a_missing_descriptor() {
    let (db, _dir) = setup_db().await;
    let catalog = seed_catalog(&db).await;
    let session = Session::open(db.clone()).await.expect("open session");
    let (rule_id, _) = empty_rule(&session, &catalog).await;

    let conn = db.connection().await.expect("connection");
    conn.execute(
        "INSERT INTO rule_actions (rule_id, action_id) VALUES (?1, ?2)",
        params![rule_id, 999_i64],
    )
    .await
    .expect("insert rule action");

    let err = session.load_rule(rule_id).await.expect_err("unknown action");
    assert!(matches!(
        err,
        SessionError::DataIntegrity(IntegrityError::MissingDescriptor {
            kind: "action",
            id: 999
        })
    ));
}

#[tokio::test]
async fn stored_parameter_of_another_action_is_rejected() {
    let (db, _dir) = setup_db().await;
    let catalog = seed_catalog(&db).await;
    let session = Session::open(db.clone()).await.expect("open session");
    let (rule_id, _) = empty_rule(&session, &catalog).await;

    let conn = db.connection().await.expect("connection");
    // The RETURNING cursor holds the write open until dropped; release it
    // before the session reads through its own connection.
    let rule_action_id: i64 = {
        let mut rows = conn
            .query(
                "INSERT INTO rule_actions (rule_id, action_id) VALUES (?1, ?2) RETURNING id",
                params![rule_id, catalog.send_sms],
            )
            .await
            .expect("insert rule action");
        rows.next()
            .await
            .expect("row result")
            .expect("row")
            .get(0)
            .expect("id")
    };
    for (parameter_id, data) in [(catalog.send_sms_number, "+15550100"), (777_i64, "stray")] {
        conn.execute(
            "INSERT INTO rule_action_parameters (rule_action_id, action_parameter_id, data) VALUES (?1, ?2, ?3)",
            params![rule_action_id, parameter_id, data],
        )
        .await
        .expect("insert parameter row");
    }

    let err = session.load_rule(rule_id).await.expect_err("stray parameter");
    assert_eq!(
        match err {
            SessionError::DataIntegrity(inner) => inner,
            other => panic!("unexpected error: {other:?}"),
        },
        IntegrityError::UnknownParameter {
            rule_action_id,
            action_id: catalog.send_sms,
            parameter_id: 777,
        }
    );
}

#[tokio::test]
async fn rule_without_filters_or_actions_round_trips() {
    let (db, _dir) = setup_db().await;
    let catalog = seed_catalog(&db).await;
    let session = Session::open(db).await.expect("open session");
    let (rule_id, _) = empty_rule(&session, &catalog).await;

    let rule = session.load_rule(rule_id).await.expect("load");
    assert!(rule.filters.is_empty());
    assert!(rule.actions.is_empty());
    session.delete_rule(rule_id).await.expect("delete");
    assert!(session.list_rules().await.expect("list").is_empty());
}
