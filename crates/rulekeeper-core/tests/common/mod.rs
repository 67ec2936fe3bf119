#![allow(dead_code)]

use std::sync::Arc;

use libsql::{Connection, params};
use rulekeeper_core::migrations::run_migrations;
use rulekeeper_core::{
    Database, EventAttribute, Filter, FilterNode, Registry, Rule, RuleAction, Session, TypedValue,
};
use tempfile::TempDir;

pub struct Catalog {
    pub messaging: i64,
    pub phone: i64,
    pub sms_received: i64,
    pub phone_ringing: i64,
    pub battery_low: i64,
    pub sender: i64,
    pub body: i64,
    pub received_at: i64,
    pub caller: i64,
    pub ring_count: i64,
    pub send_sms: i64,
    pub send_sms_number: i64,
    pub send_sms_message: i64,
}

pub async fn setup_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let db_path = dir.path().join(format!("db_{}.sqlite", uuid::Uuid::new_v4()));
    let db = Database::open(&db_path).await.expect("open db");
    run_migrations(&db).await.expect("migrations");
    (db, dir)
}

pub async fn type_id(conn: &Connection, kind: &str) -> i64 {
    let mut rows = conn
        .query("SELECT id FROM data_types WHERE kind = ?1", params![kind])
        .await
        .expect("query data type");
    rows.next()
        .await
        .expect("row result")
        .expect("data type seeded")
        .get(0)
        .expect("id")
}

/// Two applications, three events, five attributes and one two-parameter action.
pub async fn seed_catalog(db: &Database) -> Catalog {
    let conn = db.connection().await.expect("connection");
    let text = type_id(&conn, "text").await;
    let integer = type_id(&conn, "integer").await;
    let datetime = type_id(&conn, "datetime").await;
    let phone_number = type_id(&conn, "phone_number").await;
    let registry = Registry::new(&conn);

    let messaging = registry
        .register_application("Messaging", "Text messages", Some("sms.png"))
        .await
        .expect("app");
    let phone = registry
        .register_application("Phone", "Calls", None)
        .await
        .expect("app");

    let sms_received = registry
        .register_event("SMS Received", "", None)
        .await
        .expect("event");
    let phone_ringing = registry
        .register_event("Phone Ringing", "", None)
        .await
        .expect("event");
    let battery_low = registry
        .register_event("Battery Low", "", None)
        .await
        .expect("event");

    let sender = registry
        .register_attribute(sms_received, phone_number, "Sender")
        .await
        .expect("attr");
    let body = registry
        .register_attribute(sms_received, text, "Body")
        .await
        .expect("attr");
    let received_at = registry
        .register_attribute(sms_received, datetime, "Received At")
        .await
        .expect("attr");
    let caller = registry
        .register_attribute(phone_ringing, phone_number, "Caller")
        .await
        .expect("attr");
    let ring_count = registry
        .register_attribute(phone_ringing, integer, "Ring Count")
        .await
        .expect("attr");

    let send_sms = registry
        .register_action(messaging, "Send SMS")
        .await
        .expect("action");
    let send_sms_number = registry
        .register_action_parameter(send_sms, phone_number, "Number")
        .await
        .expect("param");
    let send_sms_message = registry
        .register_action_parameter(send_sms, text, "Message")
        .await
        .expect("param");

    Catalog {
        messaging,
        phone,
        sms_received,
        phone_ringing,
        battery_low,
        sender,
        body,
        received_at,
        caller,
        ring_count,
        send_sms,
        send_sms_number,
        send_sms_message,
    }
}

pub async fn filter_named(session: &Session, attribute: &Arc<EventAttribute>, name: &str) -> Filter {
    session
        .filters_for_attribute(attribute)
        .await
        .expect("filters")
        .into_iter()
        .find(|filter| filter.name == name)
        .unwrap_or_else(|| panic!("no {name} filter for {}", attribute.name))
}

fn datetime(text: &str) -> TypedValue {
    TypedValue::Datetime(
        chrono::NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").expect("datetime"),
    )
}

/// Rule on "SMS Received" with two root branches, each with one child, and
/// one "Send SMS" action.
pub async fn sample_rule(session: &Session, catalog: &Catalog) -> Rule {
    let sender = session.attribute(catalog.sender).expect("sender");
    let body = session.attribute(catalog.body).expect("body");
    let received_at = session.attribute(catalog.received_at).expect("received at");

    let sender_equals = filter_named(session, &sender, "equals").await;
    let body_contains = filter_named(session, &body, "contains").await;
    let received_after = filter_named(session, &received_at, "after").await;

    let mut rule = Rule::new(
        "Reply to the boss",
        session.event(catalog.sms_received).expect("event"),
    );
    rule.description = "Auto reply while driving".into();
    rule.filters = vec![
        FilterNode::new(
            sender_equals,
            TypedValue::PhoneNumber("+15550100".into()),
        )
        .with_child(FilterNode::new(
            body_contains.clone(),
            TypedValue::Text("urgent".into()),
        )),
        FilterNode::new(body_contains, TypedValue::Text("meeting".into())).with_child(
            FilterNode::new(received_after, datetime("2024-01-01 09:00:00")),
        ),
    ];
    rule.actions = vec![RuleAction::new(
        session.action(catalog.send_sms).expect("action"),
        vec![
            TypedValue::PhoneNumber("+15550199".into()),
            TypedValue::Text("Driving, call you later".into()),
        ],
    )];
    rule
}

/// Copy of a rule with every generated id cleared, for shape comparisons.
pub fn without_ids(rule: &Rule) -> Rule {
    let mut copy = rule.clone();
    copy.id = None;
    for action in &mut copy.actions {
        action.id = None;
    }
    let mut stack: Vec<&mut FilterNode> = copy.filters.iter_mut().collect();
    while let Some(node) = stack.pop() {
        node.id = None;
        stack.extend(node.children.iter_mut());
    }
    copy
}

pub async fn count(db: &Database, sql: &str, id: i64) -> i64 {
    let conn = db.connection().await.expect("connection");
    let mut rows = conn.query(sql, params![id]).await.expect("count query");
    rows.next()
        .await
        .expect("row result")
        .expect("row")
        .get(0)
        .expect("count")
}

pub async fn table_rows(db: &Database, table: &str) -> i64 {
    let conn = db.connection().await.expect("connection");
    let mut rows = conn
        .query(&format!("SELECT COUNT(*) FROM {table}"), ())
        .await
        .expect("count query");
    rows.next()
        .await
        .expect("row result")
        .expect("row")
        .get(0)
        .expect("count")
}

/// Makes every insert into `table` fail, to exercise rollback part way through a write.
pub async fn fail_inserts_into(db: &Database, table: &str) {
    let conn = db.connection().await.expect("connection");
    conn.execute(
        &format!(
            "CREATE TRIGGER fail_{table}_insert BEFORE INSERT ON {table} \
             BEGIN SELECT RAISE(ABORT, 'insert refused'); END"
        ),
        (),
    )
    .await
    .expect("create trigger");
}
