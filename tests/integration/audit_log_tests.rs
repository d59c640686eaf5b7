//! Audit log query tests
//!
//! Filters arrive as raw query strings and must be normalized before any
//! lookup happens. Rejections come back as one 400 naming every bad field.

use raktar::{
    config::AuditConfig,
    models::{AuditLogEntry, Rang},
};

use crate::common::{test_config, TestApp, UserFactory};

/// Insert an entry with a chosen timestamp, bypassing the handlers
async fn insert_entry(
    app: &TestApp,
    muvelet: &str,
    target_user_id: Option<i64>,
    product_id: Option<i64>,
    admin: bool,
    created_at: &str,
) {
    sqlx::query(
        "INSERT INTO audit_logs (user_id, target_user_id, product_id, muvelet, admin, created_at) VALUES (NULL, ?, ?, ?, ?, ?)",
    )
    .bind(target_user_id)
    .bind(product_id)
    .bind(muvelet)
    .bind(admin)
    .bind(created_at)
    .execute(&app.state.db)
    .await
    .expect("Failed to insert audit entry");
}

async fn logs(app: &TestApp, query: &str) -> Vec<AuditLogEntry> {
    let response = app.get(&format!("/api/v1/logs{}", query)).await;
    response.assert_ok();
    response.json()
}

#[tokio::test]
async fn test_empty_log() {
    let app = TestApp::new().await;
    assert!(logs(&app, "").await.is_empty());
}

#[tokio::test]
async fn test_mutations_are_logged() {
    let app = TestApp::new().await;
    let admin = UserFactory::admin().insert(&app.state.db).await;

    let response = app
        .post_json_as(
            admin.id,
            "/api/v1/products",
            serde_json::json!({ "nev": "Fogó", "cikkszam": "FOG-1", "mennyiseg": 4, "ar": 990 }),
        )
        .await;
    response.assert_created();
    let product: serde_json::Value = response.json();
    let product_id = product["id"].as_i64().unwrap();

    app.post_json(
        &format!("/api/v1/products/{}/stock", product_id),
        serde_json::json!({ "valtozas": -1 }),
    )
    .await
    .assert_ok();

    let entries = logs(&app, "").await;
    assert_eq!(entries.len(), 2);

    // Newest first
    assert_eq!(entries[0].muvelet, "ADJUST_STOCK");
    assert_eq!(entries[0].user_id, None);
    assert!(!entries[0].admin);
    assert_eq!(entries[0].details.as_ref().unwrap()["valtozas"], -1);

    assert_eq!(entries[1].muvelet, "CREATE_PRODUCT");
    assert_eq!(entries[1].user_id, Some(admin.id));
    assert_eq!(entries[1].product_id, Some(product_id));
    assert!(entries[1].admin);
}

#[tokio::test]
async fn test_ban_is_logged_separately() {
    let app = TestApp::new().await;
    let user = UserFactory::new().insert(&app.state.db).await;

    app.put_json(
        &format!("/api/v1/users/{}", user.id),
        serde_json::json!({ "isBanned": true }),
    )
    .await
    .assert_ok();

    let entries = logs(&app, &format!("?targetUserId={}", user.id)).await;
    let names: Vec<&str> = entries.iter().map(|e| e.muvelet.as_str()).collect();
    assert_eq!(names, vec!["BAN_USER", "UPDATE_USER"]);

    let bans = logs(&app, "?muvelet=BAN_USER").await;
    assert_eq!(bans.len(), 1);
    assert_eq!(bans[0].target_user_id, Some(user.id));
}

#[tokio::test]
async fn test_admin_flag_follows_target_user() {
    let app = TestApp::new().await;
    let admin = UserFactory::new()
        .rang(Rang::Admin)
        .insert(&app.state.db)
        .await;
    let user = UserFactory::new().insert(&app.state.db).await;

    for id in [admin.id, user.id] {
        app.delete(&format!("/api/v1/users/{}", id))
            .await
            .assert_no_content();
    }

    let admin_entries = logs(&app, "?admin=true").await;
    assert_eq!(admin_entries.len(), 1);
    assert_eq!(admin_entries[0].target_user_id, Some(admin.id));

    let other_entries = logs(&app, "?admin=false").await;
    assert_eq!(other_entries.len(), 1);
    assert_eq!(other_entries[0].target_user_id, Some(user.id));
}

#[tokio::test]
async fn test_combined_filter() {
    let app = TestApp::new().await;
    insert_entry(&app, "DELETE_PRODUCT", Some(7), Some(3), true, "2024-05-01T10:00:00.000000Z").await;
    insert_entry(&app, "DELETE_PRODUCT", Some(7), Some(4), false, "2024-05-01T11:00:00.000000Z").await;
    insert_entry(&app, "UPDATE_USER", Some(7), None, true, "2024-05-01T12:00:00.000000Z").await;
    insert_entry(&app, "DELETE_PRODUCT", Some(8), Some(3), true, "2024-05-01T13:00:00.000000Z").await;

    // Empty productId means "no constraint"
    let entries = logs(
        &app,
        "?targetUserId=7&muvelet=DELETE_PRODUCT&productId=&admin=true",
    )
    .await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].product_id, Some(3));
    assert_eq!(entries[0].target_user_id, Some(7));
}

#[tokio::test]
async fn test_lenient_admin_value_is_ignored() {
    let app = TestApp::new().await;
    insert_entry(&app, "CREATE_USER", None, None, true, "2024-05-01T10:00:00.000000Z").await;
    insert_entry(&app, "CREATE_USER", None, None, false, "2024-05-01T11:00:00.000000Z").await;

    assert_eq!(logs(&app, "?admin=maybe").await.len(), 2);
    assert_eq!(logs(&app, "?admin=").await.len(), 2);
}

#[tokio::test]
async fn test_time_window() {
    let app = TestApp::new().await;
    insert_entry(&app, "ADJUST_STOCK", None, Some(1), false, "2024-04-30T23:59:59.999999Z").await;
    insert_entry(&app, "ADJUST_STOCK", None, Some(2), false, "2024-05-01T00:00:00.000000Z").await;
    insert_entry(&app, "ADJUST_STOCK", None, Some(3), false, "2024-05-02T23:59:59.999999Z").await;
    insert_entry(&app, "ADJUST_STOCK", None, Some(4), false, "2024-05-03T00:00:00.000000Z").await;

    // Date-only bounds cover whole days on both ends
    let entries = logs(&app, "?startDate=2024-05-01&endDate=2024-05-02").await;
    let ids: Vec<i64> = entries.iter().filter_map(|e| e.product_id).collect();
    assert_eq!(ids, vec![3, 2]);

    // Datetime end is inclusive
    let entries = logs(&app, "?endDate=2024-05-01T00:00:00Z").await;
    let ids: Vec<i64> = entries.iter().filter_map(|e| e.product_id).collect();
    assert_eq!(ids, vec![2, 1]);

    let entries = logs(&app, "?startDate=2024-05-02T12:00:00Z").await;
    let ids: Vec<i64> = entries.iter().filter_map(|e| e.product_id).collect();
    assert_eq!(ids, vec![4, 3]);
}

#[tokio::test]
async fn test_window_ending_on_last_representable_day() {
    let app = TestApp::new().await;
    insert_entry(&app, "ADJUST_STOCK", None, Some(1), false, "2024-05-05T08:00:00.000000Z").await;

    assert_eq!(logs(&app, "?endDate=9999-12-31").await.len(), 1);
    assert_eq!(
        logs(&app, "?startDate=2024-05-05&endDate=9999-12-31T23:59:59.9999999Z")
            .await
            .len(),
        1
    );
    assert!(logs(&app, "?startDate=9999-12-31T23:59:59.9999995Z")
        .await
        .is_empty());
}

#[tokio::test]
async fn test_sub_microsecond_start_excludes_earlier_entries() {
    let app = TestApp::new().await;
    insert_entry(&app, "ADJUST_STOCK", None, Some(1), false, "2024-05-01T10:00:00.000000Z").await;
    insert_entry(&app, "ADJUST_STOCK", None, Some(2), false, "2024-05-01T10:00:00.000001Z").await;

    let entries = logs(&app, "?startDate=2024-05-01T10:00:00.0000005Z").await;
    let ids: Vec<i64> = entries.iter().filter_map(|e| e.product_id).collect();
    assert_eq!(ids, vec![2]);
}

#[tokio::test]
async fn test_inverted_window_is_empty_not_an_error() {
    let app = TestApp::new().await;
    insert_entry(&app, "ADJUST_STOCK", None, None, false, "2024-05-01T12:00:00.000000Z").await;

    assert!(logs(&app, "?startDate=2024-05-02&endDate=2024-04-30")
        .await
        .is_empty());
}

#[tokio::test]
async fn test_results_are_capped() {
    let mut config = test_config();
    config.audit = AuditConfig { max_results: 2 };
    let app = TestApp::with_config(config).await;

    for i in 0..5 {
        insert_entry(
            &app,
            "CREATE_PRODUCT",
            None,
            Some(i),
            false,
            &format!("2024-05-01T10:00:0{}.000000Z", i),
        )
        .await;
    }

    let entries = logs(&app, "").await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].product_id, Some(4));
}

#[tokio::test]
async fn test_unknown_parameter_is_rejected() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/logs?userName=kovacs").await;

    response.assert_bad_request();
    let json: serde_json::Value = response.json();
    assert_eq!(json["error"], "validation_error");
    assert_eq!(json["code"], "invalid_filter");
    assert_eq!(json["details"][0]["field"], "userName");
    assert_eq!(json["details"][0]["kind"], "unrecognized");
    assert_eq!(
        json["details"][0]["message"],
        "userName is not an allowed filter property"
    );
}

#[tokio::test]
async fn test_every_bad_field_is_reported() {
    let app = TestApp::new().await;
    let response = app
        .get("/api/v1/logs?productId=abc&startDate=not-a-date&targetUserId=7")
        .await;

    response.assert_bad_request();
    let json: serde_json::Value = response.json();
    let details = json["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);

    let kinds: Vec<(&str, &str)> = details
        .iter()
        .map(|d| (d["field"].as_str().unwrap(), d["kind"].as_str().unwrap()))
        .collect();
    assert!(kinds.contains(&("productId", "not_an_integer")));
    assert!(kinds.contains(&("startDate", "not_a_date")));
}

#[tokio::test]
async fn test_repeated_parameter_is_rejected() {
    let app = TestApp::new().await;
    let response = app.get("/api/v1/logs?productId=1&productId=2").await;

    response.assert_bad_request();
    let json: serde_json::Value = response.json();
    assert_eq!(json["details"][0]["field"], "productId");
    assert_eq!(json["details"][0]["kind"], "repeated");
}
