//! Repository and startup tests against a real database

use raktar::{
    config::BootstrapAdminConfig,
    db::{self, ProductRepository, StockAdjustment, UserRepository},
    models::{CreateProductRequest, Muvelet, NewAuditEntry, Rang, MAX_STOCK},
};

use crate::common::{ProductFactory, TestApp, UserFactory};

fn bootstrap_admin() -> BootstrapAdminConfig {
    BootstrapAdminConfig {
        felhasznalonev: "admin".to_string(),
        nev: "Administrator".to_string(),
        jelszo: "kezdo-jelszo-1".to_string(),
    }
}

#[tokio::test]
async fn test_bootstrap_admin_created_once() {
    let app = TestApp::new().await;

    assert!(db::seed_bootstrap_admin(&app.state.db, &bootstrap_admin())
        .await
        .unwrap());
    assert!(!db::seed_bootstrap_admin(&app.state.db, &bootstrap_admin())
        .await
        .unwrap());

    let repo = UserRepository::new(&app.state.db);
    assert_eq!(repo.count().await.unwrap(), 1);

    let admin = repo.get_by_username("admin").await.unwrap().unwrap();
    assert_eq!(admin.rang, Rang::Admin);
    assert!(admin.must_change_password);
    assert!(raktar::services::password::verify_password("kezdo-jelszo-1", &admin.jelszo).unwrap());
}

#[tokio::test]
async fn test_bootstrap_admin_skipped_when_users_exist() {
    let app = TestApp::new().await;
    UserFactory::new().insert(&app.state.db).await;

    assert!(!db::seed_bootstrap_admin(&app.state.db, &bootstrap_admin())
        .await
        .unwrap());
    assert!(UserRepository::new(&app.state.db)
        .get_by_username("admin")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_corrupt_rang_is_an_internal_error() {
    let app = TestApp::new().await;
    let user = UserFactory::new().insert(&app.state.db).await;

    // The CHECK constraint guards the column, so drop to a raw write that bypasses it
    sqlx::query("PRAGMA ignore_check_constraints = ON")
        .execute(&app.state.db)
        .await
        .unwrap();
    sqlx::query("UPDATE users SET rang = 'ROOT' WHERE id = ?")
        .bind(user.id)
        .execute(&app.state.db)
        .await
        .unwrap();

    let err = UserRepository::new(&app.state.db)
        .get_by_id(user.id)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Corrupt user row"));

    let response = app.get(&format!("/api/v1/users/{}", user.id)).await;
    response.assert_status(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.text().contains("$argon2id$"));
}

#[tokio::test]
async fn test_stock_adjustment_outcomes() {
    let app = TestApp::new().await;
    let repo = ProductRepository::new(&app.state.db);
    let product = ProductFactory::new().mennyiseg(2).insert(&app.state.db).await;

    match repo.adjust_stock(product.id, -2).await.unwrap() {
        StockAdjustment::Applied(p) => assert_eq!(p.mennyiseg, 0),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(
        repo.adjust_stock(product.id, -1).await.unwrap(),
        StockAdjustment::Insufficient { available: 0 }
    );
    assert_eq!(
        repo.adjust_stock(product.id + 100, 1).await.unwrap(),
        StockAdjustment::NotFound
    );
}

#[tokio::test]
async fn test_stock_adjustment_refuses_overflow() {
    let app = TestApp::new().await;
    let repo = ProductRepository::new(&app.state.db);
    let full = ProductFactory::new().mennyiseg(MAX_STOCK).insert(&app.state.db).await;

    assert_eq!(
        repo.adjust_stock(full.id, 1).await.unwrap(),
        StockAdjustment::OverCapacity { available: MAX_STOCK }
    );

    // Rows written without validation must not be pushed past i64 either
    let huge = repo
        .create(&CreateProductRequest {
            nev: "Tulcsordulo".to_string(),
            cikkszam: "OVF-1".to_string(),
            leiras: None,
            mennyiseg: i64::MAX,
            ar: 1,
        })
        .await
        .unwrap();
    assert_eq!(
        repo.adjust_stock(huge.id, 1).await.unwrap(),
        StockAdjustment::OverCapacity { available: i64::MAX }
    );
    assert_eq!(
        repo.adjust_stock(full.id, i64::MIN).await.unwrap(),
        StockAdjustment::Insufficient { available: MAX_STOCK }
    );

    // Every row still decodes as an integer
    let products = repo.list().await.unwrap();
    assert_eq!(products.len(), 2);
    assert!(products.iter().any(|p| p.mennyiseg == i64::MAX));
    assert!(products.iter().any(|p| p.mennyiseg == MAX_STOCK));
}

#[tokio::test]
async fn test_concurrent_withdrawals_never_go_negative() {
    let app = TestApp::new().await;
    let product = ProductFactory::new().mennyiseg(5).insert(&app.state.db).await;

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let pool = app.state.db.clone();
            let id = product.id;
            tokio::spawn(async move { ProductRepository::new(&pool).adjust_stock(id, -1).await })
        })
        .collect();

    let mut applied = 0;
    for task in tasks {
        if let StockAdjustment::Applied(_) = task.await.unwrap().unwrap() {
            applied += 1;
        }
    }
    assert_eq!(applied, 5);

    let stored = ProductRepository::new(&app.state.db)
        .get_by_id(product.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.mennyiseg, 0);
}

#[tokio::test]
async fn test_audit_insert_round_trip() {
    let app = TestApp::new().await;
    let repo = db::AuditRepository::new(&app.state.db);

    let written = repo
        .insert(
            &NewAuditEntry::new(Muvelet::CreateUser)
                .actor(Some(1))
                .target_user(2)
                .admin(true)
                .details(serde_json::json!({ "felhasznalonev": "uj" })),
        )
        .await
        .unwrap();

    let listed = repo
        .list(&Default::default(), 10)
        .await
        .unwrap();
    assert_eq!(listed, vec![written]);
}
