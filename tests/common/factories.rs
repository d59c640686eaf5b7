//! Test factories for generating test data
//!
//! Factories create randomized but valid data, so tests never collide on the
//! unique username and article number columns.

use fake::{
    faker::{lorem::en::Sentence, name::en::Name},
    Fake,
};
use uuid::Uuid;

use raktar::{
    db::{NewUser, ProductRepository, UserRepository},
    models::{CreateProductRequest, Product, Rang, User},
    DbPool,
};

/// A syntactically valid Argon2id hash; factories skip the real hashing cost
pub const PLACEHOLDER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$0o3/7pYVfRr3bBdbSMOfQpIsbb0Cn0TaRTCBxMeaXXs";

fn suffix() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Builder for users inserted straight into storage
pub struct UserFactory {
    user: NewUser,
}

impl UserFactory {
    pub fn new() -> Self {
        Self {
            user: NewUser {
                nev: Name().fake(),
                felhasznalonev: format!("user_{}", suffix()),
                email: None,
                telefonszam: None,
                rang: Rang::User,
                must_change_password: false,
                jelszo: PLACEHOLDER_HASH.to_string(),
            },
        }
    }

    pub fn admin() -> Self {
        Self::new().rang(Rang::Admin)
    }

    pub fn rang(mut self, rang: Rang) -> Self {
        self.user.rang = rang;
        self
    }

    pub fn felhasznalonev(mut self, felhasznalonev: &str) -> Self {
        self.user.felhasznalonev = felhasznalonev.to_string();
        self
    }

    pub fn email(mut self, email: &str) -> Self {
        self.user.email = Some(email.to_string());
        self
    }

    pub async fn insert(self, db: &DbPool) -> User {
        UserRepository::new(db)
            .create(&self.user)
            .await
            .expect("Failed to insert test user")
    }
}

/// JSON body for `POST /users`
pub fn create_user_body(rang: &str) -> serde_json::Value {
    serde_json::json!({
        "nev": Name().fake::<String>(),
        "felhasznalonev": format!("user_{}", suffix()),
        "email": format!("{}@example.com", suffix()),
        "jelszo": "jelszo-12345",
        "rang": rang,
    })
}

/// Builder for products inserted straight into storage
pub struct ProductFactory {
    product: CreateProductRequest,
}

impl ProductFactory {
    pub fn new() -> Self {
        Self {
            product: CreateProductRequest {
                nev: Sentence(1..3).fake(),
                cikkszam: format!("SKU-{}", suffix()),
                leiras: Some(Sentence(3..8).fake()),
                mennyiseg: 10,
                ar: 1990,
            },
        }
    }

    pub fn mennyiseg(mut self, mennyiseg: i64) -> Self {
        self.product.mennyiseg = mennyiseg;
        self
    }

    pub fn cikkszam(mut self, cikkszam: &str) -> Self {
        self.product.cikkszam = cikkszam.to_string();
        self
    }

    pub async fn insert(self, db: &DbPool) -> Product {
        ProductRepository::new(db)
            .create(&self.product)
            .await
            .expect("Failed to insert test product")
    }
}

/// JSON body for `POST /products`
pub fn create_product_body() -> serde_json::Value {
    serde_json::json!({
        "nev": "Csavarhúzó",
        "cikkszam": format!("SKU-{}", suffix()),
        "leiras": Sentence(3..8).fake::<String>(),
        "mennyiseg": 25,
        "ar": 2490,
    })
}
