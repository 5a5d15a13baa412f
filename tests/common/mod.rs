//! Shared harness for the HTTP integration tests: a file-backed SQLite
//! database with migrations applied, a handful of seed helpers, and a
//! `oneshot`-based request wrapper that parses JSON bodies.

// Each test binary uses a different slice of the harness.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use pharmahub_api::auth::{AuthService, TokenKind};
use pharmahub_api::config::AppConfig;
use pharmahub_api::entities::{admin_user, customer, product, CustomerStatus, ProductSection};
use pharmahub_api::events::{create_event_channel, Event};
use pharmahub_api::handlers::AppServices;
use pharmahub_api::storage::LocalStorage;
use pharmahub_api::{build_router, AppState};

pub const TEST_PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub router: Router,
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub auth: AuthService,
    // Keeps the channel open so event sends never report a closed receiver
    _event_rx: mpsc::Receiver<Event>,
    // Owns the SQLite file and the upload root for the test's lifetime
    _tmp: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let db_path = tmp.path().join("test.db");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

        // SQLite tolerates exactly one writer; a single connection keeps
        // the suite deterministic.
        let mut opt = ConnectOptions::new(db_url.clone());
        opt.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.expect("connect sqlite");
        migrations::Migrator::up(&db, None)
            .await
            .expect("run migrations");
        let db = Arc::new(db);

        let mut config = AppConfig::new(
            db_url,
            "integration-test-secret-0123456789abcdef".into(),
            3600,
            "127.0.0.1".into(),
            0,
            "development".into(),
        );
        config.storage.local_root = tmp
            .path()
            .join("uploads")
            .to_string_lossy()
            .into_owned();

        let auth = AuthService::from_app_config(&config);
        let (event_tx, event_rx) = create_event_channel(config.event_channel_capacity);
        let storage = Arc::new(LocalStorage::new(&config.storage.local_root));
        let services = AppServices::build(
            db.clone(),
            &config,
            auth.clone(),
            Arc::new(event_tx),
            storage,
        )
        .expect("wire services");

        let state = Arc::new(AppState {
            db: db.clone(),
            config,
            auth: auth.clone(),
            services,
        });

        Self {
            router: build_router(state),
            db,
            auth,
            _event_rx: event_rx,
            _tmp: tmp,
        }
    }

    /// Sends a request and returns the status plus the parsed JSON body
    /// (`Value::Null` when the body is empty).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("route request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, path, token, None).await
    }

    /// GET returning headers and raw bytes, for attachment endpoints.
    pub async fn get_raw(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty()).expect("build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("route request");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes()
            .to_vec();
        (status, headers, bytes)
    }

    pub async fn post(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn patch(
        &self,
        path: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.request(Method::PATCH, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, path, token, None).await
    }

    /// Sends a single-field multipart upload and returns the raw response.
    pub async fn multipart_post(
        &self,
        path: &str,
        token: Option<&str>,
        field: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> (StatusCode, Value) {
        let boundary = "test-boundary-7MA4YWxkTrZu0gW";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(&bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body)).expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("route request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Inserts an admin user and returns its id plus a bearer token.
    pub async fn seed_admin(&self) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let email = format!("admin-{id}@pharmahub.test");
        let now = Utc::now();
        admin_user::ActiveModel {
            id: Set(id),
            email: Set(email.clone()),
            password_hash: Set(self.auth.hash_password(TEST_PASSWORD).unwrap()),
            name: Set("Test Admin".into()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("insert admin");
        let token = self
            .auth
            .issue_token(TokenKind::Admin, id, &email)
            .unwrap()
            .token;
        (id, token)
    }

    /// Inserts a customer in the given status and returns its id plus a
    /// bearer token.
    pub async fn seed_customer(&self, status: CustomerStatus) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let email = format!("pharmacy-{id}@pharmahub.test");
        let now = Utc::now();
        customer::ActiveModel {
            id: Set(id),
            email: Set(email.clone()),
            password_hash: Set(self.auth.hash_password(TEST_PASSWORD).unwrap()),
            pharmacy_name: Set("Test Pharmacy".into()),
            contact_name: Set("Test Contact".into()),
            phone: Set("555-0100".into()),
            license_number: Set(None),
            status: Set(status),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("insert customer");
        let token = self
            .auth
            .issue_token(TokenKind::Customer, id, &email)
            .unwrap()
            .token;
        (id, token)
    }

    /// Inserts a visible, active product. Price is given in cents.
    pub async fn seed_product(
        &self,
        sku: &str,
        name: &str,
        section: ProductSection,
        price_cents: i64,
        stock: i32,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        product::ActiveModel {
            id: Set(id),
            sku: Set(sku.into()),
            name: Set(name.into()),
            generic_name: Set(None),
            description: Set(None),
            section: Set(section),
            category_id: Set(None),
            manufacturer_id: Set(None),
            wholesale_price: Set(Decimal::new(price_cents, 2)),
            stock_quantity: Set(stock),
            total_sold: Set(0),
            is_active: Set(true),
            is_visible: Set(true),
            image_key: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("insert product");
        id
    }
}
