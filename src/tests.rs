//! Integration tests for the ReadCycle backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::hash_password;
use crate::config::Config;
use crate::db::{init_database, Repository, ADMIN_EMAIL};
use crate::{create_router, AppState};

const ADMIN_PASSWORD: &str = "admin-secret";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_verify_ttl(300).await
    }

    async fn with_verify_ttl(verify_token_ttl_secs: i64) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database and seed the admin with a known password
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));
        let admin_hash = hash_password(ADMIN_PASSWORD).expect("Failed to hash");
        repo.ensure_admin_account(&admin_hash)
            .await
            .expect("Failed to seed admin");

        // Create config
        let config = Config {
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            jwt_secret: "test-jwt-secret".to_string(),
            jwt_secret_generated: false,
            access_token_ttl_secs: 3600,
            refresh_token_ttl_secs: 86_400,
            verify_token_ttl_secs,
        };

        let state = AppState {
            repo: repo.clone(),
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::builder().cookie_store(true).build().unwrap(),
            base_url,
            repo,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/login"))
            .json(&json!({ "username": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "login failed for {}", email);
        let body: Value = resp.json().await.unwrap();
        body["data"]["accessToken"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Register a member and complete verification via the stored token.
    async fn register_verified(&self, name: &str, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/v1/auth/register"))
            .json(&json!({ "name": name, "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);

        let user = self
            .repo
            .find_user_by_email(email)
            .await
            .unwrap()
            .expect("member should exist");
        let token = user.verification_token.expect("verification token stored");

        let verify_resp = self
            .client
            .get(self.url(&format!("/api/v1/auth/verify-email?token={}", token)))
            .send()
            .await
            .unwrap();
        assert_eq!(verify_resp.status(), 200);

        self.login(email, password).await
    }

    async fn create_book(&self, admin_token: &str, title: &str, category: &str, qty: i64) -> i64 {
        let resp = self
            .client
            .post(self.url("/api/v1/admin/books"))
            .bearer_auth(admin_token)
            .json(&json!({
                "category": category,
                "title": title,
                "author": "Test Author",
                "publisher": "Test Press",
                "quantity": qty
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_register_verify_login_flow() {
    let fixture = TestFixture::new().await;

    // Register
    let resp = fixture
        .client
        .post(fixture.url("/api/v1/auth/register"))
        .json(&json!({
            "name": "Alice",
            "email": "alice@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["statusCode"], 201);
    assert_eq!(body["data"]["email"], "alice@example.com");
    // Credentials never leave the server
    assert!(body["data"].get("passwordHash").is_none());

    // Login before verification is rejected
    let early = fixture
        .client
        .post(fixture.url("/api/v1/auth/login"))
        .json(&json!({ "username": "alice@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(early.status(), 401);
    let early_body: Value = early.json().await.unwrap();
    assert_eq!(early_body["message"], "Your account has not been verified");

    // Verify via the stored token, then login
    let user = fixture
        .repo
        .find_user_by_email("alice@example.com")
        .await
        .unwrap()
        .unwrap();
    let token = user.verification_token.unwrap();
    let verify_resp = fixture
        .client
        .get(fixture.url(&format!("/api/v1/auth/verify-email?token={}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(verify_resp.status(), 200);

    let access = fixture.login("alice@example.com", "password123").await;

    // Account endpoint reflects the caller
    let account = fixture
        .client
        .get(fixture.url("/api/v1/auth/account"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(account.status(), 200);
    let account_body: Value = account.json().await.unwrap();
    assert_eq!(account_body["data"]["user"]["name"], "Alice");
    assert_eq!(account_body["data"]["user"]["role"]["name"], "user");
}

#[tokio::test]
async fn test_expired_verification_deletes_pending_user() {
    // Negative TTL so verification links are already expired when issued
    let fixture = TestFixture::with_verify_ttl(-120).await;

    let resp = fixture
        .client
        .post(fixture.url("/api/v1/auth/register"))
        .json(&json!({
            "name": "Ivan",
            "email": "ivan@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let user = fixture
        .repo
        .find_user_by_email("ivan@example.com")
        .await
        .unwrap()
        .unwrap();
    let token = user.verification_token.unwrap();

    let verify_resp = fixture
        .client
        .get(fixture.url(&format!("/api/v1/auth/verify-email?token={}", token)))
        .send()
        .await
        .unwrap();
    assert_eq!(verify_resp.status(), 401);
    let body: Value = verify_resp.json().await.unwrap();
    assert_eq!(body["error"], "UNAUTHORIZED");

    // The pending registration was removed, so the email can be used again
    let gone = fixture
        .repo
        .find_user_by_email("ivan@example.com")
        .await
        .unwrap();
    assert!(gone.is_none());

    let retry = fixture
        .client
        .post(fixture.url("/api/v1/auth/register"))
        .json(&json!({
            "name": "Ivan",
            "email": "ivan@example.com",
            "password": "password123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(retry.status(), 201);
}

#[tokio::test]
async fn test_return_book_uses_put() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    fixture
        .register_verified("Judy", "judy@example.com", "password123")
        .await;

    let book_id = fixture.create_book(&admin, "Emma", "Classic", 1).await;
    let borrow_resp = fixture
        .client
        .post(fixture.url("/api/v1/borrow"))
        .bearer_auth(&admin)
        .json(&json!({
            "username": "judy@example.com",
            "details": [{ "bookId": book_id }]
        }))
        .send()
        .await
        .unwrap();
    let borrow_body: Value = borrow_resp.json().await.unwrap();
    let borrow_id = borrow_body["data"][0]["id"].as_i64().unwrap();

    // POST is not registered for this route
    let wrong_method = fixture
        .client
        .post(fixture.url("/api/v1/return-book"))
        .bearer_auth(&admin)
        .json(&json!({ "borrowId": borrow_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_method.status(), 405);

    let resp = fixture
        .client
        .put(fixture.url("/api/v1/return-book"))
        .bearer_auth(&admin)
        .json(&json!({ "borrowId": borrow_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["status"], "RETURNED");
}

#[tokio::test]
async fn test_login_bad_credentials() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/v1/auth/login"))
        .json(&json!({ "username": ADMIN_EMAIL, "password": "wrong" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert_eq!(body["message"], "Bad credentials");
}

#[tokio::test]
async fn test_register_validation_and_conflict() {
    let fixture = TestFixture::new().await;

    // Password too short
    let resp = fixture
        .client
        .post(fixture.url("/api/v1/auth/register"))
        .json(&json!({ "name": "Bob", "email": "bob@example.com", "password": "123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "VALIDATION_ERROR");

    // Duplicate email
    fixture
        .register_verified("Bob", "bob@example.com", "password123")
        .await;
    let dup = fixture
        .client
        .post(fixture.url("/api/v1/auth/register"))
        .json(&json!({ "name": "Bob2", "email": "bob@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), 409);
    let dup_body: Value = dup.json().await.unwrap();
    assert_eq!(dup_body["error"], "CONFLICT");
}

#[tokio::test]
async fn test_refresh_token_flow() {
    let fixture = TestFixture::new().await;

    // Login sets the refresh cookie on the shared cookie store
    let login = fixture
        .client
        .post(fixture.url("/api/v1/auth/login"))
        .json(&json!({ "username": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
    let set_cookie = login
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("refresh_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let resp = fixture
        .client
        .get(fixture.url("/api/v1/auth/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["accessToken"].as_str().unwrap().len() > 20);
    assert_eq!(body["data"]["user"]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let fixture = TestFixture::new().await;
    let access = fixture.admin_token().await;

    let logout = fixture
        .client
        .post(fixture.url("/api/v1/auth/logout"))
        .bearer_auth(&access)
        .send()
        .await
        .unwrap();
    assert_eq!(logout.status(), 200);

    // The stored token is gone, so refresh fails even with the old cookie
    let refresh = fixture
        .client
        .get(fixture.url("/api/v1/auth/refresh"))
        .send()
        .await
        .unwrap();
    assert_eq!(refresh.status(), 401);
}

#[tokio::test]
async fn test_change_password() {
    let fixture = TestFixture::new().await;
    let access = fixture
        .register_verified("Carol", "carol@example.com", "password123")
        .await;

    // Wrong current password
    let bad = fixture
        .client
        .post(fixture.url("/api/v1/auth/change-password"))
        .bearer_auth(&access)
        .json(&json!({ "currentPassword": "nope", "newPassword": "newpassword1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), 401);

    let good = fixture
        .client
        .post(fixture.url("/api/v1/auth/change-password"))
        .bearer_auth(&access)
        .json(&json!({ "currentPassword": "password123", "newPassword": "newpassword1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(good.status(), 200);

    // Old password no longer works, new one does
    let old_login = fixture
        .client
        .post(fixture.url("/api/v1/auth/login"))
        .json(&json!({ "username": "carol@example.com", "password": "password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(old_login.status(), 401);
    fixture.login("carol@example.com", "newpassword1").await;
}

#[tokio::test]
async fn test_book_crud_and_soft_delete() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let book_id = fixture.create_book(&admin, "Dune", "Sci-Fi", 3).await;

    // Public detail
    let get_resp = fixture
        .client
        .get(fixture.url(&format!("/api/v1/books/{}", book_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(get_resp.status(), 200);
    let get_body: Value = get_resp.json().await.unwrap();
    assert_eq!(get_body["data"]["title"], "Dune");
    assert_eq!(get_body["data"]["status"], "AVAILABLE");

    // Update
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/v1/admin/books/{}", book_id)))
        .bearer_auth(&admin)
        .json(&json!({ "quantity": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["quantity"], 5);

    // Soft delete hides the book from the public catalog
    let toggle_resp = fixture
        .client
        .patch(fixture.url(&format!("/api/v1/admin/books/{}", book_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(toggle_resp.status(), 200);
    let toggle_body: Value = toggle_resp.json().await.unwrap();
    assert_eq!(toggle_body["data"]["active"], false);

    let hidden = fixture
        .client
        .get(fixture.url(&format!("/api/v1/books/{}", book_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(hidden.status(), 404);

    // But the admin listing still sees it
    let admin_list = fixture
        .client
        .get(fixture.url("/api/v1/admin/books"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let admin_body: Value = admin_list.json().await.unwrap();
    assert_eq!(admin_body["data"]["meta"]["total"], 1);

    // Hard delete
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/v1/admin/books/{}", book_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);

    let gone = fixture
        .client
        .get(fixture.url(&format!("/api/v1/books/{}", book_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_book_listing_pagination_and_filter() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    fixture.create_book(&admin, "Dune", "Sci-Fi", 2).await;
    fixture.create_book(&admin, "Neuromancer", "Sci-Fi", 2).await;
    fixture.create_book(&admin, "Emma", "Classic", 2).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/v1/books?page=1&pageSize=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["meta"]["total"], 3);
    assert_eq!(body["data"]["meta"]["pages"], 2);
    assert_eq!(body["data"]["result"].as_array().unwrap().len(), 2);

    let filtered = fixture
        .client
        .get(fixture.url("/api/v1/books?category=Classic"))
        .send()
        .await
        .unwrap();
    let filtered_body: Value = filtered.json().await.unwrap();
    assert_eq!(filtered_body["data"]["meta"]["total"], 1);
    assert_eq!(filtered_body["data"]["result"][0]["title"], "Emma");
}

#[tokio::test]
async fn test_bulk_create_books() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/v1/admin/books/bulk"))
        .bearer_auth(&admin)
        .json(&json!({
            "books": [
                { "category": "Sci-Fi", "title": "Solaris", "author": "Lem", "publisher": "P", "quantity": 1 },
                { "category": "Sci-Fi", "title": "", "author": "Nobody", "publisher": "P", "quantity": 1 },
                { "category": "Sci-Fi", "title": "Ubik", "author": "Dick", "publisher": "P", "quantity": -1 }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["successCount"], 1);
    assert_eq!(body["data"]["errorCount"], 2);
    assert_eq!(body["data"]["errors"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let fixture = TestFixture::new().await;

    // No token at all
    let anon = fixture
        .client
        .get(fixture.url("/api/v1/admin/users"))
        .send()
        .await
        .unwrap();
    assert_eq!(anon.status(), 401);

    // Ordinary member
    let member = fixture
        .register_verified("Dave", "dave@example.com", "password123")
        .await;
    let forbidden = fixture
        .client
        .get(fixture.url("/api/v1/admin/users"))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);
    let body: Value = forbidden.json().await.unwrap();
    assert_eq!(body["error"], "FORBIDDEN");
}

#[tokio::test]
async fn test_cart_and_borrow_flow() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let member = fixture
        .register_verified("Erin", "erin@example.com", "password123")
        .await;

    let book_id = fixture.create_book(&admin, "Dune", "Sci-Fi", 1).await;

    // Add to cart
    let cart_resp = fixture
        .client
        .post(fixture.url("/api/v1/add-to-cart"))
        .bearer_auth(&member)
        .json(&json!({ "bookId": book_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(cart_resp.status(), 201);

    let carts = fixture
        .client
        .get(fixture.url("/api/v1/carts"))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    let carts_body: Value = carts.json().await.unwrap();
    assert_eq!(carts_body["data"].as_array().unwrap().len(), 1);

    // Checkout the last copy
    let borrow_resp = fixture
        .client
        .post(fixture.url("/api/v1/borrow"))
        .bearer_auth(&admin)
        .json(&json!({
            "username": "erin@example.com",
            "details": [{ "bookId": book_id }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(borrow_resp.status(), 201);
    let borrow_body: Value = borrow_resp.json().await.unwrap();
    let borrow_id = borrow_body["data"][0]["id"].as_i64().unwrap();
    assert_eq!(borrow_body["data"][0]["status"], "BORROWED");

    // Stock is exhausted and the book flips to UNAVAILABLE
    let book = fixture
        .client
        .get(fixture.url(&format!("/api/v1/books/{}", book_id)))
        .send()
        .await
        .unwrap();
    let book_body: Value = book.json().await.unwrap();
    assert_eq!(book_body["data"]["quantity"], 0);
    assert_eq!(book_body["data"]["status"], "UNAVAILABLE");

    // Checkout cleared the cart
    let carts_after = fixture
        .client
        .get(fixture.url("/api/v1/carts"))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    let carts_after_body: Value = carts_after.json().await.unwrap();
    assert!(carts_after_body["data"].as_array().unwrap().is_empty());

    // Borrowing the unavailable book again fails at checkout
    let again = fixture
        .client
        .post(fixture.url("/api/v1/borrow"))
        .bearer_auth(&admin)
        .json(&json!({
            "username": "erin@example.com",
            "details": [{ "bookId": book_id }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 400);

    // Return restores stock and availability
    let return_resp = fixture
        .client
        .put(fixture.url("/api/v1/return-book"))
        .bearer_auth(&admin)
        .json(&json!({ "borrowId": borrow_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(return_resp.status(), 200);
    let return_body: Value = return_resp.json().await.unwrap();
    assert_eq!(return_body["data"]["status"], "RETURNED");

    let restored = fixture
        .client
        .get(fixture.url(&format!("/api/v1/books/{}", book_id)))
        .send()
        .await
        .unwrap();
    let restored_body: Value = restored.json().await.unwrap();
    assert_eq!(restored_body["data"]["quantity"], 1);
    assert_eq!(restored_body["data"]["status"], "AVAILABLE");

    // History records the round trip
    let history = fixture
        .client
        .get(fixture.url("/api/v1/borrow-history"))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    let history_body: Value = history.json().await.unwrap();
    assert_eq!(history_body["data"]["meta"]["total"], 1);
}

#[tokio::test]
async fn test_same_category_borrow_rejected() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let member = fixture
        .register_verified("Frank", "frank@example.com", "password123")
        .await;

    let first = fixture.create_book(&admin, "Dune", "Sci-Fi", 2).await;
    let second = fixture.create_book(&admin, "Ubik", "Sci-Fi", 2).await;

    fixture
        .client
        .post(fixture.url("/api/v1/borrow"))
        .bearer_auth(&admin)
        .json(&json!({
            "username": "frank@example.com",
            "details": [{ "bookId": first }]
        }))
        .send()
        .await
        .unwrap();

    // A second Sci-Fi book cannot even enter the cart
    let resp = fixture
        .client
        .post(fixture.url("/api/v1/add-to-cart"))
        .bearer_auth(&member)
        .json(&json!({ "bookId": second }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Sorry, you have to return the book is borrowed before you borrow the other one."
    );

    // Nor the same book again
    let same = fixture
        .client
        .post(fixture.url("/api/v1/add-to-cart"))
        .bearer_auth(&member)
        .json(&json!({ "bookId": first }))
        .send()
        .await
        .unwrap();
    assert_eq!(same.status(), 400);
}

#[tokio::test]
async fn test_maintenance_mode() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    // Turn maintenance on
    let on = fixture
        .client
        .patch(fixture.url("/api/v1/admin/maintenance?maintenanceMode=true"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(on.status(), 200);
    let on_body: Value = on.json().await.unwrap();
    assert_eq!(on_body["data"]["maintenanceMode"], true);

    // Ordinary traffic is rejected
    let blocked = fixture
        .client
        .get(fixture.url("/api/v1/books"))
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), 503);
    let blocked_body: Value = blocked.json().await.unwrap();
    assert_eq!(blocked_body["error"], "MAINTENANCE");

    // Allowlisted endpoints still respond
    let status = fixture
        .client
        .get(fixture.url("/api/v1/maintenance"))
        .send()
        .await
        .unwrap();
    assert_eq!(status.status(), 200);
    fixture.admin_token().await;

    // Turn it back off
    let off = fixture
        .client
        .patch(fixture.url("/api/v1/admin/maintenance?maintenanceMode=false"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(off.status(), 200);

    let open = fixture
        .client
        .get(fixture.url("/api/v1/books"))
        .send()
        .await
        .unwrap();
    assert_eq!(open.status(), 200);

    // Missing query parameter is a 400
    let missing = fixture
        .client
        .patch(fixture.url("/api/v1/admin/maintenance"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);
}

#[tokio::test]
async fn test_user_management() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    // Create
    let create_resp = fixture
        .client
        .post(fixture.url("/api/v1/admin/users"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Grace", "email": "grace@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(create_resp.status(), 201);
    let create_body: Value = create_resp.json().await.unwrap();
    let user_id = create_body["data"]["id"].as_i64().unwrap();
    assert_eq!(create_body["data"]["role"]["name"], "user");

    // Duplicate email
    let dup = fixture
        .client
        .post(fixture.url("/api/v1/admin/users"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Grace2", "email": "grace@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), 409);

    // Update
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/v1/admin/users/{}", user_id)))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Grace Hopper", "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let update_body: Value = update_resp.json().await.unwrap();
    assert_eq!(update_body["data"]["name"], "Grace Hopper");
    assert_eq!(update_body["data"]["active"], false);

    // List with filter
    let list_resp = fixture
        .client
        .get(fixture.url("/api/v1/admin/users?name=Hopper"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let list_body: Value = list_resp.json().await.unwrap();
    assert_eq!(list_body["data"]["meta"]["total"], 1);

    // Delete
    let delete_resp = fixture
        .client
        .delete(fixture.url(&format!("/api/v1/admin/users/{}", user_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(delete_resp.status(), 200);

    let gone = fixture
        .client
        .get(fixture.url(&format!("/api/v1/admin/users/{}", user_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), 404);
}

#[tokio::test]
async fn test_role_and_permission_conflicts() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let role_resp = fixture
        .client
        .post(fixture.url("/api/v1/admin/roles"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "librarian", "description": "Front desk" }))
        .send()
        .await
        .unwrap();
    assert_eq!(role_resp.status(), 201);

    let dup_role = fixture
        .client
        .post(fixture.url("/api/v1/admin/roles"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "librarian" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup_role.status(), 409);

    let perm_resp = fixture
        .client
        .post(fixture.url("/api/v1/admin/permissions"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "List books",
            "apiPath": "/api/v1/admin/books",
            "method": "GET",
            "module": "BOOKS"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(perm_resp.status(), 201);

    let dup_perm = fixture
        .client
        .post(fixture.url("/api/v1/admin/permissions"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "List books again",
            "apiPath": "/api/v1/admin/books",
            "method": "GET",
            "module": "BOOKS"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup_perm.status(), 409);
}

#[tokio::test]
async fn test_permission_grants_admin_route() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    // Role with one permission on the admin book listing
    let perm_resp = fixture
        .client
        .post(fixture.url("/api/v1/admin/permissions"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "List books",
            "apiPath": "/api/v1/admin/books",
            "method": "GET",
            "module": "BOOKS"
        }))
        .send()
        .await
        .unwrap();
    let perm_body: Value = perm_resp.json().await.unwrap();
    let perm_id = perm_body["data"]["id"].as_i64().unwrap();

    let role_resp = fixture
        .client
        .post(fixture.url("/api/v1/admin/roles"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "librarian", "permissionIds": [perm_id] }))
        .send()
        .await
        .unwrap();
    let role_body: Value = role_resp.json().await.unwrap();
    let role_id = role_body["data"]["id"].as_i64().unwrap();

    // Member promoted to librarian
    fixture
        .register_verified("Heidi", "heidi@example.com", "password123")
        .await;
    let heidi = fixture
        .repo
        .find_user_by_email("heidi@example.com")
        .await
        .unwrap()
        .unwrap();
    fixture
        .client
        .put(fixture.url(&format!("/api/v1/admin/users/{}", heidi.id)))
        .bearer_auth(&admin)
        .json(&json!({ "roleId": role_id }))
        .send()
        .await
        .unwrap();
    // Log in after the promotion so the session carries the new role
    let member = fixture.login("heidi@example.com", "password123").await;

    // Granted route works
    let allowed = fixture
        .client
        .get(fixture.url("/api/v1/admin/books"))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);

    // Anything else stays forbidden
    let denied = fixture
        .client
        .get(fixture.url("/api/v1/admin/users"))
        .bearer_auth(&member)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);
}

#[tokio::test]
async fn test_activity_logs_and_dashboard() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let book_id = fixture.create_book(&admin, "Dune", "Sci-Fi", 4).await;
    fixture
        .client
        .put(fixture.url(&format!("/api/v1/admin/books/{}", book_id)))
        .bearer_auth(&admin)
        .json(&json!({ "quantity": 2 }))
        .send()
        .await
        .unwrap();

    // Activity log captured both writes, newest first
    let logs = fixture
        .client
        .get(fixture.url("/api/v1/admin/activity-logs?group=Book"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(logs.status(), 200);
    let logs_body: Value = logs.json().await.unwrap();
    assert_eq!(logs_body["data"]["meta"]["total"], 2);
    assert_eq!(logs_body["data"]["result"][0]["activityType"], "Update book");
    let description = logs_body["data"]["result"][0]["description"]
        .as_array()
        .unwrap();
    assert!(description
        .iter()
        .any(|d| d["key"] == "quantity" && d["value"] == "4 -> 2"));

    // Dashboard counts
    let dash = fixture
        .client
        .get(fixture.url("/api/v1/admin/dashboard"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(dash.status(), 200);
    let dash_body: Value = dash.json().await.unwrap();
    assert_eq!(dash_body["data"]["countAdmin"], 1);
    assert_eq!(dash_body["data"]["countBook"], 1);

    // Per-book stock stats
    let books = fixture
        .client
        .get(fixture.url("/api/v1/admin/dashboard/books"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(books.status(), 200);
    let books_body: Value = books.json().await.unwrap();
    let stats = books_body["data"].as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["currentQty"], 2);
    assert_eq!(stats[0]["totalQty"], 2);
}
