//! API integration tests
//!
//! These run against a live server: start one with `RUN_MODE=test cargo run`
//! (the test overlay relaxes the register/login rate limits), then
//! `cargo test -- --ignored`. The target can be overridden with
//! LIBRIS_TEST_URL.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

fn base_url() -> String {
    std::env::var("LIBRIS_TEST_URL").unwrap_or_else(|_| "http://localhost:5000".to_string())
}

/// Unique email per call so tests can be re-run against the same database
fn unique_email(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    format!("{}.{}@example.com", prefix, nanos)
}

/// Register a user and return (token, user)
async fn register(client: &Client, email: &str, membership_type: &str) -> (String, Value) {
    let response = client
        .post(format!("{}/register", base_url()))
        .json(&json!({
            "email": email,
            "first_name": "Test",
            "last_name": "User",
            "password": "testpass123",
            "membership_type": membership_type
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse register response");
    let token = body["token"].as_str().expect("No token in response").to_string();
    (token, body["user"].clone())
}

/// Create an author, category and book through the staff endpoints;
/// returns the book id.
async fn create_book(client: &Client, staff_token: &str, isbn: &str, copies: i64) -> i64 {
    let response = client
        .post(format!("{}/authors", base_url()))
        .bearer_auth(staff_token)
        .json(&json!({ "name": "George Orwell", "birth_year": 1903 }))
        .send()
        .await
        .expect("Failed to create author");
    assert_eq!(response.status(), 201);
    let author: Value = response.json().await.unwrap();

    let response = client
        .post(format!("{}/categories", base_url()))
        .bearer_auth(staff_token)
        .json(&json!({ "name": "Fiction", "description": "Fictional novels and stories" }))
        .send()
        .await
        .expect("Failed to create category");
    assert_eq!(response.status(), 201);
    let category: Value = response.json().await.unwrap();

    let response = client
        .post(format!("{}/books", base_url()))
        .bearer_auth(staff_token)
        .json(&json!({
            "title": "Nineteen Eighty-Four",
            "isbn": isbn,
            "author_id": author["id"],
            "category_id": category["id"],
            "published_year": 1949,
            "description": "A dystopian social science fiction novel.",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.unwrap();
    book["id"].as_i64().expect("No book id")
}

fn unique_isbn() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("978{:010}", nanos % 10_000_000_000)
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
#[ignore]
async fn test_register_duplicate_email_conflicts() {
    let client = Client::new();
    let email = unique_email("dup");

    let (token, user) = register(&client, &email, "standard").await;
    assert!(!token.is_empty());
    assert_eq!(user["email"], email.as_str());
    assert_eq!(user["membership_type"], "standard");

    // Second registration with the same email must conflict
    let response = client
        .post(format!("{}/register", base_url()))
        .json(&json!({
            "email": email,
            "first_name": "Test",
            "last_name": "User",
            "password": "testpass123"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore]
async fn test_register_rejects_invalid_input() {
    let client = Client::new();

    let response = client
        .post(format!("{}/register", base_url()))
        .json(&json!({
            "email": "not-an-email",
            "first_name": "Test",
            "last_name": "User",
            "password": "testpass123"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // Admin accounts cannot be self-registered
    let response = client
        .post(format!("{}/register", base_url()))
        .json(&json!({
            "email": unique_email("admin"),
            "first_name": "Test",
            "last_name": "User",
            "password": "testpass123",
            "membership_type": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();
    let email = unique_email("login");
    register(&client, &email, "standard").await;

    let response = client
        .post(format!("{}/login", base_url()))
        .json(&json!({ "email": email, "password": "testpass123" }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert!(body["token"].is_string());

    // Wrong password is a 401
    let response = client
        .post(format!("{}/login", base_url()))
        .json(&json!({ "email": email, "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    // Unknown account is indistinguishable from a wrong password
    let response = client
        .post(format!("{}/login", base_url()))
        .json(&json!({ "email": unique_email("ghost"), "password": "whatever" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_profile_requires_token() {
    let client = Client::new();

    let response = client
        .get(format!("{}/profile", base_url()))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);

    let email = unique_email("profile");
    let (token, _) = register(&client, &email, "premium").await;

    let response = client
        .get(format!("{}/profile", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], email.as_str());
    assert_eq!(body["membership_type"], "premium");
    assert!(body["password_hash"].is_null());
}

#[tokio::test]
#[ignore]
async fn test_list_books_search_and_pagination() {
    let client = Client::new();
    let (staff_token, _) = register(&client, &unique_email("staff"), "staff").await;
    create_book(&client, &staff_token, &unique_isbn(), 2).await;

    let response = client
        .get(format!("{}/books?search=orwell&page=1&limit=5", base_url()))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    let items = body["items"].as_array().expect("items not an array");
    assert!(!items.is_empty());
    for item in items {
        let haystack = format!(
            "{} {} {}",
            item["title"].as_str().unwrap_or_default(),
            item["author"].as_str().unwrap_or_default(),
            item["description"].as_str().unwrap_or_default()
        )
        .to_lowercase();
        assert!(haystack.contains("orwell"));
    }

    let total = body["total"].as_i64().unwrap();
    let limit = body["limit"].as_i64().unwrap();
    let total_pages = body["total_pages"].as_i64().unwrap();
    assert_eq!(body["page"], 1);
    assert_eq!(total_pages, (total + limit - 1) / limit);
}

#[tokio::test]
#[ignore]
async fn test_inventory_requires_staff() {
    let client = Client::new();
    let (member_token, _) = register(&client, &unique_email("member"), "standard").await;

    let response = client
        .post(format!("{}/authors", base_url()))
        .bearer_auth(&member_token)
        .json(&json!({ "name": "Harper Lee" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);
}

#[tokio::test]
#[ignore]
async fn test_borrow_requires_token() {
    let client = Client::new();

    let response = client
        .post(format!("{}/borrow", base_url()))
        .json(&json!({ "user_id": 1, "book_id": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 401);
}

#[tokio::test]
#[ignore]
async fn test_borrow_return_end_to_end() {
    let client = Client::new();

    // Staff sets up a single-copy book; two members compete for it.
    let (staff_token, _) = register(&client, &unique_email("staff"), "staff").await;
    let book_id = create_book(&client, &staff_token, &unique_isbn(), 1).await;

    let (token_a, user_a) = register(&client, &unique_email("member.a"), "standard").await;
    let (token_c, user_c) = register(&client, &unique_email("member.c"), "standard").await;
    let user_a_id = user_a["id"].as_i64().unwrap();
    let user_c_id = user_c["id"].as_i64().unwrap();

    // A borrows the last copy
    let response = client
        .post(format!("{}/borrow", base_url()))
        .bearer_auth(&token_a)
        .json(&json!({ "user_id": user_a_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let borrow_id = body["borrow_record"]["id"].as_i64().expect("No borrow id");
    assert_eq!(body["borrow_record"]["status"], "ACTIVE");
    assert_eq!(body["borrow_record"]["book"]["author"], "George Orwell");

    // The shelf is now empty and the book view lists A as a borrower
    let response = client
        .get(format!("{}/books/{}", base_url(), book_id))
        .send()
        .await
        .expect("Failed to send request");
    let book: Value = response.json().await.unwrap();
    assert_eq!(book["available_copies"], 0);
    assert_eq!(book["borrow_records"].as_array().unwrap().len(), 1);

    // A cannot borrow the same book twice, C cannot borrow an empty shelf
    let response = client
        .post(format!("{}/borrow", base_url()))
        .bearer_auth(&token_a)
        .json(&json!({ "user_id": user_a_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    let response = client
        .post(format!("{}/borrow", base_url()))
        .bearer_auth(&token_c)
        .json(&json!({ "user_id": user_c_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // A returns the book: on time, so no fine
    let response = client
        .post(format!("{}/return", base_url()))
        .bearer_auth(&token_a)
        .json(&json!({ "borrow_id": borrow_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["borrow_record"]["status"], "RETURNED");
    assert!(body["borrow_record"]["returned_at"].is_string());
    assert_eq!(body["fine"], "No fine");

    // Returning twice is refused
    let response = client
        .post(format!("{}/return", base_url()))
        .bearer_auth(&token_a)
        .json(&json!({ "borrow_id": borrow_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    // The copy is back on the shelf and C can borrow it now
    let response = client
        .get(format!("{}/books/{}", base_url(), book_id))
        .send()
        .await
        .expect("Failed to send request");
    let book: Value = response.json().await.unwrap();
    assert_eq!(book["available_copies"], 1);

    let response = client
        .post(format!("{}/borrow", base_url()))
        .bearer_auth(&token_c)
        .json(&json!({ "user_id": user_c_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

#[tokio::test]
#[ignore]
async fn test_borrow_with_past_due_date_incurs_fine() {
    let client = Client::new();

    let (staff_token, _) = register(&client, &unique_email("staff"), "staff").await;
    let book_id = create_book(&client, &staff_token, &unique_isbn(), 1).await;
    let (token, user) = register(&client, &unique_email("late"), "standard").await;
    let user_id = user["id"].as_i64().unwrap();

    // Borrow with a due date five days in the past
    let response = client
        .post(format!("{}/borrow", base_url()))
        .bearer_auth(&token)
        .json(&json!({
            "user_id": user_id,
            "book_id": book_id,
            "due_date": "2024-01-10T00:00:00Z"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let body: Value = response.json().await.unwrap();
    let borrow_id = body["borrow_record"]["id"].as_i64().unwrap();
    // Past-due active records read as OVERDUE without being stored as such
    assert_eq!(body["borrow_record"]["status"], "OVERDUE");

    let response = client
        .post(format!("{}/return", base_url()))
        .bearer_auth(&token)
        .json(&json!({ "borrow_id": borrow_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let fine = body["fine"].as_str().unwrap();
    assert!(fine.starts_with('$'), "expected a fine, got {}", fine);
}

#[tokio::test]
#[ignore]
async fn test_my_borrows_ownership() {
    let client = Client::new();

    let (token_a, user_a) = register(&client, &unique_email("hist.a"), "standard").await;
    let (token_b, _) = register(&client, &unique_email("hist.b"), "standard").await;
    let user_a_id = user_a["id"].as_i64().unwrap();

    // A reads their own (empty) history
    let response = client
        .get(format!("{}/my-borrows/{}", base_url(), user_a_id))
        .bearer_auth(&token_a)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert!(body["items"].is_array());
    assert!(body["total"].is_number());

    // B is refused A's history
    let response = client
        .get(format!("{}/my-borrows/{}", base_url(), user_a_id))
        .bearer_auth(&token_b)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 403);

    // Staff may read anyone's history
    let (staff_token, _) = register(&client, &unique_email("hist.staff"), "staff").await;
    let response = client
        .get(format!("{}/my-borrows/{}", base_url(), user_a_id))
        .bearer_auth(&staff_token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());
}
