// tests/api_tests.rs

use std::sync::Arc;

use blogicum::{
    config::Config,
    models::user::NewUser,
    repository::{BlogRepository, InMemoryRepository, RepositoryState},
    routes,
    state::AppState,
    utils::hash::hash_password,
};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

const PASSWORD: &str = "password123";

/// Spawns the app over a fresh in-memory repository on a random port.
/// Returns the base URL (e.g., "http://127.0.0.1:12345") and the repository.
async fn spawn_app() -> (String, Arc<InMemoryRepository>) {
    let repo = Arc::new(InMemoryRepository::new());

    let config = Config {
        database_url: String::new(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        admin_username: None,
        admin_password: None,
    };

    let shared: RepositoryState = repo.clone();
    let state = AppState { repo: shared, config };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, repo)
}

/// Redirects are asserted on, never followed.
fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

async fn login(client: &reqwest::Client, address: &str, username: &str) -> String {
    let body: Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": username, "password": PASSWORD }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .expect("Failed to parse login json");

    body["token"].as_str().expect("Token not found").to_string()
}

async fn register_and_login(client: &reqwest::Client, address: &str, username: &str) -> String {
    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "username": username, "password": PASSWORD }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(response.status().as_u16(), 201);

    login(client, address, username).await
}

async fn superuser_token(client: &reqwest::Client, address: &str, repo: &InMemoryRepository) -> String {
    repo.create_user(NewUser {
        username: "root".to_string(),
        password_hash: hash_password(PASSWORD).unwrap(),
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        is_superuser: true,
    })
    .await
    .unwrap();

    login(client, address, "root").await
}

async fn create_post(client: &reqwest::Client, address: &str, token: &str, body: Value) -> i64 {
    let response = client
        .post(format!("{}/api/posts", address))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .expect("Create post failed");
    assert_eq!(response.status().as_u16(), 201);

    let post: Value = response.json().await.unwrap();
    post["id"].as_i64().expect("post id")
}

fn hours_from_now(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours)).to_rfc3339()
}

fn item_ids(page: &Value) -> Vec<i64> {
    page["items"]
        .as_array()
        .expect("items array")
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn unknown_route_is_404() {
    let (address, _) = spawn_app().await;

    let response = client()
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_fails_validation_with_field_messages() {
    let (address, _) = spawn_app().await;

    let response = client()
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "username": "bad name!", "password": "password123", "email": "nope" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["username"].is_array());
    assert!(body["fields"]["email"].is_array());
}

#[tokio::test]
async fn duplicate_username_is_conflict() {
    let (address, _) = spawn_app().await;
    let client = client();
    register_and_login(&client, &address, "alice").await;

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&json!({ "username": "alice", "password": "another1" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn login_does_not_reveal_which_part_was_wrong() {
    let (address, _) = spawn_app().await;
    let client = client();
    register_and_login(&client, &address, "alice").await;

    let wrong_password = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": "alice", "password": "wrong-one" }))
        .send()
        .await
        .unwrap();
    let unknown_user = client
        .post(format!("{}/api/auth/login", address))
        .json(&json!({ "username": "nobody", "password": PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status().as_u16(), 401);
    assert_eq!(unknown_user.status().as_u16(), 401);
    assert_eq!(
        wrong_password.text().await.unwrap(),
        unknown_user.text().await.unwrap()
    );
}

#[tokio::test]
async fn invalid_token_is_rejected_even_on_public_routes() {
    let (address, _) = spawn_app().await;

    let response = client()
        .get(format!("{}/api/posts", address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn stale_token_does_not_block_login_or_register() {
    let (address, _) = spawn_app().await;
    let client = client();

    let registered = client
        .post(format!("{}/api/auth/register", address))
        .bearer_auth("expired-or-garbage")
        .json(&json!({ "username": "returning", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(registered.status().as_u16(), 201);

    let login = client
        .post(format!("{}/api/auth/login", address))
        .bearer_auth("expired-or-garbage")
        .json(&json!({ "username": "returning", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status().as_u16(), 200);
    let body: Value = login.json().await.unwrap();
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn malformed_bodies_get_the_json_error_shape() {
    let (address, _) = spawn_app().await;
    let client = client();
    let token = register_and_login(&client, &address, "author").await;

    let missing_field = client
        .post(format!("{}/api/posts", address))
        .bearer_auth(&token)
        .json(&json!({ "title": "No text" }))
        .send()
        .await
        .unwrap();
    assert_eq!(missing_field.status().as_u16(), 400);
    let body: Value = missing_field.json().await.unwrap();
    assert!(body["error"].as_str().is_some_and(|msg| msg.contains("text")));

    let wrong_type = client
        .post(format!("{}/api/posts", address))
        .bearer_auth(&token)
        .json(&json!({ "title": "T", "text": "x", "is_published": "yes" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_type.status().as_u16(), 400);
    let body: Value = wrong_type.json().await.unwrap();
    assert!(body["error"].is_string());

    let not_json = client
        .post(format!("{}/api/posts", address))
        .bearer_auth(&token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(not_json.status().as_u16(), 400);
    let body: Value = not_json.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn writes_require_login() {
    let (address, _) = spawn_app().await;

    let response = client()
        .post(format!("{}/api/posts", address))
        .json(&json!({ "title": "Hi", "text": "There" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn home_feed_shows_only_live_posts_newest_first() {
    let (address, repo) = spawn_app().await;
    let client = client();
    let admin = superuser_token(&client, &address, &repo).await;
    let author = register_and_login(&client, &address, "author").await;

    let hidden: Value = client
        .post(format!("{}/api/admin/categories", address))
        .bearer_auth(&admin)
        .json(&json!({ "title": "Hidden", "slug": "hidden", "is_published": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let hidden_id = hidden["id"].as_i64().unwrap();

    let older = create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Older", "text": "a", "pub_date": hours_from_now(-2) }),
    )
    .await;
    let newer = create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Newer", "text": "b", "pub_date": hours_from_now(-1) }),
    )
    .await;
    create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Draft", "text": "c", "is_published": false }),
    )
    .await;
    create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Later", "text": "d", "pub_date": hours_from_now(24) }),
    )
    .await;
    create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Delisted", "text": "e", "pub_date": hours_from_now(-3), "category_id": hidden_id }),
    )
    .await;

    // The author's own token changes nothing on the home feed.
    for token in [None, Some(author.as_str())] {
        let mut request = client.get(format!("{}/api/posts", address));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let page: Value = request.send().await.unwrap().json().await.unwrap();

        assert_eq!(item_ids(&page), vec![newer, older]);
        assert_eq!(page["total_items"], 2);
    }
}

#[tokio::test]
async fn hidden_post_looks_exactly_like_a_missing_one() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;
    let stranger = register_and_login(&client, &address, "stranger").await;

    let draft = create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Draft", "text": "secret", "is_published": false }),
    )
    .await;

    let hidden = client
        .get(format!("{}/api/posts/{}", address, draft))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    let missing = client
        .get(format!("{}/api/posts/{}", address, 999_999))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();

    assert_eq!(hidden.status().as_u16(), 404);
    assert_eq!(missing.status().as_u16(), 404);
    assert_eq!(hidden.text().await.unwrap(), missing.text().await.unwrap());

    let own: Value = client
        .get(format!("{}/api/posts/{}", address, draft))
        .bearer_auth(&author)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["title"], "Draft");
    assert_eq!(own["state"], "draft");
    assert_eq!(own["comments"], json!([]));
}

#[tokio::test]
async fn stranger_writes_on_a_hidden_post_look_like_a_missing_one() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;
    let stranger = register_and_login(&client, &address, "stranger").await;

    let draft = create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Draft", "text": "secret", "is_published": false }),
    )
    .await;
    let edit = json!({ "title": "Mine now", "text": "x" });

    for id in [draft, 999_999] {
        let url = format!("{}/api/posts/{}", address, id);
        let put = client.put(&url).bearer_auth(&stranger).json(&edit).send().await.unwrap();
        assert_eq!(put.status().as_u16(), 404);
        assert!(put.headers().get("location").is_none());
        assert_eq!(put.json::<Value>().await.unwrap(), json!({ "error": "Post not found" }));

        let delete = client.delete(&url).bearer_auth(&stranger).send().await.unwrap();
        assert_eq!(delete.status().as_u16(), 404);
        assert_eq!(delete.json::<Value>().await.unwrap(), json!({ "error": "Post not found" }));
    }

    let own: Value = client
        .get(format!("{}/api/posts/{}", address, draft))
        .bearer_auth(&author)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["title"], "Draft");
}

#[tokio::test]
async fn own_comment_disappears_with_its_post() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;
    let reader = register_and_login(&client, &address, "reader").await;
    let post_id = create_post(&client, &address, &author, json!({ "title": "T", "text": "x" })).await;

    let comment: Value = client
        .post(format!("{}/api/posts/{}/comments", address, post_id))
        .bearer_auth(&reader)
        .json(&json!({ "text": "Nice post" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let comment_id = comment["id"].as_i64().unwrap();

    let unpublished = client
        .put(format!("{}/api/posts/{}", address, post_id))
        .bearer_auth(&author)
        .json(&json!({ "title": "T", "text": "x", "is_published": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(unpublished.status().as_u16(), 200);

    let detail = client
        .get(format!("{}/api/posts/{}", address, post_id))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status().as_u16(), 404);

    let missing = format!("{}/api/posts/{}/comments/{}", address, post_id, 999_999);
    let missing_edit = client
        .put(&missing)
        .bearer_auth(&reader)
        .json(&json!({ "text": "Edited" }))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    let url = format!("{}/api/posts/{}/comments/{}", address, post_id, comment_id);
    let edit = client
        .put(&url)
        .bearer_auth(&reader)
        .json(&json!({ "text": "Edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(edit.status().as_u16(), 404);
    assert_eq!(edit.text().await.unwrap(), missing_edit);

    let delete = client.delete(&url).bearer_auth(&reader).send().await.unwrap();
    assert_eq!(delete.status().as_u16(), 404);

    // Still there for the author, unchanged.
    let own: Value = client
        .get(format!("{}/api/posts/{}", address, post_id))
        .bearer_auth(&author)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["comments"][0]["text"], "Nice post");
}

#[tokio::test]
async fn scheduled_post_is_visible_to_its_author_only() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;

    let scheduled = create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Soon", "text": "x", "pub_date": hours_from_now(48) }),
    )
    .await;

    let anonymous = client
        .get(format!("{}/api/posts/{}", address, scheduled))
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 404);

    let own: Value = client
        .get(format!("{}/api/posts/{}", address, scheduled))
        .bearer_auth(&author)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["state"], "scheduled");
}

#[tokio::test]
async fn post_text_is_sanitized() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;

    let id = create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Html", "text": "<script>alert(1)</script>Hello" }),
    )
    .await;

    let post: Value = client
        .get(format!("{}/api/posts/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post["text"], "Hello");
}

#[tokio::test]
async fn unknown_category_is_a_field_error() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;

    let response = client
        .post(format!("{}/api/posts", address))
        .bearer_auth(&author)
        .json(&json!({ "title": "T", "text": "x", "category_id": 4242 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"]["category_id"].is_array());
}

#[tokio::test]
async fn stranger_edit_redirects_to_the_post_and_changes_nothing() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;
    let stranger = register_and_login(&client, &address, "stranger").await;
    let id = create_post(&client, &address, &author, json!({ "title": "Mine", "text": "x" })).await;

    for payload in [
        json!({ "title": "Stolen", "text": "y" }),
        json!({ "title": "", "text": "" }),
    ] {
        let response = client
            .put(format!("{}/api/posts/{}", address, id))
            .bearer_auth(&stranger)
            .json(&payload)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 303);
        assert_eq!(
            response.headers()["location"].to_str().unwrap(),
            format!("/api/posts/{}", id)
        );
    }

    let post: Value = client
        .get(format!("{}/api/posts/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post["title"], "Mine");
}

#[tokio::test]
async fn author_edit_keeps_unsent_schedule() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;
    let pub_date = hours_from_now(-5);
    let id = create_post(
        &client,
        &address,
        &author,
        json!({ "title": "First", "text": "x", "pub_date": pub_date }),
    )
    .await;

    let before: Value = client
        .get(format!("{}/api/posts/{}", address, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let response = client
        .put(format!("{}/api/posts/{}", address, id))
        .bearer_auth(&author)
        .json(&json!({ "title": "Second", "text": "y" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let after: Value = response.json().await.unwrap();
    assert_eq!(after["title"], "Second");
    assert_eq!(after["pub_date"], before["pub_date"]);
    assert_eq!(after["is_published"], true);
}

#[tokio::test]
async fn superuser_may_delete_any_post_but_strangers_may_not() {
    let (address, repo) = spawn_app().await;
    let client = client();
    let admin = superuser_token(&client, &address, &repo).await;
    let author = register_and_login(&client, &address, "author").await;
    let stranger = register_and_login(&client, &address, "stranger").await;
    let id = create_post(&client, &address, &author, json!({ "title": "T", "text": "x" })).await;

    let denied = client
        .delete(format!("{}/api/posts/{}", address, id))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status().as_u16(), 303);
    assert_eq!(
        denied.headers()["location"].to_str().unwrap(),
        format!("/api/posts/{}", id)
    );

    // Superusers can delete, but not edit, someone else's post.
    let edit = client
        .put(format!("{}/api/posts/{}", address, id))
        .bearer_auth(&admin)
        .json(&json!({ "title": "Moderated", "text": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(edit.status().as_u16(), 303);

    let deleted = client
        .delete(format!("{}/api/posts/{}", address, id))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let gone = client
        .get(format!("{}/api/posts/{}", address, id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn comment_flow_respects_ownership() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;
    let reader = register_and_login(&client, &address, "reader").await;
    let post_id = create_post(&client, &address, &author, json!({ "title": "T", "text": "x" })).await;
    let other_post = create_post(&client, &address, &author, json!({ "title": "U", "text": "y" })).await;

    // 1. Reader comments on a live post
    let created = client
        .post(format!("{}/api/posts/{}/comments", address, post_id))
        .bearer_auth(&reader)
        .json(&json!({ "text": "Nice post" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);
    let comment: Value = created.json().await.unwrap();
    let comment_id = comment["id"].as_i64().unwrap();
    assert_eq!(comment["author_username"], "reader");

    // 2. Empty text is rejected
    let empty = client
        .post(format!("{}/api/posts/{}/comments", address, post_id))
        .bearer_auth(&reader)
        .json(&json!({ "text": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status().as_u16(), 400);

    // 3. The post author cannot touch the reader's comment
    let url = format!("{}/api/posts/{}/comments/{}", address, post_id, comment_id);
    let edit = client
        .put(&url)
        .bearer_auth(&author)
        .json(&json!({ "text": "Edited by someone else" }))
        .send()
        .await
        .unwrap();
    assert_eq!(edit.status().as_u16(), 303);
    assert_eq!(
        edit.headers()["location"].to_str().unwrap(),
        format!("/api/posts/{}", post_id)
    );
    let delete = client.delete(&url).bearer_auth(&author).send().await.unwrap();
    assert_eq!(delete.status().as_u16(), 303);

    // 4. A comment addressed through another post does not exist
    let wrong_post = client
        .put(format!("{}/api/posts/{}/comments/{}", address, other_post, comment_id))
        .bearer_auth(&reader)
        .json(&json!({ "text": "Edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_post.status().as_u16(), 404);

    // 5. The comment author edits, then deletes
    let edit = client
        .put(&url)
        .bearer_auth(&reader)
        .json(&json!({ "text": "Edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(edit.status().as_u16(), 200);

    let detail: Value = client
        .get(format!("{}/api/posts/{}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["comment_count"], 1);
    assert_eq!(detail["comments"][0]["text"], "Edited");

    let delete = client.delete(&url).bearer_auth(&reader).send().await.unwrap();
    assert_eq!(delete.status().as_u16(), 204);
}

#[tokio::test]
async fn commenting_on_a_hidden_post_is_not_found() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;
    let reader = register_and_login(&client, &address, "reader").await;
    let draft = create_post(
        &client,
        &address,
        &author,
        json!({ "title": "Draft", "text": "x", "is_published": false }),
    )
    .await;

    let response = client
        .post(format!("{}/api/posts/{}/comments", address, draft))
        .bearer_auth(&reader)
        .json(&json!({ "text": "First!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    // The author can comment on their own draft.
    let own = client
        .post(format!("{}/api/posts/{}/comments", address, draft))
        .bearer_auth(&author)
        .json(&json!({ "text": "Note to self" }))
        .send()
        .await
        .unwrap();
    assert_eq!(own.status().as_u16(), 201);
}

#[tokio::test]
async fn home_feed_is_paginated_by_ten() {
    let (address, _) = spawn_app().await;
    let client = client();
    let author = register_and_login(&client, &address, "author").await;

    for i in 0..11 {
        create_post(
            &client,
            &address,
            &author,
            json!({ "title": format!("Post {}", i), "text": "x", "pub_date": hours_from_now(-(i + 1)) }),
        )
        .await;
    }

    let first: Value = client
        .get(format!("{}/api/posts", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item_ids(&first).len(), 10);
    assert_eq!(first["items"][0]["title"], "Post 0");
    assert_eq!(first["total_pages"], 2);
    assert_eq!(first["has_next"], true);
    assert_eq!(first["has_previous"], false);

    let second: Value = client
        .get(format!("{}/api/posts?page=2", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(item_ids(&second).len(), 1);
    assert_eq!(second["items"][0]["title"], "Post 10");
    assert_eq!(second["has_previous"], true);

    let beyond = client
        .get(format!("{}/api/posts?page=3", address))
        .send()
        .await
        .unwrap();
    assert_eq!(beyond.status().as_u16(), 404);

    let zero = client
        .get(format!("{}/api/posts?page=0", address))
        .send()
        .await
        .unwrap();
    assert_eq!(zero.status().as_u16(), 400);
    let body: Value = zero.json().await.unwrap();
    assert!(body["fields"]["page"].is_array());

    for raw in ["abc", "-1", ""] {
        let bad = client
            .get(format!("{}/api/posts?page={}", address, raw))
            .send()
            .await
            .unwrap();
        assert_eq!(bad.status().as_u16(), 400);
        let body: Value = bad.json().await.unwrap();
        assert!(body["fields"]["page"].is_array());
    }
}

#[tokio::test]
async fn empty_home_feed_has_one_page() {
    let (address, _) = spawn_app().await;

    let page: Value = client()
        .get(format!("{}/api/posts", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(page["items"], json!([]));
    assert_eq!(page["total_pages"], 1);
}

#[tokio::test]
async fn admin_routes_need_a_superuser() {
    let (address, repo) = spawn_app().await;
    let client = client();
    let user = register_and_login(&client, &address, "regular").await;
    let body = json!({ "title": "Travel", "slug": "travel" });

    let anonymous = client
        .post(format!("{}/api/admin/categories", address))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(anonymous.status().as_u16(), 401);
    let error: Value = anonymous.json().await.unwrap();
    assert!(error["error"].is_string());

    let regular = client
        .post(format!("{}/api/admin/categories", address))
        .bearer_auth(&user)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(regular.status().as_u16(), 403);
    let error: Value = regular.json().await.unwrap();
    assert_eq!(error["error"], "Superuser access required");

    let admin = superuser_token(&client, &address, &repo).await;
    let created = client
        .post(format!("{}/api/admin/categories", address))
        .bearer_auth(&admin)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(created.status().as_u16(), 201);

    let bad_slug = client
        .post(format!("{}/api/admin/categories", address))
        .bearer_auth(&admin)
        .json(&json!({ "title": "Bad", "slug": "no spaces" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_slug.status().as_u16(), 400);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (address, _) = spawn_app().await;

    let doc: Value = client()
        .get(format!("{}/api-docs/openapi.json", address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"]["/api/posts/{id}"].is_object());
}
