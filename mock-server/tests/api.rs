use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Post, VALID_OTP, VALID_TOKEN};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- posts ---

#[tokio::test]
async fn list_posts_empty() {
    let resp = app().oneshot(get("/posts")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let posts: Vec<Post> = body_json(resp).await;
    assert!(posts.is_empty());
}

#[tokio::test]
async fn create_post_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/posts", r#"{"userId":1,"title":"foo","body":"bar"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Post = body_json(resp).await;
    assert_eq!(post.user_id, 1);
    assert_eq!(post.title, "foo");
    assert_eq!(post.body, "bar");
}

#[tokio::test]
async fn create_post_rejects_missing_title() {
    let resp = app()
        .oneshot(json_request("POST", "/posts", r#"{"userId":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_post_bad_uuid() {
    let resp = app().oneshot(get("/posts/not-a-uuid")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_post_not_found() {
    let resp = app()
        .oneshot(json_request(
            "PATCH",
            "/posts/00000000-0000-0000-0000-000000000000",
            r#"{"title":"Nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/posts", r#"{"userId":2,"title":"b-post"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Post = body_json(resp).await;
    let id = created.id;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/posts", r#"{"userId":1,"title":"a-post"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // list is sorted by title
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(get("/posts")).await.unwrap();
    let posts: Vec<Post> = body_json(resp).await;
    let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["a-post", "b-post"]);

    // filter by userId
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/posts?userId=2"))
        .await
        .unwrap();
    let posts: Vec<Post> = body_json(resp).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, id);

    // patch: only body
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PATCH", &format!("/posts/{id}"), r#"{"body":"patched"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let patched: Post = body_json(resp).await;
    assert_eq!(patched.title, "b-post");
    assert_eq!(patched.body, "patched");

    // put replaces every field
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/posts/{id}"),
            r#"{"userId":3,"title":"c-post"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let replaced: Post = body_json(resp).await;
    assert_eq!(replaced.user_id, 3);
    assert_eq!(replaced.title, "c-post");
    assert!(replaced.body.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(
            Request::builder()
                .method("DELETE")
                .uri(format!("/posts/{id}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get(&format!("/posts/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- auth ---

#[tokio::test]
async fn me_without_token_is_401() {
    let resp = app().oneshot(get("/me")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "missing token"}));
}

#[tokio::test]
async fn me_with_wrong_token_is_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(http::header::AUTHORIZATION, "Bearer nope")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "invalid token");
}

#[tokio::test]
async fn me_with_valid_token() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(http::header::AUTHORIZATION, format!("Bearer {VALID_TOKEN}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body["id"], 1);
}

#[tokio::test]
async fn otp_verify_checks_header() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/otp/verify")
                .header("otp-token", VALID_OTP)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"verified": true}));

    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/otp/verify")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- flaky ---

#[tokio::test]
async fn flaky_fails_then_recovers() {
    use tower::Service;

    let mut app = app().into_service();
    let mut statuses = Vec::new();
    for _ in 0..3 {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(get("/flaky/k?failures=2&status=502"))
            .await
            .unwrap();
        statuses.push(resp.status());
    }

    assert_eq!(
        statuses,
        vec![StatusCode::BAD_GATEWAY, StatusCode::BAD_GATEWAY, StatusCode::OK]
    );
}

#[tokio::test]
async fn flaky_counts_keys_separately() {
    use tower::Service;

    let mut app = app().into_service();
    let first = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/flaky/a?failures=1"))
        .await
        .unwrap();
    let other = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/flaky/b?failures=1"))
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(other.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = body_json(other).await;
    assert_eq!(body["attempt"], 1);
}

// --- echo / query / upload ---

#[tokio::test]
async fn echo_returns_the_body() {
    let resp = app()
        .oneshot(json_request("PUT", "/echo", r#"{"nested":{"list":[1,2,3]}}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"nested": {"list": [1, 2, 3]}}));
}

#[tokio::test]
async fn query_returns_pairs_in_order() {
    let resp = app()
        .oneshot(get("/query?b=2&a=hello%20world&b=3"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let pairs: Vec<(String, String)> = body_json(resp).await;
    assert_eq!(
        pairs,
        vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "hello world".to_string()),
            ("b".to_string(), "3".to_string()),
        ]
    );
}

#[tokio::test]
async fn upload_describes_each_field() {
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"title\"\r\n\r\n\
         avatar\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\n\
         Content-Type: image/png\r\n\r\n\
         1234\r\n\
         --{boundary}--\r\n"
    );
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(
                    http::header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    assert_eq!(
        body,
        json!({
            "fields": [
                {"name": "title", "fileName": null, "contentType": null, "size": 6},
                {"name": "file", "fileName": "a.png", "contentType": "image/png", "size": 4},
            ]
        })
    );
}
