use std::time::Duration;

use serde::Serialize;

use invision_mirror::http::{HttpClient, Method};

#[derive(Serialize)]
struct FormBody<'a> {
    email: &'a str,
}

#[tokio::test]
async fn retries_on_transient_status_then_succeeds() {
    let mut server = mockito::Server::new_async().await;
    let fail_mock = server
        .mock("GET", "/projects")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let ok_mock = server
        .mock("GET", "/projects")
        .with_status(200)
        .with_body("{\"ok\":true}")
        .expect(1)
        .create_async()
        .await;

    let client = HttpClient::new(None)
        .unwrap()
        .with_retry_policy(5, Duration::from_millis(10));
    let url = format!("{}/projects", server.url());

    let response = client.request::<()>(Method::Get, &url, None, None).await;
    assert!(response.is_some());
    assert_eq!(response.unwrap().status().as_u16(), 200);

    fail_mock.assert_async().await;
    ok_mock.assert_async().await;
}

#[tokio::test]
async fn gives_up_after_max_retries() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/projects")
        .with_status(500)
        .expect(3)
        .create_async()
        .await;

    let client = HttpClient::new(None)
        .unwrap()
        .with_retry_policy(3, Duration::from_millis(5));
    let url = format!("{}/projects", server.url());

    let response = client.request::<()>(Method::Get, &url, None, None).await;
    assert!(response.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn request_form_sends_urlencoded_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/login")
        .match_header("content-type", "application/x-www-form-urlencoded")
        .match_body("email=a%40example.com")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let client = HttpClient::new(None).unwrap();
    let url = format!("{}/login", server.url());
    let body = FormBody { email: "a@example.com" };

    let response = client.request_form(Method::Post, &url, None, Some(&body)).await;
    assert!(response.is_some());
    mock.assert_async().await;
}

#[tokio::test]
async fn non_retryable_status_returns_immediately() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/projects")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;

    let client = HttpClient::new(None)
        .unwrap()
        .with_retry_policy(5, Duration::from_millis(10));
    let url = format!("{}/projects", server.url());

    let response = client.request::<()>(Method::Get, &url, None, None).await;
    assert!(response.is_none());
    mock.assert_async().await;
}
