use serde::Serialize;

use crate::error::MirrorError;
use crate::http::{HttpClient, Method};

const CLASSIC_LOGIN_URL: &str = "https://login.invisionapp.com/login-api/api/v2/login";
const API_LOGIN_URL: &str = "https://projects.invisionapp.com/api/account/login";

#[derive(Serialize)]
struct ClassicLoginBody<'a> {
    #[serde(rename = "deviceID")]
    device_id: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ApiLoginBody<'a> {
    email: &'a str,
    password: &'a str,
    webview: &'a str,
}

/// Two-step credential exchange that seeds the session cookies the rest of
/// the API adapter relies on. Both POSTs must succeed; either failing is
/// fatal to the run (error kind 2: Authentication failure).
pub async fn login(client: &HttpClient, email: &str, password: &str) -> Result<(), MirrorError> {
    let classic_body = ClassicLoginBody {
        device_id: "App",
        email,
        password,
    };
    let classic = client
        .request(Method::Post, CLASSIC_LOGIN_URL, None, Some(&classic_body))
        .await;
    if classic.is_none() {
        return Err(MirrorError::Authentication(
            "classic login failed".to_string(),
        ));
    }

    let api_body = ApiLoginBody {
        email,
        password,
        webview: "false",
    };
    let api = client
        .request_form(Method::Post, API_LOGIN_URL, None, Some(&api_body))
        .await;
    if api.is_none() {
        return Err(MirrorError::Authentication("API login failed".to_string()));
    }

    tracing::info!(email, "authenticated with upstream");
    Ok(())
}
