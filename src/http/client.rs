use std::sync::Arc;
use std::time::{Duration, Instant};

use cookie_store::CookieStore;
use reqwest::Response;
use reqwest_cookie_store::CookieStoreMutex;
use serde::Serialize;

use crate::metrics;

/// Desktop user agent string sent on every request, matching the upstream's
/// expectation that requests originate from the InVision desktop app.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

/// Status codes the upstream treats as transient: rate limiting and the usual
/// 5xx family. Preserved verbatim from the original scraper's retry set.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

const DEFAULT_MAX_RETRIES: u32 = 10;
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// How a request body is encoded. The upstream is inconsistent across its own
/// endpoints: the classic login and most API calls take JSON, but the API
/// login and the export-zip trigger expect `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Json,
    Form,
}

/// A session-carrying HTTP client: persistent cookie jar, XSRF header
/// injection, and fixed-cooldown retry on transient upstream failures.
///
/// The cookie jar is shared behind an `Arc` so every clone of this client
/// (one per concurrent screen/project task) observes cookies refreshed by any
/// other clone's response, per the shared-cookie-jar requirement.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    cookie_store: Arc<CookieStoreMutex>,
    max_retries: u32,
    cooldown: Duration,
}

impl HttpClient {
    /// `custom_ca_file`, if given, is a PEM file under the system CA
    /// directory (`/etc/ssl/certs` on most distros) appended to the trust
    /// store, per the original scraper's `CUSTOM_CA_FILE` handling.
    pub fn new(custom_ca_file: Option<&str>) -> anyhow::Result<Self> {
        let cookie_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let mut builder = reqwest::Client::builder()
            .cookie_provider(cookie_store.clone())
            .user_agent(USER_AGENT);

        if let Some(file_name) = custom_ca_file {
            let path = std::path::Path::new("/etc/ssl/certs").join(file_name);
            let pem = std::fs::read(&path)
                .map_err(|err| anyhow::anyhow!("failed to read custom CA file {}: {err}", path.display()))?;
            let cert = reqwest::Certificate::from_pem(&pem)?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            cookie_store,
            max_retries: DEFAULT_MAX_RETRIES,
            cooldown: DEFAULT_COOLDOWN,
        })
    }

    #[cfg(test)]
    pub fn with_retry_policy(mut self, max_retries: u32, cooldown: Duration) -> Self {
        self.max_retries = max_retries;
        self.cooldown = cooldown;
        self
    }

    /// Current value of the `XSRF-TOKEN` cookie, read fresh from the jar so a
    /// cookie refreshed by a concurrent response is always picked up.
    fn xsrf_token(&self) -> Option<String> {
        let store = self.cookie_store.lock().ok()?;
        store
            .iter_any()
            .find(|c| c.name() == "XSRF-TOKEN")
            .map(|c| c.value().to_string())
    }

    /// Issues a JSON-bodied request, retrying on transient failure per the
    /// upstream's documented behaviour. Returns `None` once retries are
    /// exhausted or a non-retryable non-200 status is returned.
    pub async fn request<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&T>,
    ) -> Option<Response> {
        self.request_encoded(method, url, query, body, Encoding::Json).await
    }

    /// Issues a form-urlencoded-bodied request, used by the handful of
    /// upstream endpoints that reject a JSON body (API login, export trigger).
    pub async fn request_form<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&T>,
    ) -> Option<Response> {
        self.request_encoded(method, url, query, body, Encoding::Form).await
    }

    async fn request_encoded<T: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&T>,
        encoding: Encoding,
    ) -> Option<Response> {
        let mut retries = 0;

        loop {
            let start = Instant::now();
            let mut builder = match method {
                Method::Get => self.client.get(url),
                Method::Post => self.client.post(url),
            };

            if let Some(query) = query {
                builder = builder.query(query);
            }
            if let Some(body) = body {
                builder = match encoding {
                    Encoding::Json => builder.json(body),
                    Encoding::Form => builder.form(body),
                };
            }
            if let Some(token) = self.xsrf_token() {
                builder = builder.header("x-xsrf-token", token);
            }
            builder = builder
                .header("x-client-type", "App")
                .header("calling-service", "auth-ui-browser");

            let outcome = builder.send().await;
            let method_label = match method {
                Method::Get => "GET",
                Method::Post => "POST",
            };

            match outcome {
                Ok(response) if response.status().as_u16() == 200 => {
                    metrics::record_upstream_request(method_label, Some(200), start.elapsed());
                    return Some(response);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    metrics::record_upstream_request(method_label, Some(status), start.elapsed());

                    if RETRYABLE_STATUSES.contains(&status) {
                        retries += 1;
                        tracing::warn!(
                            status,
                            retries,
                            max_retries = self.max_retries,
                            url,
                            "retryable upstream status, sleeping before retry"
                        );
                        if retries >= self.max_retries {
                            tracing::error!(url, "maximum number of retries reached, aborting");
                            return None;
                        }
                        tokio::time::sleep(self.cooldown).await;
                        continue;
                    }

                    tracing::error!(status, url, "request failed with non-retryable status");
                    return None;
                }
                Err(err) => {
                    metrics::record_upstream_request(method_label, None, start.elapsed());
                    retries += 1;
                    tracing::warn!(
                        error = %err,
                        retries,
                        max_retries = self.max_retries,
                        url,
                        "transport error, sleeping before retry"
                    );
                    if retries >= self.max_retries {
                        tracing::error!(url, "maximum number of retries reached, aborting");
                        return None;
                    }
                    tokio::time::sleep(self.cooldown).await;
                }
            }
        }
    }

    /// Fetches raw bytes, used by the asset localiser. Does not inject a JSON body.
    pub async fn get_bytes(&self, url: &str) -> Option<bytes::Bytes> {
        let response = self.request::<()>(Method::Get, url, None, None).await?;
        response.bytes().await.ok()
    }
}
