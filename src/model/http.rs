/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

use crate::application::config::{Config, Credentials};
use crate::application::interfaces::transport::Transport;
use crate::constants::USER_AGENT;
use crate::error::AppError;
use crate::model::auth::{LoginGrant, LoginResponse, SessionTokens};
use crate::model::requests::LoginRequest;
use crate::utils::redact::{redact_text, redact_value};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, warn};

const API_KEY_HEADER: &str = "X-CAP-API-KEY";
const CST_HEADER: &str = "CST";
const SECURITY_TOKEN_HEADER: &str = "X-SECURITY-TOKEN";

/// Longest broker error body quoted in an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Capital.com REST transport over `reqwest`
///
/// One HTTP exchange per call, no retries: the gateway decides what may be
/// repeated. Every call carries the API key header; token-bearing calls add the
/// `CST` and `X-SECURITY-TOKEN` headers.
pub struct RestTransport {
    http_client: Client,
    base_url: String,
    api_key: String,
}

impl RestTransport {
    /// Builds the transport from the configuration
    ///
    /// # Errors
    /// [`AppError::Network`] if the HTTP client cannot be built
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.rest_api.timeout))
            .build()?;
        Ok(Self {
            http_client,
            base_url: config.rest_api.base_url.trim_end_matches('/').to_string(),
            api_key: config.credentials.api_key.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginGrant, AppError> {
        let body = serde_json::to_value(LoginRequest {
            identifier: &credentials.identifier,
            password: &credentials.password,
            encrypted_password: false,
        })?;
        let url = self.url("/session");
        let headers = vec![(API_KEY_HEADER, self.api_key.as_str())];

        let response =
            match make_http_request(&self.http_client, Method::POST, &url, headers, &[], Some(&body))
                .await
            {
                Ok(response) => response,
                Err(AppError::SessionExpired) => {
                    return Err(AppError::Auth("credentials rejected (HTTP 401)".to_string()));
                }
                Err(AppError::Upstream {
                    status: Some(code),
                    message,
                }) if (400..500).contains(&code) && code != 429 => {
                    return Err(AppError::Auth(format!("HTTP {code}: {message}")));
                }
                Err(e) => return Err(e),
            };

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let security_token = header(CST_HEADER);
        let account_token = header(SECURITY_TOKEN_HEADER);

        let login: LoginResponse = response.json().await.unwrap_or_else(|e| {
            warn!("Login response body could not be decoded: {e}");
            LoginResponse::default()
        });

        match (security_token, account_token) {
            (Some(security_token), Some(account_token)) => Ok(LoginGrant {
                security_token,
                account_token,
                account_id: login.current_account_id,
            }),
            _ => {
                error!("Login succeeded but session headers are missing");
                Err(AppError::Auth(
                    "session tokens missing from login response".to_string(),
                ))
            }
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
        tokens: &SessionTokens,
    ) -> Result<Value, AppError> {
        let url = self.url(path);
        let headers = vec![
            (API_KEY_HEADER, self.api_key.as_str()),
            (CST_HEADER, tokens.security_token.as_str()),
            (SECURITY_TOKEN_HEADER, tokens.account_token.as_str()),
        ];
        let response =
            make_http_request(&self.http_client, method, &url, headers, query, body).await?;
        parse_body(response).await
    }
}

async fn parse_body(response: Response) -> Result<Value, AppError> {
    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    let value: Value = serde_json::from_str(&text)?;
    debug!("Response body: {}", redact_value(&value));
    Ok(value)
}

/// Extracts the broker error message from an error body
///
/// The broker answers `{"errorCode": "error.invalid.size"}`; other shapes fall
/// back to `message`, `error`, or the truncated raw text.
#[must_use]
pub fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for field in ["errorCode", "message", "error"] {
            if let Some(msg) = json.get(field).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let head: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    }
}

/// Sends a single HTTP request and maps failure statuses onto [`AppError`]
///
/// # Arguments
///
/// * `client` - The HTTP client to use for the request
/// * `method` - HTTP method
/// * `url` - Full URL to request
/// * `headers` - Vector of (header_name, header_value) tuples
/// * `query` - Query string pairs
/// * `body` - Optional JSON body
///
/// # Returns
///
/// * `Ok(Response)` - 2xx response
/// * `Err(AppError::SessionExpired)` - HTTP 401
/// * `Err(AppError::RateLimited)` - HTTP 429
/// * `Err(AppError::Upstream)` - any other failure status
/// * `Err(AppError::Network)` - the request never completed
pub async fn make_http_request(
    client: &Client,
    method: Method,
    url: &str,
    headers: Vec<(&str, &str)>,
    query: &[(&str, String)],
    body: Option<&Value>,
) -> Result<Response, AppError> {
    match body {
        Some(b) => debug!("{} {} {}", method, url, redact_value(b)),
        None => debug!("{} {}", method, url),
    }

    let mut request = client.request(method.clone(), url);
    for (name, value) in &headers {
        request = request.header(*name, *value);
    }
    if !query.is_empty() {
        request = request.query(query);
    }
    if let Some(b) = body {
        request = request.json(b);
    }

    let response = request.send().await?;
    let status = response.status();
    debug!("Response status: {}", status);

    if status.is_success() {
        return Ok(response);
    }

    let secrets: Vec<&str> = headers.iter().map(|(_, v)| *v).collect();
    let body_text = redact_text(&response.text().await.unwrap_or_default(), &secrets);
    match status {
        StatusCode::UNAUTHORIZED => {
            warn!("{} {} rejected with 401: {}", method, url, body_text);
            Err(AppError::SessionExpired)
        }
        StatusCode::TOO_MANY_REQUESTS => {
            warn!("{} {} rate limited by the broker", method, url);
            Err(AppError::RateLimited(extract_error_message(&body_text)))
        }
        _ => {
            error!("Request failed with status {}: {}", status, body_text);
            Err(AppError::upstream(
                status.as_u16(),
                extract_error_message(&body_text),
            ))
        }
    }
}
