/// HTTP gateway client
///
/// Speaks the hosted backend's REST dialect:
///
/// ```text
/// {base}/auth/v1/token?grant_type=password   sign in
/// {base}/auth/v1/signup                      sign up
/// {base}/auth/v1/user                        resolve token
/// {base}/auth/v1/logout                      sign out
/// {base}/auth/v1/recover                     password reset email
/// {base}/auth/v1/authorize                   social sign-in redirect
/// {base}/rest/v1/{table}                     table CRUD
/// ```
///
/// Every request carries the project key in the `apikey` header and a bearer
/// token (the caller's access token, or the project key for anonymous calls).

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

use super::{
    AuthGateway, GatewayError, GatewayResult, Query, SignUpRequest, SignUpResponse, TableGateway,
};
use crate::models::session::{AuthUser, Session};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    expires_in: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .or_else(|| {
                self.expires_in
                    .map(|secs| Utc::now() + ChronoDuration::seconds(secs))
            });

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Gateway client over HTTP
#[derive(Clone)]
pub struct RestGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestGateway {
    /// Creates a client for the given project URL and key
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not parse or the HTTP client cannot
    /// be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> GatewayResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| GatewayError::Transport(format!("Invalid gateway URL {}: {}", base_url, e)))?;

        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, url: &str, access_token: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(access_token.unwrap_or(&self.api_key))
    }

    async fn auth_json(response: Response) -> GatewayResult<JsonValue> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::from_auth_response(status.as_u16(), &body));
        }
        parse_body(&body)
    }

    async fn rest_json(response: Response) -> GatewayResult<JsonValue> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::from_rest_response(status.as_u16(), &body));
        }
        parse_body(&body)
    }
}

fn parse_body(body: &str) -> GatewayResult<JsonValue> {
    if body.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    Ok(serde_json::from_str(body)?)
}

fn into_rows(value: JsonValue) -> Vec<JsonValue> {
    match value {
        JsonValue::Array(rows) => rows,
        JsonValue::Null => Vec::new(),
        other => vec![other],
    }
}

/// Decodes a sign-up response
///
/// With a session issued the body is a token response; when confirmation is
/// required it is the bare user (older servers) or `{ "user": ... }`.
fn decode_sign_up(body: JsonValue) -> GatewayResult<SignUpResponse> {
    if body.get("access_token").is_some() {
        let token: TokenResponse = serde_json::from_value(body)?;
        let session = token.into_session();
        return Ok(SignUpResponse {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }

    let user_value = match body.get("user") {
        Some(user) => user.clone(),
        None => body,
    };
    let user = if user_value.get("id").is_some() {
        Some(serde_json::from_value(user_value)?)
    } else {
        None
    };

    Ok(SignUpResponse { user, session: None })
}

#[async_trait]
impl AuthGateway for RestGateway {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> GatewayResult<Session> {
        let response = self
            .request(Method::POST, &self.auth_url("token?grant_type=password"), None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let body = Self::auth_json(response).await?;
        let token: TokenResponse = serde_json::from_value(body)?;
        Ok(token.into_session())
    }

    async fn sign_up(&self, request: &SignUpRequest) -> GatewayResult<SignUpResponse> {
        let response = self
            .request(Method::POST, &self.auth_url("signup"), None)
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": request.metadata,
            }))
            .send()
            .await?;

        decode_sign_up(Self::auth_json(response).await?)
    }

    async fn get_user(&self, access_token: &str) -> GatewayResult<Option<AuthUser>> {
        let response = self
            .request(Method::GET, &self.auth_url("user"), Some(access_token))
            .send()
            .await?;

        if matches!(response.status(), StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(None);
        }

        let body = Self::auth_json(response).await?;
        Ok(Some(serde_json::from_value(body)?))
    }

    async fn sign_out(&self, access_token: &str) -> GatewayResult<()> {
        let response = self
            .request(Method::POST, &self.auth_url("logout"), Some(access_token))
            .send()
            .await?;

        // An already-revoked token is as good as a successful sign-out
        if response.status() == StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        Self::auth_json(response).await.map(|_| ())
    }

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str) -> GatewayResult<()> {
        let url = Url::parse_with_params(&self.auth_url("recover"), &[("redirect_to", redirect_to)])
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let response = self
            .request(Method::POST, url.as_str(), None)
            .json(&json!({ "email": email }))
            .send()
            .await?;

        Self::auth_json(response).await.map(|_| ())
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> String {
        let base = self.auth_url("authorize");
        match Url::parse_with_params(&base, &[("provider", provider), ("redirect_to", redirect_to)]) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}?provider={}", base, provider),
        }
    }

    async fn health(&self) -> GatewayResult<()> {
        let response = self
            .request(Method::GET, &self.auth_url("health"), None)
            .send()
            .await?;
        Self::auth_json(response).await.map(|_| ())
    }
}

#[async_trait]
impl TableGateway for RestGateway {
    async fn select(
        &self,
        access_token: Option<&str>,
        table: &str,
        query: &Query,
    ) -> GatewayResult<Vec<JsonValue>> {
        let response = self
            .request(Method::GET, &self.rest_url(table), access_token)
            .query(&query.to_params())
            .send()
            .await?;

        Ok(into_rows(Self::rest_json(response).await?))
    }

    async fn select_single(
        &self,
        access_token: Option<&str>,
        table: &str,
        query: &Query,
    ) -> GatewayResult<JsonValue> {
        let response = self
            .request(Method::GET, &self.rest_url(table), access_token)
            .header(header::ACCEPT, SINGLE_OBJECT)
            .query(&query.to_params())
            .send()
            .await?;

        match Self::rest_json(response).await? {
            JsonValue::Null => Err(GatewayError::NotFound),
            row => Ok(row),
        }
    }

    async fn insert(
        &self,
        access_token: Option<&str>,
        table: &str,
        rows: Vec<JsonValue>,
    ) -> GatewayResult<Vec<JsonValue>> {
        let response = self
            .request(Method::POST, &self.rest_url(table), access_token)
            .header("Prefer", "return=representation")
            .json(&rows)
            .send()
            .await?;

        Ok(into_rows(Self::rest_json(response).await?))
    }

    async fn update(
        &self,
        access_token: Option<&str>,
        table: &str,
        fields: JsonValue,
        query: &Query,
    ) -> GatewayResult<Vec<JsonValue>> {
        let response = self
            .request(Method::PATCH, &self.rest_url(table), access_token)
            .header("Prefer", "return=representation")
            .query(&query.filter_params())
            .json(&fields)
            .send()
            .await?;

        Ok(into_rows(Self::rest_json(response).await?))
    }

    async fn delete(&self, access_token: Option<&str>, table: &str, query: &Query) -> GatewayResult<()> {
        let response = self
            .request(Method::DELETE, &self.rest_url(table), access_token)
            .query(&query.filter_params())
            .send()
            .await?;

        Self::rest_json(response).await.map(|_| ())
    }
}
