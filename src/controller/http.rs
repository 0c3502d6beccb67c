// src/controller/http.rs

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::{ProvrunError, Result};
use crate::types::Protocol;

use super::{
    HttpMethod, HttpResponse, LOGIN_PATH, REST_VERSION, ResponseFuture, RestClient,
    SESSION_COOKIE,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed controller client.
///
/// Logs in lazily on the first request and reuses the session cookie for
/// every request after that.
#[derive(Debug)]
pub struct HttpController {
    client: reqwest::Client,
    base_url: String,
    server: String,
    username: String,
    password: String,
    session: Mutex<Option<String>>,
}

impl HttpController {
    pub fn new(
        server: &str,
        protocol: Protocol,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: format!("{protocol}://{server}:{port}"),
            server: server.to_string(),
            username: username.into(),
            password: password.into(),
            session: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn session_id(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(id) = session.as_ref() {
            return Ok(id.clone());
        }

        let url = format!("{}{}", self.base_url, LOGIN_PATH);
        debug!(url = %url, username = %self.username, "logging in to controller");
        let resp = self
            .client
            .post(&url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(ProvrunError::Login {
                server: self.server.clone(),
            });
        }

        let id = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(session_from_set_cookie)
            .ok_or_else(|| ProvrunError::Login {
                server: self.server.clone(),
            })?;

        info!(server = %self.server, "controller session established");
        *session = Some(id.clone());
        Ok(id)
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        json_body: Option<String>,
    ) -> Result<HttpResponse> {
        let session = self.session_id().await?;
        let url = format!("{}{}", self.base_url, path);

        let builder = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
            HttpMethod::Put => self.client.put(&url),
            HttpMethod::Delete => self.client.delete(&url),
        };
        let mut builder = builder
            .header(COOKIE, format!("{SESSION_COOKIE}={session}"))
            .header("Rest-Version", REST_VERSION);
        if let Some(body) = json_body {
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        debug!(%method, url = %url, status, body_bytes = body.len(), "controller response");

        Ok(HttpResponse { status, body })
    }
}

impl RestClient for HttpController {
    fn request<'a>(
        &'a self,
        method: HttpMethod,
        path: &'a str,
        json_body: Option<String>,
    ) -> ResponseFuture<'a> {
        Box::pin(self.send(method, path, json_body))
    }
}

/// Pull the session id out of one `Set-Cookie` header value.
fn session_from_set_cookie(header: &str) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE}=");
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix(prefix.as_str()))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
