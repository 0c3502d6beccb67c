// src/controller/mod.rs

//! REST access to the management controller.
//!
//! Operations talk to the controller through the [`RestClient`] trait so the
//! job poller and the capabilities can be tested against a scripted fake.
//! [`http::HttpController`] is the reqwest-backed implementation with
//! transparent session login.

pub mod http;

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

pub use http::HttpController;

pub const LOGIN_PATH: &str = "/neo/login";
pub const PROVISIONING_PATH: &str = "/neo/actions/provisioning";
pub const TEMPLATES_PATH: &str = "/neo/app/provisioning_templates";
pub const JOBS_PATH: &str = "/neo/app/jobs";
pub const SYSTEMS_PATH: &str = "/neo/resources/systems";

/// Sent on every request after login.
pub const REST_VERSION: &str = "1.0.2";
pub const SESSION_COOKIE: &str = "session";

pub fn job_path(job_id: u64) -> String {
    format!("{JOBS_PATH}/{job_id}")
}

pub fn sub_jobs_path(job_id: u64) -> String {
    format!("{JOBS_PATH}?parent_id={job_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

/// Status and body of one controller response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

pub type ResponseFuture<'a> = Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + 'a>>;

/// Minimal REST surface the operations need.
///
/// `path` is absolute on the controller (starts with `/neo`). JSON bodies are
/// passed pre-serialized. `Err` means no response was obtained at all; any
/// HTTP status, including 4xx/5xx, is an `Ok` response.
pub trait RestClient: Send + Sync {
    fn request<'a>(
        &'a self,
        method: HttpMethod,
        path: &'a str,
        json_body: Option<String>,
    ) -> ResponseFuture<'a>;

    fn get<'a>(&'a self, path: &'a str) -> ResponseFuture<'a> {
        self.request(HttpMethod::Get, path, None)
    }

    fn post<'a>(&'a self, path: &'a str, json_body: String) -> ResponseFuture<'a> {
        self.request(HttpMethod::Post, path, Some(json_body))
    }
}
