use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use provrun::controller::{HttpMethod, HttpResponse, ResponseFuture, RestClient};
use provrun::errors::ProvrunError;

type Key = (HttpMethod, String);

/// A fake controller that answers each `(method, path)` from a script.
///
/// Responses for a route are served in order; the last one repeats. Unknown
/// routes fail like a dropped connection.
#[derive(Debug, Clone, Default)]
pub struct ScriptedController {
    routes: Arc<Mutex<BTreeMap<String, VecDeque<HttpResponse>>>>,
    calls: Arc<Mutex<Vec<Key>>>,
}

fn route(method: HttpMethod, path: &str) -> String {
    format!("{method} {path}")
}

impl ScriptedController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, method: HttpMethod, path: &str, status: u16, body: &str) -> Self {
        self.routes
            .lock()
            .unwrap()
            .entry(route(method, path))
            .or_default()
            .push_back(HttpResponse::new(status, body));
        self
    }

    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on(HttpMethod::Get, path, status, body)
    }

    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on(HttpMethod::Post, path, status, body)
    }

    pub fn calls(&self) -> Vec<Key> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p)| *m == method && p == path)
            .count()
    }

    fn answer(&self, method: HttpMethod, path: &str) -> Option<HttpResponse> {
        self.calls.lock().unwrap().push((method, path.to_string()));
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(&route(method, path))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl RestClient for ScriptedController {
    fn request<'a>(
        &'a self,
        method: HttpMethod,
        path: &'a str,
        _json_body: Option<String>,
    ) -> ResponseFuture<'a> {
        let answer = self.answer(method, path);
        Box::pin(async move {
            answer.ok_or_else(|| ProvrunError::Http(format!("no scripted response for {method} {path}")))
        })
    }
}
