//! Scripted network double for router, lifecycle and proxy tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use shellcache_core::{Error, HttpResponse, Network, Request};
use url::Url;

pub const ORIGIN: &str = "http://localhost:5000/";

pub fn origin() -> Url {
    Url::parse(ORIGIN).unwrap()
}

pub fn get(path: &str) -> Request {
    Request::get(origin().join(path).unwrap())
}

pub fn navigate(path: &str) -> Request {
    Request::navigation(origin().join(path).unwrap())
}

/// Answers by path from a fixed table. Unknown paths get a 404.
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, HttpResponse>>,
    failing: Mutex<HashSet<String>>,
    online: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            online: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with(self, path: &str, response: HttpResponse) -> Self {
        self.routes.lock().unwrap().insert(path.to_string(), response);
        self
    }

    pub fn with_body(self, path: &str, body: &'static str) -> Self {
        self.with(path, HttpResponse::new(200, body))
    }

    /// Make fetches for one path fail as if the connection dropped.
    pub fn fail(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// `METHOD path` of every fetch attempted, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<HttpResponse, Error> {
        let path = request.path().to_string();
        self.calls.lock().unwrap().push(format!("{} {}", request.method, path));

        if !self.online.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&path) {
            return Err(Error::NetworkFailed(format!("{} {}: connection refused", request.method, request.url)));
        }

        let response = self.routes.lock().unwrap().get(&path).cloned();
        Ok(response.unwrap_or_else(|| HttpResponse::new(404, "not found")))
    }
}
