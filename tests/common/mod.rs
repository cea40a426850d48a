#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mc_scan_rs::error::ProbeError;
use mc_scan_rs::probe::ProbeClient;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

enum Reply {
    Doc(Value),
    Fail(ProbeError),
}

/// In-memory status service. Unknown hosts answer `{"online": false}`.
#[derive(Default)]
pub struct ScriptedProbe {
    status: HashMap<String, Reply>,
    query: HashMap<String, Value>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
    cancel_on_call: Option<CancellationToken>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Online host reporting `ip_address` = `host`.
    pub fn online(self, host: &str, players: u32, max: u32) -> Self {
        let doc = json!({
            "online": true,
            "ip_address": host,
            "port": 25565,
            "players": {"online": players, "max": max},
            "version": {"name_clean": "1.20.4"},
            "motd": {"clean": format!("Welcome to {host}")}
        });
        self.doc(host, doc)
    }

    pub fn offline(self, host: &str) -> Self {
        self.doc(host, json!({"online": false, "host": host}))
    }

    pub fn doc(mut self, host: &str, doc: Value) -> Self {
        self.status.insert(host.to_string(), Reply::Doc(doc));
        self
    }

    pub fn fail(mut self, host: &str, err: ProbeError) -> Self {
        self.status.insert(host.to_string(), Reply::Fail(err));
        self
    }

    pub fn query_doc(mut self, host: &str, doc: Value) -> Self {
        self.query.insert(host.to_string(), doc);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every status call waits for a permit from `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Cancel `token` from inside the first status call.
    pub fn cancel_on_call(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` status calls have been entered.
    pub async fn entered(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("status calls never entered");
    }
}

#[async_trait]
impl ProbeClient for ScriptedProbe {
    async fn status(&self, host: &str) -> Result<Value, ProbeError> {
        self.calls.lock().unwrap().push(host.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        if let Some(gate) = &self.gate {
            let _permit = gate.acquire().await.expect("gate closed");
        }
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.status.get(host) {
            Some(Reply::Doc(doc)) => Ok(doc.clone()),
            Some(Reply::Fail(e)) => Err(e.clone()),
            None => Ok(json!({"online": false})),
        }
    }

    async fn query(&self, host: &str) -> Result<Value, ProbeError> {
        self.query
            .get(host)
            .cloned()
            .ok_or_else(|| ProbeError::Status(404))
    }
}

pub fn hosts(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
