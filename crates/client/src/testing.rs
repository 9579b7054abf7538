//! Scripted transport for exercising the fetch pipeline without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;
use url::Url;

use crate::fetch::{HttpReply, Transport, TransportError};

/// One canned outcome for a GET.
#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Reply { status: u16, body: String, delay: Duration },
    Hang,
    Offline,
    Network(String),
}

impl Scripted {
    pub(crate) fn json(status: u16, body: &str) -> Self {
        Scripted::Reply { status, body: body.to_string(), delay: Duration::ZERO }
    }

    pub(crate) fn delayed(status: u16, body: &str, delay: Duration) -> Self {
        Scripted::Reply { status, body: body.to_string(), delay }
    }
}

/// Replays queued outcomes in order; the last one repeats once the queue
/// runs dry.
pub(crate) struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    last: Mutex<Option<Scripted>>,
    calls: Mutex<Vec<(Url, Instant)>>,
    online: AtomicBool,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            online: AtomicBool::new(true),
        }
    }

    pub(crate) fn push(&self, outcome: Scripted) {
        self.script.lock().unwrap().push_back(outcome);
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<Url> {
        self.calls.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next_outcome(&self) -> Scripted {
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone().unwrap_or(Scripted::Network("no scripted response".into()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
        self.calls.lock().unwrap().push((url.clone(), Instant::now()));

        match self.next_outcome() {
            Scripted::Reply { status, body, delay } => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(HttpReply { status, body: Bytes::from(body) })
            }
            Scripted::Hang => std::future::pending().await,
            Scripted::Offline => Err(TransportError::Offline),
            Scripted::Network(msg) => Err(TransportError::Network(msg)),
        }
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
