// src/test_helpers.rs
// Shared fixtures for the unit tests. Compiled only under `cargo test`.

use crate::events::HarvestEvent;
use crate::paginate::Sleeper;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// A Sleeper that returns at once and remembers what it was asked to wait
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn recorded(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

// A Sleeper that returns at once and cancels the run on its Nth call
pub(crate) struct CancellingSleeper {
    cancel: CancellationToken,
    cancel_on_call: usize,
    calls: AtomicUsize,
}

impl CancellingSleeper {
    pub(crate) fn new(cancel: CancellationToken, cancel_on_call: usize) -> Self {
        Self {
            cancel,
            cancel_on_call,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Sleeper for CancellingSleeper {
    async fn sleep(&self, _duration: Duration) {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.cancel_on_call {
            self.cancel.cancel();
        }
    }
}

// Wraps a body fragment into a minimal HTML page
pub(crate) fn page_html(body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Gallery</title></head><body>{}</body></html>",
        body
    )
}

// Serves `html` at `route`
pub(crate) async fn mount_page(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(html.as_bytes().to_vec(), "text/html; charset=utf-8"),
        )
        .mount(server)
        .await;
}

// Serves a few bytes for every path under /img/
pub(crate) async fn mount_images(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/img/.+$"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"\x89PNG fake".to_vec()))
        .mount(server)
        .await;
}

// Everything currently waiting in the channel
pub(crate) fn drain(rx: &mut UnboundedReceiver<HarvestEvent>) -> Vec<HarvestEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
