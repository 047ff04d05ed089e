// src/paginate/driver.rs
// =============================================================================
// This module walks a paginated listing page by page.
//
// How it works (one loop iteration per page):
// 1. Stop if the caller cancelled
// 2. Fetch the current page - a failed fetch ends the whole run
// 3. Pause a moment, as a reader would
// 4. Parse the page and pull out its image URLs
// 5. Download every image (failures are counted, never fatal), pausing after
//    every burst of images
// 6. If this was the last requested page: done. The next link is not even
//    looked up.
// 7. Otherwise find the next-page link: none means done, otherwise pause and
//    loop with the new URL
//
// Everything is sequential by default: one page is completely finished
// before the next link is looked at. Images of a page can optionally be
// downloaded a few at a time, but their outcomes are still consumed in page
// order, so events and burst pauses follow the logical image count.
//
// Rust concepts:
// - State machine: PaginationState + a loop that stops on Some(reason)
// - Streams: futures::StreamExt::buffered keeps results in input order
// - tokio::select!: lets a cancellation cut a pause short
// =============================================================================

use super::pacing::{Pacer, PausePoint, Sleeper, TokioSleeper};
use super::state::{PaginationState, TerminationReason};
use crate::config::HarvestConfig;
use crate::download::{Downloader, ImageJob};
use crate::error::RunError;
use crate::events::{EventSink, HarvestEvent};
use crate::extract::{NextLinkResolver, PageResult};
use crate::fetch::HttpFetcher;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

// The per-run parameters a front end supplies
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Where to start; "https://" is assumed when no scheme is given
    pub start_url: String,
    /// How many pages to walk, including the first one (at least 1)
    pub total_pages: usize,
    /// Where images are written (created on first use)
    pub output_dir: PathBuf,
}

impl RunRequest {
    pub fn new(
        start_url: impl Into<String>,
        total_pages: usize,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            start_url: start_url.into(),
            total_pages,
            output_dir: output_dir.into(),
        }
    }
}

// The final result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total_downloaded: usize,
    pub pages_processed: usize,
    pub output_dir: PathBuf,
    pub termination: TerminationReason,
}

// Counters for one page's images
#[derive(Debug, Default)]
struct PageTally {
    attempted: usize,
    succeeded: usize,
    cancelled: bool,
}

// The pagination driver
//
// Build it once from a HarvestConfig and call run() for each listing.
// Tests swap in their own Sleeper (no real waiting) and keyword list.
pub struct Harvester {
    config: HarvestConfig,
    fetcher: HttpFetcher,
    resolver: NextLinkResolver,
    pacer: Pacer,
}

impl Harvester {
    pub fn new(config: HarvestConfig) -> Result<Self, RunError> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config)?;
        let resolver = NextLinkResolver::new(config.keywords.iter().cloned());
        let pacer = Pacer::new(&config, Arc::new(TokioSleeper));

        Ok(Self {
            config,
            fetcher,
            resolver,
            pacer,
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.pacer = Pacer::new(&self.config, sleeper);
        self
    }

    pub fn with_resolver(mut self, resolver: NextLinkResolver) -> Self {
        self.resolver = resolver;
        self
    }

    // Runs one harvest from start to finish
    //
    // Parameters:
    //   request: start URL, page budget and output directory
    //   cancel: checked before every page and between images
    //   events: receives a HarvestEvent for everything that happens
    //
    // Returns: a summary for every run that got started. An Err means the
    // request itself was unusable and nothing was fetched.
    pub async fn run(
        &self,
        request: RunRequest,
        cancel: &CancellationToken,
        events: EventSink,
    ) -> Result<RunSummary, RunError> {
        if request.total_pages == 0 {
            return Err(RunError::ZeroPages);
        }
        let start_url = normalize_start_url(&request.start_url)?;

        log::info!(
            "Harvesting {} page(s) starting at {} into {}",
            request.total_pages,
            start_url,
            request.output_dir.display()
        );
        events.emit(HarvestEvent::RunStarted {
            start_url: start_url.to_string(),
            total_pages: request.total_pages,
            output_dir: request.output_dir.clone(),
        });

        let downloader = Downloader::new(
            self.fetcher.clone(),
            request.output_dir.clone(),
            events.clone(),
        );
        let mut state = PaginationState::new(start_url, request.total_pages);

        let reason = loop {
            if let Some(reason) = self.step(&mut state, &downloader, cancel, &events).await {
                break reason;
            }
        };

        state.terminate(reason.clone());
        log::info!("Run finished ({:?}): {}", state.phase(), reason);
        events.emit(HarvestEvent::Terminated {
            reason: reason.clone(),
            pages_processed: state.pages_processed(),
            total_downloaded: state.success_count(),
        });

        Ok(RunSummary {
            total_downloaded: state.success_count(),
            pages_processed: state.pages_processed(),
            output_dir: request.output_dir,
            termination: reason,
        })
    }

    // Processes the current page
    //
    // Returns Some(reason) when the run has to stop, None after advancing
    // to the next page.
    async fn step(
        &self,
        state: &mut PaginationState,
        downloader: &Downloader,
        cancel: &CancellationToken,
        events: &EventSink,
    ) -> Option<TerminationReason> {
        let page_index = state.page_index();
        if cancel.is_cancelled() {
            return Some(TerminationReason::Cancelled { page_index });
        }

        events.emit(HarvestEvent::PageStarted {
            page_index,
            total_pages: state.total_pages(),
            url: state.current_url().to_string(),
        });

        let fetched = match self.fetcher.fetch_page(state.current_url()).await {
            Ok(page) => page,
            Err(e) => {
                log::warn!("Page {} could not be fetched: {}", page_index, e);
                return Some(TerminationReason::FetchFailed {
                    page_index,
                    reason: e.to_string(),
                });
            }
        };
        if fetched.final_url != fetched.url {
            log::debug!("Page {} redirected to {}", page_index, fetched.final_url);
        }
        let status = fetched.status;

        self.rest(PausePoint::Dwell, cancel, events).await;

        let page = PageResult::from_fetched(fetched);
        let image_count = page.image_urls.len();
        events.emit(HarvestEvent::PageFetched {
            page_index,
            status,
            image_count,
        });
        if image_count == 0 {
            events.emit(HarvestEvent::NoImages { page_index });
        }

        let tally = self
            .download_images(
                &page.image_urls,
                &page.source_url,
                page_index,
                downloader,
                cancel,
                events,
            )
            .await;

        state.record_page(tally.succeeded);
        events.emit(HarvestEvent::PageCompleted {
            page_index,
            succeeded: tally.succeeded,
            attempted: tally.attempted,
            image_count,
        });

        if tally.cancelled {
            return Some(TerminationReason::Cancelled { page_index });
        }
        if state.is_last_page() {
            return Some(TerminationReason::PageLimit);
        }

        events.emit(HarvestEvent::SearchingNextLink { page_index });
        let next = self.resolver.resolve(&page.document, &page.source_url);
        drop(page);

        let Some(next) = next else {
            return Some(TerminationReason::NoNextLink);
        };

        events.emit(HarvestEvent::NextLinkFound {
            page_index,
            url: next.url.to_string(),
            keyword: next.keyword.clone(),
            kind: next.kind,
            field: next.field,
        });

        self.rest(PausePoint::Navigation, cancel, events).await;
        if cancel.is_cancelled() {
            return Some(TerminationReason::Cancelled { page_index });
        }

        state.advance(next.url);
        None
    }

    // Downloads every image of one page, in order
    async fn download_images(
        &self,
        image_urls: &[String],
        page_url: &Url,
        page_index: usize,
        downloader: &Downloader,
        cancel: &CancellationToken,
        events: &EventSink,
    ) -> PageTally {
        let mut tally = PageTally::default();
        let image_count = image_urls.len();
        if image_count == 0 {
            return tally;
        }
        if cancel.is_cancelled() {
            tally.cancelled = true;
            return tally;
        }

        let jobs = image_urls
            .iter()
            .enumerate()
            .map(|(i, url)| ImageJob {
                url: url.clone(),
                page_url: page_url.clone(),
                page_index,
                seq_index: i + 1,
            });

        // buffered() yields results in job order even when several
        // downloads are in flight, and only starts new ones when polled
        let mut outcomes = stream::iter(jobs)
            .map(|job| async move {
                let outcome = downloader.download(&job).await;
                (job.seq_index, outcome)
            })
            .buffered(self.config.download_concurrency);

        while let Some((seq_index, outcome)) = outcomes.next().await {
            tally.attempted += 1;
            let success = outcome.success;

            if success {
                tally.succeeded += 1;
                events.emit(HarvestEvent::ImageSaved {
                    page_index,
                    seq_index,
                    image_count,
                    url: outcome.url,
                    path: outcome.local_path,
                });
            } else {
                let reason = outcome.error_reason.unwrap_or_default();
                log::warn!("Download failed [{}]: {}", outcome.url, reason);
                events.emit(HarvestEvent::ImageFailed {
                    page_index,
                    seq_index,
                    url: outcome.url,
                    reason,
                });
            }

            // Only a successful download closes a burst
            if success && self.pacer.is_burst_boundary(seq_index) {
                self.rest(PausePoint::Burst, cancel, events).await;
            }

            if cancel.is_cancelled() {
                tally.cancelled = true;
                break;
            }
        }

        tally
    }

    // Waits a random time for `point`, unless the run gets cancelled first
    async fn rest(&self, point: PausePoint, cancel: &CancellationToken, events: &EventSink) {
        let duration = self.pacer.sample(point);
        if duration.is_zero() {
            return;
        }

        events.emit(HarvestEvent::Resting {
            point,
            seconds: duration.as_secs_f64(),
        });

        tokio::select! {
            _ = self.pacer.wait(duration) => {}
            _ = cancel.cancelled() => {
                log::debug!("Pause {} cut short by cancellation", point);
            }
        }
    }
}

// Turns user input into the absolute URL of the first page
//
// "example.com/gallery" -> "https://example.com/gallery"
pub fn normalize_start_url(input: &str) -> Result<Url, RunError> {
    let trimmed = input.trim();
    let lowered = trimmed.to_ascii_lowercase();

    let candidate = if lowered.starts_with("http://") || lowered.starts_with("https://") {
        trimmed.to_string()
    } else if let Some((scheme, _)) = trimmed
        .split_once("://")
        .filter(|(scheme, _)| scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+'))
    {
        return Err(RunError::UnsupportedScheme(scheme.to_string()));
    } else {
        format!("https://{}", trimmed)
    };

    Url::parse(&candidate).map_err(|source| RunError::InvalidUrl {
        input: input.to_string(),
        source,
    })
}

// Runs a harvest with the default configuration
//
// This is the whole contract a front end needs: give it the three run
// parameters, a cancellation token and a channel for events; get back the
// total number of images and why the run stopped.
pub async fn harvest(
    start_url: &str,
    total_pages: usize,
    output_dir: impl Into<PathBuf>,
    cancel: &CancellationToken,
    events: tokio::sync::mpsc::UnboundedSender<HarvestEvent>,
) -> Result<RunSummary, RunError> {
    let harvester = Harvester::new(HarvestConfig::default())?;
    harvester
        .run(
            RunRequest::new(start_url, total_pages, output_dir),
            cancel,
            EventSink::new(events),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        drain, mount_images, mount_page, page_html, CancellingSleeper, RecordingSleeper,
    };
    use tokio::sync::mpsc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixture {
        harvester: Harvester,
        sleeper: Arc<RecordingSleeper>,
        temp_dir: tempfile::TempDir,
    }

    fn fixture(config: HarvestConfig) -> Fixture {
        let sleeper = Arc::new(RecordingSleeper::default());
        let harvester = Harvester::new(config)
            .unwrap()
            .with_sleeper(sleeper.clone());
        Fixture {
            harvester,
            sleeper,
            temp_dir: tempfile::tempdir().unwrap(),
        }
    }

    async fn run(
        fixture: &Fixture,
        start_url: String,
        total_pages: usize,
    ) -> (RunSummary, Vec<HarvestEvent>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = RunRequest::new(start_url, total_pages, fixture.temp_dir.path());
        let summary = fixture
            .harvester
            .run(request, &CancellationToken::new(), EventSink::new(tx))
            .await
            .unwrap();
        (summary, drain(&mut rx))
    }

    // Runs with a sleeper that cancels the token during its `pause`-th pause
    async fn run_cancelled_at_pause(
        start_url: String,
        total_pages: usize,
        pause: usize,
    ) -> (RunSummary, Vec<HarvestEvent>, tempfile::TempDir) {
        let cancel = CancellationToken::new();
        let harvester = Harvester::new(HarvestConfig::default())
            .unwrap()
            .with_sleeper(Arc::new(CancellingSleeper::new(cancel.clone(), pause)));
        let temp_dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let summary = harvester
            .run(
                RunRequest::new(start_url, total_pages, temp_dir.path()),
                &cancel,
                EventSink::new(tx),
            )
            .await
            .unwrap();
        (summary, drain(&mut rx), temp_dir)
    }

    fn count<F: Fn(&HarvestEvent) -> bool>(events: &[HarvestEvent], f: F) -> usize {
        events.iter().filter(|e| f(e)).count()
    }

    #[tokio::test]
    async fn test_walks_exactly_the_requested_pages() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        mount_page(
            &server,
            "/p1",
            &page_html(r#"<img src="/img/a.png"><img src="img/b.png"><a class="next" href="/p2">2</a>"#),
        )
        .await;
        mount_page(
            &server,
            "/p2",
            &page_html(r#"<img src="/img/c.png"><a href="/p3">下一页</a>"#),
        )
        .await;
        mount_page(
            &server,
            "/p3",
            &page_html(r#"<img src="/img/cover"><a href="/p4">»</a>"#),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/p4"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let fixture = fixture(HarvestConfig::default());
        let (summary, events) = run(&fixture, format!("{}/p1", server.uri()), 3).await;

        assert_eq!(summary.termination, TerminationReason::PageLimit);
        assert_eq!(summary.total_downloaded, 4);
        assert_eq!(summary.pages_processed, 3);

        let dir = fixture.temp_dir.path();
        for name in ["page1_a.png", "page1_b.png", "page2_c.png", "page3_image_1.jpg"] {
            assert!(dir.join(name).exists(), "missing {}", name);
        }

        let started: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                HarvestEvent::PageStarted { page_index, .. } => Some(*page_index),
                _ => None,
            })
            .collect();
        assert_eq!(started, vec![1, 2, 3]);

        // The next link of the last page is never looked up
        assert_eq!(
            count(&events, |e| matches!(e, HarvestEvent::SearchingNextLink { .. })),
            2
        );
        assert!(!events
            .iter()
            .any(|e| matches!(e, HarvestEvent::SearchingNextLink { page_index: 3 })));

        // dwell, navigation, dwell, navigation, dwell
        let config = HarvestConfig::default();
        let slept = fixture.sleeper.recorded();
        assert_eq!(slept.len(), 5);
        for i in [0, 2, 4] {
            assert!(config.dwell_delay.contains(slept[i]));
        }
        for i in [1, 3] {
            assert!(config.navigation_delay.contains(slept[i]));
        }
    }

    #[tokio::test]
    async fn test_stops_when_no_next_link() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        mount_page(
            &server,
            "/only",
            &page_html(r#"<img src="/img/1.jpg"><img src="/img/2.jpg"><a href="/">Home</a>"#),
        )
        .await;

        let fixture = fixture(HarvestConfig::default());
        let (summary, events) = run(&fixture, format!("{}/only", server.uri()), 5).await;

        assert_eq!(summary.termination, TerminationReason::NoNextLink);
        assert_eq!(summary.total_downloaded, 2);
        assert_eq!(summary.pages_processed, 1);

        // Images are finished before the next link is looked for
        let saved_last = events
            .iter()
            .rposition(|e| matches!(e, HarvestEvent::ImageSaved { .. }))
            .unwrap();
        let search = events
            .iter()
            .position(|e| matches!(e, HarvestEvent::SearchingNextLink { .. }))
            .unwrap();
        assert!(saved_last < search);
        assert!(matches!(events.last(), Some(HarvestEvent::Terminated { .. })));
    }

    #[tokio::test]
    async fn test_fetch_failure_ends_the_run() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        mount_page(
            &server,
            "/p1",
            &page_html(r#"<img src="/img/a.png"><a href="/p2">Next</a>"#),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/p2"))
            .respond_with(ResponseTemplate::new(500).set_body_string(r#"<img src="/img/never.png">"#))
            .expect(1)
            .mount(&server)
            .await;

        let fixture = fixture(HarvestConfig::default());
        let (summary, events) = run(&fixture, format!("{}/p1", server.uri()), 3).await;

        match &summary.termination {
            TerminationReason::FetchFailed { page_index, reason } => {
                assert_eq!(*page_index, 2);
                assert!(reason.contains("500"), "{}", reason);
            }
            other => panic!("expected fetch failure, got {:?}", other),
        }
        assert_eq!(summary.total_downloaded, 1);
        assert_eq!(summary.pages_processed, 1);
        assert_eq!(summary.termination.exit_code(), 3);

        assert!(!events
            .iter()
            .any(|e| matches!(e, HarvestEvent::PageFetched { page_index: 2, .. })));
        assert!(!fixture.temp_dir.path().join("page2_never.png").exists());
    }

    #[tokio::test]
    async fn test_failed_image_does_not_stop_the_page() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        mount_page(
            &server,
            "/p1",
            &page_html(r#"<img src="/img/ok1.png"><img src="/missing.png"><img src="/img/ok2.png">"#),
        )
        .await;

        let fixture = fixture(HarvestConfig::default());
        let (summary, events) = run(&fixture, format!("{}/p1", server.uri()), 1).await;

        assert_eq!(summary.termination, TerminationReason::PageLimit);
        assert_eq!(summary.total_downloaded, 2);

        let failures: Vec<&HarvestEvent> = events
            .iter()
            .filter(|e| matches!(e, HarvestEvent::ImageFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 1);
        match failures[0] {
            HarvestEvent::ImageFailed { seq_index, url, .. } => {
                assert_eq!(*seq_index, 2);
                assert!(url.ends_with("/missing.png"));
            }
            _ => unreachable!(),
        }
        assert!(events.iter().any(|e| matches!(
            e,
            HarvestEvent::PageCompleted {
                succeeded: 2,
                attempted: 3,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_burst_pause_after_every_fifth_image() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        let images: String = (1..=11)
            .map(|i| format!(r#"<img src="/img/{}.jpg">"#, i))
            .collect();
        mount_page(&server, "/p1", &page_html(&images)).await;

        let fixture = fixture(HarvestConfig::default());
        let (summary, _) = run(&fixture, format!("{}/p1", server.uri()), 1).await;
        assert_eq!(summary.total_downloaded, 11);

        // dwell, then a burst pause after image 5 and after image 10
        let config = HarvestConfig::default();
        let slept = fixture.sleeper.recorded();
        assert_eq!(slept.len(), 3);
        assert!(config.dwell_delay.contains(slept[0]));
        assert!(config.burst_delay.contains(slept[1]));
        assert!(config.burst_delay.contains(slept[2]));
    }

    #[tokio::test]
    async fn test_no_burst_pause_when_fifth_image_fails() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        let html = page_html(
            r#"<img src="/img/1.jpg"><img src="/img/2.jpg"><img src="/img/3.jpg">
               <img src="/img/4.jpg"><img src="/gone/5.jpg">"#,
        );
        mount_page(&server, "/p1", &html).await;

        let fixture = fixture(HarvestConfig::default());
        let (summary, _) = run(&fixture, format!("{}/p1", server.uri()), 1).await;

        assert_eq!(summary.total_downloaded, 4);
        assert_eq!(fixture.sleeper.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_parallel_downloads_keep_logical_order() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        let images: String = (1..=6)
            .map(|i| format!(r#"<img src="/img/{}.jpg">"#, i))
            .collect();
        mount_page(&server, "/p1", &page_html(&images)).await;

        let config = HarvestConfig {
            download_concurrency: 3,
            ..HarvestConfig::default()
        };
        let fixture = fixture(config);
        let (summary, events) = run(&fixture, format!("{}/p1", server.uri()), 1).await;

        assert_eq!(summary.total_downloaded, 6);
        let order: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                HarvestEvent::ImageSaved { seq_index, .. } => Some(*seq_index),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);
        // dwell + one burst pause after image 5
        assert_eq!(fixture.sleeper.recorded().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_keywords_drive_pagination() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        mount_page(
            &server,
            "/p1",
            &page_html(r#"<a href="/wrong">Next</a><a href="/p2">Weiter</a>"#),
        )
        .await;
        mount_page(&server, "/p2", &page_html(r#"<img src="/img/z.gif">"#)).await;
        Mock::given(method("GET"))
            .and(path("/wrong"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut fixture = fixture(HarvestConfig::default());
        fixture.harvester = fixture
            .harvester
            .with_resolver(NextLinkResolver::new(["Weiter"]));
        let (summary, events) = run(&fixture, format!("{}/p1", server.uri()), 2).await;

        assert_eq!(summary.termination, TerminationReason::PageLimit);
        assert_eq!(summary.total_downloaded, 1);
        assert!(events.iter().any(|e| matches!(
            e,
            HarvestEvent::NextLinkFound { keyword, .. } if keyword == "Weiter"
        )));
        assert!(events.iter().any(|e| matches!(e, HarvestEvent::NoImages { page_index: 1 })));
    }

    #[tokio::test]
    async fn test_cancelled_before_the_first_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let fixture = fixture(HarvestConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = fixture
            .harvester
            .run(
                RunRequest::new(format!("{}/p1", server.uri()), 3, fixture.temp_dir.path()),
                &cancel,
                EventSink::default(),
            )
            .await
            .unwrap();

        assert_eq!(summary.termination, TerminationReason::Cancelled { page_index: 1 });
        assert_eq!(summary.total_downloaded, 0);
        assert_eq!(summary.pages_processed, 0);
    }

    #[tokio::test]
    async fn test_cancel_between_images_stops_the_page() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        let images: String = (1..=11)
            .map(|i| format!(r#"<img src="/img/{}.jpg">"#, i))
            .collect();
        mount_page(
            &server,
            "/p1",
            &page_html(&format!(r#"{}<a href="/p2">Next</a>"#, images)),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/p2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        // Pause 1 is the dwell, pause 2 the burst after image 5
        let (summary, events, _dir) =
            run_cancelled_at_pause(format!("{}/p1", server.uri()), 2, 2).await;

        assert_eq!(summary.termination, TerminationReason::Cancelled { page_index: 1 });
        assert_eq!(summary.total_downloaded, 5);
        assert_eq!(summary.pages_processed, 1);
        assert_eq!(
            count(&events, |e| matches!(e, HarvestEvent::ImageSaved { .. })),
            5
        );
        assert!(events.iter().any(|e| matches!(
            e,
            HarvestEvent::PageCompleted {
                attempted: 5,
                image_count: 11,
                ..
            }
        )));
        assert!(!events
            .iter()
            .any(|e| matches!(e, HarvestEvent::SearchingNextLink { .. })));
    }

    #[tokio::test]
    async fn test_cancel_during_navigation_pause_skips_next_page() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        mount_page(
            &server,
            "/p1",
            &page_html(r#"<img src="/img/a.png"><a href="/p2">Next</a>"#),
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/p2"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        // Pause 1 is the dwell, pause 2 the navigation pause
        let (summary, events, _dir) =
            run_cancelled_at_pause(format!("{}/p1", server.uri()), 3, 2).await;

        assert_eq!(summary.termination, TerminationReason::Cancelled { page_index: 1 });
        assert_eq!(summary.total_downloaded, 1);
        assert_eq!(summary.pages_processed, 1);
        assert!(events
            .iter()
            .any(|e| matches!(e, HarvestEvent::NextLinkFound { page_index: 1, .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, HarvestEvent::PageStarted { page_index: 2, .. })));
    }

    #[tokio::test]
    async fn test_cancel_on_last_page() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        mount_page(&server, "/empty", &page_html("<p>nothing here</p>")).await;
        mount_page(
            &server,
            "/full",
            &page_html(r#"<img src="/img/a.png"><img src="/img/b.png">"#),
        )
        .await;

        // A page without images has nothing left to cancel: it still
        // finishes the run normally
        let (summary, _, _dir) =
            run_cancelled_at_pause(format!("{}/empty", server.uri()), 1, 1).await;
        assert_eq!(summary.termination, TerminationReason::PageLimit);
        assert_eq!(summary.pages_processed, 1);

        // With images waiting, cancelling during the dwell pause skips them all
        let (summary, events, dir) =
            run_cancelled_at_pause(format!("{}/full", server.uri()), 1, 1).await;
        assert_eq!(summary.termination, TerminationReason::Cancelled { page_index: 1 });
        assert_eq!(summary.total_downloaded, 0);
        assert!(!events
            .iter()
            .any(|e| matches!(e, HarvestEvent::ImageSaved { .. } | HarvestEvent::ImageFailed { .. })));
        assert!(!dir.path().join("page1_a.png").exists());
    }

    #[tokio::test]
    async fn test_gbk_page_with_meta_charset_paginates() {
        let server = MockServer::start().await;
        mount_images(&server).await;

        // <a href="/p2">下一页</a> with the link text in GBK
        let mut body = br#"<html><head><meta charset="gbk"></head><body><img src="/img/a.png"><a href="/p2">"#.to_vec();
        body.extend_from_slice(&[0xCF, 0xC2, 0xD2, 0xBB, 0xD2, 0xB3]);
        body.extend_from_slice(b"</a></body></html>");
        Mock::given(method("GET"))
            .and(path("/p1"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(&server)
            .await;
        mount_page(&server, "/p2", &page_html(r#"<img src="/img/b.png">"#)).await;

        let fixture = fixture(HarvestConfig::default());
        let (summary, events) = run(&fixture, format!("{}/p1", server.uri()), 2).await;

        assert_eq!(summary.termination, TerminationReason::PageLimit);
        assert_eq!(summary.total_downloaded, 2);
        assert!(events.iter().any(|e| matches!(
            e,
            HarvestEvent::NextLinkFound { keyword, .. } if keyword == "下一页"
        )));
    }

    #[tokio::test]
    async fn test_harvest_returns_total_and_reason() {
        let server = MockServer::start().await;
        mount_images(&server).await;
        mount_page(
            &server,
            "/p1",
            &page_html(r#"<img src="/img/a.png"><img src="/img/b.png"><a href="/">Home</a>"#),
        )
        .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let summary = harvest(
            &format!("{}/p1", server.uri()),
            2,
            temp_dir.path(),
            &CancellationToken::new(),
            tx,
        )
        .await
        .unwrap();

        assert_eq!(
            (summary.total_downloaded, summary.termination),
            (2, TerminationReason::NoNextLink)
        );
        assert!(temp_dir.path().join("page1_a.png").exists());

        let events = drain(&mut rx);
        assert!(matches!(events.first(), Some(HarvestEvent::RunStarted { .. })));
        assert!(matches!(events.last(), Some(HarvestEvent::Terminated { .. })));

        let (tx, _rx) = mpsc::unbounded_channel();
        let zero = harvest("site.test", 0, temp_dir.path(), &CancellationToken::new(), tx).await;
        assert!(matches!(zero, Err(RunError::ZeroPages)));
    }

    #[tokio::test]
    async fn test_rejects_unusable_requests() {
        let fixture = fixture(HarvestConfig::default());
        let cancel = CancellationToken::new();

        let zero = fixture
            .harvester
            .run(
                RunRequest::new("https://site.test/", 0, fixture.temp_dir.path()),
                &cancel,
                EventSink::default(),
            )
            .await;
        assert!(matches!(zero, Err(RunError::ZeroPages)));

        let bad = fixture
            .harvester
            .run(
                RunRequest::new("   ", 1, fixture.temp_dir.path()),
                &cancel,
                EventSink::default(),
            )
            .await;
        assert!(matches!(bad, Err(RunError::InvalidUrl { .. })));
    }

    #[test]
    fn test_normalize_start_url() {
        assert_eq!(
            normalize_start_url("example.com/gallery").unwrap().as_str(),
            "https://example.com/gallery"
        );
        assert_eq!(
            normalize_start_url(" http://example.com/a ").unwrap().as_str(),
            "http://example.com/a"
        );
        assert_eq!(
            normalize_start_url("HTTPS://Example.com").unwrap().as_str(),
            "https://example.com/"
        );
        assert!(normalize_start_url("").is_err());
        assert!(matches!(
            normalize_start_url("ftp://example.com/pub"),
            Err(RunError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }
}
