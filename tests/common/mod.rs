//! Scripted browser engine and recording observer shared by integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use kodegen_tools_pagemeta::{
    BrowserEngine, BrowserError, BrowserResult, BrowserSession, ExtractionSettings,
    NavigationResponse, PageExtractor, PageMetadata, ScrapeError, ScrapeHandler, ScrapeObserver,
    SessionOptions,
};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Outcome of one scripted `goto` call
#[derive(Debug, Clone)]
pub enum NavStep {
    Fail(&'static str),
    Respond(Option<u16>),
    /// Never completes; only the caller's timeout ends it
    Hang,
}

#[derive(Debug, Clone, Copy)]
pub enum IdleBehavior {
    Idle,
    /// Waits out the whole timeout, then reports not idle
    NeverIdle,
    Fails,
}

/// What every session launched by a [`StubEngine`] does
#[derive(Debug, Clone)]
pub struct Script {
    pub launch_delay: Duration,
    pub launch_error: Option<&'static str>,
    /// Consumed in order; the last step repeats once the queue is drained
    pub nav_steps: Vec<NavStep>,
    pub idle: IdleBehavior,
    pub dom: Value,
    pub evaluate_error: Option<&'static str>,
    pub close_error: Option<&'static str>,
    /// `close` never completes
    pub close_hangs: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            launch_delay: Duration::ZERO,
            launch_error: None,
            nav_steps: vec![NavStep::Respond(Some(200))],
            idle: IdleBehavior::Idle,
            dom: example_dom(),
            evaluate_error: None,
            close_error: None,
            close_hangs: false,
        }
    }
}

/// The concrete example page: no named description, padded og:description
pub fn example_dom() -> Value {
    json!({
        "title": "Example",
        "description": null,
        "og_description": "  A   test site  ",
        "h1": "Welcome"
    })
}

pub fn example_metadata(status: u16) -> PageMetadata {
    PageMetadata {
        title: "Example".into(),
        meta_description: "A test site".into(),
        h1: "Welcome".into(),
        status,
    }
}

#[derive(Debug, Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub gotos: AtomicUsize,
    pub idle_waits: AtomicUsize,
    pub evaluations: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Counters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn gotos(&self) -> usize {
        self.gotos.load(Ordering::SeqCst)
    }

    pub fn idle_waits(&self) -> usize {
        self.idle_waits.load(Ordering::SeqCst)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct StubEngine {
    script: Script,
    counters: Arc<Counters>,
    last_options: Mutex<Option<SessionOptions>>,
}

impl StubEngine {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            counters: Arc::new(Counters::default()),
            last_options: Mutex::new(None),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    pub fn last_options(&self) -> Option<SessionOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl BrowserEngine for StubEngine {
    async fn launch(&self, options: &SessionOptions) -> BrowserResult<Box<dyn BrowserSession>> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        *self.last_options.lock().unwrap() = Some(options.clone());

        if !self.script.launch_delay.is_zero() {
            tokio::time::sleep(self.script.launch_delay).await;
        }

        if let Some(reason) = self.script.launch_error {
            return Err(BrowserError::LaunchFailed(reason.to_string()));
        }

        Ok(Box::new(StubSession {
            script: self.script.clone(),
            steps: self.script.nav_steps.iter().cloned().collect(),
            counters: self.counters.clone(),
            closed: false,
        }))
    }
}

struct StubSession {
    script: Script,
    steps: VecDeque<NavStep>,
    counters: Arc<Counters>,
    closed: bool,
}

impl StubSession {
    fn next_step(&mut self) -> NavStep {
        if self.steps.len() > 1 {
            self.steps.pop_front().unwrap_or(NavStep::Hang)
        } else {
            self.steps.front().cloned().unwrap_or(NavStep::Hang)
        }
    }
}

#[async_trait]
impl BrowserSession for StubSession {
    async fn goto(&mut self, _url: &Url) -> BrowserResult<Option<NavigationResponse>> {
        self.counters.gotos.fetch_add(1, Ordering::SeqCst);
        match self.next_step() {
            NavStep::Fail(reason) => Err(BrowserError::NavigationFailed(reason.to_string())),
            NavStep::Respond(status) => Ok(status.map(|status| NavigationResponse { status })),
            NavStep::Hang => std::future::pending().await,
        }
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> BrowserResult<bool> {
        self.counters.idle_waits.fetch_add(1, Ordering::SeqCst);
        match self.script.idle {
            IdleBehavior::Idle => Ok(true),
            IdleBehavior::NeverIdle => {
                tokio::time::sleep(timeout).await;
                Ok(false)
            }
            IdleBehavior::Fails => Err(BrowserError::NavigationFailed(
                "lifecycle stream closed".to_string(),
            )),
        }
    }

    async fn evaluate(&mut self, _script: &str) -> BrowserResult<Value> {
        self.counters.evaluations.fetch_add(1, Ordering::SeqCst);
        match self.script.evaluate_error {
            Some(reason) => Err(BrowserError::EvaluationFailed(reason.to_string())),
            None => Ok(self.script.dom.clone()),
        }
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        if self.script.close_hangs {
            std::future::pending::<()>().await;
        }
        match self.script.close_error {
            Some(reason) => Err(BrowserError::TeardownFailed(reason.to_string())),
            None => Ok(()),
        }
    }
}

/// Observer that keeps every event as a short string
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| event.starts_with(prefix))
            .count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ScrapeObserver for RecordingObserver {
    fn session_launched(&self, target: &Url) {
        self.push(format!("launched {target}"));
    }

    fn navigation_attempt_failed(&self, attempt: u32, max_attempts: u32, _error: &BrowserError) {
        self.push(format!("nav_failed {attempt}/{max_attempts}"));
    }

    fn network_idle_skipped(&self, _waited: Duration, error: Option<&BrowserError>) {
        self.push(format!("idle_skipped error={}", error.is_some()));
    }

    fn teardown_failed(&self, error: &BrowserError) {
        self.push(format!("teardown_failed {error}"));
    }

    fn scrape_finished(
        &self,
        _target: &Url,
        outcome: Result<&PageMetadata, &ScrapeError>,
        _elapsed: Duration,
    ) {
        let label = match outcome {
            Ok(_) => "ok".to_string(),
            Err(error) => format!("{:?}", error.category()),
        };
        self.push(format!("finished {label}"));
    }
}

pub struct Harness {
    pub engine: Arc<StubEngine>,
    pub counters: Arc<Counters>,
    pub observer: Arc<RecordingObserver>,
    pub extractor: Arc<PageExtractor>,
}

impl Harness {
    pub fn new(script: Script) -> Self {
        Self::with_settings(script, ExtractionSettings::default())
    }

    pub fn with_settings(script: Script, settings: ExtractionSettings) -> Self {
        let engine = Arc::new(StubEngine::new(script));
        let counters = engine.counters();
        let observer = Arc::new(RecordingObserver::default());
        let extractor = Arc::new(PageExtractor::new(
            engine.clone(),
            settings,
            observer.clone(),
        ));
        Self {
            engine,
            counters,
            observer,
            extractor,
        }
    }

    pub fn handler(&self, budget: Duration) -> ScrapeHandler {
        ScrapeHandler::new(self.extractor.clone(), budget, self.observer.clone())
    }
}

pub fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}
