//! Tick scheduler and operator control surface.
//!
//! One state, "ticking": entered by [`Engine::start`], left by
//! [`Engine::stop`] or completion detection. Each tick locates the surface,
//! checks for completion phrases, updates the stuck detector, and walks the
//! handler pipeline until one handler acts. A fault anywhere inside a tick
//! is caught here, logged, and costs exactly that tick; the scheduler
//! itself cannot be taken down from inside.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use anyhow::Result;
use cruise_common::{AnswerLexicons, CompletionPhrases, EngineSettings};
use cruise_dom::ContentHost;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::handlers::{standard_pipeline, Handler, Tick};
use crate::locate::{locate, LocatedContent};
use crate::state::{SessionState, StatsSnapshot};
use crate::{stuck, vocab};

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No content surface located; the target is not ready yet.
    NotReady,
    /// A handler acted and short-circuited the pipeline.
    Acted(&'static str),
    /// Every handler declined.
    Idle,
    /// Completion phrases matched; the scheduler is terminal.
    Finished,
    /// The tick faulted and was treated as a no-op.
    Faulted,
}

/// Combined state + configuration dump for the control surface.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub completed: bool,
    pub running: bool,
    pub session: StatsSnapshot,
    pub settings: EngineSettings,
}

/// Diagnostic enumeration of the located surface.
#[derive(Debug, Clone, Serialize)]
pub struct DebugReport {
    pub provenance: String,
    pub buttons: usize,
    pub audio: usize,
    pub video: usize,
    pub question_markers: usize,
    pub drag_items: usize,
    pub drop_target: bool,
    pub advance_in_content: bool,
    pub advance_in_root: bool,
    pub content_buttons: Vec<String>,
    pub root_buttons: Vec<String>,
}

struct Ticker {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct Inner {
    host: Arc<dyn ContentHost>,
    settings: EngineSettings,
    lexicons: AnswerLexicons,
    completion: CompletionPhrases,
    handlers: Vec<Box<dyn Handler>>,
    state: Mutex<SessionState>,
    ticker: StdMutex<Option<Ticker>>,
    completed: AtomicBool,
}

/// The automation engine. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    pub fn new(
        host: Arc<dyn ContentHost>,
        settings: EngineSettings,
        lexicons: AnswerLexicons,
        completion: CompletionPhrases,
    ) -> Self {
        Self::with_pipeline(host, settings, lexicons, completion, standard_pipeline())
    }

    /// Construct with a custom handler pipeline. Handlers run in the given
    /// order; extension happens here, not by editing the standard handlers.
    pub fn with_pipeline(
        host: Arc<dyn ContentHost>,
        settings: EngineSettings,
        lexicons: AnswerLexicons,
        completion: CompletionPhrases,
        handlers: Vec<Box<dyn Handler>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                host,
                settings,
                lexicons,
                completion,
                handlers,
                state: Mutex::new(SessionState::new()),
                ticker: StdMutex::new(None),
                completed: AtomicBool::new(false),
            }),
        }
    }

    /// Begin ticking. Idempotent: an existing ticker is cancelled first and
    /// a fresh one starts with an immediate tick.
    pub fn start(&self) {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let inner = self.inner.clone();
        let task = tokio::spawn(async move {
            let period = Duration::from_millis(inner.settings.check_interval_ms.max(1));
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticks.tick() => {
                        if inner.run_once().await == TickOutcome::Finished {
                            break;
                        }
                    }
                }
            }
        });

        let previous = self
            .inner
            .ticker
            .lock()
            .unwrap()
            .replace(Ticker { cancel, task });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
        info!(
            interval_ms = self.inner.settings.check_interval_ms,
            "engine started"
        );
    }

    /// Cancel ticking and report final counters. Deferred sub-actions of a
    /// tick already in flight still complete; we wait for the ticker to
    /// drain before reporting.
    pub async fn stop(&self) -> StatsSnapshot {
        let ticker = self.inner.ticker.lock().unwrap().take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            let _ = ticker.task.await;
        }
        let snapshot = self.inner.state.lock().await.snapshot();
        info!(
            questions = snapshot.questions_answered,
            "engine stopped"
        );
        snapshot
    }

    /// Whether the completion phrases have matched.
    pub fn is_completed(&self) -> bool {
        self.inner.completed.load(Ordering::SeqCst)
    }

    /// Whether a ticker is currently scheduled.
    pub fn is_running(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .unwrap()
            .as_ref()
            .map(|t| !t.task.is_finished())
            .unwrap_or(false)
    }

    /// Read-only dump of session state and configuration.
    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            completed: self.is_completed(),
            running: self.is_running(),
            session: self.inner.state.lock().await.snapshot(),
            settings: self.inner.settings.clone(),
        }
    }

    /// Drive a single tick manually. Faults are absorbed exactly as in
    /// scheduled operation.
    pub async fn run_once(&self) -> TickOutcome {
        self.inner.run_once().await
    }

    /// Diagnostic enumeration of the located surface, or `None` when no
    /// surface qualifies right now.
    pub async fn debug_report(&self) -> Option<DebugReport> {
        match self.inner.debug_report().await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = ?e, "debug enumeration failed");
                None
            }
        }
    }

    /// Best-effort scan of the located surface and the root for anything
    /// that looks like an advance control, bypassing the pipeline.
    pub async fn force_navigation(&self) -> bool {
        match self.inner.force_navigation().await {
            Ok(clicked) => clicked,
            Err(e) => {
                warn!(error = ?e, "forced navigation failed");
                false
            }
        }
    }
}

impl Inner {
    async fn run_once(&self) -> TickOutcome {
        match self.run_tick().await {
            Ok(TickOutcome::Finished) => {
                self.completed.store(true, Ordering::SeqCst);
                TickOutcome::Finished
            }
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = ?e, "tick fault; treated as no-op");
                TickOutcome::Faulted
            }
        }
    }

    async fn run_tick(&self) -> Result<TickOutcome> {
        let Some(located) = locate(self.host.as_ref()).await? else {
            debug!("content surface not ready");
            return Ok(TickOutcome::NotReady);
        };
        if self.settings.debug {
            debug!(provenance = %located.provenance, "surface located");
        }

        let text = self.host.body_text(&located.doc).await?;
        if self.completion.matched(&text) {
            info!("module reports completion; scheduler entering terminal state");
            return Ok(TickOutcome::Finished);
        }

        let mut state = self.state.lock().await;
        let stuck = stuck::observe(&mut state, &text);

        let mut tick = Tick {
            host: self.host.as_ref(),
            doc: &located.doc,
            state: &mut state,
            settings: &self.settings,
            lexicons: &self.lexicons,
            stuck,
        };
        for handler in &self.handlers {
            if handler.attempt(&mut tick).await? {
                debug!(handler = handler.name(), "handler acted");
                return Ok(TickOutcome::Acted(handler.name()));
            }
        }
        Ok(TickOutcome::Idle)
    }

    async fn debug_report(&self) -> Result<Option<DebugReport>> {
        let Some(LocatedContent { doc, provenance }) = locate(self.host.as_ref()).await? else {
            return Ok(None);
        };
        let root = self.host.root();

        let mut question_markers = std::collections::HashSet::new();
        for selector in [
            crate::vocab::question_titles(),
            cruise_dom::Selector::attr_contains("data-id", vocab::QUESTION_BODY_MARKER),
            cruise_dom::Selector::class("question-text"),
        ] {
            for el in self.host.query(&doc, &selector).await? {
                question_markers.insert(el.slot());
            }
        }

        Ok(Some(DebugReport {
            provenance,
            buttons: self.host.query(&doc, &vocab::buttons()).await?.len(),
            audio: self.host.query(&doc, &vocab::audio()).await?.len(),
            video: self.host.query(&doc, &vocab::video()).await?.len(),
            question_markers: question_markers.len(),
            drag_items: self.host.query(&doc, &vocab::drag_items()).await?.len(),
            drop_target: self
                .host
                .find_by_id(&doc, vocab::DROP_ZONE_ID)
                .await?
                .is_some(),
            advance_in_content: self
                .host
                .find_by_id(&doc, vocab::ADVANCE_CONTROL_ID)
                .await?
                .is_some(),
            advance_in_root: self
                .host
                .find_by_id(&root, vocab::ADVANCE_CONTROL_ID)
                .await?
                .is_some(),
            content_buttons: self.visible_labels(&doc).await?,
            root_buttons: if doc == root {
                Vec::new()
            } else {
                self.visible_labels(&root).await?
            },
        }))
    }

    async fn visible_labels(&self, doc: &cruise_dom::DocHandle) -> Result<Vec<String>> {
        let mut labels = Vec::new();
        for el in self.host.query(doc, &vocab::buttons()).await? {
            if self.host.is_visible(&el).await.unwrap_or(false) {
                labels.push(self.host.text(&el).await.unwrap_or_default().trim().to_string());
            }
        }
        Ok(labels)
    }

    async fn force_navigation(&self) -> Result<bool> {
        let located = locate(self.host.as_ref()).await?;
        let root = self.host.root();
        let mut docs = Vec::new();
        if let Some(located) = located {
            docs.push(located.doc);
        }
        if !docs.contains(&root) {
            docs.push(root);
        }

        for doc in &docs {
            for el in self.host.query(doc, &vocab::buttons()).await? {
                if !crate::handlers::usable(self.host.as_ref(), &el).await {
                    continue;
                }
                let text = self
                    .host
                    .text(&el)
                    .await
                    .unwrap_or_default()
                    .to_lowercase();
                let id = self
                    .host
                    .attr(&el, "id")
                    .await
                    .unwrap_or(None)
                    .unwrap_or_default()
                    .to_lowercase();
                let class = self
                    .host
                    .attr(&el, "class")
                    .await
                    .unwrap_or(None)
                    .unwrap_or_default()
                    .to_lowercase();
                let looks_like_advance = ["next", "submit", "continue"]
                    .iter()
                    .any(|kw| text.contains(kw))
                    || id.contains("next")
                    || class.contains("next");
                if looks_like_advance {
                    info!(control = %text.trim(), "forced navigation");
                    self.host.click(&el).await?;
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use cruise_common::CompletionPhrases;
    use cruise_dom::scripted::{ElementSpec, ScriptedHost};

    use super::*;

    fn engine_on(host: &ScriptedHost) -> Engine {
        Engine::new(
            Arc::new(host.clone()),
            EngineSettings::default(),
            AnswerLexicons::default(),
            CompletionPhrases::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn completion_phrases_terminate_the_run() {
        let host = ScriptedHost::new();
        let root = host.root();
        host.add_element(&root, ElementSpec::button("Replay course"));
        host.set_body_text(&root, "Congratulations, you have completed the course");

        let engine = engine_on(&host);
        assert_eq!(engine.run_once().await, TickOutcome::Finished);
        assert!(engine.is_completed());
    }

    struct FaultyHandler;

    #[async_trait]
    impl Handler for FaultyHandler {
        fn name(&self) -> &'static str {
            "faulty"
        }

        async fn attempt(&self, _tick: &mut Tick<'_>) -> Result<bool> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn a_faulting_handler_costs_one_tick_not_the_scheduler() {
        let host = ScriptedHost::new();
        let root = host.root();
        host.add_element(&root, ElementSpec::button("Something"));

        let engine = Engine::with_pipeline(
            Arc::new(host.clone()),
            EngineSettings::default(),
            AnswerLexicons::default(),
            CompletionPhrases::default(),
            vec![Box::new(FaultyHandler)],
        );

        assert_eq!(engine.run_once().await, TickOutcome::Faulted);
        // The engine still ticks afterwards.
        assert_eq!(engine.run_once().await, TickOutcome::Faulted);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_surface_is_not_ready_not_an_error() {
        let host = ScriptedHost::new();
        let engine = engine_on(&host);
        assert_eq!(engine.run_once().await, TickOutcome::NotReady);
    }

    #[tokio::test(start_paused = true)]
    async fn force_navigation_scans_root_too() {
        let host = ScriptedHost::new();
        let root = host.root();
        let doc = host.add_doc("content");
        host.add_frame(&root, Some(vocab::RELAY_FRAME_ID), &doc, true);
        host.add_element(&doc, ElementSpec::button("Rate this course"));
        let advance = host.add_element(&root, ElementSpec::button("Submit section"));

        let engine = engine_on(&host);
        assert!(engine.force_navigation().await);
        assert_eq!(host.clicks(), vec![advance.slot()]);
    }

    #[tokio::test(start_paused = true)]
    async fn debug_report_counts_the_vocabulary() {
        let host = ScriptedHost::new();
        let root = host.root();
        host.add_element(&root, ElementSpec::button("Next").id(vocab::ADVANCE_CONTROL_ID));
        host.add_element(
            &root,
            ElementSpec::new("h1").attr("data-id", "q_title").text("Question?"),
        );
        host.add_element(
            &root,
            ElementSpec::new("div")
                .class("DragAndDropItem")
                .attr("data-item-id", "0")
                .text("Race"),
        );
        host.add_element(&root, ElementSpec::new("div").id(vocab::DROP_ZONE_ID));

        let engine = engine_on(&host);
        let report = engine.debug_report().await.expect("surface located");
        assert_eq!(report.buttons, 1);
        assert_eq!(report.drag_items, 1);
        assert_eq!(report.question_markers, 1);
        assert!(report.drop_target);
        assert!(report.advance_in_content);
        assert_eq!(report.content_buttons, vec!["Next".to_string()]);
    }
}
