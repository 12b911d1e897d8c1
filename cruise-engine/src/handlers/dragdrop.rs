//! Drag-and-drop quiz handler for protected-characteristic questions.
//!
//! The target renders drag items whose event binding varies between module
//! versions, so each selection is pushed through several interaction
//! channels at once: a plain activation, an ARIA state write, a pointer
//! sequence towards the drop target, and a keyboard fallback. Whichever the
//! widget listens to wins; the rest are inert.

use anyhow::Result;
use async_trait::async_trait;
use cruise_dom::{ContentHost, ElementHandle, InputEvent, Key};
use tokio::time::{sleep, Duration, Instant};
use tracing::{debug, info};

use super::{Handler, Tick};
use crate::fingerprint::Fingerprint;
use crate::vocab;

pub struct DragDropQuizHandler;

#[async_trait]
impl Handler for DragDropQuizHandler {
    fn name(&self) -> &'static str {
        "drag-drop-quiz"
    }

    async fn attempt(&self, tick: &mut Tick<'_>) -> Result<bool> {
        if tick.state.quiz_completed || tick.state.cooldown_active(Instant::now()) {
            return Ok(false);
        }

        let items = tick.host.query(tick.doc, &vocab::drag_items()).await?;
        let Some(zone) = tick.host.find_by_id(tick.doc, vocab::DROP_ZONE_ID).await? else {
            return Ok(false);
        };
        if items.is_empty() {
            return Ok(false);
        }

        let Some(title) = tick
            .host
            .query(tick.doc, &vocab::question_titles())
            .await?
            .into_iter()
            .next()
        else {
            return Ok(false);
        };
        let question = tick.host.text(&title).await?.trim().to_string();
        if question.is_empty() {
            return Ok(false);
        }

        let fingerprint = Fingerprint::of(&question);
        if tick.state.processed_questions.contains(&fingerprint) {
            debug!("question already processed; skipping");
            return Ok(false);
        }
        if question == tick.state.last_question_text {
            return Ok(false);
        }

        let lowered = question.to_lowercase();
        if !lowered.contains("federally protected") && !lowered.contains("protected characteristic")
        {
            return Ok(false);
        }
        let select_all =
            lowered.contains("select all that apply") || lowered.contains("all that apply");

        let stagger = Duration::from_millis(tick.settings.click_delay_ms);
        let mut selected = 0u32;
        for item in &items {
            let pressed = tick
                .host
                .attr(item, "aria-pressed")
                .await
                .unwrap_or(None)
                .as_deref()
                == Some("true");
            if pressed {
                continue;
            }

            let item_text = tick.host.text(item).await.unwrap_or_default();
            let item_text = item_text.trim();
            if tick.lexicons.excluded_terms.hit(item_text).is_some() {
                debug!(item = item_text, "explicitly excluded term; skipping");
                continue;
            }
            if tick.lexicons.protected_terms.hit(item_text).is_none() {
                continue;
            }
            if !select_all && selected > 0 {
                break;
            }

            if selected > 0 {
                sleep(stagger).await;
            }
            select_item(tick.host, item, &zone).await;
            info!(item = item_text, "selected drag item");
            selected += 1;
        }

        if selected == 0 {
            return Ok(false);
        }

        tick.state.last_question_text = question;
        tick.state.questions_answered += 1;
        tick.state.processed_questions.insert(fingerprint);
        tick.state.quiz_completed = true;
        tick.state.last_quiz_completion = Some(Instant::now());
        tick.state.media_playing = false;
        // New media often follows the quiz inside the same section.
        tick.state.media_completed = false;
        info!(selections = selected, "drag-drop quiz answered");
        Ok(true)
    }
}

/// Multi-channel selection; every channel's faults are swallowed.
async fn select_item(host: &dyn ContentHost, item: &ElementHandle, zone: &ElementHandle) {
    if let Err(e) = host.click(item).await {
        debug!(error = %e, "item activation failed");
    }
    if let Err(e) = host.set_attr(item, "aria-pressed", "true").await {
        debug!(error = %e, "aria state write failed");
    }
    let _ = host.dispatch(item, InputEvent::PointerDown).await;
    let _ = host.dispatch(zone, InputEvent::PointerMove).await;
    let _ = host.dispatch(zone, InputEvent::PointerUp).await;
    let _ = host.focus(item).await;
    let _ = host.dispatch(item, InputEvent::KeyDown(Key::Space)).await;
}

#[cfg(test)]
mod tests {
    use cruise_common::{AnswerLexicons, EngineSettings};
    use cruise_dom::scripted::{ElementSpec, ScriptedHost};
    use cruise_dom::DocHandle;

    use super::*;
    use crate::state::{SessionState, QUIZ_COOLDOWN};

    const SELECT_ALL_QUESTION: &str =
        "Select all that apply: which of the following are federally protected characteristics?";

    fn quiz_page(host: &ScriptedHost, doc: &DocHandle, question: &str) -> Vec<ElementHandle> {
        host.add_element(
            doc,
            ElementSpec::new("h1")
                .attr("data-id", "q1_title")
                .text(question),
        );
        host.add_element(doc, ElementSpec::new("div").id(vocab::DROP_ZONE_ID));
        ["Race", "Religion", "Marital status", "Favorite sports team"]
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                host.add_element(
                    doc,
                    ElementSpec::new("div")
                        .class("DragAndDropItem")
                        .attr("data-item-id", i.to_string())
                        .text(label),
                )
            })
            .collect()
    }

    async fn run(host: &ScriptedHost, state: &mut SessionState) -> bool {
        let settings = EngineSettings::default();
        let lexicons = AnswerLexicons::default();
        let doc = host.root();
        let mut tick = Tick {
            host,
            doc: &doc,
            state,
            settings: &settings,
            lexicons: &lexicons,
            stuck: false,
        };
        DragDropQuizHandler.attempt(&mut tick).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn selects_all_matches_and_records_completion() {
        let host = ScriptedHost::new();
        let items = quiz_page(&host, &host.root(), SELECT_ALL_QUESTION);

        let mut state = SessionState::new();
        assert!(run(&host, &mut state).await);

        // Race and Religion selected; marital status excluded by the
        // negative lexicon even though nothing positive matches it anyway.
        let clicks = host.clicks();
        assert_eq!(clicks, vec![items[0].slot(), items[1].slot()]);
        assert_eq!(state.questions_answered, 1);
        assert!(state.quiz_completed);
        assert!(state.last_quiz_completion.is_some());
        assert_eq!(state.processed_questions.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn single_select_stops_after_the_first_match() {
        let host = ScriptedHost::new();
        let items = quiz_page(
            &host,
            &host.root(),
            "Which one of these is a federally protected characteristic?",
        );

        let mut state = SessionState::new();
        assert!(run(&host, &mut state).await);
        assert_eq!(host.clicks(), vec![items[0].slot()]);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_lexicon_wins_over_positive() {
        let host = ScriptedHost::new();
        let root = host.root();
        host.add_element(
            &root,
            ElementSpec::new("h1")
                .attr("data-id", "q_title")
                .text(SELECT_ALL_QUESTION),
        );
        host.add_element(&root, ElementSpec::new("div").id(vocab::DROP_ZONE_ID));
        // "Age" matches the positive table, "height" the negative one; an
        // item containing both must never be selected.
        let tainted = host.add_element(
            &root,
            ElementSpec::new("div")
                .class("DragAndDropItem")
                .attr("data-item-id", "0")
                .text("Age and height"),
        );
        let clean = host.add_element(
            &root,
            ElementSpec::new("div")
                .class("DragAndDropItem")
                .attr("data-item-id", "1")
                .text("Religion"),
        );

        let mut state = SessionState::new();
        assert!(run(&host, &mut state).await);
        let clicks = host.clicks();
        assert!(!clicks.contains(&tainted.slot()));
        assert!(clicks.contains(&clean.slot()));
    }

    #[tokio::test(start_paused = true)]
    async fn processed_questions_are_never_reprocessed() {
        let host = ScriptedHost::new();
        quiz_page(&host, &host.root(), SELECT_ALL_QUESTION);

        let mut state = SessionState::new();
        assert!(run(&host, &mut state).await);

        // Clear every per-section flag the engine would clear on navigation;
        // the permanent ledger alone must still refuse the rerun.
        state.reset_section();
        host.clear_activity();
        tokio::time::advance(QUIZ_COOLDOWN * 2).await;

        assert!(!run(&host, &mut state).await);
        assert!(host.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_blocks_new_questions() {
        let host = ScriptedHost::new();
        quiz_page(&host, &host.root(), SELECT_ALL_QUESTION);

        let mut state = SessionState::new();
        state.quiz_completed = false;
        state.last_quiz_completion = Some(Instant::now());

        assert!(!run(&host, &mut state).await);

        tokio::time::advance(QUIZ_COOLDOWN).await;
        assert!(run(&host, &mut state).await);
    }

    #[tokio::test(start_paused = true)]
    async fn already_pressed_items_are_skipped() {
        let host = ScriptedHost::new();
        let items = quiz_page(&host, &host.root(), SELECT_ALL_QUESTION);
        host.set_attr_direct(&items[0], "aria-pressed", "true");

        let mut state = SessionState::new();
        assert!(run(&host, &mut state).await);
        assert_eq!(host.clicks(), vec![items[1].slot()]);
    }

    #[tokio::test(start_paused = true)]
    async fn unrelated_questions_are_ignored() {
        let host = ScriptedHost::new();
        quiz_page(&host, &host.root(), "Drag the safety equipment to the worker.");

        let mut state = SessionState::new();
        assert!(!run(&host, &mut state).await);
        assert_eq!(state.questions_answered, 0);
    }
}
