//! Advance-control handler. Highest priority: if the module offers a way
//! forward, everything else about the current section is already settled.

use anyhow::Result;
use async_trait::async_trait;
use cruise_dom::ElementHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use super::{usable, Handler, Tick};
use crate::vocab;

/// Delay between finding an advance control and activating it.
const ADVANCE_DELAY: Duration = Duration::from_millis(10);

pub struct NavigationHandler;

#[async_trait]
impl Handler for NavigationHandler {
    fn name(&self) -> &'static str {
        "navigation"
    }

    async fn attempt(&self, tick: &mut Tick<'_>) -> Result<bool> {
        if let Some(el) = tick.host.find_by_id(tick.doc, vocab::ADVANCE_CONTROL_ID).await? {
            if usable(tick.host, &el).await && tick.state.last_clicked.as_ref() != Some(&el) {
                advance(tick, el, vocab::ADVANCE_CONTROL_ID).await;
                return Ok(true);
            }
        }

        for (el, text) in super::labelled_buttons(tick.host, tick.doc).await? {
            if !text.eq_ignore_ascii_case("next") {
                continue;
            }
            if usable(tick.host, &el).await && tick.state.last_clicked.as_ref() != Some(&el) {
                advance(tick, el, &text).await;
                return Ok(true);
            }
        }

        Ok(false)
    }
}

async fn advance(tick: &mut Tick<'_>, el: ElementHandle, label: &str) {
    sleep(ADVANCE_DELAY).await;
    match tick.host.click(&el).await {
        Ok(()) => {
            info!(control = label, "advanced to next section");
            tick.state.last_clicked = Some(el);
            tick.state.reset_section();
        }
        Err(e) => debug!(control = label, error = %e, "advance activation failed"),
    }
}

#[cfg(test)]
mod tests {
    use cruise_common::{AnswerLexicons, EngineSettings};
    use cruise_dom::scripted::{ElementSpec, ScriptedHost};
    use cruise_dom::ContentHost;

    use super::*;
    use crate::state::SessionState;

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
        NavigationHandler.attempt(&mut tick).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn clicks_the_well_known_id_and_resets_section_state() {
        let host = ScriptedHost::new();
        let el = host.add_element(
            &host.root(),
            ElementSpec::button("Continue").id(vocab::ADVANCE_CONTROL_ID),
        );

        let mut state = SessionState::new();
        state.media_completed = true;
        state.quiz_completed = true;
        state.last_question_text = "old".into();

        assert!(run(&host, &mut state).await);
        assert_eq!(host.clicks(), vec![el.slot()]);
        assert!(!state.media_completed);
        assert!(!state.quiz_completed);
        assert!(state.last_question_text.is_empty());
        assert_eq!(state.last_clicked, Some(el));
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_exact_next_text() {
        let host = ScriptedHost::new();
        host.add_element(&host.root(), ElementSpec::button("Next Chapter"));
        let next = host.add_element(&host.root(), ElementSpec::button("  NEXT "));

        let mut state = SessionState::new();
        assert!(run(&host, &mut state).await);
        assert_eq!(host.clicks(), vec![next.slot()]);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_or_hidden_controls_do_not_count() {
        let host = ScriptedHost::new();
        host.add_element(
            &host.root(),
            ElementSpec::button("Next").id(vocab::ADVANCE_CONTROL_ID).disabled(),
        );
        host.add_element(&host.root(), ElementSpec::button("Next").hidden());

        let mut state = SessionState::new();
        assert!(!run(&host, &mut state).await);
        assert!(host.clicks().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_reclick_the_same_control_until_cleared() {
        let host = ScriptedHost::new();
        host.add_element(
            &host.root(),
            ElementSpec::button("Next").id(vocab::ADVANCE_CONTROL_ID),
        );

        let mut state = SessionState::new();
        assert!(run(&host, &mut state).await);
        assert!(!run(&host, &mut state).await);

        // The stuck detector clears the suppression; the retry then works.
        state.last_clicked = None;
        assert!(run(&host, &mut state).await);
        assert_eq!(host.clicks().len(), 2);
    }
}
