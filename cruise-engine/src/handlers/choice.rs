//! Multiple-choice / true-false quiz handler.
//!
//! Answer selection is heuristic and makes no claim of correctness; the
//! contract is deterministic, auditable *selection* given fixed lexicons.
//! Compliance-training questions phrased around reporting and policy answer
//! True, dismissive phrasings answer False, and everything else prefers a
//! report/escalate-flavoured choice over the first button on the page.

use anyhow::Result;
use async_trait::async_trait;
use cruise_common::AnswerLexicons;
use cruise_dom::ElementHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use super::{Handler, Tick};
use crate::vocab;

/// Question candidates shorter than this are noise (labels, captions).
const MIN_QUESTION_LEN: usize = 20;

pub struct ChoiceQuizHandler;

#[async_trait]
impl Handler for ChoiceQuizHandler {
    fn name(&self) -> &'static str {
        "choice-quiz"
    }

    async fn attempt(&self, tick: &mut Tick<'_>) -> Result<bool> {
        let mut controls: Vec<(ElementHandle, String)> = Vec::new();
        for selector in vocab::answer_control_strategies() {
            let mut visible = Vec::new();
            for el in tick.host.query(tick.doc, &selector).await? {
                if tick.host.is_visible(&el).await.unwrap_or(false) {
                    let text = tick.host.text(&el).await.unwrap_or_default();
                    visible.push((el, text.trim().to_string()));
                }
            }
            if !visible.is_empty() {
                controls = visible;
                break;
            }
        }
        if controls.is_empty() {
            return Ok(false);
        }

        let mut question = String::new();
        for selector in vocab::question_text_strategies() {
            if let Some(el) = tick.host.query(tick.doc, &selector).await?.into_iter().next() {
                let text = tick.host.text(&el).await.unwrap_or_default();
                let text = text.trim();
                if text.chars().count() > MIN_QUESTION_LEN {
                    question = text.to_string();
                    break;
                }
            }
        }
        if question.is_empty() || question == tick.state.last_question_text {
            return Ok(false);
        }

        let chosen = select_answer(&question, &controls, tick.lexicons);
        let (el, label) = chosen.clone();
        sleep(Duration::from_millis(tick.settings.click_delay_ms)).await;
        match tick.host.click(&el).await {
            Ok(()) => {
                tick.state.last_question_text = question;
                tick.state.questions_answered += 1;
                info!(
                    answer = %label,
                    total = tick.state.questions_answered,
                    "answered choice question"
                );
            }
            Err(e) => debug!(answer = %label, error = %e, "answer activation failed"),
        }
        Ok(true)
    }
}

/// Pure selection policy, in priority order: true/false reasoning, preferred
/// answer scan, first control.
fn select_answer<'a>(
    question: &str,
    controls: &'a [(ElementHandle, String)],
    lexicons: &AnswerLexicons,
) -> &'a (ElementHandle, String) {
    let truthy = controls
        .iter()
        .find(|(_, label)| label.eq_ignore_ascii_case("true"));
    let falsy = controls
        .iter()
        .find(|(_, label)| label.eq_ignore_ascii_case("false"));

    if let (Some(truthy), Some(falsy)) = (truthy, falsy) {
        if lexicons.affirm_patterns.hit(question).is_some() {
            return truthy;
        }
        if lexicons.dismiss_patterns.hit(question).is_some() {
            return falsy;
        }
        // Compliance questions default to True.
        return truthy;
    }

    controls
        .iter()
        .find(|(_, label)| lexicons.preferred_answers.hit(label).is_some())
        .unwrap_or(&controls[0])
}
