//! Prioritised action strategies tried once per tick.
//!
//! Each handler implements [`Handler::attempt`] and reports whether it acted;
//! the pipeline stops at the first `true`. New behavior is added by
//! extension (another handler in the list), never by editing an existing
//! one. Ordering is load-bearing: once an advance control exists the current
//! section's state is irrelevant, so navigation preempts everything.

use anyhow::Result;
use async_trait::async_trait;
use cruise_common::{AnswerLexicons, EngineSettings};
use cruise_dom::{ContentHost, DocHandle, ElementHandle};

use crate::state::SessionState;

mod choice;
mod dragdrop;
mod media;
mod navigation;
mod recovery;

pub use choice::ChoiceQuizHandler;
pub use dragdrop::DragDropQuizHandler;
pub use media::MediaHandler;
pub use navigation::NavigationHandler;
pub use recovery::RecoveryHandler;

/// Everything one handler invocation may see and touch.
pub struct Tick<'a> {
    pub host: &'a dyn ContentHost,
    pub doc: &'a DocHandle,
    pub state: &'a mut SessionState,
    pub settings: &'a EngineSettings,
    pub lexicons: &'a AnswerLexicons,
    /// Set when the stuck detector fired this tick.
    pub stuck: bool,
}

/// One action strategy. `Ok(true)` short-circuits the pipeline for this
/// tick; `Ok(false)` means not applicable; `Err` is a tick fault, caught at
/// the tick boundary.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(&self, tick: &mut Tick<'_>) -> Result<bool>;
}

/// The standard pipeline in priority order.
pub fn standard_pipeline() -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(NavigationHandler),
        Box::new(MediaHandler),
        Box::new(DragDropQuizHandler),
        Box::new(ChoiceQuizHandler),
        Box::new(RecoveryHandler),
    ]
}

/// Whether an element can currently be interacted with. Elements that
/// vanished mid-tick count as unusable rather than faulting the tick.
pub(crate) async fn usable(host: &dyn ContentHost, el: &ElementHandle) -> bool {
    let visible = host.is_visible(el).await.unwrap_or(false);
    let enabled = host.is_enabled(el).await.unwrap_or(false);
    visible && enabled
}

/// All buttons of the document paired with their trimmed text.
pub(crate) async fn labelled_buttons(
    host: &dyn ContentHost,
    doc: &DocHandle,
) -> Result<Vec<(ElementHandle, String)>> {
    let mut out = Vec::new();
    for el in host.query(doc, &crate::vocab::buttons()).await? {
        let text = host.text(&el).await.unwrap_or_default();
        out.push((el, text.trim().to_string()));
    }
    Ok(out)
}
