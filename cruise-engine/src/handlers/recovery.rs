//! Last-resort recovery, consulted only when the stuck detector fired and
//! no other handler acted: one best-effort click on the first real button.

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use super::{usable, Handler, Tick};

/// Buttons shorter than this are decorative chrome, not actions.
const MIN_CONTROL_HEIGHT: f64 = 20.0;

pub struct RecoveryHandler;

#[async_trait]
impl Handler for RecoveryHandler {
    fn name(&self) -> &'static str {
        "recovery"
    }

    async fn attempt(&self, tick: &mut Tick<'_>) -> Result<bool> {
        if !tick.stuck {
            return Ok(false);
        }

        for (el, text) in super::labelled_buttons(tick.host, tick.doc).await? {
            if !usable(tick.host, &el).await {
                continue;
            }
            if tick.host.height(&el).await.unwrap_or(0.0) <= MIN_CONTROL_HEIGHT {
                continue;
            }
            match tick.host.click(&el).await {
                Ok(()) => info!(control = %text, "recovery click"),
                Err(e) => debug!(control = %text, error = %e, "recovery click failed"),
            }
            // Single attempt, no bookkeeping; the next tick observes what
            // changed.
            return Ok(true);
        }

        Ok(false)
    }
}
