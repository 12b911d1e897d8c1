//! Liveness heuristic comparing successive text snapshots of the surface.
//!
//! The target gives no callback when its UI freezes, so the only signal we
//! have is "nothing changed for a while". This is not a correctness check;
//! a long video legitimately produces identical snapshots, which is why the
//! threshold is generous and the reaction is a gentle state reset rather
//! than anything destructive.

use tracing::warn;

use crate::state::SessionState;

/// Consecutive identical snapshots tolerated before signalling stuck.
pub const STUCK_LIMIT: u32 = 8;

/// Feed this tick's snapshot. Returns `true` when the surface has been
/// identical for more than [`STUCK_LIMIT`] consecutive ticks; the counter
/// resets and the media/click suppression state is cleared so the next
/// ticks can retry actions that previously appeared to succeed.
pub fn observe(state: &mut SessionState, snapshot: &str) -> bool {
    if snapshot == state.last_page_text {
        state.stuck_count += 1;
        if state.stuck_count > STUCK_LIMIT {
            warn!(ticks = state.stuck_count, "surface frozen; resetting action state");
            state.media_playing = false;
            state.last_clicked = None;
            state.stuck_count = 0;
            return true;
        }
    } else {
        state.stuck_count = 0;
        state.last_page_text = snapshot.to_string();
    }
    false
}
