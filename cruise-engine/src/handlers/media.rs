//! Audio/video handler: start playback, pin the fastest accepted rate, and
//! watch for completion.
//!
//! Everything here is best-effort. Playback faults, rejected rates, and
//! widgets that ignore a channel are expected; the handler falls through to
//! the next mechanism and lets the following tick observe what stuck.

use anyhow::Result;
use async_trait::async_trait;
use cruise_dom::{ContentHost, DocHandle, ElementHandle, HostError};
use tracing::{debug, info};

use super::{usable, Handler, Tick};
use crate::vocab;

/// Descending rates tried when the configured rate is rejected; the first
/// accepted value wins.
const RATE_FALLBACKS: [f64; 6] = [16.0, 12.0, 10.0, 8.0, 4.0, 2.0];

/// A medium counts as finished this close to its end.
const COMPLETION_EPSILON: f64 = 0.1;

pub struct MediaHandler;

#[async_trait]
impl Handler for MediaHandler {
    fn name(&self) -> &'static str {
        "media"
    }

    async fn attempt(&self, tick: &mut Tick<'_>) -> Result<bool> {
        let mut elements = tick.host.query(tick.doc, &vocab::audio()).await?;
        elements.extend(tick.host.query(tick.doc, &vocab::video()).await?);
        if elements.is_empty() {
            return Ok(false);
        }

        let mut handled = false;

        if !tick.state.media_playing {
            if let Some(control) = find_play_control(tick.host, tick.doc).await? {
                match tick.host.click(&control).await {
                    Ok(()) => {
                        info!("started media via play control");
                        tick.state.media_playing = true;
                        handled = true;
                    }
                    Err(e) => debug!(error = %e, "play control activation failed"),
                }
            }
        }

        for el in &elements {
            let snapshot = match tick.host.media(el).await {
                Ok(s) => s,
                Err(e) => {
                    debug!(element = %el.slot(), error = %e, "media snapshot failed");
                    continue;
                }
            };

            if snapshot.has_source && !snapshot.paused {
                if (snapshot.playback_rate - tick.settings.playback_rate).abs() > f64::EPSILON {
                    apply_rate(tick.host, el, tick.settings.playback_rate).await;
                }
                tick.state.media_playing = true;

                if tick.state.watched_media.insert(el.slot()) {
                    if let Err(e) = tick.host.watch_ended(el).await {
                        debug!(element = %el.slot(), error = %e, "ended watch failed");
                    }
                }

                let at_end = snapshot
                    .duration
                    .map(|d| snapshot.position >= d - COMPLETION_EPSILON)
                    .unwrap_or(false);
                if snapshot.ended || at_end {
                    info!(element = %el.slot(), "medium completed");
                    tick.state.media_playing = false;
                    tick.state.media_completed = true;
                }
                handled = true;
            } else if snapshot.has_source
                && snapshot.paused
                && snapshot.ready
                && !tick.state.media_completed
            {
                apply_rate(tick.host, el, tick.settings.playback_rate).await;
                match tick.host.play(el).await {
                    Ok(()) => info!(element = %el.slot(), "started playback programmatically"),
                    Err(e) => debug!(element = %el.slot(), error = %e, "playback start failed"),
                }
                tick.state.media_playing = true;
                handled = true;
            }
        }

        Ok(handled)
    }
}

/// Pin `preferred`, falling back through [`RATE_FALLBACKS`] on rejection.
async fn apply_rate(host: &dyn ContentHost, el: &ElementHandle, preferred: f64) {
    match host.set_playback_rate(el, preferred).await {
        Ok(()) => return,
        Err(HostError::RateRejected(_)) => {}
        Err(e) => {
            debug!(element = %el.slot(), error = %e, "rate change failed");
            return;
        }
    }
    for rate in RATE_FALLBACKS {
        match host.set_playback_rate(el, rate).await {
            Ok(()) => {
                debug!(element = %el.slot(), rate, "fallback playback rate applied");
                return;
            }
            Err(_) => continue,
        }
    }
    debug!(element = %el.slot(), "no playback rate accepted");
}

/// Ordered play-control search: known signatures, accessibility labels and
/// player chrome, then a broad keyword scan over every button.
async fn find_play_control(
    host: &dyn ContentHost,
    doc: &DocHandle,
) -> Result<Option<ElementHandle>> {
    for selector in vocab::play_control_strategies() {
        for el in host.query(doc, &selector).await? {
            if usable(host, &el).await {
                return Ok(Some(el));
            }
        }
    }

    for el in host.query(doc, &vocab::buttons()).await? {
        if !usable(host, &el).await {
            continue;
        }
        let aria = host.attr(&el, "aria-label").await?.unwrap_or_default();
        let title = host.attr(&el, "title").await?.unwrap_or_default();
        let class = host.attr(&el, "class").await?.unwrap_or_default();
        if aria.to_lowercase().contains("play")
            || title.to_lowercase().contains("play")
            || class.contains("play")
        {
            return Ok(Some(el));
        }
    }

    Ok(None)
}
