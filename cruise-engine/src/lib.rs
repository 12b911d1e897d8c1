//! Adaptive automation engine for embedded training modules.
//!
//! The engine locates the active content surface inside a tree of nested
//! frame-like documents, decides which action applies at each moment, and
//! performs it, repeating on a fixed cadence until the module signals
//! completion. It assumes nothing about the target beyond a narrow element
//! vocabulary (advance controls, media, drag items, question markers) and
//! never waits for the target to acknowledge anything: success is inferred
//! from what the next tick observes.
//!
//! # Overview
//!
//! - [`locate`]: finds the active document among nested frames
//! - [`state::SessionState`]: the per-run progress record handlers mutate
//! - [`stuck`]: snapshot comparison that detects a frozen surface
//! - [`handlers`]: the prioritised action strategies
//! - [`Engine`]: the tick scheduler and operator control surface
//!
//! Every tick is fault-isolated: a failing handler logs and costs one tick,
//! never the scheduler.

pub mod engine;
pub mod fingerprint;
pub mod handlers;
pub mod locate;
pub mod state;
pub mod stuck;
pub mod vocab;

pub use engine::{DebugReport, Engine, EngineStats, TickOutcome};
pub use fingerprint::Fingerprint;
pub use handlers::{standard_pipeline, Handler, Tick};
pub use locate::{locate, LocatedContent};
pub use state::{SessionState, StatsSnapshot};
