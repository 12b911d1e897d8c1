//! The document-like tree contract consumed by the automation engine.
//!
//! The engine never talks to a browser directly; it talks to a
//! [`ContentHost`], a capability surface over whatever runtime actually
//! renders the training module. Two implementations exist:
//!
//! - [`scripted::ScriptedHost`]: a fully in-memory tree, mutable between
//!   ticks, used by tests and demos
//! - `WebDriverHost` (in the drivers crate): the live-browser adapter
//!
//! The contract is deliberately narrow: query by identifier or typed
//! [`Selector`], read text/attributes/visibility, dispatch synthetic input,
//! and drive media playback. The host exposes no events the engine could
//! subscribe to, with one advisory exception ([`ContentHost::watch_ended`]);
//! everything else is inferred by re-observing on the next tick.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod scripted;

/// Errors surfaced by a [`ContentHost`].
#[derive(thiserror::Error, Debug)]
pub enum HostError {
    /// The referenced element is gone from the tree.
    #[error("element no longer attached: {0}")]
    Detached(String),

    /// A nested document exists but may not be inspected (cross-origin).
    #[error("document access denied: {0}")]
    Denied(String),

    /// The medium refused the requested playback rate.
    #[error("playback rate {0} rejected by medium")]
    RateRejected(f64),

    /// The backing runtime failed in a way the engine cannot interpret.
    #[error("host backend error: {0}")]
    Backend(String),
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Opaque reference to one document in the nested-frame tree.
///
/// The inner path is diagnostic only; the engine never parses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocHandle(pub String);

impl std::fmt::Display for DocHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A frame-like child of a document, before it has been opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    /// Document the frame element lives in.
    pub doc: DocHandle,
    /// Position among the document's frames, in document order.
    pub index: usize,
    /// The frame element's identifier attribute, when present.
    pub element_id: Option<String>,
}

/// Opaque reference to one element inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub doc: DocHandle,
    pub key: String,
}

impl ElementHandle {
    /// Stable string identity, usable as a set key across ticks.
    pub fn slot(&self) -> String {
        format!("{}#{}", self.doc.0, self.key)
    }
}

/// Typed element query, convertible to a CSS selector for live backends.
///
/// ```
/// use cruise_dom::Selector;
///
/// let sel = Selector::all_of([
///     Selector::tag("button"),
///     Selector::attr_contains("aria-label", "Play"),
/// ]);
/// assert_eq!(sel.css(), r#"button[aria-label*="Play"]"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Class(String),
    /// Matches when the raw class attribute contains the needle anywhere.
    ClassContains(String),
    HasAttr(String),
    AttrContains { attr: String, needle: String },
    AllOf(Vec<Selector>),
    /// Descendant of any element matching `ancestor`.
    Within {
        ancestor: Box<Selector>,
        target: Box<Selector>,
    },
}

impl Selector {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::Class(class.into())
    }

    pub fn class_contains(needle: impl Into<String>) -> Self {
        Self::ClassContains(needle.into())
    }

    pub fn has_attr(attr: impl Into<String>) -> Self {
        Self::HasAttr(attr.into())
    }

    pub fn attr_contains(attr: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::AttrContains {
            attr: attr.into(),
            needle: needle.into(),
        }
    }

    pub fn all_of(parts: impl IntoIterator<Item = Selector>) -> Self {
        Self::AllOf(parts.into_iter().collect())
    }

    pub fn within(ancestor: Selector, target: Selector) -> Self {
        Self::Within {
            ancestor: Box::new(ancestor),
            target: Box::new(target),
        }
    }

    /// Render as a CSS selector string for backends that speak CSS.
    pub fn css(&self) -> String {
        match self {
            Self::Tag(t) => t.clone(),
            Self::Class(c) => format!(".{c}"),
            Self::ClassContains(n) => format!(r#"[class*="{n}"]"#),
            Self::HasAttr(a) => format!("[{a}]"),
            Self::AttrContains { attr, needle } => format!(r#"[{attr}*="{needle}"]"#),
            Self::AllOf(parts) => parts.iter().map(Selector::css).collect(),
            Self::Within { ancestor, target } => format!("{} {}", ancestor.css(), target.css()),
        }
    }
}

/// Keys the engine dispatches as interaction fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Space,
    Enter,
}

/// Synthetic input dispatched at an element.
///
/// The engine fires several of these per logical interaction because it
/// cannot know which mechanism the target's widgets are actually bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerDown,
    PointerMove,
    PointerUp,
    KeyDown(Key),
    TouchStart,
    TouchEnd,
}

/// Point-in-time observation of a media element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSnapshot {
    pub has_source: bool,
    pub paused: bool,
    /// Enough data buffered for playback to start.
    pub ready: bool,
    pub duration: Option<f64>,
    pub position: f64,
    pub playback_rate: f64,
    /// Advisory completion notification observed (see [`ContentHost::watch_ended`]).
    pub ended: bool,
}

/// Capability surface over a tree of nested, frame-like documents.
///
/// All operations are point-in-time reads or fire-and-forget writes; the
/// tree may change arbitrarily between any two calls. Implementations must
/// map "element disappeared" to [`HostError::Detached`] rather than
/// panicking, and must express cross-origin frame boundaries as
/// `Ok(None)` from [`ContentHost::open_frame`], never as a hard error.
#[async_trait]
pub trait ContentHost: Send + Sync {
    /// The root document of the tree.
    fn root(&self) -> DocHandle;

    /// Frame-like children of `doc`, in document order.
    async fn frames(&self, doc: &DocHandle) -> HostResult<Vec<FrameHandle>>;

    /// Open a frame's nested document. `None` means the document is not
    /// same-origin-accessible; the caller should skip that branch.
    async fn open_frame(&self, frame: &FrameHandle) -> HostResult<Option<DocHandle>>;

    async fn find_by_id(&self, doc: &DocHandle, id: &str) -> HostResult<Option<ElementHandle>>;

    async fn query(&self, doc: &DocHandle, selector: &Selector) -> HostResult<Vec<ElementHandle>>;

    /// Full rendered text of the document body.
    async fn body_text(&self, doc: &DocHandle) -> HostResult<String>;

    async fn text(&self, el: &ElementHandle) -> HostResult<String>;

    async fn attr(&self, el: &ElementHandle, name: &str) -> HostResult<Option<String>>;

    async fn set_attr(&self, el: &ElementHandle, name: &str, value: &str) -> HostResult<()>;

    async fn is_visible(&self, el: &ElementHandle) -> HostResult<bool>;

    async fn is_enabled(&self, el: &ElementHandle) -> HostResult<bool>;

    /// Rendered height in pixels; 0 for collapsed elements.
    async fn height(&self, el: &ElementHandle) -> HostResult<f64>;

    async fn click(&self, el: &ElementHandle) -> HostResult<()>;

    async fn focus(&self, el: &ElementHandle) -> HostResult<()>;

    async fn dispatch(&self, el: &ElementHandle, event: InputEvent) -> HostResult<()>;

    async fn media(&self, el: &ElementHandle) -> HostResult<MediaSnapshot>;

    /// Request a playback rate. [`HostError::RateRejected`] when the medium
    /// refuses the value; the caller is expected to fall back.
    async fn set_playback_rate(&self, el: &ElementHandle, rate: f64) -> HostResult<()>;

    /// Best-effort playback start.
    async fn play(&self, el: &ElementHandle) -> HostResult<()>;

    /// Subscribe to the medium's advisory completion notification. Safe to
    /// call more than once; callers still guard with their own per-element
    /// flag so live backends install at most one listener.
    async fn watch_ended(&self, el: &ElementHandle) -> HostResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_rendering() {
        assert_eq!(Selector::tag("audio").css(), "audio");
        assert_eq!(Selector::class("DragAndDropItem").css(), ".DragAndDropItem");
        assert_eq!(Selector::class_contains("sc-").css(), r#"[class*="sc-"]"#);
        assert_eq!(
            Selector::all_of([
                Selector::tag("button"),
                Selector::class("pressable"),
                Selector::has_attr("data-item-id"),
            ])
            .css(),
            "button.pressable[data-item-id]"
        );
        assert_eq!(
            Selector::within(Selector::tag("fieldset"), Selector::tag("button")).css(),
            "fieldset button"
        );
    }

    #[test]
    fn element_slots_are_distinct_across_docs() {
        let a = ElementHandle {
            doc: DocHandle("root".into()),
            key: "7".into(),
        };
        let b = ElementHandle {
            doc: DocHandle("root/0".into()),
            key: "7".into(),
        };
        assert_ne!(a.slot(), b.slot());
    }
}
