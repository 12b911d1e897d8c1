//! The narrow element vocabulary of the target module family.
//!
//! Everything the engine knows about the target's markup lives here:
//! well-known identifiers, the styled-component class signatures its widgets
//! carry, and the ordered selector strategies the handlers walk. Porting the
//! engine to a different module vendor means editing this file and the
//! lexicon tables, nothing else.

use cruise_dom::Selector;

/// Primary relay frame the module is usually embedded in.
pub const RELAY_FRAME_ID: &str = "contentRelay";
/// Secondary frame id some hosts use instead of the relay.
pub const FALLBACK_FRAME_ID: &str = "scorm-iframe";
/// Well-known id of the advance control.
pub const ADVANCE_CONTROL_ID: &str = "nextBtn";
/// Drop target of the drag-and-drop quiz.
pub const DROP_ZONE_ID: &str = "drop_zone_box";

/// Nested-frame search depth bound.
pub const MAX_FRAME_DEPTH: usize = 3;

/// Marker substrings on `data-id` attributes of question elements.
pub const QUESTION_TITLE_MARKER: &str = "_title";
pub const QUESTION_BODY_MARKER: &str = "_body";

pub fn buttons() -> Selector {
    Selector::tag("button")
}

pub fn audio() -> Selector {
    Selector::tag("audio")
}

pub fn video() -> Selector {
    Selector::tag("video")
}

pub fn drag_items() -> Selector {
    Selector::all_of([
        Selector::class("DragAndDropItem"),
        Selector::has_attr("data-item-id"),
    ])
}

pub fn question_titles() -> Selector {
    Selector::attr_contains("data-id", QUESTION_TITLE_MARKER)
}

/// Play-control strategies, most specific first. The leading entries are the
/// target's known styled-component signatures; the tail is generic player
/// chrome.
pub fn play_control_strategies() -> Vec<Selector> {
    vec![
        Selector::all_of([
            Selector::tag("button"),
            Selector::class("sc-isRoRg"),
            Selector::class("ftWxPu"),
        ]),
        Selector::all_of([
            Selector::tag("button"),
            Selector::attr_contains("aria-label", "Play"),
        ]),
        Selector::all_of([
            Selector::tag("button"),
            Selector::attr_contains("title", "Play"),
        ]),
        Selector::class("vjs-big-play-button"),
        Selector::class("vjs-play-control"),
        Selector::all_of([Selector::tag("button"), Selector::class("sc-isRoRg")]),
    ]
}

/// Answer-control strategies for the choice quiz, first hit wins.
pub fn answer_control_strategies() -> Vec<Selector> {
    vec![
        Selector::all_of([Selector::tag("button"), Selector::class("pressable")]),
        Selector::all_of([Selector::tag("button"), Selector::class("sc-gbWDHf")]),
        Selector::within(Selector::tag("fieldset"), Selector::tag("button")),
        Selector::all_of([Selector::tag("button"), Selector::class("sc-WsMwQ")]),
        Selector::all_of([Selector::tag("button"), Selector::class_contains("sc-")]),
    ]
}

/// Question-text sources for the choice quiz, first sufficiently long
/// candidate wins.
pub fn question_text_strategies() -> Vec<Selector> {
    vec![
        Selector::attr_contains("data-id", QUESTION_BODY_MARKER),
        Selector::class("sc-xwuxA"),
        Selector::within(Selector::class("sc-bXCLTC"), Selector::tag("p")),
        Selector::tag("h3"),
        Selector::class("question-text"),
    ]
}
