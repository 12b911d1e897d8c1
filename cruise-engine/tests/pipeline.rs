//! End-to-end pipeline scenarios against the scripted host.

mod common;

use std::sync::Arc;

use cruise_common::{AnswerLexicons, CompletionPhrases, EngineSettings};
use cruise_dom::scripted::{ElementSpec, MediaModel, ScriptedHost};
use cruise_dom::{ContentHost, DocHandle};
use cruise_engine::{vocab, Engine, TickOutcome};
use tokio::time::Duration;

fn engine_on(host: &ScriptedHost) -> Engine {
    common::init_test_tracing();
    Engine::new(
        Arc::new(host.clone()),
        EngineSettings::default(),
        AnswerLexicons::default(),
        CompletionPhrases::default(),
    )
}

/// A content document inside the relay frame, the shape real modules have.
fn relay_doc(host: &ScriptedHost) -> DocHandle {
    let doc = host.add_doc("content");
    host.add_frame(&host.root(), Some(vocab::RELAY_FRAME_ID), &doc, true);
    doc
}

#[tokio::test(start_paused = true)]
async fn navigation_preempts_playable_media() {
    let host = ScriptedHost::new();
    let doc = relay_doc(&host);
    let next = host.add_element(&doc, ElementSpec::button("Next").id(vocab::ADVANCE_CONTROL_ID));
    let audio = host.add_element(
        &doc,
        ElementSpec::new("audio").media(MediaModel {
            paused: true,
            ready: true,
            duration: Some(60.0),
            ..MediaModel::default()
        }),
    );

    let engine = engine_on(&host);
    assert_eq!(engine.run_once().await, TickOutcome::Acted("navigation"));

    // Only the advance control was touched; the medium was left alone.
    assert_eq!(host.clicks(), vec![next.slot()]);
    assert!(host.media(&audio).await.unwrap().paused);
}

#[tokio::test(start_paused = true)]
async fn a_section_walkthrough_media_then_quiz_then_advance() {
    let host = ScriptedHost::new();
    let doc = relay_doc(&host);
    let audio = host.add_element(
        &doc,
        ElementSpec::new("audio").media(MediaModel {
            paused: true,
            ready: true,
            duration: Some(30.0),
            ..MediaModel::default()
        }),
    );
    host.set_body_text(&doc, "Listen to the narration");

    let engine = engine_on(&host);

    // Tick 1: nothing else applies, the medium is resumed.
    assert_eq!(engine.run_once().await, TickOutcome::Acted("media"));
    assert!(!host.media(&audio).await.unwrap().paused);

    // The narration finishes; the module swaps in a question.
    host.update_media(&audio, |m| {
        m.position = 29.95;
    });
    host.set_body_text(&doc, "Question time");
    assert_eq!(engine.run_once().await, TickOutcome::Acted("media"));

    host.remove_element(&audio);
    host.add_element(
        &doc,
        ElementSpec::new("div")
            .attr("data-id", "q1_body")
            .text("Employees must report harassment to their supervisor. True or False?"),
    );
    let truthy = host.add_element(&doc, ElementSpec::button("True").class("pressable"));
    host.add_element(&doc, ElementSpec::button("False").class("pressable"));
    host.set_body_text(&doc, "Question shown");

    assert_eq!(engine.run_once().await, TickOutcome::Acted("choice-quiz"));
    assert!(host.clicks().contains(&truthy.slot()));

    // The module acknowledges and offers the advance control.
    let next = host.add_element(&doc, ElementSpec::button("Next").id(vocab::ADVANCE_CONTROL_ID));
    host.set_body_text(&doc, "Correct!");
    assert_eq!(engine.run_once().await, TickOutcome::Acted("navigation"));
    assert!(host.clicks().contains(&next.slot()));

    let stats = engine.stats().await;
    assert_eq!(stats.session.questions_answered, 1);
    assert!(!stats.completed);
}

#[tokio::test(start_paused = true)]
async fn drag_quiz_dedup_survives_section_changes() {
    let host = ScriptedHost::new();
    let doc = relay_doc(&host);
    let question =
        "Select all that apply: which of these are federally protected characteristics?";
    host.add_element(
        &doc,
        ElementSpec::new("h1").attr("data-id", "q_title").text(question),
    );
    host.add_element(&doc, ElementSpec::new("div").id(vocab::DROP_ZONE_ID));
    host.add_element(
        &doc,
        ElementSpec::new("div")
            .class("DragAndDropItem")
            .attr("data-item-id", "0")
            .text("Religion"),
    );

    let engine = engine_on(&host);
    assert_eq!(engine.run_once().await, TickOutcome::Acted("drag-drop-quiz"));

    // An advance control appears; navigation resets section flags but must
    // not reopen the question.
    let next = host.add_element(&doc, ElementSpec::button("Next").id(vocab::ADVANCE_CONTROL_ID));
    host.set_body_text(&doc, "moving on");
    assert_eq!(engine.run_once().await, TickOutcome::Acted("navigation"));
    host.remove_element(&next);
    host.clear_activity();

    // Past the cool-down, with section flags clear, the identical question
    // recurs. The permanent ledger still refuses it.
    tokio::time::advance(Duration::from_millis(20_000)).await;
    host.set_body_text(&doc, "the same question again");
    assert_eq!(engine.run_once().await, TickOutcome::Idle);
    assert!(host.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn completion_stops_the_scheduler_for_good() {
    let host = ScriptedHost::new();
    let doc = relay_doc(&host);
    let replay = host.add_element(&doc, ElementSpec::button("Replay"));
    host.set_body_text(&doc, "Congratulations, you have completed the course");

    let engine = engine_on(&host);
    engine.start();

    // First scheduled tick fires immediately and detects completion.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(engine.is_completed());
    assert!(!engine.is_running());

    // No further ticks: nothing ever gets clicked.
    tokio::time::sleep(Duration::from_millis(5_000)).await;
    assert!(host.clicks().is_empty());
    let _ = replay;
}

#[tokio::test(start_paused = true)]
async fn stuck_surface_triggers_recovery_then_counts_reset() {
    let host = ScriptedHost::new();
    let doc = relay_doc(&host);
    // A button the handlers have no use for: not an advance control, no
    // media, no quiz markers.
    let lonely = host.add_element(&doc, ElementSpec::button("Begin"));
    host.set_body_text(&doc, "splash screen");

    let engine = engine_on(&host);

    // First sighting plus eight identical ticks: no recovery yet.
    for _ in 0..9 {
        assert_eq!(engine.run_once().await, TickOutcome::Idle);
    }
    assert!(host.clicks().is_empty());

    // The ninth identical repeat trips the detector and recovery clicks.
    assert_eq!(engine.run_once().await, TickOutcome::Acted("recovery"));
    assert_eq!(host.clicks(), vec![lonely.slot()]);
}

#[tokio::test(start_paused = true)]
async fn start_is_idempotent_and_stop_reports_counters() {
    let host = ScriptedHost::new();
    let doc = relay_doc(&host);
    host.add_element(
        &doc,
        ElementSpec::new("div")
            .attr("data-id", "q_body")
            .text("Employees must report harassment to their supervisor. True or False?"),
    );
    host.add_element(&doc, ElementSpec::button("True").class("pressable"));
    host.add_element(&doc, ElementSpec::button("False").class("pressable"));

    let engine = engine_on(&host);
    engine.start();
    engine.start(); // supersedes the first ticker rather than doubling up

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let final_stats = engine.stop().await;
    assert_eq!(final_stats.questions_answered, 1);
    assert!(!engine.is_running());
}
