//! Finds the active content surface among nested frame-like documents.
//!
//! The module content usually renders inside a relay frame, but hosts nest
//! it unpredictably, so after the well-known identifiers miss we walk the
//! frame tree with an explicit frontier and a hard depth bound. Frames we
//! cannot inspect (cross-origin) are capability misses, not errors: the
//! branch is skipped and the search continues with its siblings.

use anyhow::Result;
use cruise_dom::{ContentHost, DocHandle, FrameHandle};
use tracing::debug;

use crate::vocab;

/// The document the engine will act on this tick, plus where it was found.
/// Recomputed every tick, never persisted; provenance is diagnostic only.
#[derive(Debug, Clone)]
pub struct LocatedContent {
    pub doc: DocHandle,
    pub provenance: String,
}

/// Locate the active content document. `Ok(None)` means "not ready yet".
///
/// Priority: named relay frame, named fallback frame, depth-first search in
/// traversal order (max depth 3), then the root document itself if it
/// independently qualifies.
pub async fn locate(host: &dyn ContentHost) -> Result<Option<LocatedContent>> {
    let root = host.root();
    let frames = host.frames(&root).await?;

    for (frame_id, provenance) in [
        (vocab::RELAY_FRAME_ID, "relay-frame"),
        (vocab::FALLBACK_FRAME_ID, "fallback-frame"),
    ] {
        if let Some(frame) = frames
            .iter()
            .find(|f| f.element_id.as_deref() == Some(frame_id))
        {
            if let Some(doc) = open_if_qualifying(host, frame).await? {
                return Ok(Some(LocatedContent {
                    doc,
                    provenance: provenance.to_string(),
                }));
            }
        }
    }

    // Explicit frontier, depth-first: push children in reverse so the first
    // frame in document order is explored first.
    let mut frontier: Vec<(FrameHandle, usize)> =
        frames.into_iter().rev().map(|f| (f, 0)).collect();
    while let Some((frame, depth)) = frontier.pop() {
        let Some(doc) = host.open_frame(&frame).await? else {
            debug!(index = frame.index, "frame not accessible; skipping branch");
            continue;
        };
        if has_content(host, &doc).await? {
            let label = frame.element_id.as_deref().unwrap_or("unnamed");
            return Ok(Some(LocatedContent {
                doc,
                provenance: format!("frame-{label}-depth-{depth}"),
            }));
        }
        if depth < vocab::MAX_FRAME_DEPTH {
            let children = host.frames(&doc).await?;
            for child in children.into_iter().rev() {
                frontier.push((child, depth + 1));
            }
        }
    }

    if has_content(host, &root).await? {
        return Ok(Some(LocatedContent {
            doc: root,
            provenance: "root-document".to_string(),
        }));
    }

    Ok(None)
}

async fn open_if_qualifying(
    host: &dyn ContentHost,
    frame: &FrameHandle,
) -> Result<Option<DocHandle>> {
    let Some(doc) = host.open_frame(frame).await? else {
        return Ok(None);
    };
    if has_content(host, &doc).await? {
        Ok(Some(doc))
    } else {
        Ok(None)
    }
}

/// A document qualifies when it contains at least one element of the
/// vocabulary the handlers act on.
async fn has_content(host: &dyn ContentHost, doc: &DocHandle) -> Result<bool> {
    for selector in [
        vocab::buttons(),
        vocab::audio(),
        vocab::video(),
        vocab::drag_items(),
        vocab::question_titles(),
    ] {
        if !host.query(doc, &selector).await?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use cruise_dom::scripted::{ElementSpec, ScriptedHost};
    use cruise_dom::ContentHost;

    use super::*;

    fn button(host: &ScriptedHost, doc: &DocHandle) {
        host.add_element(doc, ElementSpec::button("Next"));
    }

    #[tokio::test]
    async fn relay_frame_wins_over_everything() {
        let host = ScriptedHost::new();
        let root = host.root();
        let relay = host.add_doc("relay");
        let other = host.add_doc("other");
        host.add_frame(&root, Some("other"), &other, true);
        host.add_frame(&root, Some(vocab::RELAY_FRAME_ID), &relay, true);
        button(&host, &relay);
        button(&host, &other);
        button(&host, &root);

        let located = locate(&host).await.unwrap().unwrap();
        assert_eq!(located.doc, relay);
        assert_eq!(located.provenance, "relay-frame");
    }

    #[tokio::test]
    async fn empty_relay_falls_through_to_search() {
        let host = ScriptedHost::new();
        let root = host.root();
        let relay = host.add_doc("relay");
        let nested = host.add_doc("nested");
        host.add_frame(&root, Some(vocab::RELAY_FRAME_ID), &relay, true);
        host.add_frame(&relay, Some("inner"), &nested, true);
        button(&host, &nested);

        let located = locate(&host).await.unwrap().unwrap();
        assert_eq!(located.doc, nested);
        assert_eq!(located.provenance, "frame-inner-depth-1");
    }

    #[tokio::test]
    async fn cross_origin_branches_are_skipped_silently() {
        let host = ScriptedHost::new();
        let root = host.root();
        let blocked = host.add_doc("blocked");
        let open = host.add_doc("open");
        host.add_frame(&root, Some("vendor"), &blocked, false);
        host.add_frame(&root, Some("content"), &open, true);
        button(&host, &blocked);
        button(&host, &open);

        let located = locate(&host).await.unwrap().unwrap();
        assert_eq!(located.doc, open);
    }

    #[tokio::test]
    async fn search_respects_the_depth_bound() {
        let host = ScriptedHost::new();
        let root = host.root();
        let mut parent = root.clone();
        // Frames at recursion depths 0..=3 are searched; one level further
        // is not.
        for depth in 0..5 {
            let child = host.add_doc(format!("d{depth}"));
            host.add_frame(&parent, None, &child, true);
            parent = child;
        }
        button(&host, &parent);
        assert!(locate(&host).await.unwrap().is_none());

        let reachable = host.add_doc("reachable");
        host.add_frame(&host.add_doc("d2"), Some("leaf"), &reachable, true);
        button(&host, &reachable);
        let located = locate(&host).await.unwrap().unwrap();
        assert_eq!(located.provenance, "frame-leaf-depth-3");
    }

    #[tokio::test]
    async fn root_qualifies_last() {
        let host = ScriptedHost::new();
        let root = host.root();
        let empty = host.add_doc("empty");
        host.add_frame(&root, None, &empty, true);
        button(&host, &root);

        let located = locate(&host).await.unwrap().unwrap();
        assert_eq!(located.doc, root);
        assert_eq!(located.provenance, "root-document");
    }

    #[tokio::test]
    async fn nothing_qualifying_is_not_an_error() {
        let host = ScriptedHost::new();
        assert!(locate(&host).await.unwrap().is_none());
    }
}
