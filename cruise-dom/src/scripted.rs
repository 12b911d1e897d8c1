//! In-memory [`ContentHost`] with a scriptable document tree.
//!
//! Tests build a tree up front, hand a clone of the host to the engine, and
//! mutate the tree between ticks to simulate the target module changing
//! underneath the automation, which is the same observability model the
//! engine has against a live browser. Clicks, dispatched events, and focus
//! changes are recorded so assertions can check what the engine actually
//! did.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    ContentHost, DocHandle, ElementHandle, FrameHandle, HostError, HostResult, InputEvent,
    MediaSnapshot, Selector,
};

/// Playback behavior of a scripted media element.
#[derive(Debug, Clone)]
pub struct MediaModel {
    pub has_source: bool,
    pub paused: bool,
    pub ready: bool,
    pub duration: Option<f64>,
    pub position: f64,
    pub playback_rate: f64,
    /// When set, only these rates are accepted; others are rejected.
    pub accepted_rates: Option<Vec<f64>>,
    pub ended: bool,
    pub watched: bool,
}

impl Default for MediaModel {
    fn default() -> Self {
        Self {
            has_source: true,
            paused: true,
            ready: true,
            duration: None,
            position: 0.0,
            playback_rate: 1.0,
            accepted_rates: None,
            ended: false,
            watched: false,
        }
    }
}

#[derive(Debug, Clone)]
struct ElementNode {
    key: String,
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: HashMap<String, String>,
    ancestors: Vec<String>,
    text: String,
    visible: bool,
    enabled: bool,
    height: f64,
    media: Option<MediaModel>,
}

/// Fluent description of one element, consumed by [`ScriptedHost::add_element`].
#[derive(Debug, Clone)]
pub struct ElementSpec {
    node: ElementNode,
}

impl ElementSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            node: ElementNode {
                key: String::new(),
                tag: tag.into(),
                id: None,
                classes: Vec::new(),
                attrs: HashMap::new(),
                ancestors: Vec::new(),
                text: String::new(),
                visible: true,
                enabled: true,
                height: 40.0,
                media: None,
            },
        }
    }

    pub fn button(text: impl Into<String>) -> Self {
        Self::new("button").text(text)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.node.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.node.classes.push(class.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.node.attrs.insert(name.into(), value.into());
        self
    }

    /// Record an ancestor label (tag or class name) for descendant
    /// selectors.
    pub fn inside(mut self, ancestor: impl Into<String>) -> Self {
        self.node.ancestors.push(ancestor.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.node.text = text.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.node.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.node.enabled = false;
        self
    }

    pub fn height(mut self, height: f64) -> Self {
        self.node.height = height;
        self
    }

    pub fn media(mut self, media: MediaModel) -> Self {
        self.node.media = Some(media);
        self
    }
}

#[derive(Debug, Clone)]
struct FrameNode {
    element_id: Option<String>,
    same_origin: bool,
    doc_key: String,
}

#[derive(Debug, Default)]
struct DocNode {
    frames: Vec<FrameNode>,
    elements: Vec<ElementNode>,
    body_text: Option<String>,
}

#[derive(Debug, Default)]
struct World {
    docs: HashMap<String, DocNode>,
    next_key: u64,
    clicks: Vec<String>,
    events: Vec<(String, InputEvent)>,
    focused: Vec<String>,
}

/// Scriptable in-memory document tree. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct ScriptedHost {
    world: Arc<Mutex<World>>,
}

pub const ROOT_DOC: &str = "root";

impl ScriptedHost {
    pub fn new() -> Self {
        let host = Self::default();
        host.world
            .lock()
            .unwrap()
            .docs
            .insert(ROOT_DOC.to_string(), DocNode::default());
        host
    }

    /// Register an empty document that a frame can later point at.
    pub fn add_doc(&self, key: impl Into<String>) -> DocHandle {
        let key = key.into();
        self.world
            .lock()
            .unwrap()
            .docs
            .entry(key.clone())
            .or_default();
        DocHandle(key)
    }

    /// Attach `child` as a frame of `parent`. Cross-origin frames are added
    /// with `same_origin = false` and refuse to open.
    pub fn add_frame(
        &self,
        parent: &DocHandle,
        element_id: Option<&str>,
        child: &DocHandle,
        same_origin: bool,
    ) {
        let mut world = self.world.lock().unwrap();
        world.docs.entry(child.0.clone()).or_default();
        let parent = world
            .docs
            .get_mut(&parent.0)
            .expect("parent document must exist");
        parent.frames.push(FrameNode {
            element_id: element_id.map(str::to_string),
            same_origin,
            doc_key: child.0.clone(),
        });
    }

    pub fn add_element(&self, doc: &DocHandle, spec: ElementSpec) -> ElementHandle {
        let mut world = self.world.lock().unwrap();
        world.next_key += 1;
        let key = format!("e{}", world.next_key);
        let doc_node = world.docs.get_mut(&doc.0).expect("document must exist");
        let mut node = spec.node;
        node.key = key.clone();
        doc_node.elements.push(node);
        ElementHandle {
            doc: doc.clone(),
            key,
        }
    }

    pub fn remove_element(&self, el: &ElementHandle) {
        let mut world = self.world.lock().unwrap();
        if let Some(doc) = world.docs.get_mut(&el.doc.0) {
            doc.elements.retain(|n| n.key != el.key);
        }
    }

    pub fn set_text(&self, el: &ElementHandle, text: impl Into<String>) {
        self.mutate(el, |n| n.text = text.into());
    }

    pub fn set_enabled(&self, el: &ElementHandle, enabled: bool) {
        self.mutate(el, |n| n.enabled = enabled);
    }

    pub fn set_visible(&self, el: &ElementHandle, visible: bool) {
        self.mutate(el, |n| n.visible = visible);
    }

    /// Override the document's rendered body text (otherwise it is the
    /// concatenation of visible element texts).
    pub fn set_body_text(&self, doc: &DocHandle, text: impl Into<String>) {
        let mut world = self.world.lock().unwrap();
        if let Some(node) = world.docs.get_mut(&doc.0) {
            node.body_text = Some(text.into());
        }
    }

    /// Set an attribute without going through the [`ContentHost`] API (so it
    /// does not show up as engine activity).
    pub fn set_attr_direct(&self, el: &ElementHandle, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.mutate(el, |n| {
            n.attrs.insert(name, value);
        });
    }

    pub fn update_media(&self, el: &ElementHandle, f: impl FnOnce(&mut MediaModel)) {
        self.mutate(el, |n| {
            if let Some(media) = n.media.as_mut() {
                f(media);
            }
        });
    }

    /// Element slots clicked so far, in order.
    pub fn clicks(&self) -> Vec<String> {
        self.world.lock().unwrap().clicks.clone()
    }

    /// Synthetic events dispatched at `el`, in order.
    pub fn events_for(&self, el: &ElementHandle) -> Vec<InputEvent> {
        let slot = el.slot();
        self.world
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|(s, _)| *s == slot)
            .map(|(_, e)| *e)
            .collect()
    }

    pub fn focused(&self) -> Vec<String> {
        self.world.lock().unwrap().focused.clone()
    }

    pub fn clear_activity(&self) {
        let mut world = self.world.lock().unwrap();
        world.clicks.clear();
        world.events.clear();
        world.focused.clear();
    }

    fn mutate(&self, el: &ElementHandle, f: impl FnOnce(&mut ElementNode)) {
        let mut world = self.world.lock().unwrap();
        if let Some(node) = world
            .docs
            .get_mut(&el.doc.0)
            .and_then(|d| d.elements.iter_mut().find(|n| n.key == el.key))
        {
            f(node);
        }
    }

    fn read<T>(
        &self,
        el: &ElementHandle,
        f: impl FnOnce(&ElementNode) -> T,
    ) -> HostResult<T> {
        let world = self.world.lock().unwrap();
        world
            .docs
            .get(&el.doc.0)
            .and_then(|d| d.elements.iter().find(|n| n.key == el.key))
            .map(f)
            .ok_or_else(|| HostError::Detached(el.slot()))
    }

    fn write<T>(
        &self,
        el: &ElementHandle,
        f: impl FnOnce(&mut World, &mut ElementNode) -> HostResult<T>,
    ) -> HostResult<T> {
        let mut world = self.world.lock().unwrap();
        let world = &mut *world;
        let Some(doc) = world.docs.get_mut(&el.doc.0) else {
            return Err(HostError::Detached(el.slot()));
        };
        // Take the node out so the log vectors stay borrowable alongside it.
        let Some(pos) = doc.elements.iter().position(|n| n.key == el.key) else {
            return Err(HostError::Detached(el.slot()));
        };
        let mut node = doc.elements.remove(pos);
        let result = f(world, &mut node);
        world
            .docs
            .get_mut(&el.doc.0)
            .expect("document still present")
            .elements
            .insert(pos, node);
        result
    }
}

fn matches(node: &ElementNode, selector: &Selector) -> bool {
    match selector {
        Selector::Tag(t) => node.tag.eq_ignore_ascii_case(t),
        Selector::Class(c) => node.classes.iter().any(|cls| cls == c),
        Selector::ClassContains(n) => node.classes.iter().any(|cls| cls.contains(n.as_str())),
        Selector::HasAttr(a) => node.attrs.contains_key(a),
        Selector::AttrContains { attr, needle } => node
            .attrs
            .get(attr)
            .map(|v| v.contains(needle.as_str()))
            .unwrap_or(false),
        Selector::AllOf(parts) => parts.iter().all(|p| matches(node, p)),
        // Ancestors are modelled as flat labels (tag or class name), which
        // covers the selector vocabulary the engine uses.
        Selector::Within { ancestor, target } => {
            matches(node, target)
                && match ancestor.as_ref() {
                    Selector::Tag(label) | Selector::Class(label) => node
                        .ancestors
                        .iter()
                        .any(|a| a.eq_ignore_ascii_case(label)),
                    _ => false,
                }
        }
    }
}

#[async_trait]
impl ContentHost for ScriptedHost {
    fn root(&self) -> DocHandle {
        DocHandle(ROOT_DOC.to_string())
    }

    async fn frames(&self, doc: &DocHandle) -> HostResult<Vec<FrameHandle>> {
        let world = self.world.lock().unwrap();
        let node = world
            .docs
            .get(&doc.0)
            .ok_or_else(|| HostError::Detached(doc.0.clone()))?;
        Ok(node
            .frames
            .iter()
            .enumerate()
            .map(|(index, f)| FrameHandle {
                doc: doc.clone(),
                index,
                element_id: f.element_id.clone(),
            })
            .collect())
    }

    async fn open_frame(&self, frame: &FrameHandle) -> HostResult<Option<DocHandle>> {
        let world = self.world.lock().unwrap();
        let node = world
            .docs
            .get(&frame.doc.0)
            .ok_or_else(|| HostError::Detached(frame.doc.0.clone()))?;
        Ok(node.frames.get(frame.index).and_then(|f| {
            if f.same_origin {
                Some(DocHandle(f.doc_key.clone()))
            } else {
                None
            }
        }))
    }

    async fn find_by_id(&self, doc: &DocHandle, id: &str) -> HostResult<Option<ElementHandle>> {
        let world = self.world.lock().unwrap();
        let node = world
            .docs
            .get(&doc.0)
            .ok_or_else(|| HostError::Detached(doc.0.clone()))?;
        Ok(node
            .elements
            .iter()
            .find(|n| n.id.as_deref() == Some(id))
            .map(|n| ElementHandle {
                doc: doc.clone(),
                key: n.key.clone(),
            }))
    }

    async fn query(&self, doc: &DocHandle, selector: &Selector) -> HostResult<Vec<ElementHandle>> {
        let world = self.world.lock().unwrap();
        let node = world
            .docs
            .get(&doc.0)
            .ok_or_else(|| HostError::Detached(doc.0.clone()))?;
        Ok(node
            .elements
            .iter()
            .filter(|n| matches(n, selector))
            .map(|n| ElementHandle {
                doc: doc.clone(),
                key: n.key.clone(),
            })
            .collect())
    }

    async fn body_text(&self, doc: &DocHandle) -> HostResult<String> {
        let world = self.world.lock().unwrap();
        let node = world
            .docs
            .get(&doc.0)
            .ok_or_else(|| HostError::Detached(doc.0.clone()))?;
        if let Some(text) = &node.body_text {
            return Ok(text.clone());
        }
        Ok(node
            .elements
            .iter()
            .filter(|n| n.visible && !n.text.is_empty())
            .map(|n| n.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    async fn text(&self, el: &ElementHandle) -> HostResult<String> {
        self.read(el, |n| n.text.clone())
    }

    async fn attr(&self, el: &ElementHandle, name: &str) -> HostResult<Option<String>> {
        self.read(el, |n| match name {
            "id" => n.id.clone(),
            "class" if !n.classes.is_empty() => Some(n.classes.join(" ")),
            _ => n.attrs.get(name).cloned(),
        })
    }

    async fn set_attr(&self, el: &ElementHandle, name: &str, value: &str) -> HostResult<()> {
        let name = name.to_string();
        let value = value.to_string();
        self.write(el, |_, n| {
            n.attrs.insert(name, value);
            Ok(())
        })
    }

    async fn is_visible(&self, el: &ElementHandle) -> HostResult<bool> {
        self.read(el, |n| n.visible)
    }

    async fn is_enabled(&self, el: &ElementHandle) -> HostResult<bool> {
        self.read(el, |n| n.enabled)
    }

    async fn height(&self, el: &ElementHandle) -> HostResult<f64> {
        self.read(el, |n| if n.visible { n.height } else { 0.0 })
    }

    async fn click(&self, el: &ElementHandle) -> HostResult<()> {
        let slot = el.slot();
        self.write(el, |world, _| {
            world.clicks.push(slot);
            Ok(())
        })
    }

    async fn focus(&self, el: &ElementHandle) -> HostResult<()> {
        let slot = el.slot();
        self.write(el, |world, _| {
            world.focused.push(slot);
            Ok(())
        })
    }

    async fn dispatch(&self, el: &ElementHandle, event: InputEvent) -> HostResult<()> {
        let slot = el.slot();
        self.write(el, |world, _| {
            world.events.push((slot, event));
            Ok(())
        })
    }

    async fn media(&self, el: &ElementHandle) -> HostResult<MediaSnapshot> {
        self.read(el, |n| {
            n.media.as_ref().map(|m| MediaSnapshot {
                has_source: m.has_source,
                paused: m.paused,
                ready: m.ready,
                duration: m.duration,
                position: m.position,
                playback_rate: m.playback_rate,
                ended: m.ended,
            })
        })?
        .ok_or_else(|| HostError::Backend(format!("{} is not a media element", el.slot())))
    }

    async fn set_playback_rate(&self, el: &ElementHandle, rate: f64) -> HostResult<()> {
        self.write(el, |_, n| {
            let media = n
                .media
                .as_mut()
                .ok_or_else(|| HostError::Backend("not a media element".into()))?;
            if let Some(accepted) = &media.accepted_rates {
                if !accepted.iter().any(|r| (*r - rate).abs() < f64::EPSILON) {
                    return Err(HostError::RateRejected(rate));
                }
            }
            media.playback_rate = rate;
            Ok(())
        })
    }

    async fn play(&self, el: &ElementHandle) -> HostResult<()> {
        self.write(el, |_, n| {
            let media = n
                .media
                .as_mut()
                .ok_or_else(|| HostError::Backend("not a media element".into()))?;
            if !media.has_source || !media.ready {
                return Err(HostError::Backend("medium not ready to play".into()));
            }
            media.paused = false;
            Ok(())
        })
    }

    async fn watch_ended(&self, el: &ElementHandle) -> HostResult<()> {
        self.write(el, |_, n| {
            let media = n
                .media
                .as_mut()
                .ok_or_else(|| HostError::Backend("not a media element".into()))?;
            media.watched = true;
            Ok(())
        })
    }
}
