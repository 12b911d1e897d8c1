//! WebDriver-backed [`ContentHost`].
//!
//! Every operation executes a small script in the top-level browsing
//! context that walks the frame path by hand. Walking `contentDocument`
//! from page script (rather than switching WebDriver frame contexts) makes
//! the same-origin boundary a real capability test: an inaccessible frame
//! resolves to `null` and the branch reports itself as denied, exactly as
//! the engine's locator expects.
//!
//! Element references are sticky `data-cruise-ref` stamps written on first
//! query; a stamp that no longer resolves means the element left the tree
//! and the operation reports detached.

use async_trait::async_trait;
use cruise_dom::{
    ContentHost, DocHandle, ElementHandle, FrameHandle, HostError, HostResult, InputEvent, Key,
    MediaSnapshot, Selector,
};
use fantoccini::Client;
use serde_json::{json, Value};
use tracing::trace;

/// Walks `arguments[0]` (a frame index path) down from `document`, binding
/// `__doc` or returning a typed error object.
const DOC_PRELUDE: &str = r#"
    const __path = arguments[0];
    let __doc = document;
    for (const __i of __path) {
        const __frames = __doc.querySelectorAll('iframe');
        if (!__frames[__i]) return { err: 'detached' };
        let __next = null;
        try { __next = __frames[__i].contentDocument; } catch (e) { __next = null; }
        if (!__next || !__next.body) return { err: 'denied' };
        __doc = __next;
    }
"#;

/// Binds `__el` from `arguments[1]` (a `data-cruise-ref` key) or returns a
/// typed error object. Must follow [`DOC_PRELUDE`].
const EL_PRELUDE: &str = r#"
    const __el = __doc.querySelector('[data-cruise-ref="' + arguments[1] + '"]');
    if (!__el) return { err: 'detached' };
"#;

pub struct WebDriverHost {
    client: Client,
}

impl WebDriverHost {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn eval(&self, body: &str, args: Vec<Value>) -> HostResult<Value> {
        let script = format!("{DOC_PRELUDE}\n{body}");
        let reply = self
            .client
            .execute(&script, args)
            .await
            .map_err(|e| HostError::Backend(e.to_string()))?;
        trace!(?reply, "script reply");
        unwrap_reply(reply)
    }

    async fn eval_el(&self, el: &ElementHandle, body: &str, extra: Vec<Value>) -> HostResult<Value> {
        let mut args = vec![json!(doc_path(&el.doc)), json!(el.key)];
        args.extend(extra);
        let script = format!("{EL_PRELUDE}\n{body}");
        self.eval(&script, args).await
    }
}

/// Parse `root/2/0` into `[2, 0]`.
fn doc_path(doc: &DocHandle) -> Vec<u64> {
    doc.0
        .split('/')
        .skip(1)
        .filter_map(|part| part.parse().ok())
        .collect()
}

fn child_doc(doc: &DocHandle, index: usize) -> DocHandle {
    DocHandle(format!("{}/{}", doc.0, index))
}

fn unwrap_reply(reply: Value) -> HostResult<Value> {
    if let Some(err) = reply.get("err").and_then(Value::as_str) {
        return Err(match err {
            "denied" => HostError::Denied(err.to_string()),
            "detached" => HostError::Detached(err.to_string()),
            other => HostError::Backend(other.to_string()),
        });
    }
    Ok(reply.get("ok").cloned().unwrap_or(Value::Null))
}

fn as_keys(value: Value) -> Vec<String> {
    value
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Stamp matched elements with sticky refs and return the keys.
const STAMP_AND_COLLECT: &str = r#"
    const __keys = __els.map(function (el) {
        if (!el.dataset.cruiseRef) {
            window.__cruiseSeq = (window.__cruiseSeq || 0) + 1;
            el.dataset.cruiseRef = 'c' + window.__cruiseSeq;
        }
        return el.dataset.cruiseRef;
    });
    return { ok: __keys };
"#;

#[async_trait]
impl ContentHost for WebDriverHost {
    fn root(&self) -> DocHandle {
        DocHandle("root".to_string())
    }

    async fn frames(&self, doc: &DocHandle) -> HostResult<Vec<FrameHandle>> {
        let reply = self
            .eval(
                r#"
                const __ids = Array.from(__doc.querySelectorAll('iframe'))
                    .map(function (f) { return f.id || null; });
                return { ok: __ids };
                "#,
                vec![json!(doc_path(doc))],
            )
            .await?;
        let ids = reply.as_array().cloned().unwrap_or_default();
        Ok(ids
            .into_iter()
            .enumerate()
            .map(|(index, id)| FrameHandle {
                doc: doc.clone(),
                index,
                element_id: id.as_str().map(str::to_string),
            })
            .collect())
    }

    async fn open_frame(&self, frame: &FrameHandle) -> HostResult<Option<DocHandle>> {
        let child = child_doc(&frame.doc, frame.index);
        match self
            .eval("return { ok: true };", vec![json!(doc_path(&child))])
            .await
        {
            Ok(_) => Ok(Some(child)),
            // Inaccessible or already gone: a capability miss, not a fault.
            Err(HostError::Denied(_)) | Err(HostError::Detached(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_by_id(&self, doc: &DocHandle, id: &str) -> HostResult<Option<ElementHandle>> {
        let reply = self
            .eval(
                &format!(
                    r#"
                    const __hit = __doc.getElementById(arguments[1]);
                    const __els = __hit ? [__hit] : [];
                    {STAMP_AND_COLLECT}
                    "#
                ),
                vec![json!(doc_path(doc)), json!(id)],
            )
            .await?;
        Ok(as_keys(reply).into_iter().next().map(|key| ElementHandle {
            doc: doc.clone(),
            key,
        }))
    }

    async fn query(&self, doc: &DocHandle, selector: &Selector) -> HostResult<Vec<ElementHandle>> {
        let reply = self
            .eval(
                &format!(
                    r#"
                    const __els = Array.from(__doc.querySelectorAll(arguments[1]));
                    {STAMP_AND_COLLECT}
                    "#
                ),
                vec![json!(doc_path(doc)), json!(selector.css())],
            )
            .await?;
        Ok(as_keys(reply)
            .into_iter()
            .map(|key| ElementHandle {
                doc: doc.clone(),
                key,
            })
            .collect())
    }

    async fn body_text(&self, doc: &DocHandle) -> HostResult<String> {
        let reply = self
            .eval(
                "return { ok: __doc.body ? (__doc.body.innerText || '') : '' };",
                vec![json!(doc_path(doc))],
            )
            .await?;
        Ok(reply.as_str().unwrap_or_default().to_string())
    }

    async fn text(&self, el: &ElementHandle) -> HostResult<String> {
        let reply = self
            .eval_el(el, "return { ok: __el.innerText || __el.textContent || '' };", vec![])
            .await?;
        Ok(reply.as_str().unwrap_or_default().to_string())
    }

    async fn attr(&self, el: &ElementHandle, name: &str) -> HostResult<Option<String>> {
        let reply = self
            .eval_el(
                el,
                "return { ok: __el.getAttribute(arguments[2]) };",
                vec![json!(name)],
            )
            .await?;
        Ok(reply.as_str().map(str::to_string))
    }

    async fn set_attr(&self, el: &ElementHandle, name: &str, value: &str) -> HostResult<()> {
        self.eval_el(
            el,
            "__el.setAttribute(arguments[2], arguments[3]); return { ok: true };",
            vec![json!(name), json!(value)],
        )
        .await?;
        Ok(())
    }

    async fn is_visible(&self, el: &ElementHandle) -> HostResult<bool> {
        let reply = self
            .eval_el(el, "return { ok: __el.offsetParent !== null };", vec![])
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, el: &ElementHandle) -> HostResult<bool> {
        let reply = self
            .eval_el(el, "return { ok: !__el.disabled };", vec![])
            .await?;
        Ok(reply.as_bool().unwrap_or(false))
    }

    async fn height(&self, el: &ElementHandle) -> HostResult<f64> {
        let reply = self
            .eval_el(el, "return { ok: __el.clientHeight || 0 };", vec![])
            .await?;
        Ok(reply.as_f64().unwrap_or(0.0))
    }

    async fn click(&self, el: &ElementHandle) -> HostResult<()> {
        self.eval_el(
            el,
            r#"
            try { __el.click(); } catch (e) { return { err: String(e) }; }
            return { ok: true };
            "#,
            vec![],
        )
        .await?;
        Ok(())
    }

    async fn focus(&self, el: &ElementHandle) -> HostResult<()> {
        self.eval_el(
            el,
            "if (typeof __el.focus === 'function') __el.focus(); return { ok: true };",
            vec![],
        )
        .await?;
        Ok(())
    }

    async fn dispatch(&self, el: &ElementHandle, event: InputEvent) -> HostResult<()> {
        let kind = match event {
            InputEvent::PointerDown => "mousedown",
            InputEvent::PointerMove => "mousemove",
            InputEvent::PointerUp => "mouseup",
            InputEvent::KeyDown(Key::Space) => "key-space",
            InputEvent::KeyDown(Key::Enter) => "key-enter",
            InputEvent::TouchStart => "touchstart",
            InputEvent::TouchEnd => "touchend",
        };
        self.eval_el(
            el,
            r#"
            const __kind = arguments[2];
            let __ev = null;
            try {
                if (__kind === 'key-space') {
                    __ev = new KeyboardEvent('keydown', { key: ' ', code: 'Space', bubbles: true, cancelable: true });
                } else if (__kind === 'key-enter') {
                    __ev = new KeyboardEvent('keydown', { key: 'Enter', code: 'Enter', bubbles: true, cancelable: true });
                } else if (__kind === 'touchstart' || __kind === 'touchend') {
                    __ev = new TouchEvent(__kind, { bubbles: true, cancelable: true });
                } else {
                    __ev = new MouseEvent(__kind, { bubbles: true, cancelable: true, view: __doc.defaultView });
                }
                __el.dispatchEvent(__ev);
            } catch (e) { return { err: String(e) }; }
            return { ok: true };
            "#,
            vec![json!(kind)],
        )
        .await?;
        Ok(())
    }

    async fn media(&self, el: &ElementHandle) -> HostResult<MediaSnapshot> {
        let reply = self
            .eval_el(
                el,
                r#"
                const __d = __el.duration;
                return { ok: {
                    has_source: !!(__el.currentSrc || __el.src),
                    paused: !!__el.paused,
                    ready: (__el.readyState || 0) >= 2,
                    duration: (typeof __d === 'number' && isFinite(__d)) ? __d : null,
                    position: __el.currentTime || 0,
                    playback_rate: __el.playbackRate || 1,
                    ended: !!__el.ended || __el.dataset.cruiseEnded === 'true'
                } };
                "#,
                vec![],
            )
            .await?;
        serde_json::from_value(reply).map_err(|e| HostError::Backend(e.to_string()))
    }

    async fn set_playback_rate(&self, el: &ElementHandle, rate: f64) -> HostResult<()> {
        let reply = self
            .eval_el(
                el,
                r#"
                try { __el.playbackRate = arguments[2]; } catch (e) {}
                return { ok: __el.playbackRate };
                "#,
                vec![json!(rate)],
            )
            .await?;
        let applied = reply.as_f64().unwrap_or(0.0);
        if (applied - rate).abs() > 1e-6 {
            return Err(HostError::RateRejected(rate));
        }
        Ok(())
    }

    async fn play(&self, el: &ElementHandle) -> HostResult<()> {
        // Fire-and-forget: the promise's outcome is observed on a later
        // tick, not awaited here.
        self.eval_el(
            el,
            r#"
            try {
                const __p = __el.play();
                if (__p && __p.catch) __p.catch(function () {});
            } catch (e) { return { err: String(e) }; }
            return { ok: true };
            "#,
            vec![],
        )
        .await?;
        Ok(())
    }

    async fn watch_ended(&self, el: &ElementHandle) -> HostResult<()> {
        self.eval_el(
            el,
            r#"
            if (!__el.dataset.cruiseEndedHook) {
                __el.addEventListener('ended', function () {
                    __el.dataset.cruiseEnded = 'true';
                });
                __el.dataset.cruiseEndedHook = '1';
            }
            return { ok: true };
            "#,
            vec![],
        )
        .await?;
        Ok(())
    }
}
