//! # Bootstrap Document
//!
//! The fixed document every rendering surface starts from, and the local
//! resource table it is loaded through.
//!
//! A surface only ever receives a `blob:` URL minted by [`ResourceRegistry`];
//! remote URLs are refused outright, so network content can never stand in
//! for the bootstrap. Each [`ResourceHandle`] revokes its entry when dropped,
//! which releases the document on every exit path.

use crate::error::{SurfaceError, SurfaceResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Scheme for locally constructed resources
pub const LOCAL_SCHEME: &str = "blob:";

/// Element the surface renders block containers into
pub const ROOT_ELEMENT_ID: &str = "lp-root";

/// Bootstrap document for browser-hosted surfaces.
///
/// The script mirrors [`crate::RenderingSurface`]: echo suppression on
/// SYNC, the editability walker, CHANGE on input, SELECT on click, and a
/// single READY once every listener is attached.
pub const BOOTSTRAP_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        * { box-sizing: border-box; }
        body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; }
        .lp-block { position: relative; outline: 2px solid transparent; outline-offset: -2px; transition: outline-color 0.15s; }
        .lp-block:hover { outline-color: rgba(51, 102, 255, 0.35); }
        .lp-block.lp-active { outline-color: #3366ff; }
        [contenteditable="true"] { cursor: text; }
        [contenteditable="true"]:focus { outline: 1px dashed #3366ff; outline-offset: 2px; }
    </style>
</head>
<body>
    <div id="lp-root"></div>
    <script>
    (function () {
        var root = document.getElementById('lp-root');
        var lastRenderedHtml = '';
        var syncedBlocks = [];
        var syncedSelection = null;
        var EDITABLE_TAGS = ['H1', 'H2', 'H3', 'H4', 'H5', 'H6', 'P', 'SPAN', 'BUTTON', 'A', 'LI', 'B', 'STRONG', 'DIV'];

        function hasOwnText(el) {
            for (var i = 0; i < el.childNodes.length; i++) {
                var child = el.childNodes[i];
                if (child.nodeType === 3 && child.textContent.trim() !== '') return true;
            }
            return false;
        }

        function walk(el, insideEditable) {
            var children = Array.prototype.slice.call(el.children);
            for (var i = 0; i < children.length; i++) {
                var child = children[i];
                if (EDITABLE_TAGS.indexOf(child.tagName) !== -1 && hasOwnText(child)) {
                    child.setAttribute('contenteditable', 'true');
                    child.setAttribute('spellcheck', 'false');
                    walk(child, true);
                } else {
                    if (insideEditable) {
                        child.setAttribute('contenteditable', 'false');
                    } else if (child.getAttribute('contenteditable') === 'true') {
                        child.removeAttribute('contenteditable');
                        if (child.getAttribute('spellcheck') === 'false') child.removeAttribute('spellcheck');
                    }
                    walk(child, insideEditable);
                }
            }
        }

        function escapeAttr(value) {
            return String(value)
                .replace(/&/g, '&amp;')
                .replace(/"/g, '&quot;')
                .replace(/\u00a0/g, '&nbsp;');
        }

        function render(blocks, selectedId) {
            return blocks.map(function (block) {
                var cls = block.id === selectedId ? 'lp-block lp-active' : 'lp-block';
                return '<div class="' + cls + '" data-block-id="' + escapeAttr(block.id) + '">' + block.markup + '</div>';
            }).join('');
        }

        function containerOf(target) {
            var el = target && target.nodeType === 3 ? target.parentElement : target;
            return el && el.closest ? el.closest('[data-block-id]') : null;
        }

        window.addEventListener('message', function (event) {
            var data = event.data;
            if (!data || typeof data !== 'object' || data.type !== 'SYNC' || !Array.isArray(data.blocks)) return;
            syncedBlocks = data.blocks.map(function (b) { return { id: b.id, kind: b.kind, markup: b.markup }; });
            syncedSelection = data.selectedId == null ? null : data.selectedId;
            var html = render(syncedBlocks, syncedSelection);
            if (html === lastRenderedHtml) return;
            root.innerHTML = html;
            lastRenderedHtml = html;
            walk(root, false);
        });

        root.addEventListener('input', function (event) {
            var container = containerOf(event.target);
            if (!container) return;
            var id = container.getAttribute('data-block-id');
            var content = container.innerHTML;
            for (var i = 0; i < syncedBlocks.length; i++) {
                if (syncedBlocks[i].id === id) { syncedBlocks[i].markup = content; break; }
            }
            lastRenderedHtml = render(syncedBlocks, syncedSelection);
            parent.postMessage({ type: 'CHANGE', id: id, content: content }, '*');
        });

        root.addEventListener('click', function (event) {
            var container = containerOf(event.target);
            if (!container) return;
            parent.postMessage({ type: 'SELECT', id: container.getAttribute('data-block-id') }, '*');
        });

        parent.postMessage({ type: 'READY' }, '*');
    })();
    </script>
</body>
</html>
"#;

/// Local resource table: the `createObjectURL` / `revokeObjectURL` pair.
///
/// Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    entries: Arc<Mutex<HashMap<String, Arc<str>>>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document and mint a local URL for it
    pub fn register(&self, document: impl Into<Arc<str>>) -> ResourceHandle {
        let url = format!("{}livepage/{}", LOCAL_SCHEME, Uuid::new_v4());
        self.lock().insert(url.clone(), document.into());
        tracing::debug!(url = %url, "Registered bootstrap resource");

        ResourceHandle {
            url,
            registry: self.clone(),
        }
    }

    /// Register the standard bootstrap document
    pub fn register_bootstrap(&self) -> ResourceHandle {
        self.register(BOOTSTRAP_HTML)
    }

    /// Load a document by URL. Only live local resources resolve.
    pub fn resolve(&self, url: &str) -> SurfaceResult<Arc<str>> {
        if !url.starts_with(LOCAL_SCHEME) {
            return Err(SurfaceError::RemoteBootstrap(url.to_string()));
        }
        self.lock()
            .get(url)
            .cloned()
            .ok_or_else(|| SurfaceError::ResourceRevoked(url.to_string()))
    }

    /// Number of live resources
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn revoke(&self, url: &str) {
        if self.lock().remove(url).is_some() {
            tracing::debug!(url = %url, "Revoked bootstrap resource");
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<str>>> {
        // The map stays consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Owned local URL; revoked on drop
#[derive(Debug)]
pub struct ResourceHandle {
    url: String,
    registry: ResourceRegistry,
}

impl ResourceHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}
