//! Live editor server
//!
//! Serves a shell page that builds the bootstrap document into a local
//! Blob URL, mounts it in a sandboxed iframe, and relays the iframe's
//! messages over a WebSocket. Each connection gets its own editor session
//! on the server; the browser frame is its rendering surface.

use super::resolve;
use crate::config::Config;
use crate::page::PageFile;
use crate::store::JsonFileStore;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use futures_util::{SinkExt, StreamExt};
use livepage_editor::{DocumentModel, EditorConfig, EditorSession, StorePersist};
use livepage_surface::{
    ResourceHandle, ResourceRegistry, SurfaceLauncher, SurfaceLink, SurfaceResult, BOOTSTRAP_HTML,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use warp::ws::{Message, WebSocket};
use warp::Filter;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Page file to edit
    pub page: PathBuf,

    /// Port to listen on (defaults to the config file's)
    #[arg(short, long)]
    pub port: Option<u16>,
}

struct ServeState {
    page_path: PathBuf,
    editor: EditorConfig,
    store: Arc<JsonFileStore>,
    registry: ResourceRegistry,
}

pub fn serve(args: ServeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let page_path = resolve(cwd, &args.page);
    let page = PageFile::load(&page_path)?;

    let page_dir = page_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(cwd));
    let store = Arc::new(JsonFileStore::new(config.get_store_dir(&page_dir)));
    let port = args.port.unwrap_or(config.port);

    println!("📄 {} {}", "livepage".bright_blue().bold(), page_path.display());
    println!("   {} blocks, autosave to {}", page.blocks.len(), store.dir().display());
    println!();

    let state = Arc::new(ServeState {
        page_path,
        editor: config.editor,
        store,
        registry: ResourceRegistry::new(),
    });
    let shell = shell_page()?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let ws_route = warp::path("ws")
            .and(warp::ws())
            .and(warp::any().map(move || state.clone()))
            .map(|ws: warp::ws::Ws, state: Arc<ServeState>| {
                ws.on_upgrade(move |socket| handle_client(socket, state))
            });

        let html_route = warp::path::end().map(move || warp::reply::html(shell.clone()));

        println!("🚀 Editor running at http://localhost:{}", port);
        println!("   Open in browser and type into the page\n");

        warp::serve(html_route.or(ws_route))
            .run(([127, 0, 0, 1], port))
            .await;
    });

    Ok(())
}

async fn handle_client(socket: WebSocket, state: Arc<ServeState>) {
    println!("🔌 Editor connected");
    if let Err(e) = edit_over_socket(socket, &state).await {
        tracing::warn!(error = %e, "Editor session failed");
        eprintln!("{} {}", "✗".red(), e);
    }
    println!("🔌 Editor disconnected");
}

async fn edit_over_socket(socket: WebSocket, state: &ServeState) -> Result<()> {
    let page = PageFile::load(&state.page_path)?;
    let launcher = SocketLauncher::default();
    let persist = Arc::new(StorePersist::new(
        state.store.clone(),
        state.editor.store_key.clone(),
    ));

    let (mut session, inbound) = EditorSession::new(
        DocumentModel::from_blocks(page.blocks),
        state.editor.clone(),
        &state.registry,
        &launcher,
        persist,
    )?;

    match session.restore(state.store.as_ref()).await {
        Ok(true) => println!("   {} Resumed from autosave", "↺".cyan()),
        Ok(false) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable autosave"),
    }

    if let Some(mut failures) = session.take_persist_failures() {
        tokio::spawn(async move {
            while let Some(failure) = failures.recv().await {
                eprintln!("   {} Autosave failed: {}", "✗".red(), failure.error);
            }
        });
    }

    let (mut to_browser, from_browser) = launcher
        .take()
        .context("Surface link was never established")?;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let forward = tokio::spawn(async move {
        while let Some(wire) = to_browser.recv().await {
            if ws_tx.send(Message::text(wire)).await.is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        while let Some(Ok(message)) = ws_rx.next().await {
            if message.is_close() {
                break;
            }
            let Ok(text) = message.to_str() else {
                continue;
            };
            if from_browser.send(text.to_string()).is_err() {
                break;
            }
        }
    });

    // Ends once the browser side hangs up
    session.run(inbound).await;

    forward.abort();
    session.shutdown();
    Ok(())
}

type SurfaceEnd = (UnboundedReceiver<String>, UnboundedSender<String>);

/// Hands the surface end of the link to the WebSocket relay.
///
/// The browser builds its own frame from the same bootstrap document, so
/// launching only checks that the server-side resource is live.
#[derive(Default)]
struct SocketLauncher {
    surface_end: Mutex<Option<SurfaceEnd>>,
}

impl SocketLauncher {
    fn take(&self) -> Option<SurfaceEnd> {
        self.surface_end
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

impl SurfaceLauncher for SocketLauncher {
    fn launch(
        &self,
        registry: &ResourceRegistry,
        resource: &ResourceHandle,
    ) -> SurfaceResult<SurfaceLink> {
        registry.resolve(resource.url())?;

        let (outbound, to_browser) = unbounded_channel();
        let (from_browser, inbound) = unbounded_channel();
        *self
            .surface_end
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some((to_browser, from_browser));

        Ok(SurfaceLink { outbound, inbound })
    }
}

/// Shell page with the bootstrap document inlined as a JS string literal
fn shell_page() -> Result<String> {
    let literal = serde_json::to_string(BOOTSTRAP_HTML)?.replace("</", "<\\/");
    Ok(SHELL_HTML.replace("__BOOTSTRAP_DOCUMENT__", &literal))
}

const SHELL_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>livepage</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: #f5f5f5;
            height: 100vh;
            display: flex;
            flex-direction: column;
        }
        .header {
            padding: 12px 20px;
            background: white;
            box-shadow: 0 1px 3px rgba(0,0,0,0.1);
            display: flex;
            align-items: center;
            justify-content: space-between;
        }
        .header h1 { font-size: 16px; color: #333; }
        .status { font-size: 13px; color: #666; }
        .status.live { color: #16a34a; }
        .status.offline { color: #dc2626; }
        iframe { flex: 1; border: none; background: white; margin: 20px; border-radius: 8px; }
    </style>
</head>
<body>
    <div class="header">
        <h1>livepage</h1>
        <span class="status" id="status">booting…</span>
    </div>
    <iframe id="surface" sandbox="allow-scripts"></iframe>
    <script>
    (function () {
        var bootstrap = __BOOTSTRAP_DOCUMENT__;
        var url = URL.createObjectURL(new Blob([bootstrap], { type: 'text/html' }));
        var frame = document.getElementById('surface');
        var status = document.getElementById('status');
        var pending = [];
        var protocol = location.protocol === 'https:' ? 'wss://' : 'ws://';
        var ws = new WebSocket(protocol + location.host + '/ws');

        ws.onopen = function () {
            pending.forEach(function (raw) { ws.send(raw); });
            pending = [];
        };

        ws.onmessage = function (event) {
            var message;
            try { message = JSON.parse(event.data); } catch (e) { return; }
            status.textContent = 'live';
            status.className = 'status live';
            frame.contentWindow.postMessage(message, '*');
        };

        ws.onclose = function () {
            status.textContent = 'disconnected';
            status.className = 'status offline';
        };

        window.addEventListener('message', function (event) {
            if (event.source !== frame.contentWindow) return;
            var raw = JSON.stringify(event.data);
            if (ws.readyState === WebSocket.OPEN) ws.send(raw); else pending.push(raw);
        });

        window.addEventListener('unload', function () {
            URL.revokeObjectURL(url);
            ws.close();
        });

        frame.src = url;
    })();
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_inlines_bootstrap_safely() {
        let page = shell_page().unwrap();
        assert!(!page.contains("__BOOTSTRAP_DOCUMENT__"));
        assert!(page.contains("URL.createObjectURL"));
        assert!(page.contains("URL.revokeObjectURL"));

        // Only the shell's own script may close a script element
        assert_eq!(page.matches("</script>").count(), 1);
    }

    #[test]
    fn test_inlined_document_round_trips() {
        let literal = serde_json::to_string(BOOTSTRAP_HTML)
            .unwrap()
            .replace("</", "<\\/");
        let decoded: String = serde_json::from_str(&literal).unwrap();
        assert_eq!(decoded, BOOTSTRAP_HTML);
    }

    #[tokio::test]
    async fn test_socket_launcher_hands_out_surface_end() {
        let registry = ResourceRegistry::new();
        let resource = registry.register_bootstrap();
        let launcher = SocketLauncher::default();

        let mut link = launcher.launch(&registry, &resource).unwrap();
        let (mut to_browser, from_browser) = launcher.take().unwrap();

        link.outbound.send("to browser".to_string()).unwrap();
        assert_eq!(to_browser.recv().await.unwrap(), "to browser");

        from_browser.send("to host".to_string()).unwrap();
        assert_eq!(link.inbound.recv().await.unwrap(), "to host");
        assert!(launcher.take().is_none());
    }

    #[test]
    fn test_socket_launcher_refuses_revoked_resource() {
        let registry = ResourceRegistry::new();
        let resource = registry.register_bootstrap();
        let other = ResourceRegistry::new();

        assert!(SocketLauncher::default().launch(&other, &resource).is_err());
    }
}
