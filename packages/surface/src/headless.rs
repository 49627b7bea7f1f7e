//! # Headless Surface
//!
//! Runs a [`RenderingSurface`] on its own task, connected to the host only
//! through two FIFO pipes of wire strings. User activity is driven through
//! a [`SurfaceController`], standing in for the person typing into the
//! rendered page.

use crate::bootstrap::{ResourceHandle, ResourceRegistry};
use crate::error::{SurfaceError, SurfaceResult};
use crate::launch::{SurfaceLauncher, SurfaceLink};
use crate::surface::{Caret, RenderingSurface};
use std::sync::Mutex;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

/// Observable state of a headless surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub html: String,
    pub root_replacements: u64,
    pub active_block: Option<String>,
    pub caret: Option<Caret>,
    pub booted: bool,
}

#[derive(Debug)]
pub enum SurfaceCommand {
    /// Append text to the first text node containing `needle`
    Type {
        needle: String,
        text: String,
        reply: oneshot::Sender<SurfaceResult<()>>,
    },
    /// Replace the whole text node containing `needle`
    Replace {
        needle: String,
        with: String,
        reply: oneshot::Sender<SurfaceResult<()>>,
    },
    /// Click inside the block container with this id
    Click {
        block_id: String,
        reply: oneshot::Sender<bool>,
    },
    Snapshot {
        reply: oneshot::Sender<SurfaceSnapshot>,
    },
}

/// Launches one headless surface task
pub struct HeadlessLauncher {
    commands: Mutex<Option<UnboundedReceiver<SurfaceCommand>>>,
}

impl HeadlessLauncher {
    pub fn new() -> (Self, SurfaceController) {
        let (tx, rx) = unbounded_channel();
        (
            Self {
                commands: Mutex::new(Some(rx)),
            },
            SurfaceController { commands: tx },
        )
    }
}

impl SurfaceLauncher for HeadlessLauncher {
    fn launch(
        &self,
        registry: &ResourceRegistry,
        resource: &ResourceHandle,
    ) -> SurfaceResult<SurfaceLink> {
        let commands = self
            .commands
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
            .ok_or(SurfaceError::AlreadyLaunched)?;

        let (to_host, inbound) = unbounded_channel();
        let (outbound, from_host) = unbounded_channel();
        let surface = RenderingSurface::load(registry, resource.url(), to_host)?;

        tokio::spawn(run_surface(surface, from_host, commands));
        Ok(SurfaceLink { outbound, inbound })
    }
}

async fn run_surface(
    mut surface: RenderingSurface,
    mut from_host: UnboundedReceiver<String>,
    mut commands: UnboundedReceiver<SurfaceCommand>,
) {
    surface.boot();
    let mut commands_open = true;

    loop {
        tokio::select! {
            biased;

            message = from_host.recv() => match message {
                Some(raw) => {
                    surface.handle_message(&raw);
                }
                None => break,
            },

            command = commands.recv(), if commands_open => match command {
                Some(command) => apply_command(&mut surface, command),
                None => commands_open = false,
            },
        }
    }

    tracing::debug!(url = %surface.url(), "Host disconnected; surface torn down");
}

fn apply_command(surface: &mut RenderingSurface, command: SurfaceCommand) {
    match command {
        SurfaceCommand::Type {
            needle,
            text,
            reply,
        } => {
            let result = surface
                .find_text(&needle)
                .ok_or(SurfaceError::TextNotFound(needle))
                .and_then(|node| {
                    let end = surface
                        .dom()
                        .text(node)
                        .map(|t| t.chars().count())
                        .unwrap_or(0);
                    surface.type_text(node, end, &text)
                });
            let _ = reply.send(result);
        }
        SurfaceCommand::Replace {
            needle,
            with,
            reply,
        } => {
            let result = surface
                .find_text(&needle)
                .ok_or(SurfaceError::TextNotFound(needle))
                .and_then(|node| surface.set_text(node, &with));
            let _ = reply.send(result);
        }
        SurfaceCommand::Click { block_id, reply } => {
            let clicked = surface
                .block_node(&block_id)
                .map(|node| surface.click(node))
                .unwrap_or(false);
            let _ = reply.send(clicked);
        }
        SurfaceCommand::Snapshot { reply } => {
            let _ = reply.send(SurfaceSnapshot {
                html: surface.rendered_html(),
                root_replacements: surface.root_replacements(),
                active_block: surface.active_block(),
                caret: surface.caret(),
                booted: surface.is_booted(),
            });
        }
    }
}

/// Drives user activity on a headless surface
#[derive(Debug, Clone)]
pub struct SurfaceController {
    commands: UnboundedSender<SurfaceCommand>,
}

impl SurfaceController {
    pub async fn type_text(&self, needle: &str, text: &str) -> SurfaceResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SurfaceCommand::Type {
            needle: needle.to_string(),
            text: text.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| SurfaceError::Closed)?
    }

    pub async fn replace_text(&self, needle: &str, with: &str) -> SurfaceResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(SurfaceCommand::Replace {
            needle: needle.to_string(),
            with: with.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| SurfaceError::Closed)?
    }

    pub async fn click(&self, block_id: &str) -> SurfaceResult<bool> {
        let (reply, rx) = oneshot::channel();
        self.send(SurfaceCommand::Click {
            block_id: block_id.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| SurfaceError::Closed)
    }

    pub async fn snapshot(&self) -> SurfaceResult<SurfaceSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SurfaceCommand::Snapshot { reply })?;
        rx.await.map_err(|_| SurfaceError::Closed)
    }

    fn send(&self, command: SurfaceCommand) -> SurfaceResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SurfaceError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepage_protocol::{decode_surface_message, Block, HostMessage, SurfaceMessage};

    #[tokio::test]
    async fn test_headless_surface_boots_and_renders() {
        let registry = ResourceRegistry::new();
        let resource = registry.register_bootstrap();
        let (launcher, controller) = HeadlessLauncher::new();

        let mut link = launcher.launch(&registry, &resource).unwrap();
        assert_eq!(
            decode_surface_message(&link.inbound.recv().await.unwrap()),
            Some(SurfaceMessage::Ready)
        );

        let blocks = vec![Block::new("hero-1", "hero", "<h1>Old</h1>")];
        link.outbound
            .send(HostMessage::sync(&blocks, None).to_wire())
            .unwrap();

        let snapshot = controller.snapshot().await.unwrap();
        assert!(snapshot.booted);
        assert_eq!(snapshot.root_replacements, 1);
        assert!(snapshot.html.contains("Old"));

        controller.type_text("Old", "er").await.unwrap();
        match decode_surface_message(&link.inbound.recv().await.unwrap()) {
            Some(SurfaceMessage::Change { id, content }) => {
                assert_eq!(id, "hero-1");
                assert!(content.contains("Older"));
            }
            other => panic!("expected change, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_second_launch_is_refused() {
        let registry = ResourceRegistry::new();
        let resource = registry.register_bootstrap();
        let (launcher, _controller) = HeadlessLauncher::new();

        let _link = launcher.launch(&registry, &resource).unwrap();
        assert_eq!(
            launcher.launch(&registry, &resource).err(),
            Some(SurfaceError::AlreadyLaunched)
        );
    }

    #[tokio::test]
    async fn test_missing_text_reports_error() {
        let registry = ResourceRegistry::new();
        let resource = registry.register_bootstrap();
        let (launcher, controller) = HeadlessLauncher::new();
        let _link = launcher.launch(&registry, &resource).unwrap();

        assert_eq!(
            controller.type_text("nowhere", "x").await,
            Err(SurfaceError::TextNotFound("nowhere".to_string()))
        );
    }

    #[tokio::test]
    async fn test_surface_task_ends_when_host_drops() {
        let registry = ResourceRegistry::new();
        let resource = registry.register_bootstrap();
        let (launcher, controller) = HeadlessLauncher::new();

        let link = launcher.launch(&registry, &resource).unwrap();
        drop(link);

        // The task exits, so the controller's commands go nowhere
        tokio::task::yield_now().await;
        let mut closed = false;
        for _ in 0..10 {
            if controller.snapshot().await.is_err() {
                closed = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(closed);
    }
}
