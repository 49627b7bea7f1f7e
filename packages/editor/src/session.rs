//! # Editor Session
//!
//! One editor instance: a document model, the bridge to its rendering
//! surface, a debounced writer, and edit history. Sessions share nothing,
//! so any number can run side by side.
//!
//! ## Host-side message handling
//!
//! | Message | Action                                                       |
//! |---------|--------------------------------------------------------------|
//! | READY   | mark the surface ready, send one SYNC with current state     |
//! | CHANGE  | replace the block in the displayed sequence, schedule a write, SYNC |
//! | SELECT  | select the block if it is displayed, SYNC to confirm the highlight |
//!
//! A CHANGE or SELECT naming a block that is not displayed is ignored.
//! The SYNC that follows a CHANGE reproduces what the surface already
//! shows, so the surface treats it as a no-op.
//!
//! Edits schedule their write on the tokio runtime the session was created
//! on, so the synchronous editing methods may be called from any thread
//! once the session exists.

use crate::bridge::{SurfaceBridge, SurfaceLauncher};
use crate::collab::{GenerateError, GenerateInput, Generator, Persist, RecordStore};
use crate::config::EditorConfig;
use crate::debounce::{DebouncedWriter, PersistFailure};
use crate::document::{DocumentModel, DocumentSnapshot};
use crate::errors::{EditorError, EditorResult};
use crate::history::{History, MarkupEdit};
use livepage_protocol::{Block, SurfaceMessage};
use livepage_surface::ResourceRegistry;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

type BlockListener = Box<dyn FnMut(&Block) + Send>;
type SelectionListener = Box<dyn FnMut(Option<&str>) + Send>;

pub struct EditorSession {
    model: DocumentModel,
    bridge: SurfaceBridge,
    writer: DebouncedWriter,
    failures: Option<UnboundedReceiver<PersistFailure>>,
    history: History,
    config: EditorConfig,
    block_listeners: Vec<BlockListener>,
    selection_listeners: Vec<SelectionListener>,
}

impl EditorSession {
    /// Launch a surface for `model` and wire everything together.
    ///
    /// Returns the session and the surface's inbound message pipe; feed it
    /// to [`EditorSession::run`] or [`EditorSession::drain`].
    pub fn new(
        model: DocumentModel,
        config: EditorConfig,
        registry: &ResourceRegistry,
        launcher: &dyn SurfaceLauncher,
        persist: Arc<dyn Persist>,
    ) -> EditorResult<(Self, UnboundedReceiver<String>)> {
        let (bridge, inbound) = SurfaceBridge::create(registry, launcher)?;
        let (writer, failures) = DebouncedWriter::new(config.debounce(), persist);

        tracing::info!(
            blocks = model.blocks().len(),
            surface = %bridge.resource_url(),
            "Editor session started"
        );

        Ok((
            Self {
                model,
                bridge,
                writer,
                failures: Some(failures),
                history: History::with_max_depth(config.history_depth),
                config,
                block_listeners: Vec::new(),
                selection_listeners: Vec::new(),
            },
            inbound,
        ))
    }

    pub fn model(&self) -> &DocumentModel {
        &self.model
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn bridge(&self) -> &SurfaceBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut SurfaceBridge {
        &mut self.bridge
    }

    pub fn is_ready(&self) -> bool {
        self.bridge.is_ready()
    }

    pub fn displayed_blocks(&self) -> &[Block] {
        self.model.displayed_blocks()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.model.selected_id()
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        self.model.snapshot()
    }

    /// Failed debounced writes. Can be taken once.
    pub fn take_persist_failures(&mut self) -> Option<UnboundedReceiver<PersistFailure>> {
        self.failures.take()
    }

    pub fn on_block_changed(&mut self, listener: impl FnMut(&Block) + Send + 'static) {
        self.block_listeners.push(Box::new(listener));
    }

    pub fn on_selection_changed(&mut self, listener: impl FnMut(Option<&str>) + Send + 'static) {
        self.selection_listeners.push(Box::new(listener));
    }

    /// Handle one raw message from the surface. Never fails.
    pub fn handle_message(&mut self, raw: &str) -> Option<SurfaceMessage> {
        let message = self.bridge.dispatch(raw)?;

        match &message {
            SurfaceMessage::Ready => {
                tracing::debug!("Surface ready");
                self.sync();
            }
            SurfaceMessage::Change { id, content } => self.apply_change(id, content),
            SurfaceMessage::Select { id } => {
                if self.model.find(id).is_some() {
                    self.select(Some(id));
                } else {
                    tracing::debug!(block_id = %id, "SELECT for unknown block ignored");
                }
            }
        }

        Some(message)
    }

    /// Handle every message already waiting in `inbound`
    pub fn drain(&mut self, inbound: &mut UnboundedReceiver<String>) -> usize {
        let mut handled = 0;
        while let Ok(raw) = inbound.try_recv() {
            self.handle_message(&raw);
            handled += 1;
        }
        handled
    }

    /// Handle messages until the surface pipe closes
    pub async fn run(&mut self, mut inbound: UnboundedReceiver<String>) {
        while let Some(raw) = inbound.recv().await {
            self.handle_message(&raw);
        }
        tracing::debug!("Surface pipe closed");
    }

    /// Send the displayed state to the surface. Dropped until READY.
    pub fn sync(&mut self) -> bool {
        self.bridge
            .post_sync(self.model.displayed_blocks(), self.model.selected_id())
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.model.select(id);
        let selected = self.model.selected_id();
        for listener in &mut self.selection_listeners {
            listener(selected);
        }
        self.sync();
    }

    /// Set or clear the variant overlay
    pub fn set_variant(&mut self, blocks: Option<Vec<Block>>) {
        self.model.set_variant(blocks);
        self.history.clear();
        self.changed();
    }

    pub fn append_block(&mut self, block: Block) {
        self.model.append_block(block);
        self.history.checkpoint();
        self.changed();
    }

    /// Replace the primary sequence with freshly generated content.
    ///
    /// On failure the document is left exactly as it was.
    pub async fn generate(
        &mut self,
        generator: &dyn Generator,
        input: &GenerateInput,
    ) -> EditorResult<()> {
        let blocks = match generator.generate(input).await {
            Ok(blocks) if blocks.is_empty() => Err(GenerateError::Empty),
            other => other,
        }
        .map_err(|e| {
            tracing::warn!(error = %e, "Generation failed; document unchanged");
            e
        })?;

        tracing::info!(blocks = blocks.len(), "Generated page");
        self.model.replace_primary(blocks);
        self.history.clear();
        self.changed();
        Ok(())
    }

    /// Load the document saved under the configured key.
    ///
    /// Returns `false` when nothing is stored there.
    pub async fn restore(&mut self, store: &dyn RecordStore) -> EditorResult<bool> {
        let Some(value) = store
            .load(&self.config.store_key)
            .await
            .map_err(EditorError::Store)?
        else {
            return Ok(false);
        };

        let snapshot: DocumentSnapshot = serde_json::from_value(value)?;
        tracing::info!(
            key = %self.config.store_key,
            blocks = snapshot.primary.len(),
            "Restored document"
        );
        self.model = DocumentModel::from_snapshot(snapshot);
        self.history.clear();
        self.sync();
        Ok(true)
    }

    /// Close the current undo entry so the next edit starts a new one
    pub fn checkpoint(&mut self) {
        self.history.checkpoint();
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&mut self.model) {
            Some(id) => {
                self.notify_block(&id);
                self.changed();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&mut self.model) {
            Some(id) => {
                self.notify_block(&id);
                self.changed();
                true
            }
            None => false,
        }
    }

    /// Cancel any pending write and release the surface. A write already in
    /// flight still completes.
    pub fn shutdown(mut self) {
        if self.writer.cancel() {
            tracing::debug!("Pending write cancelled");
        }
        tracing::info!("Editor session closed");
    }

    fn apply_change(&mut self, id: &str, content: &str) {
        match self.model.find(id) {
            None => {
                tracing::debug!(block_id = %id, "CHANGE for unknown block ignored");
                return;
            }
            Some(block) if block.markup == content => return,
            Some(_) => {}
        }

        let sequence = self.model.active_sequence();
        let before = self
            .model
            .replace_in(sequence, id, content)
            .unwrap_or_default();
        self.history.record(MarkupEdit {
            sequence,
            block_id: id.to_string(),
            before,
            after: content.to_string(),
        });

        tracing::debug!(block_id = %id, ?sequence, "Applied block change");
        self.notify_block(id);
        self.changed();
    }

    fn notify_block(&mut self, id: &str) {
        let Some(block) = self.model.find(id) else {
            return;
        };
        for listener in &mut self.block_listeners {
            listener(block);
        }
    }

    /// Persist later, show now
    fn changed(&mut self) {
        self.writer.schedule(self.model.snapshot());
        self.sync();
    }
}
