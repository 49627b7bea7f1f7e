//! # Document Model
//!
//! The host's source of truth: an ordered primary block sequence, an
//! optional variant sequence that shadows it, and the current selection.
//!
//! ## Display rule
//!
//! ```text
//! variant non-empty ──▶ variant is displayed and edited
//! otherwise         ──▶ primary is displayed and edited
//! ```
//!
//! Every mutation is synchronous and only touches the model. Persisting
//! and re-synchronizing the surface are the caller's job.

use livepage_protocol::Block;
use serde::{Deserialize, Serialize};

/// Which block sequence an operation applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Sequence {
    Primary,
    Variant,
}

/// Everything that gets persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub primary: Vec<Block>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<Vec<Block>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentModel {
    primary: Vec<Block>,
    variant: Option<Vec<Block>>,
    selected_id: Option<String>,

    /// Increments on every mutation
    version: u64,
}

impl DocumentModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(primary: Vec<Block>) -> Self {
        Self {
            primary,
            ..Self::default()
        }
    }

    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Self {
        let mut model = Self::from_blocks(snapshot.primary);
        model.set_variant(snapshot.variant);
        model.version = 0;
        model
    }

    /// The primary sequence
    pub fn blocks(&self) -> &[Block] {
        &self.primary
    }

    /// The variant sequence, if one is set
    pub fn variant(&self) -> Option<&[Block]> {
        self.variant.as_deref()
    }

    pub fn active_sequence(&self) -> Sequence {
        if self.variant.is_some() {
            Sequence::Variant
        } else {
            Sequence::Primary
        }
    }

    /// The sequence the surface shows and edits land in
    pub fn displayed_blocks(&self) -> &[Block] {
        self.sequence(self.active_sequence())
    }

    pub fn sequence(&self, sequence: Sequence) -> &[Block] {
        match sequence {
            Sequence::Primary => &self.primary,
            Sequence::Variant => self.variant.as_deref().unwrap_or(&[]),
        }
    }

    /// Selected block id, if it names a block that is currently displayed
    pub fn selected_id(&self) -> Option<&str> {
        let id = self.selected_id.as_deref()?;
        self.displayed_blocks()
            .iter()
            .any(|b| b.id == id)
            .then_some(id)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Replace one block's markup in the displayed sequence.
    ///
    /// An unknown id leaves the sequence untouched.
    pub fn replace_block(&mut self, id: &str, markup: impl Into<String>) -> &[Block] {
        let active = self.active_sequence();
        self.replace_in(active, id, markup);
        self.displayed_blocks()
    }

    /// Replace one block's markup in a specific sequence, returning the
    /// markup it had before. `None` when the id is not in that sequence.
    pub fn replace_in(
        &mut self,
        sequence: Sequence,
        id: &str,
        markup: impl Into<String>,
    ) -> Option<String> {
        let block = self.sequence_mut(sequence)?.iter_mut().find(|b| b.id == id)?;
        let previous = std::mem::replace(&mut block.markup, markup.into());
        self.version += 1;
        Some(previous)
    }

    /// Append to the displayed sequence
    pub fn append_block(&mut self, block: Block) -> &[Block] {
        match self.variant.as_mut() {
            Some(variant) => variant.push(block),
            None => self.primary.push(block),
        }
        self.version += 1;
        self.displayed_blocks()
    }

    /// Set or clear the variant overlay. An empty variant counts as cleared.
    pub fn set_variant(&mut self, blocks: Option<Vec<Block>>) {
        self.variant = blocks.filter(|b| !b.is_empty());
        self.version += 1;
    }

    pub fn select(&mut self, id: Option<&str>) {
        self.selected_id = id.map(str::to_string);
    }

    /// Replace the whole primary sequence, as generation and restore do
    pub fn replace_primary(&mut self, blocks: Vec<Block>) {
        self.primary = blocks;
        self.version += 1;
    }

    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            primary: self.primary.clone(),
            variant: self.variant.clone(),
        }
    }

    /// Find a block in the displayed sequence
    pub fn find(&self, id: &str) -> Option<&Block> {
        self.displayed_blocks().iter().find(|b| b.id == id)
    }

    fn sequence_mut(&mut self, sequence: Sequence) -> Option<&mut Vec<Block>> {
        match sequence {
            Sequence::Primary => Some(&mut self.primary),
            Sequence::Variant => self.variant.as_mut(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hero(markup: &str) -> Block {
        Block::new("hero-1", "hero", markup)
    }

    #[test]
    fn test_replace_block_returns_new_sequence() {
        let mut model = DocumentModel::from_blocks(vec![hero("<h1>Old</h1>")]);
        let blocks = model.replace_block("hero-1", "<h1>New</h1>");
        assert_eq!(blocks, &[hero("<h1>New</h1>")]);
        assert_eq!(model.version(), 1);
    }

    #[test]
    fn test_replace_unknown_block_is_noop() {
        let mut model = DocumentModel::from_blocks(vec![hero("<h1>Old</h1>")]);
        let blocks = model.replace_block("gone", "<h1>New</h1>").to_vec();
        assert_eq!(blocks, vec![hero("<h1>Old</h1>")]);
        assert_eq!(model.version(), 0);
    }

    #[test]
    fn test_variant_shadows_primary() {
        let mut model = DocumentModel::from_blocks(vec![hero("<h1>A</h1>")]);
        model.set_variant(Some(vec![hero("<h1>B</h1>")]));

        assert_eq!(model.active_sequence(), Sequence::Variant);
        model.replace_block("hero-1", "<h1>B2</h1>");
        assert_eq!(model.displayed_blocks(), &[hero("<h1>B2</h1>")]);
        assert_eq!(model.blocks(), &[hero("<h1>A</h1>")]);

        model.set_variant(None);
        assert_eq!(model.displayed_blocks(), &[hero("<h1>A</h1>")]);
    }

    #[test]
    fn test_empty_variant_counts_as_cleared() {
        let mut model = DocumentModel::from_blocks(vec![hero("<h1>A</h1>")]);
        model.set_variant(Some(vec![]));
        assert_eq!(model.active_sequence(), Sequence::Primary);
        assert_eq!(model.variant(), None);
    }

    #[test]
    fn test_append_goes_to_displayed_sequence() {
        let mut model = DocumentModel::from_blocks(vec![hero("<h1>A</h1>")]);
        model.set_variant(Some(vec![hero("<h1>B</h1>")]));
        let shown = model.append_block(Block::new("cta-1", "cta", "<a>Go</a>")).len();
        assert_eq!(shown, 2);
        assert_eq!(model.blocks().len(), 1);
    }

    #[test]
    fn test_stale_selection_reads_as_none() {
        let mut model = DocumentModel::from_blocks(vec![hero("<h1>A</h1>")]);
        model.select(Some("hero-1"));
        assert_eq!(model.selected_id(), Some("hero-1"));

        model.select(Some("missing"));
        assert_eq!(model.selected_id(), None);

        // Selection follows whichever sequence is displayed
        model.select(Some("hero-1"));
        model.set_variant(Some(vec![Block::new("v-1", "hero", "<h1>V</h1>")]));
        assert_eq!(model.selected_id(), None);
        model.set_variant(None);
        assert_eq!(model.selected_id(), Some("hero-1"));
    }

    #[test]
    fn test_snapshot_wire_shape() {
        let mut model = DocumentModel::from_blocks(vec![hero("<h1>A</h1>")]);
        let json = serde_json::to_value(model.snapshot()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"primary": [{"id": "hero-1", "kind": "hero", "markup": "<h1>A</h1>"}]})
        );

        model.set_variant(Some(vec![hero("<h1>B</h1>")]));
        let restored = DocumentModel::from_snapshot(model.snapshot());
        assert_eq!(restored.displayed_blocks(), &[hero("<h1>B</h1>")]);
        assert_eq!(restored.version(), 0);
    }
}
