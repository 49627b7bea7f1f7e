//! Page files: the block sequence a page starts from

use anyhow::{bail, Context, Result};
use livepage_protocol::Block;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub blocks: Vec<Block>,
}

impl PageFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let page: PageFile = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a valid page file", path.display()))?;
        page.validate()?;
        Ok(page)
    }

    /// Block ids must be unique within a page
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for block in &self.blocks {
            if !seen.insert(block.id.as_str()) {
                bail!("Duplicate block id: {}", block.id);
            }
        }
        Ok(())
    }

    pub fn sample() -> Self {
        Self {
            title: Some("Sample landing page".to_string()),
            blocks: vec![
                Block::new(
                    "hero-1",
                    "hero",
                    "<section><h1>Launch faster</h1><p>Everything you need to ship your next idea.</p></section>",
                ),
                Block::new(
                    "features-1",
                    "features",
                    "<ul><li>Live preview</li><li>Undo that understands typing</li><li>Autosave</li></ul>",
                ),
                Block::new(
                    "cta-1",
                    "cta",
                    "<div><a href=\"#signup\">Start for free</a></div>",
                ),
            ],
        }
    }
}
