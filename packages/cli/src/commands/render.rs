use super::resolve;
use crate::config::Config;
use crate::page::PageFile;
use anyhow::{Context, Result};
use clap::Args;
use livepage_editor::{DocumentModel, EditorConfig, EditorSession, MemoryStore, StorePersist};
use livepage_surface::{HeadlessLauncher, ResourceRegistry};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Page file to render
    pub page: PathBuf,

    /// Block to highlight as selected
    #[arg(short, long)]
    pub selected: Option<String>,

    /// Page file whose blocks are shown in place of the page's own
    #[arg(long)]
    pub variant: Option<PathBuf>,
}

pub fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let page = PageFile::load(&resolve(cwd, &args.page))?;
    let variant = args
        .variant
        .map(|path| PageFile::load(&resolve(cwd, &path)))
        .transpose()?;

    let runtime = tokio::runtime::Runtime::new()?;
    let html = runtime.block_on(render_page(
        page,
        variant,
        args.selected.as_deref(),
        config.editor,
    ))?;

    println!("{}", html);
    Ok(())
}

/// Render a page through a headless surface and return its live markup
pub async fn render_page(
    page: PageFile,
    variant: Option<PageFile>,
    selected: Option<&str>,
    editor: EditorConfig,
) -> Result<String> {
    let registry = ResourceRegistry::new();
    let (launcher, controller) = HeadlessLauncher::new();
    let persist = Arc::new(StorePersist::new(
        Arc::new(MemoryStore::new()),
        editor.store_key.clone(),
    ));

    let (mut session, mut inbound) = EditorSession::new(
        DocumentModel::from_blocks(page.blocks),
        editor,
        &registry,
        &launcher,
        persist,
    )?;

    if let Some(variant) = variant {
        session.set_variant(Some(variant.blocks));
    }
    session.select(selected);

    // Nothing reaches the surface before this
    let ready = inbound
        .recv()
        .await
        .context("Surface closed before it was ready")?;
    session.handle_message(&ready);

    let snapshot = controller.snapshot().await?;
    tracing::debug!(replacements = snapshot.root_replacements, "Rendered page");
    session.shutdown();

    Ok(snapshot.html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepage_protocol::Block;

    #[tokio::test]
    async fn test_render_marks_selection_and_editables() {
        let html = render_page(
            PageFile::sample(),
            None,
            Some("cta-1"),
            EditorConfig::default(),
        )
        .await
        .unwrap();

        assert!(html.contains(r#"<div class="lp-block lp-active" data-block-id="cta-1">"#));
        assert!(html.contains(r#"<h1 contenteditable="true" spellcheck="false">Launch faster</h1>"#));
        assert!(html.contains(r#"<section>"#));
        assert_eq!(html.matches("lp-active").count(), 1);
    }

    #[tokio::test]
    async fn test_render_shows_variant() {
        let variant = PageFile {
            title: None,
            blocks: vec![Block::new("hero-1", "hero", "<h1>Variant B</h1>")],
        };
        let html = render_page(PageFile::sample(), Some(variant), None, EditorConfig::default())
            .await
            .unwrap();

        assert!(html.contains("Variant B"));
        assert!(!html.contains("Launch faster"));
    }
}
