//! Surface-side synchronization driven by a hand-rolled host

use livepage_protocol::{decode_surface_message, Block, HostMessage, SurfaceMessage};
use livepage_surface::{RenderingSurface, ResourceRegistry, SurfaceError, SyncOutcome};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

fn launch(registry: &ResourceRegistry, url: &str) -> (RenderingSurface, UnboundedReceiver<String>) {
    let (tx, mut rx) = unbounded_channel();
    let mut surface = RenderingSurface::load(registry, url, tx).unwrap();
    surface.boot();
    assert_eq!(
        decode_surface_message(&rx.try_recv().unwrap()),
        Some(SurfaceMessage::Ready)
    );
    (surface, rx)
}

fn page() -> Vec<Block> {
    vec![
        Block::new("hero-1", "hero", "<h1>Old</h1><p>Build pages <b>fast</b></p>"),
        Block::new("cta-1", "cta", r#"<div class=cta><a href="/go">Start</a></div>"#),
    ]
}

/// Apply a CHANGE to a host-side copy of the blocks the way the editor does
fn apply_change(blocks: &mut [Block], raw: &str) -> String {
    match decode_surface_message(raw) {
        Some(SurfaceMessage::Change { id, content }) => {
            if let Some(block) = blocks.iter_mut().find(|b| b.id == id) {
                block.markup = content;
            }
            id
        }
        other => panic!("expected change, got {:?}", other),
    }
}

#[test]
fn test_repeated_sync_replaces_root_once() {
    let registry = ResourceRegistry::new();
    let resource = registry.register_bootstrap();
    let (mut surface, _rx) = launch(&registry, resource.url());

    let wire = HostMessage::sync(&page(), Some("cta-1")).to_wire();
    assert_eq!(surface.handle_message(&wire), Some(SyncOutcome::Replaced));
    for _ in 0..3 {
        assert_eq!(surface.handle_message(&wire), Some(SyncOutcome::Unchanged));
    }
    assert_eq!(surface.root_replacements(), 1);
}

#[test]
fn test_typing_burst_never_replaces_root() {
    let registry = ResourceRegistry::new();
    let resource = registry.register_bootstrap();
    let (mut surface, mut rx) = launch(&registry, resource.url());

    let mut blocks = page();
    surface.apply_sync(&blocks, None);

    let heading = surface.find_text("Old").unwrap();
    for (i, ch) in "er than ever".chars().enumerate() {
        surface.type_text(heading, 3 + i, &ch.to_string()).unwrap();

        let id = apply_change(&mut blocks, &rx.try_recv().unwrap());
        assert_eq!(id, "hero-1");

        // The host echoes every change straight back
        let echo = HostMessage::sync(&blocks, None).to_wire();
        assert_eq!(surface.handle_message(&echo), Some(SyncOutcome::Unchanged));
    }

    assert_eq!(surface.root_replacements(), 1);
    assert_eq!(surface.dom().text(heading), Some("Older than ever"));
    assert_eq!(surface.caret().map(|c| c.offset), Some(15));
}

#[test]
fn test_typing_beside_embedded_style_sends_css_verbatim() {
    let registry = ResourceRegistry::new();
    let resource = registry.register_bootstrap();
    let (mut surface, mut rx) = launch(&registry, resource.url());

    let mut blocks = vec![Block::new(
        "hero-1",
        "hero",
        "<style>.hero > p { color: red }</style><p>Hi</p>",
    )];
    surface.apply_sync(&blocks, None);

    let greeting = surface.find_text("Hi").unwrap();
    surface.type_text(greeting, 2, "!").unwrap();

    let raw = rx.try_recv().unwrap();
    assert_eq!(
        decode_surface_message(&raw),
        Some(SurfaceMessage::Change {
            id: "hero-1".to_string(),
            content: concat!(
                "<style>.hero > p { color: red }</style>",
                r#"<p contenteditable="true" spellcheck="false">Hi!</p>"#
            )
            .to_string(),
        })
    );

    apply_change(&mut blocks, &raw);
    let echo = HostMessage::sync(&blocks, None).to_wire();
    assert_eq!(surface.handle_message(&echo), Some(SyncOutcome::Unchanged));
}

#[test]
fn test_unknown_selection_marks_nothing_active() {
    let registry = ResourceRegistry::new();
    let resource = registry.register_bootstrap();
    let (mut surface, _rx) = launch(&registry, resource.url());

    surface.apply_sync(&page(), Some("deleted-block"));
    assert_eq!(surface.active_block(), None);
    assert!(!surface.rendered_html().contains("lp-active"));
}

#[test]
fn test_click_round_trip_moves_highlight() {
    let registry = ResourceRegistry::new();
    let resource = registry.register_bootstrap();
    let (mut surface, mut rx) = launch(&registry, resource.url());

    let blocks = page();
    surface.apply_sync(&blocks, Some("hero-1"));

    let link_text = surface.find_text("Start").unwrap();
    assert!(surface.click(link_text));
    let selected = match decode_surface_message(&rx.try_recv().unwrap()) {
        Some(SurfaceMessage::Select { id }) => id,
        other => panic!("expected select, got {:?}", other),
    };
    assert_eq!(selected, "cta-1");

    let wire = HostMessage::sync(&blocks, Some(&selected)).to_wire();
    assert_eq!(surface.handle_message(&wire), Some(SyncOutcome::Replaced));
    assert_eq!(surface.active_block(), Some("cta-1".to_string()));
}

#[test]
fn test_nested_wrapper_is_locked() {
    let registry = ResourceRegistry::new();
    let resource = registry.register_bootstrap();
    let (mut surface, _rx) = launch(&registry, resource.url());

    surface.apply_sync(
        &[Block::new(
            "f",
            "features",
            r#"<li>Fast <span><img src="bolt.svg"></span></li>"#,
        )],
        None,
    );
    assert_eq!(
        surface.rendered_html(),
        concat!(
            r#"<div class="lp-block" data-block-id="f">"#,
            r#"<li contenteditable="true" spellcheck="false">Fast "#,
            r#"<span contenteditable="false"><img src="bolt.svg" contenteditable="false"></span>"#,
            "</li></div>"
        )
    );
}

#[test]
fn test_released_resource_cannot_be_loaded() {
    let registry = ResourceRegistry::new();
    let url = {
        let resource = registry.register_bootstrap();
        resource.url().to_string()
    };

    let (tx, _rx) = unbounded_channel();
    assert!(matches!(
        RenderingSurface::load(&registry, &url, tx),
        Err(SurfaceError::ResourceRevoked(_))
    ));

    let (tx, _rx) = unbounded_channel();
    assert!(matches!(
        RenderingSurface::load(&registry, "https://example.com/boot.html", tx),
        Err(SurfaceError::RemoteBootstrap(_))
    ));
}
