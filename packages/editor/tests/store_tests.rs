//! Document store behaviour through the public API
//!
//! This tests:
//! - Page loading and reads
//! - Selection rules (replace, add, remove, select-all skips locked)
//! - Section/element lifecycle with selection pruning
//! - Runtime grid settings
//! - Config loaded from disk

use pagecraft_editor::model::{
    Background, ElementId, ElementKind, ElementPatch, Page, Position, Section, SectionKind, SectionPatch, Size,
};
use pagecraft_editor::{DocumentStore, EditorConfig, EditorError, InMemoryRepository, DEFAULT_CONFIG_NAME};
use serde_json::json;
use std::sync::Arc;

fn new_store() -> DocumentStore {
    let mut store = DocumentStore::new(EditorConfig::default(), Arc::new(InMemoryRepository::new())).unwrap();
    store.load_page(Page::new("landing", "Landing"), Vec::new());
    store
}

#[tokio::test]
async fn test_store_uses_config_from_disk() -> anyhow::Result<()> {
    let dir = std::env::temp_dir().join(format!("pagecraft-config-{}", ElementId::new()));
    std::fs::create_dir_all(&dir)?;
    std::fs::write(
        dir.join(DEFAULT_CONFIG_NAME),
        json!({ "gridSize": 25, "pasteOffset": 5 }).to_string(),
    )?;

    let config = EditorConfig::load(&dir)?;
    std::fs::remove_dir_all(&dir)?;
    assert_eq!(config.grid_size, 25.0);
    assert_eq!(config.debounce_ms, EditorConfig::default().debounce_ms);

    let mut store = DocumentStore::new(config, Arc::new(InMemoryRepository::new()))?;
    store.load_page(Page::new("landing", "Landing"), Vec::new());
    let section = store
        .add_section(SectionKind::Hero, None)
        .ok_or_else(|| anyhow::anyhow!("section was not added"))?;
    let id = store
        .add_element(section, ElementKind::Text, Some(Position::new(37.0, 61.0)))
        .ok_or_else(|| anyhow::anyhow!("element was not added"))?;

    let element = store.element(id).ok_or_else(|| anyhow::anyhow!("element missing"))?;
    assert_eq!((element.x, element.y), (25.0, 50.0));
    Ok(())
}

#[test]
fn test_store_requires_runtime() {
    let result = DocumentStore::new(EditorConfig::default(), Arc::new(InMemoryRepository::new()));
    assert!(matches!(result, Err(EditorError::NoRuntime(_))));
}

#[tokio::test]
async fn test_load_page_normalizes_order() {
    let mut store = DocumentStore::new(EditorConfig::default(), Arc::new(InMemoryRepository::new())).unwrap();
    let page = Page::new("about", "About");

    let footer = Section::new(page.id, SectionKind::Footer, 7);
    let hero = Section::new(page.id, SectionKind::Hero, 2);
    let (footer_id, hero_id) = (footer.id, hero.id);

    store.load_page(page.clone(), vec![footer, hero]);

    assert_eq!(store.active_page().map(|p| p.id), Some(page.id));
    assert_eq!(store.document().section_ids(), vec![hero_id, footer_id]);
    let indices: Vec<usize> = store.sections().iter().map(|s| s.order_index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert!(!store.has_undo());
    assert!(!store.has_redo());
}

#[tokio::test]
async fn test_load_page_resets_session_state() {
    let mut store = new_store();
    let section = store.add_section(SectionKind::Hero, None).unwrap();
    let element = store.add_element(section, ElementKind::Text, None).unwrap();
    store.copy_element(element);

    store.load_page(Page::new("other", "Other"), Vec::new());

    assert!(store.sections().is_empty());
    assert!(store.selection().is_empty());
    assert!(store.clipboard().is_none());
    assert!(!store.has_undo());
    assert_eq!(store.pending_writes(), 0);
}

#[tokio::test]
async fn test_selection_operations() {
    let mut store = new_store();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let a = store.add_element(section, ElementKind::Text, None).unwrap();
    let b = store.add_element(section, ElementKind::Image, None).unwrap();
    let c = store.add_element(section, ElementKind::Button, None).unwrap();

    assert!(store.select_element(a));
    assert_eq!(store.selection().ids(), &[a]);

    assert!(store.add_to_selection(b));
    assert!(!store.add_to_selection(b));
    assert_eq!(store.selection().ids(), &[a, b]);

    assert!(store.remove_from_selection(a));
    assert_eq!(store.selection().ids(), &[b]);

    store.select_elements(&[c, a, c]);
    assert_eq!(store.selection().ids(), &[c, a]);

    store.clear_selection();
    assert!(store.selection().is_empty());

    let unknown = pagecraft_editor::model::ElementId::new();
    assert!(!store.select_element(unknown));
    assert!(!store.add_to_selection(unknown));
}

#[tokio::test]
async fn test_select_all_skips_locked() {
    let mut store = new_store();
    let section = store.add_section(SectionKind::Gallery, None).unwrap();
    let a = store.add_element(section, ElementKind::Image, None).unwrap();
    let b = store.add_element(section, ElementKind::Image, None).unwrap();
    let c = store.add_element(section, ElementKind::Image, None).unwrap();
    store.toggle_lock(b);

    assert_eq!(store.select_all_in_section(section), 2);
    assert_eq!(store.selection().ids(), &[a, c]);

    let selected: Vec<_> = store.selected_elements().iter().map(|el| el.id).collect();
    assert_eq!(selected, vec![a, c]);
}

#[tokio::test]
async fn test_removing_section_prunes_selection() {
    let mut store = new_store();
    let keep = store.add_section(SectionKind::Hero, None).unwrap();
    let doomed = store.add_section(SectionKind::Footer, None).unwrap();
    let kept = store.add_element(keep, ElementKind::Text, None).unwrap();
    let gone = store.add_element(doomed, ElementKind::Text, None).unwrap();

    store.select_elements(&[kept, gone]);
    store.select_section(Some(doomed));
    assert!(store.remove_section(doomed));

    assert_eq!(store.selection().ids(), &[kept]);
    assert_eq!(store.selected_section(), None);
    assert!(store.element(gone).is_none());
}

#[tokio::test]
async fn test_update_section_merges_config() {
    let mut store = new_store();
    let section = store.add_section(SectionKind::CallToAction, None).unwrap();

    let first = SectionPatch {
        config: json!({ "headline": "Hi", "align": "left" }).as_object().cloned(),
        background: Some(Background::Color {
            value: "#101010".to_string(),
        }),
        ..SectionPatch::default()
    };
    let second = SectionPatch {
        config: json!({ "align": "center" }).as_object().cloned(),
        min_height: Some(640.0),
        ..SectionPatch::default()
    };

    assert!(store.update_section(section, first));
    assert!(store.update_section(section, second));

    let updated = store.section(section).unwrap();
    assert_eq!(updated.config.get("headline"), Some(&json!("Hi")));
    assert_eq!(updated.config.get("align"), Some(&json!("center")));
    assert_eq!(updated.min_height, 640.0);
    assert!(updated.background.is_some());
}

#[tokio::test]
async fn test_batch_update_skips_unknown_ids() {
    let mut store = new_store();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let a = store.add_element(section, ElementKind::Text, None).unwrap();
    let b = store.add_element(section, ElementKind::Text, None).unwrap();
    let unknown = pagecraft_editor::model::ElementId::new();

    let patch = ElementPatch {
        hidden: Some(true),
        ..ElementPatch::default()
    };
    assert_eq!(store.update_elements(&[a, unknown, b], patch), 2);
    assert!(store.element(a).unwrap().hidden);
    assert!(store.element(b).unwrap().hidden);
}

#[tokio::test]
async fn test_grid_settings() {
    let mut store = new_store();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Divider, None).unwrap();

    store.set_grid_size(25.0);
    store.move_element(id, Position::new(30.0, 40.0));
    assert_eq!(store.element(id).unwrap().position(), Position::new(25.0, 50.0));

    store.set_snap_to_grid(false);
    store.move_element(id, Position::new(31.0, 42.5));
    assert_eq!(store.element(id).unwrap().position(), Position::new(31.0, 42.5));

    store.resize_element(id, Size::new(333.3, 3.0));
    assert_eq!(store.element(id).unwrap().size(), Size::new(333.3, 3.0));
}

#[tokio::test]
async fn test_duplicate_element_offsets_in_place() {
    let mut store = new_store();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let original = store
        .add_element(section, ElementKind::Video, Some(Position::new(100.0, 100.0)))
        .unwrap();

    let copy = store.duplicate_element(original).unwrap();
    let element = store.element(copy).unwrap();

    assert_eq!(element.section_id, section);
    assert_eq!(element.position(), Position::new(120.0, 120.0));
    assert_eq!(element.kind(), ElementKind::Video);
    assert_eq!(store.selection().ids(), &[copy]);
}

#[tokio::test]
async fn test_paste_into_other_section() {
    let mut store = new_store();
    let source = store.add_section(SectionKind::Hero, None).unwrap();
    let target = store.add_section(SectionKind::Footer, None).unwrap();
    let original = store.add_element(source, ElementKind::Button, None).unwrap();

    store.copy_element(original);
    let pasted = store.paste_into(target, None).unwrap();

    assert_eq!(store.element(pasted).unwrap().section_id, target);
    assert_eq!(store.elements_in(target).unwrap().len(), 1);
    assert_eq!(store.elements_in(source).unwrap().len(), 1);
}
