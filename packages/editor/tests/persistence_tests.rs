//! Persistence gateway behaviour driven through the store
//!
//! Runs on tokio's paused clock so debounce windows are deterministic.
//!
//! This tests:
//! - Debounce collapsing (last write wins)
//! - Fire-time state resolution
//! - Cancel-on-delete
//! - Failures never rolling back local state
//! - Undo/redo reconciliation with the remote store
//! - Per-entity ordering of creates and deletes
//! - Dropping the store before flush

use async_trait::async_trait;
use pagecraft_editor::model::{
    Element, ElementId, ElementKind, ElementPatch, Page, PageId, Position, Section, SectionId, SectionKind, Size,
};
use pagecraft_editor::{
    DocumentStore, ElementUpdate, EditorConfig, InMemoryRepository, RepositoryCall, RepositoryError,
    SectionRepository, SectionUpdate,
};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn setup() -> (DocumentStore, Arc<InMemoryRepository>) {
    init_tracing();
    let repository = Arc::new(InMemoryRepository::new());
    let mut store = DocumentStore::new(EditorConfig::default(), repository.clone()).unwrap();
    store.load_page(Page::new("home", "Home"), Vec::new());
    (store, repository)
}

/// Backend whose creates answer much slower than its deletes
struct SlowCreates {
    inner: Arc<InMemoryRepository>,
}

const CREATE_LATENCY: Duration = Duration::from_millis(50);
const DELETE_LATENCY: Duration = Duration::from_millis(5);

#[async_trait]
impl SectionRepository for SlowCreates {
    async fn create_section(&self, section: &Section) -> Result<Section, RepositoryError> {
        tokio::time::sleep(CREATE_LATENCY).await;
        self.inner.create_section(section).await
    }

    async fn update_section(&self, id: SectionId, update: SectionUpdate) -> Result<(), RepositoryError> {
        self.inner.update_section(id, update).await
    }

    async fn delete_section(&self, id: SectionId) -> Result<bool, RepositoryError> {
        tokio::time::sleep(DELETE_LATENCY).await;
        self.inner.delete_section(id).await
    }

    async fn reorder_sections(&self, page_id: PageId, ordered: Vec<SectionId>) -> Result<(), RepositoryError> {
        self.inner.reorder_sections(page_id, ordered).await
    }

    async fn create_element(&self, element: &Element) -> Result<Element, RepositoryError> {
        tokio::time::sleep(CREATE_LATENCY).await;
        self.inner.create_element(element).await
    }

    async fn update_element(&self, id: ElementId, update: ElementUpdate) -> Result<(), RepositoryError> {
        self.inner.update_element(id, update).await
    }

    async fn delete_element(&self, id: ElementId) -> Result<bool, RepositoryError> {
        tokio::time::sleep(DELETE_LATENCY).await;
        self.inner.delete_element(id).await
    }
}

fn setup_slow_creates() -> (DocumentStore, Arc<InMemoryRepository>) {
    init_tracing();
    let repository = Arc::new(InMemoryRepository::new());
    let backend = Arc::new(SlowCreates {
        inner: repository.clone(),
    });
    let mut store = DocumentStore::new(EditorConfig::default(), backend).unwrap();
    store.load_page(Page::new("home", "Home"), Vec::new());
    (store, repository)
}

fn position_of(calls: &[RepositoryCall], wanted: &RepositoryCall) -> usize {
    calls
        .iter()
        .position(|call| call == wanted)
        .unwrap_or_else(|| panic!("{:?} missing from {:?}", wanted, calls))
}

fn x(value: f64) -> ElementPatch {
    ElementPatch {
        x: Some(value),
        ..ElementPatch::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_collapses_into_single_write() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Hero, None).unwrap();
    let id = store.add_element(section, ElementKind::Text, None).unwrap();

    store.update_element(id, x(1.0));
    store.update_element(id, x(2.0));
    store.update_element(id, x(3.0));
    assert_eq!(store.pending_writes(), 1);

    store.flush().await;

    let updates = repository.element_updates(id);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].x, Some(3.0));
    assert_eq!(repository.element(id).map(|el| el.x), Some(3.0));
}

#[tokio::test(start_paused = true)]
async fn test_reschedule_restarts_delay() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Hero, None).unwrap();
    let id = store.add_element(section, ElementKind::Text, None).unwrap();

    store.update_element(id, x(1.0));
    tokio::time::sleep(Duration::from_millis(400)).await;
    store.update_element(id, x(2.0));
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(repository.element_updates(id).is_empty());
    assert_eq!(store.pending_writes(), 1);

    store.flush().await;
    assert_eq!(repository.element_updates(id).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_write_reads_state_at_fire_time() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Image, None).unwrap();

    store.update_element(id, x(50.0));
    store.resize_element(id, Size::new(120.0, 80.0));
    store.flush().await;

    let full = repository
        .element_updates(id)
        .into_iter()
        .find(|update| update.content.is_some())
        .unwrap();
    assert_eq!(full.x, Some(50.0));
    assert_eq!(full.width, Some(120.0));
}

#[tokio::test(start_paused = true)]
async fn test_delete_cancels_pending_write() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Button, None).unwrap();

    store.move_element(id, Position::new(200.0, 200.0));
    store.update_element(id, x(10.0));
    assert_eq!(store.pending_writes(), 2);

    assert!(store.remove_element(id));
    assert_eq!(store.pending_writes(), 0);
    store.flush().await;

    assert!(repository.element_updates(id).is_empty());
    assert!(repository.calls().contains(&RepositoryCall::DeleteElement { id }));
    assert!(repository.element(id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_removing_section_cancels_element_writes() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Text, None).unwrap();

    store.update_element(id, x(5.0));
    store.remove_section(section);
    store.flush().await;

    assert!(repository.element_updates(id).is_empty());
    assert_eq!(repository.section_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failure_keeps_local_state() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Text, None).unwrap();
    store.flush().await;

    repository.fail_next(RepositoryError::Transport("connection reset".to_string()));
    store.update_element(id, x(77.0));
    store.flush().await;

    assert_eq!(store.element(id).map(|el| el.x), Some(77.0));
    assert_eq!(repository.element(id).map(|el| el.x), Some(0.0));
    assert_eq!(repository.element_updates(id).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reorder_is_debounced_per_page() {
    let (mut store, repository) = setup();
    let a = store.add_section(SectionKind::Hero, None).unwrap();
    let b = store.add_section(SectionKind::Content, None).unwrap();
    let c = store.add_section(SectionKind::Footer, None).unwrap();

    store.reorder_sections(0, 2);
    store.reorder_sections(0, 1);
    store.flush().await;

    let reorders: Vec<_> = repository
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            RepositoryCall::ReorderSections { ordered, .. } => Some(ordered),
            _ => None,
        })
        .collect();
    assert_eq!(reorders, vec![vec![c, b, a]]);
    assert_eq!(repository.section(a).map(|s| s.order_index), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_undo_redo_reconcile_remote() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Text, None).unwrap();
    store.flush().await;
    assert!(repository.element(id).is_some());

    assert!(store.undo());
    store.flush().await;
    assert!(store.element(id).is_none());
    assert!(repository.element(id).is_none());

    assert!(store.redo());
    store.flush().await;
    assert!(store.element(id).is_some());
    assert!(repository.element(id).is_some());

    assert!(store.undo());
    assert!(store.undo());
    store.flush().await;
    assert_eq!(repository.section_count(), 0);
    assert_eq!(repository.element_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_undo_schedules_update_for_changed_element() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let a = store.add_element(section, ElementKind::Text, None).unwrap();
    let _b = store.add_element(section, ElementKind::Text, None).unwrap();
    store.flush().await;

    store.bring_to_front(a);
    store.flush().await;
    assert_eq!(repository.element(a).map(|el| el.z_index), Some(2));

    store.undo();
    store.flush().await;
    assert_eq!(repository.element(a).map(|el| el.z_index), Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_undo_of_unconfirmed_create_leaves_no_remote_element() {
    let (mut store, repository) = setup_slow_creates();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Text, None).unwrap();

    assert!(store.undo());
    store.flush().await;

    assert!(store.element(id).is_none());
    assert!(repository.element(id).is_none());

    let calls = repository.calls();
    let created = position_of(&calls, &RepositoryCall::CreateElement { id });
    let deleted = position_of(&calls, &RepositoryCall::DeleteElement { id });
    assert!(created < deleted, "delete landed before create: {:?}", calls);
}

#[tokio::test(start_paused = true)]
async fn test_remove_of_unconfirmed_create_leaves_no_remote_element() {
    let (mut store, repository) = setup_slow_creates();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Text, None).unwrap();
    let kept = store.add_element(section, ElementKind::Image, None).unwrap();

    assert!(store.remove_element(id));
    store.flush().await;

    assert!(repository.element(id).is_none());
    assert!(repository.element(kept).is_some());
    assert!(repository.section(section).is_some());
}

#[tokio::test(start_paused = true)]
async fn test_section_delete_waits_for_its_create() {
    let (mut store, repository) = setup_slow_creates();
    let section = store.add_section(SectionKind::Hero, None).unwrap();

    assert!(store.remove_section(section));
    store.flush().await;

    assert_eq!(repository.section_count(), 0);
    let calls = repository.calls();
    assert!(
        position_of(&calls, &RepositoryCall::CreateSection { id: section })
            < position_of(&calls, &RepositoryCall::DeleteSection { id: section })
    );
}

#[tokio::test(start_paused = true)]
async fn test_drop_without_flush_discards_armed_writes() {
    let (mut store, repository) = setup();
    let section = store.add_section(SectionKind::Content, None).unwrap();
    let id = store.add_element(section, ElementKind::Text, None).unwrap();
    store.flush().await;

    store.update_element(id, x(42.0));
    assert_eq!(store.pending_writes(), 1);
    drop(store);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(repository.element_updates(id).is_empty());
    assert_eq!(repository.element(id).map(|el| el.x), Some(0.0));
}
