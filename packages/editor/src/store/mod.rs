//! # Document Store
//!
//! Sole authority over the in-memory page tree. Every public mutation
//! follows the same sequence:
//!
//! ```text
//! validate → (history frame if structural) → mutate → reindex → publish → persist
//! ```
//!
//! - Validation failures are logged and turn the call into a no-op; the
//!   return value (`bool` / `Option<Id>`) tells the caller whether
//!   anything happened.
//! - Structural operations go through [`DocumentStore::apply_tracked`],
//!   continuous ones (move, resize, property edits) through
//!   [`DocumentStore::apply_untracked`].
//! - After every mutation the document is published to the persistence
//!   gateway, which mirrors it to the repository in the background.
//!
//! All mutations run synchronously on the caller's task. The only
//! concurrency is between local edits and in-flight repository writes.

mod elements;
mod grouping;
mod sections;

use crate::clipboard::Clipboard;
use crate::config::EditorConfig;
use crate::document::Document;
use crate::errors::{EditorError, ValidationError};
use crate::history::History;
use crate::layout;
use crate::persistence::{PersistKey, PersistenceGateway};
use crate::repository::SectionRepository;
use crate::selection::Selection;
use pagecraft_model::{Element, ElementId, Page, Position, Section, SectionId, SectionTree};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct DocumentStore {
    config: EditorConfig,
    document: Document,
    history: History<SectionTree>,
    selection: Selection,
    selected_section: Option<SectionId>,
    clipboard: Clipboard,
    publisher: watch::Sender<Document>,
    gateway: PersistenceGateway,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("page", &self.document.page.as_ref().map(|p| p.id))
            .field("sections", &self.document.sections.len())
            .field("selection", &self.selection)
            .field("undo_levels", &self.history.undo_levels())
            .field("redo_levels", &self.history.redo_levels())
            .field("gateway", &self.gateway)
            .finish()
    }
}

impl DocumentStore {
    /// Create a store for one editing session. Must be called from inside
    /// a tokio runtime; background writes are spawned on it.
    pub fn new(config: EditorConfig, repository: Arc<dyn SectionRepository>) -> Result<Self, EditorError> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_runtime(config, repository, runtime))
    }

    pub fn with_runtime(config: EditorConfig, repository: Arc<dyn SectionRepository>, runtime: Handle) -> Self {
        let (publisher, state) = watch::channel(Document::default());
        let gateway = PersistenceGateway::new(repository, runtime, config.debounce(), state);

        Self {
            history: History::new(config.history_limit),
            config,
            document: Document::default(),
            selection: Selection::new(),
            selected_section: None,
            clipboard: Clipboard::new(),
            publisher,
            gateway,
        }
    }

    // ====================================================================
    // Page lifecycle
    // ====================================================================

    /// Replace the document with an already fetched page tree.
    ///
    /// Selection, clipboard and history start empty; pending writes of the
    /// previous page are cancelled.
    pub fn load_page(&mut self, page: Page, mut sections: Vec<Section>) {
        self.gateway.cancel_all();

        sections.sort_by_key(|s| s.order_index);
        info!(page_id = %page.id, sections = sections.len(), "loading page");

        self.document = Document {
            page: Some(page),
            sections: sections.into(),
        };
        self.document.normalize_order();
        self.selection.clear();
        self.selected_section = None;
        self.clipboard.clear();
        self.history.clear();
        self.publish();
    }

    // ====================================================================
    // Reads
    // ====================================================================

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn active_page(&self) -> Option<&Page> {
        self.document.page.as_ref()
    }

    pub fn sections(&self) -> &SectionTree {
        &self.document.sections
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.document.section(id)
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.document.element(id)
    }

    pub fn elements_in(&self, section_id: SectionId) -> Option<&im::Vector<Element>> {
        self.document.section(section_id).map(|s| &s.elements)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected_elements(&self) -> Vec<&Element> {
        self.selection
            .ids()
            .iter()
            .filter_map(|id| self.document.element(*id))
            .collect()
    }

    pub fn selected_section(&self) -> Option<SectionId> {
        self.selected_section
    }

    pub fn clipboard(&self) -> Option<&Element> {
        self.clipboard.peek()
    }

    pub fn history(&self) -> &History<SectionTree> {
        &self.history
    }

    pub fn has_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn has_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Number of armed debounce timers
    pub fn pending_writes(&self) -> usize {
        self.gateway.pending_count()
    }

    // ====================================================================
    // Settings
    // ====================================================================

    pub fn set_grid_size(&mut self, grid_size: f64) {
        self.config.grid_size = grid_size;
    }

    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.config.snap_to_grid = snap;
    }

    fn grid(&self) -> f64 {
        if self.config.snap_to_grid {
            self.config.grid_size
        } else {
            0.0
        }
    }

    fn snap(&self, position: Position) -> Position {
        layout::snap_position(position, self.grid())
    }

    // ====================================================================
    // Mutation paths
    // ====================================================================

    /// Capture a history frame, then mutate
    pub(crate) fn apply_tracked<R>(&mut self, mutate: impl FnOnce(&mut Document) -> R) -> R {
        self.save_to_history();
        self.apply_untracked(mutate)
    }

    /// Mutate without touching history
    pub(crate) fn apply_untracked<R>(&mut self, mutate: impl FnOnce(&mut Document) -> R) -> R {
        let result = mutate(&mut self.document);
        self.sync_selection();
        self.publish();
        result
    }

    fn publish(&mut self) {
        self.publisher.send_replace(self.document.clone());
    }

    /// Drop selected ids that no longer exist
    fn sync_selection(&mut self) {
        let document = &self.document;
        self.selection.retain(|id| document.contains_element(id));
        if let Some(section) = self.selected_section {
            if document.section(section).is_none() {
                self.selected_section = None;
            }
        }
    }

    fn persist(&mut self, key: PersistKey) {
        self.gateway.schedule(key);
    }

    /// Schedule a reorder write for the active page
    fn persist_order(&mut self) {
        if let Some(page_id) = self.document.page.as_ref().map(|p| p.id) {
            self.gateway.schedule(PersistKey::SectionOrder(page_id));
        }
    }

    /// Wait for every scheduled and in-flight repository write.
    ///
    /// Call this before dropping the store: dropping it discards writes
    /// whose debounce timer has not fired yet.
    pub async fn flush(&mut self) {
        self.gateway.flush().await;
    }

    // ====================================================================
    // History
    // ====================================================================

    /// Push the current section tree as an undo point and clear redo.
    /// A frame identical to the newest one is not recorded twice.
    pub fn save_to_history(&mut self) -> bool {
        let saved = self.history.save(&self.document.sections);
        if saved {
            debug!(undo_levels = self.history.undo_levels(), "history frame captured");
        }
        saved
    }

    pub fn undo(&mut self) -> bool {
        let Some(frame) = self.history.undo(&self.document.sections) else {
            debug!("nothing to undo");
            return false;
        };
        self.restore(frame);
        info!(undo_levels = self.history.undo_levels(), "undo");
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(frame) = self.history.redo(&self.document.sections) else {
            debug!("nothing to redo");
            return false;
        };
        self.restore(frame);
        info!(redo_levels = self.history.redo_levels(), "redo");
        true
    }

    /// Swap in a history frame and bring the repository in line with it
    fn restore(&mut self, frame: SectionTree) {
        let before = std::mem::replace(&mut self.document.sections, frame);
        self.sync_selection();
        self.publish();
        self.reconcile(&before);
    }

    /// Issue the writes that turn `before` into the current tree remotely
    fn reconcile(&mut self, before: &SectionTree) {
        let previous: HashMap<SectionId, &Section> = before.iter().map(|s| (s.id, s)).collect();
        let current = self.document.sections.clone();

        for section in current.iter() {
            let Some(old) = previous.get(&section.id) else {
                self.gateway.create_section(section.clone());
                continue;
            };

            if old.background != section.background
                || old.min_height != section.min_height
                || old.config != section.config
            {
                self.persist(PersistKey::Section(section.id));
            }

            for element in section.elements.iter() {
                match old.element(element.id) {
                    None => self.gateway.create_element(element.clone()),
                    Some(prior) if prior != element => self.persist(PersistKey::Element(element.id)),
                    Some(_) => {}
                }
            }

            for prior in old.elements.iter() {
                if !section.contains(prior.id) {
                    self.gateway.delete_element(prior.id);
                }
            }
        }

        for old in before.iter() {
            if current.iter().all(|s| s.id != old.id) {
                let element_ids: Vec<ElementId> = old.elements.iter().map(|el| el.id).collect();
                self.gateway.delete_section(old.id, element_ids);
            }
        }

        let order_before: Vec<SectionId> = before.iter().map(|s| s.id).collect();
        if order_before != self.document.section_ids() {
            self.persist_order();
        }
    }

    // ====================================================================
    // Selection
    // ====================================================================

    pub fn select_element(&mut self, id: ElementId) -> bool {
        if !self.document.contains_element(id) {
            reject("select_element", ValidationError::ElementNotFound(id));
            return false;
        }
        self.selection.select(id);
        true
    }

    /// Replace the selection; unknown ids are ignored
    pub fn select_elements(&mut self, ids: &[ElementId]) {
        let document = &self.document;
        self.selection
            .select_many(ids.iter().copied().filter(|id| document.contains_element(*id)));
    }

    pub fn add_to_selection(&mut self, id: ElementId) -> bool {
        if !self.document.contains_element(id) {
            reject("add_to_selection", ValidationError::ElementNotFound(id));
            return false;
        }
        self.selection.add(id)
    }

    pub fn remove_from_selection(&mut self, id: ElementId) -> bool {
        self.selection.remove(id)
    }

    /// Select every unlocked element of a section
    pub fn select_all_in_section(&mut self, section_id: SectionId) -> usize {
        let Some(section) = self.document.section(section_id) else {
            reject("select_all_in_section", ValidationError::SectionNotFound(section_id));
            return 0;
        };
        let ids: Vec<ElementId> = section
            .elements
            .iter()
            .filter(|el| !el.locked)
            .map(|el| el.id)
            .collect();
        self.selection.select_many(ids);
        self.selection.len()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn select_section(&mut self, id: Option<SectionId>) -> bool {
        match id {
            Some(section_id) if self.document.section(section_id).is_none() => {
                reject("select_section", ValidationError::SectionNotFound(section_id));
                false
            }
            _ => {
                self.selected_section = id;
                true
            }
        }
    }
}

/// Log a rejected operation
fn reject(operation: &'static str, error: ValidationError) {
    warn!(operation, %error, "operation skipped");
}

/// Unwrap a validated result, logging the rejection
fn logged<T>(operation: &'static str, result: Result<T, ValidationError>) -> Option<T> {
    result.map_err(|error| reject(operation, error)).ok()
}
