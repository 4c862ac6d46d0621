//! # Pagecraft Editor
//!
//! In-memory document engine behind the visual page editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ view layer: user intents, reads state       │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ DocumentStore: page → sections → elements   │
//! │  - History (bounded snapshot undo/redo)     │
//! │  - Selection + Clipboard                    │
//! │  - Layout (align / distribute / snap)       │
//! │  - Grouping via container references        │
//! └─────────────────────────────────────────────┘
//!                     ↓ watch::channel<Document>
//! ┌─────────────────────────────────────────────┐
//! │ PersistenceGateway: debounced per-key writes│
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ SectionRepository (remote store)            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Local first**: every edit lands in memory immediately
//! 2. **Server catches up**: writes are fire-and-forget, failures never roll back
//! 3. **Last write wins per key**: bursts collapse into one debounced write
//! 4. **Structural edits are undoable**, continuous transforms are not
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagecraft_editor::{DocumentStore, EditorConfig, InMemoryRepository};
//! use pagecraft_model::{ElementKind, Page, SectionKind};
//!
//! let repository = Arc::new(InMemoryRepository::new());
//! let mut store = DocumentStore::new(EditorConfig::default(), repository)?;
//! store.load_page(Page::new("home", "Home"), Vec::new());
//!
//! let hero = store.add_section(SectionKind::Hero, None).unwrap();
//! let title = store.add_element(hero, ElementKind::Text, None).unwrap();
//! store.move_element(title, Position::new(40.0, 80.0));
//!
//! store.undo();
//! store.flush().await;
//! ```

mod clipboard;
mod config;
mod document;
mod errors;
mod history;
mod layout;
mod persistence;
mod repository;
mod selection;
mod store;

pub use clipboard::Clipboard;
pub use config::{EditorConfig, DEFAULT_CONFIG_NAME};
pub use document::{Document, ElementLocation};
pub use errors::{EditorError, ValidationError};
pub use history::{History, DEFAULT_HISTORY_LIMIT};
pub use layout::{align, distribute, snap, snap_position, Alignment, Distribution, Placement};
pub use persistence::{PersistKey, PersistenceGateway};
pub use repository::{
    ElementUpdate, InMemoryRepository, RepositoryCall, RepositoryError, SectionRepository, SectionUpdate,
};
pub use selection::Selection;
pub use store::DocumentStore;

// Re-export model types for convenience
pub use pagecraft_model as model;
