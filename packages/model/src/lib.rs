//! # Pagecraft Model
//!
//! Data model shared by the page editor and its persistence layer.
//!
//! ```text
//! Page
//!  └── Section (orderIndex 0..n-1)
//!       └── Element (zIndex, tagged content)
//! ```
//!
//! Sections and elements live in persistent vectors ([`im::Vector`]) so a
//! clone of the whole tree is O(1) and history frames share structure with
//! the live document.
//!
//! A `container` element references other elements of its section by id.
//! It never owns them: grouped elements stay first-class members of the
//! section's element list.

mod element;
mod geometry;
mod ids;
mod page;
mod section;

pub use element::{Element, ElementContent, ElementKind, ElementPatch};
pub use geometry::{Position, Rect, Size};
pub use ids::{ElementId, PageId, SectionId};
pub use page::Page;
pub use section::{Background, Section, SectionKind, SectionPatch};

/// Ordered list of sections making up a page's document tree
pub type SectionTree = im::Vector<Section>;
