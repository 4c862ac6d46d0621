//! # Document
//!
//! The in-memory page tree: the active page and its ordered sections.
//! Cloning a `Document` is O(1) because sections and elements live in
//! persistent vectors; the store publishes clones to the persistence
//! gateway and the history keeps clones of `sections` as frames.

use pagecraft_model::{Element, ElementId, Page, Section, SectionId, SectionTree};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub page: Option<Page>,
    pub sections: SectionTree,
}

/// Position of an element inside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementLocation {
    pub section: usize,
    pub element: usize,
}

impl Document {
    pub fn section_index(&self, id: SectionId) -> Option<usize> {
        self.sections.iter().position(|s| s.id == id)
    }

    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_mut(&mut self, id: SectionId) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }

    pub fn locate(&self, id: ElementId) -> Option<ElementLocation> {
        self.sections.iter().enumerate().find_map(|(section, s)| {
            s.elements
                .iter()
                .position(|el| el.id == id)
                .map(|element| ElementLocation { section, element })
        })
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.sections.iter().find_map(|s| s.element(id))
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        let location = self.locate(id)?;
        self.sections
            .get_mut(location.section)?
            .elements
            .get_mut(location.element)
    }

    pub fn contains_element(&self, id: ElementId) -> bool {
        self.element(id).is_some()
    }

    /// Every element id in the document, in section then element order
    pub fn element_ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.sections
            .iter()
            .flat_map(|s| s.elements.iter().map(|el| el.id))
    }

    /// Rewrite `orderIndex` to the dense range `0..n`
    pub fn normalize_order(&mut self) {
        for (index, section) in self.sections.iter_mut().enumerate() {
            section.order_index = index;
        }
    }

    pub fn section_ids(&self) -> Vec<SectionId> {
        self.sections.iter().map(|s| s.id).collect()
    }
}
