use super::{logged, DocumentStore};
use crate::errors::ValidationError;
use crate::persistence::PersistKey;
use pagecraft_model::{ElementId, Section, SectionId, SectionKind, SectionPatch};
use std::collections::HashMap;
use tracing::info;

impl DocumentStore {
    /// Insert a new section at `index` (default: end) and select it
    pub fn add_section(&mut self, kind: SectionKind, index: Option<usize>) -> Option<SectionId> {
        let page_id = logged(
            "add_section",
            self.document.page.as_ref().map(|p| p.id).ok_or(ValidationError::NoActivePage),
        )?;

        let len = self.document.sections.len();
        let index = index.unwrap_or(len).min(len);
        let section = Section::new(page_id, kind, index);
        let id = section.id;

        self.apply_tracked(|doc| {
            doc.sections.insert(index, section);
            doc.normalize_order();
        });
        self.selected_section = Some(id);

        if let Some(created) = self.document.section(id).cloned() {
            self.gateway.create_section(created);
        }
        if index < len {
            self.persist_order();
        }

        info!(section_id = %id, kind = %kind, index, "added section");
        Some(id)
    }

    pub fn remove_section(&mut self, id: SectionId) -> bool {
        let Some(index) = logged(
            "remove_section",
            self.document.section_index(id).ok_or(ValidationError::SectionNotFound(id)),
        ) else {
            return false;
        };

        let removed = self.apply_tracked(|doc| {
            let removed = doc.sections.remove(index);
            doc.normalize_order();
            removed
        });

        let element_ids: Vec<ElementId> = removed.elements.iter().map(|el| el.id).collect();
        self.gateway.delete_section(id, element_ids);
        if index < self.document.sections.len() {
            self.persist_order();
        }

        info!(section_id = %id, "removed section");
        true
    }

    /// Move the section at `from` to position `to`
    pub fn reorder_sections(&mut self, from: usize, to: usize) -> bool {
        let len = self.document.sections.len();
        for index in [from, to] {
            if index >= len {
                super::reject("reorder_sections", ValidationError::IndexOutOfRange { index, len });
                return false;
            }
        }
        if from == to {
            return false;
        }

        self.apply_tracked(|doc| {
            let section = doc.sections.remove(from);
            doc.sections.insert(to, section);
            doc.normalize_order();
        });
        self.persist_order();

        info!(from, to, "reordered sections");
        true
    }

    /// Merge background, min height and config into a section
    pub fn update_section(&mut self, id: SectionId, patch: SectionPatch) -> bool {
        if logged(
            "update_section",
            self.document.section(id).map(|_| ()).ok_or(ValidationError::SectionNotFound(id)),
        )
        .is_none()
        {
            return false;
        }

        self.apply_untracked(|doc| {
            if let Some(section) = doc.section_mut(id) {
                section.apply_patch(&patch);
            }
        });
        self.persist(PersistKey::Section(id));
        true
    }

    /// Deep copy a section with fresh ids, inserted right after it
    pub fn duplicate_section(&mut self, id: SectionId) -> Option<SectionId> {
        let (index, original) = logged(
            "duplicate_section",
            self.document
                .section_index(id)
                .and_then(|index| self.document.sections.get(index).map(|s| (index, s.clone())))
                .ok_or(ValidationError::SectionNotFound(id)),
        )?;

        let copy = copy_section(&original, index + 1);
        let copy_id = copy.id;

        self.apply_tracked(|doc| {
            doc.sections.insert(index + 1, copy);
            doc.normalize_order();
        });
        self.selected_section = Some(copy_id);

        if let Some(created) = self.document.section(copy_id).cloned() {
            self.gateway.create_section(created);
        }
        if index + 2 < self.document.sections.len() {
            self.persist_order();
        }

        info!(section_id = %id, copy_id = %copy_id, "duplicated section");
        Some(copy_id)
    }
}

fn copy_section(original: &Section, order_index: usize) -> Section {
    let mut copy = Section::new(original.page_id, original.kind, order_index);
    copy.config = original.config.clone();
    copy.background = original.background.clone();
    copy.min_height = original.min_height;

    let remap: HashMap<ElementId, ElementId> = original
        .elements
        .iter()
        .map(|el| (el.id, ElementId::new()))
        .collect();

    copy.elements = original
        .elements
        .iter()
        .map(|el| {
            let mut element = el.clone();
            element.id = remap[&el.id];
            element.section_id = copy.id;
            element.created_at = copy.created_at;
            element.updated_at = copy.updated_at;
            if let Some(children) = element.content.children_mut() {
                for child in children.iter_mut() {
                    if let Some(mapped) = remap.get(child) {
                        *child = *mapped;
                    }
                }
            }
            element
        })
        .collect();

    copy
}
