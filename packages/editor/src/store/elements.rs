use super::{logged, reject, DocumentStore};
use crate::document::Document;
use crate::errors::ValidationError;
use crate::persistence::PersistKey;
use chrono::Utc;
use pagecraft_model::{Element, ElementContent, ElementId, ElementKind, ElementPatch, Position, Section, SectionId, Size};
use std::collections::HashSet;
use tracing::{debug, info};

/// Smallest width/height a resize can produce
pub const MIN_ELEMENT_SIZE: f64 = 1.0;

impl DocumentStore {
    // ====================================================================
    // Create / update / remove
    // ====================================================================

    /// Add an element of `kind` with default content and dimensions.
    ///
    /// The position is snapped to the grid and the element is stacked
    /// above its siblings, then selected.
    pub fn add_element(
        &mut self,
        section_id: SectionId,
        kind: ElementKind,
        position: Option<Position>,
    ) -> Option<ElementId> {
        let z_index = logged(
            "add_element",
            self.document
                .section(section_id)
                .map(|s| s.next_z_index())
                .ok_or(ValidationError::SectionNotFound(section_id)),
        )?;

        let position = self.snap(position.unwrap_or_default());
        let element = Element::new(section_id, kind, position, z_index);
        let id = element.id;

        self.apply_tracked(|doc| {
            if let Some(section) = doc.section_mut(section_id) {
                section.elements.push_back(element.clone());
            }
        });
        self.selection.select(id);
        self.gateway.create_element(element);

        info!(element_id = %id, section_id = %section_id, kind = %kind, "added element");
        Some(id)
    }

    /// Merge a partial update into one element. Not recorded in history.
    pub fn update_element(&mut self, id: ElementId, patch: ElementPatch) -> bool {
        if logged("update_element", validate_patch(&self.document, id, &patch)).is_none() {
            return false;
        }

        self.apply_untracked(|doc| {
            if let Some(element) = doc.element_mut(id) {
                element.apply_patch(&patch);
            }
        });
        self.persist(PersistKey::Element(id));
        true
    }

    /// Apply the same partial update to several elements.
    ///
    /// Ids that fail validation are skipped; returns how many were updated.
    pub fn update_elements(&mut self, ids: &[ElementId], patch: ElementPatch) -> usize {
        let targets: Vec<ElementId> = ids
            .iter()
            .copied()
            .filter(|id| logged("update_elements", validate_patch(&self.document, *id, &patch)).is_some())
            .collect();
        if targets.is_empty() {
            return 0;
        }

        self.apply_untracked(|doc| {
            for id in &targets {
                if let Some(element) = doc.element_mut(*id) {
                    element.apply_patch(&patch);
                }
            }
        });
        for id in &targets {
            self.persist(PersistKey::Element(*id));
        }
        targets.len()
    }

    pub fn remove_element(&mut self, id: ElementId) -> bool {
        self.remove_elements(&[id]) == 1
    }

    /// Remove elements, dropping them from the selection and from every
    /// container that referenced them. Returns how many were removed.
    pub fn remove_elements(&mut self, ids: &[ElementId]) -> usize {
        let removed: HashSet<ElementId> = ids
            .iter()
            .copied()
            .filter(|id| {
                let found = self.document.contains_element(*id);
                if !found {
                    reject("remove_elements", ValidationError::ElementNotFound(*id));
                }
                found
            })
            .collect();
        if removed.is_empty() {
            return 0;
        }

        let pruned = self.apply_tracked(|doc| detach(doc, &removed));

        for id in &removed {
            self.gateway.delete_element(*id);
        }
        for container in pruned {
            self.persist(PersistKey::Element(container));
        }

        info!(count = removed.len(), "removed elements");
        removed.len()
    }

    // ====================================================================
    // Continuous transforms (untracked)
    // ====================================================================

    /// Move an element, snapping to the grid. Locked elements stay put.
    pub fn move_element(&mut self, id: ElementId, position: Position) -> bool {
        if logged("move_element", self.unlocked(id)).is_none() {
            return false;
        }

        let position = self.snap(position);
        self.apply_untracked(|doc| {
            if let Some(element) = doc.element_mut(id) {
                element.apply_patch(&ElementPatch::position(position));
            }
        });
        self.persist(PersistKey::ElementPosition(id));
        true
    }

    pub fn resize_element(&mut self, id: ElementId, size: Size) -> bool {
        if logged("resize_element", self.unlocked(id)).is_none() {
            return false;
        }

        let grid = self.grid();
        let size = Size::new(
            crate::layout::snap(size.width, grid).max(MIN_ELEMENT_SIZE),
            crate::layout::snap(size.height, grid).max(MIN_ELEMENT_SIZE),
        );
        self.apply_untracked(|doc| {
            if let Some(element) = doc.element_mut(id) {
                element.apply_patch(&ElementPatch::size(size));
            }
        });
        self.persist(PersistKey::ElementSize(id));
        true
    }

    fn unlocked(&self, id: ElementId) -> Result<(), ValidationError> {
        match self.document.element(id) {
            None => Err(ValidationError::ElementNotFound(id)),
            Some(element) if element.locked => Err(ValidationError::ElementLocked(id)),
            Some(_) => Ok(()),
        }
    }

    // ====================================================================
    // Stacking and flags
    // ====================================================================

    pub fn bring_to_front(&mut self, id: ElementId) -> bool {
        self.restack("bring_to_front", id, |section| section.next_z_index())
    }

    pub fn send_to_back(&mut self, id: ElementId) -> bool {
        self.restack("send_to_back", id, |section| section.min_z_index().map_or(0, |z| z - 1))
    }

    fn restack(
        &mut self,
        operation: &'static str,
        id: ElementId,
        pick: impl FnOnce(&Section) -> i64,
    ) -> bool {
        let Some(z_index) = logged(
            operation,
            self.document
                .locate(id)
                .and_then(|loc| self.document.sections.get(loc.section))
                .map(pick)
                .ok_or(ValidationError::ElementNotFound(id)),
        ) else {
            return false;
        };

        self.apply_tracked(|doc| {
            if let Some(element) = doc.element_mut(id) {
                element.apply_patch(&ElementPatch {
                    z_index: Some(z_index),
                    ..ElementPatch::default()
                });
            }
        });
        self.persist(PersistKey::Element(id));

        debug!(element_id = %id, z_index, operation, "restacked element");
        true
    }

    /// Flip the locked flag, returning the new value
    pub fn toggle_lock(&mut self, id: ElementId) -> Option<bool> {
        self.toggle("toggle_lock", id, |el| &mut el.locked)
    }

    /// Flip the hidden flag, returning the new value
    pub fn toggle_hidden(&mut self, id: ElementId) -> Option<bool> {
        self.toggle("toggle_hidden", id, |el| &mut el.hidden)
    }

    fn toggle(&mut self, operation: &'static str, id: ElementId, flag: fn(&mut Element) -> &mut bool) -> Option<bool> {
        logged(
            operation,
            self.document
                .element(id)
                .map(|_| ())
                .ok_or(ValidationError::ElementNotFound(id)),
        )?;

        let value = self.apply_tracked(|doc| {
            let element = doc.element_mut(id)?;
            let slot = flag(element);
            *slot = !*slot;
            let value = *slot;
            element.updated_at = Utc::now();
            Some(value)
        });
        self.persist(PersistKey::Element(id));
        value
    }

    // ====================================================================
    // Clipboard
    // ====================================================================

    pub fn copy_element(&mut self, id: ElementId) -> bool {
        let Some(element) = logged(
            "copy_element",
            self.document.element(id).ok_or(ValidationError::ElementNotFound(id)),
        ) else {
            return false;
        };
        self.clipboard.copy(element);
        true
    }

    /// Copy a multi-selection. Only the first existing element is kept.
    pub fn copy_elements(&mut self, ids: &[ElementId]) -> bool {
        let Some(first) = ids.iter().copied().find(|id| self.document.contains_element(*id)) else {
            reject("copy_elements", ValidationError::TooFewElements { required: 1, actual: 0 });
            return false;
        };
        if ids.len() > 1 {
            debug!(requested = ids.len(), "clipboard holds a single element, copying the first");
        }
        self.copy_element(first)
    }

    /// Paste the clipboard into the section it was copied from
    pub fn paste(&mut self, position: Option<Position>) -> Option<ElementId> {
        let source = logged(
            "paste",
            self.clipboard.peek().cloned().ok_or(ValidationError::EmptyClipboard),
        )?;
        let section_id = source.section_id;
        self.insert_copy("paste", source, section_id, position)
    }

    pub fn paste_into(&mut self, section_id: SectionId, position: Option<Position>) -> Option<ElementId> {
        let source = logged(
            "paste_into",
            self.clipboard.peek().cloned().ok_or(ValidationError::EmptyClipboard),
        )?;
        self.insert_copy("paste_into", source, section_id, position)
    }

    /// Copy an element in place, offset from the original
    pub fn duplicate_element(&mut self, id: ElementId) -> Option<ElementId> {
        let source = logged(
            "duplicate_element",
            self.document.element(id).cloned().ok_or(ValidationError::ElementNotFound(id)),
        )?;
        let section_id = source.section_id;
        self.insert_copy("duplicate_element", source, section_id, None)
    }

    /// Insert a fresh-id copy of `source` into `section_id`.
    ///
    /// Without an explicit position the copy is offset from the source and
    /// not snapped. Container references are kept only for elements of the
    /// target section.
    fn insert_copy(
        &mut self,
        operation: &'static str,
        source: Element,
        section_id: SectionId,
        position: Option<Position>,
    ) -> Option<ElementId> {
        let section = logged(
            operation,
            self.document
                .section(section_id)
                .ok_or(ValidationError::SectionNotFound(section_id)),
        )?;

        let position = match position {
            Some(position) => self.snap(position),
            None => source
                .position()
                .offset(self.config.paste_offset, self.config.paste_offset),
        };

        let now = Utc::now();
        let mut copy = source;
        copy.id = ElementId::new();
        copy.section_id = section_id;
        copy.x = position.x;
        copy.y = position.y;
        copy.z_index = section.next_z_index();
        copy.created_at = now;
        copy.updated_at = now;
        if let Some(children) = copy.content.children_mut() {
            children.retain(|child| section.contains(*child));
        }

        let id = copy.id;
        self.apply_tracked(|doc| {
            if let Some(section) = doc.section_mut(section_id) {
                section.elements.push_back(copy.clone());
            }
        });
        self.selection.select(id);
        self.gateway.create_element(copy);

        info!(element_id = %id, section_id = %section_id, operation, "inserted copy");
        Some(id)
    }
}

/// Drop `removed` from the tree and from every container's children.
/// Returns the containers whose children changed.
pub(super) fn detach(document: &mut Document, removed: &HashSet<ElementId>) -> Vec<ElementId> {
    let mut pruned = Vec::new();
    for section in document.sections.iter_mut() {
        section.elements.retain(|el| !removed.contains(&el.id));
        for element in section.elements.iter_mut() {
            let Some(children) = element.content.children_mut() else {
                continue;
            };
            let before = children.len();
            children.retain(|child| !removed.contains(child));
            if children.len() != before {
                element.updated_at = Utc::now();
                pruned.push(element.id);
            }
        }
    }
    pruned
}

/// Check that `id` exists and that a container content patch only
/// references other elements of the same section
fn validate_patch(document: &Document, id: ElementId, patch: &ElementPatch) -> Result<(), ValidationError> {
    let location = document.locate(id).ok_or(ValidationError::ElementNotFound(id))?;
    let element = &document.sections[location.section].elements[location.element];

    if let Some(content) = &patch.content {
        if content.kind() != element.kind() {
            return Err(ValidationError::KindChange {
                id,
                from: element.kind(),
                to: content.kind(),
            });
        }
    }

    if let Some(ElementContent::Container { children }) = &patch.content {
        let section = &document.sections[location.section];
        for child in children {
            if *child == id || !section.contains(*child) {
                return Err(ValidationError::InvalidChildReference {
                    container: id,
                    child: *child,
                });
            }
        }
    }
    Ok(())
}
