use super::elements::detach;
use super::{logged, DocumentStore};
use crate::document::Document;
use crate::errors::ValidationError;
use crate::layout::{self, Alignment, Distribution, MIN_ALIGN, MIN_DISTRIBUTE};
use crate::persistence::PersistKey;
use pagecraft_model::{Element, ElementContent, ElementId, ElementKind, ElementPatch, Rect, SectionId};
use std::collections::HashSet;
use tracing::info;

/// Fewest elements a group can hold
pub const MIN_GROUP: usize = 2;

impl DocumentStore {
    /// Wrap elements of one section in a new container sized to their
    /// bounding box. The members stay top-level elements of the section;
    /// the container only references them.
    pub fn group_elements(&mut self, ids: &[ElementId]) -> Option<ElementId> {
        let (section_id, members) = logged("group_elements", group_members(&self.document, ids))?;

        let bounds = Rect::bounding(members.iter().map(|el| el.bounds()))?;
        let children: Vec<ElementId> = members.iter().map(|el| el.id).collect();
        let z_index = self.document.section(section_id)?.next_z_index();

        let mut container = Element::new(section_id, ElementKind::Container, bounds.origin(), z_index);
        container.width = Some(bounds.width);
        container.height = Some(bounds.height);
        container.content = ElementContent::Container { children };
        let id = container.id;

        self.apply_tracked(|doc| {
            if let Some(section) = doc.section_mut(section_id) {
                section.elements.push_back(container.clone());
            }
        });
        self.selection.select(id);
        self.gateway.create_element(container);

        info!(container_id = %id, members = members.len(), "grouped elements");
        Some(id)
    }

    /// Remove a container and select its former children
    pub fn ungroup_element(&mut self, container_id: ElementId) -> bool {
        let Some(children) = logged("ungroup_element", container_children(&self.document, container_id)) else {
            return false;
        };

        let removed = HashSet::from([container_id]);
        let pruned = self.apply_tracked(|doc| detach(doc, &removed));
        self.selection
            .select_many(children.into_iter().filter(|child| self.document.contains_element(*child)));

        self.gateway.delete_element(container_id);
        for container in pruned {
            self.persist(PersistKey::Element(container));
        }

        info!(container_id = %container_id, selected = self.selection.len(), "ungrouped element");
        true
    }

    /// Align elements to an edge or center of their bounding box.
    ///
    /// The whole operation is one undo step.
    pub fn align_elements(&mut self, ids: &[ElementId], alignment: Alignment) -> bool {
        let members = self.existing(ids);
        if members.len() < MIN_ALIGN {
            super::reject(
                "align_elements",
                ValidationError::TooFewElements {
                    required: MIN_ALIGN,
                    actual: members.len(),
                },
            );
            return false;
        }

        let placement = layout::align(&members, alignment);
        self.apply_placement(placement);
        info!(?alignment, count = ids.len(), "aligned elements");
        true
    }

    /// Equalise the gaps between elements along an axis. The outermost
    /// elements keep their position.
    pub fn distribute_elements(&mut self, ids: &[ElementId], distribution: Distribution) -> bool {
        let members = self.existing(ids);
        if members.len() < MIN_DISTRIBUTE {
            super::reject(
                "distribute_elements",
                ValidationError::TooFewElements {
                    required: MIN_DISTRIBUTE,
                    actual: members.len(),
                },
            );
            return false;
        }

        let placement = layout::distribute(&members, distribution);
        self.apply_placement(placement);
        info!(?distribution, count = ids.len(), "distributed elements");
        true
    }

    /// Unique, existing elements among `ids`, in the given order
    fn existing(&self, ids: &[ElementId]) -> Vec<&Element> {
        let mut seen = HashSet::new();
        ids.iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| self.document.element(*id))
            .collect()
    }

    /// One history frame for the batch, then a plain update per element
    fn apply_placement(&mut self, placement: layout::Placement) {
        self.save_to_history();
        for (id, position) in placement {
            self.update_element(id, ElementPatch::position(position));
        }
    }
}

/// Resolve the members of a new group, all from a single section
fn group_members(document: &Document, ids: &[ElementId]) -> Result<(SectionId, Vec<Element>), ValidationError> {
    let mut seen = HashSet::new();
    let unique: Vec<ElementId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if unique.len() < MIN_GROUP {
        return Err(ValidationError::TooFewElements {
            required: MIN_GROUP,
            actual: unique.len(),
        });
    }

    let members = unique
        .iter()
        .map(|id| document.element(*id).cloned().ok_or(ValidationError::ElementNotFound(*id)))
        .collect::<Result<Vec<_>, _>>()?;

    let section_id = members[0].section_id;
    if members.iter().any(|el| el.section_id != section_id) {
        return Err(ValidationError::CrossSection);
    }
    Ok((section_id, members))
}

fn container_children(document: &Document, id: ElementId) -> Result<Vec<ElementId>, ValidationError> {
    let element = document.element(id).ok_or(ValidationError::ElementNotFound(id))?;
    element
        .content
        .children()
        .map(<[ElementId]>::to_vec)
        .ok_or(ValidationError::NotAContainer(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::repository::InMemoryRepository;
    use pagecraft_model::{Page, Position, SectionKind, Size};
    use std::sync::Arc;

    fn store_with_section() -> (DocumentStore, SectionId) {
        let config = EditorConfig {
            snap_to_grid: false,
            ..EditorConfig::default()
        };
        let mut store = DocumentStore::new(config, Arc::new(InMemoryRepository::new())).unwrap();
        store.load_page(Page::new("home", "Home"), Vec::new());
        let section = store.add_section(SectionKind::Content, None).unwrap();
        (store, section)
    }

    fn square(store: &mut DocumentStore, section: SectionId, x: f64, y: f64) -> ElementId {
        let id = store.add_element(section, ElementKind::Button, Some(Position::new(x, y))).unwrap();
        store.resize_element(id, Size::new(10.0, 10.0));
        id
    }

    #[tokio::test]
    async fn test_group_bounding_box() {
        let (mut store, section) = store_with_section();
        let a = square(&mut store, section, 0.0, 0.0);
        let b = square(&mut store, section, 20.0, 5.0);

        let group = store.group_elements(&[a, b]).unwrap();
        let container = store.element(group).unwrap();

        assert_eq!(container.bounds(), Rect::new(0.0, 0.0, 30.0, 15.0));
        assert_eq!(container.content.children(), Some(&[a, b][..]));
        assert_eq!(container.z_index, 2);
        assert!(store.element(a).is_some());
        assert!(store.element(b).is_some());
        assert_eq!(store.elements_in(section).unwrap().len(), 3);
        assert_eq!(store.selection().ids(), &[group]);
    }

    #[tokio::test]
    async fn test_group_rejections() {
        let (mut store, section) = store_with_section();
        let other = store.add_section(SectionKind::Footer, None).unwrap();
        let a = square(&mut store, section, 0.0, 0.0);
        let b = square(&mut store, other, 0.0, 0.0);

        assert!(store.group_elements(&[a]).is_none());
        assert!(store.group_elements(&[a, a]).is_none());
        assert!(store.group_elements(&[a, b]).is_none());
        assert!(store.group_elements(&[a, ElementId::new()]).is_none());
        assert_eq!(store.elements_in(section).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ungroup_selects_children() {
        let (mut store, section) = store_with_section();
        let a = square(&mut store, section, 0.0, 0.0);
        let b = square(&mut store, section, 20.0, 5.0);
        let group = store.group_elements(&[a, b]).unwrap();

        assert!(!store.ungroup_element(a));
        assert!(store.ungroup_element(group));

        assert!(store.element(group).is_none());
        assert_eq!(store.elements_in(section).unwrap().len(), 2);
        assert_eq!(store.selection().ids(), &[a, b]);
    }

    #[tokio::test]
    async fn test_align_left() {
        let (mut store, section) = store_with_section();
        let a = square(&mut store, section, 10.0, 0.0);
        let b = square(&mut store, section, 50.0, 20.0);
        let c = square(&mut store, section, 30.0, 40.0);
        let levels = store.history().undo_levels();

        assert!(store.align_elements(&[a, b, c], Alignment::Left));

        for id in [a, b, c] {
            assert_eq!(store.element(id).unwrap().x, 10.0);
        }
        assert_eq!(store.history().undo_levels(), levels + 1);

        assert!(store.undo());
        assert_eq!(store.element(b).unwrap().x, 50.0);
    }

    #[tokio::test]
    async fn test_distribute_horizontal() {
        let (mut store, section) = store_with_section();
        let a = square(&mut store, section, 0.0, 0.0);
        let b = square(&mut store, section, 80.0, 0.0);
        let c = square(&mut store, section, 50.0, 0.0);

        assert!(store.distribute_elements(&[a, b, c], Distribution::Horizontal));
        assert_eq!(store.element(a).unwrap().x, 0.0);
        assert_eq!(store.element(b).unwrap().x, 80.0);
        assert_eq!(store.element(c).unwrap().x, 40.0);

        assert!(!store.distribute_elements(&[a, b], Distribution::Horizontal));
    }
}
