//! Editing scripts: a JSON array of tagged steps replayed against a
//! document store.
//!
//! Steps refer to sections and elements by labels given when they were
//! created (`"as": "hero"`), so scripts never spell out generated ids.
//!
//! ```json
//! [
//!   { "op": "addSection", "kind": "hero", "as": "hero" },
//!   { "op": "addElement", "section": "hero", "kind": "text", "as": "title" },
//!   { "op": "moveElement", "element": "title", "x": 40, "y": 80 },
//!   { "op": "wait", "ms": 600 }
//! ]
//! ```

use pagecraft_editor::model::{
    ElementId, ElementKind, ElementPatch, Page, Position, SectionId, SectionKind, SectionPatch, Size,
};
use pagecraft_editor::{Alignment, Distribution, DocumentStore};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    LoadPage {
        slug: String,
        title: String,
    },
    SetGrid {
        size: Option<f64>,
        snap: Option<bool>,
    },

    // Sections
    AddSection {
        kind: SectionKind,
        index: Option<usize>,
        #[serde(rename = "as")]
        label: Option<String>,
    },
    RemoveSection {
        section: String,
    },
    ReorderSections {
        from: usize,
        to: usize,
    },
    UpdateSection {
        section: String,
        patch: SectionPatch,
    },
    DuplicateSection {
        section: String,
        #[serde(rename = "as")]
        label: Option<String>,
    },

    // Elements
    AddElement {
        section: String,
        kind: ElementKind,
        x: Option<f64>,
        y: Option<f64>,
        #[serde(rename = "as")]
        label: Option<String>,
    },
    UpdateElement {
        element: String,
        patch: ElementPatch,
    },
    UpdateElements {
        elements: Vec<String>,
        patch: ElementPatch,
    },
    RemoveElements {
        elements: Vec<String>,
    },
    MoveElement {
        element: String,
        x: f64,
        y: f64,
    },
    ResizeElement {
        element: String,
        width: f64,
        height: f64,
    },
    BringToFront {
        element: String,
    },
    SendToBack {
        element: String,
    },
    ToggleLock {
        element: String,
    },
    ToggleHidden {
        element: String,
    },

    // Selection and clipboard
    Select {
        elements: Vec<String>,
    },
    SelectAll {
        section: String,
    },
    ClearSelection,
    Copy {
        elements: Vec<String>,
    },
    Paste {
        section: Option<String>,
        x: Option<f64>,
        y: Option<f64>,
        #[serde(rename = "as")]
        label: Option<String>,
    },
    Duplicate {
        element: String,
        #[serde(rename = "as")]
        label: Option<String>,
    },

    // Grouping and layout
    Group {
        elements: Vec<String>,
        #[serde(rename = "as")]
        label: Option<String>,
    },
    Ungroup {
        element: String,
    },
    Align {
        elements: Vec<String>,
        alignment: Alignment,
    },
    Distribute {
        elements: Vec<String>,
        distribution: Distribution,
    },

    // History
    Undo,
    Redo,

    /// Let the clock run so debounced writes can fire
    Wait {
        ms: u64,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("Unknown section label: {0}")]
    UnknownSection(String),

    #[error("Unknown element label: {0}")]
    UnknownElement(String),
}

/// Result of one replayed step
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    /// The store rejected the step; the reason is in the log
    Ignored,
    Failed(ScriptError),
}

impl From<bool> for Outcome {
    fn from(applied: bool) -> Self {
        if applied {
            Outcome::Applied
        } else {
            Outcome::Ignored
        }
    }
}

pub fn parse(source: &str) -> Result<Vec<Step>, serde_json::Error> {
    serde_json::from_str(source)
}

/// Replays steps against a store, keeping the label → id mapping
pub struct Replay<'a> {
    store: &'a mut DocumentStore,
    sections: HashMap<String, SectionId>,
    elements: HashMap<String, ElementId>,
}

impl<'a> Replay<'a> {
    pub fn new(store: &'a mut DocumentStore) -> Self {
        Self {
            store,
            sections: HashMap::new(),
            elements: HashMap::new(),
        }
    }

    pub async fn run(&mut self, step: &Step) -> Outcome {
        match self.apply(step).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(e),
        }
    }

    async fn apply(&mut self, step: &Step) -> Result<Outcome, ScriptError> {
        let outcome = match step {
            Step::LoadPage { slug, title } => {
                self.store.load_page(Page::new(slug.clone(), title.clone()), Vec::new());
                self.sections.clear();
                self.elements.clear();
                Outcome::Applied
            }
            Step::SetGrid { size, snap } => {
                if let Some(size) = size {
                    self.store.set_grid_size(*size);
                }
                if let Some(snap) = snap {
                    self.store.set_snap_to_grid(*snap);
                }
                Outcome::Applied
            }

            Step::AddSection { kind, index, label } => {
                let id = self.store.add_section(*kind, *index);
                self.bind_section(label, id)
            }
            Step::RemoveSection { section } => {
                let id = self.section(section)?;
                self.store.remove_section(id).into()
            }
            Step::ReorderSections { from, to } => self.store.reorder_sections(*from, *to).into(),
            Step::UpdateSection { section, patch } => {
                let id = self.section(section)?;
                self.store.update_section(id, patch.clone()).into()
            }
            Step::DuplicateSection { section, label } => {
                let id = self.section(section)?;
                let copy = self.store.duplicate_section(id);
                self.bind_section(label, copy)
            }

            Step::AddElement {
                section,
                kind,
                x,
                y,
                label,
            } => {
                let section_id = self.section(section)?;
                let id = self.store.add_element(section_id, *kind, position(*x, *y));
                self.bind_element(label, id)
            }
            Step::UpdateElement { element, patch } => {
                let id = self.element(element)?;
                self.store.update_element(id, patch.clone()).into()
            }
            Step::UpdateElements { elements, patch } => {
                let ids = self.elements(elements)?;
                (self.store.update_elements(&ids, patch.clone()) > 0).into()
            }
            Step::RemoveElements { elements } => {
                let ids = self.elements(elements)?;
                (self.store.remove_elements(&ids) > 0).into()
            }
            Step::MoveElement { element, x, y } => {
                let id = self.element(element)?;
                self.store.move_element(id, Position::new(*x, *y)).into()
            }
            Step::ResizeElement { element, width, height } => {
                let id = self.element(element)?;
                self.store.resize_element(id, Size::new(*width, *height)).into()
            }
            Step::BringToFront { element } => {
                let id = self.element(element)?;
                self.store.bring_to_front(id).into()
            }
            Step::SendToBack { element } => {
                let id = self.element(element)?;
                self.store.send_to_back(id).into()
            }
            Step::ToggleLock { element } => {
                let id = self.element(element)?;
                self.store.toggle_lock(id).is_some().into()
            }
            Step::ToggleHidden { element } => {
                let id = self.element(element)?;
                self.store.toggle_hidden(id).is_some().into()
            }

            Step::Select { elements } => {
                let ids = self.elements(elements)?;
                self.store.select_elements(&ids);
                Outcome::Applied
            }
            Step::SelectAll { section } => {
                let id = self.section(section)?;
                (self.store.select_all_in_section(id) > 0).into()
            }
            Step::ClearSelection => {
                self.store.clear_selection();
                Outcome::Applied
            }
            Step::Copy { elements } => {
                let ids = self.elements(elements)?;
                self.store.copy_elements(&ids).into()
            }
            Step::Paste { section, x, y, label } => {
                let id = match section {
                    Some(section) => {
                        let section_id = self.section(section)?;
                        self.store.paste_into(section_id, position(*x, *y))
                    }
                    None => self.store.paste(position(*x, *y)),
                };
                self.bind_element(label, id)
            }
            Step::Duplicate { element, label } => {
                let id = self.element(element)?;
                let copy = self.store.duplicate_element(id);
                self.bind_element(label, copy)
            }

            Step::Group { elements, label } => {
                let ids = self.elements(elements)?;
                let container = self.store.group_elements(&ids);
                self.bind_element(label, container)
            }
            Step::Ungroup { element } => {
                let id = self.element(element)?;
                self.store.ungroup_element(id).into()
            }
            Step::Align { elements, alignment } => {
                let ids = self.elements(elements)?;
                self.store.align_elements(&ids, *alignment).into()
            }
            Step::Distribute { elements, distribution } => {
                let ids = self.elements(elements)?;
                self.store.distribute_elements(&ids, *distribution).into()
            }

            Step::Undo => self.store.undo().into(),
            Step::Redo => self.store.redo().into(),

            Step::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                Outcome::Applied
            }
        };
        Ok(outcome)
    }

    fn section(&self, label: &str) -> Result<SectionId, ScriptError> {
        self.sections
            .get(label)
            .copied()
            .ok_or_else(|| ScriptError::UnknownSection(label.to_string()))
    }

    fn element(&self, label: &str) -> Result<ElementId, ScriptError> {
        self.elements
            .get(label)
            .copied()
            .ok_or_else(|| ScriptError::UnknownElement(label.to_string()))
    }

    fn elements(&self, labels: &[String]) -> Result<Vec<ElementId>, ScriptError> {
        labels.iter().map(|label| self.element(label)).collect()
    }

    fn bind_section(&mut self, label: &Option<String>, id: Option<SectionId>) -> Outcome {
        match (label, id) {
            (Some(label), Some(id)) => {
                self.sections.insert(label.clone(), id);
                Outcome::Applied
            }
            (None, Some(_)) => Outcome::Applied,
            (_, None) => Outcome::Ignored,
        }
    }

    fn bind_element(&mut self, label: &Option<String>, id: Option<ElementId>) -> Outcome {
        match (label, id) {
            (Some(label), Some(id)) => {
                self.elements.insert(label.clone(), id);
                Outcome::Applied
            }
            (None, Some(_)) => Outcome::Applied,
            (_, None) => Outcome::Ignored,
        }
    }
}

fn position(x: Option<f64>, y: Option<f64>) -> Option<Position> {
    match (x, y) {
        (None, None) => None,
        (x, y) => Some(Position::new(x.unwrap_or_default(), y.unwrap_or_default())),
    }
}
