//! # Section/Element Repository
//!
//! Remote store boundary used by the persistence gateway. Every call is
//! best-effort: the gateway logs failures and never rolls back local
//! state.

use async_trait::async_trait;
use pagecraft_model::{Background, Element, ElementContent, ElementId, PageId, Section, SectionId};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Rejected by remote store: {0}")]
    Rejected(String),

    #[error("Transport failure: {0}")]
    Transport(String),
}

/// Partial section update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionUpdate {
    /// `Some(None)` clears the background
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Option<Background>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

impl SectionUpdate {
    pub fn from_section(section: &Section) -> Self {
        Self {
            background: Some(section.background.clone()),
            min_height: Some(section.min_height),
            config: Some(section.config.clone()),
        }
    }
}

/// Partial element update
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ElementContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl ElementUpdate {
    pub fn full(element: &Element) -> Self {
        Self {
            x: Some(element.x),
            y: Some(element.y),
            width: element.width,
            height: element.height,
            content: Some(element.content.clone()),
            z_index: Some(element.z_index),
            locked: Some(element.locked),
            hidden: Some(element.hidden),
        }
    }

    pub fn position(element: &Element) -> Self {
        Self {
            x: Some(element.x),
            y: Some(element.y),
            ..Self::default()
        }
    }

    pub fn size(element: &Element) -> Self {
        Self {
            width: element.width,
            height: element.height,
            ..Self::default()
        }
    }
}

/// Remote section/element store
#[async_trait]
pub trait SectionRepository: Send + Sync {
    /// Create a section record. `section.elements` is not persisted here;
    /// elements are created individually.
    async fn create_section(&self, section: &Section) -> Result<Section, RepositoryError>;

    async fn update_section(&self, id: SectionId, update: SectionUpdate) -> Result<(), RepositoryError>;

    async fn delete_section(&self, id: SectionId) -> Result<bool, RepositoryError>;

    async fn reorder_sections(&self, page_id: PageId, ordered: Vec<SectionId>) -> Result<(), RepositoryError>;

    async fn create_element(&self, element: &Element) -> Result<Element, RepositoryError>;

    async fn update_element(&self, id: ElementId, update: ElementUpdate) -> Result<(), RepositoryError>;

    async fn delete_element(&self, id: ElementId) -> Result<bool, RepositoryError>;
}

/// One recorded repository call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RepositoryCall {
    CreateSection { id: SectionId },
    UpdateSection { id: SectionId, update: SectionUpdate },
    DeleteSection { id: SectionId },
    ReorderSections { page_id: PageId, ordered: Vec<SectionId> },
    CreateElement { id: ElementId },
    UpdateElement { id: ElementId, update: ElementUpdate },
    DeleteElement { id: ElementId },
}

#[derive(Debug, Default)]
struct Inner {
    sections: HashMap<SectionId, Section>,
    elements: HashMap<ElementId, Element>,
    calls: Vec<RepositoryCall>,
    failures: VecDeque<RepositoryError>,
}

/// Repository kept in process memory.
///
/// Records every call in order and can be told to fail upcoming calls or
/// to answer after an artificial delay.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    inner: Mutex<Inner>,
    latency: Option<Duration>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            inner: Mutex::default(),
            latency: Some(latency),
        }
    }

    /// Make the next call fail with `error` (queued, one call per error)
    pub fn fail_next(&self, error: RepositoryError) {
        self.lock().failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.lock().calls.clone()
    }

    pub fn element_updates(&self, id: ElementId) -> Vec<ElementUpdate> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RepositoryCall::UpdateElement { id: target, update } if *target == id => Some(update.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn section(&self, id: SectionId) -> Option<Section> {
        self.lock().sections.get(&id).cloned()
    }

    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.lock().elements.get(&id).cloned()
    }

    pub fn section_count(&self) -> usize {
        self.lock().sections.len()
    }

    pub fn element_count(&self) -> usize {
        self.lock().elements.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and pop an injected failure, if any
    async fn begin(&self, call: RepositoryCall) -> Result<MutexGuard<'_, Inner>, RepositoryError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut inner = self.lock();
        inner.calls.push(call);
        match inner.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(inner),
        }
    }
}

#[async_trait]
impl SectionRepository for InMemoryRepository {
    async fn create_section(&self, section: &Section) -> Result<Section, RepositoryError> {
        let mut inner = self.begin(RepositoryCall::CreateSection { id: section.id }).await?;

        let mut record = section.clone();
        record.elements = im::Vector::new();
        inner.sections.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_section(&self, id: SectionId, update: SectionUpdate) -> Result<(), RepositoryError> {
        let mut inner = self
            .begin(RepositoryCall::UpdateSection {
                id,
                update: update.clone(),
            })
            .await?;

        let section = inner
            .sections
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("section-{}", id)))?;
        if let Some(background) = update.background {
            section.background = background;
        }
        if let Some(min_height) = update.min_height {
            section.min_height = min_height;
        }
        if let Some(config) = update.config {
            section.config = config;
        }
        Ok(())
    }

    async fn delete_section(&self, id: SectionId) -> Result<bool, RepositoryError> {
        let mut inner = self.begin(RepositoryCall::DeleteSection { id }).await?;

        inner.elements.retain(|_, el| el.section_id != id);
        Ok(inner.sections.remove(&id).is_some())
    }

    async fn reorder_sections(&self, page_id: PageId, ordered: Vec<SectionId>) -> Result<(), RepositoryError> {
        let mut inner = self
            .begin(RepositoryCall::ReorderSections {
                page_id,
                ordered: ordered.clone(),
            })
            .await?;

        for (index, id) in ordered.iter().enumerate() {
            if let Some(section) = inner.sections.get_mut(id) {
                section.order_index = index;
            }
        }
        Ok(())
    }

    async fn create_element(&self, element: &Element) -> Result<Element, RepositoryError> {
        let mut inner = self.begin(RepositoryCall::CreateElement { id: element.id }).await?;

        inner.elements.insert(element.id, element.clone());
        Ok(element.clone())
    }

    async fn update_element(&self, id: ElementId, update: ElementUpdate) -> Result<(), RepositoryError> {
        let mut inner = self
            .begin(RepositoryCall::UpdateElement {
                id,
                update: update.clone(),
            })
            .await?;

        let element = inner
            .elements
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("element-{}", id)))?;
        if let Some(x) = update.x {
            element.x = x;
        }
        if let Some(y) = update.y {
            element.y = y;
        }
        if update.width.is_some() {
            element.width = update.width;
        }
        if update.height.is_some() {
            element.height = update.height;
        }
        if let Some(content) = update.content {
            element.content = content;
        }
        if let Some(z_index) = update.z_index {
            element.z_index = z_index;
        }
        if let Some(locked) = update.locked {
            element.locked = locked;
        }
        if let Some(hidden) = update.hidden {
            element.hidden = hidden;
        }
        Ok(())
    }

    async fn delete_element(&self, id: ElementId) -> Result<bool, RepositoryError> {
        let mut inner = self.begin(RepositoryCall::DeleteElement { id }).await?;
        Ok(inner.elements.remove(&id).is_some())
    }
}
