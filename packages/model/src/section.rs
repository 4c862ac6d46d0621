use crate::{Element, ElementId, PageId, SectionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Closed set of section templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Hero,
    Content,
    Features,
    Gallery,
    Testimonials,
    CallToAction,
    Contact,
    Footer,
    Custom,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionKind::Hero => "hero",
            SectionKind::Content => "content",
            SectionKind::Features => "features",
            SectionKind::Gallery => "gallery",
            SectionKind::Testimonials => "testimonials",
            SectionKind::CallToAction => "call-to-action",
            SectionKind::Contact => "contact",
            SectionKind::Footer => "footer",
            SectionKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Section background descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum Background {
    Color {
        value: String,
    },
    Gradient {
        from: String,
        to: String,
        #[serde(default)]
        angle: f64,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        overlay: Option<String>,
    },
    Video {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        poster: Option<String>,
    },
}

pub const DEFAULT_MIN_HEIGHT: f64 = 400.0;

/// An ordered, typed content block owned by a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub page_id: PageId,
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub order_index: usize,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    pub min_height: f64,
    #[serde(default)]
    pub elements: im::Vector<Element>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Section {
    pub fn new(page_id: PageId, kind: SectionKind, order_index: usize) -> Self {
        let now = Utc::now();
        Self {
            id: SectionId::new(),
            page_id,
            kind,
            order_index,
            config: Map::new(),
            background: None,
            min_height: DEFAULT_MIN_HEIGHT,
            elements: im::Vector::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.iter().find(|el| el.id == id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.iter_mut().find(|el| el.id == id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.element(id).is_some()
    }

    /// Highest zIndex in the section, `None` when it has no elements
    pub fn max_z_index(&self) -> Option<i64> {
        self.elements.iter().map(|el| el.z_index).max()
    }

    pub fn min_z_index(&self) -> Option<i64> {
        self.elements.iter().map(|el| el.z_index).min()
    }

    /// zIndex for an element placed above everything else
    pub fn next_z_index(&self) -> i64 {
        self.max_z_index().map_or(0, |z| z + 1)
    }

    pub fn apply_patch(&mut self, patch: &SectionPatch) {
        if let Some(background) = &patch.background {
            self.background = Some(background.clone());
        } else if patch.clear_background {
            self.background = None;
        }
        if let Some(min_height) = patch.min_height {
            self.min_height = min_height;
        }
        if let Some(config) = &patch.config {
            for (key, value) in config {
                self.config.insert(key.clone(), value.clone());
            }
        }
        self.updated_at = Utc::now();
    }
}

/// Partial section update. `config` entries are merged key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Background>,
    pub clear_background: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}
