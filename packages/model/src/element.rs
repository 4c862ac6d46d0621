//! # Elements
//!
//! Positioned content units owned by a section. The content payload is a
//! tagged enum so every consumer matches exhaustively on the element kind.

use crate::{ElementId, Position, Rect, SectionId, Size};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Text,
    Image,
    Video,
    Button,
    Container,
    Divider,
}

impl ElementKind {
    /// Dimensions used when an element is created without explicit size
    pub fn default_size(self) -> Size {
        match self {
            ElementKind::Text => Size::new(200.0, 50.0),
            ElementKind::Image => Size::new(300.0, 200.0),
            ElementKind::Video => Size::new(400.0, 225.0),
            ElementKind::Button => Size::new(120.0, 40.0),
            ElementKind::Container => Size::new(300.0, 200.0),
            ElementKind::Divider => Size::new(300.0, 2.0),
        }
    }

    /// Placeholder content for a freshly created element
    pub fn default_content(self) -> ElementContent {
        match self {
            ElementKind::Text => ElementContent::Text {
                text: "New text".to_string(),
                font_size: 16.0,
                color: None,
            },
            ElementKind::Image => ElementContent::Image {
                src: String::new(),
                alt: String::new(),
            },
            ElementKind::Video => ElementContent::Video {
                src: String::new(),
                autoplay: false,
                muted: true,
                looped: false,
            },
            ElementKind::Button => ElementContent::Button {
                label: "Button".to_string(),
                href: None,
            },
            ElementKind::Container => ElementContent::Container {
                children: Vec::new(),
            },
            ElementKind::Divider => ElementContent::Divider {
                thickness: 2.0,
                color: None,
            },
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementKind::Text => "text",
            ElementKind::Image => "image",
            ElementKind::Video => "video",
            ElementKind::Button => "button",
            ElementKind::Container => "container",
            ElementKind::Divider => "divider",
        };
        f.write_str(name)
    }
}

/// Type-tagged content payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ElementContent {
    Text {
        text: String,
        font_size: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Image {
        src: String,
        #[serde(default)]
        alt: String,
    },
    Video {
        src: String,
        #[serde(default)]
        autoplay: bool,
        #[serde(default)]
        muted: bool,
        #[serde(default)]
        looped: bool,
    },
    Button {
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        href: Option<String>,
    },
    /// Flat, non-owning references to elements of the same section
    Container {
        #[serde(default)]
        children: Vec<ElementId>,
    },
    Divider {
        thickness: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
}

impl ElementContent {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementContent::Text { .. } => ElementKind::Text,
            ElementContent::Image { .. } => ElementKind::Image,
            ElementContent::Video { .. } => ElementKind::Video,
            ElementContent::Button { .. } => ElementKind::Button,
            ElementContent::Container { .. } => ElementKind::Container,
            ElementContent::Divider { .. } => ElementKind::Divider,
        }
    }

    /// Referenced ids when this is a container
    pub fn children(&self) -> Option<&[ElementId]> {
        match self {
            ElementContent::Container { children } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<ElementId>> {
        match self {
            ElementContent::Container { children } => Some(children),
            _ => None,
        }
    }
}

/// A positioned, typed content unit owned by a section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    pub section_id: SectionId,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    pub z_index: i64,
    pub content: ElementContent,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Element {
    /// Create an element with default content and dimensions for `kind`
    pub fn new(section_id: SectionId, kind: ElementKind, position: Position, z_index: i64) -> Self {
        let size = kind.default_size();
        let now = Utc::now();

        Self {
            id: ElementId::new(),
            section_id,
            x: position.x,
            y: position.y,
            width: Some(size.width),
            height: Some(size.height),
            z_index,
            content: kind.default_content(),
            locked: false,
            hidden: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> ElementKind {
        self.content.kind()
    }

    pub fn is_container(&self) -> bool {
        self.kind() == ElementKind::Container
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Explicit size, falling back to the kind's default dimensions
    pub fn size(&self) -> Size {
        let fallback = self.kind().default_size();
        Size::new(
            self.width.unwrap_or(fallback.width),
            self.height.unwrap_or(fallback.height),
        )
    }

    pub fn bounds(&self) -> Rect {
        let size = self.size();
        Rect::new(self.x, self.y, size.width, size.height)
    }

    /// Merge a partial update into this element
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = Some(width);
        }
        if let Some(height) = patch.height {
            self.height = Some(height);
        }
        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
        if let Some(hidden) = patch.hidden {
            self.hidden = hidden;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial element update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ElementContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

impl ElementPatch {
    pub fn position(position: Position) -> Self {
        Self {
            x: Some(position.x),
            y: Some(position.y),
            ..Self::default()
        }
    }

    pub fn size(size: Size) -> Self {
        Self {
            width: Some(size.width),
            height: Some(size.height),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
