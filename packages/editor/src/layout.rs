//! # Layout Engine
//!
//! Stateless alignment/distribution math. Every function takes a set of
//! elements and returns the new top-left corner for each of them; applying
//! the result is the store's job.

use pagecraft_model::{Element, ElementId, Position, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// New top-left corner per element
pub type Placement = HashMap<ElementId, Position>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    /// Horizontal midpoint
    Center,
    Top,
    Bottom,
    /// Vertical midpoint
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    Horizontal,
    Vertical,
}

pub const MIN_ALIGN: usize = 2;
pub const MIN_DISTRIBUTE: usize = 3;

/// Align every element's edge or center with the selection's bounding box.
///
/// Returns an empty placement for fewer than two elements.
pub fn align(elements: &[&Element], alignment: Alignment) -> Placement {
    if elements.len() < MIN_ALIGN {
        return Placement::new();
    }

    let Some(bounds) = Rect::bounding(elements.iter().map(|el| el.bounds())) else {
        return Placement::new();
    };

    elements
        .iter()
        .map(|el| {
            let r = el.bounds();
            let target = match alignment {
                Alignment::Left => Position::new(bounds.x, r.y),
                Alignment::Right => Position::new(bounds.right() - r.width, r.y),
                Alignment::Center => Position::new(bounds.center_x() - r.width / 2.0, r.y),
                Alignment::Top => Position::new(r.x, bounds.y),
                Alignment::Bottom => Position::new(r.x, bounds.bottom() - r.height),
                Alignment::Middle => Position::new(r.x, bounds.center_y() - r.height / 2.0),
            };
            (el.id, target)
        })
        .collect()
}

/// Space elements so the gaps between consecutive edges are equal.
///
/// Elements are ordered along the axis; the first and last keep their
/// position. Returns an empty placement for fewer than three elements.
pub fn distribute(elements: &[&Element], distribution: Distribution) -> Placement {
    if elements.len() < MIN_DISTRIBUTE {
        return Placement::new();
    }

    let mut rects: Vec<(ElementId, Rect)> = elements.iter().map(|el| (el.id, el.bounds())).collect();
    let (start, extent): (fn(&Rect) -> f64, fn(&Rect) -> f64) = match distribution {
        Distribution::Horizontal => (|r: &Rect| r.x, |r: &Rect| r.width),
        Distribution::Vertical => (|r: &Rect| r.y, |r: &Rect| r.height),
    };
    rects.sort_by(|(_, a), (_, b)| start(a).total_cmp(&start(b)));

    let (_, first) = rects[0];
    let (_, last) = rects[rects.len() - 1];
    let span = start(&last) + extent(&last) - start(&first);
    let occupied: f64 = rects.iter().map(|(_, r)| extent(r)).sum();
    let gap = (span - occupied) / (rects.len() - 1) as f64;

    let mut cursor = start(&first);
    let mut placement = Placement::with_capacity(rects.len());
    for (index, (id, rect)) in rects.iter().enumerate() {
        let along = if index == 0 || index == rects.len() - 1 {
            start(rect)
        } else {
            cursor
        };
        cursor = along + extent(rect) + gap;

        let target = match distribution {
            Distribution::Horizontal => Position::new(along, rect.y),
            Distribution::Vertical => Position::new(rect.x, along),
        };
        placement.insert(*id, target);
    }

    placement
}

/// Round `value` to the nearest multiple of `grid`. A non-positive grid
/// disables snapping.
pub fn snap(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid).round() * grid
}

pub fn snap_position(position: Position, grid: f64) -> Position {
    Position::new(snap(position.x, grid), snap(position.y, grid))
}
