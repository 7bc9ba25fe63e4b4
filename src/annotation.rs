//! Annotation records and the validated set the overlay renders from.
//!
//! Records are supplied wholesale by the host. The overlay never edits them;
//! it only derives display geometry whenever the viewport changes.

use std::collections::HashSet;
use std::fmt;

use lexi_draw::Size;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidAnnotationError, InvalidReason};

/// Overshoot past the far edge that pixel conversion snaps back to 1.0.
const EDGE_EPSILON: f32 = 1e-4;

/// Shrink `extent` so `origin + extent` lands on 1.0 when it overshoots by
/// no more than [`EDGE_EPSILON`].
fn snap_to_edge(origin: f32, extent: f32) -> f32 {
    let end = origin + extent;
    if end > 1.0 && end <= 1.0 + EDGE_EPSILON {
        1.0 - origin
    } else {
        extent
    }
}

/// Opaque unique identifier chosen by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationId(String);

impl AnnotationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AnnotationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Vocabulary category of an annotation. Only affects styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    /// Body parts: beak, wing, tail...
    #[default]
    Anatomical,
    /// Actions: perching, diving...
    Behavioral,
    Color,
    Pattern,
    Habitat,
}

impl AnnotationKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::Anatomical => "Anatomical",
            AnnotationKind::Behavioral => "Behavioral",
            AnnotationKind::Color => "Color",
            AnnotationKind::Pattern => "Pattern",
            AnnotationKind::Habitat => "Habitat",
        }
    }

    pub fn all() -> &'static [AnnotationKind] {
        &[
            AnnotationKind::Anatomical,
            AnnotationKind::Behavioral,
            AnnotationKind::Color,
            AnnotationKind::Pattern,
            AnnotationKind::Habitat,
        ]
    }
}

/// Region of interest in unit coordinates relative to the image's natural size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Convert a box given in natural image pixels. A box ending on the image
    /// edge is kept inside it despite division rounding.
    pub fn from_pixels(x: f32, y: f32, width: f32, height: f32, natural: Size) -> Option<Self> {
        if natural.is_empty() {
            return None;
        }
        let (nx, ny) = (x / natural.width, y / natural.height);
        Some(Self::new(
            nx,
            ny,
            snap_to_edge(nx, width / natural.width),
            snap_to_edge(ny, height / natural.height),
        ))
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check `0 <= x`, `0 <= y`, `x + width <= 1`, `y + height <= 1` and a
    /// positive size.
    pub fn validate(&self) -> Result<(), InvalidReason> {
        let values = [self.x, self.y, self.width, self.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(InvalidReason::NonFinite);
        }
        if self.x < 0.0 || self.y < 0.0 {
            return Err(InvalidReason::NegativeOrigin);
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(InvalidReason::NonPositiveSize);
        }
        if self.right() > 1.0 || self.bottom() > 1.0 {
            return Err(InvalidReason::OutOfBounds);
        }
        Ok(())
    }
}

fn default_visible() -> bool {
    true
}

/// A labeled rectangular region on the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub bounding_box: NormalizedBox,
    #[serde(default)]
    pub kind: AnnotationKind,
    /// Primary display term.
    pub label: String,
    /// Optional translation or secondary term.
    #[serde(default)]
    pub secondary_label: Option<String>,
    /// Soft-delete flag. Hidden annotations are never drawn or hit-tested.
    #[serde(default = "default_visible")]
    pub visible: bool,
}

impl Annotation {
    pub fn new(
        id: impl Into<String>,
        bounding_box: NormalizedBox,
        kind: AnnotationKind,
        label: impl Into<String>,
    ) -> Self {
        Self {
            id: AnnotationId::new(id),
            bounding_box,
            kind,
            label: label.into(),
            secondary_label: None,
            visible: true,
        }
    }

    pub fn with_secondary(mut self, secondary: impl Into<String>) -> Self {
        self.secondary_label = Some(secondary.into());
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn validate(&self) -> Result<(), InvalidAnnotationError> {
        self.bounding_box
            .validate()
            .map_err(|reason| InvalidAnnotationError {
                id: self.id.clone(),
                reason,
            })
    }
}

/// How bounding boxes are expressed in incoming records.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BoxUnits {
    /// Unit coordinates (0.0-1.0), the storage format.
    #[default]
    Normalized,
    /// Natural image pixels; converted once at ingestion.
    Pixels { natural: Size },
}

/// Validated annotations in z-order (later records draw on top).
#[derive(Debug, Clone, Default)]
pub struct AnnotationSet {
    records: Vec<Annotation>,
}

impl AnnotationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep every valid record; return the rejected ones alongside.
    pub fn from_records(records: Vec<Annotation>) -> (Self, Vec<InvalidAnnotationError>) {
        let mut seen = HashSet::new();
        let mut valid = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for record in records {
            if let Err(e) = record.validate() {
                rejected.push(e);
                continue;
            }
            if !seen.insert(record.id.clone()) {
                rejected.push(InvalidAnnotationError {
                    id: record.id.clone(),
                    reason: InvalidReason::DuplicateId,
                });
                continue;
            }
            valid.push(record);
        }

        (Self { records: valid }, rejected)
    }

    /// Parse a JSON array of records, converting pixel boxes when asked to.
    pub fn from_json(
        json: &str,
        units: BoxUnits,
    ) -> Result<(Self, Vec<InvalidAnnotationError>), serde_json::Error> {
        let records: Vec<Annotation> = serde_json::from_str(json)?;

        let natural = match units {
            BoxUnits::Normalized => return Ok(Self::from_records(records)),
            BoxUnits::Pixels { natural } => natural,
        };

        let mut converted = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        for mut record in records {
            let b = record.bounding_box;
            match NormalizedBox::from_pixels(b.x, b.y, b.width, b.height, natural) {
                Some(normalized) => {
                    record.bounding_box = normalized;
                    converted.push(record);
                }
                None => rejected.push(InvalidAnnotationError {
                    id: record.id,
                    reason: InvalidReason::UnknownImageSize,
                }),
            }
        }

        let (set, mut invalid) = Self::from_records(converted);
        rejected.append(&mut invalid);
        Ok((set, rejected))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.records.iter().find(|a| &a.id == id)
    }

    pub fn get_index(&self, index: usize) -> Option<&Annotation> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.records.iter()
    }

    /// Visible records with their z-order index.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Annotation)> {
        self.records.iter().enumerate().filter(|(_, a)| a.visible)
    }
}
