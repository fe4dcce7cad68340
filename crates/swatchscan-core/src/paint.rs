//! Paints, text runs, and token binding references as exposed by the host.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::color::{GradientData, GradientStop, GradientType, Rgba, Transform};
use crate::error::DocumentError;
use crate::node::NodeId;

/// Host paint type tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaintKind {
    Solid,
    GradientLinear,
    GradientRadial,
    GradientAngular,
    GradientDiamond,
    Image,
    Video,
    #[serde(other)]
    Other,
}

impl PaintKind {
    /// Gradient geometry for the four gradient paint kinds.
    pub fn gradient_type(self) -> Option<GradientType> {
        match self {
            PaintKind::GradientLinear => Some(GradientType::Linear),
            PaintKind::GradientRadial => Some(GradientType::Radial),
            PaintKind::GradientAngular => Some(GradientType::Angular),
            PaintKind::GradientDiamond => Some(GradientType::Diamond),
            _ => None,
        }
    }
}

/// A fill or stroke paint as reported by the host.
///
/// Only the fields relevant to the paint kind are populated; a solid paint
/// without a color or a gradient without stops is malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paint {
    #[serde(rename = "type")]
    pub kind: PaintKind,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_stops: Option<Vec<GradientStop>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_transform: Option<Transform>,
}

fn default_visible() -> bool {
    true
}

impl Paint {
    /// A visible solid paint.
    pub fn solid(color: Rgba) -> Self {
        Self {
            kind: PaintKind::Solid,
            visible: true,
            opacity: None,
            color: Some(color),
            gradient_stops: None,
            gradient_transform: None,
        }
    }

    /// A visible gradient paint.
    pub fn gradient(kind: PaintKind, stops: Vec<GradientStop>) -> Self {
        Self {
            kind,
            visible: true,
            opacity: None,
            color: None,
            gradient_stops: Some(stops),
            gradient_transform: None,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// The canonical color of a solid paint.
    ///
    /// The paint's opacity becomes the alpha channel, 1 when absent.
    pub fn solid_rgba(&self, node: &NodeId) -> Result<Rgba, DocumentError> {
        let color = self
            .color
            .ok_or_else(|| DocumentError::malformed(node, "solid paint has no color"))?;
        Ok(Rgba::new(
            color.r,
            color.g,
            color.b,
            self.opacity.unwrap_or(1.0),
        ))
    }

    /// The canonical description of a gradient paint, `None` for other kinds.
    pub fn gradient_data(&self, node: &NodeId) -> Result<Option<GradientData>, DocumentError> {
        let Some(gradient_type) = self.kind.gradient_type() else {
            return Ok(None);
        };
        let stops = self
            .gradient_stops
            .clone()
            .ok_or_else(|| DocumentError::malformed(node, "gradient paint has no stops"))?;
        Ok(Some(GradientData {
            gradient_type,
            stops,
            angle: None,
            transform: self.gradient_transform,
        }))
    }
}

/// A styled run of characters in a text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSegment {
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub fills: Vec<Paint>,
}

/// Paint list a binding belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaintProperty {
    Fills,
    Strokes,
}

/// Identifier of a design variable.
pub type VariableId = CompactString;
/// Identifier of a variable collection.
pub type CollectionId = CompactString;
/// Identifier of a legacy paint style.
pub type StyleId = CompactString;

/// Reference type of a variable alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AliasKind {
    VariableAlias,
    #[serde(other)]
    Unknown,
}

/// Reference from a paint slot to a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableAlias {
    #[serde(rename = "type")]
    pub kind: AliasKind,
    pub id: VariableId,
}

impl VariableAlias {
    pub fn new(id: impl Into<VariableId>) -> Self {
        Self {
            kind: AliasKind::VariableAlias,
            id: id.into(),
        }
    }
}

/// A slot's bound variable: one alias, or a fallback chain of aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoundVariable {
    Single(VariableAlias),
    Chain(Vec<VariableAlias>),
}

impl BoundVariable {
    /// The alias that determines the binding. Later chain entries are never
    /// consulted.
    pub fn primary(&self) -> Option<&VariableAlias> {
        match self {
            BoundVariable::Single(alias) => Some(alias),
            BoundVariable::Chain(aliases) => aliases.first(),
        }
    }
}

impl From<VariableAlias> for BoundVariable {
    fn from(alias: VariableAlias) -> Self {
        BoundVariable::Single(alias)
    }
}
