//! Color values and the canonical keys used to deduplicate them.
//!
//! Solid colors are keyed by their 8-bit RGBA bytes, gradients by a
//! fingerprint of their type, stops and transform. Both keys operate at
//! display precision: two channels that round to the same byte are the same
//! color as far as the inventory is concerned.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// An RGBA color with every channel in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    /// Alpha, 1 when the source carries no explicit opacity.
    #[serde(default = "opaque_alpha")]
    pub a: f64,
}

fn opaque_alpha() -> f64 {
    1.0
}

impl Rgba {
    /// Create a color from all four channels.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    /// Create a fully opaque color.
    pub fn opaque(r: f64, g: f64, b: f64) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Channels quantized to bytes, in R, G, B, A order.
    pub fn to_bytes(self) -> [u8; 4] {
        [
            channel_byte(self.r),
            channel_byte(self.g),
            channel_byte(self.b),
            channel_byte(self.a),
        ]
    }
}

fn channel_byte(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Dedup key for a solid color: 8 uppercase hex digits, alpha included.
///
/// ```
/// use swatchscan_core::{hex_key, Rgba};
/// assert_eq!(hex_key(Rgba::opaque(1.0, 0.0, 0.0)), "FF0000FF");
/// ```
pub fn hex_key(rgba: Rgba) -> String {
    let mut out = String::with_capacity(8);
    for byte in rgba.to_bytes() {
        let _ = write!(out, "{byte:02X}");
    }
    out
}

/// Inventory hex string, `#RRGGBBAA`.
pub fn hex_string(rgba: Rgba) -> String {
    format!("#{}", hex_key(rgba))
}

/// Hex for display: `#RRGGBB` when opaque, `#RRGGBBAA` otherwise.
pub fn display_hex(rgba: Rgba) -> String {
    let key = hex_key(rgba);
    if rgba.to_bytes()[3] == u8::MAX {
        format!("#{}", &key[..6])
    } else {
        format!("#{key}")
    }
}

/// Gradient geometry kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradientType {
    Linear,
    Radial,
    Angular,
    Diamond,
}

/// A single color stop of a gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub color: Rgba,
    pub position: f64,
}

impl GradientStop {
    pub fn new(color: Rgba, position: f64) -> Self {
        Self { color, position }
    }
}

/// 2x3 affine matrix, row major.
pub type Transform = [[f64; 3]; 2];

/// Canonical description of a gradient paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientData {
    pub gradient_type: GradientType,
    /// Stops in authored order.
    pub stops: Vec<GradientStop>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl GradientData {
    pub fn new(gradient_type: GradientType, stops: Vec<GradientStop>) -> Self {
        Self {
            gradient_type,
            stops,
            angle: None,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Dedup key for this gradient. See [`gradient_fingerprint`].
    pub fn fingerprint(&self) -> String {
        gradient_fingerprint(self)
    }
}

/// Fingerprint a gradient as `TYPE:stops:angle:transform`.
///
/// Stops are rendered as `HEXKEY@position` joined by `|` without sorting, so
/// stop order is significant. The angle and transform components are empty
/// when absent. No tolerance is applied beyond the 8-bit color rounding.
pub fn gradient_fingerprint(gradient: &GradientData) -> String {
    let stops = gradient
        .stops
        .iter()
        .map(|stop| format!("{}@{}", hex_key(stop.color), stop.position))
        .collect::<Vec<_>>()
        .join("|");

    let angle = gradient
        .angle
        .map(|angle| format!("angle:{angle}"))
        .unwrap_or_default();

    let transform = gradient
        .transform
        .map(|rows| {
            let flat = rows
                .iter()
                .flatten()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(",");
            format!("transform:{flat}")
        })
        .unwrap_or_default();

    format!("{}:{stops}:{angle}:{transform}", gradient.gradient_type)
}
