//! Placement of scene objects: position, anchor, scale, rotation and flips.

use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Horizontal anchor of an object's `left` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginX {
    Left,
    #[default]
    Center,
    Right,
}

impl OriginX {
    /// Fraction of the content width at which the anchor sits.
    pub fn factor(self) -> f64 {
        match self {
            OriginX::Left => 0.0,
            OriginX::Center => 0.5,
            OriginX::Right => 1.0,
        }
    }

    /// Name as written in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            OriginX::Left => "left",
            OriginX::Center => "center",
            OriginX::Right => "right",
        }
    }

    /// Parse a document value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(OriginX::Left),
            "center" => Some(OriginX::Center),
            "right" => Some(OriginX::Right),
            _ => None,
        }
    }
}

/// Vertical anchor of an object's `top` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginY {
    Top,
    #[default]
    Center,
    Bottom,
}

impl OriginY {
    /// Fraction of the content height at which the anchor sits.
    pub fn factor(self) -> f64 {
        match self {
            OriginY::Top => 0.0,
            OriginY::Center => 0.5,
            OriginY::Bottom => 1.0,
        }
    }

    /// Name as written in documents.
    pub fn as_str(self) -> &'static str {
        match self {
            OriginY::Top => "top",
            OriginY::Center => "center",
            OriginY::Bottom => "bottom",
        }
    }

    /// Parse a document value, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "top" => Some(OriginY::Top),
            "center" => Some(OriginY::Center),
            "bottom" => Some(OriginY::Bottom),
            _ => None,
        }
    }
}

/// Geometric placement of an object on the canvas.
///
/// `left`/`top` locate the anchor point selected by `origin_x`/`origin_y`.
/// Rotation and scaling happen around that anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub left: f64,
    pub top: f64,
    pub origin_x: OriginX,
    pub origin_y: OriginY,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Rotation in degrees, clockwise in canvas space.
    pub angle: f64,
    pub flip_x: bool,
    pub flip_y: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            origin_x: OriginX::default(),
            origin_y: OriginY::default(),
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            flip_x: false,
            flip_y: false,
        }
    }
}

impl Transform {
    /// Identity placement anchored (by center) at the given point.
    pub fn at(left: f64, top: f64) -> Self {
        Self {
            left,
            top,
            ..Self::default()
        }
    }

    pub fn with_scale(mut self, scale_x: f64, scale_y: f64) -> Self {
        self.scale_x = scale_x;
        self.scale_y = scale_y;
        self
    }

    pub fn with_angle(mut self, degrees: f64) -> Self {
        self.angle = degrees;
        self
    }

    pub fn with_origin(mut self, origin_x: OriginX, origin_y: OriginY) -> Self {
        self.origin_x = origin_x;
        self.origin_y = origin_y;
        self
    }

    /// The anchor point in canvas coordinates.
    pub fn position(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Move the anchor point.
    pub fn set_position(&mut self, point: Point) {
        self.left = point.x;
        self.top = point.y;
    }

    /// Set the same scale on both axes.
    pub fn set_uniform_scale(&mut self, scale: f64) {
        self.scale_x = scale;
        self.scale_y = scale;
    }

    /// Signed scale factors with flips applied.
    pub fn signed_scale(&self) -> Vec2 {
        let sx = if self.flip_x { -self.scale_x } else { self.scale_x };
        let sy = if self.flip_y { -self.scale_y } else { self.scale_y };
        Vec2::new(sx, sy)
    }

    /// Matrix mapping local content coordinates into canvas coordinates.
    ///
    /// `content` is the object's untransformed extent in its own coordinate
    /// space; the anchor is taken relative to it.
    pub fn matrix(&self, content: Rect) -> Affine {
        let anchor = Vec2::new(
            content.x0 + self.origin_x.factor() * content.width(),
            content.y0 + self.origin_y.factor() * content.height(),
        );
        let scale = self.signed_scale();
        Affine::translate(Vec2::new(self.left, self.top))
            * Affine::rotate(self.angle.to_radians())
            * Affine::scale_non_uniform(scale.x, scale.y)
            * Affine::translate(-anchor)
    }

    /// Axis-aligned bounds of `content` once placed on the canvas.
    pub fn resolved_bounds(&self, content: Rect) -> Rect {
        self.matrix(content).transform_rect_bbox(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rect_eq(a: Rect, b: Rect) {
        assert!((a.x0 - b.x0).abs() < 1e-9, "{a:?} != {b:?}");
        assert!((a.y0 - b.y0).abs() < 1e-9, "{a:?} != {b:?}");
        assert!((a.x1 - b.x1).abs() < 1e-9, "{a:?} != {b:?}");
        assert!((a.y1 - b.y1).abs() < 1e-9, "{a:?} != {b:?}");
    }

    #[test]
    fn test_center_origin_bounds() {
        let content = Rect::new(0.0, 0.0, 100.0, 50.0);
        let transform = Transform::at(200.0, 100.0).with_scale(2.0, 2.0);
        assert_rect_eq(
            transform.resolved_bounds(content),
            Rect::new(100.0, 50.0, 300.0, 150.0),
        );
    }

    #[test]
    fn test_top_left_origin_bounds() {
        let content = Rect::new(0.0, 0.0, 100.0, 50.0);
        let transform = Transform::at(10.0, 20.0).with_origin(OriginX::Left, OriginY::Top);
        assert_rect_eq(
            transform.resolved_bounds(content),
            Rect::new(10.0, 20.0, 110.0, 70.0),
        );
    }

    #[test]
    fn test_rotation_swaps_extent() {
        let content = Rect::new(0.0, 0.0, 100.0, 50.0);
        let transform = Transform::at(0.0, 0.0).with_angle(90.0);
        let bounds = transform.resolved_bounds(content);
        assert!((bounds.width() - 50.0).abs() < 1e-9);
        assert!((bounds.height() - 100.0).abs() < 1e-9);
        assert!((bounds.center().x).abs() < 1e-9);
        assert!((bounds.center().y).abs() < 1e-9);
    }

    #[test]
    fn test_flip_mirrors_around_anchor() {
        let content = Rect::new(0.0, 0.0, 10.0, 10.0);
        let mut transform = Transform::at(0.0, 0.0).with_origin(OriginX::Left, OriginY::Top);
        transform.flip_x = true;
        let corner = transform.matrix(content) * Point::new(10.0, 0.0);
        assert!((corner.x + 10.0).abs() < 1e-9);
        assert_rect_eq(
            transform.resolved_bounds(content),
            Rect::new(-10.0, 0.0, 0.0, 10.0),
        );
    }

    #[test]
    fn test_content_offset_is_respected() {
        // Vector content whose path does not start at the origin.
        let content = Rect::new(50.0, 50.0, 70.0, 60.0);
        let transform = Transform::at(0.0, 0.0);
        assert_rect_eq(
            transform.resolved_bounds(content),
            Rect::new(-10.0, -5.0, 10.0, 5.0),
        );
    }

    #[test]
    fn test_origin_parse() {
        assert_eq!(OriginX::parse("LEFT"), Some(OriginX::Left));
        assert_eq!(OriginX::parse("middle"), None);
        assert_eq!(OriginY::parse(" bottom "), Some(OriginY::Bottom));
        assert_eq!(OriginY::Center.as_str(), "center");
    }
}
