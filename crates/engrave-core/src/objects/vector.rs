//! Vector objects built from SVG path data.

use crate::error::AssetError;
use crate::style::{LineCap, LineJoin, parse_color};
use kurbo::{BezPath, Rect, Shape as KurboShape, Stroke};
use peniko::Color;

/// Default stroke width for vector outlines.
pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

/// Default miter limit for stroked corners.
pub const DEFAULT_MITER_LIMIT: f64 = 4.0;

/// Parse SVG path data into a non-empty path.
pub fn parse_path_data(data: &str) -> Result<BezPath, AssetError> {
    let path = BezPath::from_svg(data.trim())
        .map_err(|e| AssetError::InvalidPath(format!("{}: {:?}", e, truncate(data))))?;
    if path.elements().is_empty() {
        return Err(AssetError::InvalidPath("path data is empty".to_string()));
    }
    Ok(path)
}

fn truncate(data: &str) -> String {
    data.chars().take(32).collect()
}

/// One child path of a vector group, with its own paint.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorPath {
    pub data: BezPath,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
    pub dash_array: Vec<f64>,
}

impl VectorPath {
    pub fn new(data: BezPath) -> Self {
        Self {
            data,
            fill: None,
            stroke: None,
            stroke_width: DEFAULT_STROKE_WIDTH,
            dash_array: Vec::new(),
        }
    }

    /// Parse a child path from SVG path data.
    pub fn parse(data: &str) -> Result<Self, AssetError> {
        parse_path_data(data).map(Self::new)
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn with_stroke(mut self, stroke: impl Into<String>, width: f64) -> Self {
        self.stroke = Some(stroke.into());
        self.stroke_width = width;
        self
    }

    /// SVG path data for this path.
    pub fn path_data(&self) -> String {
        self.data.to_svg()
    }

    pub fn bounds(&self) -> Rect {
        self.data.bounding_box()
    }
}

/// Geometry of a vector object.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorShape {
    /// A single path painted with the object-level style.
    Path(BezPath),
    /// Child paths kept in paint order, each with its own paint.
    Group(Vec<VectorPath>),
}

/// Object-level paint and stroke geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorStyle {
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
    pub dash_array: Vec<f64>,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
}

impl Default for VectorStyle {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: DEFAULT_STROKE_WIDTH,
            dash_array: Vec::new(),
            line_cap: LineCap::default(),
            line_join: LineJoin::default(),
            miter_limit: DEFAULT_MITER_LIMIT,
        }
    }
}

impl VectorStyle {
    /// Stroke parameters for outlining or exporting.
    pub fn stroke(&self) -> Stroke {
        let stroke = Stroke::new(self.stroke_width)
            .with_caps(self.line_cap.into())
            .with_join(self.line_join.into())
            .with_miter_limit(self.miter_limit);
        if self.dash_array.is_empty() {
            stroke
        } else {
            stroke.with_dashes(0.0, self.dash_array.iter().copied())
        }
    }

    pub fn fill_color(&self) -> Option<Color> {
        self.fill.as_deref().and_then(parse_color)
    }

    pub fn stroke_color(&self) -> Option<Color> {
        self.stroke.as_deref().and_then(parse_color)
    }
}

/// A vector graphic: one path or a group of paths.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorObject {
    pub shape: VectorShape,
    pub style: VectorStyle,
}

impl VectorObject {
    pub fn path(path: BezPath) -> Self {
        Self {
            shape: VectorShape::Path(path),
            style: VectorStyle::default(),
        }
    }

    /// Build a group. A group needs at least one child.
    pub fn group(children: Vec<VectorPath>) -> Result<Self, AssetError> {
        if children.is_empty() {
            return Err(AssetError::EmptyGroup);
        }
        Ok(Self {
            shape: VectorShape::Group(children),
            style: VectorStyle::default(),
        })
    }

    pub fn with_style(mut self, style: VectorStyle) -> Self {
        self.style = style;
        self
    }

    pub fn is_group(&self) -> bool {
        matches!(self.shape, VectorShape::Group(_))
    }

    /// Untransformed extent: the union of all path bounds.
    pub fn content_rect(&self) -> Rect {
        match &self.shape {
            VectorShape::Path(path) => path.bounding_box(),
            VectorShape::Group(children) => children
                .iter()
                .map(VectorPath::bounds)
                .reduce(|a, b| a.union(b))
                .unwrap_or(Rect::ZERO),
        }
    }

    /// Every path with the paint it is drawn with. Group children without
    /// their own fill or stroke inherit the object-level one.
    pub fn painted_paths(&self) -> Vec<VectorPath> {
        match &self.shape {
            VectorShape::Path(path) => vec![VectorPath {
                data: path.clone(),
                fill: self.style.fill.clone(),
                stroke: self.style.stroke.clone(),
                stroke_width: self.style.stroke_width,
                dash_array: self.style.dash_array.clone(),
            }],
            VectorShape::Group(children) => children
                .iter()
                .map(|child| VectorPath {
                    data: child.data.clone(),
                    fill: child.fill.clone().or_else(|| self.style.fill.clone()),
                    stroke: child.stroke.clone().or_else(|| self.style.stroke.clone()),
                    stroke_width: child.stroke_width,
                    dash_array: if child.dash_array.is_empty() {
                        self.style.dash_array.clone()
                    } else {
                        child.dash_array.clone()
                    },
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_path_data() {
        let path = VectorPath::parse("M 10 10 L 30 10 L 30 20 Z").unwrap();
        let bounds = path.bounds();
        assert_eq!((bounds.x0, bounds.y0, bounds.x1, bounds.y1), (10.0, 10.0, 30.0, 20.0));
    }

    #[test]
    fn test_invalid_and_empty_path_data() {
        assert!(matches!(
            parse_path_data("M 10 banana"),
            Err(AssetError::InvalidPath(_))
        ));
        assert!(matches!(parse_path_data("   "), Err(AssetError::InvalidPath(_))));
    }

    #[test]
    fn test_path_data_survives_reprint() {
        let path = VectorPath::parse("M0 0 L10 0 L10 10 Z").unwrap();
        let reparsed = VectorPath::parse(&path.path_data()).unwrap();
        assert_eq!(reparsed.data, path.data);
    }

    #[test]
    fn test_empty_group_is_rejected() {
        assert_eq!(VectorObject::group(Vec::new()), Err(AssetError::EmptyGroup));
    }

    #[test]
    fn test_group_content_rect_is_union() {
        let group = VectorObject::group(vec![
            VectorPath::parse("M 0 0 L 10 10").unwrap(),
            VectorPath::parse("M 20 5 L 40 30").unwrap(),
        ])
        .unwrap();
        assert_eq!(group.content_rect(), Rect::new(0.0, 0.0, 40.0, 30.0));
        assert!(group.is_group());
    }

    #[test]
    fn test_children_inherit_missing_paint() {
        let mut group = VectorObject::group(vec![
            VectorPath::parse("M 0 0 L 1 1").unwrap(),
            VectorPath::parse("M 0 0 L 2 2").unwrap().with_fill("#ff0000"),
        ])
        .unwrap();
        group.style.fill = Some("#000000".to_string());
        let painted = group.painted_paths();
        assert_eq!(painted[0].fill.as_deref(), Some("#000000"));
        assert_eq!(painted[1].fill.as_deref(), Some("#ff0000"));
    }

    #[test]
    fn test_stroke_parameters() {
        let style = VectorStyle {
            stroke_width: 3.0,
            line_cap: LineCap::Round,
            line_join: LineJoin::Bevel,
            dash_array: vec![4.0, 2.0],
            ..VectorStyle::default()
        };
        let stroke = style.stroke();
        assert_eq!(stroke.width, 3.0);
        assert_eq!(stroke.join, kurbo::Join::Bevel);
        assert_eq!(stroke.start_cap, kurbo::Cap::Round);
        assert_eq!(stroke.dash_pattern.len(), 2);
    }
}
