//! Placeable scene objects.

mod image;
mod text;
mod vector;

pub use image::{
    ImageAsset, ImageFilter, ImageFormat, ImageObject, ImageSource, cover_scale, decode_data_uri,
};
pub use text::TextObject;
pub use vector::{
    DEFAULT_MITER_LIMIT, DEFAULT_STROKE_WIDTH, VectorObject, VectorPath, VectorShape, VectorStyle,
    parse_path_data,
};

use crate::geometry::Transform;
use kurbo::{Affine, Rect};
use uuid::Uuid;

/// Unique identifier for live scene objects. Not persisted: documents
/// identify objects by position.
pub type ObjectId = Uuid;

/// Kind-specific part of a scene object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Text(TextObject),
    Image(ImageObject),
    Vector(VectorObject),
}

impl ObjectKind {
    /// Kind name as written in documents.
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Text(_) => "text",
            ObjectKind::Image(_) => "image",
            ObjectKind::Vector(_) => "vector",
        }
    }

    /// Untransformed extent in the object's own coordinate space.
    pub fn content_rect(&self) -> Rect {
        match self {
            ObjectKind::Text(text) => text.content_rect(),
            ObjectKind::Image(image) => image.content_rect(),
            ObjectKind::Vector(vector) => vector.content_rect(),
        }
    }
}

/// One placeable element on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub(crate) id: ObjectId,
    pub transform: Transform,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    pub visible: bool,
    /// Whether the user can select and move the object.
    pub interactive: bool,
    pub kind: ObjectKind,
}

impl SceneObject {
    pub fn new(kind: ObjectKind, transform: Transform) -> Self {
        Self {
            id: Uuid::new_v4(),
            transform,
            opacity: 1.0,
            visible: true,
            interactive: true,
            kind,
        }
    }

    pub fn text(text: TextObject, transform: Transform) -> Self {
        Self::new(ObjectKind::Text(text), transform)
    }

    pub fn image(image: ImageObject, transform: Transform) -> Self {
        Self::new(ObjectKind::Image(image), transform)
    }

    pub fn vector(vector: VectorObject, transform: Transform) -> Self {
        Self::new(ObjectKind::Vector(vector), transform)
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Assign a fresh id, e.g. after duplicating an object.
    pub fn regenerate_id(&mut self) {
        self.id = Uuid::new_v4();
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn content_rect(&self) -> Rect {
        self.kind.content_rect()
    }

    /// Local-to-canvas matrix.
    pub fn matrix(&self) -> Affine {
        self.transform.matrix(self.content_rect())
    }

    /// Axis-aligned bounds on the canvas after the full transform.
    pub fn resolved_bounds(&self) -> Rect {
        self.transform.resolved_bounds(self.content_rect())
    }

    pub fn as_text(&self) -> Option<&TextObject> {
        match &self.kind {
            ObjectKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageObject> {
        match &self.kind {
            ObjectKind::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorObject> {
        match &self.kind {
            ObjectKind::Vector(vector) => Some(vector),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{OriginX, OriginY};

    #[test]
    fn test_new_object_defaults() {
        let object = SceneObject::text(TextObject::new("hi"), Transform::default());
        assert_eq!(object.opacity, 1.0);
        assert!(object.visible);
        assert!(object.interactive);
        assert_eq!(object.kind_name(), "text");
        assert!(object.as_text().is_some());
        assert!(object.as_image().is_none());
    }

    #[test]
    fn test_regenerate_id() {
        let mut object = SceneObject::text(TextObject::new("hi"), Transform::default());
        let before = object.id();
        object.regenerate_id();
        assert_ne!(object.id(), before);
    }

    #[test]
    fn test_image_resolved_bounds() {
        let image = ImageObject::new(
            ImageSource::Reference("a.png".to_string()),
            ImageAsset::new(200, 100),
        );
        let transform = Transform::at(50.0, 60.0)
            .with_origin(OriginX::Left, OriginY::Top)
            .with_scale(0.5, 0.5);
        let object = SceneObject::image(image, transform);
        assert_eq!(object.resolved_bounds(), Rect::new(50.0, 60.0, 150.0, 110.0));
    }

    #[test]
    fn test_vector_matrix_maps_path_into_canvas() {
        let vector = VectorObject::path(parse_path_data("M 0 0 L 20 10").unwrap());
        let object = SceneObject::vector(vector, Transform::at(100.0, 100.0));
        let bounds = object.resolved_bounds();
        assert_eq!(bounds, Rect::new(90.0, 95.0, 110.0, 105.0));
        assert_eq!(object.matrix() * kurbo::Point::new(10.0, 5.0), kurbo::Point::new(100.0, 100.0));
    }
}
