//! Live scene to document conversion.

use crate::canonical::canonical_record;
use crate::document::{
    CommonRecord, DocumentVersion, ImageRecord, ObjectRecord, PathRecord, RecordBody,
    SceneDocument, VectorGeometry, VectorRecord,
};
use crate::objects::{ObjectKind, SceneObject, VectorShape};
use crate::scene::Scene;

/// Convert a live scene into a document.
///
/// Records follow paint order, background first, and each record's `zIndex`
/// is its position in that order. The scene is not modified.
pub fn serialize(scene: &Scene) -> SceneDocument {
    let background = scene.background().map(|object| (object, true));
    let objects = scene.objects_ordered().map(|object| (object, false));
    document(scene, background.into_iter().chain(objects))
}

/// Convert a scene without its background layer. This is the form kept
/// in undo history.
pub fn snapshot(scene: &Scene) -> SceneDocument {
    document(scene, scene.objects_ordered().map(|object| (object, false)))
}

fn document<'a>(
    scene: &Scene,
    objects: impl Iterator<Item = (&'a SceneObject, bool)>,
) -> SceneDocument {
    let objects: Vec<ObjectRecord> = objects
        .enumerate()
        .map(|(position, (object, is_background))| {
            object_record(object, position as u64, is_background)
        })
        .collect();
    log::debug!("Serialized scene with {} records", objects.len());
    SceneDocument {
        version: DocumentVersion::default(),
        width: scene.width,
        height: scene.height,
        background_color: scene.background_color.clone(),
        objects,
    }
}

/// Build the canonical record of one live object.
pub fn object_record(object: &SceneObject, z_index: u64, is_background: bool) -> ObjectRecord {
    let body = match &object.kind {
        ObjectKind::Text(text) => RecordBody::Text(text.clone()),
        ObjectKind::Image(image) => RecordBody::Image(ImageRecord {
            source_reference: image.source.to_reference(),
            original_width: image.original_width,
            original_height: image.original_height,
            width: image.natural_width,
            height: image.natural_height,
            filters: image.filters.clone(),
        }),
        ObjectKind::Vector(vector) => RecordBody::Vector(VectorRecord {
            geometry: match &vector.shape {
                VectorShape::Path(path) => VectorGeometry::Path(path.to_svg()),
                VectorShape::Group(children) => VectorGeometry::Group(
                    children
                        .iter()
                        .map(|child| PathRecord {
                            path_data: child.path_data(),
                            fill: child.fill.clone(),
                            stroke: child.stroke.clone(),
                            stroke_width: child.stroke_width,
                            dash_array: child.dash_array.clone(),
                        })
                        .collect(),
                ),
            },
            style: vector.style.clone(),
        }),
    };

    canonical_record(ObjectRecord {
        common: CommonRecord {
            transform: object.transform,
            opacity: object.opacity,
            visible: object.visible,
            z_index: z_index as f64,
            is_background,
        },
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transform;
    use crate::objects::{
        ImageAsset, ImageObject, ImageSource, TextObject, VectorObject, VectorPath,
        parse_path_data,
    };
    use serde_json::json;

    fn image(reference: &str) -> SceneObject {
        SceneObject::image(
            ImageObject::new(
                ImageSource::Reference(reference.to_string()),
                ImageAsset::new(640, 480),
            ),
            Transform::at(100.0, 100.0),
        )
    }

    #[test]
    fn test_z_index_follows_paint_order() {
        let mut scene = Scene::default();
        let a = scene.add(SceneObject::text(TextObject::new("a"), Transform::default()));
        scene.add(SceneObject::text(TextObject::new("b"), Transform::default()));
        scene.bring_to_front(a);
        scene.set_background(image("bg.png")).unwrap();

        let doc = serialize(&scene);
        assert_eq!(doc.objects.len(), 3);
        assert!(doc.objects[0].common.is_background);
        assert_eq!(doc.objects[0].kind(), "image");
        let z: Vec<f64> = doc.objects.iter().map(|r| r.common.z_index).collect();
        assert_eq!(z, [0.0, 1.0, 2.0]);
        let RecordBody::Text(top) = &doc.objects[2].body else {
            panic!("expected text on top");
        };
        assert_eq!(top.text, "a");
    }

    #[test]
    fn test_snapshot_excludes_background() {
        let mut scene = Scene::default();
        scene.set_background(image("bg.png")).unwrap();
        scene.add(image("logo.png"));
        let snap = snapshot(&scene);
        assert_eq!(snap.objects.len(), 1);
        assert!(!snap.objects[0].common.is_background);
        assert_eq!(snap.objects[0].common.z_index, 0.0);
    }

    #[test]
    fn test_embedded_image_written_as_data_uri() {
        let mut scene = Scene::default();
        let source = ImageSource::Embedded {
            format: crate::objects::ImageFormat::Png,
            data_base64: "iVBORw0KGgo=".to_string(),
        };
        scene.add(SceneObject::image(
            ImageObject::new(source, ImageAsset::new(1, 1)),
            Transform::default(),
        ));
        let value = serialize(&scene).to_value();
        assert_eq!(
            value["objects"][0]["sourceReference"],
            json!("data:image/png;base64,iVBORw0KGgo=")
        );
    }

    #[test]
    fn test_upload_size_is_kept_separately_from_natural_size() {
        let mut object = image("a.png");
        if let ObjectKind::Image(image) = &mut object.kind {
            image.natural_width = 320;
            image.natural_height = 240;
        }
        let record = object_record(&object, 0, false);
        let RecordBody::Image(image) = record.body else {
            panic!("expected image");
        };
        assert_eq!((image.original_width, image.original_height), (640, 480));
        assert_eq!((image.width, image.height), (320, 240));
    }

    #[test]
    fn test_group_children_are_flattened() {
        let group = VectorObject::group(vec![
            VectorPath::parse("M0 0L10 10").unwrap().with_fill("#ff0000"),
            VectorPath::parse("M5 5L6 6").unwrap().with_stroke("#00ff00", 2.0),
        ])
        .unwrap();
        let record = object_record(&SceneObject::vector(group, Transform::default()), 3, false);
        let RecordBody::Vector(vector) = record.body else {
            panic!("expected vector");
        };
        let VectorGeometry::Group(children) = vector.geometry else {
            panic!("expected group");
        };
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].fill.as_deref(), Some("#ff0000"));
        assert_eq!(children[1].stroke_width, 2.0);
        assert_eq!(
            parse_path_data(&children[0].path_data).unwrap(),
            parse_path_data("M0 0L10 10").unwrap()
        );
    }

    #[test]
    fn test_invalid_live_values_are_canonicalized() {
        let mut object = SceneObject::text(TextObject::new("x"), Transform::default());
        object.opacity = 3.0;
        object.transform.scale_x = f64::NAN;
        let record = object_record(&object, 0, false);
        assert_eq!(record.common.opacity, 1.0);
        assert_eq!(record.common.transform.scale_x, 1.0);
    }

    #[test]
    fn test_serialize_does_not_mutate() {
        let mut scene = Scene::default();
        scene.add(image("a.png"));
        let before: Vec<_> = scene.objects_ordered().cloned().collect();
        let _ = serialize(&scene);
        let after: Vec<_> = scene.objects_ordered().cloned().collect();
        assert_eq!(before, after);
    }
}
