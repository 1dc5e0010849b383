//! The live scene: canvas metadata, the background layer and stacked objects.

use crate::document::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use crate::error::AssetError;
use crate::objects::{ObjectId, SceneObject};
use crate::style::DEFAULT_BACKGROUND_COLOR;
use kurbo::{Rect, Size};
use std::collections::HashMap;

/// All placeable objects of one design plus canvas metadata.
#[derive(Debug, Clone)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub background_color: String,
    /// Background image, always painted beneath everything else.
    background: Option<SceneObject>,
    objects: HashMap<ObjectId, SceneObject>,
    /// Paint order of `objects` (back to front).
    z_order: Vec<ObjectId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

impl Scene {
    /// Create an empty scene.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            background: None,
            objects: HashMap::new(),
            z_order: Vec::new(),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Add an object on top of the stack.
    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = object.id();
        if self.objects.insert(id, object).is_none() {
            self.z_order.push(id);
        }
        id
    }

    /// Remove an object.
    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.z_order.retain(|&object_id| object_id != id);
        self.objects.remove(&id)
    }

    /// Replace every non-background object, keeping the given order.
    pub fn replace_objects(&mut self, objects: Vec<SceneObject>) {
        self.objects.clear();
        self.z_order.clear();
        for object in objects {
            self.add(object);
        }
    }

    /// Remove every non-background object.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.z_order.clear();
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Non-background objects, back to front.
    pub fn objects_ordered(&self) -> impl Iterator<Item = &SceneObject> {
        self.z_order.iter().filter_map(|id| self.objects.get(id))
    }

    /// Everything in the order it is painted: background first.
    pub fn paint_order(&self) -> impl Iterator<Item = &SceneObject> {
        self.background.iter().chain(self.objects_ordered())
    }

    /// Position of an object in the stack (0 = backmost).
    pub fn z_position(&self, id: ObjectId) -> Option<usize> {
        self.z_order.iter().position(|&object_id| object_id == id)
    }

    /// Bring an object to the front (topmost).
    /// Returns false if the object is not in the scene or already in front.
    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        if !self.contains(id) || self.z_order.last() == Some(&id) {
            return false;
        }
        self.z_order.retain(|&object_id| object_id != id);
        self.z_order.push(id);
        true
    }

    /// Send an object to the back. It still paints above the background.
    /// Returns false if the object is not in the scene or already at the back.
    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        if !self.contains(id) || self.z_order.first() == Some(&id) {
            return false;
        }
        self.z_order.retain(|&object_id| object_id != id);
        self.z_order.insert(0, id);
        true
    }

    /// Move an object one layer forward (towards front).
    /// Returns true if the object was moved, false if already at front.
    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        if let Some(pos) = self.z_position(id) {
            if pos + 1 < self.z_order.len() {
                self.z_order.swap(pos, pos + 1);
                return true;
            }
        }
        false
    }

    /// Move an object one layer backward (towards back).
    /// Returns true if the object was moved, false if already at back.
    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        if let Some(pos) = self.z_position(id) {
            if pos > 0 {
                self.z_order.swap(pos, pos - 1);
                return true;
            }
        }
        false
    }

    pub fn background(&self) -> Option<&SceneObject> {
        self.background.as_ref()
    }

    /// Install a background layer, returning the previous one.
    /// Only images can be backgrounds, and they are never interactive.
    pub fn set_background(&mut self, mut object: SceneObject) -> Result<Option<SceneObject>, AssetError> {
        if object.as_image().is_none() {
            return Err(AssetError::InvalidRecord(format!(
                "background must be an image, got {}",
                object.kind_name()
            )));
        }
        object.interactive = false;
        Ok(self.background.replace(object))
    }

    pub fn clear_background(&mut self) -> Option<SceneObject> {
        self.background.take()
    }

    /// Number of non-background objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the scene has no objects and no background.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.background.is_none()
    }

    /// Union of the resolved bounds of all painted objects.
    pub fn bounds(&self) -> Option<Rect> {
        self.paint_order()
            .map(SceneObject::resolved_bounds)
            .reduce(|a, b| a.union(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transform;
    use crate::objects::{ImageAsset, ImageObject, ImageSource, TextObject};

    fn image(reference: &str) -> SceneObject {
        SceneObject::image(
            ImageObject::new(ImageSource::Reference(reference.to_string()), ImageAsset::new(10, 10)),
            Transform::default(),
        )
    }

    fn text(label: &str) -> SceneObject {
        SceneObject::text(TextObject::new(label), Transform::default())
    }

    fn labels(scene: &Scene) -> Vec<String> {
        scene
            .objects_ordered()
            .filter_map(|o| o.as_text().map(|t| t.text.clone()))
            .collect()
    }

    #[test]
    fn test_scene_creation() {
        let scene = Scene::default();
        assert!(scene.is_empty());
        assert_eq!(scene.size(), Size::new(800.0, 600.0));
        assert_eq!(scene.background_color, "#ffffff");
    }

    #[test]
    fn test_add_and_remove() {
        let mut scene = Scene::default();
        let id = scene.add(text("a"));
        assert_eq!(scene.len(), 1);
        assert!(scene.get(id).is_some());

        let removed = scene.remove(id);
        assert!(removed.is_some());
        assert!(scene.is_empty());
        assert_eq!(scene.z_position(id), None);
    }

    #[test]
    fn test_adding_same_object_twice_keeps_one_entry() {
        let mut scene = Scene::default();
        let object = text("a");
        scene.add(object.clone());
        scene.add(object);
        assert_eq!(scene.objects_ordered().count(), 1);
    }

    #[test]
    fn test_reordering() {
        let mut scene = Scene::default();
        let a = scene.add(text("a"));
        let b = scene.add(text("b"));
        let c = scene.add(text("c"));
        assert_eq!(labels(&scene), ["a", "b", "c"]);

        assert!(scene.bring_to_front(a));
        assert_eq!(labels(&scene), ["b", "c", "a"]);

        assert!(scene.send_to_back(c));
        assert_eq!(labels(&scene), ["c", "b", "a"]);

        assert!(!scene.bring_forward(a));
        assert!(scene.send_backward(a));
        assert_eq!(labels(&scene), ["c", "a", "b"]);

        assert!(!scene.send_backward(c));
        assert!(scene.bring_forward(c));
        assert_eq!(labels(&scene), ["a", "c", "b"]);
        assert_eq!(scene.z_position(b), Some(2));
    }

    #[test]
    fn test_reordering_unknown_id() {
        let mut scene = Scene::default();
        scene.add(text("a"));
        let stranger = text("x").id();
        assert!(!scene.bring_to_front(stranger));
        assert!(!scene.send_to_back(stranger));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_background_paints_first_and_is_not_interactive() {
        let mut scene = Scene::default();
        scene.add(text("a"));
        assert!(scene.set_background(image("bg.png")).unwrap().is_none());
        let kinds: Vec<_> = scene.paint_order().map(SceneObject::kind_name).collect();
        assert_eq!(kinds, ["image", "text"]);
        assert!(!scene.background().unwrap().interactive);
        assert_eq!(scene.len(), 1);

        assert!(scene.set_background(image("other.png")).unwrap().is_some());
        assert!(scene.clear_background().is_some());
        assert!(scene.background().is_none());
    }

    #[test]
    fn test_non_image_background_is_rejected() {
        let mut scene = Scene::default();
        scene.add(text("a"));
        let result = scene.set_background(text("bg"));
        assert!(matches!(result, Err(AssetError::InvalidRecord(_))));
        assert!(scene.background().is_none());
        assert_eq!(scene.len(), 1);

        scene.set_background(image("bg.png")).unwrap();
        assert!(scene.set_background(text("bg")).is_err());
        assert!(scene.background().unwrap().as_image().is_some());
    }

    #[test]
    fn test_replace_objects_keeps_order() {
        let mut scene = Scene::default();
        scene.add(text("old"));
        scene.replace_objects(vec![text("x"), text("y")]);
        assert_eq!(labels(&scene), ["x", "y"]);
    }
}
