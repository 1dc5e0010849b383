//! An editing session: one live scene with its history and persistence.

use crate::config::EditorConfig;
use crate::error::{AssetError, SessionError, SkippedObject};
use crate::history::{History, HistoryEntry};
use crate::loader::{AssetFetcher, SceneLoader};
use crate::objects::{ObjectId, SceneObject};
use crate::scene::Scene;
use crate::serializer::{serialize, snapshot};
use crate::storage::{ProjectGateway, Storage};
use crate::document::SceneDocument;
use serde_json::Value;

/// Something that happened to the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    ObjectAdded(ObjectId),
    ObjectRemoved(ObjectId),
    ObjectModified(ObjectId),
    Reordered,
    BackgroundChanged,
    SelectionChanged,
    ViewportChanged,
}

impl SceneEvent {
    /// Whether the event changes the object list and gets a history entry.
    /// Background, selection and viewport changes never do.
    pub fn is_undoable(&self) -> bool {
        matches!(
            self,
            SceneEvent::ObjectAdded(_)
                | SceneEvent::ObjectRemoved(_)
                | SceneEvent::ObjectModified(_)
                | SceneEvent::Reordered
        )
    }
}

/// Receives render requests from a session.
pub trait RenderTarget {
    fn render(&mut self, scene: &Scene);
}

/// A render target that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl RenderTarget for NullRenderer {
    fn render(&mut self, _scene: &Scene) {}
}

/// Owns the live scene for one editor.
///
/// Every mutation goes through the session so it can be recorded: undoable
/// events append a background-free snapshot to the history. Undo and redo
/// rebuild the object list through the same reconstruction path as loading.
pub struct EditingSession<F: AssetFetcher, R: RenderTarget = NullRenderer> {
    scene: Scene,
    history: History,
    loader: SceneLoader<F>,
    config: EditorConfig,
    renderer: R,
    selection: Option<ObjectId>,
    /// Unsaved changes since the last load or save.
    dirty: bool,
}

impl<F: AssetFetcher> EditingSession<F> {
    pub fn new(fetcher: F, config: EditorConfig) -> Self {
        Self::with_renderer(fetcher, config, NullRenderer)
    }
}

impl<F: AssetFetcher, R: RenderTarget> EditingSession<F, R> {
    /// Create a session with an empty scene.
    pub fn with_renderer(fetcher: F, config: EditorConfig, renderer: R) -> Self {
        let history = match config.history_limit {
            Some(limit) => History::with_limit(limit),
            None => History::new(),
        };
        let mut session = Self {
            scene: empty_scene(&config),
            history,
            loader: SceneLoader::new(fetcher),
            config,
            renderer,
            selection: None,
            dirty: false,
        };
        session.history.record(snapshot(&session.scene));
        session
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn loader(&self) -> &SceneLoader<F> {
        &self.loader
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn selection(&self) -> Option<ObjectId> {
        self.selection
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The scene as it would be saved.
    pub fn document(&self) -> SceneDocument {
        serialize(&self.scene)
    }

    /// React to a scene event: record undoable ones, then repaint.
    pub fn notify(&mut self, event: SceneEvent) {
        log::debug!("Scene event: {:?}", event);
        match event {
            SceneEvent::SelectionChanged | SceneEvent::ViewportChanged => {}
            SceneEvent::BackgroundChanged => self.dirty = true,
            _ => {
                self.history.record(snapshot(&self.scene));
                self.dirty = true;
            }
        }
        self.renderer.render(&self.scene);
    }

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        let id = self.scene.add(object);
        self.notify(SceneEvent::ObjectAdded(id));
        id
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<SceneObject> {
        let removed = self.scene.remove(id)?;
        if self.selection == Some(id) {
            self.selection = None;
        }
        self.notify(SceneEvent::ObjectRemoved(id));
        Some(removed)
    }

    /// Change an object in place. Returns false if there is no such object.
    pub fn modify(&mut self, id: ObjectId, edit: impl FnOnce(&mut SceneObject)) -> bool {
        let Some(object) = self.scene.get_mut(id) else {
            return false;
        };
        edit(object);
        self.notify(SceneEvent::ObjectModified(id));
        true
    }

    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let moved = self.scene.bring_to_front(id);
        self.reordered(moved)
    }

    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        let moved = self.scene.send_to_back(id);
        self.reordered(moved)
    }

    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        let moved = self.scene.bring_forward(id);
        self.reordered(moved)
    }

    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        let moved = self.scene.send_backward(id);
        self.reordered(moved)
    }

    fn reordered(&mut self, moved: bool) -> bool {
        if moved {
            self.notify(SceneEvent::Reordered);
        }
        moved
    }

    /// Replace the background. Not recorded in history.
    /// Anything other than an image is refused and leaves the scene untouched.
    pub fn set_background(&mut self, object: SceneObject) -> Result<Option<SceneObject>, AssetError> {
        let previous = self.scene.set_background(object)?;
        self.notify(SceneEvent::BackgroundChanged);
        Ok(previous)
    }

    /// Remove the background. Not recorded in history.
    pub fn clear_background(&mut self) -> Option<SceneObject> {
        let previous = self.scene.clear_background()?;
        self.notify(SceneEvent::BackgroundChanged);
        Some(previous)
    }

    pub fn select(&mut self, id: Option<ObjectId>) {
        let id = id.filter(|&id| self.scene.contains(id));
        if self.selection != id {
            self.selection = id;
            self.notify(SceneEvent::SelectionChanged);
        }
    }

    /// Replace the scene with a loaded document.
    ///
    /// On failure the current scene is left untouched. On success history
    /// starts over from the loaded state and the scene is rendered once.
    pub async fn load(&mut self, raw: &Value) -> Result<Vec<SkippedObject>, SessionError> {
        let report = self.loader.load(raw, self.config.canvas_size()).await?;
        self.install(report.scene);
        Ok(report.skipped)
    }

    fn install(&mut self, scene: Scene) {
        self.scene = scene;
        self.selection = None;
        self.history.clear();
        self.history.record(snapshot(&self.scene));
        self.dirty = false;
        self.renderer.render(&self.scene);
    }

    /// Step back one history entry. Returns false at the start of history.
    pub async fn undo(&mut self) -> bool {
        let Some(entry) = self.history.undo().cloned() else {
            return false;
        };
        self.restore(&entry).await;
        true
    }

    /// Step forward one history entry. Returns false at the end of history.
    pub async fn redo(&mut self) -> bool {
        let Some(entry) = self.history.redo().cloned() else {
            return false;
        };
        self.restore(&entry).await;
        true
    }

    /// Rebuild the object list from a snapshot. The background stays as is.
    async fn restore(&mut self, entry: &HistoryEntry) {
        let (objects, skipped) = self.loader.restore_objects(entry.document()).await;
        if !skipped.is_empty() {
            log::warn!(
                "{} objects could not be restored from history",
                skipped.len()
            );
        }
        self.scene.replace_objects(objects);
        self.selection = None;
        self.dirty = true;
        self.renderer.render(&self.scene);
    }

    /// Load a project's design. A project without a design opens as an
    /// empty scene.
    pub async fn load_project<S: Storage>(
        &mut self,
        gateway: &ProjectGateway<S>,
        code: &str,
    ) -> Result<Vec<SkippedObject>, SessionError> {
        match gateway.get(code).await? {
            Some(raw) => self.load(&raw).await,
            None => {
                log::info!("Project {} has no design yet", code);
                self.install(empty_scene(&self.config));
                Ok(Vec::new())
            }
        }
    }

    /// Save the scene to a project. The scene stays dirty if saving fails.
    pub async fn save_project<S: Storage>(
        &mut self,
        gateway: &ProjectGateway<S>,
        code: &str,
        preview: Option<&[u8]>,
    ) -> Result<(), SessionError> {
        gateway.put(code, &self.document(), preview).await?;
        self.dirty = false;
        Ok(())
    }
}

fn empty_scene(config: &EditorConfig) -> Scene {
    let mut scene = Scene::new(config.canvas_width, config.canvas_height);
    scene.background_color = config.background_color.clone();
    scene
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::geometry::Transform;
    use crate::objects::{ImageAsset, ImageObject, ImageSource, TextObject};
    use crate::project::ProjectRecord;
    use crate::storage::{BoxFuture, MemoryStorage, StorageError, StorageResult};
    use crate::testing::{ScriptedFetcher, block_on};
    use serde_json::json;
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingRenderer {
        frames: usize,
    }

    impl RenderTarget for CountingRenderer {
        fn render(&mut self, _scene: &Scene) {
            self.frames += 1;
        }
    }

    fn session() -> EditingSession<ScriptedFetcher, CountingRenderer> {
        let fetcher = ScriptedFetcher::new()
            .with("bg.png", 1000, 1000, 0)
            .with("photo.png", 40, 30, 2);
        EditingSession::with_renderer(fetcher, EditorConfig::default(), CountingRenderer::default())
    }

    fn text(content: &str) -> SceneObject {
        SceneObject::text(TextObject::new(content), Transform::at(100.0, 100.0))
    }

    fn texts(session: &EditingSession<ScriptedFetcher, CountingRenderer>) -> Vec<String> {
        session
            .scene()
            .objects_ordered()
            .filter_map(|object| object.as_text().map(|t| t.text.clone()))
            .collect()
    }

    fn background() -> SceneObject {
        SceneObject::image(
            ImageObject::new(
                ImageSource::Reference("bg.png".to_string()),
                ImageAsset::new(1000, 1000),
            ),
            Transform::at(400.0, 300.0),
        )
    }

    #[test]
    fn test_scene_event_undoable() {
        let id = ObjectId::new_v4();
        assert!(SceneEvent::ObjectAdded(id).is_undoable());
        assert!(SceneEvent::Reordered.is_undoable());
        assert!(!SceneEvent::BackgroundChanged.is_undoable());
        assert!(!SceneEvent::SelectionChanged.is_undoable());
        assert!(!SceneEvent::ViewportChanged.is_undoable());
    }

    #[test]
    fn test_undo_redo_edits() {
        let mut session = session();
        session.add(text("a"));
        let b = session.add(text("b"));
        assert_eq!(session.history().len(), 3);
        assert!(session.is_dirty());

        assert!(block_on(session.undo()));
        assert_eq!(texts(&session), ["a"]);
        assert!(!session.scene().contains(b));

        assert!(block_on(session.redo()));
        assert_eq!(texts(&session), ["a", "b"]);
        assert!(!block_on(session.redo()));

        assert!(block_on(session.undo()));
        assert!(block_on(session.undo()));
        assert!(session.scene().is_empty());
        assert!(!block_on(session.undo()));
    }

    #[test]
    fn test_edit_after_undo_discards_redo() {
        let mut session = session();
        session.add(text("a"));
        session.add(text("b"));
        block_on(session.undo());
        session.add(text("c"));

        assert!(!session.history().can_redo());
        assert_eq!(texts(&session), ["a", "c"]);
        block_on(session.undo());
        assert_eq!(texts(&session), ["a"]);
    }

    #[test]
    fn test_modify_and_reorder_are_recorded() {
        let mut session = session();
        let a = session.add(text("a"));
        session.add(text("b"));

        assert!(session.modify(a, |object| object.transform.left = 250.0));
        assert!(!session.modify(ObjectId::new_v4(), |object| object.opacity = 0.0));
        assert!(session.bring_to_front(a));
        assert!(!session.bring_to_front(a));
        assert_eq!(session.history().len(), 5);
        assert_eq!(texts(&session), ["b", "a"]);

        block_on(session.undo());
        assert_eq!(texts(&session), ["a", "b"]);
        let left = session.scene().objects_ordered().next().unwrap().transform.left;
        assert_eq!(left, 250.0);
    }

    #[test]
    fn test_background_changes_are_not_recorded() {
        let mut session = session();
        session.add(text("a"));
        let entries = session.history().len();

        session.set_background(background()).unwrap();
        assert_eq!(session.history().len(), entries);
        assert!(session.history().current().unwrap().document().background().is_none());

        block_on(session.undo());
        assert!(session.scene().background().is_some());
        assert!(session.scene().objects_ordered().next().is_none());

        assert!(session.clear_background().is_some());
        assert!(session.clear_background().is_none());
        assert_eq!(session.history().len(), entries);
    }

    #[test]
    fn test_selection_is_not_recorded() {
        let mut session = session();
        let a = session.add(text("a"));
        let entries = session.history().len();

        session.select(Some(a));
        assert_eq!(session.selection(), Some(a));
        session.notify(SceneEvent::ViewportChanged);
        session.select(Some(ObjectId::new_v4()));
        assert_eq!(session.selection(), None);
        assert_eq!(session.history().len(), entries);
    }

    #[test]
    fn test_non_image_background_is_refused() {
        let mut session = session();
        block_on(session.load(&json!({ "objects": [] }))).unwrap();
        let frames = session.renderer().frames;

        assert!(session.set_background(text("bg")).is_err());
        assert!(session.scene().background().is_none());
        assert!(session.scene().is_empty());
        assert!(!session.is_dirty());
        assert_eq!(session.renderer().frames, frames);

        // A refused background keeps the next save loadable.
        session.add(text("a"));
        let saved = session.document().to_value();
        let mut other = self::session();
        assert!(block_on(other.load(&saved)).unwrap().is_empty());
        assert_eq!(texts(&other), ["a"]);
        assert!(other.scene().background().is_none());
    }

    #[test]
    fn test_load_renders_once_and_resets_history() {
        let mut session = session();
        session.add(text("old"));
        let frames = session.renderer().frames;

        let doc = json!({ "objects": [
            { "kind": "image", "src": "photo.png", "zIndex": 1 },
            { "kind": "text", "text": "hi", "zIndex": 0 },
            { "kind": "image", "src": "bg.png", "isBackground": true },
        ]});
        let skipped = block_on(session.load(&doc)).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(session.renderer().frames, frames + 1);
        assert_eq!(session.history().len(), 1);
        assert!(!session.history().can_undo());
        assert!(!session.is_dirty());
        assert_eq!(session.scene().len(), 2);
        assert!(session.scene().background().is_some());
    }

    #[test]
    fn test_failed_load_keeps_scene() {
        let mut session = session();
        session.add(text("keep"));

        let result = block_on(session.load(&json!({ "objects": 42 })));
        assert!(matches!(
            result,
            Err(SessionError::Load(LoadError::MalformedDocument(_)))
        ));
        assert_eq!(texts(&session), ["keep"]);
    }

    #[test]
    fn test_undo_restores_images() {
        let mut session = session();
        let photo = SceneObject::image(
            ImageObject::new(
                ImageSource::Reference("photo.png".to_string()),
                ImageAsset::new(40, 30),
            ),
            Transform::at(50.0, 60.0).with_scale(2.0, 2.0),
        );
        let bounds = photo.resolved_bounds();
        let id = session.add(photo);
        session.remove(id);
        assert!(session.scene().is_empty());

        block_on(session.undo());
        let restored = session.scene().objects_ordered().next().unwrap();
        assert_eq!(restored.resolved_bounds(), bounds);
    }

    #[test]
    fn test_save_and_load_project() {
        let gateway = ProjectGateway::new(Arc::new(MemoryStorage::new()));
        let code = block_on(gateway.create_project()).unwrap();

        let mut session = session();
        block_on(session.load_project(&gateway, &code)).unwrap();
        assert!(session.scene().is_empty());

        session.add(text("saved"));
        session.set_background(background()).unwrap();
        block_on(session.save_project(&gateway, &code, None)).unwrap();
        assert!(!session.is_dirty());

        let mut other = self::session();
        let skipped = block_on(other.load_project(&gateway, &code)).unwrap();
        assert!(skipped.is_empty());
        assert_eq!(texts(&other), ["saved"]);
        assert!(other.scene().background().is_some());

        assert!(matches!(
            block_on(other.load_project(&gateway, "UNKNOWN0")),
            Err(SessionError::Persistence(StorageError::NotFound(_)))
        ));
    }

    struct ReadOnlyStorage;

    impl Storage for ReadOnlyStorage {
        fn save(&self, _code: &str, _record: &ProjectRecord) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Err(StorageError::Io("read-only".to_string())) })
        }

        fn load(&self, code: &str) -> BoxFuture<'_, StorageResult<ProjectRecord>> {
            let record = ProjectRecord::new(code);
            Box::pin(async move { Ok(record) })
        }

        fn delete(&self, _code: &str) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn exists(&self, _code: &str) -> BoxFuture<'_, StorageResult<bool>> {
            Box::pin(async { Ok(true) })
        }
    }

    #[test]
    fn test_failed_save_keeps_changes() {
        let gateway = ProjectGateway::new(Arc::new(ReadOnlyStorage));
        let mut session = session();
        session.add(text("unsaved"));

        let result = block_on(session.save_project(&gateway, "ANY00000", None));
        assert!(matches!(result, Err(SessionError::Persistence(StorageError::Io(_)))));
        assert!(session.is_dirty());
        assert_eq!(texts(&session), ["unsaved"]);
    }
}
