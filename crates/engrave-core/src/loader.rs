//! Rebuilding a live scene from a document.
//!
//! Loading validates the document, sets the background aside, orders the
//! remaining records by `zIndex` and reconstructs them one at a time. Each
//! reconstruction is awaited before the next starts, so the final stacking
//! never depends on which asset happens to arrive first. Records that cannot
//! be rebuilt are skipped and reported; only a structurally broken document
//! fails the load.

use crate::canonical::{guess_kind, reinterpret};
use crate::document::{CommonRecord, ImageRecord, ObjectRecord, RecordBody, SceneDocument, VectorGeometry, VectorRecord};
use crate::error::{AssetError, LoadError, SkippedObject};
use crate::geometry::{OriginX, OriginY, Transform};
use crate::objects::{
    ImageAsset, ImageObject, ImageSource, ObjectKind, SceneObject, VectorObject, VectorPath,
    decode_data_uri, parse_path_data,
};
use crate::scene::Scene;
use crate::storage::BoxFuture;
use kurbo::Size;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolves image source references into decoded assets.
///
/// Implementations own their time bound: a fetch that cannot complete must
/// eventually fail with [`AssetError::Unreachable`] rather than hang.
pub trait AssetFetcher: Send + Sync {
    fn fetch(&self, source: &str) -> BoxFuture<'_, Result<ImageAsset, AssetError>>;
}

/// Fetches `data:` URIs, `file://` URIs and filesystem paths.
///
/// Relative paths resolve against the base directory. Network schemes are
/// reported as [`AssetError::Unsupported`].
#[derive(Debug, Clone)]
pub struct LocalAssetFetcher {
    base_dir: PathBuf,
}

impl LocalAssetFetcher {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn resolve(&self, source: &str) -> Result<PathBuf, AssetError> {
        if let Some(path) = source.strip_prefix("file://") {
            return Ok(PathBuf::from(path));
        }
        if let Some((scheme, _)) = source.split_once("://") {
            return Err(AssetError::Unsupported(format!("{} scheme", scheme)));
        }
        if source.starts_with("blob:") {
            return Err(AssetError::Unsupported("blob URL".to_string()));
        }
        let path = Path::new(source);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base_dir.join(path))
        }
    }

    fn read(&self, source: &str) -> Result<ImageAsset, AssetError> {
        if source.starts_with("data:") {
            return ImageAsset::decode(&decode_data_uri(source)?);
        }
        let path = self.resolve(source)?;
        let bytes = fs::read(&path)
            .map_err(|e| AssetError::Unreachable(format!("{}: {}", path.display(), e)))?;
        ImageAsset::decode(&bytes)
    }
}

impl AssetFetcher for LocalAssetFetcher {
    fn fetch(&self, source: &str) -> BoxFuture<'_, Result<ImageAsset, AssetError>> {
        let result = self.read(source);
        Box::pin(async move { result })
    }
}

/// Outcome of a load: the rebuilt scene and what had to be left out.
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub scene: Scene,
    /// Objects that could not be reconstructed, in document order.
    pub skipped: Vec<SkippedObject>,
}

impl LoadReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Reconstructs live scenes and objects from documents.
pub struct SceneLoader<F: AssetFetcher> {
    fetcher: F,
}

impl<F: AssetFetcher> SceneLoader<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Validate and load a raw document onto a canvas of `canvas` size.
    ///
    /// Fails with [`LoadError::MalformedDocument`] before reconstructing
    /// anything if the document's structure is unusable.
    pub async fn load(&self, raw: &Value, canvas: Size) -> Result<LoadReport, LoadError> {
        let decoded = SceneDocument::decode(raw)?;
        let mut report = self.load_document(&decoded.document, canvas).await;
        for skipped in &mut report.skipped {
            if let Some(&position) = decoded.positions.get(skipped.index) {
                skipped.index = position;
            }
        }
        report.skipped.extend(decoded.rejected);
        report.skipped.sort_by_key(|skipped| skipped.index);
        Ok(report)
    }

    /// Load an already decoded document.
    pub async fn load_document(&self, document: &SceneDocument, canvas: Size) -> LoadReport {
        let mut scene = Scene::new(canvas.width, canvas.height);
        scene.background_color = document.background_color.clone();
        let mut skipped = Vec::new();

        let (background, records) = partition(document);

        if let Some((index, record, image)) = background {
            let restored = self
                .restore_background(&record.common, image, canvas)
                .await
                .and_then(|object| scene.set_background(object));
            if let Err(reason) = restored {
                log::warn!("Skipping background image {}: {}", index, reason);
                skipped.push(SkippedObject {
                    index,
                    kind: record.kind().to_string(),
                    reason,
                });
            }
        }

        let (objects, mut failed) = self.reconstruct_all(records).await;
        scene.replace_objects(objects);
        skipped.append(&mut failed);
        skipped.sort_by_key(|skipped| skipped.index);

        log::info!(
            "Loaded scene: {} objects{}, {} skipped",
            scene.len(),
            if scene.background().is_some() {
                " plus background"
            } else {
                ""
            },
            skipped.len()
        );
        LoadReport { scene, skipped }
    }

    /// Rebuild every record of a background-free document, in stacking
    /// order. This is how history snapshots are restored.
    pub async fn restore_objects(
        &self,
        document: &SceneDocument,
    ) -> (Vec<SceneObject>, Vec<SkippedObject>) {
        let records: Vec<(usize, &ObjectRecord)> = document
            .objects
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.common.is_background)
            .collect();
        self.reconstruct_all(sorted(records)).await
    }

    /// Reconstruct records strictly one after another.
    async fn reconstruct_all(
        &self,
        records: Vec<(usize, &ObjectRecord)>,
    ) -> (Vec<SceneObject>, Vec<SkippedObject>) {
        let mut objects = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();
        for (index, record) in records {
            match self.reconstruct(record).await {
                Ok(object) => objects.push(object),
                Err(reason) => {
                    log::warn!("Skipping {} object {}: {}", record.kind(), index, reason);
                    skipped.push(SkippedObject {
                        index,
                        kind: record.kind().to_string(),
                        reason,
                    });
                }
            }
        }
        (objects, skipped)
    }

    /// Rebuild one ordinary (non-background) object.
    pub async fn reconstruct(&self, record: &ObjectRecord) -> Result<SceneObject, AssetError> {
        let reinterpreted;
        let body = match &record.body {
            RecordBody::Unknown { kind, attributes } => {
                let guess =
                    guess_kind(attributes).ok_or_else(|| AssetError::UnknownKind(kind.clone()))?;
                log::debug!("Reading unknown kind {:?} as {:?}", kind, guess);
                reinterpreted = reinterpret(attributes, guess)?;
                &reinterpreted
            }
            body => body,
        };

        match body {
            RecordBody::Text(text) => Ok(place(ObjectKind::Text(text.clone()), &record.common)),
            RecordBody::Image(image) => self.restore_image(&record.common, image).await,
            RecordBody::Vector(vector) => Ok(place(
                ObjectKind::Vector(rebuild_vector(vector)?),
                &record.common,
            )),
            RecordBody::Unknown { kind, .. } => Err(AssetError::UnknownKind(kind.clone())),
        }
    }

    async fn fetch(&self, image: &ImageRecord) -> Result<ImageAsset, AssetError> {
        let asset = self.fetcher.fetch(&image.source_reference).await?;
        if asset.width == 0 || asset.height == 0 {
            return Err(AssetError::Decode(format!(
                "{} has zero size",
                image.source_reference
            )));
        }
        Ok(asset)
    }

    /// Restore an image at its stored geometry. The stored scale is
    /// corrected by the ratio of the saved natural width to the fetched one,
    /// so the on-canvas size holds even if the asset changed resolution.
    async fn restore_image(
        &self,
        common: &CommonRecord,
        image: &ImageRecord,
    ) -> Result<SceneObject, AssetError> {
        let asset = self.fetch(image).await?;
        let mut transform = common.transform;
        if image.width > 0 {
            transform.scale_x *= image.width as f64 / asset.width as f64;
        }
        if image.height > 0 {
            transform.scale_y *= image.height as f64 / asset.height as f64;
        }
        Ok(place(
            ObjectKind::Image(image_object(image, asset)),
            &with_transform(common, transform),
        ))
    }

    /// Restore the background: scaled to cover the canvas, centered and
    /// locked.
    async fn restore_background(
        &self,
        common: &CommonRecord,
        image: &ImageRecord,
        canvas: Size,
    ) -> Result<SceneObject, AssetError> {
        let image = image_object(image, self.fetch(image).await?);
        let scale = image.cover_scale(canvas);
        let transform = Transform {
            left: canvas.width / 2.0,
            top: canvas.height / 2.0,
            origin_x: OriginX::Center,
            origin_y: OriginY::Center,
            scale_x: scale,
            scale_y: scale,
            angle: 0.0,
            ..common.transform
        };
        let mut object = place(ObjectKind::Image(image), &with_transform(common, transform));
        object.interactive = false;
        Ok(object)
    }
}

/// Common attributes with a replacement transform.
fn with_transform(common: &CommonRecord, transform: Transform) -> CommonRecord {
    CommonRecord {
        transform,
        ..common.clone()
    }
}

fn image_object(image: &ImageRecord, asset: ImageAsset) -> ImageObject {
    let mut object = ImageObject::new(ImageSource::parse(&image.source_reference), asset);
    if image.original_width > 0 && image.original_height > 0 {
        object.original_width = image.original_width;
        object.original_height = image.original_height;
    }
    object.filters = image.filters.clone();
    object
}

fn place(kind: ObjectKind, common: &CommonRecord) -> SceneObject {
    let mut object = SceneObject::new(kind, common.transform);
    object.opacity = common.opacity;
    object.visible = common.visible;
    object
}

/// Rebuild a vector. Group children whose path data cannot be parsed are
/// dropped; a group left with none is an error.
fn rebuild_vector(record: &VectorRecord) -> Result<VectorObject, AssetError> {
    let object = match &record.geometry {
        VectorGeometry::Path(data) => VectorObject::path(parse_path_data(data)?),
        VectorGeometry::Group(children) => {
            let paths = children
                .iter()
                .filter_map(|child| match parse_path_data(&child.path_data) {
                    Ok(data) => Some(VectorPath {
                        data,
                        fill: child.fill.clone(),
                        stroke: child.stroke.clone(),
                        stroke_width: child.stroke_width,
                        dash_array: child.dash_array.clone(),
                    }),
                    Err(e) => {
                        log::warn!("Dropping group child: {}", e);
                        None
                    }
                })
                .collect();
            VectorObject::group(paths)?
        }
    };
    Ok(object.with_style(record.style.clone()))
}

type Background<'a> = (usize, &'a ObjectRecord, &'a ImageRecord);

/// Split off the background record. The first image flagged as background
/// wins; any other flagged record is treated as an ordinary object.
fn partition(document: &SceneDocument) -> (Option<Background<'_>>, Vec<(usize, &ObjectRecord)>) {
    let mut background: Option<Background<'_>> = None;
    let mut records = Vec::with_capacity(document.objects.len());
    for (index, record) in document.objects.iter().enumerate() {
        if record.common.is_background {
            if let (None, RecordBody::Image(image)) = (&background, &record.body) {
                background = Some((index, record, image));
                continue;
            }
            log::warn!(
                "Object {} ({}) is flagged as background but will load as a regular object",
                index,
                record.kind()
            );
        }
        records.push((index, record));
    }
    (background, sorted(records))
}

/// Stable sort by `zIndex`; ties keep document order.
fn sorted(mut records: Vec<(usize, &ObjectRecord)>) -> Vec<(usize, &ObjectRecord)> {
    records.sort_by(|(_, a), (_, b)| a.common.z_index.total_cmp(&b.common.z_index));
    records
}
