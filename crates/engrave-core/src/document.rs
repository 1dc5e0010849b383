//! The persisted form of a scene.
//!
//! A [`SceneDocument`] is what gets stored and exchanged: a schema-versioned
//! JSON record holding canvas metadata and one [`ObjectRecord`] per object.
//! Readers are lenient (unknown fields are ignored, absent or mistyped known
//! fields take their defaults) and writers always emit every field.

use crate::canonical::{self, canonicalize};
use crate::error::{LoadError, SkippedObject};
use crate::geometry::Transform;
use crate::objects::{ImageFilter, TextObject, VectorStyle};
use crate::style::DEFAULT_BACKGROUND_COLOR;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

/// Schema version written by this crate.
pub const SCHEMA_VERSION: u64 = 1;

/// Canvas width used when a document does not carry a usable one.
pub const DEFAULT_CANVAS_WIDTH: f64 = 800.0;

/// Canvas height used when a document does not carry a usable one.
pub const DEFAULT_CANVAS_HEIGHT: f64 = 600.0;

/// Format tag of a document. Older editors wrote a version string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum DocumentVersion {
    Number(u64),
    Text(String),
}

impl Default for DocumentVersion {
    fn default() -> Self {
        DocumentVersion::Number(SCHEMA_VERSION)
    }
}

impl DocumentVersion {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Number(n)) => match n.as_u64() {
                Some(n) => DocumentVersion::Number(n),
                None => DocumentVersion::Text(n.to_string()),
            },
            Some(Value::String(s)) => DocumentVersion::Text(s.clone()),
            _ => DocumentVersion::default(),
        }
    }

    /// Whether the document was written by a newer schema than this crate knows.
    pub fn is_newer(&self) -> bool {
        matches!(self, DocumentVersion::Number(n) if *n > SCHEMA_VERSION)
    }
}

/// Attributes every object record carries.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonRecord {
    pub transform: Transform,
    pub opacity: f64,
    pub visible: bool,
    /// Stacking order among non-background objects; lower paints first.
    /// Older documents carry fractional or negative values.
    pub z_index: f64,
    pub is_background: bool,
}

impl Default for CommonRecord {
    fn default() -> Self {
        Self {
            transform: Transform::default(),
            opacity: 1.0,
            visible: true,
            z_index: 0.0,
            is_background: false,
        }
    }
}

/// Persisted attributes of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    /// Stable URL, path or `data:` URI. Never empty in a canonical record.
    pub source_reference: String,
    /// Pixel size at upload time.
    pub original_width: u32,
    pub original_height: u32,
    /// Natural pixel size of the asset when the document was written.
    pub width: u32,
    pub height: u32,
    pub filters: Vec<ImageFilter>,
}

/// One child path of a vector group.
#[derive(Debug, Clone, PartialEq)]
pub struct PathRecord {
    pub path_data: String,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: f64,
    pub dash_array: Vec<f64>,
}

/// Geometry of a persisted vector, still as SVG path data.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorGeometry {
    Path(String),
    Group(Vec<PathRecord>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub geometry: VectorGeometry,
    pub style: VectorStyle,
}

/// Kind-specific part of an object record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    Text(TextObject),
    Image(ImageRecord),
    Vector(VectorRecord),
    /// A kind this crate does not know. Its attributes are kept as written.
    Unknown {
        kind: String,
        attributes: Map<String, Value>,
    },
}

impl RecordBody {
    pub fn kind(&self) -> &str {
        match self {
            RecordBody::Text(_) => canonical::KIND_TEXT,
            RecordBody::Image(_) => canonical::KIND_IMAGE,
            RecordBody::Vector(_) => canonical::KIND_VECTOR,
            RecordBody::Unknown { kind, .. } => kind,
        }
    }
}

/// One persisted scene object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub common: CommonRecord,
    pub body: RecordBody,
}

impl ObjectRecord {
    pub fn kind(&self) -> &str {
        self.body.kind()
    }

    pub fn is_image(&self) -> bool {
        matches!(self.body, RecordBody::Image(_))
    }

    /// Wire form of this record, every field present.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("kind".to_string(), json!(self.kind()));

        if let RecordBody::Unknown { attributes, .. } = &self.body {
            for (key, value) in attributes {
                map.insert(key.clone(), value.clone());
            }
        }

        let common = &self.common;
        let t = &common.transform;
        map.insert("left".to_string(), json!(t.left));
        map.insert("top".to_string(), json!(t.top));
        map.insert("originX".to_string(), json!(t.origin_x.as_str()));
        map.insert("originY".to_string(), json!(t.origin_y.as_str()));
        map.insert("scaleX".to_string(), json!(t.scale_x));
        map.insert("scaleY".to_string(), json!(t.scale_y));
        map.insert("angle".to_string(), json!(t.angle));
        map.insert("flipX".to_string(), json!(t.flip_x));
        map.insert("flipY".to_string(), json!(t.flip_y));
        map.insert("opacity".to_string(), json!(common.opacity));
        map.insert("visible".to_string(), json!(common.visible));
        map.insert("zIndex".to_string(), z_index_value(common.z_index));
        map.insert("isBackground".to_string(), json!(common.is_background));

        match &self.body {
            RecordBody::Text(text) => {
                map.insert("text".to_string(), json!(text.text));
                map.insert("fontFamily".to_string(), json!(text.font_family));
                map.insert("fontSize".to_string(), json!(text.font_size));
                map.insert("fontWeight".to_string(), json!(text.font_weight));
                map.insert("fontStyle".to_string(), json!(text.font_style));
                map.insert("underline".to_string(), json!(text.underline));
                map.insert("overline".to_string(), json!(text.overline));
                map.insert("strikethrough".to_string(), json!(text.strikethrough));
                map.insert("textAlign".to_string(), json!(text.text_align.as_str()));
                map.insert("fillColor".to_string(), json!(text.fill_color));
                map.insert("strokeColor".to_string(), paint(&text.stroke_color));
                map.insert("strokeWidth".to_string(), json!(text.stroke_width));
            }
            RecordBody::Image(image) => {
                map.insert("sourceReference".to_string(), json!(image.source_reference));
                map.insert("originalWidth".to_string(), json!(image.original_width));
                map.insert("originalHeight".to_string(), json!(image.original_height));
                map.insert("width".to_string(), json!(image.width));
                map.insert("height".to_string(), json!(image.height));
                let filters: Vec<Value> = image.filters.iter().map(filter_value).collect();
                map.insert("filters".to_string(), Value::Array(filters));
            }
            RecordBody::Vector(vector) => {
                match &vector.geometry {
                    VectorGeometry::Path(data) => {
                        map.insert("pathData".to_string(), json!(data));
                    }
                    VectorGeometry::Group(children) => {
                        let paths: Vec<Value> = children
                            .iter()
                            .map(|child| {
                                json!({
                                    "pathData": child.path_data,
                                    "fillColor": paint(&child.fill),
                                    "strokeColor": paint(&child.stroke),
                                    "strokeWidth": child.stroke_width,
                                    "strokeDashArray": child.dash_array,
                                })
                            })
                            .collect();
                        map.insert("paths".to_string(), Value::Array(paths));
                    }
                }
                let style = &vector.style;
                map.insert("fillColor".to_string(), paint(&style.fill));
                map.insert("strokeColor".to_string(), paint(&style.stroke));
                map.insert("strokeWidth".to_string(), json!(style.stroke_width));
                map.insert("strokeDashArray".to_string(), json!(style.dash_array));
                map.insert("strokeLineCap".to_string(), json!(style.line_cap.as_str()));
                map.insert("strokeLineJoin".to_string(), json!(style.line_join.as_str()));
                map.insert("strokeMiterLimit".to_string(), json!(style.miter_limit));
            }
            RecordBody::Unknown { .. } => {}
        }

        Value::Object(map)
    }
}

impl Serialize for ObjectRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// Optional paint is written as an empty string when absent.
fn paint(color: &Option<String>) -> Value {
    json!(color.as_deref().unwrap_or(""))
}

fn filter_value(filter: &ImageFilter) -> Value {
    let mut map = filter.params.clone();
    map.insert("type".to_string(), json!(filter.name));
    Value::Object(map)
}

/// A complete persisted scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub version: DocumentVersion,
    pub width: f64,
    pub height: f64,
    pub background_color: String,
    /// Records in paint order; `zIndex` equals position for written documents.
    pub objects: Vec<ObjectRecord>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self::empty(DEFAULT_CANVAS_WIDTH, DEFAULT_CANVAS_HEIGHT)
    }
}

/// Result of decoding a raw document.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub document: SceneDocument,
    /// Index in the raw `objects` sequence of each record in
    /// `document.objects`.
    pub positions: Vec<usize>,
    /// Records dropped because they could not be read at all.
    pub rejected: Vec<SkippedObject>,
}

impl SceneDocument {
    /// An empty document, as created for a new project.
    pub fn empty(width: f64, height: f64) -> Self {
        Self {
            version: DocumentVersion::default(),
            width,
            height,
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            objects: Vec::new(),
        }
    }

    /// Validate and canonicalize a raw document.
    ///
    /// Fails only when the document's structure is unusable: it is not an
    /// object, or `objects` is missing or not a sequence. Individual records
    /// that cannot be read are reported in [`Decoded::rejected`].
    pub fn decode(value: &Value) -> Result<Decoded, LoadError> {
        let root = value
            .as_object()
            .ok_or_else(|| LoadError::MalformedDocument("document is not an object".to_string()))?;

        let objects = match root.get("objects") {
            Some(Value::Array(objects)) => objects,
            Some(other) => {
                return Err(LoadError::MalformedDocument(format!(
                    "`objects` must be a sequence, found {}",
                    json_type(other)
                )));
            }
            None => {
                return Err(LoadError::MalformedDocument(
                    "document has no `objects` field".to_string(),
                ));
            }
        };

        let version = DocumentVersion::from_value(root.get("version"));
        if version.is_newer() {
            log::warn!(
                "Document schema {:?} is newer than {}; unknown fields will be ignored",
                version,
                SCHEMA_VERSION
            );
        }

        let background_color = root
            .get("backgroundColor")
            .or_else(|| root.get("background"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_BACKGROUND_COLOR)
            .to_string();

        let mut records = Vec::with_capacity(objects.len());
        let mut positions = Vec::with_capacity(objects.len());
        let mut rejected = Vec::new();
        for (index, value) in objects.iter().enumerate() {
            match canonicalize(value) {
                Ok(record) => {
                    records.push(record);
                    positions.push(index);
                }
                Err(reason) => {
                    log::warn!("Dropping object {} from document: {}", index, reason);
                    rejected.push(SkippedObject {
                        index,
                        kind: canonical::kind_hint(value),
                        reason,
                    });
                }
            }
        }

        Ok(Decoded {
            document: SceneDocument {
                version,
                width: dimension(root.get("width"), DEFAULT_CANVAS_WIDTH),
                height: dimension(root.get("height"), DEFAULT_CANVAS_HEIGHT),
                background_color,
                objects: records,
            },
            positions,
            rejected,
        })
    }

    /// Parse and decode a JSON string.
    pub fn from_json(json: &str) -> Result<Decoded, LoadError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| LoadError::MalformedDocument(format!("invalid JSON: {}", e)))?;
        Self::decode(&value)
    }

    pub fn to_value(&self) -> Value {
        json!({
            "version": self.version,
            "width": self.width,
            "height": self.height,
            "backgroundColor": self.background_color,
            "objects": self.objects.iter().map(ObjectRecord::to_value).collect::<Vec<_>>(),
        })
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> String {
        format!("{:#}", self.to_value())
    }

    /// The record flagged as background, if any.
    pub fn background(&self) -> Option<&ObjectRecord> {
        self.objects.iter().find(|r| r.common.is_background)
    }

    /// This document without any background record.
    pub fn without_background(&self) -> Self {
        Self {
            objects: self
                .objects
                .iter()
                .filter(|r| !r.common.is_background)
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// Whole stacking values are written as integers.
fn z_index_value(z: f64) -> Value {
    if z.fract() == 0.0 && z.abs() < i64::MAX as f64 {
        json!(z as i64)
    } else {
        json!(z)
    }
}

fn dimension(value: Option<&Value>, default: f64) -> f64 {
    value
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(default)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "an object",
    }
}
