//! Canonical form of object records.
//!
//! Both directions go through here: [`canonicalize`] reads a raw record,
//! filling defaults and resolving legacy field names, and [`canonical_record`]
//! applies the same value rules to records built from live objects. A written
//! document therefore reads back to the records it was written from.

use crate::document::{
    CommonRecord, ImageRecord, ObjectRecord, PathRecord, RecordBody, VectorGeometry, VectorRecord,
};
use crate::error::AssetError;
use crate::geometry::{OriginX, OriginY, Transform};
use crate::objects::{
    DEFAULT_MITER_LIMIT, DEFAULT_STROKE_WIDTH, ImageFilter, TextObject, VectorStyle,
};
use crate::style::{DEFAULT_TEXT_FILL, LineCap, LineJoin, TextAlign, non_empty};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

pub(crate) const KIND_TEXT: &str = "text";
pub(crate) const KIND_IMAGE: &str = "image";
pub(crate) const KIND_VECTOR: &str = "vector";

/// Keys owned by [`CommonRecord`]; never kept in an unknown record's attributes.
const COMMON_KEYS: &[&str] = &[
    "kind",
    "type",
    "left",
    "top",
    "originX",
    "originY",
    "scaleX",
    "scaleY",
    "angle",
    "flipX",
    "flipY",
    "opacity",
    "visible",
    "zIndex",
    "isBackground",
];

/// Object kinds that can be reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KnownKind {
    Text,
    Image,
    Vector,
}

impl KnownKind {
    /// Map canonical and legacy kind names.
    fn classify(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "text" | "i-text" | "textbox" => Some(KnownKind::Text),
            "image" => Some(KnownKind::Image),
            "vector" | "path" | "group" => Some(KnownKind::Vector),
            _ => None,
        }
    }
}

/// Treat a value of the wrong type as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A record exactly as found in a document, every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawObject {
    #[serde(deserialize_with = "lenient")]
    kind: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient")]
    legacy_type: Option<String>,

    #[serde(deserialize_with = "lenient")]
    left: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    top: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    origin_x: Option<String>,
    #[serde(deserialize_with = "lenient")]
    origin_y: Option<String>,
    #[serde(deserialize_with = "lenient")]
    scale_x: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    scale_y: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    angle: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    flip_x: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    flip_y: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    opacity: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    visible: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    z_index: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    is_background: Option<bool>,

    #[serde(deserialize_with = "lenient")]
    text: Option<String>,
    #[serde(deserialize_with = "lenient")]
    font_family: Option<String>,
    #[serde(deserialize_with = "lenient")]
    font_size: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    font_weight: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    font_style: Option<String>,
    #[serde(deserialize_with = "lenient")]
    underline: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    overline: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    strikethrough: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    linethrough: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    text_align: Option<String>,

    #[serde(deserialize_with = "lenient")]
    fill_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    fill: Option<String>,
    #[serde(deserialize_with = "lenient")]
    stroke_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    stroke: Option<String>,
    #[serde(deserialize_with = "lenient")]
    stroke_width: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    stroke_dash_array: Option<Vec<f64>>,
    #[serde(deserialize_with = "lenient")]
    stroke_line_cap: Option<String>,
    #[serde(deserialize_with = "lenient")]
    stroke_line_join: Option<String>,
    #[serde(deserialize_with = "lenient")]
    stroke_miter_limit: Option<f64>,

    #[serde(deserialize_with = "lenient")]
    source_reference: Option<String>,
    #[serde(deserialize_with = "lenient")]
    src: Option<String>,
    #[serde(deserialize_with = "lenient")]
    original_width: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    original_height: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    width: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    height: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    filters: Option<Vec<Value>>,

    #[serde(deserialize_with = "lenient")]
    path_data: Option<String>,
    #[serde(deserialize_with = "lenient")]
    path: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    paths: Option<Vec<Value>>,
    #[serde(deserialize_with = "lenient")]
    objects: Option<Vec<Value>>,
}

/// A group child as found in a document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPath {
    #[serde(deserialize_with = "lenient")]
    path_data: Option<String>,
    #[serde(deserialize_with = "lenient")]
    path: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    fill_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    fill: Option<String>,
    #[serde(deserialize_with = "lenient")]
    stroke_color: Option<String>,
    #[serde(deserialize_with = "lenient")]
    stroke: Option<String>,
    #[serde(deserialize_with = "lenient")]
    stroke_width: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    stroke_dash_array: Option<Vec<f64>>,
}

impl RawObject {
    fn parse(value: &Value) -> Result<Self, AssetError> {
        if !value.is_object() {
            return Err(AssetError::InvalidRecord(
                "object record is not a map".to_string(),
            ));
        }
        RawObject::deserialize(value).map_err(|e| AssetError::InvalidRecord(e.to_string()))
    }

    fn kind_name(&self) -> Option<String> {
        self.kind
            .as_deref()
            .or(self.legacy_type.as_deref())
            .and_then(non_empty)
    }

    fn common(&self) -> CommonRecord {
        let transform = Transform {
            left: self.left.unwrap_or(0.0),
            top: self.top.unwrap_or(0.0),
            origin_x: self
                .origin_x
                .as_deref()
                .and_then(OriginX::parse)
                .unwrap_or_default(),
            origin_y: self
                .origin_y
                .as_deref()
                .and_then(OriginY::parse)
                .unwrap_or_default(),
            scale_x: self.scale_x.unwrap_or(1.0),
            scale_y: self.scale_y.unwrap_or(1.0),
            angle: self.angle.unwrap_or(0.0),
            flip_x: self.flip_x.unwrap_or(false),
            flip_y: self.flip_y.unwrap_or(false),
        };
        canonical_common(CommonRecord {
            transform,
            opacity: self.opacity.unwrap_or(1.0),
            visible: self.visible.unwrap_or(true),
            z_index: self.z_index.unwrap_or(0.0),
            is_background: self.is_background.unwrap_or(false),
        })
    }

    fn fill_paint(&self) -> Option<String> {
        self.fill_color
            .as_deref()
            .or(self.fill.as_deref())
            .and_then(non_empty)
    }

    fn stroke_paint(&self) -> Option<String> {
        self.stroke_color
            .as_deref()
            .or(self.stroke.as_deref())
            .and_then(non_empty)
    }

    fn body(&self, kind: KnownKind) -> Result<RecordBody, AssetError> {
        let body = match kind {
            KnownKind::Text => RecordBody::Text(self.text_body()),
            KnownKind::Image => RecordBody::Image(self.image_body()?),
            KnownKind::Vector => RecordBody::Vector(self.vector_body()?),
        };
        Ok(canonical_body(body))
    }

    fn text_body(&self) -> TextObject {
        let defaults = TextObject::default();
        TextObject {
            text: self.text.clone().unwrap_or_default(),
            font_family: self
                .font_family
                .as_deref()
                .and_then(non_empty)
                .unwrap_or(defaults.font_family),
            font_size: self.font_size.unwrap_or(defaults.font_size),
            font_weight: self
                .font_weight
                .as_ref()
                .and_then(weight_text)
                .unwrap_or(defaults.font_weight),
            font_style: self
                .font_style
                .as_deref()
                .and_then(non_empty)
                .unwrap_or(defaults.font_style),
            underline: self.underline.unwrap_or(false),
            overline: self.overline.unwrap_or(false),
            strikethrough: self.strikethrough.or(self.linethrough).unwrap_or(false),
            text_align: self
                .text_align
                .as_deref()
                .and_then(TextAlign::parse)
                .unwrap_or_default(),
            fill_color: self.fill_paint().unwrap_or(defaults.fill_color),
            stroke_color: self.stroke_paint(),
            stroke_width: self.stroke_width.unwrap_or(defaults.stroke_width),
        }
    }

    fn image_body(&self) -> Result<ImageRecord, AssetError> {
        let source_reference = self
            .source_reference
            .as_deref()
            .or(self.src.as_deref())
            .and_then(non_empty)
            .ok_or(AssetError::MissingSource)?;
        let original_width = pixels(self.original_width.or(self.width));
        let original_height = pixels(self.original_height.or(self.height));
        Ok(ImageRecord {
            source_reference,
            original_width,
            original_height,
            width: pixels(self.width),
            height: pixels(self.height),
            filters: self
                .filters
                .iter()
                .flatten()
                .filter_map(filter_from_value)
                .collect(),
        })
    }

    fn vector_body(&self) -> Result<VectorRecord, AssetError> {
        let children = self.paths.as_ref().or(self.objects.as_ref());
        let geometry = match (children, self.single_path()) {
            (Some(children), _) => VectorGeometry::Group(
                children
                    .iter()
                    .filter_map(|child| RawPath::deserialize(child).ok())
                    .map(RawPath::into_record)
                    .collect(),
            ),
            (None, Some(data)) => VectorGeometry::Path(data),
            (None, None) => {
                return Err(AssetError::InvalidPath(
                    "vector record has no path data".to_string(),
                ));
            }
        };
        Ok(VectorRecord {
            geometry,
            style: VectorStyle {
                fill: self.fill_paint(),
                stroke: self.stroke_paint(),
                stroke_width: self.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
                dash_array: self.stroke_dash_array.clone().unwrap_or_default(),
                line_cap: self
                    .stroke_line_cap
                    .as_deref()
                    .and_then(LineCap::parse)
                    .unwrap_or_default(),
                line_join: self
                    .stroke_line_join
                    .as_deref()
                    .and_then(LineJoin::parse)
                    .unwrap_or_default(),
                miter_limit: self.stroke_miter_limit.unwrap_or(DEFAULT_MITER_LIMIT),
            },
        })
    }

    fn single_path(&self) -> Option<String> {
        self.path_data
            .clone()
            .or_else(|| self.path.as_ref().and_then(path_text))
    }
}

impl RawPath {
    fn into_record(self) -> PathRecord {
        let path_data = self
            .path_data
            .or_else(|| self.path.as_ref().and_then(path_text))
            .unwrap_or_default();
        PathRecord {
            path_data,
            fill: self.fill_color.or(self.fill).as_deref().and_then(non_empty),
            stroke: self
                .stroke_color
                .or(self.stroke)
                .as_deref()
                .and_then(non_empty),
            stroke_width: self.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH),
            dash_array: self.stroke_dash_array.unwrap_or_default(),
        }
    }
}

/// Path data is either an SVG string or, in older documents, a list of
/// command arrays such as `[["M", 0, 0], ["L", 10, 10]]`.
fn path_text(value: &Value) -> Option<String> {
    match value {
        Value::String(data) => Some(data.clone()),
        Value::Array(commands) => {
            let mut parts = Vec::new();
            for command in commands {
                let Value::Array(tokens) = command else {
                    return None;
                };
                for token in tokens {
                    match token {
                        Value::String(s) => parts.push(s.clone()),
                        Value::Number(n) => parts.push(n.to_string()),
                        _ => return None,
                    }
                }
            }
            Some(parts.join(" "))
        }
        _ => None,
    }
}

/// Font weights may be written as names or numbers.
fn weight_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn pixels(value: Option<f64>) -> u32 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

fn filter_from_value(value: &Value) -> Option<ImageFilter> {
    let map = value.as_object()?;
    let name = map
        .get("type")
        .or_else(|| map.get("name"))
        .and_then(Value::as_str)
        .and_then(non_empty)?;
    let params = map
        .iter()
        .filter(|(key, _)| key.as_str() != "type" && key.as_str() != "name")
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Some(ImageFilter { name, params })
}

fn finite_or(value: f64, default: f64) -> f64 {
    if value.is_finite() { value } else { default }
}

/// Zero or non-finite scale collapses an object; treat it as unscaled.
fn usable_scale(value: f64) -> f64 {
    if value.is_finite() && value != 0.0 {
        value
    } else {
        1.0
    }
}

fn positive_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        default
    }
}

fn non_negative_or(value: f64, default: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        default
    }
}

fn canonical_dashes(dashes: Vec<f64>) -> Vec<f64> {
    let dashes: Vec<f64> = dashes
        .into_iter()
        .filter(|d| d.is_finite() && *d >= 0.0)
        .collect();
    if dashes.iter().all(|d| *d == 0.0) {
        Vec::new()
    } else {
        dashes
    }
}

fn canonical_paint(paint: Option<String>) -> Option<String> {
    paint.as_deref().and_then(non_empty)
}

pub(crate) fn canonical_common(common: CommonRecord) -> CommonRecord {
    let t = common.transform;
    CommonRecord {
        transform: Transform {
            left: finite_or(t.left, 0.0),
            top: finite_or(t.top, 0.0),
            scale_x: usable_scale(t.scale_x),
            scale_y: usable_scale(t.scale_y),
            angle: finite_or(t.angle, 0.0),
            ..t
        },
        // Adding zero folds -0.0 into 0.0 so it sorts with 0.
        z_index: finite_or(common.z_index, 0.0) + 0.0,
        opacity: if common.opacity.is_finite() {
            common.opacity.clamp(0.0, 1.0)
        } else {
            1.0
        },
        ..common
    }
}

fn canonical_body(body: RecordBody) -> RecordBody {
    match body {
        RecordBody::Text(text) => RecordBody::Text(TextObject {
            font_size: positive_or(text.font_size, TextObject::DEFAULT_FONT_SIZE),
            fill_color: non_empty(&text.fill_color).unwrap_or_else(|| DEFAULT_TEXT_FILL.to_string()),
            stroke_color: canonical_paint(text.stroke_color),
            stroke_width: non_negative_or(text.stroke_width, TextObject::DEFAULT_STROKE_WIDTH),
            ..text
        }),
        RecordBody::Image(image) => RecordBody::Image(ImageRecord {
            original_width: if image.original_width > 0 {
                image.original_width
            } else {
                image.width
            },
            original_height: if image.original_height > 0 {
                image.original_height
            } else {
                image.height
            },
            width: if image.width > 0 {
                image.width
            } else {
                image.original_width
            },
            height: if image.height > 0 {
                image.height
            } else {
                image.original_height
            },
            ..image
        }),
        RecordBody::Vector(vector) => {
            let geometry = match vector.geometry {
                VectorGeometry::Group(children) => VectorGeometry::Group(
                    children
                        .into_iter()
                        .map(|child| PathRecord {
                            fill: canonical_paint(child.fill),
                            stroke: canonical_paint(child.stroke),
                            stroke_width: non_negative_or(child.stroke_width, DEFAULT_STROKE_WIDTH),
                            dash_array: canonical_dashes(child.dash_array),
                            ..child
                        })
                        .collect(),
                ),
                path => path,
            };
            let style = vector.style;
            RecordBody::Vector(VectorRecord {
                geometry,
                style: VectorStyle {
                    fill: canonical_paint(style.fill),
                    stroke: canonical_paint(style.stroke),
                    stroke_width: non_negative_or(style.stroke_width, DEFAULT_STROKE_WIDTH),
                    dash_array: canonical_dashes(style.dash_array),
                    miter_limit: positive_or(style.miter_limit, DEFAULT_MITER_LIMIT),
                    ..style
                },
            })
        }
        unknown @ RecordBody::Unknown { .. } => unknown,
    }
}

/// Apply the canonical value rules to a record built from a live object.
pub(crate) fn canonical_record(record: ObjectRecord) -> ObjectRecord {
    ObjectRecord {
        common: canonical_common(record.common),
        body: canonical_body(record.body),
    }
}

/// Read one raw document record into canonical form.
pub(crate) fn canonicalize(value: &Value) -> Result<ObjectRecord, AssetError> {
    let raw = RawObject::parse(value)?;
    let name = raw
        .kind_name()
        .ok_or_else(|| AssetError::InvalidRecord("record has no kind".to_string()))?;
    let common = raw.common();
    let body = match KnownKind::classify(&name) {
        Some(kind) => raw.body(kind)?,
        None => RecordBody::Unknown {
            kind: name,
            attributes: extra_attributes(value),
        },
    };
    Ok(ObjectRecord { common, body })
}

/// Guess what an unknown record really is from the attributes it carries.
pub(crate) fn guess_kind(attributes: &Map<String, Value>) -> Option<KnownKind> {
    let has = |key: &str| attributes.get(key).is_some_and(|v| !v.is_null());
    if has("pathData") || has("path") || has("paths") || has("objects") {
        Some(KnownKind::Vector)
    } else if has("sourceReference") || has("src") {
        Some(KnownKind::Image)
    } else if attributes.get("text").is_some_and(Value::is_string) {
        Some(KnownKind::Text)
    } else {
        None
    }
}

/// Read an unknown record's attributes as a known kind.
pub(crate) fn reinterpret(
    attributes: &Map<String, Value>,
    kind: KnownKind,
) -> Result<RecordBody, AssetError> {
    let value = Value::Object(attributes.clone());
    RawObject::parse(&value)?.body(kind)
}

/// Attributes of a record that are not common placement fields.
fn extra_attributes(value: &Value) -> Map<String, Value> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter(|(key, _)| !COMMON_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect()
        })
        .unwrap_or_default()
}

/// Best-effort kind name of a raw record, for reporting.
pub(crate) fn kind_hint(value: &Value) -> String {
    value
        .get("kind")
        .or_else(|| value.get("type"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
