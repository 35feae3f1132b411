//! Skeleton JSON dialects of older Spine editors.
//!
//! The runtime reads the 4.x JSON layout. Exports from 3.6/3.7 and 3.8 differ
//! in a handful of places, all rewritten here before the document is parsed:
//!
//! - `skins` is an object map up to 3.7 and an array of named skins afterwards
//! - rotate keys store `angle` instead of `value`
//! - Bezier curves are normalized `[cx1, cy1, cx2, cy2]` arrays (3.6) or a
//!   scalar `curve` plus `c2`, `c3`, `c4` (3.8); 4.x stores one absolute
//!   `[time, value, time, value]` quadruple per channel
//! - `color`/`twoColor` slot timelines became `rgba`/`rgba2`
//! - constraint mixes were split per axis and renamed
//! - deform timelines moved under `attachments`

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value, json};

/// Editor version a skeleton JSON file was exported from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuntimeVersion {
    /// 3.6 and 3.7 exports
    #[serde(rename = "3.6")]
    V36,
    #[serde(rename = "3.8")]
    V38,
}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeVersion::V36 => write!(f, "3.6"),
            RuntimeVersion::V38 => write!(f, "3.8"),
        }
    }
}

/// Pick the dialect from `skeleton.spine`. `None` means no upgrade is needed.
pub fn detect_version(doc: &Value) -> Option<RuntimeVersion> {
    let version = doc.get("skeleton")?.get("spine")?.as_str()?;
    let mut parts = version.trim().split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    match (major, minor) {
        (0..=2, _) | (3, 0..=7) => Some(RuntimeVersion::V36),
        (3, _) => Some(RuntimeVersion::V38),
        _ => None,
    }
}

/// Version stamped on upgraded documents; the runtime only parses 4.x.
pub const UPGRADED_SPINE_VERSION: &str = "4.0.00";

/// Rewrite a skeleton document exported by `version` into the 4.x layout.
pub fn upgrade_skeleton_json(doc: &mut Value, version: RuntimeVersion) {
    let Some(root) = doc.as_object_mut() else {
        return;
    };

    let header = root
        .entry("skeleton")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(header) = header {
        header.insert("spine".to_string(), json!(UPGRADED_SPINE_VERSION));
    } else {
        *header = json!({ "spine": UPGRADED_SPINE_VERSION });
    }

    if version == RuntimeVersion::V36 {
        if let Some(skins) = root.get_mut("skins") {
            skins_map_to_array(skins);
        }
    }

    for constraint in objects_in_array(root.get_mut("transform")) {
        rename_mixes(constraint, TRANSFORM_MIXES);
    }
    for constraint in objects_in_array(root.get_mut("path")) {
        rename_mixes(constraint, PATH_MIXES);
    }

    if let Some(Value::Object(animations)) = root.get_mut("animations") {
        for animation in animations.values_mut() {
            if let Value::Object(animation) = animation {
                upgrade_animation(animation, version);
            }
        }
    }
}

/// `{"name": {slot: ...}}` to `[{"name": "name", "attachments": {slot: ...}}]`
fn skins_map_to_array(skins: &mut Value) {
    let Value::Object(map) = skins else {
        return;
    };
    let array = std::mem::take(map)
        .into_iter()
        .map(|(name, attachments)| json!({ "name": name, "attachments": attachments }))
        .collect();
    *skins = Value::Array(array);
}

fn objects_in_array(value: Option<&mut Value>) -> impl Iterator<Item = &mut Map<String, Value>> {
    value
        .and_then(Value::as_array_mut)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object_mut)
}

/// Old mix key and the keys it is split into
type MixRename = (&'static str, &'static [&'static str]);

const TRANSFORM_MIXES: &[MixRename] = &[
    ("rotateMix", &["mixRotate"]),
    ("translateMix", &["mixX", "mixY"]),
    ("scaleMix", &["mixScaleX", "mixScaleY"]),
    ("shearMix", &["mixShearY"]),
];

const PATH_MIXES: &[MixRename] = &[
    ("rotateMix", &["mixRotate"]),
    ("translateMix", &["mixX", "mixY"]),
];

fn rename_mixes(object: &mut Map<String, Value>, renames: &[MixRename]) {
    for (old, new_keys) in renames {
        if let Some(value) = object.remove(*old) {
            for key in *new_keys {
                object.insert((*key).to_string(), value.clone());
            }
        }
    }
}

/// How to read the animated values of one key
enum Channels {
    /// Numeric fields with their defaults
    Fields(&'static [(&'static str, f32)]),
    /// Hex color fields with their channel counts
    Colors(&'static [(&'static str, usize)]),
    /// Interpolation percentage from 0 to 1 (deform keys)
    Percent,
}

const ROTATE: Channels = Channels::Fields(&[("value", 0.0)]);
const TRANSLATE: Channels = Channels::Fields(&[("x", 0.0), ("y", 0.0)]);
const SCALE: Channels = Channels::Fields(&[("x", 1.0), ("y", 1.0)]);
const IK: Channels = Channels::Fields(&[("mix", 1.0), ("softness", 0.0)]);
const TRANSFORM: Channels = Channels::Fields(&[
    ("mixRotate", 1.0),
    ("mixX", 1.0),
    ("mixY", 1.0),
    ("mixScaleX", 1.0),
    ("mixScaleY", 1.0),
    ("mixShearY", 1.0),
]);
const PATH_VALUE: Channels = Channels::Fields(&[("value", 0.0)]);
const PATH_MIX: Channels = Channels::Fields(&[("mixRotate", 1.0), ("mixX", 1.0), ("mixY", 1.0)]);
const RGBA: Channels = Channels::Colors(&[("color", 4)]);
const RGBA2: Channels = Channels::Colors(&[("light", 4), ("dark", 3)]);

fn upgrade_animation(animation: &mut Map<String, Value>, version: RuntimeVersion) {
    if let Some(Value::Object(bones)) = animation.get_mut("bones") {
        for timelines in bones.values_mut().filter_map(Value::as_object_mut) {
            for (name, keys) in timelines.iter_mut() {
                let Some(keys) = keys.as_array_mut() else {
                    continue;
                };
                let channels = match name.as_str() {
                    "rotate" => {
                        for key in keys.iter_mut().filter_map(Value::as_object_mut) {
                            if let Some(angle) = key.remove("angle") {
                                key.insert("value".to_string(), angle);
                            }
                        }
                        ROTATE
                    }
                    "translate" | "shear" => TRANSLATE,
                    "scale" => SCALE,
                    _ => continue,
                };
                convert_curves(keys, version, &channels);
            }
        }
    }

    if let Some(Value::Object(slots)) = animation.get_mut("slots") {
        for timelines in slots.values_mut().filter_map(Value::as_object_mut) {
            if let Some(mut keys) = timelines.remove("color") {
                if let Some(keys) = keys.as_array_mut() {
                    convert_curves(keys, version, &RGBA);
                }
                timelines.insert("rgba".to_string(), keys);
            }
            if let Some(mut keys) = timelines.remove("twoColor") {
                if let Some(keys) = keys.as_array_mut() {
                    convert_curves(keys, version, &RGBA2);
                }
                timelines.insert("rgba2".to_string(), keys);
            }
        }
    }

    if let Some(Value::Object(iks)) = animation.get_mut("ik") {
        for keys in iks.values_mut().filter_map(Value::as_array_mut) {
            convert_curves(keys, version, &IK);
        }
    }

    if let Some(Value::Object(transforms)) = animation.get_mut("transform") {
        for keys in transforms.values_mut().filter_map(Value::as_array_mut) {
            for key in keys.iter_mut().filter_map(Value::as_object_mut) {
                rename_mixes(key, TRANSFORM_MIXES);
            }
            convert_curves(keys, version, &TRANSFORM);
        }
    }

    if let Some(Value::Object(paths)) = animation.get_mut("path") {
        for timelines in paths.values_mut().filter_map(Value::as_object_mut) {
            for (name, keys) in timelines.iter_mut() {
                let Some(keys) = keys.as_array_mut() else {
                    continue;
                };
                let channels = match name.as_str() {
                    "position" | "spacing" => {
                        for key in keys.iter_mut().filter_map(Value::as_object_mut) {
                            if let Some(v) = key.remove(name.as_str()) {
                                key.insert("value".to_string(), v);
                            }
                        }
                        PATH_VALUE
                    }
                    "mix" => {
                        for key in keys.iter_mut().filter_map(Value::as_object_mut) {
                            rename_mixes(key, PATH_MIXES);
                        }
                        PATH_MIX
                    }
                    _ => continue,
                };
                convert_curves(keys, version, &channels);
            }
        }
    }

    let deform = animation
        .remove("deform")
        .or_else(|| animation.remove("ffd"));
    if let Some(Value::Object(mut skins)) = deform {
        for slots in skins.values_mut().filter_map(Value::as_object_mut) {
            for attachments in slots.values_mut().filter_map(Value::as_object_mut) {
                for timeline in attachments.values_mut() {
                    if let Some(keys) = timeline.as_array_mut() {
                        convert_curves(keys, version, &Channels::Percent);
                    }
                    let keys = timeline.take();
                    *timeline = json!({ "deform": keys });
                }
            }
        }
        animation.insert("attachments".to_string(), Value::Object(skins));
    }
}

fn key_time(key: &Value) -> f32 {
    number(key.get("time"), 0.0)
}

#[allow(clippy::cast_possible_truncation)]
fn number(value: Option<&Value>, default: f32) -> f32 {
    value.and_then(Value::as_f64).map_or(default, |v| v as f32)
}

/// Parse `count` hex channels of a color string, missing channels read as 1.
fn hex_channels(value: Option<&Value>, count: usize) -> Vec<f32> {
    let text = value.and_then(Value::as_str).unwrap_or("");
    (0..count)
        .map(|i| {
            text.get(i * 2..i * 2 + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .map_or(1.0, |c| f32::from(c) / 255.0)
        })
        .collect()
}

fn channel_values(key: &Value, channels: &Channels) -> Vec<f32> {
    match channels {
        Channels::Fields(fields) => fields
            .iter()
            .map(|(name, default)| number(key.get(*name), *default))
            .collect(),
        Channels::Colors(fields) => fields
            .iter()
            .flat_map(|(name, count)| hex_channels(key.get(*name), *count))
            .collect(),
        Channels::Percent => vec![0.0],
    }
}

/// Remove a Bezier curve from `key` in the old encoding, returning its
/// normalized control points. Stepped and already-upgraded curves stay put.
fn take_bezier(key: &mut Map<String, Value>, version: RuntimeVersion) -> Option<[f32; 4]> {
    let points = match (version, key.get("curve")?) {
        (RuntimeVersion::V36, Value::Array(points)) if points.len() == 4 => [
            number(Some(&points[0]), 0.0),
            number(Some(&points[1]), 0.0),
            number(Some(&points[2]), 1.0),
            number(Some(&points[3]), 1.0),
        ],
        (RuntimeVersion::V38, Value::Number(_)) => [
            number(key.get("curve"), 0.0),
            number(key.get("c2"), 0.0),
            number(key.get("c3"), 1.0),
            number(key.get("c4"), 1.0),
        ],
        _ => return None,
    };
    for field in ["curve", "c2", "c3", "c4"] {
        key.remove(field);
    }
    Some(points)
}

/// Rewrite every Bezier curve in `keys` to absolute per-channel control points.
fn convert_curves(keys: &mut [Value], version: RuntimeVersion, channels: &Channels) {
    let samples: Vec<(f32, Vec<f32>)> = keys
        .iter()
        .map(|k| (key_time(k), channel_values(k, channels)))
        .collect();

    for (i, key) in keys.iter_mut().enumerate() {
        let Some(key) = key.as_object_mut() else {
            continue;
        };
        let Some([cx1, cy1, cx2, cy2]) = take_bezier(key, version) else {
            continue;
        };
        // A curve on the last key has nothing to interpolate towards
        let Some((t1, end)) = samples.get(i + 1) else {
            continue;
        };
        let (t0, start) = &samples[i];
        let end: &[f32] = match channels {
            Channels::Percent => &[1.0],
            _ => end,
        };

        let mut curve = Vec::with_capacity(start.len() * 4);
        for (v0, v1) in start.iter().zip(end) {
            curve.extend([
                t0 + cx1 * (t1 - t0),
                v0 + cy1 * (v1 - v0),
                t0 + cx2 * (t1 - t0),
                v0 + cy2 * (v1 - v0),
            ]);
        }
        key.insert("curve".to_string(), json!(curve));
    }
}
