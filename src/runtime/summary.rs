use serde_json::{Map, Value};

use super::{AnimationSummary, SkeletonSummary, SkinSummary};

/// Attachment types that draw a textured region
const REGION_TYPES: &[&str] = &["region", "mesh", "linkedmesh"];

/// Collect skeleton metadata from a skeleton JSON document.
///
/// Accepts both skin layouts (array of named skins and the older name map).
pub fn summarize(doc: &Value) -> SkeletonSummary {
    let count = |key: &str| doc.get(key).and_then(Value::as_array).map_or(0, Vec::len);

    SkeletonSummary {
        spine_version: doc
            .get("skeleton")
            .and_then(|s| s.get("spine"))
            .and_then(Value::as_str)
            .map(str::to_string),
        bones: count("bones"),
        slots: count("slots"),
        skins: skins(doc.get("skins")),
        animations: doc
            .get("animations")
            .and_then(Value::as_object)
            .map(|animations| {
                animations
                    .iter()
                    .map(|(name, animation)| AnimationSummary {
                        name: name.clone(),
                        duration: latest_key_time(animation),
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn skins(value: Option<&Value>) -> Vec<SkinSummary> {
    match value {
        Some(Value::Array(skins)) => skins
            .iter()
            .filter_map(|skin| {
                let name = skin.get("name")?.as_str()?;
                Some(skin_summary(name, skin.get("attachments")))
            })
            .collect(),
        Some(Value::Object(skins)) => skins
            .iter()
            .map(|(name, slots)| skin_summary(name, Some(slots)))
            .collect(),
        _ => Vec::new(),
    }
}

/// `slots` is `{slot: {attachment name: attachment}}`
fn skin_summary(name: &str, slots: Option<&Value>) -> SkinSummary {
    let attachments: Vec<&Map<String, Value>> = slots
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|slots| slots.values())
        .filter_map(Value::as_object)
        .flat_map(|attachments| attachments.values())
        .filter_map(Value::as_object)
        .collect();

    let regions = attachments
        .iter()
        .filter(|a| {
            let kind = a.get("type").and_then(Value::as_str).unwrap_or("region");
            REGION_TYPES.contains(&kind)
        })
        .count();

    SkinSummary {
        name: name.to_string(),
        attachments: attachments.len(),
        regions,
    }
}

/// Largest `time` of any key nested in `value`; keys without one sit at 0.
#[allow(clippy::cast_possible_truncation)]
fn latest_key_time(value: &Value) -> f32 {
    fn walk(value: &Value, latest: &mut f64) {
        match value {
            Value::Object(map) => {
                if let Some(time) = map.get("time").and_then(Value::as_f64) {
                    *latest = latest.max(time);
                }
                map.values().for_each(|v| walk(v, latest));
            }
            Value::Array(items) => items.iter().for_each(|v| walk(v, latest)),
            _ => {}
        }
    }

    let mut latest = 0.0;
    walk(value, &mut latest);
    latest as f32
}
