//! Stroke types, the stored stroke record, and stroke events.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tandem_common::{Color, ParticipantId, Point3, StrokeId};

// ---------------------------------------------------------------------------
// Local strokes
// ---------------------------------------------------------------------------

/// Caller-side identity of a stroke being drawn on this device.
///
/// Stable across every update of the same stroke. The store-side
/// [`StrokeId`] is allocated by the engine on first sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StrokeHandle(uuid::Uuid);

impl StrokeHandle {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for StrokeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color,
    pub line_width: f32,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            line_width: 0.006,
        }
    }
}

/// A stroke authored on this device.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalStroke {
    pub handle: StrokeHandle,
    pub points: Vec<Point3>,
    pub style: StrokeStyle,
    /// Whether the renderer holds geometry for this stroke.
    pub rendered: bool,
}

impl LocalStroke {
    pub fn new(style: StrokeStyle) -> Self {
        Self {
            handle: StrokeHandle::new(),
            points: Vec::new(),
            style,
            rendered: true,
        }
    }

    pub fn push(&mut self, point: Point3) {
        self.points.push(point);
    }

    /// A stroke with nothing to draw is never uploaded.
    pub fn is_degenerate(&self) -> bool {
        self.points.is_empty() || !self.rendered
    }
}

/// A stroke authored by the other device.
#[derive(Debug, Clone, PartialEq)]
pub struct PartnerStroke {
    pub id: StrokeId,
    pub points: Vec<Point3>,
    pub style: StrokeStyle,
    pub creator: Option<ParticipantId>,
}

// ---------------------------------------------------------------------------
// Stored record
// ---------------------------------------------------------------------------

/// A stroke as stored under `lines/<strokeId>`.
///
/// Points are keyed by index (`{"0": {..}, "1": {..}}`) so appended points
/// can be written one child at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeRecord {
    pub points: Vec<Point3>,
    pub style: StrokeStyle,
    pub creator: Option<ParticipantId>,
    pub removed: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStroke {
    #[serde(default)]
    points: Value,
    #[serde(default)]
    line_width: Option<f32>,
    #[serde(default)]
    color: Option<Color>,
    #[serde(default)]
    creator: Option<ParticipantId>,
    #[serde(default)]
    removed: bool,
}

pub(crate) fn point_value(point: &Point3) -> Value {
    json!({ "x": point.x, "y": point.y, "z": point.z })
}

fn points_from_value(value: &Value) -> Result<Vec<Point3>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(|e| e.to_string()))
            .collect(),
        Value::Object(map) => {
            let mut indexed = map
                .iter()
                .map(|(key, item)| {
                    let index = key
                        .parse::<usize>()
                        .map_err(|_| format!("non-numeric point index {key:?}"))?;
                    let point: Point3 =
                        serde_json::from_value(item.clone()).map_err(|e| e.to_string())?;
                    Ok((index, point))
                })
                .collect::<Result<Vec<_>, String>>()?;
            indexed.sort_by_key(|(index, _)| *index);
            Ok(indexed.into_iter().map(|(_, point)| point).collect())
        }
        other => Err(format!("unexpected points value {other}")),
    }
}

impl StrokeRecord {
    pub fn from_local(stroke: &LocalStroke, creator: Option<ParticipantId>) -> Self {
        Self {
            points: stroke.points.clone(),
            style: stroke.style,
            creator,
            removed: false,
        }
    }

    pub fn to_value(&self) -> Value {
        let points: Map<String, Value> = self
            .points
            .iter()
            .enumerate()
            .map(|(index, point)| (index.to_string(), point_value(point)))
            .collect();
        let mut record = json!({
            "points": points,
            "lineWidth": self.style.line_width,
            "color": self.style.color.to_hex(),
            "removed": self.removed,
        });
        if let (Some(creator), Value::Object(map)) = (&self.creator, &mut record) {
            map.insert("creator".into(), Value::String(creator.to_string()));
        }
        record
    }

    pub fn from_value(value: &Value) -> Result<Self, String> {
        let raw: RawStroke = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
        let defaults = StrokeStyle::default();
        Ok(Self {
            points: points_from_value(&raw.points)?,
            style: StrokeStyle {
                color: raw.color.unwrap_or(defaults.color),
                line_width: raw.line_width.unwrap_or(defaults.line_width),
            },
            creator: raw.creator,
            removed: raw.removed,
        })
    }

    pub fn into_partner(self, id: StrokeId) -> PartnerStroke {
        PartnerStroke {
            id,
            points: self.points,
            style: self.style,
            creator: self.creator,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Stroke changes the caller must render.
#[derive(Debug, Clone, PartialEq)]
pub enum StrokeEvent {
    /// A local stroke got its store id.
    LocalAdded { handle: StrokeHandle, id: StrokeId },
    /// A local stroke is gone: removed here, degenerate, or cleared remotely.
    LocalRemoved { handle: StrokeHandle, id: StrokeId },
    PartnerAdded(PartnerStroke),
    PartnerUpdated { id: StrokeId, points: Vec<Point3> },
    PartnerRemoved { id: StrokeId },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(points: &[(f32, f32, f32)]) -> LocalStroke {
        let mut stroke = LocalStroke::new(StrokeStyle::default());
        for &(x, y, z) in points {
            stroke.push(Point3::new(x, y, z));
        }
        stroke
    }

    #[test]
    fn degenerate_strokes() {
        assert!(stroke(&[]).is_degenerate());
        let mut hidden = stroke(&[(0.0, 0.0, 0.0)]);
        hidden.rendered = false;
        assert!(hidden.is_degenerate());
        assert!(!stroke(&[(0.0, 0.0, 0.0)]).is_degenerate());
    }

    #[test]
    fn record_value_layout() {
        let local = stroke(&[(1.0, 2.0, 3.0), (4.0, 5.0, 6.0)]);
        let record = StrokeRecord::from_local(&local, Some(ParticipantId::from("u1")));
        let value = record.to_value();
        assert_eq!(value["points"]["1"]["y"], json!(5.0));
        assert_eq!(value["creator"], json!("u1"));
        assert_eq!(value["color"], json!("#ffffff"));
        assert_eq!(value["removed"], json!(false));
    }

    #[test]
    fn record_from_value_orders_points_by_index() {
        let value = json!({
            "points": {
                "10": {"x": 10.0, "y": 0.0, "z": 0.0},
                "2": {"x": 2.0, "y": 0.0, "z": 0.0},
                "0": {"x": 0.0, "y": 0.0, "z": 0.0},
            },
            "lineWidth": 0.01,
            "color": "#ff0000",
        });
        let record = StrokeRecord::from_value(&value).unwrap();
        let xs: Vec<f32> = record.points.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 2.0, 10.0]);
        assert_eq!(record.style.line_width, 0.01);
        assert_eq!(record.style.color, Color::from_rgba(255, 0, 0, 255));
        assert!(record.creator.is_none());
    }

    #[test]
    fn record_accepts_point_arrays() {
        let value = json!({"points": [{"x": 1.0, "y": 1.0, "z": 1.0}]});
        let record = StrokeRecord::from_value(&value).unwrap();
        assert_eq!(record.points, vec![Point3::new(1.0, 1.0, 1.0)]);
        assert_eq!(record.style, StrokeStyle::default());
    }

    #[test]
    fn record_rejects_bad_points() {
        assert!(StrokeRecord::from_value(&json!({"points": {"a": {"x": 0.0}}})).is_err());
        assert!(StrokeRecord::from_value(&json!({"points": 7})).is_err());
        assert!(StrokeRecord::from_value(&json!("nope")).is_err());
    }

    #[test]
    fn record_round_trips_through_value() {
        let local = stroke(&[(0.5, -0.5, 1.5)]);
        let record = StrokeRecord::from_local(&local, None);
        assert_eq!(StrokeRecord::from_value(&record.to_value()).unwrap(), record);
    }

    #[test]
    fn handles_are_unique() {
        assert_ne!(StrokeHandle::new(), StrokeHandle::new());
    }
}
