//! Geo operators.
//!
//! Each translator validates its argument shape and fails fast on any
//! violation. Polygon rings are passed through as given: closure is not
//! checked here and open rings are reported by the store.

use bson::{doc, Bson, Document};

use crate::error::{QueryError, Result};
use crate::node::Operator;

/// Meters in one statute mile.
pub const METERS_PER_MILE: f64 = 1609.344;

/// Mean Earth radius in miles, the unit behind `$centerSphere` radians.
pub const EARTH_RADIUS_MILES: f64 = 3963.2;

/// Converts a distance in meters to the store's angular radius.
#[must_use]
pub fn meters_to_radians(meters: f64) -> f64 {
    meters / METERS_PER_MILE / EARTH_RADIUS_MILES
}

/// Translates a geo token, or returns `None` if `token` is not one.
pub(crate) fn translate(token: &str, operand: Bson) -> Option<Result<(Operator, Document)>> {
    let out = match token {
        "geo_within_polygon" => polygon("geo_within_polygon", operand, "Polygon", 2)
            .map(|g| (Operator::GeoWithin, g)),
        "geo_within_multi_polygon" => {
            polygon("geo_within_multi_polygon", operand, "MultiPolygon", 3)
                .map(|g| (Operator::GeoWithin, g))
        }
        "geo_intersects_polygon" => polygon("geo_intersects_polygon", operand, "Polygon", 2)
            .map(|g| (Operator::GeoIntersects, g)),
        "geo_within_center_sphere" => circle("geo_within_center_sphere", &operand)
            .map(|c| (Operator::GeoWithin, doc! { "$centerSphere": c })),
        "geo_within_2d_center" => circle("geo_within_2d_center", &operand)
            .map(|c| (Operator::GeoWithin, doc! { "$center": c })),
        "geo_within_2d_box" => planar_box(&operand).map(|b| (Operator::GeoWithin, b)),
        "geo_within_2d_polygon" => planar_polygon(&operand).map(|p| (Operator::GeoWithin, p)),
        "near" => near("near", &operand).map(|n| (Operator::Near, n)),
        "near_sphere" => near("near_sphere", &operand).map(|n| (Operator::NearSphere, n)),
        _ => return None,
    };
    Some(out)
}

fn invalid(op: &'static str, reason: impl Into<String>) -> QueryError {
    QueryError::InvalidGeo {
        op,
        reason: reason.into(),
    }
}

fn number(b: &Bson) -> Option<f64> {
    match b {
        Bson::Double(f) => Some(*f),
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        _ => None,
    }
}

/// Nesting depth of a coordinate array: 0 for a number, 1 for a flat
/// array of numbers, and so on. `None` for ragged, empty or non-numeric
/// input.
fn depth(b: &Bson) -> Option<usize> {
    match b {
        Bson::Array(items) => {
            let first = depth(items.first()?)?;
            items
                .iter()
                .skip(1)
                .all(|item| depth(item) == Some(first))
                .then_some(first + 1)
        }
        other => number(other).map(|_| 0),
    }
}

/// Rebuilds a coordinate array with every number as a double.
fn normalize(b: Bson) -> Bson {
    match b {
        Bson::Array(items) => Bson::Array(items.into_iter().map(normalize).collect()),
        other => number(&other).map_or(other, Bson::Double),
    }
}

fn point(op: &'static str, b: &Bson) -> Result<Vec<f64>> {
    let Bson::Array(items) = b else {
        return Err(invalid(op, "point must be an array of 2 numbers"));
    };
    let coords: Option<Vec<f64>> = items.iter().map(number).collect();
    match coords {
        Some(c) if c.len() == 2 => Ok(c),
        _ => Err(invalid(op, "point must be an array of 2 numbers")),
    }
}

/// `ring_depth` is the depth of a single unit (a ring for Polygon, a
/// polygon for MultiPolygon); one extra level is the full geometry.
fn polygon(op: &'static str, operand: Bson, kind: &str, ring_depth: usize) -> Result<Document> {
    let coordinates = match depth(&operand) {
        Some(d) if d == ring_depth => Bson::Array(vec![normalize(operand)]),
        Some(d) if d == ring_depth + 1 => normalize(operand),
        _ => {
            return Err(invalid(
                op,
                format!(
                    "coordinates must be nested {ring_depth} or {} levels deep",
                    ring_depth + 1
                ),
            ))
        }
    };
    Ok(doc! {
        "$geometry": {
            "type": kind,
            "coordinates": coordinates,
        }
    })
}

fn circle(op: &'static str, operand: &Bson) -> Result<Bson> {
    let values: Vec<f64> = match operand {
        Bson::Array(items) => items
            .iter()
            .map(number)
            .collect::<Option<Vec<_>>>()
            .unwrap_or_default(),
        _ => Vec::new(),
    };
    let [lng, lat, radius] = values[..] else {
        return Err(invalid(op, "expected [lng, lat, radius_meters]"));
    };
    if radius <= 0.0 {
        return Err(invalid(op, "radius must be greater than 0"));
    }
    Ok(Bson::Array(vec![
        Bson::Array(vec![Bson::Double(lng), Bson::Double(lat)]),
        Bson::Double(meters_to_radians(radius)),
    ]))
}

fn planar_box(operand: &Bson) -> Result<Document> {
    const OP: &str = "geo_within_2d_box";
    let Bson::Array(corners) = operand else {
        return Err(invalid(OP, "expected [[x, y], [x, y]]"));
    };
    if corners.len() != 2 {
        return Err(invalid(OP, "expected exactly 2 corners"));
    }
    for corner in corners {
        point(OP, corner)?;
    }
    Ok(doc! { "$box": normalize(operand.clone()) })
}

fn planar_polygon(operand: &Bson) -> Result<Document> {
    const OP: &str = "geo_within_2d_polygon";
    let Bson::Array(points) = operand else {
        return Err(invalid(OP, "expected an array of points"));
    };
    if points.len() < 3 {
        return Err(invalid(OP, "expected at least 3 points"));
    }
    for p in points {
        point(OP, p)?;
    }
    Ok(doc! { "$polygon": normalize(operand.clone()) })
}

fn near(op: &'static str, operand: &Bson) -> Result<Document> {
    let mut bounds = Document::new();
    let coords = match operand {
        Bson::Array(_) => point(op, operand)?,
        Bson::Document(config) => {
            let p = config
                .get("point")
                .ok_or_else(|| invalid(op, "configuration requires 'point'"))?;
            for (key, target) in [("min", "$minDistance"), ("max", "$maxDistance")] {
                if let Some(bound) = config.get(key) {
                    let meters = number(bound)
                        .ok_or_else(|| invalid(op, format!("'{key}' must be a number")))?;
                    bounds.insert(target, meters);
                }
            }
            point(op, p)?
        }
        _ => {
            return Err(invalid(
                op,
                "expected a point or {point, min, max} configuration",
            ))
        }
    };

    let mut out = doc! {
        "$geometry": {
            "type": "Point",
            "coordinates": coords,
        }
    };
    for (k, v) in bounds {
        out.insert(k, v);
    }
    Ok(out)
}
