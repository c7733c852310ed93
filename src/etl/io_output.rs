// Writers for the generated artifacts.

use std::fs;
use std::path::Path;

use fl_tally::districts::{AttributeValue, Attributes};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde::Serialize;
use serde_json::Value as JSValue;

use crate::etl::{io_shapefile::DistrictFeature, *};

fn ensure_parent(path: &Path) -> EtlResult<()> {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => fs::create_dir_all(p).context(WritingFileSnafu {
            path: p.display().to_string(),
        }),
        _ => Ok(()),
    }
}

fn write_records<T: Serialize>(path: &Path, records: &[T], has_headers: bool) -> BEtlResult<usize> {
    ensure_parent(path)?;
    let path_s = path.display().to_string();
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(has_headers)
        .from_path(path)
        .context(CsvWriteSnafu { path: path_s.clone() })?;
    for r in records {
        wtr.serialize(r).context(CsvWriteSnafu { path: path_s.clone() })?;
    }
    wtr.flush().context(WritingFileSnafu { path: path_s.clone() })?;
    info!("Saved {} records to {}", records.len(), path_s);
    Ok(records.len())
}

/// Writes the records as CSV. The header is taken from the field names.
pub fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> BEtlResult<usize> {
    write_records(path, records, true)
}

pub fn write_csv_headerless<T: Serialize>(path: &Path, records: &[T]) -> BEtlResult<usize> {
    write_records(path, records, false)
}

pub fn to_pretty_json<T: Serialize>(value: &T) -> EtlResult<String> {
    serde_json::to_string_pretty(value).context(SerializingJsonSnafu {})
}

/// Writes the value as indented JSON, and returns the written text.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> BEtlResult<String> {
    ensure_parent(path)?;
    let text = to_pretty_json(value)?;
    fs::write(path, &text).context(WritingFileSnafu {
        path: path.display().to_string(),
    })?;
    info!("Saved JSON to {}", path.display());
    Ok(text)
}

fn json_value(v: &AttributeValue) -> JSValue {
    match v {
        AttributeValue::Text(s) => JSValue::String(s.clone()),
        AttributeValue::Number(x) if x.fract() == 0.0 && x.abs() < 9.0e15 => {
            JSValue::from(*x as i64)
        }
        AttributeValue::Number(x) => serde_json::Number::from_f64(*x)
            .map(JSValue::Number)
            .unwrap_or(JSValue::Null),
        AttributeValue::Missing => JSValue::Null,
    }
}

pub fn properties(attributes: &Attributes) -> JsonObject {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), json_value(v)))
        .collect()
}

pub fn feature_collection(features: &[DistrictFeature]) -> FeatureCollection {
    let features: Vec<Feature> = features
        .iter()
        .map(|f| Feature {
            bbox: None,
            geometry: f
                .geometry
                .as_ref()
                .map(|g| Geometry::new(geojson::Value::from(g))),
            id: None,
            properties: Some(properties(&f.attributes)),
            foreign_members: None,
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes the features as a GeoJSON feature collection. The coordinates are written as
/// they are, they should already be in WGS84.
pub fn write_geojson(path: &Path, features: &[DistrictFeature]) -> BEtlResult<usize> {
    ensure_parent(path)?;
    let fc = feature_collection(features);
    let text = serde_json::to_string(&fc).context(SerializingJsonSnafu {})?;
    fs::write(path, text).context(WritingFileSnafu {
        path: path.display().to_string(),
    })?;
    info!("Saved {} features to {}", features.len(), path.display());
    Ok(features.len())
}
