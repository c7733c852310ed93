use std::path::Path;

use fl_tally::districts::{AttributeValue, Attributes};
use geo::MultiPolygon;
use shapefile::dbase::FieldValue;
use shapefile::{Point, Polygon, PolygonRing, Shape, ShapeType};

use crate::etl::*;

/// A feature of a district plan: the attribute table row and the outline.
#[derive(Debug, Clone)]
pub struct DistrictFeature {
    pub attributes: Attributes,
    /// None for null shapes or geometry types that are not polygons.
    pub geometry: Option<MultiPolygon<f64>>,
}

fn attribute_value(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(s)) => AttributeValue::Text(s),
        FieldValue::Memo(s) => AttributeValue::Text(s),
        FieldValue::Numeric(Some(x)) => AttributeValue::Number(x),
        FieldValue::Float(Some(x)) => AttributeValue::Number(x as f64),
        FieldValue::Double(x) => AttributeValue::Number(x),
        FieldValue::Currency(x) => AttributeValue::Number(x),
        FieldValue::Integer(x) => AttributeValue::Number(x as f64),
        FieldValue::Logical(Some(b)) => AttributeValue::Text(b.to_string()),
        _ => AttributeValue::Missing,
    }
}

fn attributes(record: shapefile::dbase::Record) -> Attributes {
    record
        .into_iter()
        .map(|(name, value)| (name, attribute_value(value)))
        .collect()
}

fn flat_ring<P>(ring: &PolygonRing<P>, xy: impl Fn(&P) -> Point) -> PolygonRing<Point> {
    match ring {
        PolygonRing::Outer(pts) => PolygonRing::Outer(pts.iter().map(&xy).collect()),
        PolygonRing::Inner(pts) => PolygonRing::Inner(pts.iter().map(&xy).collect()),
    }
}

/// The outline of a shape. Z and M values are dropped. Shapes that are not polygons
/// return their type.
fn shape_geometry(shape: Shape) -> Result<Option<MultiPolygon<f64>>, ShapeType> {
    match shape {
        Shape::Polygon(p) => Ok(Some(MultiPolygon::<f64>::from(p))),
        Shape::PolygonZ(p) => {
            let rings = p
                .rings()
                .iter()
                .map(|r| flat_ring(r, |pt| Point::new(pt.x, pt.y)))
                .collect();
            Ok(Some(MultiPolygon::<f64>::from(Polygon::with_rings(rings))))
        }
        Shape::PolygonM(p) => {
            let rings = p
                .rings()
                .iter()
                .map(|r| flat_ring(r, |pt| Point::new(pt.x, pt.y)))
                .collect();
            Ok(Some(MultiPolygon::<f64>::from(Polygon::with_rings(rings))))
        }
        Shape::NullShape => Ok(None),
        other => Err(other.shapetype()),
    }
}

/// Reads all the features of a plan (`.shp` and its `.dbf`).
///
/// The attribute table is keyed by column name: for a column that appears twice in the
/// `.dbf` (the `TARGET_DEV` column of some plans), the last value read is kept.
pub fn read_features(path: &Path) -> BEtlResult<Vec<DistrictFeature>> {
    let path_s = path.display().to_string();
    info!("Attempting to read shapefile {:?}", path_s);
    let mut reader =
        shapefile::Reader::from_path(path).context(ReadingShapefileSnafu { path: path_s.clone() })?;

    let mut res: Vec<DistrictFeature> = Vec::new();
    for (idx, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = item.context(ReadingShapefileSnafu { path: path_s.clone() })?;
        let geometry = match shape_geometry(shape) {
            Ok(g) => g,
            Err(shape_type) => {
                warn!(
                    "read_features: feature {} of {}: unsupported shape type {:?}",
                    idx, path_s, shape_type
                );
                None
            }
        };
        res.push(DistrictFeature {
            attributes: attributes(record),
            geometry,
        });
    }
    info!("Read {} features from {}", res.len(), path_s);
    Ok(res)
}

/// Writes a plan of square districts in the Florida GDL Albers projection, with its `.prj`.
/// Each entry is (district, long name, hispanic VAP %, x, y of the lower left corner).
#[cfg(test)]
pub(crate) fn write_sample_plan(shp: &Path, districts: &[(u32, &str, f64, f64, f64)]) {
    use shapefile::dbase::{FieldName, Record, TableWriterBuilder};
    use std::convert::TryFrom;

    let table = TableWriterBuilder::new()
        .add_numeric_field(FieldName::try_from("DISTRICT").unwrap(), 10, 0)
        .add_character_field(FieldName::try_from("LONGNAME").unwrap(), 50)
        .add_numeric_field(FieldName::try_from("HVAP_P").unwrap(), 10, 2);
    {
        let mut writer = shapefile::Writer::from_path(shp, table).unwrap();
        for (district, name, hvap, x, y) in districts {
            let square = Polygon::new(PolygonRing::Outer(vec![
                Point::new(*x, *y),
                Point::new(*x, *y + 10000.0),
                Point::new(*x + 10000.0, *y + 10000.0),
                Point::new(*x + 10000.0, *y),
                Point::new(*x, *y),
            ]));
            let mut record = Record::default();
            record.insert(
                "DISTRICT".to_string(),
                FieldValue::Numeric(Some(*district as f64)),
            );
            record.insert(
                "LONGNAME".to_string(),
                FieldValue::Character(Some(name.to_string())),
            );
            record.insert("HVAP_P".to_string(), FieldValue::Numeric(Some(*hvap)));
            writer.write_shape_and_record(&square, &record).unwrap();
        }
    }
    std::fs::write(shp.with_extension("prj"), GDL_ALBERS_WKT).unwrap();
}

#[cfg(test)]
pub(crate) const GDL_ALBERS_WKT: &str = r#"PROJCS["NAD_1983_HARN_Florida_GDL_Albers",GEOGCS["GCS_North_American_1983_HARN",DATUM["D_North_American_1983_HARN",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Albers"],PARAMETER["False_Easting",400000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-84.0],PARAMETER["Standard_Parallel_1",24.0],PARAMETER["Standard_Parallel_2",31.5],PARAMETER["Latitude_Of_Origin",24.0],UNIT["Meter",1.0]]"#;
