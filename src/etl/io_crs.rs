// Coordinate systems of the district plans, and the re-projection to WGS84.
//
// The plans are published with an ESRI `.prj` file. Only the handful of projections used by
// Florida agencies are translated here: geographic coordinates, transverse Mercator (state
// plane east/west), Lambert conformal conic (state plane north) and Albers (the statewide
// GDL Albers).

use std::fs;
use std::path::Path;

use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::proj::Proj;

use crate::etl::*;

pub const WGS84_PROJ: &str = "+proj=longlat +ellps=WGS84 +datum=WGS84 +no_defs";

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SourceCrs {
    /// Longitude/latitude in degrees, on a datum close enough to WGS84 to be used as is.
    Geographic,
    /// A projected system, as a PROJ string.
    Projected(String),
}

impl SourceCrs {
    pub fn from_proj_string(proj: &str) -> SourceCrs {
        if proj.contains("+proj=longlat") || proj.contains("+proj=latlong") {
            SourceCrs::Geographic
        } else {
            SourceCrs::Projected(proj.trim().to_string())
        }
    }
}

/// One `KEYWORD["name", value, ...]` node of a WKT string, flattened: only the quoted
/// name and the first numeric value are kept.
#[derive(PartialEq, Debug, Clone)]
struct WktNode {
    keyword: String,
    name: String,
    value: Option<f64>,
}

fn wkt_nodes(wkt: &str) -> Vec<WktNode> {
    let mut res: Vec<WktNode> = Vec::new();
    let mut rest = wkt;
    while let Some(open) = rest.find('[') {
        let keyword: String = rest[..open]
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect::<Vec<char>>()
            .into_iter()
            .rev()
            .collect();
        let body = &rest[open + 1..];
        let end = body.find(|c| c == '[' || c == ']').unwrap_or(body.len());
        let mut parts = body[..end].split(',');
        let name = parts
            .next()
            .unwrap_or("")
            .trim()
            .trim_matches('"')
            .to_string();
        let value = parts.next().and_then(|v| v.trim().parse::<f64>().ok());
        res.push(WktNode {
            keyword: keyword.to_uppercase(),
            name,
            value,
        });
        rest = body;
    }
    res
}

fn normalize_name(s: &str) -> String {
    s.to_lowercase().replace([' ', '-'], "_")
}

fn proj_name(projection: &str) -> EtlResult<&'static str> {
    match normalize_name(projection).as_str() {
        "transverse_mercator" => Ok("tmerc"),
        "albers" | "albers_conic_equal_area" | "albers_equal_area_conic" => Ok("aea"),
        "lambert_conformal_conic"
        | "lambert_conformal_conic_1sp"
        | "lambert_conformal_conic_2sp" => Ok("lcc"),
        "mercator" | "mercator_1sp" | "mercator_2sp" => Ok("merc"),
        x => whatever!("projection {:?} is not supported", x),
    }
}

fn ellipsoid_params(spheroid: Option<&WktNode>, datum: &str) -> String {
    let name = spheroid.map(|s| normalize_name(&s.name)).unwrap_or_default();
    let datum = normalize_name(datum);
    if name.contains("grs_1980") || name.contains("grs80") {
        "+ellps=GRS80 +towgs84=0,0,0".to_string()
    } else if name.contains("wgs_1984") || name.contains("wgs_84") {
        "+ellps=WGS84 +towgs84=0,0,0".to_string()
    } else if name.contains("clarke_1866") {
        // Mean NAD27 to WGS84 shift for the conterminous US.
        if datum.contains("1927") || datum.contains("nad27") {
            "+ellps=clrk66 +towgs84=-8,160,176".to_string()
        } else {
            "+ellps=clrk66".to_string()
        }
    } else {
        "+ellps=GRS80 +towgs84=0,0,0".to_string()
    }
}

/// Translates an ESRI/OGC WKT definition to the source coordinate system.
pub fn crs_from_wkt(wkt: &str) -> EtlResult<SourceCrs> {
    let wkt = wkt.trim();
    let nodes = wkt_nodes(wkt);
    let first = match nodes.first() {
        Some(n) => n,
        None => whatever!("empty coordinate system definition"),
    };
    match first.keyword.as_str() {
        "GEOGCS" | "GEOGCRS" => return Ok(SourceCrs::Geographic),
        "PROJCS" | "PROJCRS" => {}
        x => whatever!("unknown coordinate system type {:?}", x),
    }

    let projection = nodes
        .iter()
        .find(|n| n.keyword == "PROJECTION")
        .map(|n| n.name.clone())
        .unwrap_or_default();
    let proj = proj_name(&projection)?;
    let spheroid = nodes.iter().find(|n| n.keyword == "SPHEROID");
    let datum = nodes
        .iter()
        .find(|n| n.keyword == "DATUM")
        .map(|n| n.name.clone())
        .unwrap_or_default();
    // The last unit is the linear unit of the projected system.
    let to_meter = nodes
        .iter()
        .rev()
        .find(|n| n.keyword == "UNIT")
        .and_then(|n| n.value)
        .unwrap_or(1.0);

    let mut params: Vec<String> = vec![format!("+proj={}", proj)];
    let mut lat_0: Option<f64> = None;
    let mut has_lat_1 = false;
    for p in nodes.iter().filter(|n| n.keyword == "PARAMETER") {
        let v = match p.value {
            Some(v) => v,
            None => continue,
        };
        match normalize_name(&p.name).as_str() {
            "false_easting" => params.push(format!("+x_0={}", v * to_meter)),
            "false_northing" => params.push(format!("+y_0={}", v * to_meter)),
            "central_meridian" | "longitude_of_center" | "longitude_of_origin" => {
                params.push(format!("+lon_0={}", v))
            }
            "latitude_of_origin" | "latitude_of_center" => {
                lat_0 = Some(v);
                params.push(format!("+lat_0={}", v))
            }
            "standard_parallel_1" => {
                has_lat_1 = true;
                params.push(format!("+lat_1={}", v))
            }
            "standard_parallel_2" => params.push(format!("+lat_2={}", v)),
            "scale_factor" => params.push(format!("+k_0={}", v)),
            x => debug!("crs_from_wkt: ignoring parameter {}", x),
        }
    }
    // The one standard parallel form of the conic projections
    if proj == "lcc" && !has_lat_1 {
        if let Some(lat) = lat_0 {
            params.push(format!("+lat_1={}", lat));
        }
    }
    params.push(ellipsoid_params(spheroid, &datum));
    if (to_meter - 1.0).abs() < 1e-12 {
        params.push("+units=m".to_string());
    } else {
        params.push(format!("+to_meter={}", to_meter));
    }
    params.push("+no_defs".to_string());
    Ok(SourceCrs::Projected(params.join(" ")))
}

/// The coordinate system of a shapefile: the explicit PROJ string if any, then the `.prj`
/// next to the `.shp`. Without either, the coordinates are assumed to be WGS84.
pub fn source_crs(shp_path: &Path, proj_override: Option<&str>) -> BEtlResult<SourceCrs> {
    if let Some(p) = proj_override {
        return Ok(SourceCrs::from_proj_string(p));
    }
    let prj_path = shp_path.with_extension("prj");
    if !prj_path.exists() {
        warn!(
            "source_crs: no {} found, assuming WGS84 coordinates",
            prj_path.display()
        );
        return Ok(SourceCrs::Geographic);
    }
    let wkt = fs::read_to_string(&prj_path).context(OpeningFileSnafu {
        path: prj_path.display().to_string(),
    })?;
    let crs = crs_from_wkt(&wkt)?;
    info!("Coordinate system of {}: {:?}", shp_path.display(), crs);
    Ok(crs)
}

/// Converts geometries to WGS84 longitude/latitude degrees.
pub struct Reprojector {
    // None when the source is already geographic.
    transform: Option<(Proj, Proj)>,
}

impl Reprojector {
    pub fn new(crs: &SourceCrs) -> EtlResult<Reprojector> {
        let transform = match crs {
            SourceCrs::Geographic => None,
            SourceCrs::Projected(s) => {
                let src = Proj::from_proj_string(s).context(InvalidProjectionSnafu { proj: s.as_str() })?;
                let dst = Proj::from_proj_string(WGS84_PROJ)
                    .context(InvalidProjectionSnafu { proj: WGS84_PROJ })?;
                Some((src, dst))
            }
        };
        Ok(Reprojector { transform })
    }

    pub fn point(&self, c: Coord<f64>) -> EtlResult<Coord<f64>> {
        match &self.transform {
            None => Ok(c),
            Some((src, dst)) => {
                let mut p = (c.x, c.y, 0.0);
                proj4rs::transform::transform(src, dst, &mut p).context(ReprojectingSnafu {})?;
                Ok(Coord {
                    x: p.0.to_degrees(),
                    y: p.1.to_degrees(),
                })
            }
        }
    }

    pub fn to_wgs84(&self, mp: &MultiPolygon<f64>) -> EtlResult<MultiPolygon<f64>> {
        if self.transform.is_none() {
            return Ok(mp.clone());
        }
        mp.try_map_coords(|c| self.point(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    const GDL_ALBERS: &str = r#"PROJCS["NAD_1983_HARN_Florida_GDL_Albers",GEOGCS["GCS_North_American_1983_HARN",DATUM["D_North_American_1983_HARN",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Albers"],PARAMETER["False_Easting",400000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-84.0],PARAMETER["Standard_Parallel_1",24.0],PARAMETER["Standard_Parallel_2",31.5],PARAMETER["Latitude_Of_Origin",24.0],UNIT["Meter",1.0]]"#;

    const STATE_PLANE_EAST_FT: &str = r#"PROJCS["NAD_1983_StatePlane_Florida_East_FIPS_0901_Feet",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",656166.6666666665],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-81.0],PARAMETER["Scale_Factor",0.9999411764705882],PARAMETER["Latitude_Of_Origin",24.33333333333333],UNIT["Foot_US",0.3048006096012192]]"#;

    #[test]
    fn geographic_wkt() {
        let wkt = r#"GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
        assert_eq!(crs_from_wkt(wkt).unwrap(), SourceCrs::Geographic);
    }

    #[test]
    fn albers_wkt() {
        let crs = crs_from_wkt(GDL_ALBERS).unwrap();
        let s = match crs {
            SourceCrs::Projected(s) => s,
            x => panic!("unexpected {:?}", x),
        };
        assert!(s.starts_with("+proj=aea"));
        assert!(s.contains("+x_0=400000"));
        assert!(s.contains("+lat_1=24"));
        assert!(s.contains("+lat_2=31.5"));
        assert!(s.contains("+lon_0=-84"));
        assert!(s.contains("+ellps=GRS80"));
        assert!(s.contains("+units=m"));
    }

    #[test]
    fn feet_units_convert_false_easting() {
        let crs = crs_from_wkt(STATE_PLANE_EAST_FT).unwrap();
        let s = match crs {
            SourceCrs::Projected(s) => s,
            x => panic!("unexpected {:?}", x),
        };
        assert!(s.starts_with("+proj=tmerc"));
        assert!(s.contains("+to_meter=0.3048006096012192"));
        // 656166.67 US feet are 200000 meters.
        let x_0: f64 = s
            .split(' ')
            .find_map(|p| p.strip_prefix("+x_0="))
            .unwrap()
            .parse()
            .unwrap();
        assert!((x_0 - 200000.0).abs() < 0.01);
    }

    #[test]
    fn unsupported_wkt() {
        let wkt = r#"PROJCS["x",GEOGCS["y",DATUM["D",SPHEROID["GRS_1980",6378137.0,298.257222101]]],PROJECTION["Robinson"],UNIT["Meter",1.0]]"#;
        assert!(crs_from_wkt(wkt).is_err());
        assert!(crs_from_wkt("").is_err());
    }

    #[test]
    fn proj_override() {
        assert_eq!(
            SourceCrs::from_proj_string("+proj=longlat +datum=NAD83"),
            SourceCrs::Geographic
        );
        let tmp = tempfile::tempdir().unwrap();
        let shp = tmp.path().join("plan.shp");
        assert_eq!(source_crs(&shp, None).unwrap(), SourceCrs::Geographic);
        fs::write(shp.with_extension("prj"), GDL_ALBERS).unwrap();
        assert!(matches!(
            source_crs(&shp, None).unwrap(),
            SourceCrs::Projected(_)
        ));
        assert_eq!(
            source_crs(&shp, Some("+proj=latlong")).unwrap(),
            SourceCrs::Geographic
        );
    }

    #[test]
    fn albers_origin_maps_to_projection_center() {
        let crs = crs_from_wkt(GDL_ALBERS).unwrap();
        let rp = Reprojector::new(&crs).unwrap();
        // The false origin is at the central meridian on the latitude of origin.
        let c = rp.point(Coord { x: 400000.0, y: 0.0 }).unwrap();
        assert!((c.x - -84.0).abs() < 1e-6, "{:?}", c);
        assert!((c.y - 24.0).abs() < 1e-6, "{:?}", c);
    }

    #[test]
    fn geographic_passthrough() {
        let rp = Reprojector::new(&SourceCrs::Geographic).unwrap();
        let p: Polygon<f64> = polygon![(x: -82.0, y: 28.0), (x: -81.0, y: 28.0), (x: -81.0, y: 29.0)];
        let mp = MultiPolygon(vec![p]);
        assert_eq!(rp.to_wgs84(&mp).unwrap(), mp);
    }
}
