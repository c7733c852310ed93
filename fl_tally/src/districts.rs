// Demographic summaries of the redistricting plans.

use log::{debug, warn};
use serde::Serialize;
use std::collections::HashMap;

use crate::TallyError;

/// The Florida average population of a congressional district, used when a plan does not
/// carry a population column.
pub const DEFAULT_DISTRICT_POPULATION: u64 = 769221;

const DISTRICT_FIELDS: [&str; 3] = ["DISTRICT", "District", "CD"];
const LONGNAME_FIELDS: [&str; 2] = ["LONGNAME", "NAME"];
const SHORTNAME_FIELDS: [&str; 2] = ["SHORTNAME", "SHORT"];
const POPULATION_FIELDS: [&str; 5] = ["TOTAL", "TOTALPOP", "TOTAL_POP", "total_population", "TOT_POP"];
const WHITE_VAP_FIELDS: [&str; 4] = ["SRWVAP_P", "WHITE_VAP_PCT", "WHITEVAP_PCT", "WHT_VAP_PCT"];
const BLACK_VAP_FIELDS: [&str; 5] = [
    "NHBVAP_P",
    "BVAP_P",
    "BLACK_VAP_PCT",
    "BLACKVAP_PCT",
    "BLK_VAP_PCT",
];
const HISPANIC_VAP_FIELDS: [&str; 4] = ["HVAP_P", "HISPANIC_VAP_PCT", "HISPVAP_PCT", "HISP_VAP_PCT"];

/// The plan a shapefile belongs to.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum DistrictKind {
    Congressional,
    StateHouse,
    StateSenate,
}

impl DistrictKind {
    pub fn parse(s: &str) -> Option<DistrictKind> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "congressional" | "congress" | "us_house" => Some(DistrictKind::Congressional),
            "state_house" | "house" => Some(DistrictKind::StateHouse),
            "state_senate" | "senate" => Some(DistrictKind::StateSenate),
            _ => None,
        }
    }

    /// The base name of the output files (without extension).
    pub fn output_stem(&self) -> &'static str {
        match self {
            DistrictKind::Congressional => "fl_congressional_districts",
            DistrictKind::StateHouse => "fl_state_house_districts",
            DistrictKind::StateSenate => "fl_state_senate_districts",
        }
    }
}

/// The value of a column of the attribute table.
#[derive(PartialEq, Debug, Clone)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Missing,
}

impl AttributeValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(x) if x.is_finite() => Some(*x),
            AttributeValue::Text(s) => s.trim().parse::<f64>().ok().filter(|x| x.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            AttributeValue::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            AttributeValue::Number(x) if x.fract() == 0.0 => Some(format!("{}", *x as i64)),
            AttributeValue::Number(x) => Some(x.to_string()),
            _ => None,
        }
    }
}

pub type Attributes = HashMap<String, AttributeValue>;

/// One row of the district demographics table.
#[derive(PartialEq, Debug, Clone, Serialize)]
pub struct DistrictRecord {
    pub district: u32,
    pub longname: String,
    pub shortname: String,
    pub total_population: u64,
    pub white_vap_pct: f64,
    pub black_vap_pct: f64,
    pub hispanic_vap_pct: f64,
}

fn first_value<'a, T>(
    attrs: &'a Attributes,
    fields: &[&str],
    f: impl Fn(&'a AttributeValue) -> Option<T>,
) -> Option<T> {
    fields.iter().find_map(|name| attrs.get(*name).and_then(&f))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl DistrictRecord {
    pub fn from_attributes(attrs: &Attributes) -> Result<DistrictRecord, TallyError> {
        let district = first_value(attrs, &DISTRICT_FIELDS, |v| v.as_f64())
            .filter(|x| *x >= 0.0 && x.fract() == 0.0)
            .map(|x| x as u32)
            .ok_or(TallyError::MissingDistrictId)?;
        let longname = first_value(attrs, &LONGNAME_FIELDS, |v| v.as_text())
            .unwrap_or_else(|| format!("District {}", district));
        let shortname = first_value(attrs, &SHORTNAME_FIELDS, |v| v.as_text())
            .unwrap_or_else(|| format!("D{}", district));
        let total_population = first_value(attrs, &POPULATION_FIELDS, |v| v.as_f64())
            .filter(|x| *x >= 0.0)
            .map(|x| x.round() as u64)
            .unwrap_or_else(|| {
                debug!(
                    "from_attributes: district {}: no population column, using the default",
                    district
                );
                DEFAULT_DISTRICT_POPULATION
            });
        let pct = |fields: &[&str]| {
            first_value(attrs, fields, |v| v.as_f64())
                .map(round2)
                .unwrap_or(0.0)
        };
        Ok(DistrictRecord {
            district,
            longname,
            shortname,
            total_population,
            white_vap_pct: pct(&WHITE_VAP_FIELDS[..]),
            black_vap_pct: pct(&BLACK_VAP_FIELDS[..]),
            hispanic_vap_pct: pct(&HISPANIC_VAP_FIELDS[..]),
        })
    }
}

/// Builds the table for a whole plan, sorted by district.
///
/// Features without a district number are skipped.
pub fn district_records<'a>(features: impl IntoIterator<Item = &'a Attributes>) -> Vec<DistrictRecord> {
    let mut res: Vec<DistrictRecord> = Vec::new();
    for (idx, attrs) in features.into_iter().enumerate() {
        match DistrictRecord::from_attributes(attrs) {
            Ok(r) => res.push(r),
            Err(e) => warn!("district_records: feature {}: {}", idx, e),
        }
    }
    res.sort_by_key(|r| r.district);
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn num(x: f64) -> AttributeValue {
        AttributeValue::Number(x)
    }

    fn text(s: &str) -> AttributeValue {
        AttributeValue::Text(s.to_string())
    }

    #[test]
    fn legislature_plan_columns() {
        let a = attrs(&[
            ("DISTRICT", num(7.0)),
            ("LONGNAME", text("Congressional District 7")),
            ("SHORTNAME", text("CD 7")),
            ("TOTAL", num(769221.0)),
            ("SRWVAP_P", num(61.2345)),
            ("NHBVAP_P", num(10.006)),
            ("HVAP_P", num(19.999)),
        ]);
        let r = DistrictRecord::from_attributes(&a).unwrap();
        assert_eq!(
            r,
            DistrictRecord {
                district: 7,
                longname: "Congressional District 7".to_string(),
                shortname: "CD 7".to_string(),
                total_population: 769221,
                white_vap_pct: 61.23,
                black_vap_pct: 10.01,
                hispanic_vap_pct: 20.0,
            }
        );
    }

    #[test]
    fn fallback_columns_and_defaults() {
        let a = attrs(&[
            ("CD", text("12")),
            ("NAME", AttributeValue::Missing),
            ("BVAP_P", num(33.3)),
            ("TARGET_DEV", num(0.0)),
        ]);
        let r = DistrictRecord::from_attributes(&a).unwrap();
        assert_eq!(r.district, 12);
        assert_eq!(r.longname, "District 12");
        assert_eq!(r.shortname, "D12");
        assert_eq!(r.total_population, DEFAULT_DISTRICT_POPULATION);
        assert_eq!(r.white_vap_pct, 0.0);
        assert_eq!(r.black_vap_pct, 33.3);
        assert_eq!(r.hispanic_vap_pct, 0.0);
    }

    #[test]
    fn missing_district_is_an_error() {
        let a = attrs(&[("LONGNAME", text("Nowhere"))]);
        assert_eq!(
            DistrictRecord::from_attributes(&a),
            Err(TallyError::MissingDistrictId)
        );
        let b = attrs(&[("DISTRICT", text("abc"))]);
        assert!(DistrictRecord::from_attributes(&b).is_err());
    }

    #[test]
    fn records_are_sorted_and_invalid_skipped() {
        let features = vec![
            attrs(&[("DISTRICT", num(3.0))]),
            attrs(&[("DISTRICT", num(1.0))]),
            attrs(&[("LONGNAME", text("no id"))]),
            attrs(&[("DISTRICT", num(2.0))]),
        ];
        let ids: Vec<u32> = district_records(features.iter())
            .iter()
            .map(|r| r.district)
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn kinds() {
        assert_eq!(
            DistrictKind::parse("state-house"),
            Some(DistrictKind::StateHouse)
        );
        assert_eq!(
            DistrictKind::parse("Congressional"),
            Some(DistrictKind::Congressional)
        );
        assert_eq!(DistrictKind::parse("county"), None);
        assert_eq!(
            DistrictKind::StateSenate.output_stem(),
            "fl_state_senate_districts"
        );
    }

    #[test]
    fn attribute_text() {
        assert_eq!(num(4.0).as_text(), Some("4".to_string()));
        assert_eq!(text("  ").as_text(), None);
        assert_eq!(text(" 4.5 ").as_f64(), Some(4.5));
        assert_eq!(AttributeValue::Missing.as_f64(), None);
    }
}
