mod config;
pub mod contests;
pub mod districts;
pub mod lookup;

use log::{debug, info};
use serde::Serialize;

use std::collections::{BTreeMap, HashMap};
use std::ops::AddAssign;

pub use crate::config::*;

// ********* Input data structures ***********

/// One line of a Division of Elections results export.
///
/// Each line is the vote count of one candidate in one county for one race.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ElectionRow {
    pub county_code: String,
    pub county_name: String,
    pub race_code: String,
    pub office_desc: String,
    pub party_code: String,
    pub candidate_first: String,
    pub candidate_last: String,
    pub votes: u64,
    /// The first jurisdiction number. For the US House races, this is the district.
    pub juris1: Option<u32>,
}

impl ElectionRow {
    pub fn candidate_name(&self) -> String {
        format!("{} {}", self.candidate_first, self.candidate_last)
            .trim()
            .to_string()
    }

    pub fn party(&self) -> Party {
        Party::from_code(&self.party_code)
    }
}

/// Extracts the year from an export file name such as `11052024Election.txt`.
pub fn year_from_file_name(file_name: &str) -> Result<String, TallyError> {
    let invalid = || TallyError::InvalidElectionFileName(file_name.to_string());
    let date_part = file_name.strip_suffix("Election.txt").ok_or_else(invalid)?;
    let year = date_part.get(4..8).ok_or_else(invalid)?;
    if year.chars().all(|c| c.is_ascii_digit()) {
        Ok(year.to_string())
    } else {
        Err(invalid())
    }
}

/// Normalizes the county names so that they match the names in the map layers.
pub fn normalize_county_name(county_name: &str) -> String {
    let name = county_name.trim();
    match name {
        "Dade" | "Miami-Dade" => "Miami-Dade".to_string(),
        x => x.to_string(),
    }
}

// ********* Aggregation ***********

/// Votes for one office in one geographic unit.
///
/// `total` includes all the parties, not only the two major ones.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct PartyTally {
    pub dem: u64,
    pub rep: u64,
    pub total: u64,
}

impl PartyTally {
    pub fn add(&mut self, party: &Party, votes: u64) {
        match party {
            Party::Democratic => self.dem += votes,
            Party::Republican => self.rep += votes,
            Party::Other(_) => {}
        }
        self.total += votes;
    }
}

impl AddAssign for PartyTally {
    fn add_assign(&mut self, rhs: PartyTally) {
        self.dem += rhs.dem;
        self.rep += rhs.rep;
        self.total += rhs.total;
    }
}

/// A row of the county results table.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct CountyRecord {
    pub year: String,
    pub county: String,
    pub president_dem: u64,
    pub president_rep: u64,
    pub president_total: u64,
    pub governor_dem: u64,
    pub governor_rep: u64,
    pub governor_total: u64,
    pub us_senate_dem: u64,
    pub us_senate_rep: u64,
    pub us_senate_total: u64,
    pub us_house_dem: u64,
    pub us_house_rep: u64,
    pub us_house_total: u64,
    pub state_senate_dem: u64,
    pub state_senate_rep: u64,
    pub state_senate_total: u64,
    pub state_house_dem: u64,
    pub state_house_rep: u64,
    pub state_house_total: u64,
}

impl CountyRecord {
    fn build(year: &str, county: &str, offices: &HashMap<Office, PartyTally>) -> CountyRecord {
        let get = |o: Office| offices.get(&o).cloned().unwrap_or_default();
        let (pres, gov, uss, usr, sen, rep) = (
            get(Office::President),
            get(Office::Governor),
            get(Office::UsSenate),
            get(Office::UsHouse),
            get(Office::StateSenate),
            get(Office::StateHouse),
        );
        CountyRecord {
            year: year.to_string(),
            county: county.to_string(),
            president_dem: pres.dem,
            president_rep: pres.rep,
            president_total: pres.total,
            governor_dem: gov.dem,
            governor_rep: gov.rep,
            governor_total: gov.total,
            us_senate_dem: uss.dem,
            us_senate_rep: uss.rep,
            us_senate_total: uss.total,
            us_house_dem: usr.dem,
            us_house_rep: usr.rep,
            us_house_total: usr.total,
            state_senate_dem: sen.dem,
            state_senate_rep: sen.rep,
            state_senate_total: sen.total,
            state_house_dem: rep.dem,
            state_house_rep: rep.rep,
            state_house_total: rep.total,
        }
    }
}

/// A row of the congressional district results table.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct CongressionalRecord {
    pub year: String,
    pub district: u32,
    pub us_house_dem: u64,
    pub us_house_rep: u64,
    pub us_house_total: u64,
}

/// Accumulates the votes of several elections, by county and by congressional district.
#[derive(Debug, Clone, Default)]
pub struct CountyAggregator {
    // (year, county) -> office -> tally
    counties: BTreeMap<(String, String), HashMap<Office, PartyTally>>,
    // (year, district) -> US House tally
    districts: BTreeMap<(String, u32), PartyTally>,
}

impl CountyAggregator {
    pub fn new() -> CountyAggregator {
        CountyAggregator::default()
    }

    /// Adds one row. Returns the office it was counted for, if any.
    pub fn add_row(&mut self, year: &str, row: &ElectionRow) -> Option<Office> {
        let office = classify_office(&row.office_desc)?;
        let party = row.party();
        if office == Office::UsHouse {
            match row.juris1 {
                Some(district) if district > 0 => {
                    self.districts
                        .entry((year.to_string(), district))
                        .or_default()
                        .add(&party, row.votes);
                }
                x => {
                    debug!(
                        "add_row: no congressional district for {:?} in {} ({:?})",
                        row.candidate_name(),
                        row.county_name,
                        x
                    );
                }
            }
        }
        self.counties
            .entry((year.to_string(), row.county_name.trim().to_string()))
            .or_default()
            .entry(office)
            .or_default()
            .add(&party, row.votes);
        Some(office)
    }

    /// Adds all the rows of one election. Returns the number of rows that were counted.
    pub fn add_rows(&mut self, year: &str, rows: &[ElectionRow]) -> usize {
        let counted = rows
            .iter()
            .filter(|row| self.add_row(year, row).is_some())
            .count();
        info!(
            "add_rows: year {}: {} of {} rows matched a tracked office",
            year,
            counted,
            rows.len()
        );
        counted
    }

    /// The county table, ordered by year and county.
    pub fn county_records(&self) -> Vec<CountyRecord> {
        self.counties
            .iter()
            .map(|((year, county), offices)| CountyRecord::build(year, county, offices))
            .collect()
    }

    /// The congressional table, ordered by year and district.
    pub fn congressional_records(&self) -> Vec<CongressionalRecord> {
        self.districts
            .iter()
            .map(|((year, district), t)| CongressionalRecord {
                year: year.clone(),
                district: *district,
                us_house_dem: t.dem,
                us_house_rep: t.rep,
                us_house_total: t.total,
            })
            .collect()
    }

    /// The distinct years seen so far, sorted.
    pub fn years(&self) -> Vec<String> {
        let mut years: Vec<String> = self.counties.keys().map(|(y, _)| y.clone()).collect();
        years.dedup();
        years
    }

    /// The statewide tally of one office for one year.
    pub fn statewide(&self, year: &str, office: Office) -> PartyTally {
        let mut res = PartyTally::default();
        for ((y, _), offices) in self.counties.iter() {
            if y == year {
                if let Some(t) = offices.get(&office) {
                    res += *t;
                }
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(county: &str, office: &str, party: &str, votes: u64, juris1: Option<u32>) -> ElectionRow {
        ElectionRow {
            county_code: county[..3].to_uppercase(),
            county_name: county.to_string(),
            race_code: String::new(),
            office_desc: office.to_string(),
            party_code: party.to_string(),
            candidate_first: "A".to_string(),
            candidate_last: "B".to_string(),
            votes,
            juris1,
        }
    }

    #[test]
    fn year_from_names() {
        assert_eq!(year_from_file_name("11052024Election.txt"), Ok("2024".to_string()));
        assert_eq!(year_from_file_name("11042008Election.txt"), Ok("2008".to_string()));
        assert!(year_from_file_name("results.txt").is_err());
        assert!(year_from_file_name("110Election.txt").is_err());
        assert!(year_from_file_name("1105abcdElection.txt").is_err());
    }

    #[test]
    fn county_names() {
        assert_eq!(normalize_county_name("Dade"), "Miami-Dade");
        assert_eq!(normalize_county_name(" Miami-Dade "), "Miami-Dade");
        assert_eq!(normalize_county_name("Alachua "), "Alachua");
    }

    #[test]
    fn candidate_name_is_trimmed() {
        let mut r = row("Leon", "Governor", "DEM", 1, None);
        r.candidate_first = "".to_string();
        r.candidate_last = "Smith".to_string();
        assert_eq!(r.candidate_name(), "Smith");
    }

    #[test]
    fn sums_by_party_and_office() {
        let _ = env_logger::try_init();
        let rows = vec![
            row("Alachua", "President of the United States", "DEM", 100, None),
            row("Alachua", "President of the United States", "REP", 80, None),
            row("Alachua", "President of the United States", "LPF", 5, None),
            row("Alachua", "President of the United States", "DEM", 10, None),
            row("Alachua", "Attorney General", "DEM", 1000, None),
            row("Baker", "Governor", "REP", 30, None),
        ];
        let mut agg = CountyAggregator::new();
        assert_eq!(agg.add_rows("2020", &rows), 5);

        let records = agg.county_records();
        assert_eq!(records.len(), 2);
        let alachua = &records[0];
        assert_eq!(alachua.county, "Alachua");
        assert_eq!(alachua.president_dem, 110);
        assert_eq!(alachua.president_rep, 80);
        assert_eq!(alachua.president_total, 195);
        assert_eq!(alachua.governor_total, 0);
        let baker = &records[1];
        assert_eq!(baker.governor_rep, 30);
        assert_eq!(baker.governor_total, 30);
        assert_eq!(baker.president_total, 0);
    }

    #[test]
    fn congressional_districts() {
        let rows = vec![
            row("Leon", "United States Representative", "DEM", 50, Some(2)),
            row("Wakulla", "United States Representative", "DEM", 20, Some(2)),
            row("Wakulla", "United States Representative", "REP", 40, Some(2)),
            row("Duval", "United States Representative", "REP", 70, Some(4)),
            row("Duval", "United States Representative", "NPA", 3, Some(4)),
            // No district: counted in the county table only.
            row("Duval", "United States Representative", "DEM", 9, None),
            row("Duval", "United States Representative", "DEM", 9, Some(0)),
        ];
        let mut agg = CountyAggregator::new();
        agg.add_rows("2022", &rows);
        let cds = agg.congressional_records();
        assert_eq!(
            cds,
            vec![
                CongressionalRecord {
                    year: "2022".to_string(),
                    district: 2,
                    us_house_dem: 70,
                    us_house_rep: 40,
                    us_house_total: 110,
                },
                CongressionalRecord {
                    year: "2022".to_string(),
                    district: 4,
                    us_house_dem: 0,
                    us_house_rep: 70,
                    us_house_total: 73,
                },
            ]
        );
        let duval = agg
            .county_records()
            .into_iter()
            .find(|r| r.county == "Duval")
            .unwrap();
        assert_eq!(duval.us_house_dem, 18);
        assert_eq!(duval.us_house_total, 91);
    }

    #[test]
    fn multiple_years_and_statewide() {
        let mut agg = CountyAggregator::new();
        agg.add_rows("2018", &[row("Leon", "Governor", "DEM", 5, None)]);
        agg.add_rows(
            "2022",
            &[
                row("Leon", "Governor", "DEM", 7, None),
                row("Duval", "Governor", "DEM", 3, None),
                row("Duval", "Governor", "REP", 4, None),
            ],
        );
        assert_eq!(agg.years(), vec!["2018".to_string(), "2022".to_string()]);
        assert_eq!(
            agg.statewide("2022", Office::Governor),
            PartyTally {
                dem: 10,
                rep: 4,
                total: 14
            }
        );
        let years: Vec<String> = agg.county_records().into_iter().map(|r| r.year).collect();
        assert_eq!(years, vec!["2018", "2022", "2022"]);
    }

    #[test]
    fn unclassified_county_has_no_record() {
        let mut agg = CountyAggregator::new();
        agg.add_rows("2016", &[row("Gulf", "School Board Member", "DEM", 5, None)]);
        assert!(agg.county_records().is_empty());
        assert!(agg.years().is_empty());
    }
}
