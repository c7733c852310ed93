//! Contest summaries, as consumed by the political map.
//!
//! The structure is keyed by year, then by race code, then by contest:
//!
//! ```json
//! {"results_by_year": {"2024": {"pre": {"pre_2024_1": {"results": {
//!     "Alachua_ALA_PRE": {"precinct": "Alachua_ALA_PRE", "county": "Alachua", ...}
//! }}}}}}
//! ```
//!
//! The data is county level, so every county gets a synthetic precinct id.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::lookup::CandidateLookup;
use crate::{normalize_county_name, ElectionRow, Office, Party};

/// The two-party result of one contest in one county.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CountyContestResult {
    pub precinct: String,
    pub county: String,
    pub dem_votes: u64,
    pub rep_votes: u64,
    /// Only the two major parties are counted here.
    pub total_votes: u64,
    pub dem_candidate: String,
    pub rep_candidate: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct Contest {
    pub results: BTreeMap<String, CountyContestResult>,
}

/// contest key -> contest
pub type RaceContests = BTreeMap<String, Contest>;
/// race code (lowercase) -> contests
pub type YearContests = BTreeMap<String, RaceContests>;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ElectionSummary {
    pub results_by_year: BTreeMap<String, YearContests>,
}

pub fn contest_key(race_code: &str, year: &str) -> String {
    format!("{}_{}_1", race_code.to_lowercase(), year)
}

impl ElectionSummary {
    pub fn new() -> ElectionSummary {
        ElectionSummary::default()
    }

    /// Adds all the rows of one election file.
    ///
    /// A later file for the same year and race replaces the earlier contest.
    pub fn add_election(&mut self, year: &str, rows: &[ElectionRow]) {
        // race code -> county code -> rows, in file order
        let mut by_race: BTreeMap<&str, BTreeMap<&str, Vec<&ElectionRow>>> = BTreeMap::new();
        for row in rows.iter().filter(|r| !r.race_code.trim().is_empty()) {
            by_race
                .entry(row.race_code.trim())
                .or_default()
                .entry(row.county_code.trim())
                .or_default()
                .push(row);
        }

        let mut candidates = CandidateLookup::new();
        candidates.add_rows(year, rows);

        let year_contests = self.results_by_year.entry(year.to_string()).or_default();
        for (race_code, counties) in by_race {
            debug!(
                "add_election: {} {}: {} ({} counties)",
                year,
                race_code,
                counties
                    .values()
                    .next()
                    .and_then(|rs| rs.first())
                    .map(|r| r.office_desc.as_str())
                    .unwrap_or(""),
                counties.len()
            );
            let mut contest = Contest::default();
            for (county_code, county_rows) in counties {
                let mut res = county_result(race_code, county_code, &county_rows);
                let name = |party: &str| {
                    candidates
                        .get(race_code, year, county_code, party)
                        .unwrap_or("")
                        .to_string()
                };
                res.dem_candidate = name("DEM");
                res.rep_candidate = name("REP");
                contest.results.insert(res.precinct.clone(), res);
            }
            year_contests
                .entry(race_code.to_lowercase())
                .or_default()
                .insert(contest_key(race_code, year), contest);
        }
    }

    pub fn years(&self) -> Vec<&String> {
        self.results_by_year.keys().collect()
    }

    pub fn contest(&self, year: &str, race_code: &str) -> Option<&Contest> {
        self.results_by_year
            .get(year)?
            .get(&race_code.to_lowercase())?
            .get(&contest_key(race_code, year))
    }

    /// The contests of the tracked offices for one year, in the order of `Office::ALL`.
    pub fn office_contests(&self, year: &str) -> Vec<(Office, &Contest)> {
        let mut res: Vec<(Office, &Contest)> = self
            .results_by_year
            .get(year)
            .into_iter()
            .flat_map(|races| races.keys())
            .filter_map(|race| Some((Office::from_race_code(race)?, self.contest(year, race)?)))
            .collect();
        res.sort_by_key(|(office, _)| Office::ALL.iter().position(|o| o == office));
        res
    }
}

fn county_result(race_code: &str, county_code: &str, rows: &[&ElectionRow]) -> CountyContestResult {
    let county = rows
        .first()
        .map(|r| normalize_county_name(&r.county_name))
        .unwrap_or_default();
    let precinct = format!("{}_{}_{}", county, county_code, race_code);
    let mut dem_votes: u64 = 0;
    let mut rep_votes: u64 = 0;
    for r in rows {
        match r.party() {
            Party::Democratic => dem_votes += r.votes,
            Party::Republican => rep_votes += r.votes,
            Party::Other(_) => {}
        }
    }
    // The candidate names are filled from the lookup of the whole file.
    CountyContestResult {
        precinct,
        county,
        dem_votes,
        rep_votes,
        total_votes: dem_votes + rep_votes,
        dem_candidate: String::new(),
        rep_candidate: String::new(),
    }
}
