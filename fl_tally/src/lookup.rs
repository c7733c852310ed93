use std::collections::BTreeMap;

use crate::ElectionRow;

/// Candidate names by contest, year, county and party.
///
/// This is the table loaded by the map front-end to label the county results. Keys are
/// normalized to upper case, so `pre`/`PRE` and `ala`/`ALA` refer to the same entry.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CandidateLookup {
    candidates: BTreeMap<(String, String, String, String), String>,
}

/// One entry of the lookup table, in the column order of the exported file.
#[derive(Eq, PartialEq, Debug, Clone, serde::Serialize)]
pub struct CandidateEntry {
    pub contest: String,
    pub year: String,
    pub county_code: String,
    pub party: String,
    pub candidate: String,
}

fn key(contest: &str, year: &str, county: &str, party: &str) -> (String, String, String, String) {
    (
        contest.trim().to_uppercase(),
        year.trim().to_string(),
        county.trim().to_uppercase(),
        party.trim().to_uppercase(),
    )
}

impl CandidateLookup {
    pub fn new() -> CandidateLookup {
        CandidateLookup::default()
    }

    /// Registers a candidate. The first name registered for a key is kept.
    /// Returns true if the entry was new.
    pub fn insert(&mut self, contest: &str, year: &str, county: &str, party: &str, candidate: &str) -> bool {
        let k = key(contest, year, county, party);
        if self.candidates.contains_key(&k) || candidate.trim().is_empty() {
            return false;
        }
        self.candidates.insert(k, candidate.trim().to_string());
        true
    }

    pub fn get(&self, contest: &str, year: &str, county: &str, party: &str) -> Option<&str> {
        self.candidates
            .get(&key(contest, year, county, party))
            .map(|s| s.as_str())
    }

    /// Adds the candidates of one election file.
    pub fn add_rows(&mut self, year: &str, rows: &[ElectionRow]) {
        for r in rows.iter().filter(|r| !r.race_code.trim().is_empty()) {
            self.insert(
                &r.race_code,
                year,
                &r.county_code,
                &r.party_code,
                &r.candidate_name(),
            );
        }
    }

    /// All the entries, sorted by contest, year, county and party.
    pub fn entries(&self) -> Vec<CandidateEntry> {
        self.candidates
            .iter()
            .map(|((contest, year, county_code, party), candidate)| CandidateEntry {
                contest: contest.clone(),
                year: year.clone(),
                county_code: county_code.clone(),
                party: party.clone(),
                candidate: candidate.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_keys() {
        let mut lookup = CandidateLookup::new();
        assert!(lookup.insert("pre", "2024", "ala", "dem", "Kamala Harris"));
        assert_eq!(lookup.get("PRE", "2024", "ALA", "DEM"), Some("Kamala Harris"));
        assert_eq!(lookup.get("PRE", "2020", "ALA", "DEM"), None);
        // First one wins.
        assert!(!lookup.insert("PRE", "2024", "ALA", "DEM", "Someone Else"));
        assert_eq!(lookup.get("pre", "2024", "ala", "dem"), Some("Kamala Harris"));
        assert!(!lookup.insert("PRE", "2024", "BAK", "DEM", "  "));
        assert_eq!(lookup.len(), 1);
    }

    #[test]
    fn from_rows_and_back() {
        let row = |county: &str, party: &str, first: &str, last: &str| ElectionRow {
            county_code: county.to_string(),
            county_name: String::new(),
            race_code: "GOV".to_string(),
            office_desc: "Governor and Lieutenant Governor".to_string(),
            party_code: party.to_string(),
            candidate_first: first.to_string(),
            candidate_last: last.to_string(),
            votes: 1,
            juris1: None,
        };
        let mut lookup = CandidateLookup::new();
        lookup.add_rows(
            "2022",
            &[
                row("LEO", "REP", "Ron", "DeSantis"),
                row("LEO", "DEM", "Charlie", "Crist"),
                row("ALA", "DEM", "Charlie", "Crist"),
            ],
        );
        let entries = lookup.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].county_code, "ALA");
        assert_eq!(entries[1].party, "DEM");
        assert_eq!(entries[2].candidate, "Ron DeSantis");
        assert_eq!(lookup.get("gov", "2022", "leo", "rep"), Some("Ron DeSantis"));
    }
}
