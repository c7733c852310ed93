// Primitives for reading the tab-separated election exports.

use std::path::Path;

use csv::StringRecord;
use fl_tally::ElectionRow;

use crate::etl::{io_encoding::*, *};

/// The raw content of an export: the header and all the lines, as strings.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<StringRecord>,
}

impl RawTable {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    /// The value of a cell, or "" if the column is missing or the line is too short.
    pub fn cell<'a>(&self, row: &'a StringRecord, col: Option<usize>) -> &'a str {
        col.and_then(|idx| row.get(idx)).unwrap_or("").trim()
    }

    /// The distinct values of a column, sorted.
    pub fn unique_values(&self, name: &str) -> Vec<String> {
        let col = self.column(name);
        let mut values: Vec<String> = self
            .rows
            .iter()
            .map(|r| self.cell(r, col).to_string())
            .collect();
        values.sort();
        values.dedup();
        values
    }
}

pub fn parse_tsv(text: &str) -> Result<RawTable, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows: Vec<StringRecord> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        let line = line_r?;
        // Trailing blank lines in some of the exports
        if line.iter().all(|c| c.trim().is_empty()) {
            debug!("parse_tsv: skipping empty line {}", idx + 2);
            continue;
        }
        rows.push(line);
    }
    Ok(RawTable { headers, rows })
}

/// Parses the vote count of a candidate. Blank cells count as zero.
pub fn parse_votes(s: &str) -> u64 {
    let s = s.trim();
    if s.is_empty() {
        return 0;
    }
    if let Ok(x) = s.parse::<u64>() {
        return x;
    }
    match s.parse::<f64>() {
        // Fractional counts are truncated.
        Ok(x) if x.is_finite() && x >= 0.0 => x.trunc() as u64,
        _ => {
            warn!("parse_votes: invalid vote count {:?}, counting 0", s);
            0
        }
    }
}

pub fn parse_jurisdiction(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(x) = s.parse::<u32>() {
        return Some(x);
    }
    match s.parse::<f64>() {
        Ok(x) if x >= 0.0 && x.fract() == 0.0 && x <= u32::MAX as f64 => Some(x as u32),
        _ => None,
    }
}

pub fn election_rows(table: &RawTable) -> Vec<ElectionRow> {
    let county_code = table.column("CountyCode");
    let county_name = table.column("CountyName");
    let race_code = table.column("RaceCode");
    let office_desc = table.column("OfficeDesc");
    let party_code = table.column("PartyCode");
    let first = table.column("CanNameFirst");
    let last = table.column("CanNameLast");
    let votes = table.column("CanVotes");
    let juris1 = table.column("Juris1num");
    for (name, col) in [
        ("CountyName", county_name),
        ("OfficeDesc", office_desc),
        ("PartyCode", party_code),
        ("CanVotes", votes),
    ] {
        if col.is_none() {
            warn!("election_rows: missing column {}", name);
        }
    }

    table
        .rows
        .iter()
        .map(|r| ElectionRow {
            county_code: table.cell(r, county_code).to_string(),
            county_name: table.cell(r, county_name).to_string(),
            race_code: table.cell(r, race_code).to_string(),
            office_desc: table.cell(r, office_desc).to_string(),
            party_code: table.cell(r, party_code).to_string(),
            candidate_first: table.cell(r, first).to_string(),
            candidate_last: table.cell(r, last).to_string(),
            votes: parse_votes(table.cell(r, votes)),
            juris1: parse_jurisdiction(table.cell(r, juris1)),
        })
        .collect()
}

pub fn read_table(path: &Path, encodings: &[Encoding]) -> BEtlResult<(RawTable, Encoding)> {
    let (text, enc) = read_with_fallback(path, encodings)?;
    let table = parse_tsv(&text).context(TsvParseSnafu {
        path: path.display().to_string(),
    })?;
    info!(
        "Read {} rows from {} ({})",
        table.rows.len(),
        path.display(),
        enc.label()
    );
    Ok((table, enc))
}

pub fn read_election_rows(path: &Path, encodings: &[Encoding]) -> BEtlResult<Vec<ElectionRow>> {
    let (table, _) = read_table(path, encodings)?;
    Ok(election_rows(&table))
}
