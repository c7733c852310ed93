// Quick look at the content of an export: which columns and which offices it carries.

use std::fmt::Write;
use std::path::Path;

use crate::etl::{io_encoding::Encoding, io_tsv::*, *};

const CONGRESSIONAL_TERMS: [&str; 4] = ["representative", "house", "congress", "district"];
const SAMPLE_COLUMNS: [&str; 6] = [
    "CountyName",
    "OfficeDesc",
    "Juris1num",
    "Juris2num",
    "CanNameLast",
    "CanVotes",
];

pub fn looks_congressional(office: &str) -> bool {
    let lower = office.to_lowercase();
    CONGRESSIONAL_TERMS.iter().any(|t| lower.contains(t))
}

fn format_rows(out: &mut String, table: &RawTable, columns: &[&str], rows: &[&csv::StringRecord]) {
    let cols: Vec<Option<usize>> = columns.iter().map(|c| table.column(c)).collect();
    let _ = writeln!(out, "  {}", columns.join(" | "));
    for r in rows {
        let cells: Vec<&str> = cols.iter().map(|c| table.cell(r, *c)).collect();
        let _ = writeln!(out, "  {}", cells.join(" | "));
    }
}

/// Builds the text report for an export.
pub fn report(table: &RawTable, encoding: Encoding) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Successfully read with {}", encoding.label());
    let _ = writeln!(out, "Columns in file: {:?}", table.headers);
    let _ = writeln!(
        out,
        "Shape: ({}, {})",
        table.rows.len(),
        table.headers.len()
    );

    let _ = writeln!(out, "\nFirst few rows:");
    let headers: Vec<&str> = table.headers.iter().map(|h| h.as_str()).collect();
    let first: Vec<&csv::StringRecord> = table.rows.iter().take(3).collect();
    format_rows(&mut out, table, &headers, &first);

    if table.column("OfficeDesc").is_none() {
        let _ = writeln!(out, "\nNo OfficeDesc column");
        return out;
    }
    let offices = table.unique_values("OfficeDesc");
    let _ = writeln!(out, "\nAll offices ({}):", offices.len());
    for o in offices.iter() {
        let _ = writeln!(out, " - {}", o);
    }

    let congressional: Vec<&String> = offices.iter().filter(|o| looks_congressional(o)).collect();
    let _ = writeln!(
        out,
        "\nCongressional offices found: {}",
        congressional.len()
    );
    for o in congressional.iter() {
        let _ = writeln!(out, " - {}", o);
    }

    if let Some(office) = congressional.first() {
        let col = table.column("OfficeDesc");
        let sample: Vec<&csv::StringRecord> = table
            .rows
            .iter()
            .filter(|r| table.cell(r, col) == office.as_str())
            .take(5)
            .collect();
        let _ = writeln!(out, "\nSample data for {}:", office);
        format_rows(&mut out, table, &SAMPLE_COLUMNS, &sample);
    }
    out
}

pub fn run_inspect(path: &Path, encodings: &[Encoding]) -> BEtlResult<()> {
    let (table, enc) = read_table(path, encodings)?;
    print!("{}", report(&table, enc));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn congressional_terms() {
        assert!(looks_congressional("United States Representative"));
        assert!(looks_congressional("State Representative"));
        assert!(looks_congressional("School Board Member, District 3"));
        assert!(!looks_congressional("Governor and Lieutenant Governor"));
    }

    #[test]
    fn report_lists_offices_and_sample() {
        let text = "CountyName\tOfficeDesc\tJuris1num\tJuris2num\tCanNameLast\tCanVotes
Leon\tGovernor\t\t\tCrist\t10
Leon\tUnited States Representative\t002\t\tDunn\t20
Wakulla\tUnited States Representative\t002\t\tDunn\t5
";
        let table = parse_tsv(text).unwrap();
        let r = report(&table, Encoding::Utf8);
        assert!(r.contains("Successfully read with utf-8"));
        assert!(r.contains("Shape: (3, 6)"));
        assert!(r.contains("All offices (2):"));
        assert!(r.contains("Congressional offices found: 1"));
        assert!(r.contains("Sample data for United States Representative:"));
        assert!(r.contains("Wakulla | United States Representative | 002 |  | Dunn | 5"));
    }
}
