use log::{debug, info, warn};

use fl_tally::contests::ElectionSummary;
use fl_tally::districts::district_records;
use fl_tally::lookup::CandidateLookup;
use fl_tally::{year_from_file_name, CountyAggregator, ElectionRow, Office};
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Command};
use crate::etl::config_reader::*;
use crate::etl::io_crs::{source_crs, Reprojector};
use crate::etl::io_encoding::parse_encodings;
use crate::etl::io_output::*;
use crate::etl::io_shapefile::read_features;
use crate::etl::io_tsv::read_election_rows;

pub mod config_reader;
pub mod inspect;
pub mod io_crs;
pub mod io_encoding;
pub mod io_output;
pub mod io_shapefile;
pub mod io_tsv;

pub const COUNTY_RESULTS_FILE: &str = "fl_county_election_results.csv";
pub const CONGRESSIONAL_RESULTS_FILE: &str = "fl_congressional_election_results.csv";
pub const CONTESTS_FILE: &str = "fl_election.json";
pub const CANDIDATES_FILE: &str = "fl_candidate_lookup.csv";

#[derive(Debug, Snafu)]
pub enum EtlError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error listing directory {path}"))]
    ReadingDirectory {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Could not decode {path} with any of the encodings {encodings}"))]
    EncodingUnsupported { path: String, encodings: String },
    #[snafu(display("Unknown encoding {label:?}"))]
    UnknownEncoding { label: String },
    #[snafu(display("Error parsing tab-separated file {path}"))]
    TsvParse { source: csv::Error, path: String },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing JSON"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error reading shapefile {path}"))]
    ReadingShapefile {
        source: shapefile::Error,
        path: String,
    },
    #[snafu(display("Invalid projection {proj:?}"))]
    InvalidProjection {
        source: proj4rs::errors::Error,
        proj: String,
    },
    #[snafu(display("Error reprojecting coordinates"))]
    Reprojecting { source: proj4rs::errors::Error },
    #[snafu(display("Unknown district kind {kind:?} (expected congressional, state_house or state_senate)"))]
    UnknownDistrictKind { kind: String },
    #[snafu(display("No parent directory for {path}"))]
    MissingParentDir { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type EtlResult<T> = Result<T, EtlError>;
// Most of the readers return this one: some of the variants above are large.
pub type BEtlResult<T> = Result<T, Box<EtlError>>;

/// One results export, loaded.
#[derive(Debug, Clone)]
pub struct Election {
    pub year: String,
    pub path: PathBuf,
    pub rows: Vec<ElectionRow>,
}

fn settings_from_args(args: &Args) -> BEtlResult<Settings> {
    let mut settings = match &args.config {
        Some(p) => Settings::load(Path::new(p))?,
        None => Settings::default(),
    };
    if let Some(d) = &args.election_dir {
        settings.election_dir = PathBuf::from(d);
        // An explicit directory replaces the file list of the config.
        settings.election_files = None;
    }
    if let Some(o) = &args.out {
        settings.output_dir = PathBuf::from(o);
    }
    if let Some(e) = &args.encodings {
        let labels: Vec<String> = e.split(',').map(|s| s.trim().to_string()).collect();
        settings.encodings = parse_encodings(&labels)?;
    }
    debug!("settings_from_args: {:?}", settings);
    Ok(settings)
}

/// The exports to process: the files listed in the config, or all the `*Election.txt`
/// files of the election directory, sorted by name.
pub fn election_files(settings: &Settings) -> BEtlResult<Vec<PathBuf>> {
    if let Some(files) = &settings.election_files {
        return Ok(files.clone());
    }
    let dir_s = settings.election_dir.display().to_string();
    let entries = fs::read_dir(&settings.election_dir).context(ReadingDirectorySnafu {
        path: dir_s.clone(),
    })?;
    let mut res: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.context(ReadingDirectorySnafu { path: dir_s.clone() })?;
        let p = entry.path();
        let is_export = p
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with("Election.txt"))
            .unwrap_or(false);
        if is_export && p.is_file() {
            res.push(p);
        }
    }
    res.sort();
    info!("Found {} election files in {}", res.len(), dir_s);
    Ok(res)
}

// `MMDD` of an export named `MMDDYYYYElection.txt`.
fn month_day(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.get(0..4))
        .unwrap_or("")
        .to_string()
}

/// Loads all the exports. Files that cannot be used are skipped with a warning.
///
/// One export is kept per year: when a year has several (a primary and the general
/// election), the latest one is used, so that different elections are never summed.
pub fn load_elections(settings: &Settings) -> BEtlResult<Vec<Election>> {
    let mut res: Vec<Election> = Vec::new();
    for path in election_files(settings)? {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let year = match year_from_file_name(&file_name) {
            Ok(y) => y,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let previous = res.iter().position(|e| e.year == year);
        if let Some(idx) = previous {
            if month_day(&res[idx].path) >= month_day(&path) {
                warn!(
                    "Skipping {}: {} already has the later export {}",
                    path.display(),
                    year,
                    res[idx].path.display()
                );
                continue;
            }
        }
        match read_election_rows(&path, &settings.encodings) {
            Ok(rows) => {
                info!("Loaded {} rows for {} from {}", rows.len(), year, file_name);
                let election = Election { year, path, rows };
                match previous {
                    Some(idx) => {
                        warn!(
                            "Replacing {} with the later export {} for {}",
                            res[idx].path.display(),
                            election.path.display(),
                            election.year
                        );
                        res[idx] = election;
                    }
                    None => res.push(election),
                }
            }
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
            }
        }
    }
    if res.is_empty() {
        warn!("No election data could be loaded");
    }
    Ok(res)
}

// ********* Pipelines ***********

pub fn run_results(settings: &Settings, elections: &[Election]) -> BEtlResult<Vec<PathBuf>> {
    let mut agg = CountyAggregator::new();
    for e in elections {
        debug!("run_results: {} ({})", e.path.display(), e.year);
        agg.add_rows(&e.year, &e.rows);
    }
    let mut written: Vec<PathBuf> = Vec::new();

    let county_p = settings.output_dir.join(COUNTY_RESULTS_FILE);
    let counties = agg.county_records();
    write_csv(&county_p, &counties)?;
    written.push(county_p);

    let congressional = agg.congressional_records();
    if congressional.is_empty() {
        info!("No congressional district results found");
    } else {
        let p = settings.output_dir.join(CONGRESSIONAL_RESULTS_FILE);
        write_csv(&p, &congressional)?;
        written.push(p);
    }

    for year in agg.years() {
        for office in Office::ALL {
            let t = agg.statewide(&year, office);
            if t.total > 0 {
                info!(
                    "{} {}: dem {} rep {} total {}",
                    year,
                    office.key(),
                    t.dem,
                    t.rep,
                    t.total
                );
            }
        }
    }
    info!(
        "Results: {} county records, {} congressional records",
        counties.len(),
        congressional.len()
    );
    Ok(written)
}

fn compare_with_reference(reference: &Path, computed: &JSValue) -> EtlResult<()> {
    let path_s = reference.display().to_string();
    let contents = fs::read_to_string(reference).context(OpeningFileSnafu { path: path_s.clone() })?;
    let summary_ref: JSValue =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: path_s })?;
    let pretty_ref = to_pretty_json(&summary_ref)?;
    let pretty_computed = to_pretty_json(computed)?;
    if pretty_ref != pretty_computed {
        warn!("Found differences with the reference string");
        print_diff(pretty_ref.as_str(), pretty_computed.as_ref(), "\n");
        whatever!("Difference detected between calculated contests and reference contests")
    }
    info!("Contests match the reference {}", reference.display());
    Ok(())
}

pub fn run_contests(
    settings: &Settings,
    elections: &[Election],
    reference: Option<&Path>,
) -> BEtlResult<Vec<PathBuf>> {
    let mut summary = ElectionSummary::new();
    for e in elections {
        summary.add_election(&e.year, &e.rows);
    }
    let p = settings.output_dir.join(CONTESTS_FILE);
    write_json(&p, &summary)?;
    for year in summary.years() {
        for (office, contest) in summary.office_contests(year) {
            info!(
                "{} {}: {} counties",
                year,
                office.key(),
                contest.results.len()
            );
        }
    }
    info!("Contests: {} years", summary.years().len());

    if let Some(r) = reference {
        let computed = serde_json::to_value(&summary).context(SerializingJsonSnafu {})?;
        compare_with_reference(r, &computed)?;
    }
    Ok(vec![p])
}

pub fn run_candidates(settings: &Settings, elections: &[Election]) -> BEtlResult<Vec<PathBuf>> {
    let mut lookup = CandidateLookup::new();
    for e in elections {
        lookup.add_rows(&e.year, &e.rows);
    }
    let p = settings.output_dir.join(CANDIDATES_FILE);
    write_csv_headerless(&p, &lookup.entries())?;
    info!("Candidates: {} entries", lookup.len());
    Ok(vec![p])
}

/// Converts one district plan to the demographic table and the GeoJSON layer.
pub fn run_district_source(settings: &Settings, source: &DistrictSource) -> BEtlResult<Vec<PathBuf>> {
    let kind = source.district_kind()?;
    let shp = PathBuf::from(&source.shapefile);
    let mut features = read_features(&shp)?;
    let crs = source_crs(&shp, source.source_proj.as_deref())?;
    let reprojector = Reprojector::new(&crs)?;
    for f in features.iter_mut() {
        f.geometry = f
            .geometry
            .as_ref()
            .map(|g| reprojector.to_wgs84(g))
            .transpose()?;
    }

    let records = district_records(features.iter().map(|f| &f.attributes));
    let output = |custom: &Option<String>, ext: &str| match custom {
        Some(p) => PathBuf::from(p),
        None => settings
            .output_dir
            .join(format!("{}.{}", kind.output_stem(), ext)),
    };
    let csv_p = output(&source.csv_output, "csv");
    let geojson_p = output(&source.geojson_output, "geojson");
    write_csv(&csv_p, &records)?;
    write_geojson(&geojson_p, &features)?;
    info!(
        "Districts {:?}: {} features, {} records",
        kind,
        features.len(),
        records.len()
    );
    Ok(vec![csv_p, geojson_p])
}

/// Runs all the sources. A failing source is reported and the others still run.
pub fn run_districts(settings: &Settings, sources: &[DistrictSource]) -> Vec<PathBuf> {
    let mut written: Vec<PathBuf> = Vec::new();
    if sources.is_empty() {
        warn!("No district sources to process");
    }
    for source in sources {
        match run_district_source(settings, source) {
            Ok(mut ps) => written.append(&mut ps),
            Err(e) => {
                warn!("Failed to process {}: {}", source.shapefile, e);
            }
        }
    }
    written
}

pub fn run_all(settings: &Settings) -> BEtlResult<Vec<PathBuf>> {
    let elections = load_elections(settings)?;
    let mut written = run_results(settings, &elections)?;
    written.append(&mut run_contests(settings, &elections, None)?);
    written.append(&mut run_candidates(settings, &elections)?);
    written.append(&mut run_districts(settings, &settings.district_sources));
    Ok(written)
}

pub fn run(args: &Args) -> BEtlResult<()> {
    let settings = settings_from_args(args)?;
    let written = match &args.command {
        Command::Results => run_results(&settings, &load_elections(&settings)?)?,
        Command::Contests { reference } => run_contests(
            &settings,
            &load_elections(&settings)?,
            reference.as_deref().map(Path::new),
        )?,
        Command::Candidates => run_candidates(&settings, &load_elections(&settings)?)?,
        Command::Districts {
            kind: Some(kind),
            shapefile: Some(shapefile),
            source_proj,
        } => {
            let source = DistrictSource {
                kind: kind.clone(),
                shapefile: shapefile.clone(),
                source_proj: source_proj.clone(),
                csv_output: None,
                geojson_output: None,
            };
            run_district_source(&settings, &source)?
        }
        Command::Districts {
            kind: None,
            shapefile: None,
            ..
        } => run_districts(&settings, &settings.district_sources),
        Command::Districts { .. } => {
            return Err(Box::new(EtlError::Whatever {
                message: "--kind and --shapefile must be given together".to_string(),
                source: None,
            }));
        }
        Command::Inspect { file } => {
            inspect::run_inspect(Path::new(file), &settings.encodings)?;
            Vec::new()
        }
        Command::All => run_all(&settings)?,
    };
    info!("Wrote {} files", written.len());
    for p in written.iter() {
        info!(" - {}", p.display());
    }
    Ok(())
}
