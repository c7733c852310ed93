use std::fs;
use std::path::{Path, PathBuf};

use fl_tally::districts::DistrictKind;
use serde::{Deserialize, Serialize};

use crate::etl::{io_encoding::*, *};

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DistrictSource {
    /// congressional, state_house or state_senate
    pub kind: String,
    pub shapefile: String,
    /// PROJ string of the source coordinates, when the `.prj` file is missing or wrong.
    #[serde(rename = "sourceProj")]
    pub source_proj: Option<String>,
    #[serde(rename = "csvOutput")]
    pub csv_output: Option<String>,
    #[serde(rename = "geojsonOutput")]
    pub geojson_output: Option<String>,
}

impl DistrictSource {
    pub fn district_kind(&self) -> EtlResult<DistrictKind> {
        DistrictKind::parse(&self.kind).context(UnknownDistrictKindSnafu {
            kind: self.kind.clone(),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct EtlConfig {
    #[serde(rename = "electionDirectory")]
    pub election_directory: Option<String>,
    /// Explicit list of exports. Takes precedence over the directory listing.
    #[serde(rename = "electionFiles")]
    pub election_files: Option<Vec<String>>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    pub encodings: Option<Vec<String>>,
    #[serde(rename = "districtSources", default)]
    pub district_sources: Vec<DistrictSource>,
}

pub fn read_config(path: &Path) -> BEtlResult<EtlConfig> {
    let path_s = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path: path_s.clone() })?;
    let config: EtlConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: path_s })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

/// The resolved settings of a run. All the paths are usable as is.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub election_dir: PathBuf,
    pub election_files: Option<Vec<PathBuf>>,
    pub output_dir: PathBuf,
    pub encodings: Vec<Encoding>,
    pub district_sources: Vec<DistrictSource>,
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            election_dir: PathBuf::from("Election_Data"),
            election_files: None,
            output_dir: PathBuf::from("data"),
            encodings: Encoding::DEFAULT_ORDER.to_vec(),
            district_sources: Vec::new(),
        }
    }
}

fn resolve(root: &Path, p: &str) -> PathBuf {
    let pb = PathBuf::from(p);
    if pb.is_absolute() {
        pb
    } else {
        root.join(pb)
    }
}

impl Settings {
    /// Builds the settings from a config file. Relative paths are relative to the
    /// directory of the config file.
    pub fn from_config(config: &EtlConfig, root: &Path) -> EtlResult<Settings> {
        let default = Settings::default();
        let encodings = match &config.encodings {
            Some(labels) if !labels.is_empty() => parse_encodings(labels)?,
            _ => default.encodings,
        };
        let district_sources = config
            .district_sources
            .iter()
            .map(|ds| DistrictSource {
                shapefile: resolve(root, &ds.shapefile).display().to_string(),
                csv_output: ds
                    .csv_output
                    .as_ref()
                    .map(|p| resolve(root, p).display().to_string()),
                geojson_output: ds
                    .geojson_output
                    .as_ref()
                    .map(|p| resolve(root, p).display().to_string()),
                ..ds.clone()
            })
            .collect();
        Ok(Settings {
            election_dir: resolve(
                root,
                config.election_directory.as_deref().unwrap_or("Election_Data"),
            ),
            election_files: config
                .election_files
                .as_ref()
                .map(|fs| fs.iter().map(|f| resolve(root, f)).collect()),
            output_dir: resolve(root, config.output_directory.as_deref().unwrap_or("data")),
            encodings,
            district_sources,
        })
    }

    pub fn load(config_path: &Path) -> BEtlResult<Settings> {
        let config = read_config(config_path)?;
        let root = config_path.parent().context(MissingParentDirSnafu {
            path: config_path.display().to_string(),
        })?;
        Ok(Settings::from_config(&config, root)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "electionDirectory": "raw/Election_Data",
        "outputDirectory": "/tmp/fl_out",
        "encodings": ["latin-1", "utf-8"],
        "districtSources": [
            {"kind": "congressional", "shapefile": "data/S000C8004/S000C8004.shp"},
            {"kind": "state_senate", "shapefile": "data/S027S8058/S027S8058.shp",
             "sourceProj": "+proj=longlat +datum=NAD83", "csvOutput": "out/senate.csv"}
        ]
    }"#;

    #[test]
    fn parse_and_resolve() {
        let config: EtlConfig = serde_json::from_str(CONFIG).unwrap();
        assert_eq!(config.district_sources.len(), 2);
        let s = Settings::from_config(&config, Path::new("/work")).unwrap();
        assert_eq!(s.election_dir, PathBuf::from("/work/raw/Election_Data"));
        assert_eq!(s.output_dir, PathBuf::from("/tmp/fl_out"));
        assert_eq!(s.encodings, vec![Encoding::Latin1, Encoding::Utf8]);
        assert_eq!(s.election_files, None);
        let senate = &s.district_sources[1];
        assert_eq!(senate.shapefile, "/work/data/S027S8058/S027S8058.shp");
        assert_eq!(senate.csv_output.as_deref(), Some("/work/out/senate.csv"));
        assert_eq!(senate.geojson_output, None);
        assert_eq!(
            senate.source_proj.as_deref(),
            Some("+proj=longlat +datum=NAD83")
        );
        assert_eq!(senate.district_kind().unwrap(), DistrictKind::StateSenate);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: EtlConfig = serde_json::from_str("{}").unwrap();
        let s = Settings::from_config(&config, Path::new("")).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn invalid_values() {
        let config: EtlConfig = serde_json::from_str(r#"{"encodings": ["utf-16"]}"#).unwrap();
        assert!(Settings::from_config(&config, Path::new(".")).is_err());
        let ds = DistrictSource {
            kind: "county".to_string(),
            shapefile: "x.shp".to_string(),
            source_proj: None,
            csv_output: None,
            geojson_output: None,
        };
        assert!(ds.district_kind().is_err());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("fl.json");
        fs::write(&p, r#"{"electionFiles": ["a/11052024Election.txt"]}"#).unwrap();
        let s = Settings::load(&p).unwrap();
        assert_eq!(
            s.election_files,
            Some(vec![dir.path().join("a/11052024Election.txt")])
        );
        fs::write(&p, "not json").unwrap();
        assert!(Settings::load(&p).is_err());
    }
}
