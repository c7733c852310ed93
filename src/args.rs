use clap::{Parser, Subcommand};

/// Builds the Florida election results tables and district layers used by the political map.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the inputs and the outputs. Relative paths in this
    /// file are relative to the directory of the file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory, default Election_Data) The directory containing the `*Election.txt` exports of the
    /// Division of Elections. Setting this option overrides the directory and the files that may be
    /// specified with the --config option.
    #[clap(short = 'd', long, value_parser)]
    pub election_dir: Option<String>,

    /// (directory, default data) Where the generated files are written. Setting this option overrides
    /// the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (list of comma-separated values, default utf-8,latin-1,cp1252) The encodings to try, in order,
    /// when reading the exports.
    #[clap(long, value_parser)]
    pub encodings: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Vote totals by county and by congressional district (CSV).
    Results,
    /// Two-party results of every contest, by county (JSON).
    Contests {
        /// (file path) A reference file in the same JSON format. If provided, the command fails when
        /// the output does not match it.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// The candidate names by contest, year, county and party (CSV without header).
    Candidates,
    /// Demographics and outlines of a district plan. Without arguments, all the sources of the
    /// --config file are processed.
    Districts {
        /// congressional, state_house or state_senate
        #[clap(short, long, value_parser)]
        kind: Option<String>,
        /// (file path) The `.shp` file of the plan.
        #[clap(short, long, value_parser)]
        shapefile: Option<String>,
        /// (PROJ string) The coordinate system of the plan, when the `.prj` file is missing or wrong.
        #[clap(long, value_parser)]
        source_proj: Option<String>,
    },
    /// Prints the columns and the offices found in an export.
    Inspect {
        #[clap(value_parser)]
        file: String,
    },
    /// Runs all of the above, except inspect.
    All,
}
