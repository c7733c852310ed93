// ********* Office taxonomy ***********

use std::error::Error;
use std::fmt::Display;

/// The offices that are tracked in the county and district outputs.
///
/// Every other contest on the ballot (judges, amendments, school boards, ...)
/// is dropped by the aggregation.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Office {
    President,
    UsSenate,
    UsHouse,
    Governor,
    StateSenate,
    StateHouse,
}

impl Office {
    /// All the offices, in the order of the output columns.
    pub const ALL: [Office; 6] = [
        Office::President,
        Office::Governor,
        Office::UsSenate,
        Office::UsHouse,
        Office::StateSenate,
        Office::StateHouse,
    ];

    /// The column prefix for this office.
    pub fn key(&self) -> &'static str {
        match self {
            Office::President => "president",
            Office::UsSenate => "us_senate",
            Office::UsHouse => "us_house",
            Office::Governor => "governor",
            Office::StateSenate => "state_senate",
            Office::StateHouse => "state_house",
        }
    }

    /// Maps the race codes used by the Division of Elections exports.
    pub fn from_race_code(code: &str) -> Option<Office> {
        match code.trim().to_uppercase().as_str() {
            "PRE" => Some(Office::President),
            "USS" => Some(Office::UsSenate),
            "USR" => Some(Office::UsHouse),
            "GOV" => Some(Office::Governor),
            "SEN" => Some(Office::StateSenate),
            "REP" => Some(Office::StateHouse),
            _ => None,
        }
    }
}

// The order matters: the first pattern found in the description wins.
const OFFICE_PATTERNS: [(&str, Office); 6] = [
    ("President", Office::President),
    ("United States Senator", Office::UsSenate),
    ("United States Representative", Office::UsHouse),
    ("Governor", Office::Governor),
    ("State Representative", Office::StateHouse),
    ("State Senator", Office::StateSenate),
];

/// Classifies an office description (the `OfficeDesc` column) by substring matching.
///
/// Matching is case sensitive. "Lieutenant Governor" is counted as governor, which is
/// how the Florida exports label the joint ticket.
pub fn classify_office(desc: &str) -> Option<Office> {
    OFFICE_PATTERNS
        .iter()
        .find(|(pattern, _)| desc.contains(pattern))
        .map(|(_, office)| *office)
}

// ********* Parties ***********

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum Party {
    Democratic,
    Republican,
    /// Any other party code, including write-ins and NPA.
    Other(String),
}

impl Party {
    pub fn from_code(code: &str) -> Party {
        match code.trim() {
            "DEM" => Party::Democratic,
            "REP" => Party::Republican,
            x => Party::Other(x.to_string()),
        }
    }
}

// ********* Errors ***********

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TallyError {
    /// The file name does not follow the `MMDDYYYYElection.txt` convention.
    InvalidElectionFileName(String),
    /// A district feature has no usable district number.
    MissingDistrictId,
}

impl Error for TallyError {}

impl Display for TallyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TallyError::InvalidElectionFileName(name) => {
                write!(f, "cannot derive an election year from {:?}", name)
            }
            TallyError::MissingDistrictId => write!(f, "district feature without a district id"),
        }
    }
}
