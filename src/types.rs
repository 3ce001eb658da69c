use crate::aggregate::deserialize_count;
use crate::region::RegionId;
use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// One row of the school internet table (one ownership type of one province).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchoolRecord {
    #[serde(rename = "Kode Kemdagri", default)]
    pub province_code: Option<String>,
    #[serde(rename = "Provinsi", default)]
    pub province_name: String,
    #[serde(rename = "State_School", default, deserialize_with = "deserialize_count")]
    pub state_schools: u64,
    #[serde(rename = "State_School_Internet", default, deserialize_with = "deserialize_count")]
    pub state_schools_with_internet: u64,
    #[serde(rename = "Private_School", default, deserialize_with = "deserialize_count")]
    pub private_schools: u64,
    #[serde(rename = "Private_School_Internet", default, deserialize_with = "deserialize_count")]
    pub private_schools_with_internet: u64,
    #[serde(rename = "Total_School", default, deserialize_with = "deserialize_count")]
    pub total_schools: u64,
    #[serde(rename = "Total_School_Internet", default, deserialize_with = "deserialize_count")]
    pub total_schools_with_internet: u64,
}

impl SchoolRecord {
    pub fn counts(&self) -> SchoolCounts {
        SchoolCounts {
            state_schools: self.state_schools,
            state_schools_with_internet: self.state_schools_with_internet,
            private_schools: self.private_schools,
            private_schools_with_internet: self.private_schools_with_internet,
            total_schools: self.total_schools,
            total_schools_with_internet: self.total_schools_with_internet,
        }
    }
}

/// The six summed counts shared by province, region and national totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchoolCounts {
    pub state_schools: u64,
    pub state_schools_with_internet: u64,
    pub private_schools: u64,
    pub private_schools_with_internet: u64,
    pub total_schools: u64,
    pub total_schools_with_internet: u64,
}

impl Add for SchoolCounts {
    type Output = SchoolCounts;

    fn add(mut self, rhs: SchoolCounts) -> SchoolCounts {
        self += rhs;
        self
    }
}

impl AddAssign for SchoolCounts {
    fn add_assign(&mut self, rhs: SchoolCounts) {
        self.state_schools = self.state_schools.saturating_add(rhs.state_schools);
        self.state_schools_with_internet =
            self.state_schools_with_internet.saturating_add(rhs.state_schools_with_internet);
        self.private_schools = self.private_schools.saturating_add(rhs.private_schools);
        self.private_schools_with_internet =
            self.private_schools_with_internet.saturating_add(rhs.private_schools_with_internet);
        self.total_schools = self.total_schools.saturating_add(rhs.total_schools);
        self.total_schools_with_internet =
            self.total_schools_with_internet.saturating_add(rhs.total_schools_with_internet);
    }
}

impl Sum for SchoolCounts {
    fn sum<I: Iterator<Item = SchoolCounts>>(iter: I) -> SchoolCounts {
        iter.fold(SchoolCounts::default(), Add::add)
    }
}

impl<'a> Sum<&'a SchoolCounts> for SchoolCounts {
    fn sum<I: Iterator<Item = &'a SchoolCounts>>(iter: I) -> SchoolCounts {
        iter.copied().sum()
    }
}

pub type NationalTotals = SchoolCounts;

/// Access percentages (0..=100) per school ownership type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AccessRates {
    pub state: f64,
    pub private: f64,
    pub total: f64,
}

/// Two-character province code, or `Unknown` when the raw code was missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CleanCode {
    Known(String),
    Unknown,
}

impl CleanCode {
    pub fn as_str(&self) -> &str {
        match self {
            CleanCode::Known(code) => code,
            CleanCode::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, CleanCode::Known(_))
    }
}

impl fmt::Display for CleanCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CleanCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceTotals {
    pub code: CleanCode,
    pub name: String,
    pub counts: SchoolCounts,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegionTotals {
    pub region: RegionId,
    pub counts: SchoolCounts,
}

/// A province outline from the boundary file.
#[derive(Debug, Clone)]
pub struct ProvinceBoundary {
    pub code: CleanCode,
    pub raw_code: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    HasAccess,
    NoAccess,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dot {
    #[serde(serialize_with = "serialize_point")]
    pub point: Point<f64>,
    pub province: CleanCode,
    pub access: Access,
    pub opacity: f64,
}

fn serialize_point<S: Serializer>(point: &Point<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    [point.x(), point.y()].serialize(serializer)
}
