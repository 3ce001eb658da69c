//! Province, region and national rollups of the school table.
//!
//! Everything here is a pure function of the loaded rows. Totals are
//! recomputed whenever they are asked for; nothing is cached.

use crate::config::CountPolicy;
use crate::region::{region_of, RegionId};
use crate::types::{
    AccessRates, CleanCode, NationalTotals, ProvinceTotals, RegionTotals, SchoolCounts,
    SchoolRecord,
};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Reduce a dotted code such as `"11.01"` to its two-character province part.
pub fn clean_code(raw: Option<&str>) -> CleanCode {
    let raw = match raw {
        Some(raw) => raw,
        None => return CleanCode::Unknown,
    };

    // split always yields at least one item
    let head = raw.trim().split('.').next().unwrap_or("").trim();
    if head.is_empty() {
        return CleanCode::Unknown;
    }

    let truncated: String = head.chars().take(2).collect();
    CleanCode::Known(format!("{:0>2}", truncated))
}

/// Parse a count that may carry thousands separators. Anything unparseable is 0.
pub fn parse_count(raw: &str) -> u64 {
    let stripped: String = raw.chars().filter(|c| *c != ',').collect();
    let stripped = stripped.trim();

    if let Ok(n) = stripped.parse::<u64>() {
        return n;
    }
    match stripped.parse::<f64>() {
        // u64::MAX as f64 rounds up to 2^64, so `<` keeps the cast in range
        Ok(n) if n >= 0.0 && n < u64::MAX as f64 => n.trunc() as u64,
        _ => 0,
    }
}

pub(crate) fn deserialize_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_count(&raw))
}

/// Percentage of `part` in `whole`, 0 when `whole` is 0.
pub fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

impl SchoolCounts {
    pub fn rates(&self) -> AccessRates {
        AccessRates {
            state: rate(self.state_schools_with_internet, self.state_schools),
            private: rate(self.private_schools_with_internet, self.private_schools),
            total: rate(self.total_schools_with_internet, self.total_schools),
        }
    }

    /// Fraction (0..=1) of all schools with internet, 0 for an empty total.
    pub fn access_ratio(&self) -> f64 {
        if self.total_schools == 0 {
            0.0
        } else {
            self.total_schools_with_internet as f64 / self.total_schools as f64
        }
    }

    /// Pairs whose internet count exceeds the school count, as `(label, internet, schools)`.
    pub fn violations(&self) -> Vec<(&'static str, u64, u64)> {
        [
            ("state", self.state_schools_with_internet, self.state_schools),
            ("private", self.private_schools_with_internet, self.private_schools),
            ("total", self.total_schools_with_internet, self.total_schools),
        ]
        .into_iter()
        .filter(|(_, with_internet, schools)| with_internet > schools)
        .collect()
    }
}

/// Check `*_with_internet <= *_schools` on every row, clipping when asked to.
///
/// Returns the number of rows that broke the invariant.
pub fn validate_records(records: &mut [SchoolRecord], policy: CountPolicy) -> usize {
    let mut offending = 0;

    for record in records.iter_mut() {
        let violations = record.counts().violations();
        if violations.is_empty() {
            continue;
        }
        offending += 1;

        for (label, with_internet, schools) in &violations {
            warn!(
                province = record.province_code.as_deref().unwrap_or(""),
                "{} schools with internet ({}) exceed {} schools ({})",
                label, with_internet, label, schools
            );
        }

        if policy == CountPolicy::Clip {
            record.state_schools_with_internet =
                record.state_schools_with_internet.min(record.state_schools);
            record.private_schools_with_internet =
                record.private_schools_with_internet.min(record.private_schools);
            record.total_schools_with_internet =
                record.total_schools_with_internet.min(record.total_schools);
        }
    }

    offending
}

/// Province totals keyed by clean code, iterated in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct ProvinceTable {
    order: Vec<CleanCode>,
    totals: HashMap<CleanCode, ProvinceTotals>,
}

impl ProvinceTable {
    pub fn get(&self, code: &CleanCode) -> Option<&ProvinceTotals> {
        self.totals.get(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProvinceTotals> + '_ {
        self.order.iter().filter_map(move |code| self.totals.get(code))
    }

    pub fn codes(&self) -> &[CleanCode] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn fold(&mut self, record: &SchoolRecord) {
        let code = clean_code(record.province_code.as_deref());
        let counts = record.counts();

        if let Some(totals) = self.totals.get_mut(&code) {
            totals.counts += counts;
            return;
        }

        self.order.push(code.clone());
        self.totals.insert(
            code.clone(),
            ProvinceTotals {
                code,
                name: record.province_name.trim().to_string(),
                counts,
            },
        );
    }
}

pub fn aggregate_by_province(records: &[SchoolRecord]) -> ProvinceTable {
    let mut table = ProvinceTable::default();
    for record in records {
        table.fold(record);
    }
    debug!("Aggregated {} rows into {} provinces", records.len(), table.len());
    table
}

/// Sum the provinces belonging to `region`. Member codes without data are skipped.
pub fn aggregate_by_region(table: &ProvinceTable, region: RegionId) -> RegionTotals {
    let counts = table
        .iter()
        .filter(|p| region_of(&p.code) == region)
        .map(|p| &p.counts)
        .sum();

    RegionTotals { region, counts }
}

pub fn aggregate_national(table: &ProvinceTable) -> NationalTotals {
    table.iter().map(|p| &p.counts).sum()
}

/// Largest state-school internet count, the scale for the access choropleth.
pub fn max_state_internet(table: &ProvinceTable) -> u64 {
    table
        .iter()
        .map(|p| p.counts.state_schools_with_internet)
        .max()
        .unwrap_or(0)
}
