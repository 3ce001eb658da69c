use crate::types::CleanCode;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// Sumatra, Java, Bali
const WEST: [&str; 16] = [
    "11", "12", "13", "14", "15", "16", "17", "18", "19", "31", "32", "33", "34", "35", "36", "51",
];
// Nusa Tenggara, Kalimantan, Sulawesi
const CENTRAL: [&str; 13] = [
    "52", "53", "61", "62", "63", "64", "65", "71", "72", "73", "74", "75", "76",
];
// Maluku, Papua
const EAST: [&str; 9] = ["81", "82", "91", "92", "93", "94", "95", "96", "97"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionId {
    West,
    Central,
    East,
    Unknown,
}

impl RegionId {
    pub const ALL: [RegionId; 4] = [
        RegionId::West,
        RegionId::Central,
        RegionId::East,
        RegionId::Unknown,
    ];

    /// Province codes making up the region. Empty for `Unknown`.
    pub fn members(self) -> &'static [&'static str] {
        match self {
            RegionId::West => &WEST,
            RegionId::Central => &CENTRAL,
            RegionId::East => &EAST,
            RegionId::Unknown => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RegionId::West => "west",
            RegionId::Central => "central",
            RegionId::East => "east",
            RegionId::Unknown => "unknown",
        }
    }

    /// Capitalised name used in chart titles.
    pub fn label(self) -> &'static str {
        match self {
            RegionId::West => "West",
            RegionId::Central => "Central",
            RegionId::East => "East",
            RegionId::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "west" => Ok(RegionId::West),
            "central" => Ok(RegionId::Central),
            "east" => Ok(RegionId::East),
            "unknown" => Ok(RegionId::Unknown),
            other => Err(format!(
                "unknown region '{}', expected west, central, east or unknown",
                other
            )),
        }
    }
}

/// Static lookup of the region a province belongs to.
pub fn region_of(code: &CleanCode) -> RegionId {
    let code = match code {
        CleanCode::Known(code) => code.as_str(),
        CleanCode::Unknown => return RegionId::Unknown,
    };

    [RegionId::West, RegionId::Central, RegionId::East]
        .into_iter()
        .find(|region| region.members().contains(&code))
        .unwrap_or(RegionId::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn code(s: &str) -> CleanCode {
        CleanCode::Known(s.to_string())
    }

    #[test]
    fn test_region_of_known_codes() {
        assert_eq!(region_of(&code("11")), RegionId::West);
        assert_eq!(region_of(&code("51")), RegionId::West);
        assert_eq!(region_of(&code("64")), RegionId::Central);
        assert_eq!(region_of(&code("76")), RegionId::Central);
        assert_eq!(region_of(&code("82")), RegionId::East);
        assert_eq!(region_of(&code("97")), RegionId::East);
    }

    #[test]
    fn test_region_of_unlisted_codes() {
        assert_eq!(region_of(&code("20")), RegionId::Unknown);
        assert_eq!(region_of(&code("00")), RegionId::Unknown);
        assert_eq!(region_of(&CleanCode::Unknown), RegionId::Unknown);
    }

    #[test]
    fn test_regions_do_not_overlap() {
        let mut seen = HashSet::new();
        for region in RegionId::ALL {
            for member in region.members() {
                assert!(seen.insert(*member), "code {} listed twice", member);
                assert_eq!(region_of(&code(member)), region);
            }
        }
        assert_eq!(seen.len(), 16 + 13 + 9);
    }

    #[test]
    fn test_every_two_digit_code_has_exactly_one_region() {
        for n in 0..100 {
            let c = code(&format!("{:02}", n));
            let hits = [RegionId::West, RegionId::Central, RegionId::East]
                .iter()
                .filter(|r| r.members().contains(&c.as_str()))
                .count();
            assert!(hits <= 1);
            if hits == 0 {
                assert_eq!(region_of(&c), RegionId::Unknown);
            }
        }
    }

    #[test]
    fn test_parse_region() {
        assert_eq!("West".parse::<RegionId>().unwrap(), RegionId::West);
        assert_eq!(" east ".parse::<RegionId>().unwrap(), RegionId::East);
        assert!("north".parse::<RegionId>().is_err());
    }
}
