//! The payload handed to a renderer.
//!
//! Interaction state lives in [`ViewState`], owned by whoever drives the
//! dashboard. Building a view reads it but never changes it.

use crate::aggregate::{aggregate_by_region, aggregate_national, max_state_internet, ProvinceTable};
use crate::colors::{self, Gradient, ACCESS_GRADIENT};
use crate::config::SamplingConfig;
use crate::processing::{index_boundaries, national_overview, province_detail};
use crate::region::{region_of, RegionId};
use crate::types::{CleanCode, Dot, ProvinceBoundary, ProvinceTotals, SchoolCounts};
use rand::Rng;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    /// Provinces coloured by region.
    #[default]
    Region,
    /// Provinces shaded by state-school internet counts, with dots.
    Access,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub map_mode: MapMode,
    /// Region picked from the legend. Wins over `hover_region`.
    pub active_region: Option<RegionId>,
    pub hover_region: Option<RegionId>,
    pub focused_province: Option<CleanCode>,
}

impl ViewState {
    pub fn highlighted_region(&self) -> Option<RegionId> {
        self.active_region.or(self.hover_region)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub label: &'static str,
    pub rate: f64,
    pub count: u64,
    pub total: u64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub title: String,
    pub bars: Vec<Bar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub start: String,
    pub end: String,
    pub opacity: f64,
}

impl Fill {
    fn solid(color: &str, opacity: f64) -> Self {
        Fill {
            start: color.to_string(),
            end: color.to_string(),
            opacity,
        }
    }

    fn gradient(gradient: Gradient, opacity: f64) -> Self {
        Fill {
            start: gradient.start.to_string(),
            end: gradient.end.to_string(),
            opacity,
        }
    }
}

/// Tooltip payload for one province. `None` where the table has no data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProvinceSummary {
    pub code: CleanCode,
    pub name: Option<String>,
    pub region: RegionId,
    pub total_schools: Option<u64>,
    pub total_schools_with_internet: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvinceView {
    pub summary: ProvinceSummary,
    pub fill: Fill,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView<'a> {
    pub map_mode: MapMode,
    pub bar_chart: BarChart,
    pub provinces: Vec<ProvinceView>,
    pub dots: Vec<Dot>,
    #[serde(skip)]
    pub boundaries: &'a [ProvinceBoundary],
}

pub fn summarize(code: &CleanCode, table: &ProvinceTable) -> ProvinceSummary {
    let totals = table.get(code);
    ProvinceSummary {
        code: code.clone(),
        name: totals.map(|t| t.name.clone()),
        region: region_of(code),
        total_schools: totals.map(|t| t.counts.total_schools),
        total_schools_with_internet: totals.map(|t| t.counts.total_schools_with_internet),
    }
}

/// Region first, then the focused province, then the whole country.
pub fn bar_chart(table: &ProvinceTable, state: &ViewState) -> BarChart {
    let (title, counts) = match (state.highlighted_region(), state.focused_province.as_ref()) {
        (Some(region), _) => (
            format!("Internet Access in Schools - Indonesia {}", region.label()),
            aggregate_by_region(table, region).counts,
        ),
        (None, Some(code)) => match table.get(code) {
            Some(totals) => (
                format!("Internet Access in Schools - {}", totals.name),
                totals.counts,
            ),
            None => national_chart(table),
        },
        (None, None) => national_chart(table),
    };

    BarChart {
        title,
        bars: bars(&counts),
    }
}

fn national_chart(table: &ProvinceTable) -> (String, SchoolCounts) {
    (
        "National Internet Access in Schools".to_string(),
        aggregate_national(table),
    )
}

fn bars(counts: &SchoolCounts) -> Vec<Bar> {
    let rates = counts.rates();
    [
        ("State Schools", rates.state, counts.state_schools_with_internet, counts.state_schools),
        ("Private Schools", rates.private, counts.private_schools_with_internet, counts.private_schools),
        ("All Schools", rates.total, counts.total_schools_with_internet, counts.total_schools),
    ]
    .into_iter()
    .map(|(label, rate, count, total)| Bar {
        label,
        rate,
        count,
        total,
        text: format!(
            "{} of {} ({}%)",
            thousands(count),
            thousands(total),
            rate.round() as u64
        ),
    })
    .collect()
}

/// `1234567` -> `"1,234,567"`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn province_fill(
    code: &CleanCode,
    totals: Option<&ProvinceTotals>,
    state: &ViewState,
    max_state_internet: u64,
) -> Fill {
    let region = region_of(code);
    let highlight = state.highlighted_region();

    match state.map_mode {
        MapMode::Region => match highlight {
            Some(h) if h != region => Fill::solid(colors::DIMMED, 0.6),
            _ => Fill::gradient(colors::region_gradient(region), 1.0),
        },
        MapMode::Access => {
            if highlight == Some(region) {
                return Fill::solid(colors::HIGHLIGHT, 1.0);
            }

            let value = totals.map(|t| t.counts.state_schools_with_internet).unwrap_or(0);
            let normalized = if max_state_internet == 0 {
                0.0
            } else {
                value as f64 / max_state_internet as f64
            };
            let opacity = if highlight.is_some() { 0.6 } else { 0.8 };

            Fill {
                start: ACCESS_GRADIENT.start.to_string(),
                end: colors::interpolate(ACCESS_GRADIENT.start, ACCESS_GRADIENT.end, normalized),
                opacity,
            }
        }
    }
}

const DETAIL_DOT_OPACITY: f64 = 0.7;
const OVERVIEW_DOT_OPACITY: f64 = 0.8;
const HIGHLIGHTED_DOT_OPACITY: f64 = 0.7;
const FADED_DOT_OPACITY: f64 = 0.2;

/// Dots for the current state: the focused province, else the national
/// overview in access mode, else none.
pub fn dots<R: Rng>(
    config: &SamplingConfig,
    table: &ProvinceTable,
    boundaries: &[ProvinceBoundary],
    state: &ViewState,
    rng: &mut R,
) -> Vec<Dot> {
    let (mut dots, base) = match (&state.focused_province, state.map_mode) {
        (Some(code), _) => {
            let index = index_boundaries(boundaries);
            let dots = match (table.get(code), index.get(code)) {
                (Some(totals), Some(boundary)) => province_detail(config, totals, boundary, rng),
                _ => {
                    debug!("Focused province {} has no data or boundary", code);
                    Vec::new()
                }
            };
            (dots, DETAIL_DOT_OPACITY)
        }
        (None, MapMode::Access) => (
            national_overview(config, table, boundaries, rng),
            OVERVIEW_DOT_OPACITY,
        ),
        (None, MapMode::Region) => (Vec::new(), OVERVIEW_DOT_OPACITY),
    };

    for dot in dots.iter_mut() {
        dot.opacity = dot_opacity(&dot.province, state, base);
    }
    dots
}

/// In access mode a highlighted region keeps its dots visible and fades the rest.
pub fn dot_opacity(province: &CleanCode, state: &ViewState, base: f64) -> f64 {
    match (state.map_mode, state.highlighted_region()) {
        (MapMode::Access, Some(region)) if region_of(province) == region => HIGHLIGHTED_DOT_OPACITY,
        (MapMode::Access, Some(_)) => FADED_DOT_OPACITY,
        _ => base,
    }
}

pub fn build_view<'a, R: Rng>(
    config: &SamplingConfig,
    table: &ProvinceTable,
    boundaries: &'a [ProvinceBoundary],
    state: &ViewState,
    rng: &mut R,
) -> DashboardView<'a> {
    let max_internet = max_state_internet(table);

    let provinces = boundaries
        .iter()
        .map(|boundary| ProvinceView {
            summary: summarize(&boundary.code, table),
            fill: province_fill(&boundary.code, table.get(&boundary.code), state, max_internet),
        })
        .collect();

    DashboardView {
        map_mode: state.map_mode,
        bar_chart: bar_chart(table, state),
        provinces,
        dots: dots(config, table, boundaries, state, rng),
        boundaries,
    }
}
