use crate::aggregate::{aggregate_national, ProvinceTable};
use crate::config::SamplingConfig;
use crate::types::{Access, CleanCode, Dot, ProvinceBoundary, ProvinceTotals};
use anyhow::Result;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{MultiPolygon, Point};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Draw attempts allowed per requested point before giving up.
pub const ATTEMPTS_PER_POINT: usize = 10;

/// Seeded when a seed is given, fresh entropy otherwise.
pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Points sampled for one province, split by internet access.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DotSplit {
    pub has_access: Vec<Point<f64>>,
    pub no_access: Vec<Point<f64>>,
}

impl DotSplit {
    pub fn len(&self) -> usize {
        self.has_access.len() + self.no_access.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_dots(self, province: &CleanCode) -> Vec<Dot> {
        let has = self.has_access.into_iter().map(|point| (point, Access::HasAccess));
        let no = self.no_access.into_iter().map(|point| (point, Access::NoAccess));
        has.chain(no)
            .map(|(point, access)| Dot {
                point,
                province: province.clone(),
                access,
                opacity: 1.0,
            })
            .collect()
    }
}

/// Rejection sampling inside `boundary`, best effort.
///
/// Stops after `count` accepted points or `count * 10` draws, whichever comes
/// first. An error from `contains` or a zero-area bounding box gives an
/// empty result.
pub fn sample_points_in_region<F, R>(
    boundary: &MultiPolygon<f64>,
    count: usize,
    mut contains: F,
    rng: &mut R,
) -> Vec<Point<f64>>
where
    F: FnMut(&Point<f64>) -> Result<bool>,
    R: Rng,
{
    if count == 0 {
        return Vec::new();
    }

    let bbox = match boundary.bounding_rect() {
        Some(bbox) => bbox,
        None => {
            debug!("Boundary has no extent, nothing to sample");
            return Vec::new();
        }
    };
    // also rejects NaN extents
    if !(bbox.width() > 0.0 && bbox.height() > 0.0) {
        debug!("Boundary bounding box has zero area, nothing to sample");
        return Vec::new();
    }
    if !(bbox.width().is_finite() && bbox.height().is_finite()) {
        debug!("Boundary bounding box is unbounded, nothing to sample");
        return Vec::new();
    }

    let max_attempts = count.saturating_mul(ATTEMPTS_PER_POINT);
    let mut points = Vec::with_capacity(count);
    let mut attempts = 0;

    while points.len() < count && attempts < max_attempts {
        attempts += 1;
        let x = rng.gen_range(bbox.min().x..bbox.max().x);
        let y = rng.gen_range(bbox.min().y..bbox.max().y);
        let pt = Point::new(x, y);

        match contains(&pt) {
            Ok(true) => points.push(pt),
            Ok(false) => {}
            Err(e) => {
                warn!("Containment test failed, dropping samples: {:#}", e);
                return Vec::new();
            }
        }
    }

    if points.len() < count {
        debug!("Placed {} of {} points after {} attempts", points.len(), count, attempts);
    }

    points
}

/// Split `total` into `(floor(total * ratio), rest)`. The parts always add up to `total`.
pub fn split_by_ratio(total: usize, ratio: f64) -> (usize, usize) {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let first = ((total as f64 * ratio).floor() as usize).min(total);
    (first, total - first)
}

/// A group's slice of `total_points`, never below `minimum`.
///
/// The floor means the groups together can exceed `total_points`.
pub fn proportional_allocation(total_points: usize, share: f64, minimum: usize) -> usize {
    let share = if share.is_nan() { 0.0 } else { share.max(0.0) };
    ((total_points as f64 * share).floor() as usize).max(minimum)
}

/// Points shown when a single province is focused.
pub fn province_point_budget(total_schools: u64, fraction: f64, cap: usize) -> usize {
    ((total_schools as f64 * fraction).floor() as usize).min(cap)
}

/// Sample `budget` points inside `boundary`, `ratio` of them marked as having access.
pub fn sample_split<R: Rng>(
    boundary: &MultiPolygon<f64>,
    budget: usize,
    ratio: f64,
    rng: &mut R,
) -> DotSplit {
    let (with_access, without_access) = split_by_ratio(budget, ratio);
    let contains = |pt: &Point<f64>| Ok(boundary.contains(pt));

    DotSplit {
        has_access: sample_points_in_region(boundary, with_access, contains, rng),
        no_access: sample_points_in_region(boundary, without_access, contains, rng),
    }
}

/// Detail view for one province.
pub fn province_detail<R: Rng>(
    config: &SamplingConfig,
    totals: &ProvinceTotals,
    boundary: &ProvinceBoundary,
    rng: &mut R,
) -> Vec<Dot> {
    let budget = province_point_budget(
        totals.counts.total_schools,
        config.province_fraction,
        config.province_cap,
    );
    let split = sample_split(&boundary.geometry, budget, totals.counts.access_ratio(), rng);
    debug!("Province {}: {} of {} points placed", totals.code, split.len(), budget);

    split.into_dots(&totals.code)
}

/// Map each known clean code to its first boundary.
pub fn index_boundaries(boundaries: &[ProvinceBoundary]) -> HashMap<&CleanCode, &ProvinceBoundary> {
    let mut index = HashMap::new();
    for boundary in boundaries.iter().filter(|b| b.code.is_known()) {
        index.entry(&boundary.code).or_insert(boundary);
    }
    index
}

/// National overview: the point budget spread over provinces by their share of schools.
pub fn national_overview<R: Rng>(
    config: &SamplingConfig,
    table: &ProvinceTable,
    boundaries: &[ProvinceBoundary],
    rng: &mut R,
) -> Vec<Dot> {
    let national = aggregate_national(table);
    if national.total_schools == 0 {
        info!("No schools in the table, overview is empty");
        return Vec::new();
    }

    let index = index_boundaries(boundaries);
    let mut dots = Vec::new();

    for totals in table.iter() {
        let boundary = match index.get(&totals.code) {
            Some(boundary) => boundary,
            None => {
                debug!("No boundary for province {}, skipping", totals.code);
                continue;
            }
        };

        let share = totals.counts.total_schools as f64 / national.total_schools as f64;
        let budget = proportional_allocation(config.overview_points, share, config.minimum_per_province);
        let split = sample_split(&boundary.geometry, budget, totals.counts.access_ratio(), rng);
        dots.extend(split.into_dots(&totals.code));
    }

    info!("Generated {} overview dots", dots.len());

    // Avoid z-ordering bias where one category is always drawn on top.
    dots.shuffle(rng);

    dots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_by_province;
    use crate::types::SchoolRecord;
    use anyhow::anyhow;
    use geo::{polygon, LineString, Polygon};

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ]])
    }

    fn boundary(code: &str, geometry: MultiPolygon<f64>) -> ProvinceBoundary {
        ProvinceBoundary {
            code: CleanCode::Known(code.to_string()),
            raw_code: code.to_string(),
            geometry,
        }
    }

    fn record(code: &str, total: u64, with_internet: u64) -> SchoolRecord {
        SchoolRecord {
            province_code: Some(code.to_string()),
            province_name: code.to_string(),
            total_schools: total,
            total_schools_with_internet: with_internet,
            ..Default::default()
        }
    }

    #[test]
    fn test_split_by_ratio_sums_to_total() {
        for total in [0usize, 1, 7, 100, 999] {
            for ratio in [0.0, 0.1, 0.333, 0.5, 0.999, 1.0] {
                let (a, b) = split_by_ratio(total, ratio);
                assert_eq!(a + b, total);
            }
        }
        assert_eq!(split_by_ratio(10, 0.35), (3, 7));
        assert_eq!(split_by_ratio(10, f64::NAN), (0, 10));
        assert_eq!(split_by_ratio(10, 1.5), (10, 0));
        assert_eq!(split_by_ratio(10, -0.5), (0, 10));
    }

    #[test]
    fn test_proportional_allocation_floor() {
        assert_eq!(proportional_allocation(1000, 0.25, 5), 250);
        assert_eq!(proportional_allocation(1000, 0.001, 5), 5);
        assert_eq!(proportional_allocation(1000, 0.0, 5), 5);
        // 40 tiny groups each get the floor and overshoot the budget
        let total: usize = (0..40).map(|_| proportional_allocation(100, 0.025, 5)).sum();
        assert!(total > 100);
    }

    #[test]
    fn test_province_point_budget() {
        assert_eq!(province_point_budget(301, 0.5, 500), 150);
        assert_eq!(province_point_budget(5000, 0.5, 500), 500);
        assert_eq!(province_point_budget(0, 0.5, 500), 0);
    }

    #[test]
    fn test_samples_fall_inside_and_respect_count() {
        let shape = square(0.0, 0.0, 10.0);
        let mut rng = StdRng::seed_from_u64(1);
        let points = sample_points_in_region(&shape, 50, |p| Ok(shape.contains(p)), &mut rng);

        assert!(points.len() <= 50);
        assert!(!points.is_empty());
        for p in &points {
            assert!(p.x() >= 0.0 && p.x() <= 10.0);
            assert!(p.y() >= 0.0 && p.y() <= 10.0);
        }
    }

    #[test]
    fn test_attempts_are_capped() {
        let shape = square(0.0, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut calls = 0;
        let points = sample_points_in_region(
            &shape,
            20,
            |_| {
                calls += 1;
                Ok(false)
            },
            &mut rng,
        );

        assert!(points.is_empty());
        assert_eq!(calls, 20 * ATTEMPTS_PER_POINT);
    }

    #[test]
    fn test_partial_fill_is_returned() {
        // only the lower-left corner of the box counts as inside
        let shape = square(0.0, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(3);
        let mut calls = 0;
        let points = sample_points_in_region(
            &shape,
            100,
            |p| {
                calls += 1;
                Ok(p.x() < 0.05 && p.y() < 0.05)
            },
            &mut rng,
        );

        assert!(calls <= 1000);
        assert!(points.len() < 100);
    }

    #[test]
    fn test_failing_containment_gives_empty() {
        let shape = square(0.0, 0.0, 1.0);
        let mut rng = StdRng::seed_from_u64(4);
        let mut calls = 0;
        let points = sample_points_in_region(
            &shape,
            10,
            |_| {
                calls += 1;
                if calls > 3 {
                    Err(anyhow!("boundary service unavailable"))
                } else {
                    Ok(true)
                }
            },
            &mut rng,
        );
        assert!(points.is_empty());
    }

    #[test]
    fn test_degenerate_boundaries_give_empty() {
        let mut rng = StdRng::seed_from_u64(5);

        let empty = MultiPolygon::<f64>::new(vec![]);
        assert!(sample_points_in_region(&empty, 10, |_| Ok(true), &mut rng).is_empty());

        let flat = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (5.0, 0.0), (0.0, 0.0)]),
            vec![],
        )]);
        assert!(sample_points_in_region(&flat, 10, |_| Ok(true), &mut rng).is_empty());
    }

    #[test]
    fn test_unbounded_boundary_gives_empty() {
        let mut rng = StdRng::seed_from_u64(13);
        let huge = MultiPolygon::new(vec![polygon![
            (x: -1e308, y: 0.0),
            (x: 1e308, y: 0.0),
            (x: 1e308, y: 1.0),
            (x: -1e308, y: 1.0),
            (x: -1e308, y: 0.0),
        ]]);

        assert!(sample_points_in_region(&huge, 10, |_| Ok(true), &mut rng).is_empty());
        assert!(sample_split(&huge, 10, 0.5, &mut rng).is_empty());
    }

    #[test]
    fn test_same_seed_same_points() {
        let shape = square(100.0, -5.0, 3.0);
        let a = sample_split(&shape, 40, 0.3, &mut StdRng::seed_from_u64(9));
        let b = sample_split(&shape, 40, 0.3, &mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_sample_split_on_convex_shape_fills_budget() {
        // a square fills its own bounding box, so every draw is accepted
        let shape = square(0.0, 0.0, 2.0);
        let mut rng = StdRng::seed_from_u64(6);
        let split = sample_split(&shape, 40, 0.25, &mut rng);
        assert_eq!(split.has_access.len(), 10);
        assert_eq!(split.no_access.len(), 30);

        let dots = split.into_dots(&CleanCode::Known("11".to_string()));
        assert_eq!(dots.iter().filter(|d| d.access == Access::HasAccess).count(), 10);
    }

    #[test]
    fn test_province_detail_budget_and_ratio() {
        let table = aggregate_by_province(&[record("11", 100, 20)]);
        let totals = table.iter().next().unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let dots = province_detail(
            &SamplingConfig::default(),
            totals,
            &boundary("11", square(0.0, 0.0, 1.0)),
            &mut rng,
        );
        assert_eq!(dots.len(), 50);
        assert_eq!(dots.iter().filter(|d| d.access == Access::HasAccess).count(), 10);
    }

    #[test]
    fn test_national_overview_skips_missing_boundaries() {
        let table = aggregate_by_province(&[
            record("11", 900, 450),
            record("94", 100, 0),
            record("52", 10, 10),
        ]);
        let boundaries = vec![
            boundary("11", square(0.0, 0.0, 1.0)),
            boundary("94", square(5.0, 5.0, 1.0)),
            boundary("31", square(9.0, 9.0, 1.0)),
        ];
        let mut rng = StdRng::seed_from_u64(8);
        let dots = national_overview(&SamplingConfig::default(), &table, &boundaries, &mut rng);

        let count = |code: &str| dots.iter().filter(|d| d.province.as_str() == code).count();
        // 900 / 1010 and 100 / 1010 of 1000 points
        assert_eq!(count("11"), 891);
        assert_eq!(count("94"), 99);
        assert_eq!(count("52"), 0);
        assert!(dots.iter().filter(|d| d.province.as_str() == "94").all(|d| d.access == Access::NoAccess));
    }

    #[test]
    fn test_national_overview_empty_table() {
        let table = ProvinceTable::default();
        let mut rng = StdRng::seed_from_u64(10);
        assert!(national_overview(&SamplingConfig::default(), &table, &[], &mut rng).is_empty());
    }
}
