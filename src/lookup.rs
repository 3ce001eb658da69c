use crate::types::ProvinceBoundary;
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::Point;
use rstar::{RTree, RTreeObject, AABB};

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Answers "which province is under this coordinate".
pub struct BoundaryIndex<'a> {
    boundaries: &'a [ProvinceBoundary],
    tree: RTree<AreaIndex>,
}

impl<'a> BoundaryIndex<'a> {
    pub fn new(boundaries: &'a [ProvinceBoundary]) -> Self {
        // Boundaries without extent never contain anything, leave them out.
        let items: Vec<AreaIndex> = boundaries.iter().enumerate()
            .filter_map(|(i, boundary)| {
                let rect = boundary.geometry.bounding_rect()?;
                Some(AreaIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        Self {
            boundaries,
            tree: RTree::bulk_load(items),
        }
    }

    pub fn province_at(&self, lon: f64, lat: f64) -> Option<&'a ProvinceBoundary> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.boundaries.get(candidate.index))
            .find(|boundary| boundary.geometry.contains(&point))
    }
}
