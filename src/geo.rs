use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Default search radius when the query omits one: 50 km.
pub const DEFAULT_RADIUS_METERS: f64 = 50_000.0;

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct DistanceQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in meters (default 50 000).
    pub radius: Option<f64>,
    /// 1-based page number (default 1).
    pub page: Option<u32>,
    /// Results per page (default 20, capped at 100).
    pub per_page: Option<u32>,
}

impl DistanceQuery {
    pub fn radius(&self) -> f64 {
        self.radius.unwrap_or(DEFAULT_RADIUS_METERS)
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Matches within the radius across all pages, not just this one.
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: usize, query: &DistanceQuery) -> Self {
        Self {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        }
    }
}

/// Great-circle distance in meters between two WGS84 points.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat_diff = (lat2 - lat1).to_radians();
    let lon_diff = (lon2 - lon1).to_radians();
    let r_lat1 = lat1.to_radians();
    let r_lat2 = lat2.to_radians();

    let a = (lat_diff / 2.0).sin().powi(2)
        + r_lat1.cos() * r_lat2.cos() * (lon_diff / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Rank candidates against a query point: drop anything beyond the radius,
/// sort by distance ascending (id ascending on ties), and slice out the
/// requested page. Returns the page items paired with their distance in
/// meters, plus the total match count before pagination.
pub fn within_radius<T>(
    candidates: Vec<T>,
    query: &DistanceQuery,
    point: impl Fn(&T) -> (Uuid, f64, f64),
) -> (Vec<(T, f64)>, usize) {
    let radius = query.radius();
    let mut matched: Vec<(T, f64, Uuid)> = candidates
        .into_iter()
        .filter_map(|item| {
            let (id, lat, lon) = point(&item);
            let d = haversine_meters(query.latitude, query.longitude, lat, lon);
            (d <= radius).then_some((item, d, id))
        })
        .collect();
    matched.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.2.cmp(&b.2)));

    let total = matched.len();
    let per_page = query.per_page() as usize;
    let offset = (query.page() as usize - 1) * per_page;
    let items = matched
        .into_iter()
        .skip(offset)
        .take(per_page)
        .map(|(item, d, _)| (item, d))
        .collect();
    (items, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(latitude: f64, longitude: f64) -> DistanceQuery {
        DistanceQuery {
            latitude,
            longitude,
            radius: None,
            page: None,
            per_page: None,
        }
    }

    #[test]
    fn zero_distance_for_same_point() {
        assert_eq!(haversine_meters(40.4168, -3.7038, 40.4168, -3.7038), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_the_equator() {
        // 2 * pi * R / 360
        let d = haversine_meters(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_194.93).abs() < 1.0, "got {d}");
    }

    #[test]
    fn pole_to_pole_is_half_the_circumference() {
        let d = haversine_meters(90.0, 0.0, -90.0, 0.0);
        assert!((d - 20_015_086.8).abs() < 1.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let ab = haversine_meters(40.4168, -3.7038, 41.3874, 2.1686);
        let ba = haversine_meters(41.3874, 2.1686, 40.4168, -3.7038);
        assert!((ab - ba).abs() < 1e-9);
    }

    // Candidates on the equator: ~111.2 km per degree of longitude.
    fn candidates() -> Vec<(Uuid, f64, f64)> {
        vec![
            (Uuid::from_u128(3), 0.0, 0.3),
            (Uuid::from_u128(1), 0.0, 0.1),
            (Uuid::from_u128(2), 0.0, 0.2),
            (Uuid::from_u128(9), 0.0, 10.0),
        ]
    }

    #[test]
    fn filters_by_radius_and_sorts_ascending() {
        let mut q = query(0.0, 0.0);
        q.radius = Some(40_000.0);
        let (items, total) = within_radius(candidates(), &q, |c| (c.0, c.1, c.2));

        assert_eq!(total, 3);
        let ids: Vec<u128> = items.iter().map(|(c, _)| c.0.as_u128()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        for (_, d) in &items {
            assert!(*d <= 40_000.0);
        }
        let dists: Vec<f64> = items.iter().map(|(_, d)| *d).collect();
        assert!(dists.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn ties_break_on_id_ascending() {
        let coincident = vec![
            (Uuid::from_u128(7), 0.0, 0.1),
            (Uuid::from_u128(4), 0.0, 0.1),
            (Uuid::from_u128(5), 0.0, 0.1),
        ];
        let (items, _) = within_radius(coincident, &query(0.0, 0.0), |c| (c.0, c.1, c.2));
        let ids: Vec<u128> = items.iter().map(|(c, _)| c.0.as_u128()).collect();
        assert_eq!(ids, vec![4, 5, 7]);
    }

    #[test]
    fn paginates_without_losing_the_total() {
        let mut q = query(0.0, 0.0);
        q.radius = Some(40_000.0);
        q.per_page = Some(2);

        let (page1, total) = within_radius(candidates(), &q, |c| (c.0, c.1, c.2));
        assert_eq!(total, 3);
        assert_eq!(page1.len(), 2);

        q.page = Some(2);
        let (page2, total) = within_radius(candidates(), &q, |c| (c.0, c.1, c.2));
        assert_eq!(total, 3);
        assert_eq!(page2.len(), 1);
        assert_eq!(page2[0].0 .0.as_u128(), 3);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let mut q = query(0.0, 0.0);
        q.page = Some(50);
        let (items, total) = within_radius(candidates(), &q, |c| (c.0, c.1, c.2));
        assert!(items.is_empty());
        assert_eq!(total, 4);
    }

    #[test]
    fn page_size_is_clamped() {
        let mut q = query(0.0, 0.0);
        q.per_page = Some(100_000);
        assert_eq!(q.per_page(), 100);
        q.per_page = Some(0);
        assert_eq!(q.per_page(), 1);
    }

    #[test]
    fn everything_matches_inside_the_default_radius() {
        let q = query(0.0, 0.0);
        let near = vec![(Uuid::from_u128(1), 0.0, 0.1)];
        let (items, total) = within_radius(near, &q, |c| (c.0, c.1, c.2));
        assert_eq!(total, 1);
        assert_eq!(items.len(), 1);
    }
}
