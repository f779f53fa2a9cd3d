use crate::models::{BoundingBox, Origin, ProviderType, Site, SiteStatus};
use geo::{HaversineDistance, Point};

/// Earth's mean radius in kilometers, as used by `geo`'s haversine
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Bonus subtracted from the distance of university-run courses when boosting
pub const UNIVERSITY_BOOST_KM: f64 = 10.0;

impl Origin {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// Calculate the Haversine distance between two points in kilometers
#[inline]
pub fn haversine_distance(from: Point<f64>, to: Point<f64>) -> f64 {
    from.haversine_distance(&to) / 1000.0
}

/// Distance used purely for ranking when universities are boosted
///
/// Not clamped: a university course close to the origin ranks with a
/// negative value, which is never displayed.
#[inline]
pub fn boosted_distance(distance_km: f64, provider_type: ProviderType, bonus_km: f64) -> f64 {
    if provider_type == ProviderType::University {
        distance_km - bonus_km
    } else {
        distance_km
    }
}

/// A site may be ranked by distance only when it is findable, geocoded and
/// has an address line or postcode
pub fn is_eligible_site(site: &Site, status: &SiteStatus) -> bool {
    status.findable() && site.coordinate().is_some() && site.has_locatable_address()
}

/// Distance to the closest eligible site, or `None` when a course has none
pub fn closest_site_distance<'a, I>(origin: &Origin, sites: I) -> Option<f64>
where
    I: IntoIterator<Item = (&'a Site, &'a SiteStatus)>,
{
    let from = origin.point();
    sites
        .into_iter()
        .filter(|(site, status)| is_eligible_site(site, status))
        .filter_map(|(site, _)| site.coordinate())
        .map(|to| haversine_distance(from, to))
        .min_by(|a, b| a.total_cmp(b))
}

/// Calculate a bounding box around a center point
///
/// This is much faster than Haversine for pre-filtering, and always contains
/// the full search circle.
/// 1° latitude ≈ 111km, 1° longitude ≈ 111km * cos(latitude)
pub fn calculate_bounding_box(lat: f64, lon: f64, radius_km: f64) -> BoundingBox {
    let lat_delta = radius_km / 111.0;

    // Longitude degrees shrink towards the poles, so size the box with the
    // poleward edge rather than the center
    let poleward = lat.abs() + lat_delta;
    let lon_delta = if poleward >= 89.0 {
        180.0
    } else {
        (radius_km / (111.0 * poleward.to_radians().cos())).min(180.0)
    };

    BoundingBox {
        min_lat: lat - lat_delta,
        max_lat: lat + lat_delta,
        min_lon: lon - lon_delta,
        max_lon: lon + lon_delta,
    }
}

/// Longitude ranges covered by `bbox`, wrapped into [-180, 180]
///
/// A box crossing the antimeridian yields two ranges, one on each side.
pub fn longitude_spans(bbox: &BoundingBox) -> Vec<(f64, f64)> {
    if bbox.max_lon - bbox.min_lon >= 360.0 {
        vec![(-180.0, 180.0)]
    } else if bbox.min_lon < -180.0 {
        vec![(bbox.min_lon + 360.0, 180.0), (-180.0, bbox.max_lon)]
    } else if bbox.max_lon > 180.0 {
        vec![(bbox.min_lon, 180.0), (-180.0, bbox.max_lon - 360.0)]
    } else {
        vec![(bbox.min_lon, bbox.max_lon)]
    }
}

/// Check if a point is within a bounding box
#[inline]
pub fn is_within_bounding_box(point: Point<f64>, bbox: &BoundingBox) -> bool {
    point.y() >= bbox.min_lat
        && point.y() <= bbox.max_lat
        && longitude_spans(bbox)
            .iter()
            .any(|(min, max)| point.x() >= *min && point.x() <= *max)
}
