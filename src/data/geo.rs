// ============================================================
// Layer 4 — Geodesic Distance
// ============================================================
// Great-circle distance between consecutive epicentres, using the
// haversine formula on a sphere of mean Earth radius. Identical
// points give exactly 0 because asin(0) is exactly 0.

/// IUGG mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Great-circle distance in kilometres between two (lat, lon) points in degrees
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi    = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points
    2.0 * EARTH_RADIUS_KM * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Distance from each point to its predecessor; the first point has none and gets 0.
pub fn distances_from_previous(points: &[(f64, f64)]) -> Vec<f64> {
    let mut out = Vec::with_capacity(points.len());
    for (i, &(lat, lon)) in points.iter().enumerate() {
        if i == 0 {
            out.push(0.0);
        } else {
            let (plat, plon) = points[i - 1];
            out.push(haversine_km(lat, lon, plat, plon));
        }
    }
    out
}
