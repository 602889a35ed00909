//! British National Grid (EPSG:27700) to WGS84 (EPSG:4326) conversion.
//!
//! Two stages in each direction: the Ordnance Survey transverse Mercator
//! projection on the Airy 1830 ellipsoid, and a 7-parameter Helmert
//! transformation between the OSGB36 and WGS84 datums via geocentric
//! cartesian coordinates.
//!
//! The Helmert shift is the published national approximation; it differs
//! from the definitive OSTN15 correction surface by a few meters. That is
//! accepted here: round-trips through this module are sub-meter, and the
//! consumers are a 20 m raster and a sensor threshold measured in hundreds
//! of meters.

use crate::GeoError;

/// Airy 1830 semi-major axis (meters).
const AIRY_A: f64 = 6_377_563.396;
/// Airy 1830 semi-minor axis (meters).
const AIRY_B: f64 = 6_356_256.909;

/// WGS84 semi-major axis (meters).
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 semi-minor axis (meters).
const WGS84_B: f64 = 6_356_752.314_245;

/// National Grid scale factor on the central meridian.
const F0: f64 = 0.999_601_271_7;
/// Radians per degree.
const DEG: f64 = std::f64::consts::PI / 180.0;
/// True origin latitude (49°N), radians.
const PHI0: f64 = 49.0 * DEG;
/// True origin longitude (2°W), radians.
const LAM0: f64 = -2.0 * DEG;
/// False easting of the true origin (meters).
const E0: f64 = 400_000.0;
/// False northing of the true origin (meters).
const N0: f64 = -100_000.0;

/// Helmert parameters for WGS84 -> OSGB36 (OS national standard values).
/// Translations in meters, rotations in arcseconds, scale in ppm.
const WGS84_TO_OSGB36: Helmert = Helmert {
    tx: -446.448,
    ty: 125.157,
    tz: -542.060,
    rx: -0.1502,
    ry: -0.2470,
    rz: -0.8421,
    s_ppm: 20.4894,
};

struct Helmert {
    tx: f64,
    ty: f64,
    tz: f64,
    rx: f64,
    ry: f64,
    rz: f64,
    s_ppm: f64,
}

impl Helmert {
    /// The reverse transformation: all parameters negated (exact to the
    /// small-angle approximation the forward transform already makes).
    const fn inverse(&self) -> Self {
        Self {
            tx: -self.tx,
            ty: -self.ty,
            tz: -self.tz,
            rx: -self.rx,
            ry: -self.ry,
            rz: -self.rz,
            s_ppm: -self.s_ppm,
        }
    }

    /// Applies the transformation to a geocentric cartesian point.
    fn apply(&self, [x, y, z]: [f64; 3]) -> [f64; 3] {
        let s = 1.0 + self.s_ppm * 1e-6;
        let arcsec = DEG / 3600.0;
        let rx = self.rx * arcsec;
        let ry = self.ry * arcsec;
        let rz = self.rz * arcsec;

        [
            self.tx + s * x - rz * y + ry * z,
            self.ty + rz * x + s * y - rx * z,
            self.tz - ry * x + rx * y + s * z,
        ]
    }
}

/// Converts British National Grid easting/northing to WGS84
/// longitude/latitude (decimal degrees).
///
/// # Errors
///
/// Returns [`GeoError::InvalidCoordinate`] when the input is non-finite or
/// outside the National Grid domain (easting 0..800 km, northing
/// 0..1400 km).
pub fn bng_to_wgs84(easting: f64, northing: f64) -> Result<(f64, f64), GeoError> {
    if !easting.is_finite()
        || !northing.is_finite()
        || !(0.0..800_000.0).contains(&easting)
        || !(0.0..1_400_000.0).contains(&northing)
    {
        return Err(GeoError::InvalidCoordinate { easting, northing });
    }

    let (phi, lam) = tm_inverse(easting, northing);
    let cartesian = geodetic_to_cartesian(phi, lam, AIRY_A, AIRY_B);
    let shifted = WGS84_TO_OSGB36.inverse().apply(cartesian);
    let (lat, lon) = cartesian_to_geodetic(shifted, WGS84_A, WGS84_B);

    Ok((lon / DEG, lat / DEG))
}

/// Converts WGS84 longitude/latitude (decimal degrees) to British National
/// Grid easting/northing.
///
/// # Errors
///
/// Returns [`GeoError::InvalidPosition`] when the input is non-finite or
/// outside the region the National Grid covers (roughly the British
/// Isles), and [`GeoError::InvalidCoordinate`] when the projected result
/// falls outside the grid domain.
pub fn wgs84_to_bng(longitude: f64, latitude: f64) -> Result<(f64, f64), GeoError> {
    if !longitude.is_finite()
        || !latitude.is_finite()
        || !(-9.0..=2.5).contains(&longitude)
        || !(49.0..=61.5).contains(&latitude)
    {
        return Err(GeoError::InvalidPosition {
            longitude,
            latitude,
        });
    }

    let cartesian = geodetic_to_cartesian(latitude * DEG, longitude * DEG, WGS84_A, WGS84_B);
    let shifted = WGS84_TO_OSGB36.apply(cartesian);
    let (phi, lam) = cartesian_to_geodetic(shifted, AIRY_A, AIRY_B);
    let (easting, northing) = tm_forward(phi, lam);

    if !(0.0..800_000.0).contains(&easting) || !(0.0..1_400_000.0).contains(&northing) {
        return Err(GeoError::InvalidCoordinate { easting, northing });
    }

    Ok((easting, northing))
}

const fn ecc_sq(a: f64, b: f64) -> f64 {
    (a * a - b * b) / (a * a)
}

/// Geodetic (radians, height 0) to geocentric cartesian on the given
/// ellipsoid.
fn geodetic_to_cartesian(phi: f64, lam: f64, a: f64, b: f64) -> [f64; 3] {
    let e2 = ecc_sq(a, b);
    let nu = a / (1.0 - e2 * phi.sin().powi(2)).sqrt();

    [
        nu * phi.cos() * lam.cos(),
        nu * phi.cos() * lam.sin(),
        nu * (1.0 - e2) * phi.sin(),
    ]
}

/// Geocentric cartesian back to geodetic (radians) on the given ellipsoid.
/// Latitude converges in a handful of iterations at any terrestrial point.
fn cartesian_to_geodetic([x, y, z]: [f64; 3], a: f64, b: f64) -> (f64, f64) {
    let e2 = ecc_sq(a, b);
    let p = x.hypot(y);

    let mut phi = (z / (p * (1.0 - e2))).atan();
    for _ in 0..8 {
        let nu = a / (1.0 - e2 * phi.sin().powi(2)).sqrt();
        let next = ((z + e2 * nu * phi.sin()) / p).atan();
        if (next - phi).abs() < 1e-14 {
            phi = next;
            break;
        }
        phi = next;
    }

    (phi, y.atan2(x))
}

/// Meridional arc from the true origin latitude, Airy 1830, scaled by F0.
fn meridional_arc(phi: f64) -> f64 {
    let n = (AIRY_A - AIRY_B) / (AIRY_A + AIRY_B);
    let n2 = n * n;
    let n3 = n2 * n;
    let dphi = phi - PHI0;
    let sphi = phi + PHI0;

    AIRY_B
        * F0
        * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * dphi
            - (3.0 * n + 3.0 * n2 + 2.625 * n3) * dphi.sin() * sphi.cos()
            + (1.875 * n2 + 1.875 * n3) * (2.0 * dphi).sin() * (2.0 * sphi).cos()
            - (35.0 / 24.0) * n3 * (3.0 * dphi).sin() * (3.0 * sphi).cos())
}

/// OSGB36 geodetic (radians) to grid easting/northing. Ordnance Survey
/// transverse Mercator series.
fn tm_forward(phi: f64, lam: f64) -> (f64, f64) {
    let e2 = ecc_sq(AIRY_A, AIRY_B);
    let sin_phi = phi.sin();
    let cos_phi = phi.cos();
    let tan_phi = phi.tan();

    let nu = AIRY_A * F0 / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let rho = AIRY_A * F0 * (1.0 - e2) / (1.0 - e2 * sin_phi * sin_phi).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let m = meridional_arc(phi);

    let i = m + N0;
    let ii = (nu / 2.0) * sin_phi * cos_phi;
    let iii = (nu / 24.0) * sin_phi * cos_phi.powi(3) * (5.0 - tan_phi.powi(2) + 9.0 * eta2);
    let iii_a =
        (nu / 720.0) * sin_phi * cos_phi.powi(5) * (61.0 - 58.0 * tan_phi.powi(2) + tan_phi.powi(4));
    let iv = nu * cos_phi;
    let v = (nu / 6.0) * cos_phi.powi(3) * (nu / rho - tan_phi.powi(2));
    let vi = (nu / 120.0)
        * cos_phi.powi(5)
        * (5.0 - 18.0 * tan_phi.powi(2) + tan_phi.powi(4) + 14.0 * eta2
            - 58.0 * tan_phi.powi(2) * eta2);

    let dl = lam - LAM0;

    let northing = i + ii * dl.powi(2) + iii * dl.powi(4) + iii_a * dl.powi(6);
    let easting = E0 + iv * dl + v * dl.powi(3) + vi * dl.powi(5);

    (easting, northing)
}

/// Grid easting/northing to OSGB36 geodetic (radians). Inverse series,
/// iterating the meridional arc to convergence below 0.01 mm.
fn tm_inverse(easting: f64, northing: f64) -> (f64, f64) {
    let e2 = ecc_sq(AIRY_A, AIRY_B);

    let mut phi = PHI0 + (northing - N0) / (AIRY_A * F0);
    let mut m = meridional_arc(phi);
    while (northing - N0 - m).abs() > 1e-5 {
        phi += (northing - N0 - m) / (AIRY_A * F0);
        m = meridional_arc(phi);
    }

    let sin_phi = phi.sin();
    let sec_phi = 1.0 / phi.cos();
    let tan_phi = phi.tan();

    let nu = AIRY_A * F0 / (1.0 - e2 * sin_phi * sin_phi).sqrt();
    let rho = AIRY_A * F0 * (1.0 - e2) / (1.0 - e2 * sin_phi * sin_phi).powf(1.5);
    let eta2 = nu / rho - 1.0;

    let vii = tan_phi / (2.0 * rho * nu);
    let viii = (tan_phi / (24.0 * rho * nu.powi(3)))
        * (5.0 + 3.0 * tan_phi.powi(2) + eta2 - 9.0 * tan_phi.powi(2) * eta2);
    let ix = (tan_phi / (720.0 * rho * nu.powi(5)))
        * (61.0 + 90.0 * tan_phi.powi(2) + 45.0 * tan_phi.powi(4));
    let x = sec_phi / nu;
    let xi = (sec_phi / (6.0 * nu.powi(3))) * (nu / rho + 2.0 * tan_phi.powi(2));
    let xii = (sec_phi / (120.0 * nu.powi(5)))
        * (5.0 + 28.0 * tan_phi.powi(2) + 24.0 * tan_phi.powi(4));
    let xii_a = (sec_phi / (5040.0 * nu.powi(7)))
        * (61.0 + 662.0 * tan_phi.powi(2) + 1320.0 * tan_phi.powi(4) + 720.0 * tan_phi.powi(6));

    let de = easting - E0;

    let lat = phi - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
    let lon = LAM0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xii_a * de.powi(7);

    (lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_within_one_meter() {
        // Central London, Lambeth, outer suburbs.
        let points = [
            (530_000.0, 180_000.0),
            (531_500.0, 175_200.0),
            (510_000.0, 160_000.0),
            (555_000.0, 195_000.0),
        ];

        for (easting, northing) in points {
            let (lon, lat) = bng_to_wgs84(easting, northing).unwrap();
            let (e2, n2) = wgs84_to_bng(lon, lat).unwrap();
            assert!(
                (e2 - easting).abs() < 1.0,
                "easting drift {} at ({easting}, {northing})",
                (e2 - easting).abs()
            );
            assert!(
                (n2 - northing).abs() < 1.0,
                "northing drift {} at ({easting}, {northing})",
                (n2 - northing).abs()
            );
        }
    }

    #[test]
    fn central_london_lands_near_the_thames() {
        // TQ 30000 80000 sits just south of Charing Cross.
        let (lon, lat) = bng_to_wgs84(530_000.0, 180_000.0).unwrap();
        assert!((lat - 51.504).abs() < 0.02, "latitude {lat}");
        assert!((lon - -0.128).abs() < 0.02, "longitude {lon}");
    }

    #[test]
    fn projection_is_monotonic() {
        let (_, lat_south) = bng_to_wgs84(530_000.0, 170_000.0).unwrap();
        let (_, lat_north) = bng_to_wgs84(530_000.0, 190_000.0).unwrap();
        assert!(lat_north > lat_south);

        let (lon_west, _) = bng_to_wgs84(520_000.0, 180_000.0).unwrap();
        let (lon_east, _) = bng_to_wgs84(540_000.0, 180_000.0).unwrap();
        assert!(lon_east > lon_west);
    }

    #[test]
    fn rejects_coordinates_outside_the_grid_domain() {
        assert!(matches!(
            bng_to_wgs84(-1.0, 180_000.0),
            Err(GeoError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            bng_to_wgs84(530_000.0, 2_000_000.0),
            Err(GeoError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            bng_to_wgs84(f64::NAN, 180_000.0),
            Err(GeoError::InvalidCoordinate { .. })
        ));
    }

    #[test]
    fn rejects_positions_outside_the_projected_region() {
        // New York is not on the National Grid.
        assert!(matches!(
            wgs84_to_bng(-74.006, 40.7128),
            Err(GeoError::InvalidPosition { .. })
        ));
        assert!(matches!(
            wgs84_to_bng(f64::INFINITY, 51.5),
            Err(GeoError::InvalidPosition { .. })
        ));
    }
}
