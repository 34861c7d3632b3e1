use super::Vec3;

/// Radius of the point shell, slightly above the unit globe so encoded
/// points sit on top of the surface mesh. Applied uniformly to historical,
/// recent and coastline encoding.
pub const POINT_RADIUS: f64 = 1.02;

/// Project geographic coordinates onto a sphere of the given radius.
///
/// Canonical convention for the whole pipeline (see DESIGN.md): Y-up,
/// right-handed, longitude 0 on the +X axis:
///
/// ```text
/// x = cos(lat) * cos(lon)
/// y = sin(lat)
/// z = -cos(lat) * sin(lon)
/// ```
///
/// Pure and deterministic: the same `(lat, lon, radius)` always yields the
/// same bits, which is what makes encoded binaries reproducible across runs.
/// Callers must pre-validate that `lat_deg` and `lon_deg` are finite.
pub fn project_lat_lon(lat_deg: f64, lon_deg: f64, radius: f64) -> Vec3 {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    let cos_lat = lat.cos();

    Vec3::new(
        radius * cos_lat * lon.cos(),
        radius * lat.sin(),
        radius * -cos_lat * lon.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::{POINT_RADIUS, project_lat_lon};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn equator_prime_meridian_is_plus_x() {
        let v = project_lat_lon(0.0, 0.0, 1.0);
        assert_close(v.x, 1.0, 1e-12);
        assert_close(v.y, 0.0, 1e-12);
        assert_close(v.z, 0.0, 1e-12);
    }

    #[test]
    fn north_pole_is_plus_y() {
        let v = project_lat_lon(90.0, 0.0, 1.0);
        assert_close(v.x, 0.0, 1e-12);
        assert_close(v.y, 1.0, 1e-12);
        assert_close(v.z, 0.0, 1e-12);
    }

    #[test]
    fn equator_90e_is_minus_z() {
        let v = project_lat_lon(0.0, 90.0, 1.0);
        assert_close(v.x, 0.0, 1e-12);
        assert_close(v.y, 0.0, 1e-12);
        assert_close(v.z, -1.0, 1e-12);
    }

    #[test]
    fn radius_scales_uniformly() {
        let unit = project_lat_lon(35.0, -120.0, 1.0);
        let shell = project_lat_lon(35.0, -120.0, POINT_RADIUS);
        assert_close(shell.x, unit.x * POINT_RADIUS, 1e-12);
        assert_close(shell.y, unit.y * POINT_RADIUS, 1e-12);
        assert_close(shell.z, unit.z * POINT_RADIUS, 1e-12);
    }

    #[test]
    fn projection_is_bit_deterministic() {
        let a = project_lat_lon(20.0, 10.0, POINT_RADIUS);
        let b = project_lat_lon(20.0, 10.0, POINT_RADIUS);
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
        assert_eq!(a.z.to_bits(), b.z.to_bits());
    }
}
