use foundation::math::{POINT_RADIUS, project_lat_lon};
use serde_json::Value;

/// Convert coastline GeoJSON into the f32 xyz line-segment binary consumed
/// by the globe renderer.
///
/// Each consecutive coordinate pair in a LineString (or MultiLineString
/// member) becomes one segment: two vertices of three little-endian f32
/// each, projected onto the point shell. Segments spanning the
/// antimeridian (|Δlon| > 180°) are skipped rather than drawn across the
/// globe. Other geometry types are ignored.
pub fn coastline_segments(geojson: &Value) -> Result<Vec<f32>, String> {
    let features = geojson
        .get("features")
        .and_then(|v| v.as_array())
        .ok_or("coastline document has no features array")?;

    let mut vertices: Vec<f32> = Vec::new();

    for feature in features {
        let Some(geometry) = feature.get("geometry") else {
            continue;
        };
        let geom_type = geometry.get("type").and_then(|v| v.as_str()).unwrap_or("");
        let coords = geometry.get("coordinates");

        match (geom_type, coords) {
            ("LineString", Some(line)) => push_line(&mut vertices, line),
            ("MultiLineString", Some(lines)) => {
                if let Some(lines) = lines.as_array() {
                    for line in lines {
                        push_line(&mut vertices, line);
                    }
                }
            }
            _ => {}
        }
    }

    Ok(vertices)
}

fn push_line(vertices: &mut Vec<f32>, line: &Value) {
    let Some(points) = line.as_array() else {
        return;
    };

    for pair in points.windows(2) {
        let (Some((lon1, lat1)), Some((lon2, lat2))) = (lon_lat(&pair[0]), lon_lat(&pair[1]))
        else {
            continue;
        };

        if (lon1 - lon2).abs() > 180.0 {
            continue;
        }

        let a = project_lat_lon(lat1, lon1, POINT_RADIUS);
        let b = project_lat_lon(lat2, lon2, POINT_RADIUS);

        vertices.extend_from_slice(&[a.x as f32, a.y as f32, a.z as f32]);
        vertices.extend_from_slice(&[b.x as f32, b.y as f32, b.z as f32]);
    }
}

fn lon_lat(point: &Value) -> Option<(f64, f64)> {
    let arr = point.as_array()?;
    let lon = arr.first()?.as_f64()?;
    let lat = arr.get(1)?.as_f64()?;
    Some((lon, lat))
}
