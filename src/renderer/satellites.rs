//! Satellite path styling and frame conversion

use glam::Vec3;
use nalgebra::Vector3;

use crate::data::Trajectory;
use crate::propagation::EARTH_RADIUS_KM;

/// TEME kilometers to render space in Earth radii.
///
/// TEME uses Z-up (polar axis), but rendering uses Y-up.
/// TEME X -> Render X, TEME Z -> Render Y, TEME Y -> Render -Z (keeps right-handedness)
pub fn to_render_space(pos_km: Vector3<f64>) -> Vec3 {
    let scale = 1.0 / EARTH_RADIUS_KM;
    Vec3::new(
        (pos_km.x * scale) as f32,
        (pos_km.z * scale) as f32,
        (-pos_km.y * scale) as f32,
    )
}

/// Mean altitude over all well-formed samples
pub fn mean_altitude_km(trajectory: &Trajectory) -> Option<f64> {
    let radii: Vec<f64> = trajectory
        .samples
        .iter()
        .filter_map(|s| s.position_km())
        .map(|p| p.norm())
        .collect();
    if radii.is_empty() {
        return None;
    }
    Some(radii.iter().sum::<f64>() / radii.len() as f64 - EARTH_RADIUS_KM)
}

/// Get color for a satellite based on altitude (in km)
pub fn altitude_to_color(altitude_km: f64) -> [f32; 4] {
    // Color gradient:
    // LEO (< 2000 km): Blue to Cyan
    // MEO (2000-35000 km): Cyan to Green
    // GEO (~35786 km): Yellow
    // HEO (> 40000 km): Orange to Red

    let alt = altitude_km as f32;

    if alt < 500.0 {
        // Very low LEO: Deep blue
        [0.2, 0.4, 1.0, 1.0]
    } else if alt < 2000.0 {
        // LEO: Blue to cyan
        let t = (alt - 500.0) / 1500.0;
        [0.2, 0.4 + 0.6 * t, 1.0, 1.0]
    } else if alt < 20000.0 {
        // MEO lower: Cyan to green
        let t = (alt - 2000.0) / 18000.0;
        [0.2 * (1.0 - t), 1.0, 1.0 - t, 1.0]
    } else if alt < 35000.0 {
        // MEO upper: Green to yellow
        let t = (alt - 20000.0) / 15000.0;
        [t, 1.0, 0.0, 1.0]
    } else if alt < 40000.0 {
        // GEO region: Yellow
        [1.0, 1.0, 0.0, 1.0]
    } else {
        // HEO: Orange to red
        let t = ((alt - 40000.0) / 50000.0).min(1.0);
        [1.0, 1.0 - 0.5 * t, 0.0, 1.0]
    }
}

/// Nudge the altitude color per object so neighbouring LEO paths stay apart
pub fn path_color(trajectory: &Trajectory, index: usize) -> [f32; 4] {
    let base = altitude_to_color(mean_altitude_km(trajectory).unwrap_or(0.0));
    let shift = (index % 5) as f32 * 0.12;
    [
        (base[0] + shift).min(1.0),
        (base[1] - shift * 0.5).max(0.0),
        base[2],
        base[3],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Sample;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_axis_swap() {
        let v = to_render_space(Vector3::new(EARTH_RADIUS_KM, 2.0 * EARTH_RADIUS_KM, 3.0 * EARTH_RADIUS_KM));
        assert!((v - Vec3::new(1.0, 3.0, -2.0)).length() < 1e-6);
    }

    #[test]
    fn test_mean_altitude_ignores_malformed() {
        let time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut broken = Sample::new(time, Vector3::zeros());
        broken.x = None;
        let trajectory = Trajectory::new(
            "1",
            "A",
            vec![
                Sample::new(time, Vector3::new(EARTH_RADIUS_KM + 400.0, 0.0, 0.0)),
                broken,
                Sample::new(time, Vector3::new(0.0, EARTH_RADIUS_KM + 600.0, 0.0)),
            ],
        );
        let alt = mean_altitude_km(&trajectory).unwrap();
        assert!((alt - 500.0).abs() < 1e-9);

        assert!(mean_altitude_km(&Trajectory::new("2", "B", Vec::new())).is_none());
    }

    #[test]
    fn test_geo_is_yellow() {
        assert_eq!(altitude_to_color(35786.0), [1.0, 1.0, 0.0, 1.0]);
    }
}
