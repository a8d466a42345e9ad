//! Earth reference sphere: a latitude/longitude wireframe in Earth radii

use glam::Vec3;

/// Generate meridian and parallel polylines on the unit sphere (Y up)
///
/// `meridians` lines of constant longitude, `parallels` lines of constant
/// latitude (poles excluded), each with `segments` + 1 points.
pub fn earth_wireframe(meridians: u32, parallels: u32, segments: u32) -> Vec<Vec<Vec3>> {
    let mut lines = Vec::with_capacity((meridians + parallels) as usize);

    for m in 0..meridians {
        let theta = 2.0 * std::f32::consts::PI * m as f32 / meridians as f32;
        let line = (0..=segments)
            .map(|s| {
                let phi = std::f32::consts::PI * s as f32 / segments as f32;
                sphere_point(theta, phi)
            })
            .collect();
        lines.push(line);
    }

    for p in 1..=parallels {
        let phi = std::f32::consts::PI * p as f32 / (parallels + 1) as f32;
        let line = (0..=segments)
            .map(|s| {
                let theta = 2.0 * std::f32::consts::PI * s as f32 / segments as f32;
                sphere_point(theta, phi)
            })
            .collect();
        lines.push(line);
    }

    lines
}

fn sphere_point(theta: f32, phi: f32) -> Vec3 {
    let y = phi.cos();
    let ring_radius = phi.sin();
    Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin())
}

/// First hit of a ray with the unit sphere, if any
pub fn ray_hits_earth(origin: Vec3, dir: Vec3) -> Option<Vec3> {
    let b = 2.0 * origin.dot(dir);
    let c = origin.dot(origin) - 1.0;
    let disc = b * b - 4.0 * c;
    if disc <= 0.0 {
        return None;
    }

    let t = (-b - disc.sqrt()) * 0.5;
    (t > 0.0).then(|| origin + dir * t)
}

/// Whether the segment from the camera to `point` passes through the Earth
pub fn is_occluded_by_earth(camera_pos: Vec3, point: Vec3) -> bool {
    if camera_pos.length_squared() <= 1.0 {
        return false;
    }
    let dir = point - camera_pos;
    let a = dir.dot(dir);
    if a <= 0.0 {
        return false;
    }

    let b = 2.0 * camera_pos.dot(dir);
    let c = camera_pos.dot(camera_pos) - 1.0; // Earth radius = 1 in render units
    let disc = b * b - 4.0 * a * c;
    if disc <= 0.0 {
        return false;
    }

    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    let (tmin, tmax) = if t1 < t2 { (t1, t2) } else { (t2, t1) };

    (0.0..=1.0).contains(&tmin) || (0.0..=1.0).contains(&tmax)
}
