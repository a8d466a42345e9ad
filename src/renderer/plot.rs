//! Static orbit plot written as a PNG
//!
//! The Earth is ray-cast as a shaded sphere with a lat/long wireframe, then
//! every trajectory is drawn as a polyline. Path points hidden behind the
//! Earth are not drawn.

use std::path::{Path, PathBuf};

use glam::{Vec2, Vec3};
use image::{ImageFormat, Rgba, RgbaImage};
use thiserror::Error;

use super::camera::Camera;
use super::earth::{earth_wireframe, is_occluded_by_earth, ray_hits_earth};
use super::satellites::{path_color, to_render_space};
use crate::config::ConfigError;
use crate::data::TrajectoryBatch;

const BACKGROUND: [u8; 4] = [8, 10, 20, 255];
const EARTH_COLOR: [f32; 3] = [0.15, 0.35, 0.85];
const GRID_COLOR: [f32; 4] = [0.05, 0.05, 0.1, 0.6];

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no trajectory samples to plot")]
    NoData,
    #[error("failed to encode {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    pub camera: Camera,
}

impl RenderOptions {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::ZeroImageSize { width, height });
        }
        Ok(Self {
            width,
            height,
            camera: Camera::default(),
        })
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 800,
            camera: Camera::default(),
        }
    }
}

/// Render every trajectory of `batch` around the Earth and save a PNG at `path`.
///
/// Nothing is written when the batch has no plottable sample.
pub fn render_orbits(
    batch: &TrajectoryBatch,
    path: &Path,
    options: &RenderOptions,
) -> Result<(), RenderError> {
    let paths: Vec<(String, [f32; 4], Vec<Vec3>)> = batch
        .iter()
        .enumerate()
        .filter_map(|(i, trajectory)| {
            let points: Vec<Vec3> = trajectory
                .samples
                .iter()
                .filter_map(|s| s.position_km())
                .map(to_render_space)
                .collect();
            (!points.is_empty()).then(|| (trajectory.name.clone(), path_color(trajectory, i), points))
        })
        .collect();

    if paths.is_empty() {
        log::warn!("No saved predictions to plot");
        return Err(RenderError::NoData);
    }

    let extent = paths
        .iter()
        .flat_map(|(_, _, points)| points.iter())
        .map(|p| p.length())
        .fold(1.0_f32, f32::max);

    let mut camera = options.camera.clone();
    camera.frame(extent);

    let mut canvas = Canvas::new(options.width, options.height, camera);
    canvas.draw_earth();

    for (name, color, points) in &paths {
        log::debug!("Plotting {} ({} points)", name, points.len());
        canvas.draw_path(points, *color);
    }

    save_png(&canvas.image, path)?;
    log::info!("Orbit plot saved to {:?}", path);
    Ok(())
}

struct Canvas {
    image: RgbaImage,
    camera: Camera,
    camera_pos: Vec3,
}

impl Canvas {
    fn new(width: u32, height: u32, camera: Camera) -> Self {
        let camera_pos = camera.position();
        Self {
            image: RgbaImage::from_pixel(width, height, Rgba(BACKGROUND)),
            camera,
            camera_pos,
        }
    }

    fn project(&self, point: Vec3) -> Option<Vec2> {
        self.camera
            .project(point, self.image.width(), self.image.height())
    }

    fn draw_earth(&mut self) {
        let (width, height) = self.image.dimensions();
        let light = Vec3::new(1.0, 0.6, 0.8).normalize();

        for py in 0..height {
            for px in 0..width {
                let dir = self
                    .camera
                    .ray_direction(px as f32 + 0.5, py as f32 + 0.5, width, height);
                if let Some(hit) = ray_hits_earth(self.camera_pos, dir) {
                    let shade = 0.35 + 0.65 * hit.normalize().dot(light).max(0.0);
                    let rgb = EARTH_COLOR.map(|c| c * shade);
                    self.blend(px as i64, py as i64, [rgb[0], rgb[1], rgb[2], 0.85]);
                }
            }
        }

        // Grid lines on the visible hemisphere only
        let eye = self.camera_pos;
        let facing = |p: Vec3| p.dot(eye) > 1.0;
        for line in earth_wireframe(18, 8, 72) {
            for pair in line.windows(2) {
                if facing(pair[0]) && facing(pair[1]) {
                    self.draw_segment(pair[0], pair[1], GRID_COLOR);
                }
            }
        }
    }

    fn draw_path(&mut self, points: &[Vec3], color: [f32; 4]) {
        for pair in points.windows(2) {
            if is_occluded_by_earth(self.camera_pos, pair[0])
                || is_occluded_by_earth(self.camera_pos, pair[1])
            {
                continue;
            }
            self.draw_segment(pair[0], pair[1], color);
        }

        // Mark the first sample
        if let Some(start) = points.first().copied() {
            if !is_occluded_by_earth(self.camera_pos, start) {
                if let Some(p) = self.project(start) {
                    for dy in -2..=2 {
                        for dx in -2..=2 {
                            self.blend(p.x as i64 + dx, p.y as i64 + dy, color);
                        }
                    }
                }
            }
        }
    }

    fn draw_segment(&mut self, a: Vec3, b: Vec3, color: [f32; 4]) {
        let (Some(pa), Some(pb)) = (self.project(a), self.project(b)) else {
            return;
        };

        let delta = pb - pa;
        let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0);
        // Skip segments that blew up in projection
        if !steps.is_finite() || steps > 10_000.0 {
            return;
        }

        let steps = steps as i64;
        for i in 0..=steps {
            let p = pa + delta * (i as f32 / steps as f32);
            self.blend(p.x.round() as i64, p.y.round() as i64, color);
        }
    }

    fn blend(&mut self, x: i64, y: i64, color: [f32; 4]) {
        if x < 0 || y < 0 || x >= self.image.width() as i64 || y >= self.image.height() as i64 {
            return;
        }
        let pixel = self.image.get_pixel_mut(x as u32, y as u32);
        let alpha = color[3].clamp(0.0, 1.0);
        for c in 0..3 {
            let src = color[c].clamp(0.0, 1.0) * 255.0;
            let dst = pixel.0[c] as f32;
            pixel.0[c] = (src * alpha + dst * (1.0 - alpha)).round() as u8;
        }
        pixel.0[3] = 255;
    }
}

/// Encode to a sibling temporary file, then rename into place
fn save_png(image: &RgbaImage, path: &Path) -> Result<(), RenderError> {
    let io_err = |source: std::io::Error| RenderError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = path.with_extension(format!("tmp.{}.png", std::process::id()));
    let written = image
        .save_with_format(&tmp, ImageFormat::Png)
        .map_err(|source| RenderError::Image {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|()| std::fs::rename(&tmp, path).map_err(io_err));

    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written
}
