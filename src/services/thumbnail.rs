// SPDX-License-Identifier: MIT

//! Route thumbnail rendering.
//!
//! Produces a small PNG of the finished route: scaled and letterboxed onto a
//! fixed square canvas, path in blue, start marker green, end marker red.
//! Rendering failure is never fatal to finalization; the record is simply
//! stored without a thumbnail.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};

use crate::error::{CoreError, Result};
use crate::models::TrackPoint;

const BACKGROUND: Rgba<u8> = Rgba([0xF5, 0xF5, 0xF5, 0xFF]);
const PATH_COLOR: Rgba<u8> = Rgba([0x21, 0x96, 0xF3, 0xFF]);
const START_COLOR: Rgba<u8> = Rgba([0x4C, 0xAF, 0x50, 0xFF]);
const END_COLOR: Rgba<u8> = Rgba([0xF4, 0x43, 0x36, 0xFF]);

const PADDING: f64 = 20.0;
const MARKER_RADIUS: f64 = 8.0;
const STROKE_RADIUS: i64 = 1;

/// Renders and deletes thumbnail artifacts under one directory.
#[derive(Debug, Clone)]
pub struct ThumbnailRenderer {
    dir: PathBuf,
    size: u32,
}

impl ThumbnailRenderer {
    pub fn new(dir: PathBuf, size: u32) -> Self {
        Self { dir, size }
    }

    /// Render the route to a new PNG file and return its path.
    pub fn render(&self, route: &[TrackPoint]) -> Result<PathBuf> {
        if route.is_empty() {
            return Err(CoreError::ThumbnailRender("empty route".into()));
        }

        let size = self.size.max(2 * PADDING as u32 + 1);
        let mut canvas = RgbaImage::from_pixel(size, size, BACKGROUND);

        let projector = Projector::fit(route, size as f64);
        let points: Vec<(f64, f64)> = route.iter().map(|p| projector.project(p)).collect();

        for pair in points.windows(2) {
            draw_segment(&mut canvas, pair[0], pair[1], PATH_COLOR);
        }
        draw_disc(&mut canvas, points[0], MARKER_RADIUS, START_COLOR);
        if let Some(last) = points.last() {
            draw_disc(&mut canvas, *last, MARKER_RADIUS, END_COLOR);
        }

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| CoreError::ThumbnailRender(e.to_string()))?;
        let path = self.dir.join(format!("track_{}.png", uuid::Uuid::new_v4()));
        canvas
            .save(&path)
            .map_err(|e| CoreError::ThumbnailRender(e.to_string()))?;
        Ok(path)
    }

    /// Remove a thumbnail file; a missing file is not an error.
    pub fn delete(path: &Path) {
        if let Err(err) = std::fs::remove_file(path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %err, "Failed to delete thumbnail");
            }
        }
    }
}

/// Maps lat/lon onto canvas pixels: uniform scale, centered, y flipped so
/// north is up.
struct Projector {
    min_lat: f64,
    min_lng: f64,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    canvas_size: f64,
}

impl Projector {
    fn fit(route: &[TrackPoint], canvas_size: f64) -> Self {
        let mut min_lat = route[0].latitude;
        let mut max_lat = route[0].latitude;
        let mut min_lng = route[0].longitude;
        let mut max_lng = route[0].longitude;
        for point in route {
            min_lat = min_lat.min(point.latitude);
            max_lat = max_lat.max(point.latitude);
            min_lng = min_lng.min(point.longitude);
            max_lng = max_lng.max(point.longitude);
        }

        let lat_range = max_lat - min_lat;
        let lng_range = max_lng - min_lng;
        let draw = canvas_size - 2.0 * PADDING;

        let sx = if lng_range > 1e-12 {
            draw / lng_range
        } else {
            f64::INFINITY
        };
        let sy = if lat_range > 1e-12 {
            draw / lat_range
        } else {
            f64::INFINITY
        };
        let mut scale = sx.min(sy);
        if !scale.is_finite() {
            // Degenerate route (all points identical): park it mid-canvas.
            scale = 0.0;
        }

        Self {
            min_lat,
            min_lng,
            scale,
            offset_x: (draw - lng_range * scale) / 2.0,
            offset_y: (draw - lat_range * scale) / 2.0,
            canvas_size,
        }
    }

    fn project(&self, point: &TrackPoint) -> (f64, f64) {
        let x = PADDING + self.offset_x + (point.longitude - self.min_lng) * self.scale;
        let y = self.canvas_size
            - PADDING
            - self.offset_y
            - (point.latitude - self.min_lat) * self.scale;
        (x, y)
    }
}

fn plot(canvas: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
        canvas.put_pixel(x as u32, y as u32, color);
    }
}

/// Stamp a small square brush around the stroke point.
fn stamp(canvas: &mut RgbaImage, x: f64, y: f64, color: Rgba<u8>) {
    let cx = x.round() as i64;
    let cy = y.round() as i64;
    for dy in -STROKE_RADIUS..=STROKE_RADIUS {
        for dx in -STROKE_RADIUS..=STROKE_RADIUS {
            plot(canvas, cx + dx, cy + dy, color);
        }
    }
}

/// Draw one path segment by stepping along it at sub-pixel increments.
fn draw_segment(canvas: &mut RgbaImage, from: (f64, f64), to: (f64, f64), color: Rgba<u8>) {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        stamp(canvas, from.0 + dx * t, from.1 + dy * t, color);
    }
}

/// Filled circle marker.
fn draw_disc(canvas: &mut RgbaImage, center: (f64, f64), radius: f64, color: Rgba<u8>) {
    let r = radius.ceil() as i64;
    let cx = center.0.round() as i64;
    let cy = center.1.round() as i64;
    for dy in -r..=r {
        for dx in -r..=r {
            if ((dx * dx + dy * dy) as f64) <= radius * radius {
                plot(canvas, cx + dx, cy + dy, color);
            }
        }
    }
}
