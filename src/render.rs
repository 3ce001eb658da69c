use crate::colors::{self, hex_to_rgba, mix};
use crate::lookup::BoundaryIndex;
use crate::types::{Access, CleanCode};
use crate::view::{DashboardView, Fill};
use anyhow::{Context, Result};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::Rect;
use image::{ImageBuffer, Rgba, RgbaImage};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const MARGIN: f64 = 10.0;
const DOT_RADIUS: i64 = 1;

/// The drawing side of the dashboard. Everything it needs is in the view.
pub trait Renderer {
    fn draw(&mut self, view: &DashboardView<'_>) -> Result<()>;
}

/// Writes the view as JSON for a browser front end.
pub struct JsonRenderer {
    path: PathBuf,
}

impl JsonRenderer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Renderer for JsonRenderer {
    fn draw(&mut self, view: &DashboardView<'_>) -> Result<()> {
        ensure_parent(&self.path)?;
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {:?}", self.path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), view)
            .with_context(|| format!("Failed to write view to {:?}", self.path))?;
        info!("Wrote view data to {:?}", self.path);
        Ok(())
    }
}

/// Rasterises the choropleth and dot layer into one PNG.
pub struct PngRenderer {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl PngRenderer {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self { path: path.into(), width, height }
    }

    pub fn rasterize(&self, view: &DashboardView<'_>) -> RgbaImage {
        let mut img: RgbaImage = ImageBuffer::from_pixel(self.width, self.height, BACKGROUND);

        let bounds = view.boundaries.iter()
            .filter_map(|b| b.geometry.bounding_rect())
            .reduce(|a, b| union(&a, &b));
        let projection = match bounds.and_then(|r| Mercator::fit(&r, self.width, self.height)) {
            Some(p) => p,
            None => {
                warn!("No usable boundaries, rendering an empty map");
                return img;
            }
        };

        // Fill and projected extent per province, for the diagonal gradient.
        let fills: HashMap<&CleanCode, (&Fill, Rect<f64>)> = view.boundaries.iter()
            .zip(&view.provinces)
            .filter_map(|(boundary, province)| {
                let rect = boundary.geometry.bounding_rect()?;
                let (x0, y1) = projection.project(rect.min().x, rect.min().y);
                let (x1, y0) = projection.project(rect.max().x, rect.max().y);
                Some((&boundary.code, (&province.fill, Rect::new((x0, y0), (x1, y1)))))
            })
            .collect();

        let index = BoundaryIndex::new(view.boundaries);
        for (px, py, pixel) in img.enumerate_pixels_mut() {
            let (x, y) = (px as f64 + 0.5, py as f64 + 0.5);
            let (lon, lat) = projection.invert(x, y);
            let boundary = match index.province_at(lon, lat) {
                Some(b) => b,
                None => continue,
            };
            if let Some((fill, extent)) = fills.get(&boundary.code) {
                *pixel = shade(fill, extent, x, y);
            }
        }

        for dot in &view.dots {
            let (x, y) = projection.project(dot.point.x(), dot.point.y());
            let color = match dot.access {
                Access::HasAccess => hex_to_rgba(colors::HAS_ACCESS_DOT),
                Access::NoAccess => hex_to_rgba(colors::NO_ACCESS_DOT),
            };
            stamp(&mut img, x, y, color, dot.opacity);
        }

        img
    }
}

impl Renderer for PngRenderer {
    fn draw(&mut self, view: &DashboardView<'_>) -> Result<()> {
        ensure_parent(&self.path)?;
        let img = self.rasterize(view);
        img.save(&self.path)
            .with_context(|| format!("Failed to save map image {:?}", self.path))?;
        info!("Wrote {}x{} map to {:?}", self.width, self.height, self.path);
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))?;
    }
    Ok(())
}

fn union(a: &Rect<f64>, b: &Rect<f64>) -> Rect<f64> {
    Rect::new(
        (a.min().x.min(b.min().x), a.min().y.min(b.min().y)),
        (a.max().x.max(b.max().x), a.max().y.max(b.max().y)),
    )
}

/// Gradient runs from the top-left to the bottom-right of the province, over white.
fn shade(fill: &Fill, extent: &Rect<f64>, x: f64, y: f64) -> Rgba<u8> {
    let tx = if extent.width() > 0.0 { (x - extent.min().x) / extent.width() } else { 0.0 };
    let ty = if extent.height() > 0.0 { (y - extent.min().y) / extent.height() } else { 0.0 };
    let color = mix(hex_to_rgba(&fill.start), hex_to_rgba(&fill.end), (tx + ty) / 2.0);
    mix(BACKGROUND, color, fill.opacity)
}

fn stamp(img: &mut RgbaImage, x: f64, y: f64, color: Rgba<u8>, opacity: f64) {
    let (cx, cy) = (x.floor() as i64, y.floor() as i64);
    for dy in -DOT_RADIUS..=DOT_RADIUS {
        for dx in -DOT_RADIUS..=DOT_RADIUS {
            let (px, py) = (cx + dx, cy + dy);
            if px >= 0 && py >= 0 && (px as u32) < img.width() && (py as u32) < img.height() {
                let under = *img.get_pixel(px as u32, py as u32);
                img.put_pixel(px as u32, py as u32, mix(under, color, opacity));
            }
        }
    }
}

/// Mercator projection scaled to fit a lon/lat box inside the canvas.
#[derive(Debug, Clone, Copy)]
struct Mercator {
    scale: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Mercator {
    fn fit(bounds: &Rect<f64>, width: u32, height: u32) -> Option<Self> {
        let (x0, y0) = (bounds.min().x.to_radians(), mercator_y(bounds.min().y));
        let (x1, y1) = (bounds.max().x.to_radians(), mercator_y(bounds.max().y));
        let (span_x, span_y) = (x1 - x0, y1 - y0);
        let avail_w = width as f64 - 2.0 * MARGIN;
        let avail_h = height as f64 - 2.0 * MARGIN;
        if !(span_x > 0.0 && span_y > 0.0 && avail_w > 0.0 && avail_h > 0.0) {
            return None;
        }

        let scale = (avail_w / span_x).min(avail_h / span_y);
        Some(Self {
            scale,
            offset_x: (width as f64 - scale * span_x) / 2.0 - scale * x0,
            offset_y: (height as f64 - scale * span_y) / 2.0 + scale * y1,
        })
    }

    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        (
            self.offset_x + self.scale * lon.to_radians(),
            self.offset_y - self.scale * mercator_y(lat),
        )
    }

    fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = ((x - self.offset_x) / self.scale).to_degrees();
        let my = (self.offset_y - y) / self.scale;
        let lat = (2.0 * my.exp().atan() - PI / 2.0).to_degrees();
        (lon, lat)
    }
}

fn mercator_y(lat: f64) -> f64 {
    (PI / 4.0 + lat.to_radians() / 2.0).tan().ln()
}
