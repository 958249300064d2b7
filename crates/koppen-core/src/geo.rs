/// Geographic bounding boxes, affine geo-transforms and pixel windows.
/// All coordinate math uses f64; pixel indices are truncated, never rounded.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RasterError;

// ── Bounding box ──────────────────────────────────────────────────────────────

/// Crop window in geographic degrees.
///
/// Serialized as `[west, south, east, north]` to match the usual bbox notation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// European Alps.
    pub const ALPS: Self = Self::new(4.5, 43.5, 16.0, 50.0);
    /// Central Asia (Tian Shan, Pamir, Altai).
    pub const CENTRAL_ASIA: Self = Self::new(45.0, 34.0, 90.0, 56.0);

    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self { west, south, east, north }
    }

    /// Ensure the box is finite and non-degenerate.
    pub fn validate(&self) -> Result<(), RasterError> {
        let reason = if ![self.west, self.south, self.east, self.north].iter().all(|v| v.is_finite()) {
            Some("coordinates must be finite")
        } else if self.west >= self.east {
            Some("west must be less than east")
        } else if self.south >= self.north {
            Some("south must be less than north")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(RasterError::InvalidBoundingBox { bbox: *self, reason }),
            None => Ok(()),
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([west, south, east, north]: [f64; 4]) -> Self {
        Self { west, south, east, north }
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.west, b.south, b.east, b.north]
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[W {}, S {}, E {}, N {}]", self.west, self.south, self.east, self.north)
    }
}

/// Parses `W,S,E,N` or one of the named presets (`alps`, `central-asia`).
impl std::str::FromStr for BoundingBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alps" => return Ok(Self::ALPS),
            "central-asia" | "central_asia" => return Ok(Self::CENTRAL_ASIA),
            _ => {}
        }
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("bad bounding box '{s}': {e}"))?;
        let &[west, south, east, north] = parts.as_slice() else {
            return Err(format!("bad bounding box '{s}': expected W,S,E,N"));
        };
        Ok(Self { west, south, east, north })
    }
}

// ── Pixel window ──────────────────────────────────────────────────────────────

/// Rectangular pixel region of a raster: `col_off..col_off + width`,
/// `row_off..row_off + height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelWindow {
    pub col_off: u32,
    pub row_off: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelWindow {
    pub fn new(col_off: u32, row_off: u32, width: u32, height: u32) -> Self {
        Self { col_off, row_off, width, height }
    }

    /// Number of cells in the window.
    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive end column.
    pub fn col_end(&self) -> u64 {
        u64::from(self.col_off) + u64::from(self.width)
    }

    /// Exclusive end row.
    pub fn row_end(&self) -> u64 {
        u64::from(self.row_off) + u64::from(self.height)
    }

    /// True if the window lies inside a `width`×`height` raster.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.col_end() <= u64::from(width) && self.row_end() <= u64::from(height)
    }
}

impl fmt::Display for PixelWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cols {}..{} rows {}..{}",
            self.col_off,
            self.col_end(),
            self.row_off,
            self.row_end()
        )
    }
}

// ── Geo-transform ─────────────────────────────────────────────────────────────

/// North-up affine transform from pixel to geographic space.
///
/// `lon = origin_x + col * pixel_width`, `lat = origin_y + row * pixel_height`,
/// with `pixel_height` negative for the usual north-up raster. Rotation terms
/// are not supported; CHELSA products carry none.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub origin_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self { origin_x, pixel_width, origin_y, pixel_height }
    }

    /// Build from GeoTIFF `ModelTiepointTag` (I, J, K, X, Y, Z) and
    /// `ModelPixelScaleTag` (ScaleX, ScaleY, ScaleZ). Only the first tie point
    /// is used.
    pub fn from_tiepoint(tiepoint: &[f64], scale: &[f64]) -> Option<Self> {
        let &[i, j, _, x, y, _, ..] = tiepoint else {
            return None;
        };
        let &[sx, sy, ..] = scale else {
            return None;
        };
        if sx == 0.0 || sy == 0.0 {
            return None;
        }
        Some(Self {
            origin_x: x - i * sx,
            pixel_width: sx,
            origin_y: y + j * sy,
            pixel_height: -sy,
        })
    }

    /// Build from a row-major 4×4 GeoTIFF `ModelTransformationTag`.
    /// Rotated transforms are rejected.
    pub fn from_model_transformation(m: &[f64]) -> Option<Self> {
        if m.len() < 16 || m[1] != 0.0 || m[4] != 0.0 || m[0] == 0.0 || m[5] == 0.0 {
            return None;
        }
        Some(Self {
            origin_x: m[3],
            pixel_width: m[0],
            origin_y: m[7],
            pixel_height: m[5],
        })
    }

    /// Fractional pixel position of a geographic coordinate.
    fn world_to_pixel_f64(&self, lon: f64, lat: f64) -> (f64, f64) {
        let col = (lon - self.origin_x) / self.pixel_width;
        let row = (self.origin_y - lat) / -self.pixel_height;
        (col, row)
    }

    /// Map (lon, lat) to integer (col, row), truncating toward zero.
    ///
    /// No bounds validation: use [`GeoTransform::window_for`] to obtain a
    /// checked crop window.
    pub fn world_to_pixel(&self, lon: f64, lat: f64) -> (i64, i64) {
        let (col, row) = self.world_to_pixel_f64(lon, lat);
        (col as i64, row as i64)
    }

    /// Geographic coordinate of the upper-left corner of pixel (col, row).
    pub fn pixel_to_world(&self, col: i64, row: i64) -> (f64, f64) {
        (
            self.origin_x + col as f64 * self.pixel_width,
            self.origin_y + row as f64 * self.pixel_height,
        )
    }

    /// Pixel window covering `bbox` in a `width`×`height` raster.
    ///
    /// The south-west corner gives (min col, max row), the north-east corner
    /// gives (max col, min row). Fails with [`RasterError::OutOfExtent`] when a
    /// corner falls outside the raster or the window would be empty.
    pub fn window_for(&self, bbox: &BoundingBox, width: u32, height: u32) -> Result<PixelWindow, RasterError> {
        bbox.validate()?;
        let out_of_extent = |reason: String| RasterError::OutOfExtent { bbox: *bbox, width, height, reason };

        let corners = [
            ("south-west", bbox.west, bbox.south),
            ("north-east", bbox.east, bbox.north),
        ];
        for (name, lon, lat) in corners {
            let (fc, fr) = self.world_to_pixel_f64(lon, lat);
            if !(0.0..=f64::from(width)).contains(&fc) || !(0.0..=f64::from(height)).contains(&fr) {
                return Err(out_of_extent(format!(
                    "{name} corner ({lon}, {lat}) maps to pixel ({fc:.2}, {fr:.2})"
                )));
            }
        }

        let (min_col, max_row) = self.world_to_pixel(bbox.west, bbox.south);
        let (max_col, min_row) = self.world_to_pixel(bbox.east, bbox.north);
        if max_col <= min_col || max_row <= min_row {
            return Err(out_of_extent(format!(
                "empty window cols {min_col}..{max_col} rows {min_row}..{max_row}"
            )));
        }

        // Corners were range-checked against u32 dimensions above.
        Ok(PixelWindow {
            col_off: min_col as u32,
            row_off: min_row as u32,
            width: (max_col - min_col) as u32,
            height: (max_row - min_row) as u32,
        })
    }
}
