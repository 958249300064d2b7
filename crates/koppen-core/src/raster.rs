//! Single-band GeoTIFF classification rasters with windowed reads.
//!
//! Only the strips or tiles intersecting the requested window are decoded, so
//! cropping a small region out of a global 30 arc-second product stays cheap.
//! TIFF storage order is kept: row 0 is the northern edge.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tiff::{ColorType, TiffResult};
use tracing::debug;

use crate::classes::{ClassCode, NODATA};
use crate::error::RasterError;
use crate::geo::{BoundingBox, GeoTransform, PixelWindow};
use crate::grid::ClassGrid;

/// An opened classification raster. The pixel data is read lazily per window.
pub struct ClassRaster {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    width: u32,
    height: u32,
    transform: GeoTransform,
}

impl std::fmt::Debug for ClassRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRaster")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

impl ClassRaster {
    /// Open a GeoTIFF and read its dimensions and geo-transform.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RasterError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| RasterError::Open { path: path.clone(), source })?;
        let tiff_err = |source| RasterError::Tiff { path: path.clone(), source };

        let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_err)?;
        let (width, height) = decoder.dimensions().map_err(tiff_err)?;
        match decoder.colortype().map_err(tiff_err)? {
            ColorType::Gray(_) | ColorType::Palette(_) => {}
            other => {
                return Err(RasterError::UnsupportedSampleFormat { path, format: format!("{other:?}") });
            }
        }
        let Some(transform) = read_geo_transform(&mut decoder).map_err(tiff_err)? else {
            return Err(RasterError::MissingGeoTransform { path });
        };

        debug!(path = %path.display(), width, height, ?transform, "opened raster");
        Ok(Self { path, decoder, width, height, transform })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Checked pixel window for `bbox` in this raster.
    pub fn window_for(&self, bbox: &BoundingBox) -> Result<PixelWindow, RasterError> {
        self.transform.window_for(bbox, self.width, self.height)
    }

    /// Crop to `bbox`; returns the window used alongside the grid.
    pub fn read_bbox(&mut self, bbox: &BoundingBox) -> Result<(PixelWindow, ClassGrid), RasterError> {
        let window = self.window_for(bbox)?;
        let grid = self.read_window(window)?;
        Ok((window, grid))
    }

    /// Decode the whole raster.
    pub fn read_all(&mut self) -> Result<ClassGrid, RasterError> {
        self.read_window(PixelWindow::new(0, 0, self.width, self.height))
    }

    /// Decode the cells inside `window`.
    ///
    /// Fails with [`RasterError::WindowOutOfBounds`] if the window is empty or
    /// extends past the stored raster.
    pub fn read_window(&mut self, window: PixelWindow) -> Result<ClassGrid, RasterError> {
        if window.is_empty() || !window.fits_within(self.width, self.height) {
            return Err(RasterError::WindowOutOfBounds { window, width: self.width, height: self.height });
        }

        let (chunk_w, chunk_h) = self.decoder.chunk_dimensions();
        let chunks_across = self.width.div_ceil(chunk_w);
        let col_end = window.col_off + window.width;
        let row_end = window.row_off + window.height;
        let out_w = window.width as usize;
        let mut out = ClassGrid::new(out_w, window.height as usize, NODATA);

        for cy in window.row_off / chunk_h..=(row_end - 1) / chunk_h {
            for cx in window.col_off / chunk_w..=(col_end - 1) / chunk_w {
                let index = cy * chunks_across + cx;
                let (data_w, data_h) = self.decoder.chunk_data_dimensions(index);
                let decoded = self
                    .decoder
                    .read_chunk(index)
                    .map_err(|source| RasterError::Tiff { path: self.path.clone(), source })?;
                let samples = self.to_class_codes(decoded)?;
                let expected = data_w as usize * data_h as usize;
                if samples.len() < expected {
                    return Err(RasterError::ChunkSize {
                        path: self.path.clone(),
                        index,
                        got: samples.len(),
                        expected,
                    });
                }

                // Overlap of this chunk with the window, in raster coordinates.
                let x0 = cx * chunk_w;
                let y0 = cy * chunk_h;
                let c_start = x0.max(window.col_off);
                let c_end = (x0 + data_w).min(col_end);
                let r_start = y0.max(window.row_off);
                let r_end = (y0 + data_h).min(row_end);
                if c_start >= c_end {
                    continue;
                }
                let n = (c_end - c_start) as usize;

                for r in r_start..r_end {
                    let src = (r - y0) as usize * data_w as usize + (c_start - x0) as usize;
                    let dst = (r - window.row_off) as usize * out_w + (c_start - window.col_off) as usize;
                    out.data[dst..dst + n].copy_from_slice(&samples[src..src + n]);
                }
            }
        }

        debug!(path = %self.path.display(), %window, "read window");
        Ok(out)
    }

    /// Narrow decoded integer samples to class codes. Values outside
    /// `0..=255` become [`NODATA`].
    fn to_class_codes(&self, decoded: DecodingResult) -> Result<Vec<ClassCode>, RasterError> {
        fn narrow<T: Copy>(v: Vec<T>) -> Vec<ClassCode>
        where
            ClassCode: TryFrom<T>,
        {
            v.into_iter().map(|x| ClassCode::try_from(x).unwrap_or(NODATA)).collect()
        }

        Ok(match decoded {
            DecodingResult::U8(v) => v,
            DecodingResult::I8(v) => narrow(v),
            DecodingResult::U16(v) => narrow(v),
            DecodingResult::I16(v) => narrow(v),
            DecodingResult::U32(v) => narrow(v),
            DecodingResult::I32(v) => narrow(v),
            DecodingResult::U64(v) => narrow(v),
            DecodingResult::I64(v) => narrow(v),
            _ => {
                return Err(RasterError::UnsupportedSampleFormat {
                    path: self.path.clone(),
                    format: "floating point".to_owned(),
                });
            }
        })
    }
}

/// Read the affine transform from GeoTIFF tags. Tie point + pixel scale take
/// precedence over a model transformation matrix.
fn read_geo_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> TiffResult<Option<GeoTransform>> {
    let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?.map(|v| v.into_f64_vec()).transpose()?;
    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?.map(|v| v.into_f64_vec()).transpose()?;
    if let (Some(t), Some(s)) = (&tiepoint, &scale) {
        if let Some(gt) = GeoTransform::from_tiepoint(t, s) {
            return Ok(Some(gt));
        }
    }
    let matrix = decoder.find_tag(Tag::ModelTransformationTag)?.map(|v| v.into_f64_vec()).transpose()?;
    Ok(matrix.as_deref().and_then(GeoTransform::from_model_transformation))
}


#[cfg(test)]
mod tests {
    use super::test_support::write_geotiff;
    use super::*;

    fn numbered_grid(width: usize, height: usize) -> ClassGrid {
        let data = (0..width * height).map(|i| (i % 250) as u8 + 1).collect();
        ClassGrid::from_vec(data, width, height).unwrap()
    }

    #[test]
    fn open_reads_dimensions_and_transform() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.tif");
        let gt = GeoTransform::new(-10.0, 0.5, 60.0, -0.5);
        write_geotiff(&path, &numbered_grid(12, 8), &gt, 8);

        let raster = ClassRaster::open(&path).unwrap();
        assert_eq!((raster.width(), raster.height()), (12, 8));
        assert_eq!(*raster.transform(), gt);
    }

    #[test]
    fn windowed_read_matches_full_read_across_strips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.tif");
        let grid = numbered_grid(13, 11);
        // 3 rows per strip → windows straddle strip boundaries.
        write_geotiff(&path, &grid, &GeoTransform::new(0.0, 1.0, 11.0, -1.0), 3);

        let mut raster = ClassRaster::open(&path).unwrap();
        assert_eq!(raster.read_all().unwrap(), grid);

        let window = PixelWindow::new(2, 2, 7, 6);
        let sub = raster.read_window(window).unwrap();
        assert_eq!(sub.shape(), (7, 6));
        for r in 0..6 {
            for c in 0..7 {
                assert_eq!(sub.get(r, c), grid.get(r + 2, c + 2), "cell ({r}, {c})");
            }
        }
    }

    #[test]
    fn read_bbox_crops_geographically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.tif");
        let grid = numbered_grid(10, 10);
        write_geotiff(&path, &grid, &GeoTransform::new(0.0, 1.0, 10.0, -1.0), 4);

        let mut raster = ClassRaster::open(&path).unwrap();
        let (window, sub) = raster.read_bbox(&BoundingBox::new(3.0, 2.0, 6.0, 8.0)).unwrap();
        assert_eq!(window, PixelWindow::new(3, 2, 3, 6));
        assert_eq!(sub.get(0, 0), grid.get(2, 3));
        assert_eq!(sub.get(5, 2), grid.get(7, 5));
    }

    #[test]
    fn window_past_extent_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.tif");
        write_geotiff(&path, &numbered_grid(4, 4), &GeoTransform::new(0.0, 1.0, 4.0, -1.0), 4);

        let mut raster = ClassRaster::open(&path).unwrap();
        let err = raster.read_window(PixelWindow::new(2, 2, 3, 1)).unwrap_err();
        assert!(matches!(err, RasterError::WindowOutOfBounds { .. }), "{err}");
        let err = raster.read_bbox(&BoundingBox::new(1.0, 1.0, 9.0, 3.0)).unwrap_err();
        assert!(matches!(err, RasterError::OutOfExtent { .. }), "{err}");
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = ClassRaster::open("/nonexistent/CHELSA_kg2.tif").unwrap_err();
        assert!(matches!(err, RasterError::Open { .. }), "{err}");
    }

    #[test]
    fn plain_tiff_without_geo_tags_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.tif");
        {
            let file = File::create(&path).unwrap();
            let mut enc = tiff::encoder::TiffEncoder::new(file).unwrap();
            enc.write_image::<tiff::encoder::colortype::Gray8>(2, 2, &[30, 30, 31, 31]).unwrap();
        }
        let err = ClassRaster::open(&path).unwrap_err();
        assert!(matches!(err, RasterError::MissingGeoTransform { .. }), "{err}");
    }
}
