//! ESRI ASCII Grid (`.asc`) reader and sampler.
//!
//! The LAEI concentration rasters ship in this format: a six-line header
//! (`ncols`, `nrows`, `xllcorner`, `yllcorner`, `cellsize`,
//! `NODATA_value`) followed by rows of whitespace-separated values stored
//! north-to-south. Coordinates are British National Grid meters.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::GridError;

/// A single pollutant raster held in memory.
#[derive(Debug, Clone)]
pub struct AsciiGrid {
    ncols: usize,
    nrows: usize,
    xllcorner: f64,
    yllcorner: f64,
    cellsize: f64,
    nodata: f64,
    /// Row-major values; row 0 is the northernmost row, as stored on disk.
    data: Vec<f64>,
}

impl AsciiGrid {
    /// Assembles a grid from already-parsed parts.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Parse`] when `data` does not hold exactly
    /// `ncols * nrows` values or `cellsize` is not a positive finite
    /// number.
    pub fn from_parts(
        ncols: usize,
        nrows: usize,
        xllcorner: f64,
        yllcorner: f64,
        cellsize: f64,
        nodata: f64,
        data: Vec<f64>,
    ) -> Result<Self, GridError> {
        if data.len() != ncols * nrows {
            return Err(GridError::Parse {
                path: "<memory>".to_string(),
                message: format!(
                    "expected {} values for a {ncols}x{nrows} grid, got {}",
                    ncols * nrows,
                    data.len()
                ),
            });
        }
        if !(cellsize.is_finite() && cellsize > 0.0) {
            return Err(GridError::Parse {
                path: "<memory>".to_string(),
                message: format!("invalid cell size {cellsize}"),
            });
        }

        Ok(Self {
            ncols,
            nrows,
            xllcorner,
            yllcorner,
            cellsize,
            nodata,
            data,
        })
    }

    /// Reads a `.asc` file into memory.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Io`] when the file cannot be read and
    /// [`GridError::Parse`] when the header or body is malformed.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, GridError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| GridError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let grid = Self::parse(BufReader::new(file), &path.display().to_string())?;
        log::info!(
            "Loaded {}: {}x{} cells at {}m resolution, origin ({}, {})",
            path.display(),
            grid.ncols,
            grid.nrows,
            grid.cellsize,
            grid.xllcorner,
            grid.yllcorner
        );

        Ok(grid)
    }

    fn parse(reader: impl BufRead, path: &str) -> Result<Self, GridError> {
        let parse_err = |message: String| GridError::Parse {
            path: path.to_string(),
            message,
        };

        let mut lines = reader.lines();

        let mut ncols = None;
        let mut nrows = None;
        let mut xllcorner = None;
        let mut yllcorner = None;
        let mut cellsize = None;
        let mut nodata = -9999.0;

        // Six header lines precede the data block.
        for _ in 0..6 {
            let line = lines
                .next()
                .ok_or_else(|| parse_err("truncated header".to_string()))?
                .map_err(|e| GridError::Io {
                    path: path.to_string(),
                    source: e,
                })?;

            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                return Err(parse_err(format!("malformed header line: {line:?}")));
            };

            let bad_value = || parse_err(format!("bad header value in line: {line:?}"));

            match key.to_ascii_lowercase().as_str() {
                "ncols" => ncols = Some(value.parse::<usize>().map_err(|_| bad_value())?),
                "nrows" => nrows = Some(value.parse::<usize>().map_err(|_| bad_value())?),
                "xllcorner" => xllcorner = Some(value.parse::<f64>().map_err(|_| bad_value())?),
                "yllcorner" => yllcorner = Some(value.parse::<f64>().map_err(|_| bad_value())?),
                "cellsize" => cellsize = Some(value.parse::<f64>().map_err(|_| bad_value())?),
                "nodata_value" | "nodata" => {
                    nodata = value.parse::<f64>().map_err(|_| bad_value())?;
                }
                other => {
                    return Err(parse_err(format!("unknown header key {other:?}")));
                }
            }
        }

        let ncols = ncols.ok_or_else(|| parse_err("header missing ncols".to_string()))?;
        let nrows = nrows.ok_or_else(|| parse_err("header missing nrows".to_string()))?;
        let xllcorner = xllcorner.ok_or_else(|| parse_err("header missing xllcorner".to_string()))?;
        let yllcorner = yllcorner.ok_or_else(|| parse_err("header missing yllcorner".to_string()))?;
        let cellsize = cellsize.ok_or_else(|| parse_err("header missing cellsize".to_string()))?;

        let mut data = Vec::with_capacity(ncols * nrows);
        for line in lines {
            let line = line.map_err(|e| GridError::Io {
                path: path.to_string(),
                source: e,
            })?;
            for value in line.split_whitespace() {
                let value: f64 = value
                    .parse()
                    .map_err(|_| parse_err(format!("bad data value {value:?}")))?;
                data.push(value);
            }
        }

        Self::from_parts(ncols, nrows, xllcorner, yllcorner, cellsize, nodata, data).map_err(
            |e| match e {
                GridError::Parse { message, .. } => parse_err(message),
                other => other,
            },
        )
    }

    /// Value at a BNG coordinate, or `None` when the point falls outside
    /// the raster extent or on a NODATA/negative cell.
    #[must_use]
    pub fn sample(&self, easting: f64, northing: f64) -> Option<f64> {
        let (col, row) = self.cell_index(easting, northing)?;
        let value = self.data[row * self.ncols + col];

        if value < 0.0 || (value - self.nodata).abs() < 1e-9 {
            return None;
        }

        Some(value)
    }

    /// BNG coordinates of the centre of the cell enclosing the point, or
    /// `None` outside the raster extent.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cell_centre(&self, easting: f64, northing: f64) -> Option<(f64, f64)> {
        let (col, row) = self.cell_index(easting, northing)?;
        // Rows are stored north-to-south; flip back to a from-bottom index
        // to express the centre in grid coordinates.
        let row_from_bottom = self.nrows - 1 - row;

        let centre_e = (col as f64).mul_add(self.cellsize, self.xllcorner) + self.cellsize / 2.0;
        let centre_n =
            (row_from_bottom as f64).mul_add(self.cellsize, self.yllcorner) + self.cellsize / 2.0;

        Some((centre_e, centre_n))
    }

    /// Maps a BNG coordinate to `(col, row)` in data space (row 0 =
    /// north), or `None` outside the extent.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn cell_index(&self, easting: f64, northing: f64) -> Option<(usize, usize)> {
        let col = ((easting - self.xllcorner) / self.cellsize).floor();
        let row_from_bottom = ((northing - self.yllcorner) / self.cellsize).floor();

        if col < 0.0
            || row_from_bottom < 0.0
            || col >= self.ncols as f64
            || row_from_bottom >= self.nrows as f64
        {
            return None;
        }

        let (col, row_from_bottom) = (col as usize, row_from_bottom as usize);

        Some((col, self.nrows - 1 - row_from_bottom))
    }

    /// Whether another raster shares this one's extent and resolution.
    #[must_use]
    pub fn same_geometry(&self, other: &Self) -> bool {
        self.ncols == other.ncols
            && self.nrows == other.nrows
            && (self.xllcorner - other.xllcorner).abs() < 1e-6
            && (self.yllcorner - other.yllcorner).abs() < 1e-6
            && (self.cellsize - other.cellsize).abs() < 1e-6
    }
}
