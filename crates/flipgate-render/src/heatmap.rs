use crate::RenderError;
use flipgate_domain::HeatmapMatrix;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// Edge length of one heatmap cell, in pixels.
pub const CELL_SIZE: u32 = 24;

const GRID: u32 = 1;

/// Dark purple through red and orange to pale yellow.
const RAMP: [(f64, [u8; 3]); 5] = [
    (0.0, [3, 5, 26]),
    (0.25, [95, 24, 87]),
    (0.5, [203, 27, 80]),
    (0.75, [244, 120, 82]),
    (1.0, [250, 235, 221]),
];

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8
}

/// Colour for a fliprate in `[0, 1]`; out-of-range values are clamped.
pub fn heat_colour(value: f64) -> Rgb<u8> {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    for pair in RAMP.windows(2) {
        let (lo, lo_rgb) = pair[0];
        let (hi, hi_rgb) = pair[1];
        if v <= hi {
            let t = (v - lo) / (hi - lo);
            return Rgb([
                lerp(lo_rgb[0], hi_rgb[0], t),
                lerp(lo_rgb[1], hi_rgb[1], t),
                lerp(lo_rgb[2], hi_rgb[2], t),
            ]);
        }
    }
    Rgb(RAMP[RAMP.len() - 1].1)
}

/// Rasterize a matrix as a PNG: one cell per (test, window), empty cells
/// black, one-pixel black grid. An empty matrix yields a single black cell.
pub fn render_heatmap_png(matrix: &HeatmapMatrix) -> Result<Vec<u8>, RenderError> {
    let columns = (matrix.windows.len() as u32).max(1);
    let rows = (matrix.rows.len() as u32).max(1);
    let width = columns * (CELL_SIZE + GRID) + GRID;
    let height = rows * (CELL_SIZE + GRID) + GRID;

    // Zero-initialized, i.e. black.
    let mut img = RgbImage::new(width, height);

    for (row_idx, row) in matrix.rows.iter().enumerate() {
        for (col_idx, cell) in row.cells.iter().enumerate() {
            let Some(value) = cell.filter(|v| !v.is_nan()) else {
                continue;
            };
            let colour = heat_colour(value);
            let x0 = GRID + col_idx as u32 * (CELL_SIZE + GRID);
            let y0 = GRID + row_idx as u32 * (CELL_SIZE + GRID);
            for y in y0..(y0 + CELL_SIZE).min(height) {
                for x in x0..(x0 + CELL_SIZE).min(width) {
                    img.put_pixel(x, y, colour);
                }
            }
        }
    }

    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}
