//! Test data generators for synthetic forecast fields.
//!
//! All grids are row-major (row 0 first) and in the native NDFD units:
//! Kelvin for temperature, percent for relative humidity, m/s for wind.

/// Temperature-like values in Kelvin, 250K in the top-left corner rising
/// towards 310K in the bottom-right.
pub fn create_temperature_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x_factor = col as f32 / width.max(1) as f32;
            let y_factor = row as f32 / height.max(1) as f32;
            data.push(250.0 + (x_factor * 30.0) + (y_factor * 30.0));
        }
    }
    data
}

/// Relative humidity in percent, 100% on the first row drying to 5% on the
/// last one.
pub fn create_rh_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let factor = row as f32 / (height.max(2) - 1) as f32;
        for _col in 0..width {
            data.push(100.0 - factor * 95.0);
        }
    }
    data
}

/// Wind speed in m/s: calm in the centre, up to 50 m/s at the edges.
pub fn create_wind_speed_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let max_dist = ((center_x * center_x) + (center_y * center_y)).sqrt();

    for row in 0..height {
        for col in 0..width {
            let dx = col as f32 - center_x;
            let dy = row as f32 - center_y;
            let dist = (dx * dx + dy * dy).sqrt();
            data.push((dist / max_dist) * 50.0);
        }
    }
    data
}

/// Creates a grid of `fill` with NaN at the given (col, row) positions.
pub fn create_grid_with_nans(
    width: usize,
    height: usize,
    fill: f32,
    nan_positions: &[(usize, usize)],
) -> Vec<f32> {
    let mut data = vec![fill; width * height];
    for &(col, row) in nan_positions {
        if col < width && row < height {
            data[row * width + col] = f32::NAN;
        }
    }
    data
}
