//! Common test fixtures for NDFD Alaska tests.

/// NDFD Alaska 3 km polar stereographic grid (GRIB2 template 3.20).
pub mod alaska {
    pub const NX: u32 = 1649;
    pub const NY: u32 = 1105;
    /// Latitude of the first grid point (degrees).
    pub const LA1: f64 = 40.53;
    /// Longitude of the first grid point (degrees east).
    pub const LO1: f64 = 181.429;
    /// Latitude where the grid spacing is true.
    pub const LAD: f64 = 60.0;
    /// Orientation longitude (degrees east).
    pub const LOV: f64 = 210.0;
    /// Grid spacing in metres.
    pub const DX_M: f64 = 2976.563;
    pub const EARTH_RADIUS_M: f64 = 6_371_200.0;
}

/// Reference times used across tests.
pub mod time {
    /// 12Z cycle on 2024-06-10, (year, month, day, hour).
    pub const REFERENCE: (u16, u8, u8, u8) = (2024, 6, 10, 12);

    /// Alaska daylight time offset from UTC in hours.
    pub const AKDT_OFFSET_HOURS: i32 = -8;
}

/// Hot-dry-windy scenario values in display units.
pub mod hazard {
    pub const HOT_F: f32 = 80.0;
    pub const DRY_PCT: f32 = 10.0;
    pub const WINDY_MPH: f32 = 30.0;
}
