//! Geohash-style scores for coordinates.
//!
//! Longitude and latitude are each normalized into a 26-bit grid index and the
//! two indices are interleaved into a 52-bit score, latitude bits in the even
//! positions and longitude bits in the odd ones. Decoding returns the centre of
//! the grid cell the score identifies.

use thiserror::Error;

pub const MIN_LATITUDE: f64 = -85.05112878;
pub const MAX_LATITUDE: f64 = 85.05112878;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

const LATITUDE_RANGE: f64 = MAX_LATITUDE - MIN_LATITUDE;
const LONGITUDE_RANGE: f64 = MAX_LONGITUDE - MIN_LONGITUDE;
const GRID_STEPS: f64 = (1u64 << 26) as f64;

const EARTH_RADIUS_IN_METERS: f64 = 6372797.560856;

#[derive(Error, Debug, PartialEq)]
pub enum GeoError {
    #[error("invalid longitude,latitude pair {0:.6},{1:.6}")]
    InvalidCoordinates(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

/// Computes the score of a coordinate pair.
pub fn encode(longitude: f64, latitude: f64) -> Result<u64, GeoError> {
    if !(MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude)
        || !(MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude)
    {
        return Err(GeoError::InvalidCoordinates(longitude, latitude));
    }

    let normalized_latitude = grid_index(latitude, MIN_LATITUDE, LATITUDE_RANGE);
    let normalized_longitude = grid_index(longitude, MIN_LONGITUDE, LONGITUDE_RANGE);

    Ok(interleave(normalized_latitude, normalized_longitude))
}

/// Recovers the centre of the grid cell identified by `score`.
pub fn decode(score: u64) -> Coordinates {
    let grid_latitude = compact_u64_to_u32(score);
    let grid_longitude = compact_u64_to_u32(score >> 1);

    Coordinates {
        longitude: cell_centre(grid_longitude, MIN_LONGITUDE, LONGITUDE_RANGE),
        latitude: cell_centre(grid_latitude, MIN_LATITUDE, LATITUDE_RANGE),
    }
}

/// Great-circle distance in metres (haversine).
pub fn distance(from: Coordinates, to: Coordinates) -> f64 {
    let from_latitude = from.latitude.to_radians();
    let to_latitude = to.latitude.to_radians();
    let latitude_delta = (to.latitude - from.latitude).to_radians();
    let longitude_delta = (to.longitude - from.longitude).to_radians();

    let a = (latitude_delta / 2.0).sin().powi(2)
        + from_latitude.cos() * to_latitude.cos() * (longitude_delta / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_IN_METERS * a.sqrt().asin()
}

fn grid_index(value: f64, min: f64, range: f64) -> u32 {
    let index = (GRID_STEPS * (value - min) / range) as u64;

    // The upper bound of the range would otherwise land one past the grid.
    index.min((1 << 26) - 1) as u32
}

fn cell_centre(index: u32, min: f64, range: f64) -> f64 {
    let cell_min = min + range * (index as f64 / GRID_STEPS);
    let cell_max = min + range * ((index as f64 + 1.0) / GRID_STEPS);

    (cell_min + cell_max) / 2.0
}

fn interleave(latitude: u32, longitude: u32) -> u64 {
    spread_u32_to_u64(latitude) | (spread_u32_to_u64(longitude) << 1)
}

fn spread_u32_to_u64(value: u32) -> u64 {
    let mut value = value as u64;

    value = (value | (value << 16)) & 0x0000_FFFF_0000_FFFF;
    value = (value | (value << 8)) & 0x00FF_00FF_00FF_00FF;
    value = (value | (value << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    value = (value | (value << 2)) & 0x3333_3333_3333_3333;
    (value | (value << 1)) & 0x5555_5555_5555_5555
}

fn compact_u64_to_u32(value: u64) -> u32 {
    let mut value = value & 0x5555_5555_5555_5555;

    value = (value | (value >> 1)) & 0x3333_3333_3333_3333;
    value = (value | (value >> 2)) & 0x0F0F_0F0F_0F0F_0F0F;
    value = (value | (value >> 4)) & 0x00FF_00FF_00FF_00FF;
    value = (value | (value >> 8)) & 0x0000_FFFF_0000_FFFF;
    ((value | (value >> 16)) & 0x0000_0000_FFFF_FFFF) as u32
}
