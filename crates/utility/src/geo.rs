use std::{error, fmt};

use serde::{Deserialize, Serialize};

pub const LATITUDE_MIN: f64 = -90.0;
pub const LATITUDE_MAX: f64 = 90.0;
pub const LONGITUDE_MIN: f64 = -180.0;
pub const LONGITUDE_MAX: f64 = 180.0;

/// Half the edge length of a search box, in degrees.
pub const BBOX_HALF_WIDTH: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    NotFinite,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl error::Error for CoordinateError {}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoordinateError::NotFinite => write!(f, "coordinate is not finite"),
            CoordinateError::LatitudeOutOfRange(lat) => {
                write!(f, "latitude {lat} is outside of [-90, 90]")
            }
            CoordinateError::LongitudeOutOfRange(lon) => {
                write!(f, "longitude {lon} is outside of [-180, 180]")
            }
        }
    }
}

/// A point on the globe. Can only be constructed with finite, in-range values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(LATITUDE_MIN..=LATITUDE_MAX).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(LONGITUDE_MIN..=LONGITUDE_MAX).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// How a box crossing ±180° longitude is brought back into range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AntimeridianPolicy {
    /// Pin the box to the antimeridian and shift it inward, like at the poles.
    #[default]
    Clamp,
    /// The historic wrap formula. Near ±180° it yields boxes with
    /// `min_lon > max_lon` or values outside [-180, 180].
    LegacyWrap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn around(coordinate: &Coordinate) -> Self {
        Self::around_with(coordinate, AntimeridianPolicy::default())
    }

    pub fn around_with(coordinate: &Coordinate, policy: AntimeridianPolicy) -> Self {
        let (min_lat, max_lat) = pin_to_range(
            coordinate.latitude - BBOX_HALF_WIDTH,
            coordinate.latitude + BBOX_HALF_WIDTH,
            LATITUDE_MIN,
            LATITUDE_MAX,
        );

        let (min_lon, max_lon) = match policy {
            AntimeridianPolicy::Clamp => pin_to_range(
                coordinate.longitude - BBOX_HALF_WIDTH,
                coordinate.longitude + BBOX_HALF_WIDTH,
                LONGITUDE_MIN,
                LONGITUDE_MAX,
            ),
            AntimeridianPolicy::LegacyWrap => legacy_wrap(
                coordinate.longitude - BBOX_HALF_WIDTH,
                coordinate.longitude + BBOX_HALF_WIDTH,
            ),
        };

        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
            && [self.min_lat, self.max_lat]
                .iter()
                .all(|lat| (LATITUDE_MIN..=LATITUDE_MAX).contains(lat))
            && [self.min_lon, self.max_lon]
                .iter()
                .all(|lon| (LONGITUDE_MIN..=LONGITUDE_MAX).contains(lon))
    }
}

/// Formats as `minLon,minLat,maxLon,maxLat`, the form expected by `bbox=`.
impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Validate a raw latitude/longitude pair and render its search box.
pub fn bbox_parameter(latitude: f64, longitude: f64) -> Result<String, CoordinateError> {
    let coordinate = Coordinate::new(latitude, longitude)?;
    Ok(BoundingBox::around(&coordinate).to_string())
}

// keeps the span: a box poking over a bound is moved back, not shrunk
fn pin_to_range(min: f64, max: f64, lower: f64, upper: f64) -> (f64, f64) {
    if max > upper {
        (upper - BBOX_HALF_WIDTH, upper)
    } else if min < lower {
        (lower, lower + BBOX_HALF_WIDTH)
    } else {
        (min, max)
    }
}

fn legacy_wrap(mut min: f64, mut max: f64) -> (f64, f64) {
    if max > LONGITUDE_MAX {
        max = (max - LONGITUDE_MAX) + LONGITUDE_MIN;
    } else if min < LONGITUDE_MIN {
        min = LONGITUDE_MAX - (min + LONGITUDE_MIN);
    }
    (min, max)
}
