//! Location strings come in two shapes: `"City,Country"` and `"lat,lon"`.

/// How a configured location is sent to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationQuery<'a> {
  /// Free-text place name, sent as `q`.
  Place(&'a str),
  /// Coordinate pair, sent as `lat` and `lon`.
  Coordinates { lat: &'a str, lon: &'a str },
}

impl<'a> LocationQuery<'a> {
  /// A location is a coordinate pair when the first two comma-separated
  /// parts are both plain decimal numbers. Anything else is a place name.
  pub fn parse(location: &'a str) -> Self {
    let mut parts = location.split(',');
    if let (Some(lat), Some(lon)) = (parts.next(), parts.next()) {
      let (lat, lon) = (lat.trim(), lon.trim());
      if is_decimal(lat) && is_decimal(lon) {
        return Self::Coordinates { lat, lon };
      }
    }
    Self::Place(location)
  }

  /// Query parameters identifying this location.
  pub fn params(&self) -> Vec<(&'static str, &'a str)> {
    match *self {
      Self::Place(q) => vec![("q", q)],
      Self::Coordinates { lat, lon } => vec![("lat", lat), ("lon", lon)],
    }
  }
}

fn is_decimal(s: &str) -> bool {
  let digits = s.strip_prefix('-').unwrap_or(s);
  !digits.is_empty()
    && digits.chars().any(|c| c.is_ascii_digit())
    && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
    && digits.matches('.').count() <= 1
}
