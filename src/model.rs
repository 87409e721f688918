//! Domain types shared across the planning pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for a deliverable destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(pub u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A longitude/latitude pair.
///
/// Equality is exact: coordinates submitted to the provider are kept
/// bit-identical so provider steps can be matched back to waypoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Wire order used by geocoding and routing providers.
    pub fn as_lon_lat(&self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self {
            lon: pair[0],
            lat: pair[1],
        }
    }
}

/// Free-text postal address of a destination.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PostalAddress {
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

impl PostalAddress {
    pub fn new(
        street: impl Into<String>,
        postal_code: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            postal_code: postal_code.into(),
            city: city.into(),
            country: country.into(),
        }
    }
}

impl fmt::Display for PostalAddress {
    /// Single-line form: "street, postal_code city, country", skipping
    /// blank components.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locality = [self.postal_code.trim(), self.city.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        let line = [self.street.trim(), locality.as_str(), self.country.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(", ");
        f.write_str(&line)
    }
}

/// A resolvable stop: identity, display name, postal address, and the
/// resolved coordinate once geocoding succeeds.
///
/// A destination without a coordinate cannot participate in route
/// computation.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub id: DestinationId,
    pub name: String,
    pub address: PostalAddress,
    pub coordinate: Option<Coordinate>,
}

impl Destination {
    pub fn new(id: DestinationId, name: impl Into<String>, address: PostalAddress) -> Self {
        Self {
            id,
            name: name.into(),
            address,
            coordinate: None,
        }
    }

    pub fn with_coordinate(mut self, coordinate: Coordinate) -> Self {
        self.coordinate = Some(coordinate);
        self
    }
}

/// The fixed start and end location of every computed route.
#[derive(Debug, Clone, PartialEq)]
pub struct Depot {
    pub name: String,
    pub address: PostalAddress,
    pub coordinate: Coordinate,
}

impl Depot {
    pub fn new(name: impl Into<String>, address: PostalAddress, coordinate: Coordinate) -> Self {
        Self {
            name: name.into(),
            address,
            coordinate,
        }
    }
}

/// Urgency class for a stop. Defaults to `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Allowed arrival interval for a stop, in seconds since midnight.
///
/// Both bounds are always present and `start < end`; a window with only one
/// bound is unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start_secs: i32,
    end_secs: i32,
}

impl TimeWindow {
    pub fn new(start_secs: i32, end_secs: i32) -> crate::error::Result<Self> {
        if start_secs >= end_secs {
            return Err(crate::error::Error::InvalidTimeWindow {
                start_secs,
                end_secs,
            });
        }
        Ok(Self {
            start_secs,
            end_secs,
        })
    }

    /// Operator entry is in minutes of day; storage is seconds of day.
    pub fn from_minutes(start_min: i32, end_min: i32) -> crate::error::Result<Self> {
        Self::new(start_min * 60, end_min * 60)
    }

    pub fn start_secs(&self) -> i32 {
        self.start_secs
    }

    pub fn end_secs(&self) -> i32 {
        self.end_secs
    }
}

/// The resolved, constraint-free representation passed to the request
/// builder. Derived only from a successfully geocoded destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    pub destination_id: DestinationId,
    pub name: String,
    pub coordinate: Coordinate,
}

/// Normalized provider output, one variant per provider shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteComputation {
    /// Round-trip directions for a single destination.
    SingleLeg(SingleLegRoute),
    /// Optimized job sequence for two or more destinations.
    Optimized(OptimizedRoute),
}

impl RouteComputation {
    /// Authoritative route totals as reported by the provider.
    pub fn totals(&self) -> (f64, i32) {
        match self {
            RouteComputation::SingleLeg(route) => {
                (route.total_distance_km, route.total_duration_secs)
            }
            RouteComputation::Optimized(route) => {
                (route.total_distance_km, route.total_duration_secs)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SingleLegRoute {
    pub total_distance_km: f64,
    pub total_duration_secs: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedRoute {
    pub total_distance_km: f64,
    pub total_duration_secs: i32,
    /// Encoded route geometry, when requested from the provider.
    pub geometry: Option<String>,
    pub steps: Vec<RouteStep>,
}

/// One step of an optimized route. Distance and duration values are
/// cumulative from route start, not per-segment deltas.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteStep {
    /// Depot departure.
    Start,
    /// Visit to one submitted job.
    Job {
        /// Provider-echoed job identifier, when the provider supports one.
        job_id: Option<u32>,
        coordinate: Coordinate,
        cumulative_secs: i32,
        cumulative_distance_km: f64,
    },
    /// Depot return.
    End { cumulative_secs: i32 },
}

/// The externally consumed result unit of a computed route.
///
/// Invariants: `departure_secs = arrival_secs + dwell_secs`, and each stop's
/// arrival equals the previous stop's departure plus this stop's incoming
/// travel time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryStop {
    /// 1-based visit position.
    pub position: usize,
    pub destination_id: DestinationId,
    /// Human-readable address line for export and display.
    pub address: String,
    /// Seconds since midnight.
    pub arrival_secs: i32,
    /// Seconds since midnight.
    pub departure_secs: i32,
    pub dwell_secs: i32,
    /// Travel time of the segment leading to this stop.
    pub travel_secs: i32,
}

/// The fully timed, ordered sequence of stops produced by reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub stops: Vec<ItineraryStop>,
    pub session_start_secs: i32,
    /// Depot return time, after the final leg.
    pub session_end_secs: i32,
    pub total_distance_km: f64,
    pub total_duration_secs: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_window_rejects_inverted_bounds() {
        assert!(TimeWindow::new(3600, 3600).is_err());
        assert!(TimeWindow::new(7200, 3600).is_err());
        let window = TimeWindow::new(3600, 7200).unwrap();
        assert_eq!(window.start_secs(), 3600);
        assert_eq!(window.end_secs(), 7200);
    }

    #[test]
    fn time_window_from_minutes_converts_to_seconds() {
        let window = TimeWindow::from_minutes(8 * 60, 12 * 60).unwrap();
        assert_eq!(window.start_secs(), 8 * 3600);
        assert_eq!(window.end_secs(), 12 * 3600);
    }

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn postal_address_display_skips_blank_parts() {
        let full = PostalAddress::new("12 Rue de la Paix", "69002", "Lyon", "France");
        assert_eq!(full.to_string(), "12 Rue de la Paix, 69002 Lyon, France");

        let no_postal = PostalAddress::new("12 Rue de la Paix", "", "Lyon", "France");
        assert_eq!(no_postal.to_string(), "12 Rue de la Paix, Lyon, France");

        let city_only = PostalAddress::new("", "", "Lyon", "France");
        assert_eq!(city_only.to_string(), "Lyon, France");
    }

    #[test]
    fn coordinate_round_trips_wire_order() {
        let coordinate = Coordinate::new(4.8357, 45.764);
        assert_eq!(coordinate.as_lon_lat(), [4.8357, 45.764]);
        assert_eq!(Coordinate::from_lon_lat([4.8357, 45.764]), coordinate);
    }
}
