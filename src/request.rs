//! Provider request construction.
//!
//! One waypoint becomes a plain round-trip directions request; two or more
//! become a job-list optimization request with one vehicle. The priority
//! ordinal mapping lives here and nowhere else: it is a provider-boundary
//! detail, not a domain concept.

use serde::Serialize;

use crate::constraint::ConstraintSet;
use crate::error::{Error, Result};
use crate::model::{Coordinate, Priority, Waypoint};

/// Routing profile used for the single vehicle.
pub const DRIVING_PROFILE: &str = "driving-car";

/// Vehicle availability window: all day, in seconds since midnight.
const ALL_DAY_SECS: [i32; 2] = [0, 86_400];

/// Output of the builder, one variant per provider endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderRequest {
    Directions(DirectionsRequest),
    Optimization(OptimizationBody),
}

/// Round-trip directions request: depot, destination, depot.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionsRequest {
    pub coordinates: Vec<Coordinate>,
}

/// JSON body for the optimization endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationBody {
    pub jobs: Vec<JobBody>,
    pub vehicles: Vec<VehicleBody>,
    pub options: OptionsBody,
}

/// One deliverable stop. `id` is the 1-based waypoint index, so a provider
/// step echoing the id maps straight back to the submitted waypoint list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobBody {
    pub id: u32,
    pub location: [f64; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_windows: Option<Vec<[i32; 2]>>,
    pub priority: i32,
    /// Service time at the stop, in seconds.
    pub service: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleBody {
    pub id: u32,
    pub profile: String,
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub time_window: [i32; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsBody {
    /// Return full route geometry.
    pub g: bool,
    /// Perform optimization rather than feasibility validation only.
    pub optimize: bool,
}

/// Builds provider requests for a fixed depot.
#[derive(Debug, Clone)]
pub struct RouteRequestBuilder {
    depot: Coordinate,
    profile: String,
}

impl RouteRequestBuilder {
    pub fn new(depot: Coordinate) -> Self {
        Self {
            depot,
            profile: DRIVING_PROFILE.to_string(),
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Build the request for the given waypoints. Coordinates are passed
    /// through untouched so provider steps can be matched back to waypoints
    /// by exact equality. A waypoint with no constraint entry gets the
    /// defaults.
    pub fn build(&self, waypoints: &[Waypoint], constraints: &ConstraintSet) -> Result<ProviderRequest> {
        match waypoints {
            [] => Err(Error::NoResolvedDestinations),
            [single] => Ok(ProviderRequest::Directions(DirectionsRequest {
                coordinates: vec![self.depot, single.coordinate, self.depot],
            })),
            _ => Ok(ProviderRequest::Optimization(
                self.optimization_body(waypoints, constraints),
            )),
        }
    }

    fn optimization_body(
        &self,
        waypoints: &[Waypoint],
        constraints: &ConstraintSet,
    ) -> OptimizationBody {
        let jobs = waypoints
            .iter()
            .enumerate()
            .map(|(index, waypoint)| {
                let constraint = constraints.get(&waypoint.destination_id);
                JobBody {
                    id: (index + 1) as u32,
                    location: waypoint.coordinate.as_lon_lat(),
                    time_windows: constraint
                        .window
                        .map(|window| vec![[window.start_secs(), window.end_secs()]]),
                    priority: priority_ordinal(constraint.priority),
                    service: constraint.dwell_secs(),
                }
            })
            .collect();

        OptimizationBody {
            jobs,
            vehicles: vec![VehicleBody {
                id: 1,
                profile: self.profile.clone(),
                start: self.depot.as_lon_lat(),
                end: self.depot.as_lon_lat(),
                time_window: ALL_DAY_SECS,
            }],
            options: OptionsBody {
                g: true,
                optimize: true,
            },
        }
    }
}

/// Lower is more urgent for the optimization provider.
fn priority_ordinal(priority: Priority) -> i32 {
    match priority {
        Priority::High => 1,
        Priority::Medium => 2,
        Priority::Low => 3,
    }
}
