//! Itinerary reconstruction from normalized provider output.
//!
//! The optimization provider reports step durations cumulative from route
//! start, not per-segment. Each segment's travel time is therefore the
//! difference of consecutive cumulative values, and the running wall clock
//! must advance in a single left-to-right pass: every stop's arrival depends
//! on the previous stop's departure.

use tracing::{debug, warn};

use crate::constraint::ConstraintSet;
use crate::error::{Error, Result};
use crate::model::{
    Coordinate, Destination, Itinerary, ItineraryStop, RouteComputation, RouteStep, Waypoint,
};

/// Floor for a derived single-stop leg, absorbing degenerate near-zero
/// round trips.
const MIN_LEG_SECS: i32 = 600;

/// Rebuild the fully timed itinerary for a computed route.
///
/// `waypoints` is the exact list submitted to the provider, in submission
/// order; `destinations` supplies address lines for display and export.
pub fn reconstruct(
    computation: &RouteComputation,
    waypoints: &[Waypoint],
    destinations: &[Destination],
    constraints: &ConstraintSet,
    session_start_secs: i32,
) -> Result<Itinerary> {
    match computation {
        RouteComputation::SingleLeg(route) => {
            if waypoints.len() != 1 {
                return Err(Error::StepMismatch {
                    expected: waypoints.len(),
                    actual: 1,
                });
            }
            reconstruct_single(
                route.total_distance_km,
                route.total_duration_secs,
                &waypoints[0],
                destinations,
                constraints,
                session_start_secs,
            )
        }
        RouteComputation::Optimized(route) => reconstruct_multi(
            route.total_distance_km,
            route.total_duration_secs,
            &route.steps,
            waypoints,
            destinations,
            constraints,
            session_start_secs,
        ),
    }
}

/// Single destination: the provider total covers the full round trip
/// including dwell. The travel share is split evenly between outbound and
/// return legs, floored at ten minutes. The even split is only exact when
/// both legs take equally long; it is preserved here as documented behavior.
fn reconstruct_single(
    total_distance_km: f64,
    total_duration_secs: i32,
    waypoint: &Waypoint,
    destinations: &[Destination],
    constraints: &ConstraintSet,
    session_start_secs: i32,
) -> Result<Itinerary> {
    let dwell = constraints.get(&waypoint.destination_id).dwell_secs();
    let travel = ((total_duration_secs - dwell) / 2).max(MIN_LEG_SECS);
    debug!(
        total = total_duration_secs,
        dwell, travel, "derived single-stop leg duration"
    );

    let arrival = session_start_secs + travel;
    let departure = arrival + dwell;
    let stop = ItineraryStop {
        position: 1,
        destination_id: waypoint.destination_id,
        address: address_line(destinations, waypoint),
        arrival_secs: arrival,
        departure_secs: departure,
        dwell_secs: dwell,
        travel_secs: travel,
    };

    Ok(Itinerary {
        stops: vec![stop],
        session_start_secs,
        session_end_secs: departure + travel,
        total_distance_km,
        total_duration_secs,
    })
}

/// Two or more destinations: one left-to-right pass over the job steps,
/// subtracting consecutive cumulative durations to recover each segment.
fn reconstruct_multi(
    total_distance_km: f64,
    total_duration_secs: i32,
    steps: &[RouteStep],
    waypoints: &[Waypoint],
    destinations: &[Destination],
    constraints: &ConstraintSet,
    session_start_secs: i32,
) -> Result<Itinerary> {
    let mut stops = Vec::with_capacity(waypoints.len());
    let mut clock = session_start_secs;
    let mut previous_cumulative = 0;
    let mut end_cumulative = None;

    for step in steps {
        match step {
            RouteStep::Start => {}
            RouteStep::Job {
                job_id,
                coordinate,
                cumulative_secs,
                ..
            } => {
                let waypoint = match_waypoint(waypoints, *job_id, *coordinate)?;
                let travel = cumulative_secs - previous_cumulative;
                debug!(
                    destination = %waypoint.destination_id,
                    cumulative = cumulative_secs,
                    previous = previous_cumulative,
                    travel,
                    "derived segment travel time"
                );

                let arrival = clock + travel;
                let dwell = constraints.get(&waypoint.destination_id).dwell_secs();
                let departure = arrival + dwell;
                stops.push(ItineraryStop {
                    position: stops.len() + 1,
                    destination_id: waypoint.destination_id,
                    address: address_line(destinations, waypoint),
                    arrival_secs: arrival,
                    departure_secs: departure,
                    dwell_secs: dwell,
                    travel_secs: travel,
                });

                clock = departure;
                previous_cumulative = *cumulative_secs;
            }
            RouteStep::End { cumulative_secs } => {
                end_cumulative = Some(*cumulative_secs);
            }
        }
    }

    if stops.len() != waypoints.len() {
        return Err(Error::StepMismatch {
            expected: waypoints.len(),
            actual: stops.len(),
        });
    }

    let session_end_secs = match end_cumulative {
        Some(cumulative) => {
            let return_travel = cumulative - previous_cumulative;
            debug!(
                cumulative,
                previous = previous_cumulative,
                travel = return_travel,
                "derived return leg travel time"
            );
            clock + return_travel
        }
        None => {
            warn!("route carries no end step; session ends at last departure");
            clock
        }
    };

    Ok(Itinerary {
        stops,
        session_start_secs,
        session_end_secs,
        total_distance_km,
        total_duration_secs,
    })
}

/// Match a provider step back to a submitted waypoint: by echoed job id
/// when present (ids are 1-based waypoint indices), falling back to exact
/// coordinate equality.
fn match_waypoint<'a>(
    waypoints: &'a [Waypoint],
    job_id: Option<u32>,
    coordinate: Coordinate,
) -> Result<&'a Waypoint> {
    if let Some(id) = job_id {
        let index = (id as usize).checked_sub(1);
        if let Some(waypoint) = index.and_then(|index| waypoints.get(index)) {
            return Ok(waypoint);
        }
        warn!(job_id = id, "job id out of range, matching by coordinates");
    }
    waypoints
        .iter()
        .find(|waypoint| waypoint.coordinate == coordinate)
        .ok_or(Error::UnmatchedStep {
            lon: coordinate.lon,
            lat: coordinate.lat,
        })
}

fn address_line(destinations: &[Destination], waypoint: &Waypoint) -> String {
    destinations
        .iter()
        .find(|destination| destination.id == waypoint.destination_id)
        .map(|destination| destination.address.to_string())
        .unwrap_or_else(|| waypoint.name.clone())
}
