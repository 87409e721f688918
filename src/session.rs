//! Route planning session state machine.
//!
//! One session owns the destinations, constraints, waypoints, provider
//! result and itinerary of a single planning attempt. Computation is split
//! into begin/run/apply so a result arriving after a reset is discarded
//! against a generation counter instead of mutating a stale session.

use tracing::{info, warn};

use crate::constraint::ConstraintSet;
use crate::error::{Error, Result};
use crate::geocode::{AddressResolver, GeocodingProvider, ResolutionFailure};
use crate::itinerary;
use crate::model::{
    Depot, Destination, DestinationId, Itinerary, Priority, RouteComputation, Waypoint,
};
use crate::provider::RouteProvider;
use crate::request::RouteRequestBuilder;

/// Session states. `ConfiguringConstraints` is skipped when exactly one
/// destination is selected; `Result` is the only state from which export
/// operations are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SelectingDestinations,
    ConfiguringConstraints,
    Computing,
    Result,
}

/// Snapshot of one computation attempt. Holds everything the computation
/// needs so the session itself can change (or reset) while the attempt is
/// in flight.
#[derive(Debug, Clone)]
pub struct ComputationJob {
    generation: u64,
    start_secs: i32,
    destinations: Vec<Destination>,
    constraints: ConstraintSet,
}

/// Opaque outcome of running a computation job, applied back onto the
/// session atomically.
pub struct ComputationOutcome(Result<ComputedPlan>);

struct ComputedPlan {
    waypoints: Vec<Waypoint>,
    failures: Vec<ResolutionFailure>,
    computation: RouteComputation,
    itinerary: Itinerary,
}

/// Orchestrates selection, constraint entry, computation and result for one
/// planning attempt.
pub struct RoutePlanningSession<G, R> {
    resolver: AddressResolver<G>,
    provider: R,
    depot: Depot,
    builder: RouteRequestBuilder,
    state: SessionState,
    selected: Vec<Destination>,
    constraints: ConstraintSet,
    waypoints: Vec<Waypoint>,
    computation: Option<RouteComputation>,
    itinerary: Option<Itinerary>,
    resolution_failures: Vec<ResolutionFailure>,
    generation: u64,
}

impl<G, R> RoutePlanningSession<G, R>
where
    G: GeocodingProvider + Sync,
    R: RouteProvider,
{
    pub fn new(depot: Depot, resolver: AddressResolver<G>, provider: R) -> Self {
        let builder = RouteRequestBuilder::new(depot.coordinate);
        Self {
            resolver,
            provider,
            depot,
            builder,
            state: SessionState::SelectingDestinations,
            selected: Vec::new(),
            constraints: ConstraintSet::default(),
            waypoints: Vec::new(),
            computation: None,
            itinerary: None,
            resolution_failures: Vec::new(),
            generation: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn selected_destinations(&self) -> &[Destination] {
        &self.selected
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// Itinerary of the last successful computation, present in `Result`.
    pub fn itinerary(&self) -> Option<&Itinerary> {
        self.itinerary.as_ref()
    }

    /// Normalized provider result backing the itinerary (carries geometry
    /// for map rendering), present in `Result`.
    pub fn computation(&self) -> Option<&RouteComputation> {
        self.computation.as_ref()
    }

    /// Waypoints submitted to the provider for the last computation.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Destinations that failed to resolve during the last computation
    /// attempt, surfaced once as a batch.
    pub fn resolution_failures(&self) -> &[ResolutionFailure] {
        &self.resolution_failures
    }

    /// Add a destination to the current selection. Re-selecting an id
    /// replaces the earlier entry.
    pub fn select_destination(&mut self, destination: Destination) -> Result<()> {
        self.ensure_state(SessionState::SelectingDestinations, "select_destination")?;
        if let Some(existing) = self
            .selected
            .iter_mut()
            .find(|selected| selected.id == destination.id)
        {
            *existing = destination;
        } else {
            self.selected.push(destination);
        }
        Ok(())
    }

    pub fn deselect_all(&mut self) -> Result<()> {
        self.ensure_state(SessionState::SelectingDestinations, "deselect_all")?;
        self.selected.clear();
        Ok(())
    }

    /// Move from selection into constraint entry. With exactly one
    /// destination there is nothing to order, so constraint entry is
    /// bypassed and the session becomes ready to compute.
    pub fn begin_constraints(&mut self) -> Result<()> {
        self.ensure_state(SessionState::SelectingDestinations, "begin_constraints")?;
        if self.selected.is_empty() {
            return Err(Error::EmptySelection);
        }
        if self.selected.len() == 1 {
            self.constraints = ConstraintSet::default();
            self.state = SessionState::Computing;
        } else {
            self.constraints =
                ConstraintSet::initialize(self.selected.iter().map(|destination| destination.id));
            self.state = SessionState::ConfiguringConstraints;
        }
        Ok(())
    }

    /// Replace the constraint for one destination. Invalid windows and
    /// negative dwell are rejected here, before they can reach the builder.
    pub fn set_constraint(
        &mut self,
        id: DestinationId,
        window_minutes: Option<(i32, i32)>,
        priority: Priority,
        service_minutes: i32,
    ) -> Result<()> {
        self.ensure_state(SessionState::ConfiguringConstraints, "set_constraint")?;
        self.constraints
            .set(id, window_minutes, priority, service_minutes)
    }

    pub fn clear_window(&mut self, id: DestinationId) -> Result<()> {
        self.ensure_state(SessionState::ConfiguringConstraints, "clear_window")?;
        self.constraints.clear_window(id);
        Ok(())
    }

    /// Resolve, build, submit and reconstruct in one blocking call.
    pub fn compute_route(&mut self, start_secs: i32) -> Result<&Itinerary> {
        let job = self.begin_computation(start_secs)?;
        let outcome = self.run_computation(&job);
        self.apply_computation(&job, outcome)
    }

    /// Snapshot the current attempt and enter `Computing`.
    pub fn begin_computation(&mut self, start_secs: i32) -> Result<ComputationJob> {
        match self.state {
            SessionState::ConfiguringConstraints
            | SessionState::Computing
            | SessionState::Result => {}
            SessionState::SelectingDestinations => {
                return Err(Error::InvalidState {
                    operation: "compute_route",
                    state: self.state,
                });
            }
        }
        self.state = SessionState::Computing;
        Ok(ComputationJob {
            generation: self.generation,
            start_secs,
            destinations: self.selected.clone(),
            constraints: self.constraints.clone(),
        })
    }

    /// Run a snapshot against the resolver and provider. Borrows the
    /// session immutably: session state is only touched by
    /// [`Self::apply_computation`].
    pub fn run_computation(&self, job: &ComputationJob) -> ComputationOutcome {
        ComputationOutcome(self.run_inner(job))
    }

    fn run_inner(&self, job: &ComputationJob) -> Result<ComputedPlan> {
        let resolution = self.resolver.resolve_all(&job.destinations);
        if !resolution.failed.is_empty() {
            warn!(
                failed = resolution.failed.len(),
                resolved = resolution.resolved.len(),
                "some destinations could not be resolved"
            );
        }
        if resolution.resolved.is_empty() {
            return Err(Error::NoResolvedDestinations);
        }

        let request = self.builder.build(&resolution.resolved, &job.constraints)?;
        let computation = self.provider.compute(&request)?;
        let itinerary = itinerary::reconstruct(
            &computation,
            &resolution.resolved,
            &job.destinations,
            &job.constraints,
            job.start_secs,
        )?;

        Ok(ComputedPlan {
            waypoints: resolution.resolved,
            failures: resolution.failed,
            computation,
            itinerary,
        })
    }

    /// Publish a computation outcome atomically. Outcomes from a superseded
    /// attempt (reset or new plan started since the snapshot) are discarded.
    /// Failures return the session to constraint entry with the operator's
    /// constraints preserved.
    pub fn apply_computation(
        &mut self,
        job: &ComputationJob,
        outcome: ComputationOutcome,
    ) -> Result<&Itinerary> {
        if job.generation != self.generation {
            warn!(
                job_generation = job.generation,
                session_generation = self.generation,
                "discarding computation result from a superseded attempt"
            );
            return Err(Error::StaleComputation);
        }

        match outcome.0 {
            Ok(plan) => {
                info!(
                    stops = plan.itinerary.stops.len(),
                    unresolved = plan.failures.len(),
                    "route computed"
                );
                self.waypoints = plan.waypoints;
                self.resolution_failures = plan.failures;
                self.computation = Some(plan.computation);
                self.state = SessionState::Result;
                Ok(self.itinerary.insert(plan.itinerary))
            }
            Err(err) => {
                self.state = if job.destinations.len() >= 2 {
                    SessionState::ConfiguringConstraints
                } else {
                    SessionState::Computing
                };
                Err(err)
            }
        }
    }

    /// Discard all derived data and return to destination selection. Always
    /// available, from any state.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SessionState::SelectingDestinations;
        self.selected.clear();
        self.constraints = ConstraintSet::default();
        self.waypoints.clear();
        self.computation = None;
        self.itinerary = None;
        self.resolution_failures.clear();
    }

    /// Shareable link for the computed itinerary, valid only in `Result`.
    pub fn export_link(&self) -> Result<String> {
        let itinerary = match (self.state, self.itinerary.as_ref()) {
            (SessionState::Result, Some(itinerary)) => itinerary,
            _ => {
                return Err(Error::InvalidState {
                    operation: "export_link",
                    state: self.state,
                });
            }
        };
        let stops: Vec<&str> = itinerary
            .stops
            .iter()
            .map(|stop| stop.address.as_str())
            .collect();
        crate::export::share_link(&self.depot.address.to_string(), &stops)
    }

    fn ensure_state(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
