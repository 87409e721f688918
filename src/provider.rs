//! Routing provider boundary.
//!
//! The provider is a black box with two shapes: a point-to-point directions
//! endpoint (GET, key in query) and a job-list optimization endpoint (POST,
//! bearer auth). Both are normalized here into [`RouteComputation`] so the
//! rest of the pipeline never branches on the wire format. Neither endpoint
//! is retried: an optimization run may be expensive on the provider side.

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{Coordinate, OptimizedRoute, RouteComputation, RouteStep, SingleLegRoute};
use crate::request::{DirectionsRequest, OptimizationBody, ProviderRequest};

/// Computes routes from built requests.
pub trait RouteProvider {
    fn directions(&self, request: &DirectionsRequest) -> Result<RouteComputation>;

    fn optimize(&self, body: &OptimizationBody) -> Result<RouteComputation>;

    fn compute(&self, request: &ProviderRequest) -> Result<RouteComputation> {
        match request {
            ProviderRequest::Directions(directions) => self.directions(directions),
            ProviderRequest::Optimization(body) => self.optimize(body),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Directions base URL; the routing profile is appended as a path
    /// segment.
    pub directions_base_url: String,
    pub optimization_url: String,
    pub api_key: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            directions_base_url: "https://api.openrouteservice.org/v2/directions".to_string(),
            optimization_url: "https://api.openrouteservice.org/optimization".to_string(),
            api_key: String::new(),
            profile: crate::request::DRIVING_PROFILE.to_string(),
            timeout_secs: 30,
        }
    }
}

/// HTTP routing client for both provider endpoints.
#[derive(Debug, Clone)]
pub struct RoutingClient {
    config: RoutingConfig,
    client: reqwest::blocking::Client,
}

impl RoutingClient {
    pub fn new(config: RoutingConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

impl RouteProvider for RoutingClient {
    fn directions(&self, request: &DirectionsRequest) -> Result<RouteComputation> {
        let coordinates = request
            .coordinates
            .iter()
            .map(|coordinate| format!("{},{}", coordinate.lon, coordinate.lat))
            .collect::<Vec<_>>()
            .join(";");
        let url = format!(
            "{}/{}",
            self.config.directions_base_url, self.config.profile
        );

        let response = self
            .client
            .get(url)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("coordinates", coordinates.as_str()),
                ("format", "geojson"),
                ("instructions", "true"),
                ("preference", "fastest"),
                ("units", "km"),
            ])
            .send()?;
        let body = check_status(response)?.json::<DirectionsResponse>()?;
        normalize_directions(body)
    }

    fn optimize(&self, body: &OptimizationBody) -> Result<RouteComputation> {
        let response = self
            .client
            .post(&self.config.optimization_url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()?;
        let body = check_status(response)?.json::<OptimizationResponse>()?;
        normalize_optimization(body)
    }
}

/// Non-2xx responses become `Error::Provider` with the raw body preserved
/// verbatim.
fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(Error::Provider {
            status: status.as_u16(),
            body: response.text().unwrap_or_default(),
        })
    }
}

fn normalize_directions(response: DirectionsResponse) -> Result<RouteComputation> {
    let feature = response.features.into_iter().next().ok_or(Error::MissingRoute)?;
    Ok(RouteComputation::SingleLeg(SingleLegRoute {
        total_distance_km: feature.properties.summary.distance,
        total_duration_secs: feature.properties.summary.duration.round() as i32,
    }))
}

fn normalize_optimization(response: OptimizationResponse) -> Result<RouteComputation> {
    let route = response.routes.into_iter().next().ok_or(Error::MissingRoute)?;

    let mut steps = Vec::with_capacity(route.steps.len());
    for step in route.steps {
        match step.kind.as_str() {
            "start" => steps.push(RouteStep::Start),
            "job" => {
                let location = step.location.ok_or(Error::MissingRoute)?;
                steps.push(RouteStep::Job {
                    job_id: step.job,
                    coordinate: Coordinate::from_lon_lat(location),
                    cumulative_secs: step.duration.round() as i32,
                    cumulative_distance_km: step.distance,
                });
            }
            "end" => steps.push(RouteStep::End {
                cumulative_secs: step.duration.round() as i32,
            }),
            other => debug!(kind = other, "ignoring unknown step type"),
        }
    }

    Ok(RouteComputation::Optimized(OptimizedRoute {
        total_distance_km: route.distance,
        total_duration_secs: route.duration.round() as i32,
        geometry: route.geometry,
        steps,
    }))
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    features: Vec<DirectionsFeature>,
}

#[derive(Debug, Deserialize)]
struct DirectionsFeature {
    properties: DirectionsProperties,
}

#[derive(Debug, Deserialize)]
struct DirectionsProperties {
    summary: DirectionsSummary,
}

#[derive(Debug, Deserialize)]
struct DirectionsSummary {
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OptimizationResponse {
    #[serde(default)]
    routes: Vec<RouteDto>,
}

#[derive(Debug, Deserialize)]
struct RouteDto {
    distance: f64,
    duration: f64,
    geometry: Option<String>,
    #[serde(default)]
    steps: Vec<StepDto>,
}

#[derive(Debug, Deserialize)]
struct StepDto {
    #[serde(rename = "type")]
    kind: String,
    location: Option<[f64; 2]>,
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
    job: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_response_normalizes_to_single_leg() {
        let response: DirectionsResponse = serde_json::from_value(serde_json::json!({
            "features": [{
                "properties": {
                    "summary": { "distance": 12.4, "duration": 1800.3 },
                    "segments": []
                }
            }]
        }))
        .unwrap();

        let computation = normalize_directions(response).unwrap();
        match computation {
            RouteComputation::SingleLeg(route) => {
                assert_eq!(route.total_distance_km, 12.4);
                assert_eq!(route.total_duration_secs, 1800);
            }
            other => panic!("expected single leg, got {other:?}"),
        }
    }

    #[test]
    fn empty_directions_response_is_missing_route() {
        let response: DirectionsResponse =
            serde_json::from_value(serde_json::json!({ "features": [] })).unwrap();
        assert!(matches!(
            normalize_directions(response),
            Err(Error::MissingRoute)
        ));
    }

    #[test]
    fn optimization_response_normalizes_steps_in_order() {
        let response: OptimizationResponse = serde_json::from_value(serde_json::json!({
            "routes": [{
                "distance": 42.7,
                "duration": 2600.0,
                "geometry": "abc123",
                "steps": [
                    { "type": "start", "location": [4.85, 45.76], "distance": 0.0, "duration": 0.0 },
                    { "type": "job", "job": 2, "location": [4.87, 45.74], "distance": 8.1, "duration": 500.0 },
                    { "type": "job", "job": 1, "location": [4.81, 45.78], "distance": 20.5, "duration": 1200.0 },
                    { "type": "end", "location": [4.85, 45.76], "distance": 42.7, "duration": 2600.0 }
                ]
            }]
        }))
        .unwrap();

        let computation = normalize_optimization(response).unwrap();
        let route = match computation {
            RouteComputation::Optimized(route) => route,
            other => panic!("expected optimized route, got {other:?}"),
        };

        assert_eq!(route.total_distance_km, 42.7);
        assert_eq!(route.total_duration_secs, 2600);
        assert_eq!(route.geometry.as_deref(), Some("abc123"));
        assert_eq!(route.steps.len(), 4);
        assert_eq!(route.steps[0], RouteStep::Start);
        assert_eq!(
            route.steps[1],
            RouteStep::Job {
                job_id: Some(2),
                coordinate: Coordinate::new(4.87, 45.74),
                cumulative_secs: 500,
                cumulative_distance_km: 8.1,
            }
        );
        assert_eq!(route.steps[3], RouteStep::End { cumulative_secs: 2600 });
    }

    #[test]
    fn unknown_step_types_are_skipped() {
        let response: OptimizationResponse = serde_json::from_value(serde_json::json!({
            "routes": [{
                "distance": 1.0,
                "duration": 100.0,
                "geometry": null,
                "steps": [
                    { "type": "start" },
                    { "type": "break", "duration": 50.0 },
                    { "type": "end", "duration": 100.0 }
                ]
            }]
        }))
        .unwrap();

        let computation = normalize_optimization(response).unwrap();
        match computation {
            RouteComputation::Optimized(route) => assert_eq!(route.steps.len(), 2),
            other => panic!("expected optimized route, got {other:?}"),
        }
    }

    #[test]
    fn empty_optimization_response_is_missing_route() {
        let response: OptimizationResponse =
            serde_json::from_value(serde_json::json!({ "routes": [] })).unwrap();
        assert!(matches!(
            normalize_optimization(response),
            Err(Error::MissingRoute)
        ));
    }
}
