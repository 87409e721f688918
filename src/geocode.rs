//! Address resolution against a Pelias-style geocoding service.
//!
//! Each destination is resolved by querying an ordered list of address
//! variants, most to least specific. A coarse match is only accepted on the
//! final, city-level variant; anything earlier must be street- or
//! point-level. Destinations in a batch resolve independently on a bounded
//! worker pool so one failure never cancels the rest.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::model::{Coordinate, Destination, DestinationId, PostalAddress, Waypoint};

/// Specificity of a geocoding match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Street-, address- or venue-level match.
    Point,
    /// Locality-level or weaker match.
    Coarse,
}

/// One feature returned by the geocoding provider.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeFeature {
    pub coordinate: Coordinate,
    pub layer: Option<String>,
    pub accuracy: Option<String>,
}

impl GeocodeFeature {
    pub fn precision(&self) -> Precision {
        if self.accuracy.as_deref() == Some("point") {
            return Precision::Point;
        }
        match self.layer.as_deref() {
            Some("address") | Some("street") | Some("venue") => Precision::Point,
            _ => Precision::Coarse,
        }
    }
}

/// Provides forward geocoding for a free-text query.
pub trait GeocodingProvider {
    fn search(&self, text: &str) -> Result<Vec<GeocodeFeature>>;
}

/// Ordered address-string variants for one postal address, most to least
/// specific, ending with the city-level last resort. Blank components are
/// skipped and duplicate variants removed while preserving order.
pub fn address_variants(address: &PostalAddress) -> Vec<String> {
    let street = address.street.trim();
    let postal = address.postal_code.trim();
    let city = address.city.trim();
    let country = address.country.trim();

    let postal_city = join_words(postal, city);
    let street_postal = join_words(street, postal);
    let city_postal = join_words(city, postal);

    let candidates = [
        compose(&[street, &postal_city, country]),
        compose(&[street, city, country]),
        compose(&[&street_postal, city, country]),
        compose(&[street, &city_postal, country]),
        compose(&[city, country]),
    ];

    let mut variants = Vec::new();
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

fn compose(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_words(a: &str, b: &str) -> String {
    [a, b]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// One destination that could not be resolved by any variant.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionFailure {
    pub destination_id: DestinationId,
    pub name: String,
}

/// Outcome of resolving a batch of destinations. Failures are collected,
/// not fatal; computation proceeds with the resolved subset.
#[derive(Debug, Clone, Default)]
pub struct BatchResolution {
    pub resolved: Vec<Waypoint>,
    pub failed: Vec<ResolutionFailure>,
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Upper bound on concurrent geocoding requests.
    pub max_concurrency: usize,
    /// Retries per variant on transient (timeout/5xx) failure.
    pub retry_limit: u32,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_concurrency: 6,
            retry_limit: 2,
        }
    }
}

/// Resolves destinations to coordinates with variant fallback.
pub struct AddressResolver<P> {
    provider: P,
    retry_limit: u32,
    pool: ThreadPool,
}

impl<P> AddressResolver<P>
where
    P: GeocodingProvider + Sync,
{
    pub fn new(provider: P, options: ResolverOptions) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(options.max_concurrency.max(1))
            .build()?;
        Ok(Self {
            provider,
            retry_limit: options.retry_limit,
            pool,
        })
    }

    /// Resolve one address. The variant loop is strictly sequential: each
    /// variant is only tried after the previous one failed or came back too
    /// coarse. Provider errors count as a failed variant.
    pub fn resolve(&self, address: &PostalAddress) -> Option<Coordinate> {
        let variants = address_variants(address);
        let last = variants.len().checked_sub(1)?;

        for (index, variant) in variants.iter().enumerate() {
            match self.search_with_retry(variant) {
                Ok(features) => {
                    let Some(feature) = features.into_iter().next() else {
                        debug!(variant = %variant, "variant returned no features");
                        continue;
                    };
                    if feature.precision() == Precision::Point {
                        debug!(variant = %variant, "accepted point-precision match");
                        return Some(feature.coordinate);
                    }
                    if index == last {
                        debug!(variant = %variant, "accepted coarse match as last resort");
                        return Some(feature.coordinate);
                    }
                    debug!(variant = %variant, "coarse match, trying next variant");
                }
                Err(err) => {
                    warn!(variant = %variant, error = %err, "geocoding variant failed");
                }
            }
        }
        None
    }

    /// Resolve a batch concurrently, bounded by the worker pool. Input order
    /// is preserved in both the resolved and failed lists.
    pub fn resolve_all(&self, destinations: &[Destination]) -> BatchResolution {
        let outcomes: Vec<Option<Coordinate>> = self.pool.install(|| {
            destinations
                .par_iter()
                .map(|destination| self.resolve_destination(destination))
                .collect()
        });

        let mut resolution = BatchResolution::default();
        for (destination, outcome) in destinations.iter().zip(outcomes) {
            match outcome {
                Some(coordinate) => resolution.resolved.push(Waypoint {
                    destination_id: destination.id,
                    name: destination.name.clone(),
                    coordinate,
                }),
                None => {
                    warn!(
                        destination = %destination.name,
                        id = %destination.id,
                        "destination could not be resolved"
                    );
                    resolution.failed.push(ResolutionFailure {
                        destination_id: destination.id,
                        name: destination.name.clone(),
                    });
                }
            }
        }
        resolution
    }

    fn resolve_destination(&self, destination: &Destination) -> Option<Coordinate> {
        if let Some(coordinate) = destination.coordinate {
            return Some(coordinate);
        }
        self.resolve(&destination.address)
    }

    fn search_with_retry(&self, text: &str) -> Result<Vec<GeocodeFeature>> {
        let mut attempt = 0;
        loop {
            match self.provider.search(text) {
                Ok(features) => return Ok(features),
                Err(err) if err.is_transient() && attempt < self.retry_limit => {
                    attempt += 1;
                    warn!(attempt, error = %err, "transient geocoding failure, retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org/geocode/search".to_string(),
            api_key: String::new(),
            timeout_secs: 10,
        }
    }
}

/// HTTP geocoding client (Pelias-style search endpoint).
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    config: GeocoderConfig,
    client: reqwest::blocking::Client,
}

impl GeocodeClient {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

impl GeocodingProvider for GeocodeClient {
    fn search(&self, text: &str) -> Result<Vec<GeocodeFeature>> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("api_key", self.config.api_key.as_str()),
                ("text", text),
                ("size", "1"),
            ])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Provider {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let body = response.json::<GeocodeResponse>()?;
        Ok(body
            .features
            .into_iter()
            .map(|feature| GeocodeFeature {
                coordinate: Coordinate::from_lon_lat(feature.geometry.coordinates),
                layer: feature.properties.layer,
                accuracy: feature.properties.accuracy,
            })
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<FeatureDto>,
}

#[derive(Debug, Deserialize)]
struct FeatureDto {
    geometry: GeometryDto,
    #[serde(default)]
    properties: PropertiesDto,
}

#[derive(Debug, Deserialize)]
struct GeometryDto {
    coordinates: [f64; 2],
}

#[derive(Debug, Default, Deserialize)]
struct PropertiesDto {
    layer: Option<String>,
    accuracy: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    fn address() -> PostalAddress {
        PostalAddress::new("12 Rue de la Paix", "69002", "Lyon", "France")
    }

    fn point(lon: f64, lat: f64) -> GeocodeFeature {
        GeocodeFeature {
            coordinate: Coordinate::new(lon, lat),
            layer: Some("address".to_string()),
            accuracy: Some("point".to_string()),
        }
    }

    fn coarse(lon: f64, lat: f64) -> GeocodeFeature {
        GeocodeFeature {
            coordinate: Coordinate::new(lon, lat),
            layer: Some("locality".to_string()),
            accuracy: Some("centroid".to_string()),
        }
    }

    /// Scripted provider: maps query text to a canned response and records
    /// every query it receives.
    struct ScriptedGeocoder {
        responses: HashMap<String, Vec<GeocodeFeature>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedGeocoder {
        fn new(responses: &[(&str, Vec<GeocodeFeature>)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(text, features)| (text.to_string(), features.clone()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl GeocodingProvider for ScriptedGeocoder {
        fn search(&self, text: &str) -> Result<Vec<GeocodeFeature>> {
            self.calls.lock().unwrap().push(text.to_string());
            Ok(self.responses.get(text).cloned().unwrap_or_default())
        }
    }

    /// Fails transiently a fixed number of times, then succeeds.
    struct FlakyGeocoder {
        failures_before_success: Mutex<u32>,
    }

    impl GeocodingProvider for FlakyGeocoder {
        fn search(&self, _text: &str) -> Result<Vec<GeocodeFeature>> {
            let mut remaining = self.failures_before_success.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Provider {
                    status: 503,
                    body: "service unavailable".to_string(),
                });
            }
            Ok(vec![point(4.83, 45.76)])
        }
    }

    fn resolver<P: GeocodingProvider + Sync>(provider: P) -> AddressResolver<P> {
        AddressResolver::new(provider, ResolverOptions::default()).unwrap()
    }

    #[test]
    fn variants_are_ordered_most_to_least_specific() {
        let variants = address_variants(&address());
        assert_eq!(
            variants,
            vec![
                "12 Rue de la Paix, 69002 Lyon, France",
                "12 Rue de la Paix, Lyon, France",
                "12 Rue de la Paix 69002, Lyon, France",
                "12 Rue de la Paix, Lyon 69002, France",
                "Lyon, France",
            ]
        );
    }

    #[test]
    fn blank_components_collapse_and_dedupe() {
        let variants = address_variants(&PostalAddress::new("", "", "Lyon", "France"));
        assert_eq!(variants, vec!["Lyon, France"]);

        let no_postal = address_variants(&PostalAddress::new("3 Quai Perrache", "", "Lyon", ""));
        assert_eq!(
            no_postal,
            vec!["3 Quai Perrache, Lyon", "Lyon"]
        );
    }

    #[test]
    fn fully_blank_address_yields_no_variants() {
        assert!(address_variants(&PostalAddress::default()).is_empty());
    }

    #[test]
    fn point_layers_classify_as_point_precision() {
        assert_eq!(point(0.0, 0.0).precision(), Precision::Point);
        let street = GeocodeFeature {
            coordinate: Coordinate::new(0.0, 0.0),
            layer: Some("street".to_string()),
            accuracy: None,
        };
        assert_eq!(street.precision(), Precision::Point);
        assert_eq!(coarse(0.0, 0.0).precision(), Precision::Coarse);
    }

    #[test]
    fn precise_third_variant_wins_without_falling_to_city_level() {
        let geocoder = ScriptedGeocoder::new(&[(
            "12 Rue de la Paix 69002, Lyon, France",
            vec![point(4.8357, 45.764)],
        )]);
        let resolver = resolver(geocoder);

        let coordinate = resolver.resolve(&address()).unwrap();
        assert_eq!(coordinate, Coordinate::new(4.8357, 45.764));

        let calls = resolver.provider.calls();
        assert_eq!(calls.len(), 3);
        assert!(!calls.contains(&"Lyon, France".to_string()));
    }

    #[test]
    fn coarse_match_is_only_accepted_on_the_final_variant() {
        // Every variant answers, but only coarsely. The early coarse hits
        // must be passed over; the city-level variant's hit is accepted.
        let geocoder = ScriptedGeocoder::new(&[
            (
                "12 Rue de la Paix, 69002 Lyon, France",
                vec![coarse(4.80, 45.70)],
            ),
            ("Lyon, France", vec![coarse(4.8357, 45.764)]),
        ]);
        let resolver = resolver(geocoder);

        let coordinate = resolver.resolve(&address()).unwrap();
        assert_eq!(coordinate, Coordinate::new(4.8357, 45.764));
        assert_eq!(resolver.provider.calls().len(), 5);
    }

    #[test]
    fn no_features_anywhere_is_not_found() {
        let geocoder = ScriptedGeocoder::new(&[]);
        let resolver = resolver(geocoder);
        assert!(resolver.resolve(&address()).is_none());
        assert_eq!(resolver.provider.calls().len(), 5);
    }

    #[test]
    fn transient_failures_are_retried_then_succeed() {
        let geocoder = FlakyGeocoder {
            failures_before_success: Mutex::new(2),
        };
        let resolver = resolver(geocoder);
        assert!(resolver.resolve(&address()).is_some());
    }

    #[test]
    fn batch_keeps_resolved_subset_when_one_destination_fails() {
        let known = PostalAddress::new("", "", "Lyon", "France");
        let geocoder = ScriptedGeocoder::new(&[("Lyon, France", vec![point(4.8357, 45.764)])]);
        let resolver = resolver(geocoder);

        let destinations = vec![
            Destination::new(DestinationId(1), "Bakery", known.clone()),
            Destination::new(
                DestinationId(2),
                "Nowhere",
                PostalAddress::new("1 Void Lane", "00000", "Atlantis", "Nowhere"),
            ),
            Destination::new(DestinationId(3), "Florist", known),
        ];

        let resolution = resolver.resolve_all(&destinations);
        assert_eq!(resolution.resolved.len(), 2);
        assert_eq!(resolution.failed.len(), 1);
        assert_eq!(resolution.failed[0].destination_id, DestinationId(2));
        assert_eq!(
            resolution
                .resolved
                .iter()
                .map(|waypoint| waypoint.destination_id)
                .collect::<Vec<_>>(),
            vec![DestinationId(1), DestinationId(3)]
        );
    }

    #[test]
    fn already_resolved_destination_skips_geocoding() {
        let geocoder = ScriptedGeocoder::new(&[]);
        let resolver = resolver(geocoder);

        let destination = Destination::new(DestinationId(7), "Cafe", address())
            .with_coordinate(Coordinate::new(4.84, 45.75));
        let resolution = resolver.resolve_all(std::slice::from_ref(&destination));

        assert_eq!(resolution.resolved.len(), 1);
        assert_eq!(
            resolution.resolved[0].coordinate,
            Coordinate::new(4.84, 45.75)
        );
        assert!(resolver.provider.calls().is_empty());
    }
}
