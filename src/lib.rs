//! delivery-planner core
//!
//! Delivery-route planning: resolve postal addresses to coordinates, build
//! constrained routing requests, and reconstruct fully timed itineraries
//! from the provider's cumulative step output.

pub mod constraint;
pub mod error;
pub mod export;
pub mod geocode;
pub mod itinerary;
pub mod model;
pub mod provider;
pub mod request;
pub mod session;
