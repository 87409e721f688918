//! Share-link construction for computed itineraries.
//!
//! The link encodes the depot, every stop in computed visit order, and the
//! depot again as a Google Maps directions URL. Address strings are
//! percent-encoded as path segments.

use reqwest::Url;

use crate::error::{Error, Result};

const MAPS_DIR_BASE: &str = "https://www.google.com/maps/dir/";

/// Build the shareable directions link for a depot round trip over the
/// given stop addresses, preserving their order.
pub fn share_link(depot_address: &str, stop_addresses: &[&str]) -> Result<String> {
    let mut url =
        Url::parse(MAPS_DIR_BASE).map_err(|err| Error::ShareLink(err.to_string()))?;
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| Error::ShareLink("base url cannot carry path segments".to_string()))?;
        segments.pop_if_empty();
        segments.push(depot_address);
        for address in stop_addresses {
            segments.push(address);
        }
        segments.push(depot_address);
    }
    Ok(url.to_string())
}
