//! One-shot position reads
//!
//! A terminal has no browser geolocation, so the position comes from the
//! configuration, from an IP lookup service, or not at all.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::state::UserLocation;

pub const DEFAULT_LOCATION_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location access is disabled")]
    Denied,
    #[error("location lookup failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<UserLocation, LocationError>;
}

/// Always answers with the same coordinates
pub struct FixedLocation(pub UserLocation);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<UserLocation, LocationError> {
        Ok(self.0)
    }
}

/// Reports every read as denied
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<UserLocation, LocationError> {
        Err(LocationError::Denied)
    }
}

#[derive(Deserialize)]
struct IpLookupResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Approximates the device position from its public IP address
#[derive(Clone)]
pub struct IpLocator {
    client: Client,
    url: String,
}

impl IpLocator {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl LocationProvider for IpLocator {
    async fn current_position(&self) -> Result<UserLocation, LocationError> {
        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            return Err(LocationError::Unavailable(format!(
                "lookup returned status {}",
                response.status()
            )));
        }

        let lookup: IpLookupResponse = response.json().await?;
        if lookup.status.as_deref().is_some_and(|s| s != "success") {
            return Err(LocationError::Unavailable(
                lookup.message.unwrap_or_else(|| "lookup failed".to_string()),
            ));
        }

        match (lookup.lat, lookup.lon) {
            (Some(latitude), Some(longitude)) => Ok(UserLocation::new(latitude, longitude)),
            _ => Err(LocationError::Unavailable(
                "lookup returned no coordinates".to_string(),
            )),
        }
    }
}
