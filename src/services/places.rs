// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Nearby Catholic church lookup.
//!
//! Without a key a single simulated parish is returned. With a key the
//! places "searchNearby" API is queried; any failure yields an empty list.

use crate::models::{GeoPoint, Parish};
use serde::Deserialize;
use serde_json::json;

const PLACES_API_URL: &str = "https://places.googleapis.com";
const FIELD_MASK: &str = "places.displayName,places.formattedAddress,places.location,\
places.rating,places.userRatingCount,places.currentOpeningHours,places.photos,places.googleMapsUri";
const SEARCH_RADIUS_M: f64 = 10_000.0;
const MAX_RESULTS: u32 = 12;

/// Offset applied to the query point for the simulated parish.
pub const SIMULATED_OFFSET: f64 = 0.002;

const DEFAULT_NAME: &str = "Igreja Católica";
const DEFAULT_ADDRESS: &str = "Endereço não disponível";

/// Lookup errors. Internal; callers see an empty or simulated list instead.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Places lookup not configured")]
    Unavailable,

    #[error("Places request failed: {0}")]
    Transport(String),

    #[error("Malformed places response: {0}")]
    Decode(String),
}

#[derive(Debug, Deserialize)]
struct SearchNearbyResponse {
    #[serde(default)]
    places: Vec<PlaceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaceRecord {
    #[serde(default)]
    display_name: Option<LocalizedText>,
    #[serde(default)]
    formatted_address: Option<String>,
    #[serde(default)]
    location: Option<LatLng>,
    #[serde(default)]
    rating: Option<f64>,
    #[serde(default)]
    user_rating_count: Option<u32>,
    #[serde(default)]
    current_opening_hours: Option<OpeningHours>,
    #[serde(default)]
    photos: Vec<Photo>,
    #[serde(default)]
    google_maps_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpeningHours {
    #[serde(default)]
    open_now: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct Photo {
    name: String,
}

#[derive(Clone)]
pub struct PlacesService {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl PlacesService {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: PLACES_API_URL.to_string(),
            api_key,
        }
    }

    /// Point the service at another host (used by tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Churches near `(lat, lng)`. Never fails.
    pub async fn search_nearby(&self, lat: f64, lng: f64) -> Vec<Parish> {
        match self.try_search(lat, lng).await {
            Ok(parishes) => parishes,
            Err(LookupError::Unavailable) => {
                tracing::warn!("Places key missing, returning simulated parish");
                vec![simulated_parish(lat, lng)]
            }
            Err(e) => {
                tracing::error!(error = %e, "Places lookup failed");
                Vec::new()
            }
        }
    }

    async fn try_search(&self, lat: f64, lng: f64) -> Result<Vec<Parish>, LookupError> {
        let key = self.api_key.as_deref().ok_or(LookupError::Unavailable)?;

        let body = json!({
            "includedTypes": ["catholic_church"],
            "maxResultCount": MAX_RESULTS,
            "locationRestriction": {
                "circle": {
                    "center": { "latitude": lat, "longitude": lng },
                    "radius": SEARCH_RADIUS_M
                }
            },
            "languageCode": "pt-BR"
        });

        let response = self
            .http
            .post(format!("{}/v1/places:searchNearby", self.base_url))
            .header("X-Goog-Api-Key", key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&body)
            .send()
            .await
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LookupError::Transport(format!("HTTP {}", response.status())));
        }

        let parsed: SearchNearbyResponse = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        Ok(parsed
            .places
            .into_iter()
            .filter_map(|place| self.decode_place(place, key))
            .collect())
    }

    fn decode_place(&self, place: PlaceRecord, key: &str) -> Option<Parish> {
        let Some(location) = place.location else {
            tracing::debug!("Skipping place without location");
            return None;
        };

        let photo_url = place.photos.first().map(|photo| {
            format!(
                "{}/v1/{}/media?maxHeightPx=400&maxWidthPx=400&key={}",
                self.base_url,
                photo.name,
                urlencoding::encode(key)
            )
        });

        Some(Parish {
            name: place
                .display_name
                .and_then(|n| n.text)
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_NAME.to_string()),
            address: place
                .formatted_address
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_ADDRESS.to_string()),
            location: GeoPoint {
                lat: location.latitude,
                lng: location.longitude,
            },
            rating: place.rating,
            user_ratings_total: place.user_rating_count,
            open_now: place.current_opening_hours.and_then(|h| h.open_now),
            photo_url,
            url: place.google_maps_uri,
            directions_url: Some(directions_url(location.latitude, location.longitude)),
        })
    }
}

/// Map directions link to a coordinate.
pub fn directions_url(lat: f64, lng: f64) -> String {
    format!("https://www.google.com/maps/dir/?api=1&destination={lat},{lng}")
}

fn simulated_parish(lat: f64, lng: f64) -> Parish {
    let location = GeoPoint {
        lat: lat + SIMULATED_OFFSET,
        lng: lng + SIMULATED_OFFSET,
    };
    Parish {
        name: "Paróquia Sagrado Coração (Simulado)".to_string(),
        address: "Configure sua GOOGLE_MAPS_KEY para ver dados reais.".to_string(),
        location,
        rating: Some(5.0),
        user_ratings_total: Some(1),
        open_now: Some(true),
        photo_url: Some(
            "https://images.unsplash.com/photo-1543357480-c60d40007a3f?auto=format&fit=crop&q=80&w=400"
                .to_string(),
        ),
        url: Some("https://maps.google.com".to_string()),
        directions_url: Some(directions_url(location.lat, location.lng)),
    }
}
