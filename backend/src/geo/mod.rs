//! Department geography for map shading.
//!
//! The map itself is drawn by the frontend from a public GeoJSON of French
//! departments whose features carry the department code in
//! `properties.code`. This module supplies the per-code values and, when the
//! server is asked to, fetches the boundaries. A failed fetch never affects
//! the rest of the dashboard.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{GeoError, GeoResult};
use crate::models::{normalize_department_code, EnrichedTransaction};

/// Default department boundaries.
pub const DEFAULT_GEOJSON_URL: &str = "https://france-geojson.gregoiredavid.fr/repo/departements.geojson";

/// Property path that joins a feature to a department code.
pub const FEATURE_ID_KEY: &str = "properties.code";

const REQUEST_TIMEOUT_SECS: u64 = 20;

/// Mean value of one department, keyed for the boundary dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoroplethPoint {
    pub department_code: String,
    pub department_name: String,
    pub value: f64,
    pub count: usize,
}

/// Mean value per matched department code, ordered by code.
///
/// Codes are normalized to the boundary dataset's form ("1" -> "01").
/// Rows without a department match have no geometry and are left out.
pub fn choropleth(rows: &[EnrichedTransaction]) -> Vec<ChoroplethPoint> {
    let mut groups: BTreeMap<String, (&str, usize, f64)> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.is_matched()) {
        let code = row.department_code.as_deref().and_then(normalize_department_code);
        if let (Some(code), Some(name)) = (code, row.department_name.as_deref()) {
            let entry = groups.entry(code).or_insert((name, 0, 0.0));
            entry.1 += 1;
            entry.2 += row.value;
        }
    }

    groups
        .into_iter()
        .map(|(code, (name, count, sum))| ChoroplethPoint {
            department_code: code,
            department_name: name.to_string(),
            value: sum / count as f64,
            count,
        })
        .collect()
}

/// List the department codes present in a boundary FeatureCollection.
pub fn feature_codes(geojson: &Value) -> GeoResult<Vec<String>> {
    let features = geojson
        .get("features")
        .and_then(|f| f.as_array())
        .ok_or_else(|| GeoError::InvalidGeoJson("missing 'features' array".to_string()))?;

    Ok(features
        .iter()
        .filter_map(|f| f.pointer("/properties/code"))
        .filter_map(|c| c.as_str())
        .map(String::from)
        .collect())
}

/// Choropleth codes with no matching boundary feature.
pub fn missing_geometry(points: &[ChoroplethPoint], codes: &[String]) -> Vec<String> {
    points
        .iter()
        .filter(|p| !codes.contains(&p.department_code))
        .map(|p| p.department_code.clone())
        .collect()
}

/// HTTP client for the boundary service.
#[derive(Clone)]
pub struct BoundaryClient {
    url: String,
    client: reqwest::Client,
}

impl BoundaryClient {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and sanity-check the boundary FeatureCollection.
    pub async fn fetch(&self) -> GeoResult<Value> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| GeoError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let geojson: Value = response
            .json()
            .await
            .map_err(|e| GeoError::InvalidGeoJson(e.to_string()))?;
        feature_codes(&geojson)?;

        Ok(geojson)
    }
}

impl Default for BoundaryClient {
    fn default() -> Self {
        Self::new(DEFAULT_GEOJSON_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(code: Option<&str>, name: Option<&str>, value: f64) -> EnrichedTransaction {
        EnrichedTransaction {
            mutation_date: None,
            department_code: code.map(String::from),
            property_type: None,
            property_value: None,
            department_name: name.map(String::from),
            region_code: None,
            region_name: None,
            date: None,
            value,
        }
    }

    #[test]
    fn test_choropleth_means_per_code() {
        let rows = vec![
            row(Some("75"), Some("Paris"), 400.0),
            row(Some("01"), Some("Ain"), 100.0),
            row(Some("75"), Some("Paris"), 200.0),
            row(Some("99"), None, 1000.0),
        ];

        let points = choropleth(&rows);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].department_code, "01");
        assert_eq!(points[1].department_name, "Paris");
        assert_eq!(points[1].value, 300.0);
        assert_eq!(points[1].count, 2);
    }

    #[test]
    fn test_choropleth_uses_normalized_codes() {
        let rows = vec![
            row(Some("1"), Some("Ain"), 100.0),
            row(Some("01"), Some("Ain"), 300.0),
            row(Some("2a"), Some("Corse-du-Sud"), 50.0),
        ];

        let points = choropleth(&rows);

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].department_code, "01");
        assert_eq!(points[0].value, 200.0);
        assert_eq!(points[1].department_code, "2A");
    }

    #[test]
    fn test_feature_codes() {
        let geojson = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "code": "01", "nom": "Ain" } },
                { "type": "Feature", "properties": { "code": "2A", "nom": "Corse-du-Sud" } },
                { "type": "Feature", "properties": {} }
            ]
        });

        assert_eq!(feature_codes(&geojson).unwrap(), vec!["01", "2A"]);
    }

    #[test]
    fn test_feature_codes_rejects_non_collection() {
        let err = feature_codes(&json!({ "type": "Feature" })).unwrap_err();
        assert!(matches!(err, GeoError::InvalidGeoJson(_)));
    }

    #[test]
    fn test_missing_geometry() {
        let points = choropleth(&[row(Some("75"), Some("Paris"), 1.0), row(Some("976"), Some("Mayotte"), 1.0)]);
        let codes = vec!["75".to_string()];
        assert_eq!(missing_geometry(&points, &codes), vec!["976"]);
    }

    #[test]
    fn test_default_client_url() {
        assert_eq!(BoundaryClient::default().url(), DEFAULT_GEOJSON_URL);
    }
}
