//! REST API types for the dashboard frontend.
//!
//! Query strings carry raw selector choices; sentinel labels ("Toutes",
//! "Tous") and missing parameters both mean "no filter".

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::catalog::Region;
use crate::error::{PipelineError, ServerError};
use crate::geo::ChoroplethPoint;
use crate::models::DepartmentRecord;
use crate::transform::filter::Selectors;
use crate::transform::pipeline::ViewOptions;

/// Selector choices as sent by the frontend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub region: Option<String>,
    pub department: Option<String>,
    pub property_type: Option<String>,
    pub preview_rows: Option<usize>,
}

impl DashboardQuery {
    pub fn selectors(&self) -> Selectors {
        Selectors::from_choices(
            self.region.as_deref(),
            self.department.as_deref(),
            self.property_type.as_deref(),
        )
    }

    /// View options, falling back to the server defaults.
    pub fn view_options(&self, defaults: ViewOptions) -> ViewOptions {
        ViewOptions {
            preview_rows: self.preview_rows.unwrap_or(defaults.preview_rows),
        }
    }
}

/// Department lookup parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentQuery {
    pub code: Option<String>,
    pub name: Option<String>,
}

/// Result of a department lookup by code or name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentLookup {
    pub query: String,
    pub matches: Vec<DepartmentRecord>,
}

/// Region list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionsResponse {
    pub total_regions: usize,
    pub regions: Vec<Region>,
}

/// Everything the map needs besides the geometry itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResponse {
    pub geojson_url: String,
    pub feature_id_key: String,
    pub points: Vec<ChoroplethPoint>,
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "runId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Pipeline(PipelineError::Schema(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(PipelineError::Load(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        eprintln!("❌ {}", self);
        (self.status_code(), Json(error_response(&self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LoadError, SchemaError};
    use crate::transform::filter::Selector;
    use std::path::PathBuf;

    #[test]
    fn test_query_sentinels_disable_filters() {
        let query = DashboardQuery {
            region: Some("Toutes".into()),
            department: None,
            property_type: Some("Appartement".into()),
            preview_rows: None,
        };
        let selectors = query.selectors();

        assert_eq!(selectors.region, Selector::All);
        assert_eq!(selectors.department, Selector::All);
        assert_eq!(selectors.property_type, Selector::Only("Appartement".into()));
        assert_eq!(query.view_options(ViewOptions::default()).preview_rows, 10);
    }

    #[test]
    fn test_error_status_codes() {
        let schema: ServerError = PipelineError::from(SchemaError::MissingColumns {
            file: "transactions".into(),
            columns: vec!["Type local".into()],
        })
        .into();
        assert_eq!(schema.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let load: ServerError = PipelineError::from(LoadError::NotFound(PathBuf::from("x.csv"))).into();
        assert_eq!(load.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(ServerError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("Data file not found: data/x.csv");
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().unwrap().contains("x.csv"));
        assert!(body["runId"].is_string());
    }
}
