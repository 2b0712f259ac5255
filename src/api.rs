//! REST API for the box recommendation service.
//!
//! Provides the two collaborator-facing entry points — the recommendation
//! endpoint and the catalog-snapshot refresh hook — plus the packaging
//! feedback endpoints. Uses Axum as the web framework and supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::catalog::CatalogStore;
use crate::config::ApiConfig;
use crate::engine::{
    self, EngineConfig, PackedProductRecord, PackingFailure, RecommendationRecord,
};
use crate::feedback::FeedbackAggregator;
use crate::model::{
    BoxSpec, CatalogSnapshot, Category, OrderLine, PackagingMaterial, Product, ValidationError,
};
use crate::types::{total_weight, Dims, StorageClass, Texture};

/// Shared state of all API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub catalog: Arc<CatalogStore>,
    pub feedback: Arc<FeedbackAggregator>,
    pub engine: EngineConfig,
}

impl ApiState {
    /// Creates a state with an empty catalog store.
    pub fn new(engine: EngineConfig) -> Self {
        Self {
            catalog: Arc::new(CatalogStore::empty()),
            feedback: Arc::new(FeedbackAggregator::new()),
            engine,
        }
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>box-advisor API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// One line of an incoming order.
#[derive(Deserialize, Clone, ToSchema)]
pub struct OrderLineRequest {
    pub product_id: String,
    pub count: u32,
}

/// Request structure for the recommendation endpoint.
///
/// The caller resolves the order id to its lines; the engine never talks to
/// an order store itself.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "order_id": "ord-1042",
        "lines": [
            { "product_id": "prd-77", "count": 2 },
            { "product_id": "prd-13", "count": 1 }
        ]
    })
)]
pub struct RecommendRequest {
    pub order_id: String,
    pub lines: Vec<OrderLineRequest>,
}

impl RecommendRequest {
    fn into_validated(self) -> Result<(String, Vec<OrderLine>), ValidationError> {
        let lines = self
            .lines
            .into_iter()
            .map(|line| OrderLine::new(line.product_id, line.count))
            .collect::<Result<Vec<_>, ValidationError>>()?;
        Ok((self.order_id, lines))
    }
}

/// An unpackable partition in the response.
#[derive(Serialize, ToSchema)]
pub struct FailureRecord {
    pub reason_code: String,
    pub reason: String,
    pub product_ids: Vec<String>,
    pub total_weight: u64,
}

impl FailureRecord {
    fn from_failure(failure: &PackingFailure) -> Self {
        Self {
            reason_code: failure.reason.code().to_string(),
            reason: failure.reason.to_string(),
            product_ids: failure
                .units
                .iter()
                .map(|u| u.product.id.clone())
                .collect(),
            total_weight: total_weight(&failure.units),
        }
    }
}

/// Response structure for the recommendation endpoint.
#[derive(Serialize, ToSchema)]
pub struct RecommendResponse {
    pub order_id: String,
    pub recommendations: Vec<RecommendationRecord>,
    pub failures: Vec<FailureRecord>,
    pub is_complete: bool,
}

/// A box in a catalog upload.
#[derive(Deserialize, Clone, ToSchema)]
pub struct BoxRequest {
    pub id: String,
    pub name: String,
    #[schema(value_type = [u32; 3], example = json!([40, 35, 30]))]
    pub dims: (u32, u32, u32),
    pub texture: Texture,
}

/// A product in a catalog upload.
#[derive(Deserialize, Clone, ToSchema)]
pub struct ProductRequest {
    pub id: String,
    pub name: String,
    pub weight: u32,
    #[schema(value_type = [u32; 3], example = json!([20, 15, 10]))]
    pub dims: (u32, u32, u32),
    #[serde(default)]
    #[schema(value_type = Option<[u32; 3]>, nullable = true)]
    pub compressed_dims: Option<(u32, u32, u32)>,
    pub storage_class: StorageClass,
    pub category_type: String,
    pub packaging_material_id: String,
    pub packaging_material_quantity: u32,
}

/// A category in a catalog upload.
#[derive(Deserialize, Clone, ToSchema)]
pub struct CategoryRequest {
    pub type_key: String,
    pub error_rate: f64,
}

/// A packaging material in a catalog upload.
#[derive(Deserialize, Clone, ToSchema)]
pub struct PackagingMaterialRequest {
    pub id: String,
    pub name: String,
}

/// Full catalog upload for the snapshot refresh hook.
#[derive(Deserialize, ToSchema)]
pub struct CatalogRequest {
    pub boxes: Vec<BoxRequest>,
    pub products: Vec<ProductRequest>,
    #[serde(default)]
    pub categories: Vec<CategoryRequest>,
    #[serde(default)]
    pub packaging_materials: Vec<PackagingMaterialRequest>,
}

impl CatalogRequest {
    fn into_snapshot(self) -> Result<CatalogSnapshot, ValidationError> {
        let boxes = self
            .boxes
            .into_iter()
            .map(|b| BoxSpec::new(b.id, b.name, Dims::from_tuple(b.dims), b.texture))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let products = self
            .products
            .into_iter()
            .map(|p| {
                Product::new(
                    p.id,
                    p.name,
                    p.weight,
                    Dims::from_tuple(p.dims),
                    p.compressed_dims.map(Dims::from_tuple),
                    p.storage_class,
                    p.category_type,
                    p.packaging_material_id,
                    p.packaging_material_quantity,
                )
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let categories = self
            .categories
            .into_iter()
            .map(|c| Category::new(c.type_key, c.error_rate))
            .collect::<Result<Vec<_>, ValidationError>>()?;

        let packaging_materials = self
            .packaging_materials
            .into_iter()
            .map(|m| PackagingMaterial {
                id: m.id,
                name: m.name,
            })
            .collect();

        Ok(CatalogSnapshot::new(
            boxes,
            products,
            categories,
            packaging_materials,
        ))
    }
}

/// Response for a catalog upload.
#[derive(Serialize, ToSchema)]
pub struct CatalogResponse {
    pub boxes: usize,
    pub products: usize,
    pub categories: usize,
    pub packaging_materials: usize,
}

/// One packaging-material feedback point.
#[derive(Deserialize, ToSchema)]
pub struct FeedbackRequest {
    pub packaging_material_id: String,
    pub point: i32,
}

/// Running average of one packaging material's feedback points.
#[derive(Serialize, ToSchema)]
pub struct FeedbackAverageEntry {
    pub packaging_material_id: String,
    pub average: f64,
    pub samples: u64,
}

/// All running feedback averages.
#[derive(Serialize, ToSchema)]
pub struct FeedbackAveragesResponse {
    pub averages: Vec<FeedbackAverageEntry>,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

fn no_catalog_error() -> Response {
    error_response(
        StatusCode::CONFLICT,
        "No catalog snapshot loaded",
        "Upload a catalog via PUT /catalog before requesting recommendations",
    )
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_recommend,
        handle_catalog_swap,
        handle_feedback,
        handle_feedback_averages
    ),
    components(schemas(
        RecommendRequest,
        OrderLineRequest,
        RecommendResponse,
        RecommendationRecord,
        PackedProductRecord,
        FailureRecord,
        CatalogRequest,
        BoxRequest,
        ProductRequest,
        CategoryRequest,
        PackagingMaterialRequest,
        CatalogResponse,
        FeedbackRequest,
        FeedbackAveragesResponse,
        FeedbackAverageEntry,
        ErrorResponse
    )),
    tags(
        (name = "recommendation", description = "Box recommendation for orders"),
        (name = "catalog", description = "Catalog snapshot refresh"),
        (name = "feedback", description = "Packaging material feedback averages")
    )
)]
struct ApiDoc;

/// Builds the application router for the given state.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/recommend", post(handle_recommend))
        .route("/catalog", put(handle_catalog_swap))
        .route("/feedback", post(handle_feedback).get(handle_feedback_averages))
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server.
///
/// Blocks until the server is terminated.
pub async fn start_api_server(config: ApiConfig, engine_config: EngineConfig) {
    let state = ApiState::new(engine_config);
    let app = router(state);

    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            panic!("Could not bind API server to {}: {}", addr, err);
        }
    };

    tracing::info!(
        "🚀 Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        tracing::info!("🔎 Local access: http://localhost:{}", config.port());
    }
    tracing::info!("📦 Endpoints: POST /recommend, PUT /catalog, POST|GET /feedback");
    tracing::info!("📑 Documentation: GET /docs, GET /docs/openapi.json");

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("API server terminated with an error: {err}");
    }
}

/// Handler for the POST /recommend endpoint.
///
/// Resolves the submitted order lines against the current catalog snapshot
/// and returns the packed-group records together with any infeasible
/// partitions.
#[utoipa::path(
    post,
    path = "/recommend",
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "Recommendation computed", body = RecommendResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request, empty order or unknown product",
            body = ErrorResponse
        ),
        (
            status = CONFLICT,
            description = "No catalog snapshot loaded yet",
            body = ErrorResponse
        )
    ),
    tag = "recommendation"
)]
async fn handle_recommend(
    State(state): State<ApiState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let (order_id, lines) = match payload.into_validated() {
        Ok(validated) => validated,
        Err(err) => return validation_error(err.to_string()),
    };

    let Some(snapshot) = state.catalog.load() else {
        return no_catalog_error();
    };

    tracing::info!(order_id = %order_id, lines = lines.len(), "recommendation request");
    match engine::recommend(&lines, &snapshot, &state.engine) {
        Ok(outcome) => {
            tracing::info!(
                order_id = %order_id,
                groups = outcome.group_count(),
                failures = outcome.failures.len(),
                "recommendation finished"
            );
            let response = RecommendResponse {
                order_id,
                recommendations: outcome.to_records(),
                failures: outcome
                    .failures
                    .iter()
                    .map(FailureRecord::from_failure)
                    .collect(),
                is_complete: outcome.is_complete(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Recommendation failed",
            err.to_string(),
        ),
    }
}

/// Handler for the PUT /catalog endpoint (snapshot refresh hook).
///
/// Validates the uploaded catalog and atomically swaps it in. Requests in
/// flight keep the snapshot they started with.
#[utoipa::path(
    put,
    path = "/catalog",
    request_body = CatalogRequest,
    responses(
        (status = 200, description = "Catalog snapshot installed", body = CatalogResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid catalog data",
            body = ErrorResponse
        )
    ),
    tag = "catalog"
)]
async fn handle_catalog_swap(
    State(state): State<ApiState>,
    payload: Result<Json<CatalogRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    let snapshot = match payload.into_snapshot() {
        Ok(snapshot) => snapshot,
        Err(err) => return validation_error(err.to_string()),
    };

    let response = CatalogResponse {
        boxes: snapshot.boxes.len(),
        products: snapshot.products.len(),
        categories: snapshot.categories.len(),
        packaging_materials: snapshot.packaging_materials.len(),
    };
    tracing::info!(
        boxes = response.boxes,
        products = response.products,
        "catalog snapshot swapped"
    );
    state.catalog.swap(snapshot);

    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for the POST /feedback endpoint.
#[utoipa::path(
    post,
    path = "/feedback",
    request_body = FeedbackRequest,
    responses(
        (status = 204, description = "Feedback point recorded"),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid JSON data",
            body = ErrorResponse
        )
    ),
    tag = "feedback"
)]
async fn handle_feedback(
    State(state): State<ApiState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(err) => return json_deserialize_error(err),
    };

    state
        .feedback
        .record(&payload.packaging_material_id, payload.point);
    StatusCode::NO_CONTENT.into_response()
}

/// Handler for the GET /feedback endpoint.
#[utoipa::path(
    get,
    path = "/feedback",
    responses(
        (status = 200, description = "Current running averages", body = FeedbackAveragesResponse)
    ),
    tag = "feedback"
)]
async fn handle_feedback_averages(State(state): State<ApiState>) -> Response {
    let averages = state
        .feedback
        .averages()
        .into_iter()
        .map(|entry| FeedbackAverageEntry {
            packaging_material_id: entry.packaging_material_id,
            average: entry.average,
            samples: entry.samples,
        })
        .collect();

    (
        StatusCode::OK,
        Json(FeedbackAveragesResponse { averages }),
    )
        .into_response()
}

async fn serve_openapi_json(State(_state): State<ApiState>) -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui(State(_state): State<ApiState>) -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in ["/recommend", "/catalog", "/feedback"] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in [
            "RecommendRequest",
            "RecommendResponse",
            "CatalogRequest",
            "ErrorResponse",
        ] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn recommend_request_parses_and_validates() {
        let json = r#"{
            "order_id": "ord-1",
            "lines": [
                {"product_id": "p1", "count": 2},
                {"product_id": "p2", "count": 1}
            ]
        }"#;
        let request: RecommendRequest = serde_json::from_str(json).expect("Should parse");
        let (order_id, lines) = request.into_validated().expect("Should validate");
        assert_eq!(order_id, "ord-1");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].count, 2);
    }

    #[test]
    fn recommend_request_rejects_zero_count() {
        let json = r#"{
            "order_id": "ord-1",
            "lines": [{"product_id": "p1", "count": 0}]
        }"#;
        let request: RecommendRequest = serde_json::from_str(json).expect("Should parse");
        assert!(request.into_validated().is_err());
    }

    #[test]
    fn catalog_request_builds_a_snapshot() {
        let json = r#"{
            "boxes": [
                {"id": "b1", "name": "Medium", "dims": [30, 30, 30], "texture": "PAPER"}
            ],
            "products": [
                {
                    "id": "p1",
                    "name": "Apples",
                    "weight": 1200,
                    "dims": [20, 15, 10],
                    "storage_class": "AMBIENT",
                    "category_type": "produce",
                    "packaging_material_id": "m1",
                    "packaging_material_quantity": 1
                }
            ],
            "categories": [{"type_key": "produce", "error_rate": 0.05}],
            "packaging_materials": [{"id": "m1", "name": "Paper wrap"}]
        }"#;
        let request: CatalogRequest = serde_json::from_str(json).expect("Should parse");
        let snapshot = request.into_snapshot().expect("Should validate");

        assert_eq!(snapshot.boxes.len(), 1);
        assert_eq!(snapshot.boxes[0].texture, Texture::Paper);
        assert!(snapshot.products.contains_key("p1"));
        assert!(snapshot.products["p1"].compressed_dims.is_none());
        assert!(snapshot.categories.contains_key("produce"));
    }

    #[test]
    fn catalog_request_rejects_invalid_entries() {
        let json = r#"{
            "boxes": [
                {"id": "b1", "name": "Broken", "dims": [0, 30, 30], "texture": "PAPER"}
            ],
            "products": []
        }"#;
        let request: CatalogRequest = serde_json::from_str(json).expect("Should parse");
        assert!(request.into_snapshot().is_err());
    }

    #[test]
    fn catalog_request_parses_compressed_dims_when_present() {
        let json = r#"{
            "boxes": [],
            "products": [
                {
                    "id": "p1",
                    "name": "Pillow",
                    "weight": 500,
                    "dims": [40, 40, 20],
                    "compressed_dims": [40, 40, 8],
                    "storage_class": "AMBIENT",
                    "category_type": "home",
                    "packaging_material_id": "m1",
                    "packaging_material_quantity": 1
                }
            ]
        }"#;
        let request: CatalogRequest = serde_json::from_str(json).expect("Should parse");
        let snapshot = request.into_snapshot().expect("Should validate");
        let product = &snapshot.products["p1"];
        assert_eq!(product.min_volume(), 12_800);
        assert_eq!(product.max_volume(), 32_000);
    }

    #[test]
    fn failure_record_carries_partition_contents() {
        use crate::engine::FailureReason;
        use crate::model::ProductUnit;

        let unit = ProductUnit {
            product: Product::new(
                "p1",
                "Boulder",
                25_000,
                Dims::new(10, 10, 10),
                None,
                StorageClass::Ambient,
                "garden",
                "m1",
                1,
            )
            .unwrap(),
            packaging_material_name: "Paper wrap".to_string(),
            category_error_rate: None,
        };
        let failure = PackingFailure {
            units: vec![unit],
            reason: FailureReason::InfeasiblePacking,
        };

        let record = FailureRecord::from_failure(&failure);
        assert_eq!(record.reason_code, "infeasible_packing");
        assert_eq!(record.product_ids, vec!["p1"]);
        assert_eq!(record.total_weight, 25_000);
    }
}
