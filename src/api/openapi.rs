//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the frame-prep REST API
///
/// Served at `/openapi.json`, and through the Swagger UI at `/swagger-ui` when
/// enabled.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "frame-prep REST API",
        version = "0.1.0",
        description = "Prepares batches of video frames for vision-language model inference",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        crate::api::routes::prepare_vlm,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::OutputMode,
        crate::api::routes::PrepareRequest,
        crate::api::routes::JobResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Frame preparation - Fetch, persist and hand back frame batches"),
        (name = "system", description = "System endpoints - Health checks and OpenAPI spec"),
    )
)]
pub struct ApiDoc;
