use crate::routes::api;
use crate::routes::health::HealthApi;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(info(
    title = "imchat-server",
    description = "Two-party chat message store with cursor pagination",
    version = "0.1.0",
))]
pub struct ApiDoc;

pub fn get_docs() -> utoipa::openapi::OpenApi {
    let mut root = ApiDoc::openapi();
    root.merge(HealthApi::openapi());
    root.merge(api::api_docs());
    root
}
