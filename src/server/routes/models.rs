//! Model listing endpoint

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use serde_json::json;

use crate::server::auth::validate_access_key;
use crate::server::state::AppState;

/// List every `provider/model` identifier the registry can route
pub async fn list_models(
    state: web::Data<AppState>,
    req: HttpRequest,
) -> ActixResult<HttpResponse> {
    validate_access_key(&req, &state.config.auth)?;

    let created = chrono::Utc::now().timestamp();
    let data: Vec<_> = state
        .registry
        .model_ids()
        .into_iter()
        .map(|id| {
            let owned_by = id.split('/').next().unwrap_or_default().to_string();
            json!({
                "id": id,
                "object": "model",
                "created": created,
                "owned_by": owned_by,
            })
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "object": "list",
        "data": data,
    })))
}
