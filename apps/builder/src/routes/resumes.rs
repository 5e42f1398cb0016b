use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::errors::AppError;
use crate::gateway::NewResume;
use crate::models::{ResumeDocument, ResumeRecord};
use crate::state::AppState;

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResumeRecord>>, AppError> {
    Ok(Json(state.gateway.list_resumes().await?))
}

/// POST /api/v1/resumes
///
/// The body is optional; a missing title or template falls back to the defaults.
pub async fn handle_create_resume(
    State(state): State<AppState>,
    body: Option<Json<NewResume>>,
) -> Result<(StatusCode, Json<ResumeRecord>), AppError> {
    let new = body.map(|Json(new)| new).unwrap_or_default();
    if matches!(&new.title, Some(title) if title.trim().is_empty()) {
        return Err(AppError::Validation("title must not be blank".to_string()));
    }

    let record = state.gateway.create_resume(new).await?;
    info!("Resume {} created", record.id);
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeRecord>, AppError> {
    Ok(Json(state.gateway.fetch_resume(&id).await?))
}

/// PUT /api/v1/resumes/:id
///
/// Full replace-write. The canonical record is returned so the caller can see what
/// was stored.
pub async fn handle_replace_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(document): Json<ResumeDocument>,
) -> Result<Json<ResumeRecord>, AppError> {
    if let Some(doc_id) = document.id.as_deref() {
        if doc_id != id {
            return Err(AppError::Validation(format!(
                "document id {doc_id} does not match resume {id}"
            )));
        }
    }
    Ok(Json(state.gateway.replace_resume(&id, &document).await?))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.gateway.delete_resume(&id).await?;
    info!("Resume {id} deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::gateway::InMemoryGateway;
    use crate::ids::SequentialIdGenerator;
    use crate::models::resume::fixtures::server_record;
    use crate::routes::build_router;
    use crate::state::AppState;

    fn app() -> Router {
        let gateway =
            InMemoryGateway::new().with_ids(Arc::new(SequentialIdGenerator::new("resume")));
        gateway.insert(server_record());
        build_router(AppState::new(Arc::new(gateway)))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (u16, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_create_without_body_uses_defaults() {
        let (status, body) = send(&app(), "POST", "/api/v1/resumes", None).await;
        assert_eq!(status, 201);
        assert_eq!(body["id"], "resume-1");
        assert_eq!(body["title"], "Untitled Resume");
        assert_eq!(body["template"], "modern");
    }

    #[tokio::test]
    async fn test_create_with_title_and_template() {
        let app = app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/resumes",
            Some(json!({ "title": "Staff Engineer", "template": "executive" })),
        )
        .await;
        assert_eq!(status, 201);
        assert_eq!(body["title"], "Staff Engineer");
        assert_eq!(body["template"], "executive");

        let (_, list) = send(&app, "GET", "/api/v1/resumes", None).await;
        assert_eq!(list.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let (status, body) = send(
            &app(),
            "POST",
            "/api/v1/resumes",
            Some(json!({ "title": "   " })),
        )
        .await;
        assert_eq!(status, 400);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_get_missing_is_404() {
        let (status, body) = send(&app(), "GET", "/api/v1/resumes/nope", None).await;
        assert_eq!(status, 404);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "Resume nope not found");
    }

    #[tokio::test]
    async fn test_replace_canonicalizes_and_keeps_order() {
        let app = app();
        let mut doc = server_record().into_document();
        doc.personal_info.linkedin = Some(String::new());
        doc.skills.reverse();

        let (status, body) = send(
            &app,
            "PUT",
            "/api/v1/resumes/resume-1",
            Some(serde_json::to_value(&doc).unwrap()),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(body["personalInfo"]["linkedin"], Value::Null);
        assert_eq!(body["skills"][0]["name"], "Node.js");
        assert_eq!(body["skills"][1]["name"], "React");

        // Same payload again gives the same stored document.
        let (_, again) = send(
            &app,
            "PUT",
            "/api/v1/resumes/resume-1",
            Some(serde_json::to_value(&doc).unwrap()),
        )
        .await;
        assert_eq!(again["skills"], body["skills"]);
        assert_eq!(again["personalInfo"], body["personalInfo"]);
    }

    #[tokio::test]
    async fn test_replace_rejects_mismatched_id() {
        let mut doc = server_record().into_document();
        doc.id = Some("other".to_string());
        let (status, _) = send(
            &app(),
            "PUT",
            "/api/v1/resumes/resume-1",
            Some(serde_json::to_value(&doc).unwrap()),
        )
        .await;
        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_replace_missing_is_404() {
        let doc = server_record().into_document();
        let mut value = serde_json::to_value(&doc).unwrap();
        value["id"] = Value::Null;
        let (status, _) = send(&app(), "PUT", "/api/v1/resumes/ghost", Some(value)).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let app = app();
        let (status, body) = send(&app, "DELETE", "/api/v1/resumes/resume-1", None).await;
        assert_eq!(status, 204);
        assert_eq!(body, Value::Null);

        let (status, _) = send(&app, "GET", "/api/v1/resumes/resume-1", None).await;
        assert_eq!(status, 404);
        let (status, _) = send(&app, "DELETE", "/api/v1/resumes/resume-1", None).await;
        assert_eq!(status, 404);
    }
}
