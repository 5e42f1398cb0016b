//! Persistence gateway: the port between the editing core and the system of record.
//!
//! The core only ever needs "fetch by id" and "replace whole document"; the remaining
//! operations back the HTTP service. Adapters:
//! - `InMemoryGateway`: process-local store, also the test double.
//! - `PgGateway`: PostgreSQL via sqlx.
//! - `HttpGateway`: client for the HTTP service in `routes`.

pub mod http;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{ResumeDocument, ResumeRecord, TemplateId};

pub use http::HttpGateway;
pub use memory::InMemoryGateway;
pub use postgres::PgGateway;

/// Title given to resumes created without one.
pub const UNTITLED_RESUME: &str = "Untitled Resume";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Resume not found: {0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Gateway rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Body of a create request. Both fields fall back to defaults when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewResume {
    pub title: Option<String>,
    pub template: Option<TemplateId>,
}

#[async_trait]
pub trait ResumeGateway: Send + Sync {
    /// All resumes, most recently updated first.
    async fn list_resumes(&self) -> GatewayResult<Vec<ResumeRecord>>;

    async fn create_resume(&self, new: NewResume) -> GatewayResult<ResumeRecord>;

    async fn fetch_resume(&self, id: &str) -> GatewayResult<ResumeRecord>;

    /// Overwrites every field and section of `id` with `document` and returns the
    /// canonical record. Replaying the same payload yields the same record.
    async fn replace_resume(
        &self,
        id: &str,
        document: &ResumeDocument,
    ) -> GatewayResult<ResumeRecord>;

    async fn delete_resume(&self, id: &str) -> GatewayResult<()>;
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

/// Server-side normalization of a replace-write payload: empty optional strings become
/// null and sections keep the payload order (which backends persist as sort positions).
/// Timestamps are left for the backend to fill.
pub fn canonicalize(id: &str, document: &ResumeDocument) -> ResumeRecord {
    let mut personal_info = document.personal_info.clone();
    personal_info.linkedin = non_empty(&personal_info.linkedin);
    personal_info.github = non_empty(&personal_info.github);
    personal_info.website = non_empty(&personal_info.website);

    let work_experiences = document
        .work_experiences
        .iter()
        .cloned()
        .map(|mut w| {
            w.end_date = non_empty(&w.end_date);
            w
        })
        .collect();

    let educations = document
        .educations
        .iter()
        .cloned()
        .map(|mut e| {
            e.end_date = non_empty(&e.end_date);
            e.gpa = non_empty(&e.gpa);
            e.description = non_empty(&e.description);
            e
        })
        .collect();

    let projects = document
        .projects
        .iter()
        .cloned()
        .map(|mut p| {
            p.url = non_empty(&p.url);
            p.github_url = non_empty(&p.github_url);
            p.start_date = non_empty(&p.start_date);
            p.end_date = non_empty(&p.end_date);
            p
        })
        .collect();

    let certifications = document
        .certifications
        .iter()
        .cloned()
        .map(|mut c| {
            c.expiry_date = non_empty(&c.expiry_date);
            c.credential_url = non_empty(&c.credential_url);
            c
        })
        .collect();

    ResumeRecord {
        id: id.to_string(),
        title: document.title.clone(),
        template: document.template.clone(),
        summary: Some(document.summary.clone()),
        personal_info: Some(personal_info),
        work_experiences,
        educations,
        skills: document.skills.clone(),
        projects,
        certifications,
        created_at: None,
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::fixtures::server_record;
    use crate::models::Project;

    #[test]
    fn test_canonicalize_nulls_empty_optionals() {
        let mut doc = server_record().into_document();
        doc.personal_info.website = Some(String::new());
        doc.educations[0].gpa = Some(String::new());
        let mut project = Project::blank("p-2".to_string());
        project.url = Some(String::new());
        doc.projects.push(project);

        let record = canonicalize("resume-1", &doc);
        let info = record.personal_info.unwrap();
        assert!(info.website.is_none());
        assert!(info.linkedin.is_some());
        assert!(record.educations[0].gpa.is_none());
        assert!(record.projects[1].url.is_none());
    }

    #[test]
    fn test_canonicalize_keeps_order_and_is_idempotent() {
        let doc = server_record().into_document();
        let first = canonicalize("resume-1", &doc);
        let again = canonicalize("resume-1", &first.clone().into_document());
        assert_eq!(first, again);
        let names: Vec<_> = first.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["React", "Node.js"]);
    }
}
