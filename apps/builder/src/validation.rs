use std::sync::OnceLock;

use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::models::ResumeDocument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Field path in the serialized document, e.g. `workExperiences[0].company`.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
    })
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}

#[derive(Default)]
struct Checker {
    issues: Vec<ValidationIssue>,
}

impl Checker {
    fn fail(&mut self, path: String, message: &str) {
        self.issues.push(ValidationIssue {
            path,
            message: message.to_string(),
        });
    }

    fn required(&mut self, path: impl Into<String>, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.fail(path.into(), message);
        }
    }

    /// Absent and empty links are both fine; anything else must be an http(s) URL.
    fn optional_url(&mut self, path: impl Into<String>, value: Option<&str>) {
        if let Some(raw) = value.filter(|v| !v.is_empty()) {
            if !is_http_url(raw) {
                self.fail(path.into(), "Invalid URL");
            }
        }
    }
}

/// Checks a document for completeness. Advisory only: the store accepts drafts that
/// fail validation, and autosave persists them.
pub fn validate_document(doc: &ResumeDocument) -> ValidationReport {
    let mut c = Checker::default();

    c.required("title", &doc.title, "Title is required");
    if !doc.template.is_known() {
        c.fail(
            "template".to_string(),
            &format!("Unknown template '{}'", doc.template),
        );
    }

    let info = &doc.personal_info;
    c.required("personalInfo.fullName", &info.full_name, "Full name is required");
    if !email_pattern().is_match(&info.email) {
        c.fail("personalInfo.email".to_string(), "Invalid email");
    }
    c.required("personalInfo.phone", &info.phone, "Phone is required");
    c.required("personalInfo.location", &info.location, "Location is required");
    c.optional_url("personalInfo.linkedin", info.linkedin.as_deref());
    c.optional_url("personalInfo.github", info.github.as_deref());
    c.optional_url("personalInfo.website", info.website.as_deref());

    for (i, w) in doc.work_experiences.iter().enumerate() {
        let at = |field: &str| format!("workExperiences[{i}].{field}");
        c.required(at("company"), &w.company, "Company is required");
        c.required(at("title"), &w.title, "Title is required");
        c.required(at("startDate"), &w.start_date, "Start date is required");
    }

    for (i, e) in doc.educations.iter().enumerate() {
        let at = |field: &str| format!("educations[{i}].{field}");
        c.required(at("institution"), &e.institution, "Institution is required");
        c.required(at("degree"), &e.degree, "Degree is required");
        c.required(at("startDate"), &e.start_date, "Start date is required");
    }

    for (i, s) in doc.skills.iter().enumerate() {
        c.required(format!("skills[{i}].name"), &s.name, "Skill name is required");
    }

    for (i, p) in doc.projects.iter().enumerate() {
        let at = |field: &str| format!("projects[{i}].{field}");
        c.required(at("name"), &p.name, "Project name is required");
        c.optional_url(at("url"), p.url.as_deref());
        c.optional_url(at("githubUrl"), p.github_url.as_deref());
    }

    for (i, cert) in doc.certifications.iter().enumerate() {
        let at = |field: &str| format!("certifications[{i}].{field}");
        c.required(at("name"), &cert.name, "Certification name is required");
        c.required(at("issuer"), &cert.issuer, "Issuer is required");
        c.required(at("issueDate"), &cert.issue_date, "Issue date is required");
        c.optional_url(at("credentialUrl"), cert.credential_url.as_deref());
    }

    ValidationReport {
        passed: c.issues.is_empty(),
        issues: c.issues,
    }
}
