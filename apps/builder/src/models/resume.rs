use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::template::TemplateId;

/// Title given to a fresh editing session before anything is loaded.
pub const DEFAULT_TITLE: &str = "My Resume";

/// Repeatable section entries carry an opaque id, unique within their sequence.
pub trait Entry {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub id: String,
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub location: String,
    pub start_date: String,
    pub end_date: Option<String>,
    /// Ongoing role; `end_date` is ignored (and cleared by the store) while set.
    pub current: bool,
    #[serde(default)]
    pub description: String,
}

impl WorkExperience {
    pub fn blank(id: String) -> Self {
        Self {
            id,
            company: String::new(),
            title: String::new(),
            location: String::new(),
            start_date: String::new(),
            end_date: None,
            current: false,
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub id: String,
    pub institution: String,
    pub degree: String,
    #[serde(default)]
    pub field_of_study: String,
    #[serde(default)]
    pub location: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub current: bool,
    pub gpa: Option<String>,
    pub description: Option<String>,
}

impl Education {
    pub fn blank(id: String) -> Self {
        Self {
            id,
            institution: String::new(),
            degree: String::new(),
            field_of_study: String::new(),
            location: String::new(),
            start_date: String::new(),
            end_date: None,
            current: false,
            gpa: None,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    pub url: Option<String>,
    pub github_url: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl Project {
    pub fn blank(id: String) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            technologies: Vec::new(),
            url: None,
            github_url: None,
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub id: String,
    pub name: String,
    pub issuer: String,
    pub issue_date: String,
    pub expiry_date: Option<String>,
    pub credential_url: Option<String>,
}

impl Certification {
    pub fn blank(id: String) -> Self {
        Self {
            id,
            name: String::new(),
            issuer: String::new(),
            issue_date: String::new(),
            expiry_date: None,
            credential_url: None,
        }
    }
}

macro_rules! impl_entry {
    ($($ty:ty),*) => {
        $(impl Entry for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

impl_entry!(WorkExperience, Education, Skill, Project, Certification);

/// The resume being edited. Section order is display/export order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDocument {
    /// `None` until a persisted record has been loaded.
    pub id: Option<String>,
    pub title: String,
    pub template: TemplateId,
    pub summary: String,
    pub personal_info: PersonalInfo,
    pub work_experiences: Vec<WorkExperience>,
    pub educations: Vec<Education>,
    pub skills: Vec<Skill>,
    pub projects: Vec<Project>,
    pub certifications: Vec<Certification>,
}

impl Default for ResumeDocument {
    fn default() -> Self {
        Self {
            id: None,
            title: DEFAULT_TITLE.to_string(),
            template: TemplateId::default(),
            summary: String::new(),
            personal_info: PersonalInfo::default(),
            work_experiences: Vec::new(),
            educations: Vec::new(),
            skills: Vec::new(),
            projects: Vec::new(),
            certifications: Vec::new(),
        }
    }
}

/// Canonical persisted resume as returned by the persistence gateway.
///
/// Sections arrive already ordered by their stored sort position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRecord {
    pub id: String,
    pub title: String,
    pub template: TemplateId,
    pub summary: Option<String>,
    pub personal_info: Option<PersonalInfo>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ResumeRecord {
    /// Hydrates an editable document. Missing personal info and a null summary
    /// fall back to their empty defaults.
    pub fn into_document(self) -> ResumeDocument {
        ResumeDocument {
            id: Some(self.id),
            title: self.title,
            template: self.template,
            summary: self.summary.unwrap_or_default(),
            personal_info: self.personal_info.unwrap_or_default(),
            work_experiences: self.work_experiences,
            educations: self.educations,
            skills: self.skills,
            projects: self.projects,
            certifications: self.certifications,
        }
    }
}
