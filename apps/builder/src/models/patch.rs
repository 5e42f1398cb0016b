//! Partial updates applied by the store's `update_*` operations.
//!
//! `None` leaves a field untouched. Nullable fields use `Option<Option<_>>` so a patch
//! can distinguish "leave as is" (`None`) from "clear" (`Some(None)`).

use crate::models::resume::{Certification, Education, PersonalInfo, Project, WorkExperience};

/// Shallow merge of the provided fields into `target`.
pub trait Patch<T> {
    fn apply_to(self, target: &mut T);
}

fn merge<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonalInfoPatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<Option<String>>,
    pub github: Option<Option<String>>,
    pub website: Option<Option<String>>,
}

impl Patch<PersonalInfo> for PersonalInfoPatch {
    fn apply_to(self, target: &mut PersonalInfo) {
        merge(&mut target.full_name, self.full_name);
        merge(&mut target.email, self.email);
        merge(&mut target.phone, self.phone);
        merge(&mut target.location, self.location);
        merge(&mut target.linkedin, self.linkedin);
        merge(&mut target.github, self.github);
        merge(&mut target.website, self.website);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkExperiencePatch {
    pub company: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<Option<String>>,
    pub current: Option<bool>,
    pub description: Option<String>,
}

impl Patch<WorkExperience> for WorkExperiencePatch {
    fn apply_to(self, target: &mut WorkExperience) {
        merge(&mut target.company, self.company);
        merge(&mut target.title, self.title);
        merge(&mut target.location, self.location);
        merge(&mut target.start_date, self.start_date);
        merge(&mut target.end_date, self.end_date);
        merge(&mut target.current, self.current);
        merge(&mut target.description, self.description);
        if target.current {
            target.end_date = None;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EducationPatch {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field_of_study: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<Option<String>>,
    pub current: Option<bool>,
    pub gpa: Option<Option<String>>,
    pub description: Option<Option<String>>,
}

impl Patch<Education> for EducationPatch {
    fn apply_to(self, target: &mut Education) {
        merge(&mut target.institution, self.institution);
        merge(&mut target.degree, self.degree);
        merge(&mut target.field_of_study, self.field_of_study);
        merge(&mut target.location, self.location);
        merge(&mut target.start_date, self.start_date);
        merge(&mut target.end_date, self.end_date);
        merge(&mut target.current, self.current);
        merge(&mut target.gpa, self.gpa);
        merge(&mut target.description, self.description);
        if target.current {
            target.end_date = None;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub url: Option<Option<String>>,
    pub github_url: Option<Option<String>>,
    pub start_date: Option<Option<String>>,
    pub end_date: Option<Option<String>>,
}

impl Patch<Project> for ProjectPatch {
    fn apply_to(self, target: &mut Project) {
        merge(&mut target.name, self.name);
        merge(&mut target.description, self.description);
        merge(&mut target.technologies, self.technologies.map(dedup_tags));
        merge(&mut target.url, self.url);
        merge(&mut target.github_url, self.github_url);
        merge(&mut target.start_date, self.start_date);
        merge(&mut target.end_date, self.end_date);
    }
}

/// Drops exact duplicates, keeping the first occurrence of each tag.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificationPatch {
    pub name: Option<String>,
    pub issuer: Option<String>,
    pub issue_date: Option<String>,
    pub expiry_date: Option<Option<String>>,
    pub credential_url: Option<Option<String>>,
}

impl Patch<Certification> for CertificationPatch {
    fn apply_to(self, target: &mut Certification) {
        merge(&mut target.name, self.name);
        merge(&mut target.issuer, self.issuer);
        merge(&mut target.issue_date, self.issue_date);
        merge(&mut target.expiry_date, self.expiry_date);
        merge(&mut target.credential_url, self.credential_url);
    }
}
