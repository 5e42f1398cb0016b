use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Row};
use tracing::{debug, info};

use crate::gateway::{
    canonicalize, GatewayError, GatewayResult, NewResume, ResumeGateway, UNTITLED_RESUME,
};
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::models::{
    Certification, Education, PersonalInfo, Project, ResumeDocument, ResumeRecord, Skill,
    WorkExperience,
};

impl From<sqlx::Error> for GatewayError {
    fn from(e: sqlx::Error) -> Self {
        // Missing resumes are detected explicitly with the id at hand; a stray
        // RowNotFound is a storage fault, not a client-visible 404.
        GatewayError::Storage(e.to_string())
    }
}

#[derive(Debug, FromRow)]
struct ResumeRow {
    id: String,
    title: String,
    template: String,
    summary: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A section row tagged with the resume it belongs to.
struct Owned<T> {
    resume_id: String,
    entry: T,
}

impl<'r, T: FromRow<'r, PgRow>> FromRow<'r, PgRow> for Owned<T> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            resume_id: row.try_get("resume_id")?,
            entry: T::from_row(row)?,
        })
    }
}

/// Groups rows by resume, keeping the query order within each resume.
fn group_by_resume<T>(rows: Vec<Owned<T>>) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for row in rows {
        grouped.entry(row.resume_id).or_default().push(row.entry);
    }
    grouped
}

/// PostgreSQL-backed gateway. Sections live in one table each and are ordered by an
/// explicit `sort_order` column.
#[derive(Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Rows of one section table for every resume in `ids`, ordered by `sort_order`.
    async fn section<T>(&self, sql: &str, ids: &[String]) -> GatewayResult<HashMap<String, Vec<T>>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let rows: Vec<Owned<T>> = sqlx::query_as(sql).bind(ids).fetch_all(&self.pool).await?;
        Ok(group_by_resume(rows))
    }

    /// Assembles full records for `rows`, one query per table regardless of row count.
    async fn load_records(&self, rows: Vec<ResumeRow>) -> GatewayResult<Vec<ResumeRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();

        let mut personal_infos: HashMap<String, Vec<PersonalInfo>> = self
            .section(
                r#"
                SELECT resume_id, full_name, email, phone, location, linkedin, github, website
                FROM personal_infos
                WHERE resume_id = ANY($1)
                "#,
                &ids,
            )
            .await?;

        let mut work_experiences: HashMap<String, Vec<WorkExperience>> = self
            .section(
                r#"
                SELECT resume_id, id, company, title, location, start_date, end_date,
                       is_current AS current, description
                FROM work_experiences
                WHERE resume_id = ANY($1)
                ORDER BY sort_order ASC
                "#,
                &ids,
            )
            .await?;

        let mut educations: HashMap<String, Vec<Education>> = self
            .section(
                r#"
                SELECT resume_id, id, institution, degree, field_of_study, location, start_date,
                       end_date, is_current AS current, gpa, description
                FROM educations
                WHERE resume_id = ANY($1)
                ORDER BY sort_order ASC
                "#,
                &ids,
            )
            .await?;

        let mut skills: HashMap<String, Vec<Skill>> = self
            .section(
                "SELECT resume_id, id, name FROM skills WHERE resume_id = ANY($1) ORDER BY sort_order ASC",
                &ids,
            )
            .await?;

        let mut projects: HashMap<String, Vec<Project>> = self
            .section(
                r#"
                SELECT resume_id, id, name, description, technologies, url, github_url,
                       start_date, end_date
                FROM projects
                WHERE resume_id = ANY($1)
                ORDER BY sort_order ASC
                "#,
                &ids,
            )
            .await?;

        let mut certifications: HashMap<String, Vec<Certification>> = self
            .section(
                r#"
                SELECT resume_id, id, name, issuer, issue_date, expiry_date, credential_url
                FROM certifications
                WHERE resume_id = ANY($1)
                ORDER BY sort_order ASC
                "#,
                &ids,
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let id = row.id.as_str();
                ResumeRecord {
                    personal_info: personal_infos
                        .remove(id)
                        .and_then(|infos| infos.into_iter().next()),
                    work_experiences: work_experiences.remove(id).unwrap_or_default(),
                    educations: educations.remove(id).unwrap_or_default(),
                    skills: skills.remove(id).unwrap_or_default(),
                    projects: projects.remove(id).unwrap_or_default(),
                    certifications: certifications.remove(id).unwrap_or_default(),
                    template: row.template.into(),
                    summary: row.summary,
                    title: row.title,
                    created_at: Some(row.created_at),
                    updated_at: Some(row.updated_at),
                    id: row.id,
                }
            })
            .collect())
    }

    async fn load_record(&self, row: ResumeRow) -> GatewayResult<ResumeRecord> {
        let id = row.id.clone();
        self.load_records(vec![row])
            .await?
            .pop()
            .ok_or(GatewayError::NotFound(id))
    }
}

#[async_trait]
impl ResumeGateway for PgGateway {
    async fn list_resumes(&self) -> GatewayResult<Vec<ResumeRecord>> {
        let rows: Vec<ResumeRow> = sqlx::query_as(
            "SELECT id, title, template, summary, created_at, updated_at FROM resumes ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        self.load_records(rows).await
    }

    async fn create_resume(&self, new: NewResume) -> GatewayResult<ResumeRecord> {
        let id = UuidIdGenerator.generate();
        let title = new.title.unwrap_or_else(|| UNTITLED_RESUME.to_string());
        let template = new.template.unwrap_or_default();

        let row: ResumeRow = sqlx::query_as(
            r#"
            INSERT INTO resumes (id, title, template)
            VALUES ($1, $2, $3)
            RETURNING id, title, template, summary, created_at, updated_at
            "#,
        )
        .bind(&id)
        .bind(&title)
        .bind(template.as_str())
        .fetch_one(&self.pool)
        .await?;

        info!("Created resume {id}");
        self.load_record(row).await
    }

    async fn fetch_resume(&self, id: &str) -> GatewayResult<ResumeRecord> {
        let row: Option<ResumeRow> = sqlx::query_as(
            "SELECT id, title, template, summary, created_at, updated_at FROM resumes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        self.load_record(row).await
    }

    /// One transaction: scalar fields, personal info upsert, then delete-and-insert of
    /// every section with `sort_order` = position in the payload.
    async fn replace_resume(
        &self,
        id: &str,
        document: &ResumeDocument,
    ) -> GatewayResult<ResumeRecord> {
        let record = canonicalize(id, document);
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE resumes SET title = $1, template = $2, summary = $3, updated_at = now() WHERE id = $4",
        )
        .bind(record.title.as_str())
        .bind(record.template.as_str())
        .bind(record.summary.as_deref())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(GatewayError::NotFound(id.to_string()));
        }

        if let Some(info) = &record.personal_info {
            sqlx::query(
                r#"
                INSERT INTO personal_infos
                    (resume_id, full_name, email, phone, location, linkedin, github, website)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (resume_id) DO UPDATE SET
                    full_name = EXCLUDED.full_name,
                    email = EXCLUDED.email,
                    phone = EXCLUDED.phone,
                    location = EXCLUDED.location,
                    linkedin = EXCLUDED.linkedin,
                    github = EXCLUDED.github,
                    website = EXCLUDED.website
                "#,
            )
            .bind(id)
            .bind(info.full_name.as_str())
            .bind(info.email.as_str())
            .bind(info.phone.as_str())
            .bind(info.location.as_str())
            .bind(info.linkedin.as_deref())
            .bind(info.github.as_deref())
            .bind(info.website.as_deref())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM work_experiences WHERE resume_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (i, w) in record.work_experiences.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO work_experiences
                    (resume_id, id, company, title, location, start_date, end_date,
                     is_current, description, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(id)
            .bind(w.id.as_str())
            .bind(w.company.as_str())
            .bind(w.title.as_str())
            .bind(w.location.as_str())
            .bind(w.start_date.as_str())
            .bind(w.end_date.as_deref())
            .bind(w.current)
            .bind(w.description.as_str())
            .bind(i as i32)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM educations WHERE resume_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (i, e) in record.educations.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO educations
                    (resume_id, id, institution, degree, field_of_study, location, start_date,
                     end_date, is_current, gpa, description, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
            )
            .bind(id)
            .bind(e.id.as_str())
            .bind(e.institution.as_str())
            .bind(e.degree.as_str())
            .bind(e.field_of_study.as_str())
            .bind(e.location.as_str())
            .bind(e.start_date.as_str())
            .bind(e.end_date.as_deref())
            .bind(e.current)
            .bind(e.gpa.as_deref())
            .bind(e.description.as_deref())
            .bind(i as i32)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM skills WHERE resume_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (i, s) in record.skills.iter().enumerate() {
            sqlx::query(
                "INSERT INTO skills (resume_id, id, name, sort_order) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(s.id.as_str())
            .bind(s.name.as_str())
            .bind(i as i32)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM projects WHERE resume_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (i, p) in record.projects.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO projects
                    (resume_id, id, name, description, technologies, url, github_url,
                     start_date, end_date, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(id)
            .bind(p.id.as_str())
            .bind(p.name.as_str())
            .bind(p.description.as_str())
            .bind(p.technologies.clone())
            .bind(p.url.as_deref())
            .bind(p.github_url.as_deref())
            .bind(p.start_date.as_deref())
            .bind(p.end_date.as_deref())
            .bind(i as i32)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM certifications WHERE resume_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for (i, c) in record.certifications.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO certifications
                    (resume_id, id, name, issuer, issue_date, expiry_date, credential_url, sort_order)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(id)
            .bind(c.id.as_str())
            .bind(c.name.as_str())
            .bind(c.issuer.as_str())
            .bind(c.issue_date.as_str())
            .bind(c.expiry_date.as_deref())
            .bind(c.credential_url.as_deref())
            .bind(i as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Replaced resume {id} in PostgreSQL");

        self.fetch_resume(id).await
    }

    async fn delete_resume(&self, id: &str) -> GatewayResult<()> {
        let deleted = sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(GatewayError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(resume_id: &str, name: &str) -> Owned<Skill> {
        Owned {
            resume_id: resume_id.to_string(),
            entry: Skill {
                id: format!("{resume_id}-{name}"),
                name: name.to_string(),
            },
        }
    }

    #[test]
    fn test_group_by_resume_keeps_row_order() {
        let grouped = group_by_resume(vec![
            owned("r-1", "Rust"),
            owned("r-2", "Go"),
            owned("r-1", "SQL"),
            owned("r-1", "Bash"),
        ]);
        let names = |id: &str| -> Vec<String> {
            grouped[id].iter().map(|s| s.name.clone()).collect()
        };
        assert_eq!(names("r-1"), vec!["Rust", "SQL", "Bash"]);
        assert_eq!(names("r-2"), vec!["Go"]);
        assert!(!grouped.contains_key("r-3"));
    }

    #[test]
    fn test_row_not_found_is_storage_error() {
        let err = GatewayError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, GatewayError::Storage(_)), "got {err:?}");
    }
}
