pub mod patch;
pub mod resume;
pub mod section;
pub mod template;

pub use patch::{
    CertificationPatch, EducationPatch, Patch, PersonalInfoPatch, ProjectPatch,
    WorkExperiencePatch,
};
pub use resume::{
    Certification, Education, Entry, PersonalInfo, Project, ResumeDocument, ResumeRecord, Skill,
    WorkExperience,
};
pub use section::ActiveSection;
pub use template::TemplateId;
