use serde::{Deserialize, Serialize};

/// Builder section that currently has focus. UI state only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveSection {
    #[default]
    Personal,
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
}

impl ActiveSection {
    /// Navigation order.
    pub const ALL: [ActiveSection; 7] = [
        ActiveSection::Personal,
        ActiveSection::Summary,
        ActiveSection::Experience,
        ActiveSection::Education,
        ActiveSection::Skills,
        ActiveSection::Projects,
        ActiveSection::Certifications,
    ];

    pub fn first() -> Self {
        Self::ALL[0]
    }

    pub fn label(self) -> &'static str {
        match self {
            ActiveSection::Personal => "Personal Info",
            ActiveSection::Summary => "Summary",
            ActiveSection::Experience => "Work Experience",
            ActiveSection::Education => "Education",
            ActiveSection::Skills => "Skills",
            ActiveSection::Projects => "Projects",
            ActiveSection::Certifications => "Certifications",
        }
    }
}
