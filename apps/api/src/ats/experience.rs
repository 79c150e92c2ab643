use std::fmt;

/// Candidate experience bracket used to steer the ATS prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceLevel {
    Fresher,
    TwoYears,
    MoreThanTwoYears,
}

impl ExperienceLevel {
    /// Maps a free-form label onto a bracket. Matching is case-insensitive;
    /// anything unrecognized falls into `MoreThanTwoYears`.
    pub fn from_label(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "fresher" => ExperienceLevel::Fresher,
            "2 years" => ExperienceLevel::TwoYears,
            _ => ExperienceLevel::MoreThanTwoYears,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExperienceLevel::Fresher => "Fresher",
            ExperienceLevel::TwoYears => "2 Years of Experience",
            ExperienceLevel::MoreThanTwoYears => "More than 2 Years of Experience",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
