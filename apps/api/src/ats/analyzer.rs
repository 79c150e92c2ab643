//! ATS analysis pipeline.
//!
//! Flow: validate filename → extract resume text → normalize experience →
//!       build combined input → render prompt with session history →
//!       LLM call → record turn → return raw text.

use bytes::Bytes;
use tracing::info;

use crate::ats::experience::ExperienceLevel;
use crate::ats::prompts::{build_combined_input, render_ats_prompt};
use crate::errors::AppError;
use crate::memory::Recorded;
use crate::state::AppState;

pub const PDF_ONLY_MESSAGE: &str = "Only PDF files are supported.";

/// A resume upload plus the form fields that accompany it.
#[derive(Debug, Clone)]
pub struct ResumeSubmission {
    pub filename: String,
    pub data: Bytes,
    pub job_description: String,
    pub experience_level: String,
    pub session_id: String,
}

/// Rejects anything whose name does not end in `.pdf`.
pub fn validate_pdf_filename(filename: &str) -> Result<(), AppError> {
    if filename.ends_with(".pdf") {
        Ok(())
    } else {
        Err(AppError::Validation(PDF_ONLY_MESSAGE.to_string()))
    }
}

/// Runs one analysis turn and returns the model's raw text.
///
/// History is snapshotted before the model call and the turn is recorded
/// after it; the session is not locked in between. Nothing is recorded when
/// any step fails.
pub async fn analyze_resume(
    state: &AppState,
    submission: ResumeSubmission,
) -> Result<String, AppError> {
    validate_pdf_filename(&submission.filename)?;

    let resume_text = state.extractor.extract(submission.data).await?;
    info!(
        "Extracted {} chars from '{}'",
        resume_text.len(),
        submission.filename
    );

    let experience = ExperienceLevel::from_label(&submission.experience_level);
    let combined_input =
        build_combined_input(&resume_text, &submission.job_description, experience);

    let pending = state.memory.begin_turn(&submission.session_id);
    let prompt = render_ats_prompt(pending.history(), &combined_input);
    let analysis = state.llm.complete(&prompt).await?;

    match state
        .memory
        .record_turn(pending, combined_input, analysis.clone())
    {
        Recorded::Stored(turns) => info!(
            "ATS analysis complete for session '{}' ({} turn(s) in memory, experience={})",
            submission.session_id, turns, experience
        ),
        Recorded::Discarded => info!(
            "ATS analysis complete for session '{}' (cleared mid-turn, not remembered, experience={})",
            submission.session_id, experience
        ),
    }

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_suffix_is_required() {
        assert!(validate_pdf_filename("resume.pdf").is_ok());
        assert!(validate_pdf_filename("my.resume.v2.pdf").is_ok());
        assert!(validate_pdf_filename("resume.docx").is_err());
        assert!(validate_pdf_filename("resume.pdf.exe").is_err());
        assert!(validate_pdf_filename("").is_err());
    }

    #[test]
    fn test_suffix_match_is_case_sensitive() {
        let err = validate_pdf_filename("RESUME.PDF").unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == PDF_ONLY_MESSAGE));
    }
}
