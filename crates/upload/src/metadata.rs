//! Advisory metadata suggestions.
//!
//! The backend's AI-assisted generator proposes a title/description/tag
//! from the filename and course context. It is purely advisory: failures
//! never block the pipeline, and suggestions only land in fields that are
//! still empty when they arrive — text the user already typed is never
//! overwritten.

use campusvault_protocol::messages::GenerateMetadataResponse;

/// Fills empty fields from a suggestion. Returns `true` if anything changed.
///
/// A field counts as empty when it is blank after trimming, so a stray
/// space does not block autofill.
pub fn apply_suggestion(
    title: &mut String,
    description: &mut String,
    suggestion: &GenerateMetadataResponse,
) -> bool {
    let mut changed = false;

    if title.trim().is_empty()
        && let Some(suggested) = suggestion.title.as_deref()
        && !suggested.trim().is_empty()
    {
        *title = suggested.to_string();
        changed = true;
    }

    if description.trim().is_empty()
        && let Some(suggested) = suggestion.description.as_deref()
        && !suggested.trim().is_empty()
    {
        *description = suggested.to_string();
        changed = true;
    }

    changed
}
