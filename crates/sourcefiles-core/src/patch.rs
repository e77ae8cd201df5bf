//! Specifier splicing.

use crate::error::{Error, Result};
use crate::scan::ImportReference;

/// Replace each reference's quoted literal with the quoted id returned by
/// `id_for`, leaving every other byte of `text` untouched.
///
/// References may be given in any order. Overlapping spans, spans outside
/// `text`, and spans not on character boundaries are a
/// [`Error::PatchConsistency`] error.
pub fn patch<F>(text: &str, references: &[ImportReference], mut id_for: F) -> Result<String>
where
    F: FnMut(&ImportReference) -> Option<String>,
{
    let mut sorted: Vec<&ImportReference> = references.iter().collect();
    sorted.sort_by_key(|r| (r.start, r.end));

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    for reference in sorted {
        let ImportReference { start, end, .. } = *reference;
        if start < cursor {
            return Err(Error::patch(format!(
                "span {start}..{end} for '{}' overlaps a previous replacement ending at {cursor}",
                reference.specifier
            )));
        }
        if start >= end || end > text.len() {
            return Err(Error::patch(format!(
                "span {start}..{end} for '{}' is outside the text (length {})",
                reference.specifier,
                text.len()
            )));
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            return Err(Error::patch(format!(
                "span {start}..{end} for '{}' is not on a character boundary",
                reference.specifier
            )));
        }

        let Some(id) = id_for(reference) else {
            return Err(Error::patch(format!(
                "no module id for '{}'",
                reference.specifier
            )));
        };

        out.push_str(&text[cursor..start]);
        out.push('"');
        out.push_str(&id);
        out.push('"');
        cursor = end;
    }

    out.push_str(&text[cursor..]);
    Ok(out)
}
