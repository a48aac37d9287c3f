//! Candidate config assembly.
//!
//! Pure functions from `(base text, rendered fragments)` to the
//! candidate config. Nothing here touches the filesystem; the applier
//! owns all IO, which keeps every edge case testable as plain string
//! transforms.
//!
//! Two placement strategies exist because deployments differ in how
//! much of the file is generated:
//!
//! - marker mode replaces the slice between a begin/end sentinel pair
//!   and refuses to touch a file where either sentinel does not occur
//!   exactly once
//! - anchor mode keeps everything through the anchor line and
//!   regenerates the remainder of the file

use crate::config::AssembleMode;
use crate::constants;
use crate::error::{Error, Result};

/// Assemble the candidate config text.
///
/// # Errors
///
/// Marker mode returns [`Error::MarkerCount`] / [`Error::MarkerOrder`]
/// when the sentinel pair is absent, duplicated or inverted; anchor
/// mode returns [`Error::AnchorMissing`] when the anchor line is not
/// present. The base text is never partially rewritten.
pub fn assemble(mode: AssembleMode, base: &str, fragments: &[String]) -> Result<String> {
    match mode {
        AssembleMode::Markers => replace_marker_block(base, fragments),
        AssembleMode::Anchor => truncate_after_anchor(base, fragments),
    }
}

/// Check that `base` would assemble under `mode`, without output.
///
/// # Errors
///
/// Same classes as [`assemble`].
pub fn verify_base(mode: AssembleMode, base: &str) -> Result<()> {
    assemble(mode, base, &[]).map(|_| ())
}

fn replace_marker_block(base: &str, fragments: &[String]) -> Result<String> {
    let begin = find_unique(base, constants::BLOCK_MARKER_BEGIN)?;
    let end = find_unique(base, constants::BLOCK_MARKER_END)?;
    if end < begin {
        return Err(Error::MarkerOrder);
    }

    let mut out = String::with_capacity(base.len());
    out.push_str(&base[..begin + constants::BLOCK_MARKER_BEGIN.len()]);
    out.push('\n');
    push_fragments(&mut out, fragments);
    out.push_str(&base[end..]);
    Ok(out)
}

fn truncate_after_anchor(base: &str, fragments: &[String]) -> Result<String> {
    let mut out = String::with_capacity(base.len());
    let mut found = false;
    for line in base.lines() {
        out.push_str(line);
        out.push('\n');
        if line == constants::CONFIG_ANCHOR {
            found = true;
            break;
        }
    }
    if !found {
        return Err(Error::anchor_missing(constants::CONFIG_ANCHOR));
    }

    out.push('\n');
    push_fragments(&mut out, fragments);
    Ok(out)
}

/// Byte offset of `marker`, requiring exactly one occurrence.
fn find_unique(base: &str, marker: &str) -> Result<usize> {
    let mut indices = base.match_indices(marker).map(|(index, _)| index);
    let Some(first) = indices.next() else {
        return Err(Error::marker_count(marker, 0));
    };
    let extra = indices.count();
    if extra > 0 {
        return Err(Error::marker_count(marker, extra + 1));
    }
    Ok(first)
}

fn push_fragments(out: &mut String, fragments: &[String]) {
    for fragment in fragments {
        out.push_str(fragment);
        if !fragment.ends_with('\n') {
            out.push('\n');
        }
    }
}
