//! Release notes lookup.
//!
//! Extracts the topmost version section from a bundled CHANGELOG.md so the
//! update prompt can show what changed when the feed itself carries no notes.

use std::path::Path;

use tracing::debug;

/// Fallback text used when no notes can be found anywhere.
pub const GENERIC_NOTES: &str = "Bug fixes and improvements.";

/// Returns the body of the first `## [x.y.z]` section in the changelog at
/// `path`, or `None` if the file is missing or has no version sections.
pub fn latest_changelog_section(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let section = first_section(&text)?;
    debug!(path = %path.display(), "loaded release notes from changelog");
    Some(section)
}

/// Notes to display for an update: feed-provided notes win, then the bundled
/// changelog, then a generic line.
pub fn resolve_notes(feed_notes: Option<&str>, changelog_path: &Path) -> String {
    if let Some(notes) = feed_notes {
        let trimmed = notes.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    latest_changelog_section(changelog_path).unwrap_or_else(|| GENERIC_NOTES.to_string())
}

fn first_section(text: &str) -> Option<String> {
    let mut lines = text.lines();
    // Skip to the first version heading.
    lines.find(|line| is_version_heading(line))?;

    let mut body = Vec::new();
    for line in lines {
        if is_version_heading(line) {
            break;
        }
        body.push(line);
    }

    let section = body.join("\n").trim().to_string();
    if section.is_empty() {
        None
    } else {
        Some(section)
    }
}

fn is_version_heading(line: &str) -> bool {
    let rest = match line.strip_prefix("## ") {
        Some(rest) => rest.trim(),
        None => return false,
    };
    let version = rest
        .strip_prefix('[')
        .and_then(|r| r.split(']').next())
        .unwrap_or_else(|| rest.split_whitespace().next().unwrap_or(""));
    semver::Version::parse(version.trim_start_matches('v')).is_ok()
}
