//! Project name extraction and target file naming

use std::path::Path;

use crate::config::{CaseStyle, NamingRules};

/// Directory names that describe layout rather than a project
const GENERIC_DIRS: [&str; 5] = ["src", "docs", "doc", "documentation", "scripts"];

/// Fallback when nothing usable remains after cleaning
pub const UNKNOWN_PROJECT: &str = "unknown-project";

/// Placeholder substituted by the naming pattern
pub const PROJECT_PLACEHOLDER: &str = "{project_name}";

/// Derive the project name for a source document
///
/// Uses the parent directory name, or the grandparent when the parent is a
/// generic layout directory such as `docs/`.
#[must_use]
pub fn project_name(source: &Path) -> String {
    let parent = source.parent();
    let parent_name = parent
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let is_generic = GENERIC_DIRS
        .iter()
        .any(|generic| parent_name.eq_ignore_ascii_case(generic));

    let raw = if is_generic {
        parent
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map_or(parent_name, |n| n.to_string_lossy().into_owned())
    } else {
        parent_name
    };

    clean_project_name(&raw)
}

/// Replace disallowed characters with `-`, collapse runs and trim the edges
#[must_use]
pub fn clean_project_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '-'
        };
        if c == '-' && cleaned.ends_with('-') {
            continue;
        }
        cleaned.push(c);
    }

    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        UNKNOWN_PROJECT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build the target file name for a project
#[must_use]
pub fn target_file_name(project: &str, rules: &NamingRules) -> String {
    let name = rules.pattern.replace(PROJECT_PLACEHOLDER, project);
    let mut name = match rules.case_style {
        CaseStyle::Keep => name,
        CaseStyle::Lower => name.to_lowercase(),
        CaseStyle::Upper => name.to_uppercase(),
    };

    if !name.to_lowercase().ends_with(".md") {
        name.push_str(".md");
    }
    name
}
