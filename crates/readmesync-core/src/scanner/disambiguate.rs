//! Deterministic target name allocation
//!
//! Names are compared case-insensitively so two sources never map to files
//! that collide on case-insensitive filesystems.

use std::collections::HashSet;

/// Tracks target file names already in use during one pass
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    /// Start from the names already owned by existing mappings
    pub fn with_taken<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            taken: names.into_iter().map(|n| n.as_ref().to_lowercase()).collect(),
        }
    }

    /// Whether `name` is already in use
    #[must_use]
    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(&name.to_lowercase())
    }

    /// Reserve `proposed`, or the first free `stem-N.ext` variant
    pub fn allocate(&mut self, proposed: &str) -> String {
        if self.taken.insert(proposed.to_lowercase()) {
            return proposed.to_string();
        }

        let (stem, ext) = split_extension(proposed);
        let mut n = 2_u32;
        loop {
            let candidate = format!("{stem}-{n}{ext}");
            if self.taken.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(0) | None => (name, ""),
        Some(idx) => name.split_at(idx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_name_is_kept() {
        let mut names = NameAllocator::default();
        assert_eq!(names.allocate("app-README.md"), "app-README.md");
        assert!(names.is_taken("APP-readme.md"));
    }

    #[test]
    fn test_collisions_get_numeric_suffix() {
        let mut names = NameAllocator::with_taken(["app-README.md"]);
        assert_eq!(names.allocate("app-README.md"), "app-README-2.md");
        assert_eq!(names.allocate("App-Readme.md"), "App-Readme-3.md");
    }

    #[test]
    fn test_name_without_extension() {
        let mut names = NameAllocator::with_taken(["notes"]);
        assert_eq!(names.allocate("notes"), "notes-2");
    }

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("a.b.md"), ("a.b", ".md"));
        assert_eq!(split_extension(".hidden"), (".hidden", ""));
    }
}
