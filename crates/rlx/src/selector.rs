//! 🎯 Selector: "this one" or "all of them", for job ids and index patterns alike.

use std::fmt;

/// 🎯 Either every item, or exactly the named one.
///
/// `"_all"`, `"*"` and the empty string all mean "everything", matching the
/// engine's URL conventions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Selector {
    #[default]
    All,
    Named(String),
}

impl Selector {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "_all" | "*" => Selector::All,
            name => Selector::Named(name.to_string()),
        }
    }

    /// ✅ Exact string match, or anything at all for `All`.
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Selector::All => true,
            Selector::Named(name) => name == candidate,
        }
    }

    /// 📡 The path segment the engine understands.
    pub fn as_path_segment(&self) -> &str {
        match self {
            Selector::All => "_all",
            Selector::Named(name) => name,
        }
    }
}

impl From<&str> for Selector {
    fn from(raw: &str) -> Self {
        Selector::parse(raw)
    }
}

impl From<Option<&str>> for Selector {
    fn from(raw: Option<&str>) -> Self {
        raw.map(Selector::parse).unwrap_or_default()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path_segment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_all_roads_lead_to_all() {
        assert_eq!(Selector::parse("_all"), Selector::All);
        assert_eq!(Selector::parse("*"), Selector::All);
        assert_eq!(Selector::parse("  "), Selector::All);
        assert_eq!(Selector::from(None), Selector::All);
        assert_eq!(Selector::parse("docs"), Selector::Named("docs".into()));
    }

    #[test]
    fn the_one_where_matching_is_exact_and_not_a_glob_party() {
        let the_docs = Selector::from("docs");
        assert!(the_docs.matches("docs"));
        assert!(!the_docs.matches("docs-2024"));
        assert!(Selector::All.matches("literally-anything"));
        assert_eq!(the_docs.as_path_segment(), "docs");
        assert_eq!(Selector::All.to_string(), "_all");
    }
}
