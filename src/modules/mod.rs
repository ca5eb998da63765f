pub mod academic;
pub mod audit_logs;
pub mod auth;
pub mod communications;
pub mod deliberations;
pub mod documents;
pub mod evaluations;
pub mod finance;
pub mod resources;
pub mod roles;
pub mod schedule;
pub(crate) mod sequence;
pub mod students;
pub mod teachers;
pub mod users;

/// `ILIKE` pattern for a free-text `search` filter.
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", s))
}

#[cfg(test)]
mod tests {
    use super::search_pattern;

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(search_pattern(None), None);
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(Some(" info ")).as_deref(), Some("%info%"));
    }
}
