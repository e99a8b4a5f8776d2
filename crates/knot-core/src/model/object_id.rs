//! Helpers for the `{platform}-{project...}-{number}` id convention.

/// Extract the project token from an object id.
///
/// Drops the first (platform) and last (local number) hyphen-delimited
/// segments and rejoins whatever is in between. The result is lower-cased so
/// comparisons and grouping are case-insensitive. Ids with fewer than three
/// segments, or whose middle is blank, have no project.
///
/// ```
/// use knot_core::model::object_id::project_key;
///
/// assert_eq!(project_key("jira-CORE-API-42").as_deref(), Some("core-api"));
/// assert_eq!(project_key("slack-1234"), None);
/// ```
#[must_use]
pub fn project_key(id: &str) -> Option<String> {
    let segments: Vec<&str> = id.split('-').collect();
    if segments.len() < 3 {
        return None;
    }

    let middle = segments[1..segments.len() - 1].join("-");
    if middle.trim().is_empty() {
        return None;
    }

    Some(middle.to_lowercase())
}

/// `true` when both ids carry the same project token.
#[must_use]
pub fn same_project(a: &str, b: &str) -> bool {
    match (project_key(a), project_key(b)) {
        (Some(pa), Some(pb)) => pa == pb,
        _ => false,
    }
}
