//! Webhook event vocabulary translation
//!
//! Callers speak GitHub event names. GitLab hooks instead carry one boolean
//! flag per event kind.

/// (GitHub event, GitLab hook flag)
const EVENT_FLAGS: &[(&str, &str)] = &[
    ("push", "push_events"),
    ("pull_request", "merge_requests_events"),
];

/// Translate a GitHub event name into the GitLab hook flag
pub fn to_gitlab_event(event: &str) -> &str {
    EVENT_FLAGS
        .iter()
        .find(|(github, _)| *github == event)
        .map(|(_, gitlab)| *gitlab)
        .unwrap_or(event)
}

/// Translate a GitLab hook flag back into the GitHub event name
pub fn from_gitlab_event(flag: &str) -> &str {
    EVENT_FLAGS
        .iter()
        .find(|(_, gitlab)| *gitlab == flag)
        .map(|(github, _)| *github)
        .unwrap_or(flag)
}

pub fn to_gitlab_events(events: &[String]) -> Vec<String> {
    events.iter().map(|e| to_gitlab_event(e).to_string()).collect()
}

pub fn from_gitlab_events<'a, I>(flags: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    flags
        .into_iter()
        .map(|f| from_gitlab_event(f).to_string())
        .collect()
}
