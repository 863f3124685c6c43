/// Store key for a `(session, team)` pair: `"<team_id>:<session_id>"`.
pub fn context_key(session_id: &str, team_id: &str) -> String {
    format!("{team_id}:{session_id}")
}

/// Inverse of [`context_key`]: `(session_id, team_id)`. Team ids never
/// contain `:`, session ids may.
pub fn split_context_key(key: &str) -> Option<(&str, &str)> {
    let (team_id, session_id) = key.split_once(':')?;
    if team_id.is_empty() || session_id.is_empty() {
        return None;
    }
    Some((session_id, team_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_round_trips_session_ids_with_colons() {
        let key = context_key("web:abc", "acme");
        assert_eq!(key, "acme:web:abc");
        assert_eq!(split_context_key(&key), Some(("web:abc", "acme")));
        assert_eq!(split_context_key("nocolon"), None);
        assert_eq!(split_context_key(":x"), None);
    }
}
