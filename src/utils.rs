// utils.rs
use uuid::Uuid;

/// Response channel for confirmed shadow updates.
pub fn accepted_topic(publish_topic: &str) -> String {
    format!("{publish_topic}/accepted")
}

/// Client identifier for one page/process session. Must be unique per
/// session to avoid broker-side session collisions.
pub fn session_client_id() -> String {
    format!(
        "panel-{}-{}",
        chrono::Utc::now().timestamp(),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_topic_appends_suffix() {
        assert_eq!(accepted_topic("things/lamp/shadow"), "things/lamp/shadow/accepted");
    }

    #[test]
    fn client_ids_are_unique_per_session() {
        assert_ne!(session_client_id(), session_client_id());
    }
}
