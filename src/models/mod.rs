use serde::{Deserialize, Serialize};

/// A stored bookmark row, as returned by the `bookmarks` table.
///
/// `id`, `user_id` and `created_at` are server-assigned; timestamps are kept
/// as opaque RFC 3339 strings because ordering happens server-side.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub url: String,
    pub created_at: String,
}

/// Authenticated user object from the auth service.
///
/// `user_metadata` is kept flexible to avoid breaking when the identity
/// provider adds or renames profile fields.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// A signed-in session: tokens plus the user they belong to.
///
/// `expires_at` is unix seconds, derived from the `expires_in` the auth
/// service hands back on the OAuth callback.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub(crate) struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

/// Display projection of an identity for the profile control.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Profile {
    pub name: String,
    pub avatar_url: String,
}

impl Profile {
    /// Name precedence: `full_name`, then `name`, then email, then "Profile".
    /// Avatar precedence: `avatar_url`, then `picture`, then none.
    /// Signed-out resets both fields to empty.
    pub fn from_user(user: Option<&AuthUser>) -> Self {
        let Some(user) = user else {
            return Self::default();
        };

        let meta_str = |key: &str| {
            user.user_metadata
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
        };

        let name = meta_str("full_name")
            .or_else(|| meta_str("name"))
            .or_else(|| user.email.clone().filter(|e| !e.is_empty()))
            .unwrap_or_else(|| "Profile".to_string());

        let avatar_url = meta_str("avatar_url")
            .or_else(|| meta_str("picture"))
            .unwrap_or_default();

        Self { name, avatar_url }
    }

    /// First letter of the display name, for the initials badge.
    pub fn initial(&self) -> String {
        self.name
            .chars()
            .next()
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "U".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(metadata: serde_json::Value, email: Option<&str>) -> AuthUser {
        AuthUser {
            id: "user-1".to_string(),
            email: email.map(|e| e.to_string()),
            user_metadata: metadata,
        }
    }

    #[test]
    fn test_bookmark_contract_deserialize() {
        // Contract based on a `return=representation` row from the store.
        let json = r#"{
            "id": "0b9f1f9e-7a3e-4f0e-8b0a-2f4a52a8a111",
            "user_id": "5c3a2c1d-0000-4111-8222-333344445555",
            "title": "Project docs",
            "url": "https://example.com/docs",
            "created_at": "2026-07-01T12:30:00.000000+00:00"
        }"#;
        let parsed: Bookmark = serde_json::from_str(json).expect("bookmark row should parse");
        assert_eq!(parsed.title, "Project docs");
        assert_eq!(parsed.user_id, "5c3a2c1d-0000-4111-8222-333344445555");
    }

    #[test]
    fn test_auth_user_contract_deserialize_with_extra_fields() {
        let json = r#"{
            "id": "user-1",
            "aud": "authenticated",
            "email": "u@example.com",
            "user_metadata": {"full_name": "Uma User", "avatar_url": "https://a.test/u.png"},
            "created_at": "2026-01-01T00:00:00Z"
        }"#;
        let parsed: AuthUser = serde_json::from_str(json).expect("auth user should parse");
        assert_eq!(parsed.id, "user-1");
        assert_eq!(parsed.email.as_deref(), Some("u@example.com"));
        assert_eq!(parsed.user_metadata["full_name"], "Uma User");
    }

    #[test]
    fn test_profile_prefers_full_name() {
        let user = user_with(
            serde_json::json!({"full_name": "Full Name", "name": "Short"}),
            Some("u@example.com"),
        );
        assert_eq!(Profile::from_user(Some(&user)).name, "Full Name");
    }

    #[test]
    fn test_profile_falls_back_to_name_then_email() {
        let user = user_with(serde_json::json!({"name": "Short"}), Some("u@example.com"));
        assert_eq!(Profile::from_user(Some(&user)).name, "Short");

        let user = user_with(serde_json::json!({}), Some("u@example.com"));
        assert_eq!(Profile::from_user(Some(&user)).name, "u@example.com");
    }

    #[test]
    fn test_profile_defaults_when_nothing_usable() {
        let user = user_with(serde_json::json!({"full_name": ""}), None);
        let profile = Profile::from_user(Some(&user));
        assert_eq!(profile.name, "Profile");
        assert_eq!(profile.avatar_url, "");
    }

    #[test]
    fn test_profile_avatar_precedence() {
        let user = user_with(
            serde_json::json!({"avatar_url": "https://a.test/a.png", "picture": "https://a.test/p.png"}),
            None,
        );
        assert_eq!(
            Profile::from_user(Some(&user)).avatar_url,
            "https://a.test/a.png"
        );

        let user = user_with(serde_json::json!({"picture": "https://a.test/p.png"}), None);
        assert_eq!(
            Profile::from_user(Some(&user)).avatar_url,
            "https://a.test/p.png"
        );
    }

    #[test]
    fn test_profile_resets_on_signed_out() {
        let profile = Profile::from_user(None);
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn test_profile_initial() {
        let user = user_with(serde_json::json!({"name": "uma"}), None);
        assert_eq!(Profile::from_user(Some(&user)).initial(), "U");
        assert_eq!(Profile::default().initial(), "U");
    }
}
