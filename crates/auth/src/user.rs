//! Signed-in user identity

use serde::{Deserialize, Serialize};

/// A user signed in through the identity provider.
///
/// The `id` is the provider's stable subject identifier and is what stored
/// records use as their owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Provider user ID
    pub id: String,

    /// Email address (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Profile picture URL (if available)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            name: None,
            picture: None,
        }
    }

    /// Sets the email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the picture URL
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    /// Returns the display name, falling back to email or ID
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallbacks() {
        let user = AuthenticatedUser::new("uid-123");
        assert_eq!(user.display_name(), "uid-123");

        let with_email = AuthenticatedUser::new("uid-123").with_email("ana@example.com");
        assert_eq!(with_email.display_name(), "ana@example.com");

        let with_name = AuthenticatedUser::new("uid-123")
            .with_email("ana@example.com")
            .with_name("Ana");
        assert_eq!(with_name.display_name(), "Ana");
    }

    #[test]
    fn test_optional_profile_fields_are_omitted() {
        let json = serde_json::to_value(AuthenticatedUser::new("uid-1")).unwrap();
        assert_eq!(json, serde_json::json!({ "id": "uid-1" }));
    }
}
