use serde::{Deserialize, Serialize};

/// Caller identity extracted from request headers, consumed by capability checks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub user_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserContext {
    /// Create a UserContext with full user information
    pub fn with_details(user_id: String, name: Option<String>, roles: Vec<String>) -> Self {
        Self {
            user_id,
            user_name: name,
            roles,
        }
    }

    /// Context used when the request carries no identity headers
    pub fn anonymous() -> Self {
        Self {
            user_id: "anonymous".to_string(),
            user_name: None,
            roles: Vec::new(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id == "anonymous"
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_anonymous_without_roles() {
        let user = UserContext::default();
        assert!(user.is_anonymous());
        assert!(!user.has_role("administrator"));

        let editor = UserContext::with_details("7".to_string(), None, vec!["editor".to_string()]);
        assert!(!editor.is_anonymous());
        assert!(editor.has_role("editor"));
    }
}
