use std::fmt;

use crate::config::AccessConfig;
use crate::model::UserContext;

/// Capabilities the HTTP layer asks for before writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateVocabulary,
    UpdateVocabulary,
    DeleteVocabulary,
    CreateTerm,
    UpdateTerm,
    DeleteTerm,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::CreateVocabulary => "create_vocabulary",
            Action::UpdateVocabulary => "update_vocabulary",
            Action::DeleteVocabulary => "delete_vocabulary",
            Action::CreateTerm => "create_term",
            Action::UpdateTerm => "update_term",
            Action::DeleteTerm => "delete_term",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yes/no capability check supplied by the host application
#[async_trait::async_trait]
pub trait AccessPolicy: Send + Sync {
    async fn can(&self, user: &UserContext, action: Action) -> bool;
}

#[async_trait::async_trait]
impl<F> AccessPolicy for F
where
    F: Fn(&UserContext, Action) -> bool + Send + Sync,
{
    async fn can(&self, user: &UserContext, action: Action) -> bool {
        (self)(user, action)
    }
}

/// Grants every write capability to callers holding one of the writer roles
#[derive(Debug, Clone, Default)]
pub struct RoleAccessPolicy {
    allow_all: bool,
    writer_roles: Vec<String>,
}

impl RoleAccessPolicy {
    pub fn new(writer_roles: Vec<String>) -> Self {
        Self {
            allow_all: false,
            writer_roles,
        }
    }

    pub fn allow_all() -> Self {
        Self {
            allow_all: true,
            writer_roles: Vec::new(),
        }
    }
}

impl From<&AccessConfig> for RoleAccessPolicy {
    fn from(config: &AccessConfig) -> Self {
        Self {
            allow_all: config.allow_all,
            writer_roles: config.writer_roles.clone(),
        }
    }
}

#[async_trait::async_trait]
impl AccessPolicy for RoleAccessPolicy {
    async fn can(&self, user: &UserContext, _action: Action) -> bool {
        self.allow_all || self.writer_roles.iter().any(|role| user.has_role(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_role_policy() {
        let policy = RoleAccessPolicy::new(vec!["editor".to_string()]);

        let editor = UserContext::with_details(
            "7".to_string(),
            None,
            vec!["authenticated".to_string(), "editor".to_string()],
        );
        assert!(policy.can(&editor, Action::DeleteTerm).await);
        assert!(!policy.can(&UserContext::anonymous(), Action::CreateTerm).await);

        assert!(
            RoleAccessPolicy::allow_all()
                .can(&UserContext::anonymous(), Action::CreateVocabulary)
                .await
        );
    }

    #[tokio::test]
    async fn test_closure_policy() {
        let policy = |_: &UserContext, action: Action| action == Action::CreateTerm;
        assert!(policy.can(&UserContext::anonymous(), Action::CreateTerm).await);
        assert!(!policy.can(&UserContext::anonymous(), Action::UpdateTerm).await);
        assert_eq!(Action::UpdateVocabulary.to_string(), "update_vocabulary");
    }
}
