use serde::Serialize;

use crate::auth::roles::{self, RoleRequirement, RoleSet};
use crate::auth::user::{User, UserId};

/// Identity resolved for one request: the user plus the roles held right now.
/// Built fresh by the guard on every request and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user: User,
    pub roles: RoleSet,
}

impl Principal {
    pub fn new(user: User, roles: RoleSet) -> Self {
        Self { user, roles }
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }

    pub fn username(&self) -> &str {
        &self.user.username
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains(name)
    }

    pub fn has_any(&self, required: &[&str]) -> bool {
        roles::has_any(&self.roles, required)
    }

    pub fn has_all(&self, required: &[&str]) -> bool {
        roles::has_all(&self.roles, required)
    }

    pub fn is_admin(&self) -> bool {
        roles::is_admin(&self.roles)
    }

    pub fn satisfies(&self, requirement: &RoleRequirement) -> bool {
        requirement.is_satisfied_by(&self.roles)
    }
}
