use crate::{
    error::Error,
    schema::{Id, UserRole},
};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnRelations,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnRelations,
            ActionType::ManageAllRecipes,
            ActionType::ManageUsers,
        ],
    ),
];

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,

    ManageOwnRecipes,
    ManageOwnRelations,

    ManageAllRecipes,
    ManageUsers,
}

impl ActionType {
    fn name(self) -> &'static str {
        match self {
            ActionType::CreateRecipes => "create recipes",
            ActionType::ManageOwnRecipes => "manage own recipes",
            ActionType::ManageOwnRelations => "manage own relations",
            ActionType::ManageAllRecipes => "manage all recipes",
            ActionType::ManageUsers => "manage users",
        }
    }
}

/// The identified caller of an operation. Token parsing happens in the
/// enclosing service; the SDK only sees the resolved identity and role.
#[derive(Clone, Copy, Debug)]
pub struct Actor {
    pub user_id: Id,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: Id, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn authorize(&self, action: ActionType) -> Result<(), Error> {
        let allowed = ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| (*role == self.role).then(|| actions.contains(&action)))
            .unwrap_or(false);

        if allowed {
            Ok(())
        } else {
            Err(Error::PermissionDenied(action.name()))
        }
    }

    /// Author-or-admin gate for mutating another user's rows.
    pub fn can_manage(&self, author_id: Id) -> bool {
        self.user_id == author_id || self.authorize(ActionType::ManageAllRecipes).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_user_manages_own_rows_only() {
        let actor = Actor::new(1, UserRole::User);
        assert!(actor.authorize(ActionType::CreateRecipes).is_ok());
        assert!(actor.authorize(ActionType::ManageOwnRecipes).is_ok());
        assert!(matches!(
            actor.authorize(ActionType::ManageAllRecipes),
            Err(Error::PermissionDenied(_))
        ));
        assert!(actor.can_manage(1));
        assert!(!actor.can_manage(2));
    }

    #[test]
    fn admin_overrides_authorship() {
        let actor = Actor::new(1, UserRole::Admin);
        assert!(actor.authorize(ActionType::ManageAllRecipes).is_ok());
        assert!(actor.can_manage(2));
    }
}
