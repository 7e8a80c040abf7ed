//! User manager. Users are never hard-deleted; disabling flips `validity`.

use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;
use warden_core::error::{WardenError, WardenResult};
use warden_core::models::role::Role;
use warden_core::models::user::{CreateUser, UpdateUser, User};
use warden_core::outcome::Outcome;
use warden_core::repository::{PageRequest, PaginatedResult, RoleMemberRepository, UserRepository};

use crate::config::ServiceConfig;
use crate::group::required_name;

pub struct UserManager<U: UserRepository, M: RoleMemberRepository> {
    users: U,
    members: M,
    config: ServiceConfig,
}

impl<U: UserRepository, M: RoleMemberRepository> UserManager<U, M> {
    pub fn new(users: U, members: M, config: ServiceConfig) -> Self {
        Self {
            users,
            members,
            config,
        }
    }

    pub async fn create_user(
        &self,
        creator_id: Option<Uuid>,
        name: &str,
        login_name: &str,
        description: &str,
        user_type: u32,
    ) -> WardenResult<User> {
        let user = self
            .users
            .create(CreateUser {
                name: required_name("user name", name)?,
                login_name: required_name("login name", login_name)?,
                description: description.trim().to_string(),
                user_type,
                creator_id,
            })
            .await?;
        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> WardenResult<User> {
        self.users.get_by_id(user_id).await
    }

    pub async fn update_user(
        &self,
        user_id: Uuid,
        input: UpdateUser,
    ) -> WardenResult<Outcome<User>> {
        let input = UpdateUser {
            name: input
                .name
                .map(|n| required_name("user name", &n))
                .transpose()?,
            description: input.description.map(|d| d.trim().to_string()),
        };

        match self.users.update(user_id, input).await {
            Ok(user) => Ok(Outcome::Done(user)),
            Err(WardenError::NotFound { .. }) => Ok(Outcome::no_effect("user does not exist")),
            Err(e) => Err(e),
        }
    }

    /// Enable or soft-disable a user.
    pub async fn set_validity(&self, user_id: Uuid, validity: bool) -> WardenResult<Outcome<()>> {
        if self.users.set_validity(user_id, validity).await? {
            info!(%user_id, validity, "User validity changed");
            Ok(Outcome::Done(()))
        } else {
            Ok(Outcome::no_effect("user does not exist"))
        }
    }

    pub async fn list_users(
        &self,
        page: PageRequest,
        search_key: Option<String>,
    ) -> WardenResult<PaginatedResult<User>> {
        self.users
            .list(search_key, self.config.paginate(page))
            .await
    }

    /// Roles the user holds directly, through a title or through a group.
    pub async fn get_user_roles(&self, user_id: Uuid) -> WardenResult<Vec<Role>> {
        let roles = self.members.get_user_roles(user_id).await?;
        let mut seen = HashSet::new();
        Ok(roles.into_iter().filter(|r| seen.insert(r.id)).collect())
    }
}
