use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::hash_password;
use crate::database::manager::{constraints, DatabaseError};
use crate::database::models::{NewUser, RequestFilter, User, UserDeletion};
use crate::database::store::Store;
use crate::services::{Principal, ServiceError, ServiceResult};
use crate::types::Role;

pub const PASSWORD_MIN_CHARS: usize = 6;

#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub area_id: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUserInput {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` clears the area
    pub area_id: Option<Option<i32>>,
    pub active: Option<bool>,
}

fn check_password(password: &str) -> ServiceResult<()> {
    if password.chars().count() < PASSWORD_MIN_CHARS {
        return Err(ServiceError::business(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_CHARS
        )));
    }
    Ok(())
}

fn unique_violation(err: DatabaseError) -> ServiceError {
    match err {
        e if e.is_unique_violation(constraints::USER_USERNAME) => {
            ServiceError::business("Username is already taken")
        }
        e if e.is_unique_violation(constraints::USER_EMAIL) => {
            ServiceError::business("Email is already registered")
        }
        e => e.into(),
    }
}

/// Account administration, restricted to SuperAdministrador
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    async fn load(&self, id: i32) -> ServiceResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User {} not found", id)))
    }

    /// Only AgenteArea users carry an area, and it must exist
    async fn resolve_area(&self, role: Role, area_id: Option<i32>) -> ServiceResult<Option<i32>> {
        if role != Role::AreaAgent {
            return Ok(None);
        }
        let area_id =
            area_id.ok_or_else(|| ServiceError::business("AgenteArea users must belong to an area"))?;
        self.store
            .find_area(area_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Area {} not found", area_id)))?;
        Ok(Some(area_id))
    }

    fn clean_identity(username: &str, display_name: &str, email: &str) -> ServiceResult<(String, String, String)> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ServiceError::business("Username is required"));
        }
        let email = email.trim();
        if !email.contains('@') {
            return Err(ServiceError::business("A valid email is required"));
        }
        let display_name = match display_name.trim() {
            "" => username,
            name => name,
        };
        Ok((username.to_string(), display_name.to_string(), email.to_lowercase()))
    }

    pub async fn list(&self, role: Option<Role>, principal: &Principal) -> ServiceResult<Vec<User>> {
        principal.require_super_admin()?;
        Ok(self.store.list_users(role).await?)
    }

    pub async fn get(&self, id: i32, principal: &Principal) -> ServiceResult<User> {
        principal.require_super_admin()?;
        self.load(id).await
    }

    pub async fn create(&self, input: CreateUserInput, principal: &Principal) -> ServiceResult<User> {
        principal.require_super_admin()?;
        let (username, display_name, email) =
            Self::clean_identity(&input.username, &input.display_name, &input.email)?;
        check_password(&input.password)?;
        let area_id = self.resolve_area(input.role, input.area_id).await?;

        let user = self
            .store
            .insert_user(NewUser {
                username,
                display_name,
                email,
                password_hash: hash_password(&input.password)?,
                role: input.role,
                area_id,
                active: true,
            })
            .await
            .map_err(unique_violation)?;

        info!("User {} '{}' ({}) created by user {}", user.id, user.username, user.role, principal.user_id);
        Ok(user)
    }

    pub async fn update(&self, id: i32, input: UpdateUserInput, principal: &Principal) -> ServiceResult<User> {
        principal.require_super_admin()?;
        let mut user = self.load(id).await?;

        let (username, display_name, email) = Self::clean_identity(
            input.username.as_deref().unwrap_or(&user.username),
            input.display_name.as_deref().unwrap_or(&user.display_name),
            input.email.as_deref().unwrap_or(&user.email),
        )?;
        user.username = username;
        user.display_name = display_name;
        user.email = email;

        if let Some(role) = input.role {
            user.role = role;
        }
        let requested_area = input.area_id.unwrap_or(user.area_id);
        user.area_id = self.resolve_area(user.role, requested_area).await?;

        if let Some(active) = input.active {
            if !active && id == principal.user_id {
                return Err(ServiceError::business("You cannot deactivate your own account"));
            }
            user.active = active;
        }

        self.store.update_user(&user).await.map_err(unique_violation)?;
        info!("User {} updated by user {}", id, principal.user_id);
        Ok(user)
    }

    pub async fn reset_password(&self, id: i32, password: &str, principal: &Principal) -> ServiceResult<()> {
        principal.require_super_admin()?;
        check_password(password)?;
        let mut user = self.load(id).await?;
        user.password_hash = hash_password(password)?;
        self.store.update_user(&user).await?;

        info!("Password of user {} reset by user {}", id, principal.user_id);
        Ok(())
    }

    /// Without `force`, a user still assigned to requests is refused. With it,
    /// the assignments are detached and the user's comments and history rows
    /// go with the account.
    pub async fn delete(&self, id: i32, force: bool, principal: &Principal) -> ServiceResult<UserDeletion> {
        principal.require_super_admin()?;
        if id == principal.user_id {
            return Err(ServiceError::business("You cannot delete your own account"));
        }
        let user = self.load(id).await?;

        if self.store.count_requests_by_requester(id).await? > 0 {
            return Err(ServiceError::business(
                "Cannot delete a user who has submitted requests; deactivate instead",
            ));
        }

        let assigned = self
            .store
            .list_requests(&RequestFilter {
                assigned_agent_id: Some(id),
                ..Default::default()
            })
            .await?;
        if !assigned.is_empty() && !force {
            return Err(ServiceError::business(format!(
                "Cannot delete a user with {} assigned request(s); deactivate instead",
                assigned.len()
            )));
        }

        let deletion = self.store.delete_user_detaching(id).await?;
        warn!(
            "User {} '{}' deleted by user {}: {} request(s) detached, {} comment(s) and {} history row(s) removed",
            id,
            user.username,
            principal.user_id,
            deletion.detached_requests,
            deletion.deleted_comments,
            deletion.deleted_history
        );
        Ok(deletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::services::NewRequestInput;
    use crate::testing::TestContext;
    use crate::types::Priority;

    fn input(username: &str, role: Role, area_id: Option<i32>) -> CreateUserInput {
        CreateUserInput {
            username: username.into(),
            display_name: String::new(),
            email: format!("{}@Desk.Local", username),
            password: "secret1".into(),
            role,
            area_id,
        }
    }

    #[tokio::test]
    async fn only_super_admins_manage_accounts() {
        let ctx = TestContext::new().await.unwrap();
        let admin = ctx.as_principal(&ctx.demo.admin);

        assert!(matches!(
            ctx.users().list(None, &admin).await,
            Err(ServiceError::UnauthorizedAction(_))
        ));
    }

    #[tokio::test]
    async fn create_validates_role_area_and_uniqueness() {
        let ctx = TestContext::new().await.unwrap();
        let root = ctx.as_principal(&ctx.demo.root);
        let users = ctx.users();

        let carol = users.create(input("carol", Role::User, Some(ctx.demo.it.id)), &root).await.unwrap();
        assert_eq!(carol.area_id, None);
        assert_eq!(carol.display_name, "carol");
        assert_eq!(carol.email, "carol@desk.local");

        assert!(matches!(
            users.create(input("dave", Role::AreaAgent, None), &root).await,
            Err(ServiceError::Business(_))
        ));
        assert!(matches!(
            users.create(input("dave", Role::AreaAgent, Some(999)), &root).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            users.create(input("alice", Role::User, None), &root).await,
            Err(ServiceError::Business(msg)) if msg == "Username is already taken"
        ));

        let mut short = input("erin", Role::User, None);
        short.password = "12345".into();
        assert!(matches!(users.create(short, &root).await, Err(ServiceError::Business(_))));
    }

    #[tokio::test]
    async fn reset_password_replaces_the_hash() {
        let ctx = TestContext::new().await.unwrap();
        let root = ctx.as_principal(&ctx.demo.root);

        ctx.users().reset_password(ctx.demo.bob.id, "new-pass", &root).await.unwrap();
        let bob = ctx.store.find_user(ctx.demo.bob.id).await.unwrap().unwrap();
        assert!(verify_password("new-pass", &bob.password_hash));
        assert!(ctx.users().reset_password(ctx.demo.bob.id, "abc", &root).await.is_err());
    }

    #[tokio::test]
    async fn delete_guards_and_force_cascade() {
        let ctx = TestContext::new().await.unwrap();
        let root = ctx.as_principal(&ctx.demo.root);
        let alice = ctx.as_principal(&ctx.demo.alice);
        let agent = ctx.as_principal(&ctx.demo.it_agent);
        let users = ctx.users();

        let request = ctx
            .requests()
            .create(
                &alice,
                NewRequestInput {
                    type_id: ctx.demo.hardware.id,
                    subject: "Dock is dead".into(),
                    description: "No video output".into(),
                    priority: Priority::High,
                    attachment: None,
                },
            )
            .await
            .unwrap();
        ctx.requests().take(request.id, &agent).await.unwrap();
        ctx.comments().add_comment(request.id, "On it", &agent).await.unwrap();

        assert!(matches!(users.delete(root.user_id, true, &root).await, Err(ServiceError::Business(_))));
        assert!(matches!(users.delete(alice.user_id, true, &root).await, Err(ServiceError::Business(_))));
        assert!(matches!(users.delete(agent.user_id, false, &root).await, Err(ServiceError::Business(_))));

        let deletion = users.delete(agent.user_id, true, &root).await.unwrap();
        assert_eq!(deletion.detached_requests, 1);
        assert!(deletion.deleted_comments >= 1);

        let request = ctx.store.find_request(request.id).await.unwrap().unwrap();
        assert_eq!(request.assigned_agent_id, None);
        assert!(matches!(users.get(agent.user_id, &root).await, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn cannot_deactivate_yourself() {
        let ctx = TestContext::new().await.unwrap();
        let root = ctx.as_principal(&ctx.demo.root);

        let update = UpdateUserInput {
            active: Some(false),
            ..Default::default()
        };
        assert!(matches!(
            ctx.users().update(root.user_id, update, &root).await,
            Err(ServiceError::Business(_))
        ));
    }
}
