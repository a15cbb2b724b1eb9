use crate::{
    auth::{hash_password, verify_password, AuthService, TokenResponse},
    db::DbPool,
    entities::user::{self, Entity as Users, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
    services::audit::AuditService,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 12, message = "Password must be at least 12 characters"))]
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Portal staff accounts and login.
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
    auth_service: Arc<AuthService>,
    audit: Arc<AuditService>,
    event_sender: EventSender,
}

impl UserService {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth_service: Arc<AuthService>,
        audit: Arc<AuditService>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db_pool,
            auth_service,
            audit,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(
        &self,
        input: CreateUserInput,
        actor: &str,
    ) -> Result<user::Model, ServiceError> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A user with email '{}' already exists",
                email
            )));
        }

        let model = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            name: Set(input.name),
            password_hash: Set(hash_password(&input.password)?),
            role: Set(input.role.to_string()),
            is_active: Set(true),
            last_login_at: Set(None),
            created_at: Set(Utc::now()),
            updated_at: Set(None),
        };
        let saved = model.insert(&*self.db_pool).await?;

        info!(user_id = %saved.id, role = %saved.role, "User created");
        self.audit
            .record(actor, "users.create", "user", Some(saved.id), None)
            .await;
        let _ = self.event_sender.send(Event::UserCreated(saved.id)).await;
        Ok(saved)
    }

    /// Verifies credentials and issues a token. Credential failures are
    /// indistinguishable on purpose.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(
        &self,
        input: LoginInput,
    ) -> Result<(user::Model, TokenResponse), ServiceError> {
        let email = input.email.trim().to_lowercase();
        let user = match self.find_by_email(&email).await? {
            Some(user) if user.is_active => user,
            _ => {
                warn!("Login attempt for unknown or inactive account");
                return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
            }
        };

        if !verify_password(&input.password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = self.auth_service.generate_token(&user)?;

        let user_id = user.id;
        let mut active: user::ActiveModel = user.into();
        active.last_login_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        let _ = self.event_sender.send(Event::UserLoggedIn(user_id)).await;
        Ok((saved, token))
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        Users::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<user::Model>, ServiceError> {
        Ok(Users::find()
            .filter(user::Column::Email.eq(email))
            .one(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let paginator = Users::find()
            .order_by_desc(user::Column::CreatedAt)
            .paginate(&*self.db_pool, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Deactivated users keep their rows but can no longer log in.
    #[instrument(skip(self))]
    pub async fn deactivate_user(&self, id: Uuid, actor: &str) -> Result<user::Model, ServiceError> {
        let existing = self.get_user(id).await?;
        let mut active: user::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        self.audit
            .record(actor, "users.deactivate", "user", Some(saved.id), None)
            .await;
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn change_role(
        &self,
        id: Uuid,
        role: UserRole,
        actor: &str,
    ) -> Result<user::Model, ServiceError> {
        let existing = self.get_user(id).await?;
        let old_role = existing.role.clone();
        let mut active: user::ActiveModel = existing.into();
        active.role = Set(role.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let saved = active.update(&*self.db_pool).await?;

        self.audit
            .record(
                actor,
                "users.change_role",
                "user",
                Some(saved.id),
                Some(serde_json::json!({ "from": old_role, "to": role.to_string() })),
            )
            .await;
        Ok(saved)
    }
}
