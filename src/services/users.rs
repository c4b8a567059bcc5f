use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::user::{self, Entity as User, UserRole},
    errors::ServiceError,
    services::reviews::ReviewService,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub active: bool,
}

#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    reviews: ReviewService,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, reviews: ReviewService) -> Self {
        Self { db, reviews }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let user = User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;
        Ok(model_to_response(user))
    }

    /// Deactivates an account. The row is kept (transactions and profits
    /// reference it); the user's reviews are removed through the bulk
    /// path so every affected course's rating stays consistent.
    #[instrument(skip(self))]
    pub async fn deactivate(&self, user_id: Uuid) -> Result<UserResponse, ServiceError> {
        let user = User::find_by_id(user_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", user_id)))?;

        let mut active_model = user.into_active_model();
        active_model.active = Set(false);
        active_model.updated_at = Set(Utc::now());
        let updated = active_model.update(&*self.db).await?;

        let removed = self.reviews.delete_for_user(user_id).await?;
        info!(user_id = %user_id, reviews_removed = removed, "User deactivated");

        Ok(model_to_response(updated))
    }
}

fn model_to_response(model: user::Model) -> UserResponse {
    UserResponse {
        id: model.id,
        name: model.name,
        email: model.email,
        role: model.role,
        active: model.active,
    }
}
