use anyhow::anyhow;
use tracing::{info, instrument};

use tutordesk_core::{AppError, hash_password};
use tutordesk_db::{EntityStore, UserStore};
use tutordesk_models::ids::UserId;
use tutordesk_models::users::{CreateUserDto, NewUser, UpdateUserDto, User, UserFilterParams, UserPatch};

use crate::metrics::track_user_created;

pub struct UserService;

impl UserService {
    #[instrument(skip(store, dto), fields(email = %dto.email, role = %dto.role))]
    pub async fn create_user(store: &dyn EntityStore, dto: CreateUserDto) -> Result<User, AppError> {
        let password_hash = hash_password(&dto.password)?;
        let user = store
            .create_user(NewUser {
                first_name: dto.first_name,
                last_name: dto.last_name,
                email: dto.email,
                role: dto.role,
                password_hash,
            })
            .await?;

        track_user_created(user.role.as_str());
        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub async fn get_users(
        store: &dyn EntityStore,
        params: &UserFilterParams,
    ) -> Result<Vec<User>, AppError> {
        let filter = params.to_filter()?;
        Ok(store.list_users(&filter).await?)
    }

    pub async fn get_user(store: &dyn EntityStore, id: UserId) -> Result<User, AppError> {
        store
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("User with id {} not found", id)))
    }

    /// A new password is hashed before it reaches the store. Demoting the last
    /// admin fails with `Conflict`.
    #[instrument(skip(store, dto))]
    pub async fn update_user(
        store: &dyn EntityStore,
        id: UserId,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        let password_hash = dto.password.as_deref().map(hash_password).transpose()?;
        let patch = UserPatch {
            first_name: dto.first_name,
            last_name: dto.last_name,
            email: dto.email,
            role: dto.role,
            password_hash,
        };
        Ok(store.update_user(id, patch).await?)
    }

    #[instrument(skip(store))]
    pub async fn delete_user(store: &dyn EntityStore, id: UserId) -> Result<(), AppError> {
        store.delete_user(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}
