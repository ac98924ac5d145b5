use crate::db::schema::users;
use crate::db::Pool;
use crate::types::{unauthorized, ErrorKind, Result};
use crate::utils::now;
use diesel::insert_into;
use diesel::prelude::*;
use diesel::update as diesel_update;

pub mod credentials;
pub mod models;
mod utils;

pub use self::credentials::Credentials;
pub use self::models::{UpdateUser, User};

use self::models::{NewUser, UserChanges};
use self::utils::*;

/// Owns user identity records and resolves bearer tokens to users.
#[derive(Clone)]
pub struct UserService {
    pool: Pool,
    credentials: Credentials,
}

impl UserService {
    pub fn new(pool: Pool, credentials: Credentials) -> UserService {
        UserService { pool, credentials }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn register(&self, email: &str, username: &str, password: &str) -> Result<User> {
        info!(email, username, "registering user");
        let mut connection = self.pool.get()?;

        validate_email(email, &mut connection)?;
        validate_username(username, &mut connection)?;
        let password_hash = self.credentials.hash_password(password)?;

        let created = now();
        let new_user = NewUser {
            email,
            username,
            password_hash: &password_hash,
            created_at: created,
            updated_at: created,
        };
        let user = insert_into(users::table)
            .values(&new_user)
            .returning(User::as_returning())
            .get_result(&mut connection)?;
        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    pub fn get_by_id(&self, user_id: i32) -> Result<User> {
        User::load_by_id(user_id, &mut *self.pool.get()?)
    }

    pub fn get_by_email(&self, email: &str) -> Result<User> {
        User::load_by_email(email, &mut *self.pool.get()?)
    }

    pub fn get_by_username(&self, username: &str) -> Result<User> {
        User::load_by_name(username, &mut *self.pool.get()?)
    }

    pub fn get_by_token(&self, token: &str) -> Result<User> {
        let user_id = self.credentials.validate_token(token)?;
        self.get_by_id(user_id)
    }

    pub fn list_by_ids(&self, ids: &[i32]) -> Result<Vec<User>> {
        User::load_by_ids(ids, &mut *self.pool.get()?)
    }

    pub fn verify_password(&self, user_id: i32, password: &str) -> Result<bool> {
        let user = self.get_by_id(user_id)?;
        self.credentials
            .verify_password(password, &user.password_hash)
    }

    /// Resolves credentials to a user. An unknown email and a wrong password
    /// are indistinguishable to the caller.
    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        let user = match self.get_by_email(email) {
            Ok(user) => user,
            Err(ref e) if matches!(e.kind(), ErrorKind::NotFound(_)) => {
                debug!(email, "login for unknown email");
                return Err(unauthorized("Invalid email or password"));
            }
            Err(e) => return Err(e),
        };
        if !self
            .credentials
            .verify_password(password, &user.password_hash)?
        {
            debug!(user_id = user.id, "login with wrong password");
            return Err(unauthorized("Invalid email or password"));
        }
        Ok(user)
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        self.credentials.issue_token(user)
    }

    pub fn update(&self, user_id: i32, update: UpdateUser) -> Result<User> {
        info!(
            user_id,
            email = ?update.email,
            username = ?update.username,
            updating_password = update.password.is_some(),
            bio = ?update.bio,
            image = ?update.image,
            "updating user"
        );
        let mut connection = self.pool.get()?;
        let mut user = User::load_by_id(user_id, &mut connection)?;

        if let Some(new_email) = update.email {
            if new_email != user.email {
                validate_email(&new_email, &mut connection)?;
                user.email = new_email;
            }
        }

        if let Some(new_username) = update.username {
            if new_username != user.username {
                validate_username(&new_username, &mut connection)?;
                user.username = new_username;
            }
        }

        if let Some(new_password) = update.password {
            user.password_hash = self.credentials.hash_password(&new_password)?;
        }

        if let Some(new_bio) = update.bio {
            user.bio = new_bio;
        }

        if let Some(new_image) = update.image {
            if let Some(ref image) = new_image {
                validate_image(image)?;
            }
            user.image = new_image;
        }

        user.updated_at = now();
        let updated = diesel_update(users::table.find(user.id))
            .set(UserChanges::from(&user))
            .returning(User::as_returning())
            .get_result(&mut connection)?;
        Ok(updated)
    }
}
