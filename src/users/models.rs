use crate::db::schema::users;
use crate::profile::Profile;
use crate::types::{not_found, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    #[serde(serialize_with = "crate::utils::serialize_date")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "crate::utils::serialize_date")]
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn profile(self, following: bool) -> Profile {
        Profile {
            username: self.username,
            bio: self.bio,
            image: self.image,
            following,
        }
    }

    pub fn load_by_id(user_id: i32, connection: &mut SqliteConnection) -> Result<User> {
        use crate::db::schema::users::dsl::*;
        users
            .find(user_id)
            .select(User::as_select())
            .first(connection)
            .optional()?
            .ok_or_else(|| not_found(format!("User {}", user_id)))
    }

    pub fn load_by_email(address: &str, connection: &mut SqliteConnection) -> Result<User> {
        use crate::db::schema::users::dsl::*;
        users
            .filter(email.eq(address))
            .select(User::as_select())
            .first(connection)
            .optional()?
            .ok_or_else(|| not_found(format!("Email {}", address)))
    }

    pub fn load_by_name(name: &str, connection: &mut SqliteConnection) -> Result<User> {
        use crate::db::schema::users::dsl::*;
        users
            .filter(username.eq(name))
            .select(User::as_select())
            .first(connection)
            .optional()?
            .ok_or_else(|| not_found(format!("Username {}", name)))
    }

    /// An empty id set matches nobody.
    pub fn load_by_ids(ids: &[i32], connection: &mut SqliteConnection) -> Result<Vec<User>> {
        use crate::db::schema::users::dsl::*;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(users
            .filter(id.eq_any(ids))
            .order(id.asc())
            .select(User::as_select())
            .load(connection)?)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Full replacement row written by an update; `None` clears a nullable column.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = users, treat_none_as_null = true)]
pub(crate) struct UserChanges<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub bio: Option<&'a str>,
    pub image: Option<&'a str>,
    pub updated_at: NaiveDateTime,
}

impl<'a> From<&'a User> for UserChanges<'a> {
    fn from(user: &'a User) -> UserChanges<'a> {
        UserChanges {
            email: &user.email,
            username: &user.username,
            password_hash: &user.password_hash,
            bio: user.bio.as_deref(),
            image: user.image.as_deref(),
            updated_at: user.updated_at,
        }
    }
}

/// Partial update. `None` leaves a field untouched; for `bio` and `image`,
/// `Some(None)` clears the stored value.
#[derive(Debug, Default, Clone)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<Option<String>>,
    pub image: Option<Option<String>>,
}
