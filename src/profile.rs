use crate::db::schema::follows;
use crate::db::Pool;
use crate::types::{invalid_argument, Result};
use crate::users::User;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel::{delete, insert_into, select};
use serde::Serialize;

/// A user as seen by one viewer. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub username: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub following: bool,
}

#[derive(Clone)]
pub struct ProfileService {
    pool: Pool,
}

impl ProfileService {
    pub fn new(pool: Pool) -> ProfileService {
        ProfileService { pool }
    }

    /// Idempotent: following an already followed user changes nothing.
    pub fn follow(&self, follower: i32, followed: i32) -> Result<()> {
        info!(follower, followed, "following user");
        if follower == followed {
            return Err(invalid_argument("Users cannot follow themselves"));
        }
        let mut connection = self.pool.get()?;
        User::load_by_id(follower, &mut connection)?;
        User::load_by_id(followed, &mut connection)?;

        let inserted = insert_into(follows::table)
            .values((
                follows::follower_id.eq(follower),
                follows::followed_id.eq(followed),
            ))
            .on_conflict((follows::follower_id, follows::followed_id))
            .do_nothing()
            .execute(&mut connection)?;
        if inserted == 0 {
            debug!(follower, followed, "already following");
        }
        Ok(())
    }

    pub fn unfollow(&self, follower: i32, followed: i32) -> Result<()> {
        info!(follower, followed, "unfollowing user");
        delete(
            follows::table
                .filter(follows::follower_id.eq(follower))
                .filter(follows::followed_id.eq(followed)),
        )
        .execute(&mut *self.pool.get()?)?;
        Ok(())
    }

    pub fn is_following(&self, follower: i32, followed: i32) -> Result<bool> {
        is_following(follower, followed, &mut *self.pool.get()?)
    }

    /// Anonymous viewers never follow anyone.
    pub fn get_profile(&self, user_id: i32, viewer: Option<i32>) -> Result<Profile> {
        let mut connection = self.pool.get()?;
        let user = User::load_by_id(user_id, &mut connection)?;
        let following = match viewer {
            Some(viewer) => is_following(viewer, user.id, &mut connection)?,
            None => false,
        };
        Ok(user.profile(following))
    }

    pub fn get_profile_by_username(&self, username: &str, viewer: Option<i32>) -> Result<Profile> {
        let mut connection = self.pool.get()?;
        let user = User::load_by_name(username, &mut connection)?;
        let following = match viewer {
            Some(viewer) => is_following(viewer, user.id, &mut connection)?,
            None => false,
        };
        Ok(user.profile(following))
    }

    pub fn list_followed_profiles(&self, user_id: i32) -> Result<Vec<Profile>> {
        let mut connection = self.pool.get()?;
        let ids = followed_ids(user_id, &mut connection)?;
        Ok(User::load_by_ids(&ids, &mut connection)?
            .into_iter()
            .map(|user| user.profile(true))
            .collect())
    }
}

pub(crate) fn is_following(
    follower: i32,
    followed: i32,
    connection: &mut SqliteConnection,
) -> Result<bool> {
    Ok(select(exists(
        follows::table
            .filter(follows::follower_id.eq(follower))
            .filter(follows::followed_id.eq(followed)),
    ))
    .get_result::<bool>(connection)?)
}

pub(crate) fn followed_ids(follower: i32, connection: &mut SqliteConnection) -> Result<Vec<i32>> {
    Ok(follows::table
        .filter(follows::follower_id.eq(follower))
        .select(follows::followed_id)
        .load::<i32>(connection)?)
}
