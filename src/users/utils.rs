use crate::types::{already_exists, invalid_argument, Result};
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::select;
use diesel::sqlite::SqliteConnection;
use regex::Regex;
use url::Url;

lazy_static! {
    static ref EMAIL_RE: Regex = {
        let pattern = r"(?i)\A[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)*[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\z";
        Regex::new(pattern).unwrap()
    };
}

pub fn validate_email_re(email: &str) -> Result<()> {
    if !EMAIL_RE.is_match(email) {
        Err(invalid_argument(format!("Invalid email: {}", email)))
    } else {
        Ok(())
    }
}

pub fn validate_username_re(username: &str) -> Result<()> {
    if username.trim().is_empty() {
        Err(invalid_argument("Username must not be empty"))
    } else {
        Ok(())
    }
}

/// Accepts an absolute URL or an absolute path on the serving host.
pub fn validate_image(image: &str) -> Result<()> {
    let parsed = if image.starts_with('/') {
        Url::parse("http://localhost").and_then(|base| base.join(image))
    } else {
        Url::parse(image)
    };
    match parsed {
        Ok(_) => Ok(()),
        Err(_) => Err(invalid_argument(format!("Invalid image URL {}", image))),
    }
}

pub fn validate_email(email_to_validate: &str, connection: &mut SqliteConnection) -> Result<()> {
    use crate::db::schema::users::dsl::*;
    validate_email_re(email_to_validate)?;
    let email_exists =
        select(exists(users.filter(email.eq(email_to_validate)))).get_result::<bool>(connection)?;
    if email_exists {
        return Err(already_exists("Email is taken"));
    }
    Ok(())
}

pub fn validate_username(
    username_to_validate: &str,
    connection: &mut SqliteConnection,
) -> Result<()> {
    use crate::db::schema::users::dsl::*;
    validate_username_re(username_to_validate)?;
    let username_exists = select(exists(users.filter(username.eq(username_to_validate))))
        .get_result::<bool>(connection)?;
    if username_exists {
        return Err(already_exists("Username is taken"));
    }
    Ok(())
}
