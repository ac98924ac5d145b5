#[macro_use]
extern crate error_chain;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate tracing;

pub mod types;
pub mod utils;

pub mod config;
pub mod db;

pub mod article;
pub mod comment;
pub mod profile;
pub mod tag;
pub mod users;
pub mod views;

pub use crate::article::{ArticleFilter, ArticleService, CreateArticle, UpdateArticle};
pub use crate::config::Config;
pub use crate::profile::{Profile, ProfileService};
pub use crate::types::{Error, ErrorKind, Result};
pub use crate::users::{Credentials, UserService};
pub use crate::views::Conduit;
