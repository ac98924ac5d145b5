use crate::db::schema::{article_favorites, articles};
use crate::db::{DbConnection, Pool};
use crate::profile::followed_ids;
use crate::tag::{normalize_tags, Tag};
use crate::types::{already_exists, not_found, Error, Result};
use crate::users::User;
use crate::utils::{make_slug, normalize, now};
use chrono::NaiveDateTime;
use diesel::dsl::{count_star, exists};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sqlite::SqliteConnection;
use diesel::{delete, insert_into, select, update as diesel_update};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(belongs_to(User, foreign_key = author_id))]
#[diesel(table_name = articles)]
pub struct Article {
    pub id: i32,
    pub author_id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    #[serde(serialize_with = "crate::utils::serialize_date")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "crate::utils::serialize_date")]
    pub updated_at: NaiveDateTime,
}

impl Article {
    pub fn load_by_id(article_id: i32, connection: &mut SqliteConnection) -> Result<Article> {
        articles::table
            .find(article_id)
            .select(Article::as_select())
            .first(connection)
            .optional()?
            .ok_or_else(|| not_found(format!("Article {}", article_id)))
    }

    pub fn load_by_slug(slug_: &str, connection: &mut SqliteConnection) -> Result<Article> {
        articles::table
            .filter(articles::slug.eq(slug_))
            .select(Article::as_select())
            .first(connection)
            .optional()?
            .ok_or_else(|| not_found(format!("Article with slug {}", slug_)))
    }
}

#[derive(Insertable)]
#[diesel(table_name = articles)]
struct NewArticle<'a> {
    author_id: i32,
    slug: &'a str,
    title: &'a str,
    description: &'a str,
    body: &'a str,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(AsChangeset)]
#[diesel(table_name = articles)]
struct ArticleChanges<'a> {
    slug: &'a str,
    title: &'a str,
    description: &'a str,
    body: &'a str,
    updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct CreateArticle {
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
}

/// Conjunctive listing filter. `author_ids: Some(vec![])` matches no article,
/// while `None` leaves authorship unrestricted.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub author_ids: Option<Vec<i32>>,
    pub favorited_by: Option<i32>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Articles, tags, comments and favorites.
#[derive(Clone)]
pub struct ArticleService {
    pool: Pool,
}

impl ArticleService {
    pub fn new(pool: Pool) -> ArticleService {
        ArticleService { pool }
    }

    pub(crate) fn connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    pub fn create(&self, author_id: i32, details: CreateArticle) -> Result<Article> {
        info!(
            author_id,
            title = %details.title,
            tag_list = ?details.tag_list,
            "creating article"
        );
        let mut connection = self.connection()?;
        let author = User::load_by_id(author_id, &mut connection)?;
        let slug = make_slug(&author.username, &details.title);
        ensure_slug_available(&slug, None, &mut connection)?;
        let tag_names = normalize_tags(details.tag_list.as_deref().unwrap_or(&[]));

        let created = now();
        let new_article = NewArticle {
            author_id: author.id,
            slug: &slug,
            title: &details.title,
            description: &details.description,
            body: &details.body,
            created_at: created,
            updated_at: created,
        };
        let article = connection.transaction::<_, Error, _>(|conn| {
            let article = insert_into(articles::table)
                .values(&new_article)
                .returning(Article::as_returning())
                .get_result(conn)
                .map_err(|e| slug_conflict(&slug, e))?;
            for name in &tag_names {
                let tag = Tag::find_or_create(name, conn)?;
                Tag::link(article.id, tag.id, conn)?;
            }
            Ok(article)
        })?;
        info!(article_id = article.id, slug = %article.slug, "article created");
        Ok(article)
    }

    pub fn get_by_id(&self, article_id: i32) -> Result<Article> {
        Article::load_by_id(article_id, &mut *self.connection()?)
    }

    pub fn get_by_slug(&self, slug: &str) -> Result<Article> {
        Article::load_by_slug(slug, &mut *self.connection()?)
    }

    /// Newest first.
    pub fn list(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        list_articles(filter, &mut *self.connection()?)
    }

    /// Articles by the authors `viewer_id` follows; following nobody yields
    /// nothing.
    pub fn feed(&self, viewer_id: i32, limit: i64, offset: i64) -> Result<Vec<Article>> {
        let mut connection = self.connection()?;
        let filter = ArticleFilter {
            author_ids: Some(followed_ids(viewer_id, &mut connection)?),
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        };
        list_articles(&filter, &mut connection)
    }

    /// Does not check authorship; callers compare `author_id` with the
    /// acting user first.
    pub fn update(&self, article_id: i32, update: UpdateArticle) -> Result<Article> {
        info!(
            article_id,
            title = ?update.title,
            description = ?update.description,
            "updating article"
        );
        let mut connection = self.connection()?;
        let mut article = Article::load_by_id(article_id, &mut connection)?;

        if let Some(title) = update.title {
            let author = User::load_by_id(article.author_id, &mut connection)?;
            let slug = make_slug(&author.username, &title);
            ensure_slug_available(&slug, Some(article.id), &mut connection)?;
            article.slug = slug;
            article.title = title;
        }
        if let Some(description) = update.description {
            article.description = description;
        }
        if let Some(body) = update.body {
            article.body = body;
        }
        article.updated_at = now();

        let changes = ArticleChanges {
            slug: &article.slug,
            title: &article.title,
            description: &article.description,
            body: &article.body,
            updated_at: article.updated_at,
        };
        diesel_update(articles::table.find(article.id))
            .set(&changes)
            .returning(Article::as_returning())
            .get_result(&mut connection)
            .map_err(|e| slug_conflict(&article.slug, e))
    }

    pub fn delete(&self, article_id: i32) -> Result<()> {
        info!(article_id, "deleting article");
        let deleted =
            delete(articles::table.find(article_id)).execute(&mut *self.connection()?)?;
        if deleted == 0 {
            return Err(not_found(format!("Article {}", article_id)));
        }
        Ok(())
    }

    /// Idempotent: a user holds at most one favorite per article.
    pub fn favorite(&self, user_id: i32, article_id: i32) -> Result<()> {
        info!(user_id, article_id, "favoriting article");
        let mut connection = self.connection()?;
        User::load_by_id(user_id, &mut connection)?;
        Article::load_by_id(article_id, &mut connection)?;
        let inserted = insert_into(article_favorites::table)
            .values((
                article_favorites::user_id.eq(user_id),
                article_favorites::article_id.eq(article_id),
            ))
            .on_conflict((article_favorites::user_id, article_favorites::article_id))
            .do_nothing()
            .execute(&mut connection)?;
        if inserted == 0 {
            debug!(user_id, article_id, "already favorited");
        }
        Ok(())
    }

    pub fn unfavorite(&self, user_id: i32, article_id: i32) -> Result<()> {
        info!(user_id, article_id, "unfavoriting article");
        delete(
            article_favorites::table
                .filter(article_favorites::user_id.eq(user_id))
                .filter(article_favorites::article_id.eq(article_id)),
        )
        .execute(&mut *self.connection()?)?;
        Ok(())
    }

    pub fn is_favorite(&self, user_id: i32, article_id: i32) -> Result<bool> {
        is_favorite(user_id, article_id, &mut *self.connection()?)
    }

    pub fn favorites_count(&self, article_id: i32) -> Result<i64> {
        favorites_count(article_id, &mut *self.connection()?)
    }
}

/// The slug may be held by `owner` itself (a retitle that normalizes to the
/// same slug) but by no other article.
fn ensure_slug_available(
    candidate: &str,
    owner: Option<i32>,
    connection: &mut SqliteConnection,
) -> Result<()> {
    let holder = articles::table
        .filter(articles::slug.eq(candidate))
        .select(articles::id)
        .first::<i32>(connection)
        .optional()?;
    match holder {
        Some(holder) if Some(holder) != owner => Err(slug_taken(candidate)),
        _ => Ok(()),
    }
}

fn slug_taken(slug: &str) -> Error {
    already_exists(format!(
        "Slug {} already exists. Please choose another title.",
        slug
    ))
}

/// A concurrent write can claim the slug between the availability check and
/// the write; `slug` is the only unique column of `articles`.
fn slug_conflict(slug: &str, err: DieselError) -> Error {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => slug_taken(slug),
        other => other.into(),
    }
}

pub(crate) fn list_articles(
    filter: &ArticleFilter,
    connection: &mut SqliteConnection,
) -> Result<Vec<Article>> {
    use crate::db::schema::{article_article_tags, article_tags};

    let mut query = articles::table
        .select(Article::as_select())
        .order((articles::created_at.desc(), articles::id.desc()))
        .into_boxed();

    if let Some(ref author_ids) = filter.author_ids {
        if author_ids.is_empty() {
            return Ok(Vec::new());
        }
        query = query.filter(articles::author_id.eq_any(author_ids.clone()));
    }

    if let Some(user) = filter.favorited_by {
        let favorited = article_favorites::table
            .filter(article_favorites::user_id.eq(user))
            .select(article_favorites::article_id)
            .load::<i32>(connection)?;
        if favorited.is_empty() {
            return Ok(Vec::new());
        }
        query = query.filter(articles::id.eq_any(favorited));
    }

    if let Some(ref tag) = filter.tag {
        let tagged = article_article_tags::table
            .inner_join(article_tags::table)
            .filter(article_tags::name.eq(normalize(tag)))
            .select(article_article_tags::article_id)
            .load::<i32>(connection)?;
        if tagged.is_empty() {
            return Ok(Vec::new());
        }
        query = query.filter(articles::id.eq_any(tagged));
    }

    if let Some(limit) = filter.limit {
        query = query.limit(limit);
    }
    if let Some(offset) = filter.offset {
        query = query.offset(offset);
    }
    Ok(query.load(connection)?)
}

pub(crate) fn is_favorite(
    user: i32,
    article: i32,
    connection: &mut SqliteConnection,
) -> Result<bool> {
    Ok(select(exists(
        article_favorites::table
            .filter(article_favorites::user_id.eq(user))
            .filter(article_favorites::article_id.eq(article)),
    ))
    .get_result::<bool>(connection)?)
}

pub(crate) fn favorites_count(article: i32, connection: &mut SqliteConnection) -> Result<i64> {
    Ok(article_favorites::table
        .filter(article_favorites::article_id.eq(article))
        .select(count_star())
        .first::<i64>(connection)?)
}
