use crate::article::{Article, ArticleService};
use crate::comment::Comment;
use crate::config::Config;
use crate::db::{self, Pool};
use crate::profile::{Profile, ProfileService};
use crate::tag::TagFilter;
use crate::types::Result;
use crate::users::{Credentials, UserService};
use crate::utils::serialize_date;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashMap;

/// An article as one viewer sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    #[serde(skip_serializing)]
    pub id: i32,
    #[serde(skip_serializing)]
    pub author_id: i32,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tag_list: Vec<String>,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "serialize_date")]
    pub updated_at: NaiveDateTime,
    pub favorited: bool,
    pub favorites_count: i64,
    pub author: Profile,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: i32,
    #[serde(skip_serializing)]
    pub author_id: i32,
    #[serde(serialize_with = "serialize_date")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "serialize_date")]
    pub updated_at: NaiveDateTime,
    pub body: String,
    pub author: Profile,
}

/// Every service wired to one store.
#[derive(Clone)]
pub struct Conduit {
    pub users: UserService,
    pub profiles: ProfileService,
    pub articles: ArticleService,
}

impl Conduit {
    pub fn new(pool: Pool, credentials: Credentials) -> Conduit {
        Conduit {
            users: UserService::new(pool.clone(), credentials),
            profiles: ProfileService::new(pool.clone()),
            articles: ArticleService::new(pool),
        }
    }

    pub fn from_config(config: &Config) -> Result<Conduit> {
        let pool = db::init_pool(config)?;
        let credentials = Credentials::new(config.jwt.clone(), config.bcrypt_cost);
        Ok(Conduit::new(pool, credentials))
    }

    pub fn article_view(&self, article: Article, viewer: Option<i32>) -> Result<ArticleView> {
        let author = self.profiles.get_profile(article.author_id, viewer)?;
        self.assemble(article, author, viewer)
    }

    /// Author profiles are resolved once per distinct author.
    pub fn article_views(
        &self,
        articles: Vec<Article>,
        viewer: Option<i32>,
    ) -> Result<Vec<ArticleView>> {
        let mut authors: HashMap<i32, Profile> = HashMap::new();
        let mut views = Vec::with_capacity(articles.len());
        for article in articles {
            let author = match authors.get(&article.author_id) {
                Some(profile) => profile.clone(),
                None => {
                    let profile = self.profiles.get_profile(article.author_id, viewer)?;
                    authors.insert(article.author_id, profile.clone());
                    profile
                }
            };
            views.push(self.assemble(article, author, viewer)?);
        }
        Ok(views)
    }

    pub fn feed_views(&self, viewer: i32, limit: i64, offset: i64) -> Result<Vec<ArticleView>> {
        let articles = self.articles.feed(viewer, limit, offset)?;
        self.article_views(articles, Some(viewer))
    }

    pub fn comment_views(
        &self,
        comments: Vec<Comment>,
        viewer: Option<i32>,
    ) -> Result<Vec<CommentView>> {
        let mut authors: HashMap<i32, Profile> = HashMap::new();
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let author = match authors.get(&comment.author_id) {
                Some(profile) => profile.clone(),
                None => {
                    let profile = self.profiles.get_profile(comment.author_id, viewer)?;
                    authors.insert(comment.author_id, profile.clone());
                    profile
                }
            };
            views.push(CommentView {
                id: comment.id,
                author_id: comment.author_id,
                created_at: comment.created_at,
                updated_at: comment.updated_at,
                body: comment.body,
                author,
            });
        }
        Ok(views)
    }

    fn assemble(
        &self,
        article: Article,
        author: Profile,
        viewer: Option<i32>,
    ) -> Result<ArticleView> {
        let tag_list = self
            .articles
            .list_tags(&TagFilter {
                article_id: Some(article.id),
            })?
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        let favorited = match viewer {
            Some(viewer) => self.articles.is_favorite(viewer, article.id)?,
            None => false,
        };
        let favorites_count = self.articles.favorites_count(article.id)?;
        Ok(ArticleView {
            id: article.id,
            author_id: article.author_id,
            slug: article.slug,
            title: article.title,
            description: article.description,
            body: article.body,
            tag_list,
            created_at: article.created_at,
            updated_at: article.updated_at,
            favorited,
            favorites_count,
            author,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::tests::draft;
    use crate::comment::CommentFilter;
    use crate::db::memory_pool;
    use crate::users::tests::credentials;

    fn conduit() -> Conduit {
        Conduit::new(memory_pool().unwrap(), credentials(3600))
    }

    #[test]
    fn article_view_is_viewer_relative() {
        let app = conduit();
        let jake = app.users.register("jake@jake.jake", "jake", "jakejake").unwrap();
        let celeb = app.users.register("celeb@jake.jake", "celeb", "jakejake").unwrap();
        let article = app
            .articles
            .create(celeb.id, draft("How to train your dragon", &["dragons", "training"]))
            .unwrap();
        app.articles.favorite(jake.id, article.id).unwrap();
        app.profiles.follow(jake.id, celeb.id).unwrap();

        let seen_by_jake = app.article_view(article.clone(), Some(jake.id)).unwrap();
        assert_eq!(seen_by_jake.slug, "celeb-how-to-train-your-dragon");
        assert_eq!(seen_by_jake.tag_list, vec!["dragons", "training"]);
        assert!(seen_by_jake.favorited);
        assert_eq!(seen_by_jake.favorites_count, 1);
        assert!(seen_by_jake.author.following);

        let anonymous = app.article_view(article, None).unwrap();
        assert!(!anonymous.favorited);
        assert_eq!(anonymous.favorites_count, 1);
        assert!(!anonymous.author.following);
        assert_eq!(anonymous.author.username, "celeb");
    }

    #[test]
    fn feed_views_cover_followed_authors_only() {
        let app = conduit();
        let jake = app.users.register("jake@jake.jake", "jake", "jakejake").unwrap();
        let celeb = app.users.register("celeb@jake.jake", "celeb", "jakejake").unwrap();
        let other = app.users.register("other@jake.jake", "other", "jakejake").unwrap();
        app.articles.create(celeb.id, draft("One", &[])).unwrap();
        app.articles.create(other.id, draft("Two", &[])).unwrap();
        app.articles.create(celeb.id, draft("Three", &[])).unwrap();
        app.profiles.follow(jake.id, celeb.id).unwrap();

        let feed = app.feed_views(jake.id, 10, 0).unwrap();
        let titles: Vec<&str> = feed.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["Three", "One"]);
        assert!(feed.iter().all(|v| v.author.following));
    }

    #[test]
    fn comment_views_carry_author_profiles() {
        let app = conduit();
        let jake = app.users.register("jake@jake.jake", "jake", "jakejake").unwrap();
        let celeb = app.users.register("celeb@jake.jake", "celeb", "jakejake").unwrap();
        let article = app.articles.create(jake.id, draft("Hello", &[])).unwrap();
        app.articles.create_comment(article.id, celeb.id, "First!").unwrap();
        app.articles.create_comment(article.id, jake.id, "Welcome").unwrap();
        app.profiles.follow(jake.id, celeb.id).unwrap();

        let comments = app
            .articles
            .list_comments(&CommentFilter {
                article_id: Some(article.id),
            })
            .unwrap();
        let views = app.comment_views(comments, Some(jake.id)).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].body, "Welcome");
        assert_eq!(views[0].author.username, "jake");
        assert!(!views[0].author.following);
        assert_eq!(views[1].author.username, "celeb");
        assert!(views[1].author.following);
    }
}
