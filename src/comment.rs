use crate::article::{Article, ArticleService};
use crate::db::schema::article_comments;
use crate::types::{not_found, Result};
use crate::users::User;
use crate::utils::now;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::{delete as diesel_delete, insert_into};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Associations, Serialize)]
#[diesel(belongs_to(Article))]
#[diesel(table_name = article_comments)]
pub struct Comment {
    pub id: i32,
    pub article_id: i32,
    pub author_id: i32,
    pub body: String,
    #[serde(serialize_with = "crate::utils::serialize_date")]
    pub created_at: NaiveDateTime,
    #[serde(serialize_with = "crate::utils::serialize_date")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = article_comments)]
struct NewComment<'a> {
    article_id: i32,
    author_id: i32,
    body: &'a str,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

#[derive(Debug, Default, Clone)]
pub struct CommentFilter {
    pub article_id: Option<i32>,
}

impl ArticleService {
    /// Any existing user may comment on any existing article.
    pub fn create_comment(&self, article_id: i32, author_id: i32, body: &str) -> Result<Comment> {
        info!(article_id, author_id, "creating comment");
        let mut conn = self.connection()?;
        let article = Article::load_by_id(article_id, &mut conn)?;
        let author = User::load_by_id(author_id, &mut conn)?;
        let created = now();
        let new_comment = NewComment {
            article_id: article.id,
            author_id: author.id,
            body,
            created_at: created,
            updated_at: created,
        };
        let comment = insert_into(article_comments::table)
            .values(&new_comment)
            .returning(Comment::as_returning())
            .get_result(&mut conn)?;
        Ok(comment)
    }

    pub fn get_comment_by_id(&self, comment_id: i32) -> Result<Comment> {
        article_comments::table
            .find(comment_id)
            .select(Comment::as_select())
            .first(&mut *self.connection()?)
            .optional()?
            .ok_or_else(|| not_found(format!("Comment {}", comment_id)))
    }

    /// Newest first.
    pub fn list_comments(&self, filter: &CommentFilter) -> Result<Vec<Comment>> {
        let mut query = article_comments::table
            .select(Comment::as_select())
            .order((
                article_comments::created_at.desc(),
                article_comments::id.desc(),
            ))
            .into_boxed();
        if let Some(article) = filter.article_id {
            query = query.filter(article_comments::article_id.eq(article));
        }
        Ok(query.load(&mut *self.connection()?)?)
    }

    pub fn delete_comment(&self, comment_id: i32) -> Result<()> {
        info!(comment_id, "deleting comment");
        let deleted = diesel_delete(article_comments::table.find(comment_id))
            .execute(&mut *self.connection()?)?;
        if deleted == 0 {
            return Err(not_found(format!("Comment {}", comment_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::tests::{draft, fixture};
    use crate::types::ErrorKind;

    #[test]
    fn comments_list_newest_first_per_article() {
        let f = fixture();
        let jake = f.users.register("jake@jake.jake", "jake", "jakejake").unwrap();
        let celeb = f.users.register("celeb@jake.jake", "celeb", "jakejake").unwrap();
        let first = f.articles.create(jake.id, draft("First", &[])).unwrap();
        let second = f.articles.create(jake.id, draft("Second", &[])).unwrap();

        let a = f.articles.create_comment(first.id, celeb.id, "Nice").unwrap();
        let b = f.articles.create_comment(first.id, jake.id, "Thanks").unwrap();
        let c = f.articles.create_comment(second.id, celeb.id, "Again").unwrap();
        assert_eq!(a.author_id, celeb.id);
        assert_eq!(f.articles.get_comment_by_id(b.id).unwrap(), b);

        let on_first = f
            .articles
            .list_comments(&CommentFilter {
                article_id: Some(first.id),
            })
            .unwrap();
        let ids: Vec<i32> = on_first.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);

        let everywhere = f.articles.list_comments(&CommentFilter::default()).unwrap();
        assert_eq!(everywhere.len(), 3);
        assert_eq!(everywhere[0].id, c.id);
    }

    #[test]
    fn comment_needs_existing_article_and_author() {
        let f = fixture();
        let jake = f.users.register("jake@jake.jake", "jake", "jakejake").unwrap();
        let article = f.articles.create(jake.id, draft("First", &[])).unwrap();
        let err = f
            .articles
            .create_comment(article.id + 1, jake.id, "Lost")
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound(_)));
        let err = f
            .articles
            .create_comment(article.id, jake.id + 1, "Ghost")
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound(_)));
    }

    #[test]
    fn delete_comment_reports_missing_rows() {
        let f = fixture();
        let jake = f.users.register("jake@jake.jake", "jake", "jakejake").unwrap();
        let article = f.articles.create(jake.id, draft("First", &[])).unwrap();
        let comment = f.articles.create_comment(article.id, jake.id, "Bye").unwrap();

        f.articles.delete_comment(comment.id).unwrap();
        let err = f.articles.get_comment_by_id(comment.id).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound(_)));
        let err = f.articles.delete_comment(comment.id).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound(_)));
    }
}
