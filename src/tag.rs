use crate::article::ArticleService;
use crate::db::schema::{article_article_tags, article_tags};
use crate::types::Result;
use crate::utils::normalize;
use diesel::insert_into;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = article_tags)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Default, Clone)]
pub struct TagFilter {
    pub article_id: Option<i32>,
}

impl Tag {
    /// Returns the vocabulary entry for an already normalized name, creating
    /// it on first use.
    pub(crate) fn find_or_create(tag_name: &str, connection: &mut SqliteConnection) -> Result<Tag> {
        use crate::db::schema::article_tags::dsl::*;
        let created = insert_into(article_tags)
            .values(name.eq(tag_name))
            .on_conflict(name)
            .do_nothing()
            .execute(connection)?;
        if created > 0 {
            info!(name = tag_name, "created tag");
        }
        Ok(article_tags
            .filter(name.eq(tag_name))
            .select(Tag::as_select())
            .first(connection)?)
    }

    pub(crate) fn link(
        article: i32,
        tag: i32,
        connection: &mut SqliteConnection,
    ) -> Result<()> {
        use crate::db::schema::article_article_tags::dsl::*;
        insert_into(article_article_tags)
            .values((article_id.eq(article), article_tag_id.eq(tag)))
            .on_conflict((article_id, article_tag_id))
            .do_nothing()
            .execute(connection)?;
        Ok(())
    }

    pub(crate) fn load(filter: &TagFilter, connection: &mut SqliteConnection) -> Result<Vec<Tag>> {
        let mut query = article_tags::table
            .select(Tag::as_select())
            .order(article_tags::name.asc())
            .into_boxed();
        if let Some(article) = filter.article_id {
            let linked = article_article_tags::table
                .filter(article_article_tags::article_id.eq(article))
                .select(article_article_tags::article_tag_id)
                .load::<i32>(connection)?;
            if linked.is_empty() {
                return Ok(Vec::new());
            }
            query = query.filter(article_tags::id.eq_any(linked));
        }
        Ok(query.load(connection)?)
    }
}

/// Normalized, de-duplicated tag names in first-seen order. Names with no
/// word characters are dropped.
pub fn normalize_tags<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(names.len());
    for raw in names {
        let tag = normalize(raw.as_ref());
        if !tag.is_empty() && !normalized.contains(&tag) {
            normalized.push(tag);
        }
    }
    normalized
}

impl ArticleService {
    /// All tags alphabetically, or only those linked to one article.
    pub fn list_tags(&self, filter: &TagFilter) -> Result<Vec<Tag>> {
        Tag::load(filter, &mut *self.connection()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_collapse_to_one_canonical_form() {
        assert_eq!(normalize_tags(&["Go", "go", " GO "]), vec!["go"]);
    }

    #[test]
    fn order_is_first_seen_and_blanks_are_dropped() {
        assert_eq!(
            normalize_tags(&["Rust", "", "dragons", "  ", "RUST", "Training Day"]),
            vec!["rust", "dragons", "training-day"]
        );
    }
}
