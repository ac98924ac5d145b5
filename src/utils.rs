use chrono::{NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::Serializer;
use slug::slugify;

/// Canonical form shared by article slugs and tag names: lower-cased, with
/// whitespace and punctuation collapsed into single hyphens.
pub fn normalize(input: &str) -> String {
    slugify(input)
}

pub fn make_slug(author_username: &str, title: &str) -> String {
    normalize(&format!("{} {}", author_username, title))
}

pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn serialize_date<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = Utc
        .from_utc_datetime(date)
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    serializer.serialize_str(&s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_joins_author_and_title() {
        assert_eq!(make_slug("jake", "My Title"), "jake-my-title");
    }

    #[test]
    fn differently_cased_names_collide() {
        assert_eq!(normalize("Go"), "go");
        assert_eq!(normalize(" GO "), "go");
        assert_eq!(normalize("Rust, Async & Tokio!"), "rust-async-tokio");
    }

    #[test]
    fn blank_input_normalizes_to_empty() {
        assert_eq!(normalize("   "), "");
    }
}
