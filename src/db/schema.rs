diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        username -> Text,
        password_hash -> Text,
        bio -> Nullable<Text>,
        image -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    follows (id) {
        id -> Integer,
        follower_id -> Integer,
        followed_id -> Integer,
    }
}

diesel::table! {
    articles (id) {
        id -> Integer,
        author_id -> Integer,
        slug -> Text,
        title -> Text,
        description -> Text,
        body -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    article_tags (id) {
        id -> Integer,
        name -> Text,
    }
}

diesel::table! {
    article_article_tags (id) {
        id -> Integer,
        article_id -> Integer,
        article_tag_id -> Integer,
    }
}

diesel::table! {
    article_comments (id) {
        id -> Integer,
        article_id -> Integer,
        author_id -> Integer,
        body -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    article_favorites (id) {
        id -> Integer,
        user_id -> Integer,
        article_id -> Integer,
    }
}

diesel::joinable!(articles -> users (author_id));
diesel::joinable!(article_article_tags -> articles (article_id));
diesel::joinable!(article_article_tags -> article_tags (article_tag_id));
diesel::joinable!(article_comments -> articles (article_id));
diesel::joinable!(article_comments -> users (author_id));
diesel::joinable!(article_favorites -> articles (article_id));
diesel::joinable!(article_favorites -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    follows,
    articles,
    article_tags,
    article_article_tags,
    article_comments,
    article_favorites,
);
