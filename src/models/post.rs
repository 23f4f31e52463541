//! Post data structures.

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::models::LocaleConfig;

/// A post as returned by the remote listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    /// Stable identifier assigned by the remote source
    pub id: i64,

    /// Post title, may be absent
    #[serde(default)]
    pub title: Option<String>,

    /// Post body, may be absent
    #[serde(default)]
    pub body: Option<String>,
}

impl Post {
    /// Title for display, falling back to the locale placeholder.
    pub fn display_title<'a>(&'a self, locale: &'a LocaleConfig) -> &'a str {
        self.title
            .as_deref()
            .unwrap_or(locale.messages.missing_title.as_str())
    }

    /// Body for display, falling back to the locale placeholder.
    pub fn display_body<'a>(&'a self, locale: &'a LocaleConfig) -> &'a str {
        self.body
            .as_deref()
            .unwrap_or(locale.messages.missing_body.as_str())
    }

    /// First `max` graphemes of the body, with an ellipsis when cut.
    pub fn preview(&self, locale: &LocaleConfig, max: usize) -> String {
        let body = self.display_body(locale);
        let graphemes: Vec<&str> = body.graphemes(true).collect();
        if graphemes.len() <= max {
            return body.replace('\n', " ");
        }
        let mut cut = graphemes[..max].concat().replace('\n', " ");
        cut.push('…');
        cut
    }
}

/// A post saved as favorite in the local store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct FavoritePost {
    /// Mirrors `Post::id`
    pub id: i64,

    /// Title, empty when the post had none
    pub title: String,

    /// Body, empty when the post had none
    pub body: String,
}

impl FavoritePost {
    /// Convert back into a displayable post.
    pub fn to_post(&self) -> Post {
        Post {
            id: self.id,
            title: Some(self.title.clone()),
            body: Some(self.body.clone()),
        }
    }
}

impl From<&Post> for FavoritePost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone().unwrap_or_default(),
            body: post.body.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_missing_fields() {
        let posts: Vec<Post> =
            serde_json::from_str(r#"[{"id":1,"title":"a"},{"id":2,"title":null,"body":"b"}]"#)
                .unwrap();
        assert_eq!(posts[0].body, None);
        assert_eq!(posts[1].title, None);
        assert_eq!(posts[1].body.as_deref(), Some("b"));
    }

    #[test]
    fn test_favorite_coerces_missing_fields() {
        let post = Post {
            id: 7,
            title: None,
            body: Some("body".to_string()),
        };
        let favorite = FavoritePost::from(&post);
        assert_eq!(favorite.title, "");
        assert_eq!(favorite.body, "body");
        assert_eq!(favorite.to_post().title.as_deref(), Some(""));
    }

    #[test]
    fn test_display_placeholders() {
        let locale = LocaleConfig::default();
        let post = Post {
            id: 1,
            title: None,
            body: None,
        };
        assert_eq!(post.display_title(&locale), locale.messages.missing_title);
        assert_eq!(post.display_body(&locale), locale.messages.missing_body);
    }

    #[test]
    fn test_preview_cuts_on_graphemes() {
        let locale = LocaleConfig::default();
        let post = Post {
            id: 1,
            title: None,
            body: Some("héllo\nwörld".to_string()),
        };
        assert_eq!(post.preview(&locale, 5), "héllo…");
        assert_eq!(post.preview(&locale, 50), "héllo wörld");
    }
}
