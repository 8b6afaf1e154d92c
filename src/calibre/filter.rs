//! Language and tag restrictions over the Calibre `books` table.
//!
//! A [`CalibreFilter`] turns two optional selectors into a SQL source that
//! can replace the bare `books` table name in any catalog query. Selector
//! values are never written into the SQL text: the expression references
//! the named placeholders [`LANG_PARAM`] and [`TAG_PARAM`], and
//! [`CalibreFilter::params`] yields the values to bind for exactly the
//! placeholders that appear.
//!
//! Note that a tag selector *hides* the books carrying that tag.

use std::borrow::Cow;

/// Base table every filter expression stands in for.
pub const BOOKS_TABLE: &str = "books";

/// Placeholder bound to the language id.
pub const LANG_PARAM: &str = ":lang";

/// Placeholder bound to the tag id.
pub const TAG_PARAM: &str = ":tag";

const LANG_JOIN: &str = "books b left join books_languages_link bll on b.id=bll.book";

/// Restriction of the catalog to one language and/or away from one tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CalibreFilter {
    lang: Option<i64>,
    tag: Option<i64>,
}

impl CalibreFilter {
    /// Create a filter from optional language and tag ids.
    pub fn new(lang: Option<i64>, tag: Option<i64>) -> Self {
        Self { lang, tag }
    }

    /// Filter that keeps every book.
    pub fn none() -> Self {
        Self::default()
    }

    /// Language id, if restricted by language.
    pub fn lang(&self) -> Option<i64> {
        self.lang
    }

    /// Tag id, if restricted by tag.
    pub fn tag(&self) -> Option<i64> {
        self.tag
    }

    /// True when no selector is set.
    pub fn is_empty(&self) -> bool {
        self.lang.is_none() && self.tag.is_none()
    }

    /// SQL source to use in place of the `books` table.
    pub fn books_filter(&self) -> Cow<'static, str> {
        let tag_cond = || {
            format!(
                "not exists (select * from books_tags_link btl where b.id=btl.book and tag={TAG_PARAM})"
            )
        };

        match (self.lang, self.tag) {
            (None, None) => Cow::Borrowed(BOOKS_TABLE),
            (Some(_), None) => {
                Cow::Owned(format!("(select * from {LANG_JOIN} where lang_code={LANG_PARAM})"))
            }
            (None, Some(_)) => Cow::Owned(format!("(select * from books b where {})", tag_cond())),
            (Some(_), Some(_)) => Cow::Owned(format!(
                "(select * from ({LANG_JOIN}) where lang_code={LANG_PARAM} and {})",
                tag_cond()
            )),
        }
    }

    /// Named bindings for the placeholders used by [`Self::books_filter`].
    pub fn params(&self) -> Vec<(&'static str, i64)> {
        let mut params = Vec::with_capacity(2);
        if let Some(lang) = self.lang {
            params.push((LANG_PARAM, lang));
        }
        if let Some(tag) = self.tag {
            params.push((TAG_PARAM, tag));
        }
        params
    }
}

/// Compose the `books` source for the given selectors.
pub fn compose(lang: Option<i64>, tag: Option<i64>) -> Cow<'static, str> {
    CalibreFilter::new(lang, tag).books_filter()
}
