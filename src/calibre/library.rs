use crate::calibre::{CalibreBook, CalibreFilter, Language, Page, Tag, TitleTimeSort};
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, ToSql, named_params, params};
use std::path::Path;
use std::sync::Arc;

/// File name of the Calibre metadata database inside a library directory.
pub const METADATA_DB: &str = "metadata.db";

/// SQL function folding case over all of Unicode; SQLite's `lower` only folds ASCII.
const FOLD_FN: &str = "unicode_lower";

const BOOK_COLUMNS: &str = "id, title, sort, author_sort, timestamp, pubdate, last_modified, \
                            series_index, path, uuid, has_cover";

/// Read-only access to a Calibre library.
#[derive(Clone)]
pub struct CalibreLibrary {
    conn: Arc<Mutex<Connection>>,
}

impl CalibreLibrary {
    /// Open the `metadata.db` of the library at `dir`, read-only.
    pub fn open(dir: &Path) -> Result<Self> {
        if dir.as_os_str().is_empty() {
            return Err(AppError::NoCalibrePath);
        }

        let db_path = dir.join(METADATA_DB);
        if !db_path.is_file() {
            return Err(AppError::BadCalibreDb(format!(
                "{} not found",
                db_path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| AppError::BadCalibreDb(format!("Failed to open {}: {}", db_path.display(), e)))?;

        let library = Self::from_connection(conn)?;
        tracing::info!(path = %db_path.display(), "Opened Calibre library");
        Ok(library)
    }

    /// Wrap an existing connection to a Calibre database.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        let has_books: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = 'books'",
                [],
                |row| row.get(0),
            )
            .map_err(|e| AppError::BadCalibreDb(format!("Failed to read schema: {}", e)))?;

        if !has_books {
            return Err(AppError::BadCalibreDb(
                "no books table, not a Calibre library".to_string(),
            ));
        }

        conn.create_scalar_function(
            FOLD_FN,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|v| v.to_lowercase()))
            },
        )
        .map_err(|e| AppError::BadCalibreDb(format!("Failed to register {}: {}", FOLD_FN, e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // ========== BOOK QUERIES ==========

    /// Count the books visible through `filter`.
    pub fn count_books(&self, filter: &CalibreFilter) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", filter.books_filter());
        self.count(&sql, filter, &[])
    }

    /// One page of books ordered by title sort key. `page` is zero-based.
    pub fn books_page(
        &self,
        filter: &CalibreFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<CalibreBook>> {
        let (limit, offset) = limit_offset(page, page_size)?;
        let source = filter.books_filter();
        tracing::debug!(%source, page, page_size, "Listing books");

        let total = self.count(&format!("SELECT COUNT(*) FROM {source}"), filter, &[])?;
        let entries = self.query_books(
            &format!(
                "SELECT {BOOK_COLUMNS} FROM {source} ORDER BY sort LIMIT :limit OFFSET :offset"
            ),
            filter,
            named_params! { ":limit": limit, ":offset": offset },
        )?;

        Ok(Page::new(entries, page, page_size, total))
    }

    /// The most recent books according to `sort_by`.
    pub fn recent_books(
        &self,
        filter: &CalibreFilter,
        sort_by: TitleTimeSort,
        limit: u32,
    ) -> Result<Vec<CalibreBook>> {
        let source = filter.books_filter();
        tracing::debug!(%source, column = sort_by.column(), limit, "Listing recent books");

        let limit = i64::from(limit);
        self.query_books(
            &format!(
                "SELECT {BOOK_COLUMNS} FROM {source} ORDER BY {} DESC LIMIT :limit",
                sort_by.column()
            ),
            filter,
            named_params! { ":limit": limit },
        )
    }

    /// Case-insensitive title search.
    pub fn search_books(
        &self,
        filter: &CalibreFilter,
        term: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Page<CalibreBook>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(AppError::BadInput("empty search term".to_string()));
        }
        let (limit, offset) = limit_offset(page, page_size)?;
        let pattern = like_pattern(term);
        let source = filter.books_filter();
        tracing::debug!(%source, term, page, "Searching books");

        let condition = format!("{FOLD_FN}(title) LIKE :search ESCAPE '\\'");
        let total = self.count(
            &format!("SELECT COUNT(*) FROM {source} WHERE {condition}"),
            filter,
            named_params! { ":search": pattern },
        )?;
        let entries = self.query_books(
            &format!(
                "SELECT {BOOK_COLUMNS} FROM {source} WHERE {condition} \
                 ORDER BY sort LIMIT :limit OFFSET :offset"
            ),
            filter,
            named_params! { ":search": pattern, ":limit": limit, ":offset": offset },
        )?;

        Ok(Page::new(entries, page, page_size, total))
    }

    /// Get a book by ID. Books hidden by `filter` are not found.
    pub fn book(&self, filter: &CalibreFilter, id: i64) -> Result<Option<CalibreBook>> {
        let sql = format!(
            "SELECT {BOOK_COLUMNS} FROM {} WHERE id = :id",
            filter.books_filter()
        );
        let bound = filter.params();
        let mut named = bind(&bound);
        named.push((":id", &id as &dyn ToSql));

        let conn = self.conn.lock();
        let book = conn
            .query_row(&sql, named.as_slice(), Self::row_to_book)
            .optional()?;
        Ok(book)
    }

    // ========== LANGUAGE AND TAG LOOKUPS ==========

    /// All languages, ordered by code.
    pub fn languages(&self) -> Result<Vec<Language>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, lang_code FROM languages ORDER BY lang_code")?;

        let languages = stmt
            .query_map([], |row| {
                Ok(Language {
                    id: row.get(0)?,
                    lang_code: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(languages)
    }

    /// All tags, ordered by name.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name")?;

        let tags = stmt
            .query_map([], |row| {
                Ok(Tag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(tags)
    }

    /// Resolve a language code (e.g. "eng") to its selector ID.
    pub fn language_id(&self, lang_code: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let id = conn
            .query_row(
                "SELECT id FROM languages WHERE lang_code = ?1",
                params![lang_code],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Resolve a tag name to its selector ID, ignoring case.
    pub fn tag_id(&self, name: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let id = conn
            .query_row(
                &format!("SELECT id FROM tags WHERE {FOLD_FN}(name) = {FOLD_FN}(?1)"),
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    // ========== HELPERS ==========

    fn count(
        &self,
        sql: &str,
        filter: &CalibreFilter,
        extra: &[(&str, &dyn ToSql)],
    ) -> Result<u64> {
        let bound = filter.params();
        let mut named = bind(&bound);
        named.extend_from_slice(extra);

        let conn = self.conn.lock();
        let count: i64 = conn.query_row(sql, named.as_slice(), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn query_books(
        &self,
        sql: &str,
        filter: &CalibreFilter,
        extra: &[(&str, &dyn ToSql)],
    ) -> Result<Vec<CalibreBook>> {
        let bound = filter.params();
        let mut named = bind(&bound);
        named.extend_from_slice(extra);

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let books = stmt
            .query_map(named.as_slice(), Self::row_to_book)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(books)
    }

    fn row_to_book(row: &Row<'_>) -> rusqlite::Result<CalibreBook> {
        Ok(CalibreBook {
            id: row.get(0)?,
            title: row.get(1)?,
            sort: row.get(2)?,
            author_sort: row.get(3)?,
            timestamp: row.get(4)?,
            pubdate: row.get(5)?,
            last_modified: row.get(6)?,
            series_index: row.get(7)?,
            path: row.get(8)?,
            uuid: row.get(9)?,
            has_cover: row.get::<_, Option<bool>>(10)?.unwrap_or(false),
        })
    }
}

/// Named parameters for the filter's placeholders.
fn bind<'a>(bound: &'a [(&'static str, i64)]) -> Vec<(&'a str, &'a dyn ToSql)> {
    bound
        .iter()
        .map(|(name, value)| (*name, value as &dyn ToSql))
        .collect()
}

fn limit_offset(page: u32, page_size: u32) -> Result<(i64, i64)> {
    if page_size == 0 {
        return Err(AppError::BadPageSize(page_size));
    }
    let limit = i64::from(page_size);
    Ok((limit, i64::from(page) * limit))
}

/// Case-folded `%term%` pattern with LIKE wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
