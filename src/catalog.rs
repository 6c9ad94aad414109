//! SQLite-backed catalog implementation.
//!
//! Each pooled handle is its own `rusqlite::Connection` in WAL mode.
//! In-memory mode uses a shared-cache database kept alive by a keeper
//! connection, so every pooled handle sees the same data (and tests do
//! not need the filesystem).

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::{Connection, OpenFlags, params};

use biblio_service::error::ServiceError;
use biblio_service::store::{Catalog, StoreConnector};
use biblio_service::types::{BookRef, FileRef};

/// A catalog entry as inserted by hosts and admin tooling.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub book_id: String,
    pub title: String,
    pub author: String,
    pub category: String,
    pub file_id: String,
}

enum Source {
    File(PathBuf),
    /// Named shared-cache in-memory database. The keeper connection pins
    /// it for the catalog's lifetime.
    Memory {
        uri: String,
        _keeper: Mutex<Connection>,
    },
}

/// Store connector + query executor over an embedded SQLite catalog.
pub struct SqliteCatalog {
    source: Source,
}

static MEMORY_DB_SEQ: AtomicU64 = AtomicU64::new(0);

impl SqliteCatalog {
    /// Opens (or creates) a file-backed catalog and ensures its schema.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ServiceError> {
        let catalog = Self {
            source: Source::File(path.into()),
        };
        let mut conn = catalog.connect()?;
        catalog.ensure_schema(&mut conn)?;
        Ok(catalog)
    }

    /// Creates an ephemeral in-memory catalog.
    pub fn in_memory() -> Result<Self, ServiceError> {
        let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
        let uri = format!("file:biblio-mem-{seq}?mode=memory&cache=shared");
        let keeper = open_connection(&uri)?;
        let catalog = Self {
            source: Source::Memory {
                uri,
                _keeper: Mutex::new(keeper),
            },
        };
        let mut conn = catalog.connect()?;
        catalog.ensure_schema(&mut conn)?;
        Ok(catalog)
    }

    fn ensure_schema(&self, conn: &mut Connection) -> Result<(), ServiceError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS books (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                book_id TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                author TEXT DEFAULT 'Unknown',
                category TEXT DEFAULT 'General',
                file_id TEXT NOT NULL,
                is_available INTEGER DEFAULT 1,
                download_count INTEGER DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
            CREATE INDEX IF NOT EXISTS idx_books_author ON books(author);
            CREATE INDEX IF NOT EXISTS idx_books_category ON books(category);",
        )
        .map_err(internal)
    }

    /// Inserts a book, ignoring duplicates by `book_id`.
    pub fn add_book(&self, conn: &mut Connection, book: &NewBook) -> Result<(), ServiceError> {
        conn.execute(
            "INSERT OR IGNORE INTO books (book_id, title, author, category, file_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                book.book_id,
                book.title,
                book.author,
                book.category,
                book.file_id
            ],
        )
        .map(|_| ())
        .map_err(internal)
    }

    /// Number of available books.
    pub fn book_count(&self, conn: &mut Connection) -> Result<u64, ServiceError> {
        conn.query_row(
            "SELECT COUNT(*) FROM books WHERE is_available = 1",
            [],
            |row| row.get(0),
        )
        .map_err(internal)
    }

    /// Seeds a small demo catalog if the store is empty, so a fresh
    /// process is immediately searchable.
    pub fn seed_demo(&self, conn: &mut Connection) -> Result<usize, ServiceError> {
        if self.book_count(conn)? > 0 {
            return Ok(0);
        }

        let samples = [
            ("demo-1", "Rust Programming Guide", "Jo Harper", "Programming"),
            ("demo-2", "Advanced Async Patterns", "Ada Moreno", "Programming"),
            ("demo-3", "Embedded Databases Explained", "Kim Osei", "Databases"),
            ("demo-4", "The Pagination Cookbook", "Lena Vogel", "Programming"),
        ];
        for (book_id, title, author, category) in samples {
            self.add_book(
                conn,
                &NewBook {
                    book_id: book_id.to_owned(),
                    title: title.to_owned(),
                    author: author.to_owned(),
                    category: category.to_owned(),
                    file_id: format!("file-{book_id}"),
                },
            )?;
        }
        tracing::info!(seeded = samples.len(), "seeded demo catalog");
        Ok(samples.len())
    }
}

impl StoreConnector for SqliteCatalog {
    type Handle = Connection;

    fn connect(&self) -> Result<Self::Handle, ServiceError> {
        match &self.source {
            Source::File(path) => {
                let conn = Connection::open(path)
                    .map_err(|e| ServiceError::Connection(e.to_string()))?;
                // WAL lets pooled readers proceed alongside a writer.
                conn.pragma_update(None, "journal_mode", "WAL")
                    .map_err(|e| ServiceError::Connection(e.to_string()))?;
                conn.pragma_update(None, "synchronous", "NORMAL")
                    .map_err(|e| ServiceError::Connection(e.to_string()))?;
                Ok(conn)
            }
            Source::Memory { uri, .. } => open_connection(uri),
        }
    }
}

impl Catalog for SqliteCatalog {
    fn search(
        &self,
        conn: &mut Connection,
        query: &str,
        limit: usize,
    ) -> Result<Vec<BookRef>, ServiceError> {
        let pattern = format!("%{}%", query.trim());
        let mut stmt = conn
            .prepare_cached(
                "SELECT book_id, title, author FROM books
                 WHERE (title LIKE ?1 OR author LIKE ?1 OR category LIKE ?1)
                 AND is_available = 1
                 ORDER BY download_count DESC, id ASC
                 LIMIT ?2",
            )
            .map_err(internal)?;

        let rows = stmt
            .query_map(params![pattern, limit as i64], |row| {
                Ok(BookRef {
                    book_id: row.get(0)?,
                    title: row.get(1)?,
                    author: row.get(2)?,
                })
            })
            .map_err(internal)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(internal)
    }

    fn fetch_file(
        &self,
        conn: &mut Connection,
        book_id: &str,
    ) -> Result<Option<FileRef>, ServiceError> {
        let file_id: Option<String> = conn
            .query_row(
                "SELECT file_id FROM books WHERE book_id = ?1 AND is_available = 1",
                params![book_id],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(internal(other)),
            })?;

        let Some(file_id) = file_id else {
            return Ok(None);
        };

        conn.execute(
            "UPDATE books SET download_count = download_count + 1 WHERE book_id = ?1",
            params![book_id],
        )
        .map_err(internal)?;

        Ok(Some(FileRef(file_id)))
    }
}

fn open_connection(uri: &str) -> Result<Connection, ServiceError> {
    Connection::open_with_flags(
        uri,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ServiceError::Connection(e.to_string()))
}

fn internal(e: rusqlite::Error) -> ServiceError {
    ServiceError::Internal(e.to_string())
}
