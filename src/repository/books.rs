//! Books repository for database operations

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookBrief, BookQuery, BookSummary, CreateBook, UpdateBook},
        borrow::{ActiveBorrower, BorrowStatus},
        user::BorrowerSummary,
    },
};

/// Shared SELECT joining the author and category names into a summary row
const SUMMARY_SELECT: &str = r#"
    SELECT b.id, b.title, b.isbn, a.name AS author, c.name AS category,
           b.published_year, b.description, b.total_copies, b.available_copies
    FROM books b
    JOIN authors a ON a.id = b.author_id
    JOIN categories c ON c.id = b.category_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book row by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get book summary (author/category names joined in) by ID
    pub async fn get_summary_by_id(&self, id: i32) -> AppResult<BookSummary> {
        let query = format!("{} WHERE b.id = $1", SUMMARY_SELECT);
        sqlx::query_as::<_, BookSummary>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Get the title/author/isbn fields embedded in borrow responses
    pub async fn get_brief(&self, id: i32) -> AppResult<BookBrief> {
        let query = r#"
            SELECT b.title, a.name AS author, b.isbn
            FROM books b
            JOIN authors a ON a.id = b.author_id
            WHERE b.id = $1
        "#;
        sqlx::query_as::<_, BookBrief>(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Check if ISBN already exists
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Search books with filters and pagination, ordered by title
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookSummary>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).clamp(1, 100);
        let offset = (page - 1) * limit;

        let mut conditions = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(ref category) = query.category {
            params.push(format!("%{}%", category.to_lowercase()));
            conditions.push(format!("LOWER(c.name) LIKE ${}", params.len()));
        }

        if let Some(ref author) = query.author {
            params.push(format!("%{}%", author.to_lowercase()));
            conditions.push(format!("LOWER(a.name) LIKE ${}", params.len()));
        }

        if let Some(ref search) = query.search {
            params.push(format!("%{}%", search.to_lowercase()));
            let idx = params.len();
            conditions.push(format!(
                "(LOWER(b.title) LIKE ${idx} OR LOWER(a.name) LIKE ${idx} OR LOWER(b.description) LIKE ${idx})"
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        // Count total
        let count_query = format!(
            r#"
            SELECT COUNT(*) FROM books b
            JOIN authors a ON a.id = b.author_id
            JOIN categories c ON c.id = b.category_id
            {}
            "#,
            where_clause
        );

        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        for param in &params {
            count_builder = count_builder.bind(param);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        // Fetch the page
        let select_query = format!(
            "{} {} ORDER BY b.title LIMIT {} OFFSET {}",
            SUMMARY_SELECT, where_clause, limit, offset
        );

        let mut select_builder = sqlx::query_as::<_, BookSummary>(&select_query);
        for param in &params {
            select_builder = select_builder.bind(param);
        }
        let books = select_builder.fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Unreturned borrow records for a book, with borrower identities
    pub async fn active_borrowers(&self, book_id: i32) -> AppResult<Vec<ActiveBorrower>> {
        let rows = sqlx::query(
            r#"
            SELECT br.id, br.borrowed_at, br.due_date,
                   u.first_name, u.last_name, u.email
            FROM borrow_records br
            JOIN users u ON u.id = br.user_id
            WHERE br.book_id = $1 AND br.status != 'RETURNED'
            ORDER BY br.borrowed_at
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();

        Ok(rows
            .iter()
            .map(|row| {
                let due_date: chrono::DateTime<Utc> = row.get("due_date");
                let status = if due_date < now {
                    BorrowStatus::Overdue
                } else {
                    BorrowStatus::Active
                };
                ActiveBorrower {
                    id: row.get("id"),
                    borrowed_at: row.get("borrowed_at"),
                    due_date,
                    status,
                    user: BorrowerSummary {
                        first_name: row.get("first_name"),
                        last_name: row.get("last_name"),
                        email: row.get("email"),
                    },
                }
            })
            .collect())
    }

    /// Create a new book; the available count starts at the total
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let total_copies = book.total_copies.unwrap_or(1);

        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, isbn, author_id, category_id, published_year,
                description, total_copies, available_copies
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.author_id)
        .bind(book.category_id)
        .bind(book.published_year)
        .bind(&book.description)
        .bind(total_copies)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update bibliographic fields and copy counts
    pub async fn update(&self, id: i32, book: &UpdateBook) -> AppResult<Book> {
        let now = Utc::now();

        let mut sets = vec!["updated_at = $1".to_string()];
        let mut param_idx = 2;

        macro_rules! add_field {
            ($field:expr, $name:expr) => {
                if $field.is_some() {
                    sets.push(format!("{} = ${}", $name, param_idx));
                    param_idx += 1;
                }
            };
        }

        add_field!(book.title, "title");
        add_field!(book.author_id, "author_id");
        add_field!(book.category_id, "category_id");
        add_field!(book.published_year, "published_year");
        add_field!(book.description, "description");
        add_field!(book.total_copies, "total_copies");
        add_field!(book.available_copies, "available_copies");

        let query = format!(
            "UPDATE books SET {} WHERE id = ${}",
            sets.join(", "),
            param_idx
        );

        let mut builder = sqlx::query(&query).bind(now);

        macro_rules! bind_field {
            ($field:expr) => {
                if let Some(ref val) = $field {
                    builder = builder.bind(val);
                }
            };
        }

        bind_field!(book.title);
        bind_field!(book.author_id);
        bind_field!(book.category_id);
        bind_field!(book.published_year);
        bind_field!(book.description);
        bind_field!(book.total_copies);
        bind_field!(book.available_copies);

        builder.bind(id).execute(&self.pool).await?;

        self.get_by_id(id).await
    }
}
