//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, CreateAuthor},
        book::{BookDetails, BookQuery, BookSummary, CreateBook, UpdateBook},
        category::{Category, CreateCategory},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<(Vec<BookSummary>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get a book with its unreturned borrow records
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        let book = self.repository.books.get_summary_by_id(id).await?;
        let borrow_records = self.repository.books.active_borrowers(id).await?;
        Ok(BookDetails {
            book,
            borrow_records,
        })
    }

    /// Create a new book (staff only at the API layer)
    pub async fn create_book(&self, book: CreateBook) -> AppResult<BookSummary> {
        if !self.repository.authors.exists(book.author_id).await? {
            return Err(AppError::BadRequest(format!(
                "Author with id {} does not exist",
                book.author_id
            )));
        }
        if !self.repository.categories.exists(book.category_id).await? {
            return Err(AppError::BadRequest(format!(
                "Category with id {} does not exist",
                book.category_id
            )));
        }
        if self.repository.books.isbn_exists(&book.isbn, None).await? {
            return Err(AppError::Conflict(
                "Book with this ISBN already exists".to_string(),
            ));
        }

        let created = self.repository.books.create(&book).await?;
        self.repository.books.get_summary_by_id(created.id).await
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i32, book: UpdateBook) -> AppResult<BookSummary> {
        self.repository.books.get_by_id(id).await?;

        if let Some(author_id) = book.author_id {
            if !self.repository.authors.exists(author_id).await? {
                return Err(AppError::BadRequest(format!(
                    "Author with id {} does not exist",
                    author_id
                )));
            }
        }
        if let Some(category_id) = book.category_id {
            if !self.repository.categories.exists(category_id).await? {
                return Err(AppError::BadRequest(format!(
                    "Category with id {} does not exist",
                    category_id
                )));
            }
        }

        self.repository.books.update(id, &book).await?;
        self.repository.books.get_summary_by_id(id).await
    }

    pub async fn list_authors(&self) -> AppResult<Vec<Author>> {
        self.repository.authors.list().await
    }

    pub async fn create_author(&self, author: CreateAuthor) -> AppResult<Author> {
        self.repository.authors.create(&author).await
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    pub async fn create_category(&self, category: CreateCategory) -> AppResult<Category> {
        self.repository.categories.create(&category).await
    }

    /// Database round-trip for the readiness probe
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
