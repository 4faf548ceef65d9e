//! In-memory store implementing every repository trait.
//!
//! The whole state sits behind a single async mutex and each operation holds it
//! from first read to last write, so loan operations are serializable.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult, LoanError},
    models::{Book, BookInput, BookLoan, BookPatch, LoanDetails, Role, User},
};

use super::{BookRepository, LoanRepository, UserRepository};

#[derive(Default)]
struct MemoryState {
    books: BTreeMap<i32, Book>,
    loans: BTreeMap<i32, BookLoan>,
    users: BTreeMap<i32, User>,
    next_book_id: i32,
    next_loan_id: i32,
    next_user_id: i32,
}

impl MemoryState {
    fn book(&self, id: i32) -> AppResult<&Book> {
        self.books
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn details(&self, loan: &BookLoan) -> AppResult<LoanDetails> {
        let book = self.book(loan.book_id)?;
        Ok(LoanDetails {
            id: loan.id,
            book_id: loan.book_id,
            book_title: book.title.clone(),
            book_author: book.author.clone(),
            loan_date: loan.loan_date,
            return_date: loan.return_date,
        })
    }

    fn open_loan_id(&self, user_id: i32, book_id: i32) -> Option<i32> {
        self.loans
            .values()
            .find(|l| l.user_id == user_id && l.book_id == book_id && l.is_open())
            .map(|l| l.id)
    }
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        let state = self.state.lock().await;
        state.book(id).cloned()
    }

    async fn create(&self, book: &BookInput) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        let id = next_id(&mut state.next_book_id);
        let created = Book {
            id,
            title: book.title.clone(),
            author: book.author.clone(),
            abstract_text: book.abstract_text.clone(),
            publication_year: book.publication_year,
            stock: book.stock,
        };
        state.books.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, patch: &BookPatch) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        let book = state
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;
        patch.apply(book);
        Ok(book.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.books.remove(&id).is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        state.loans.retain(|_, loan| loan.book_id != id);
        Ok(())
    }
}

#[async_trait]
impl LoanRepository for MemoryStore {
    async fn latest_per_book(&self, user_id: i32) -> AppResult<Vec<LoanDetails>> {
        let state = self.state.lock().await;

        let mut latest: BTreeMap<i32, &BookLoan> = BTreeMap::new();
        for loan in state.loans.values().filter(|l| l.user_id == user_id) {
            let newer = match latest.get(&loan.book_id) {
                Some(current) => (loan.loan_date, loan.id) > (current.loan_date, current.id),
                None => true,
            };
            if newer {
                latest.insert(loan.book_id, loan);
            }
        }

        let mut loans: Vec<&BookLoan> = latest.into_values().collect();
        loans.sort_by(|a, b| (b.loan_date, b.id).cmp(&(a.loan_date, a.id)));
        loans.into_iter().map(|l| state.details(l)).collect()
    }

    async fn get_for_user(&self, user_id: i32, loan_id: i32) -> AppResult<LoanDetails> {
        let state = self.state.lock().await;
        let loan = state
            .loans
            .get(&loan_id)
            .filter(|l| l.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))?;
        state.details(loan)
    }

    async fn open(&self, user_id: i32, book_id: i32, today: NaiveDate) -> AppResult<LoanDetails> {
        let mut state = self.state.lock().await;

        if state.book(book_id)?.stock < 1 {
            return Err(LoanError::Unavailable.into());
        }
        if state.open_loan_id(user_id, book_id).is_some() {
            return Err(LoanError::AlreadyBorrowed.into());
        }

        let id = next_id(&mut state.next_loan_id);
        let loan = BookLoan {
            id,
            user_id,
            book_id,
            loan_date: today,
            return_date: None,
        };
        state.loans.insert(id, loan.clone());
        if let Some(book) = state.books.get_mut(&book_id) {
            book.stock -= 1;
        }

        state.details(&loan)
    }

    async fn close(&self, user_id: i32, book_id: i32, today: NaiveDate) -> AppResult<LoanDetails> {
        let mut state = self.state.lock().await;

        let loan_id = state
            .open_loan_id(user_id, book_id)
            .ok_or(LoanError::NothingToReturn)?;

        let loan = match state.loans.get_mut(&loan_id) {
            Some(loan) => {
                loan.return_date = Some(today);
                loan.clone()
            }
            None => return Err(LoanError::NothingToReturn.into()),
        };
        if let Some(book) = state.books.get_mut(&book_id) {
            book.stock += 1;
        }

        state.details(&loan)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let state = self.state.lock().await;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn create(&self, username: &str, password_hash: &str, role: Role) -> AppResult<User> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict("User already exist.".to_string()));
        }

        let id = next_id(&mut state.next_user_id);
        let user = User {
            id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }
}
