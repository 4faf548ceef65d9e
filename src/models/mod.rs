//! Data models for the lending server

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookInput, BookPatch};
pub use loan::{BookLoan, LoanDetails};
pub use user::{Role, User, UserClaims};
