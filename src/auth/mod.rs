//! Authentication module for Stowage.
//!
//! This module provides password hashing, input validation, user
//! registration and login.

mod password;
mod registration;
pub mod validation;

pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use registration::{login, register, register_with_role, RegistrationRequest};
pub use validation::{validate_email, ValidationError};
