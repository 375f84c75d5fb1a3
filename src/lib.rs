//! Stowage - multi-tenant file storage backend.
//!
//! Each user owns a tree of folders and a catalog of files whose content
//! lives in a blob store on disk. Everything is reached through an HTTP API.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use auth::{
    hash_password, login, register, register_with_role, validate_email, validate_password,
    verify_password, PasswordError, RegistrationRequest, ValidationError,
};
pub use config::Config;
pub use db::{Database, NewUser, Role, User, UserRepository};
pub use error::{Result, StowageError};
pub use file::{
    BlobStore, FileRecord, FileService, FileSort, Folder, FolderService, NewFolder, Page,
    PageRequest, UploadRequest,
};
pub use web::WebServer;
