//! Database schema and migrations for Stowage.
//!
//! This module contains all database migrations that will be applied
//! sequentially when the database is first opened or upgraded.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
/// The schema_version table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users table
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    email       TEXT NOT NULL COLLATE NOCASE,
    password    TEXT NOT NULL,           -- Argon2 hash
    role        TEXT NOT NULL DEFAULT 'user',  -- 'user', 'admin'
    created_at  TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_users_email ON users(email COLLATE NOCASE);
"#,
    // v2: Folder tree
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    parent_id   INTEGER REFERENCES folders(id) ON DELETE RESTRICT,
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Sibling names are unique per owner; top-level folders share parent 0
CREATE UNIQUE INDEX idx_folders_owner_parent_name
    ON folders(owner_id, IFNULL(parent_id, 0), name);
CREATE INDEX idx_folders_parent_id ON folders(parent_id);
"#,
    // v3: File metadata
    r#"
CREATE TABLE file_metadata (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    display_name TEXT NOT NULL,
    search_name  TEXT NOT NULL,          -- lower-cased display_name
    blob_name    TEXT NOT NULL UNIQUE,
    size_bytes   INTEGER NOT NULL,
    media_type   TEXT NOT NULL,
    folder_id    INTEGER REFERENCES folders(id) ON DELETE RESTRICT,
    owner_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    uploaded_at  TEXT NOT NULL
);

CREATE INDEX idx_file_metadata_owner_folder ON file_metadata(owner_id, folder_id);
CREATE INDEX idx_file_metadata_uploaded_at ON file_metadata(owner_id, uploaded_at);
"#,
];
