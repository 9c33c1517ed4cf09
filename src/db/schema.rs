//! SQL for the `accounts` relation.
//! The table is owned elsewhere; this crate only reads and updates `optout`.

pub const SELECT_OPTOUT: &str = "SELECT optout FROM accounts WHERE email = ?";

pub const UPDATE_OPTOUT: &str = "UPDATE accounts SET optout = ? WHERE email = ?";

/// SQLite DDL matching the columns this crate touches, for local runs and tests.
/// - `email` UNIQUE, at most one row per address
/// - `optout` INTEGER 0/1
pub const SQLITE_ACCOUNTS_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    email TEXT NOT NULL UNIQUE,
    optout INTEGER NOT NULL DEFAULT 0
);
"#;
