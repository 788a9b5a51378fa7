//! translations-import
//!
//! Synchronizes PHP/JSON translation files with a database table of
//! `(group, key) → {locale: value}` rows.

pub mod address;
pub mod codec;
pub mod config;
pub mod engine;
pub mod filter;
pub mod input;
pub mod lang_dir;
pub mod scanner;
pub mod store;
pub mod types;
