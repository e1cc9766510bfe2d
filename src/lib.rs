//! Reads a legacy Visual SourceSafe (VSS) database directory tree and
//! reconstructs a chronologically ordered history of projects and files,
//! including per-revision content for text files via delta reconstruction.
//!
//! The entry point is [`database::Database`]: open it against the root of a
//! VSS database (the directory containing `srcsafe.ini`), then walk it with
//! [`walker`] to get a stream of [`action::Action`]s suitable for feeding to
//! a migration pipeline.

pub mod action;
pub mod byte_reader;
pub mod crc;
pub mod database;
pub mod delta;
pub mod dump;
pub mod error;
pub mod fullname;
pub mod ini;
pub mod item_file;
pub mod name_file;
pub mod options;
pub mod record;
pub mod record_file;
pub mod walker;

pub use database::Database;
pub use error::{Error, Result};
pub use options::{ParseMode, ParseOptions};
