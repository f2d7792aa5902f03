//! LessonDrop - lesson project uploads to Dropbox
//!
//! An HTTP backend that connects a Dropbox account through OAuth2 with PKCE,
//! stores Scratch projects uploaded for a lesson, and keeps a per-lesson
//! `index.json` listing every submission with a public download link.

pub mod config;
pub mod error;
pub mod lesson;
pub mod logging;
pub mod oauth;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{LessonDropError, Result};
pub use lesson::{LessonService, Manifest, ManifestEntry, PathLayout, ProjectSubmission};
pub use oauth::OAuthSession;
pub use storage::{DropboxClient, MemoryStorage, RemoteStorage, StorageError};
pub use web::{AppState, WebServer};
