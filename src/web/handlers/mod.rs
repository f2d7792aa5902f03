//! HTTP handlers.

pub mod auth;
pub mod folder;
pub mod lesson;

use std::sync::Arc;

use crate::lesson::LessonService;
use crate::oauth::OAuthSession;

pub use auth::*;
pub use folder::*;
pub use lesson::*;

/// Application state shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Lesson uploads, listings and indexes.
    pub lessons: LessonService,
    /// Dropbox authorization state.
    pub session: Arc<OAuthSession>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(lessons: LessonService, session: Arc<OAuthSession>) -> Self {
        Self { lessons, session }
    }
}
