use serde::Deserialize;

use crate::error::AppError;

/// Query string of `GET /api/games`.
#[derive(Debug, Clone, Deserialize)]
pub struct GamesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub search: Option<String>,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for GamesQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
            search: None,
        }
    }
}

impl GamesQuery {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.page == 0 || self.page_size == 0 {
            return Err(AppError::Validation(
                "page and page_size must be positive integers".into(),
            ));
        }
        Ok(())
    }

    /// The search term, if one was given and is not blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().filter(|s| !s.trim().is_empty())
    }
}
