use thiserror::Error;

/// Playlist source resolution failures
#[derive(Debug, Error)]
pub enum SourceError {
    /// Every fallback in the resolution chain was exhausted
    #[error("não foi possível carregar a lista M3U")]
    Unavailable,
}

/// Catalog-level failures surfaced to handlers
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Initial load has not completed (or failed) yet
    #[error("catálogo ainda não carregado")]
    NotLoaded,
}
