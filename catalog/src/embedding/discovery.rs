//! Model cache discovery
//!
//! Finds where embedding model weights are (or will be) cached.

use std::path::{Path, PathBuf};

use crate::error::{CatalogError, Result};

/// Find the model cache directory with priority:
/// 1. Explicit override passed by the caller (CLI flag / config)
/// 2. MODELFINDER_MODELS_PATH environment variable
/// 3. FASTEMBED_CACHE_DIR environment variable
/// 4. User home directory (~/.modelfinder/models)
///
/// The directory is created if it does not exist; fastembed downloads the
/// weights into it on first use.
pub fn find_model_cache_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        log::info!("Using configured model cache: {}", path.display());
        return ensure_dir(path.to_path_buf());
    }

    for var in ["MODELFINDER_MODELS_PATH", "FASTEMBED_CACHE_DIR"] {
        if let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty()) {
            let path = PathBuf::from(value);
            log::info!("Using {}: {}", var, path.display());
            return ensure_dir(path);
        }
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        let user_path = PathBuf::from(home).join(".modelfinder").join("models");
        log::info!("Using user model cache: {}", user_path.display());
        return ensure_dir(user_path);
    }

    Err(CatalogError::model(
        "Model cache directory not found. Checked:\n\
         - MODELFINDER_MODELS_PATH environment variable\n\
         - FASTEMBED_CACHE_DIR environment variable\n\
         - ~/.modelfinder/models\n\
         \n\
         Pass --model-cache to choose a directory explicitly.",
    ))
}

fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    std::fs::create_dir_all(&path).map_err(|e| {
        CatalogError::invalid_path(format!("Cannot create {}: {}", path.display(), e))
    })?;
    Ok(path)
}
