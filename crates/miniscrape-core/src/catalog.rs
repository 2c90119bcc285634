//! Where category definitions come from.

use std::future::Future;
use std::path::{Path, PathBuf};

use crate::error::AppError;
use crate::models::Category;
use crate::util::{derive_category_name, is_category_file};

/// Supplies the category definitions a run selects pages from.
pub trait CategorySource: Send + Sync + 'static {
    fn load(&self) -> impl Future<Output = Result<Vec<Category>, AppError>> + Send;
}

/// Categories kept in memory. Used for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticCategories {
    categories: Vec<Category>,
}

impl StaticCategories {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories: categories
                .into_iter()
                .map(|c| {
                    let fallback = c.name.clone();
                    c.normalize(&fallback)
                })
                .collect(),
        }
    }
}

impl CategorySource for StaticCategories {
    async fn load(&self) -> Result<Vec<Category>, AppError> {
        Ok(self.categories.clone())
    }
}

/// Reads `<dir>/<name>.yml` for each configured name, or every `*.yml`
/// file in `dir` when no names are configured.
///
/// A file that cannot be read or parsed is logged and skipped.
#[derive(Debug, Clone)]
pub struct YamlCategorySource {
    dir: PathBuf,
    names: Vec<String>,
}

impl YamlCategorySource {
    pub fn new(dir: impl Into<PathBuf>, names: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            names,
        }
    }

    async fn files(&self) -> Result<Vec<PathBuf>, AppError> {
        if !self.names.is_empty() {
            return Ok(self
                .names
                .iter()
                .map(|name| self.dir.join(format!("{name}.yml")))
                .collect());
        }

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            AppError::ConfigError(format!(
                "Unable to list categories in {}: {e}",
                self.dir.display()
            ))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            AppError::ConfigError(format!(
                "Unable to list categories in {}: {e}",
                self.dir.display()
            ))
        })? {
            let path = entry.path();
            if is_category_file(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

async fn load_file(path: &Path) -> Result<Category, AppError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::ConfigError(format!("Unable to read {}: {e}", path.display())))?;
    let category: Category = serde_yaml::from_str(&raw)
        .map_err(|e| AppError::ConfigError(format!("Invalid category {}: {e}", path.display())))?;
    Ok(category.normalize(&derive_category_name(path)))
}

impl CategorySource for YamlCategorySource {
    async fn load(&self) -> Result<Vec<Category>, AppError> {
        let mut categories = Vec::new();
        for path in self.files().await? {
            match load_file(&path).await {
                Ok(category) => {
                    tracing::debug!(
                        file = %path.display(),
                        category = %category.name,
                        pages = category.pages.len(),
                        "Loaded category"
                    );
                    categories.push(category);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), error = %e, "Skipping category file");
                }
            }
        }

        tracing::info!(count = categories.len(), dir = %self.dir.display(), "Categories loaded");
        Ok(categories)
    }
}
