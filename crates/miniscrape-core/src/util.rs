use std::path::Path;

/// Derive a category name from a definition file path.
///
/// Extracts the file stem (name without extension).
/// Example: `"config/categories/food.yml"` → `"food"`
pub fn derive_category_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("default")
        .to_string()
}

/// Whether `path` looks like a category definition file (`.yml` / `.yaml`).
pub fn is_category_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}
