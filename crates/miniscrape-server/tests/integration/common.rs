use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use miniscrape_client::build_service;
use miniscrape_core::config::{AppConfig, CacheConfig};
use miniscrape_server::routes;
use miniscrape_server::state::AppState;

pub const TEST_ADMIN_TOKEN: &str = "test-admin-token";

/// Pages that resolve without touching the network.
pub const LINKS: &str = r#"
name: links
pages:
  - codename: weekly-pdf
    name: Weekly PDF
    homepage: https://pub.example
    url: https://pub.example/menu.pdf
    resolver: pdf
    tags: [brno, pdf]
  - codename: canteen
    name: Canteen
    url: https://canteen.example/today
    resolver: url_only
    tags: [prague]
  - codename: closed
    url: https://closed.example
    resolver: url_only
    disabled: true
"#;

pub struct TestApp {
    pub router: Router,
    pub cache_root: PathBuf,
    _dirs: (TempDir, TempDir),
}

/// Router over category files in a temp dir, with the filesystem cache in another.
pub fn setup_app(files: &[(&str, &str)], admin_token: Option<&str>) -> TestApp {
    let categories = tempfile::tempdir().unwrap();
    let cache = tempfile::tempdir().unwrap();
    for (name, body) in files {
        std::fs::write(categories.path().join(format!("{name}.yml")), body).unwrap();
    }

    let config = AppConfig {
        categories_dir: categories.path().to_path_buf(),
        cache: CacheConfig {
            enabled: true,
            update: false,
            root: cache.path().to_path_buf(),
        },
        ..Default::default()
    };

    let state = Arc::new(AppState {
        service: build_service(&config).unwrap(),
        admin_token: admin_token.map(str::to_string),
    });

    TestApp {
        router: routes::router(state),
        cache_root: cache.path().to_path_buf(),
        _dirs: (categories, cache),
    }
}

pub fn setup_test_app() -> TestApp {
    setup_app(&[("links", LINKS)], Some(TEST_ADMIN_TOKEN))
}

pub fn setup_test_app_no_auth() -> TestApp {
    setup_app(&[("links", LINKS)], None)
}
