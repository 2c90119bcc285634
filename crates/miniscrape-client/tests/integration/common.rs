use std::path::Path;
use std::sync::Once;

use chrono::NaiveDate;
use miniscrape_client::{HtmdCleaner, HtmlExtractor, SourceFetcher};
use miniscrape_core::cache::{FsCacheStore, PageCache};
use miniscrape_core::catalog::StaticCategories;
use miniscrape_core::clock::FixedClock;
use miniscrape_core::models::{Category, PageSpec, ResolverKind};
use miniscrape_core::resolver::Pipeline;
use miniscrape_core::service::ScrapeService;

pub type TestService = ScrapeService<
    StaticCategories,
    SourceFetcher,
    HtmlExtractor,
    HtmdCleaner,
    FixedClock,
    FsCacheStore,
>;

/// Weekly menu in windows-1250, declared only through `<meta charset>`.
pub const WEEKLY_MENU: &str = r#"<html><head><meta charset="windows-1250"><title>Bistro</title></head>
<body>
<div id="menu"><h3>Pondělí</h3><p>Guláš</p><h3>Úterý</h3><p>Svíčková na smetaně</p><h3>Středa</h3><p>Rizoto</p></div>
<div id="footer">Kontakt</div>
<img class="daily" src="https://cdn.example/tuesday.jpg">
</body></html>"#;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("miniscrape=debug"))
            .with_test_writer()
            .try_init();
    });
}

pub fn windows_1250(html: &str) -> Vec<u8> {
    encoding_rs::WINDOWS_1250.encode(html).0.into_owned()
}

/// 2024-05-07 is a Tuesday.
pub fn tuesday() -> FixedClock {
    FixedClock::new(NaiveDate::from_ymd_opt(2024, 5, 7).unwrap())
}

pub fn page(codename: &str, url: String) -> PageSpec {
    PageSpec {
        codename: codename.to_string(),
        name: codename.to_string(),
        url,
        query: "#menu".to_string(),
        ..Default::default()
    }
}

pub fn image_page(codename: &str, url: String) -> PageSpec {
    PageSpec {
        query: String::new(),
        xpath: "//img[@class='daily']".to_string(),
        resolver: ResolverKind::Image,
        ..page(codename, url)
    }
}

pub fn service(pages: Vec<PageSpec>, cache_root: &Path, clock: &FixedClock) -> TestService {
    init_tracing();
    let categories = StaticCategories::new(vec![Category {
        name: "food".to_string(),
        pages,
    }]);
    let pipeline = Pipeline::new(
        SourceFetcher::new().unwrap(),
        HtmlExtractor::new(),
        HtmdCleaner::new(),
        clock.clone(),
    );
    let cache = PageCache::new(FsCacheStore::new(cache_root), clock.clone(), false);
    ScrapeService::new(categories, pipeline, Some(cache), 4)
}
