pub mod cleaner;
pub mod encoding;
pub mod extractor;
pub mod fetcher;

pub use cleaner::HtmdCleaner;
pub use extractor::HtmlExtractor;
pub use fetcher::{CommandFetcher, ReqwestFetcher, SourceFetcher};

use miniscrape_core::cache::{FsCacheStore, PageCache};
use miniscrape_core::catalog::YamlCategorySource;
use miniscrape_core::clock::SystemClock;
use miniscrape_core::config::AppConfig;
use miniscrape_core::error::AppError;
use miniscrape_core::resolver::Pipeline;
use miniscrape_core::service::ScrapeService;

/// The production pipeline: HTTP/command acquisition, scraper/sxd extraction,
/// htmd cleaning and the local wall clock.
pub type DefaultPipeline = Pipeline<SourceFetcher, HtmlExtractor, HtmdCleaner, SystemClock>;

pub fn default_pipeline() -> Result<DefaultPipeline, AppError> {
    Ok(Pipeline::new(
        SourceFetcher::new()?,
        HtmlExtractor::new(),
        HtmdCleaner::new(),
        SystemClock,
    ))
}

/// The production service: YAML categories, the default pipeline and the
/// filesystem cache (when enabled).
pub type DefaultService = ScrapeService<
    YamlCategorySource,
    SourceFetcher,
    HtmlExtractor,
    HtmdCleaner,
    SystemClock,
    FsCacheStore,
>;

pub fn build_service(config: &AppConfig) -> Result<DefaultService, AppError> {
    let source = YamlCategorySource::new(&config.categories_dir, config.categories.clone());
    Ok(ScrapeService::new(
        source,
        default_pipeline()?,
        PageCache::from_config(&config.cache),
        config.max_concurrency,
    ))
}
