pub mod cache;
pub mod cached;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod filters;
pub mod models;
pub mod resolver;
pub mod runner;
pub mod selection;
pub mod service;
pub mod traits;
pub mod util;

#[cfg(test)]
pub(crate) mod testutil;

pub use cache::{CacheNamespace, CacheStore, FsCacheStore, MemoryCacheStore, PageCache};
pub use catalog::{CategorySource, StaticCategories, YamlCategorySource};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, CacheConfig};
pub use error::AppError;
pub use models::{
    CachePolicy, Category, PageSpec, ResolverKind, RunResult, RunSelector, RunStatus,
};
pub use resolver::{PageResolver, Pipeline, Resolve};
pub use runner::Runner;
pub use service::ScrapeService;
pub use traits::{Cleaner, Extractor, Fetcher, Fragment, QuerySelector};
