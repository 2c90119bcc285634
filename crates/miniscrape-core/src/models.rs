use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Strategy used to turn a page definition into content.
///
/// Closed set: unknown values in definition files fall back to [`ResolverKind::Content`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolverKind {
    /// Full pipeline: acquisition, extraction and the filter chain.
    #[default]
    Content,
    /// Return the configured URL without touching the network.
    UrlOnly,
    /// Return the configured URL for embedding in an iframe.
    Iframe,
    /// Return the `src` of the first matched element.
    Image,
    /// Return the configured URL of a PDF menu.
    Pdf,
}

impl ResolverKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverKind::Content => "content",
            ResolverKind::UrlOnly => "url-only",
            ResolverKind::Iframe => "iframe",
            ResolverKind::Image => "image",
            ResolverKind::Pdf => "pdf",
        }
    }

    /// Tag stored in [`RunResult::kind`] for results produced by this resolver.
    pub fn result_kind(&self) -> &'static str {
        match self {
            ResolverKind::Content => "content",
            ResolverKind::UrlOnly => "url",
            ResolverKind::Iframe => "iframe",
            ResolverKind::Image => "img",
            ResolverKind::Pdf => "pdf",
        }
    }

    /// Parse a resolver name, accepting the historic aliases.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "url_only" | "urlonly" | "url-only" => ResolverKind::UrlOnly,
            "url" | "iframe" => ResolverKind::Iframe,
            "image" | "img" => ResolverKind::Image,
            "pdf" => ResolverKind::Pdf,
            _ => ResolverKind::Content,
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ResolverKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResolverKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ResolverKind::parse(&raw))
    }
}

/// Per-page override controlling whether successful results are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    #[default]
    Default,
    NoCache,
}

impl CachePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachePolicy::Default => "default",
            CachePolicy::NoCache => "no-cache",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "no-cache" | "no" | "nocache" => CachePolicy::NoCache,
            _ => CachePolicy::Default,
        }
    }
}

impl Serialize for CachePolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CachePolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CachePolicy::parse(&raw))
    }
}

/// Cut the content between two markers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutFilterConfig {
    /// Content starts right after the first occurrence of this marker.
    pub before: String,
    /// Content ends right before the first occurrence of this marker.
    pub after: String,
}

/// Line-oriented trimming.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CutLineFilterConfig {
    /// Drop lines starting with this prefix.
    pub starts_with: String,
    /// Drop lines containing this text.
    pub contains: String,
    /// Truncate each line at the first occurrence of this text.
    pub cut_after: String,
    /// Drop lines shorter than this many characters (0 = disabled).
    pub min_len: usize,
}

/// Keep only the part of the content that belongs to today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayFilterConfig {
    /// Seven day labels, Monday first. Empty = try the built-in variants.
    pub days: Vec<String>,
    pub enabled: bool,
}

/// Markup conversion options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HtmlFilterConfig {
    /// `"pretty"` keeps tables as tables; anything else flattens rows to paragraphs.
    pub tables: String,
    /// Emit plain text instead of Markdown.
    pub text_only: bool,
}

impl HtmlFilterConfig {
    pub fn pretty_tables(&self) -> bool {
        self.tables == "pretty"
    }
}

/// Per-page filter configuration block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FiltersConfig {
    pub cut: CutFilterConfig,
    pub cut_line: CutLineFilterConfig,
    pub day: DayFilterConfig,
    pub html: HtmlFilterConfig,
}

/// External process used as an alternate content source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub name: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.args.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.args.join(" "))
        }
    }
}

/// Static description of one scrape target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSpec {
    /// Unique within its category; used as the cache key component.
    pub codename: String,
    pub name: String,
    pub homepage: String,
    /// Where the content lives.
    pub url: String,
    /// CSS selector. Takes precedence over `xpath` when both are set.
    pub query: String,
    pub xpath: String,
    pub resolver: ResolverKind,
    pub category: String,
    pub disabled: bool,
    pub tags: BTreeSet<String>,
    pub cache_policy: CachePolicy,
    pub filters: FiltersConfig,
    /// When set, content comes from this process instead of an HTTP GET.
    ///
    /// Written as `command: { content: { name, args } }`; the flat
    /// `command: { name, args }` form is accepted as well.
    #[serde(
        deserialize_with = "deserialize_command",
        serialize_with = "serialize_command"
    )]
    pub command: Option<CommandConfig>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CommandShape<T> {
    Nested { content: T },
    Flat(CommandConfig),
}

fn deserialize_command<'de, D>(deserializer: D) -> Result<Option<CommandConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<CommandShape<CommandConfig>>::deserialize(deserializer)?.map(|shape| match shape {
            CommandShape::Nested { content } => content,
            CommandShape::Flat(command) => command,
        }),
    )
}

fn serialize_command<S>(command: &Option<CommandConfig>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    command
        .as_ref()
        .map(|content| CommandShape::<&CommandConfig>::Nested { content })
        .serialize(serializer)
}

impl PageSpec {
    /// `"<category>/<codename>"`, used in logs and error messages.
    pub fn namespace(&self) -> String {
        format!("{}/{}", self.category, self.codename)
    }

    /// The configured command, if it names a program.
    pub fn content_command(&self) -> Option<&CommandConfig> {
        self.command.as_ref().filter(|cmd| !cmd.name.trim().is_empty())
    }
}

/// Group of pages loaded from one definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub name: String,
    pub pages: Vec<PageSpec>,
}

impl Category {
    /// Fill in the defaults every page must carry after loading.
    ///
    /// The category name falls back to `fallback_name`, and every page without
    /// an explicit category inherits the category's name.
    pub fn normalize(mut self, fallback_name: &str) -> Self {
        if self.name.trim().is_empty() {
            self.name = fallback_name.to_string();
        }
        for page in &mut self.pages {
            if page.category.trim().is_empty() {
                page.category = self.name.clone();
            }
        }
        self
    }
}

/// Caller-supplied criteria choosing which pages a run processes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSelector {
    /// Every tag listed here must be present on the page. Empty = any page.
    pub tags: BTreeSet<String>,
    /// Exact category name. Empty = any category.
    pub category: String,
    /// Substring of the page codename. Empty = any page.
    pub page: String,
    /// Include disabled pages and bypass the cache.
    pub force: bool,
}

impl RunSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_page(mut self, page: impl Into<String>) -> Self {
        self.page = page.into();
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Outcome of resolving one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ok,
    Error,
    Empty,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Ok => "ok",
            RunStatus::Error => "error",
            RunStatus::Empty => "empty",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one page resolution. Created once per page per run, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    page: PageSpec,
    content: String,
    status: RunStatus,
    kind: String,
}

impl RunResult {
    pub fn ok(page: PageSpec, content: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            page,
            content: content.into(),
            status: RunStatus::Ok,
            kind: kind.into(),
        }
    }

    pub fn empty(page: PageSpec, kind: impl Into<String>) -> Self {
        Self {
            page,
            content: String::new(),
            status: RunStatus::Empty,
            kind: kind.into(),
        }
    }

    pub fn error(page: PageSpec, error: &crate::AppError) -> Self {
        Self {
            page,
            content: format!("Error: {error}"),
            status: RunStatus::Error,
            kind: "error".to_string(),
        }
    }

    pub fn page(&self) -> &PageSpec {
        &self.page
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }
}
