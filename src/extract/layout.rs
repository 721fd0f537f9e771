//! Declarative page layouts
//!
//! A layout names the hosts it applies to, the container selectors that
//! delimit one item, and a fallback ladder per field. Supporting a new page
//! variant means appending a selector to a ladder.

use crate::extract::strategy::{compile_selector, Extracted, FieldSpec, StrategyDef};
use crate::fingerprint::FingerprintScheme;
use crate::url::matches_wildcard;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Which kind of page a layout reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SourceFamily {
    /// Static listing pages; items are owned by a configured source
    #[serde(rename = "headline-summary", alias = "listing")]
    HeadlineSummary,
    /// Search-results pages; items carry a free-text publisher label
    #[serde(rename = "title-url", alias = "search")]
    TitleUrl,
}

impl SourceFamily {
    pub fn scheme(&self) -> FingerprintScheme {
        match self {
            Self::HeadlineSummary => FingerprintScheme::HeadlineSummary,
            Self::TitleUrl => FingerprintScheme::TitleUrl,
        }
    }
}

/// A layout as written in configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LayoutDef {
    pub name: String,
    #[serde(default)]
    pub domains: Vec<String>,
    pub family: SourceFamily,
    /// Container selector ladder; the first selector matching anything wins
    pub item: Vec<String>,
    pub title: Vec<StrategyDef>,
    #[serde(default)]
    pub summary: Vec<StrategyDef>,
    pub url: Vec<StrategyDef>,
    #[serde(default)]
    pub publisher: Vec<StrategyDef>,
    #[serde(default)]
    pub published: Vec<StrategyDef>,
    #[serde(default)]
    pub next_page: Vec<StrategyDef>,
    #[serde(default)]
    pub redirect_param: Option<String>,
    #[serde(default)]
    pub default_publisher: Option<String>,
    #[serde(default)]
    pub default_published: Option<String>,
}

/// Fields of one valid item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFields {
    pub title: String,
    /// Falls back to the title, never empty
    pub summary: String,
    pub url: Url,
    pub publisher: Option<String>,
    pub published: Option<String>,
}

/// Outcome of reading one item container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Valid(ItemFields),
    /// A required field had no match
    Incomplete { missing: &'static str },
}

/// A compiled layout
#[derive(Debug, Clone)]
pub struct Layout {
    pub name: String,
    pub domains: Vec<String>,
    pub family: SourceFamily,
    item: Vec<Selector>,
    title: FieldSpec,
    summary: FieldSpec,
    url: FieldSpec,
    publisher: FieldSpec,
    published: FieldSpec,
    next_page: FieldSpec,
    redirect_param: Option<String>,
    default_publisher: Option<String>,
    default_published: Option<String>,
}

impl Layout {
    /// Compiles every selector of `def`
    pub fn compile(def: &LayoutDef) -> Result<Self, ConfigError> {
        let name = def.name.as_str();

        if def.item.is_empty() || def.title.is_empty() || def.url.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Layout '{}' needs item, title and url selectors",
                name
            )));
        }

        let item = def
            .item
            .iter()
            .map(|css| compile_selector(css, name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: def.name.clone(),
            domains: def.domains.clone(),
            family: def.family,
            item,
            title: FieldSpec::compile(&def.title, name)?,
            summary: FieldSpec::compile(&def.summary, name)?,
            url: FieldSpec::compile(&def.url, name)?,
            publisher: FieldSpec::compile(&def.publisher, name)?,
            published: FieldSpec::compile(&def.published, name)?,
            next_page: FieldSpec::compile(&def.next_page, name)?,
            redirect_param: def.redirect_param.clone(),
            default_publisher: def.default_publisher.clone(),
            default_published: def.default_published.clone(),
        })
    }

    /// Returns true if this layout applies to `host`
    pub fn matches_host(&self, host: &str) -> bool {
        self.domains
            .iter()
            .any(|pattern| matches_wildcard(pattern, host))
    }

    /// Reads every item container on the page, in document order
    pub fn extract_items(&self, document: &Html, base: &Url) -> Vec<ItemOutcome> {
        let containers: Vec<ElementRef<'_>> = self
            .item
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|found| !found.is_empty())
            .unwrap_or_default();

        containers
            .into_iter()
            .map(|container| self.extract_item(container, base))
            .collect()
    }

    fn extract_item(&self, container: ElementRef<'_>, base: &Url) -> ItemOutcome {
        let Extracted::Found(title) = self.title.extract(container) else {
            return ItemOutcome::Incomplete { missing: "title" };
        };

        let Extracted::Found(url) =
            self.url
                .extract_url(container, base, self.redirect_param.as_deref())
        else {
            return ItemOutcome::Incomplete { missing: "url" };
        };

        let summary = self
            .summary
            .extract(container)
            .into_option()
            .unwrap_or_else(|| title.clone());

        let publisher = self
            .publisher
            .extract(container)
            .into_option()
            .or_else(|| self.default_publisher.clone());

        let published = self
            .published
            .extract(container)
            .into_option()
            .or_else(|| self.default_published.clone());

        ItemOutcome::Valid(ItemFields {
            title,
            summary,
            url,
            publisher,
            published,
        })
    }

    /// Finds the "next page" link, if the layout declares one
    pub fn next_page(&self, document: &Html, base: &Url) -> Option<Url> {
        if self.next_page.is_empty() {
            return None;
        }
        self.next_page
            .extract_url(document.root_element(), base, None)
            .into_option()
    }
}

/// Built-in layouts for the sources NewsFusion ships with
const BUILTIN_LAYOUTS: &str = r#"
[[layout]]
name = "times-of-india"
domains = ["*.indiatimes.com"]
family = "headline-summary"
item = ["div.card-container"]
title = [{ css = "h2 a" }]
url = [{ css = "h2 a", attr = "href" }]
summary = [{ css = "p.card-txt" }]

[[layout]]
name = "the-hindu"
domains = ["*.thehindu.com"]
family = "headline-summary"
item = ["div.story-card"]
title = [{ css = "h3 a" }]
url = [{ css = "h3 a", attr = "href" }]
summary = [{ css = "p.intro" }]

[[layout]]
name = "google-news"
domains = ["news.google.com"]
family = "title-url"
item = ["article.IBr9hb, article.UwIKyb, article.IFHyqb"]
title = [
    { css = "h3 a" },
    { css = "h4 a" },
    { css = "a.DY5T1d" },
    { css = "a[class*='aqvwYd']" },
    { css = "a" },
]
url = [
    { css = "h3 a", attr = "href" },
    { css = "h4 a", attr = "href" },
    { css = "a.DY5T1d", attr = "href" },
    { css = "a[class*='aqvwYd']", attr = "href" },
    { css = "a", attr = "href" },
]
summary = [
    { css = "span[class*='xBbh9']" },
    { css = "div.Da10Tb" },
    { css = "div[class*='Rai5ob']" },
    { css = "div.QNKWqe" },
]
publisher = [
    { css = "div[class*='vr1PYe'] a" },
    { css = "div.QNKWqe span" },
    { css = "div.UOVeFe" },
    { css = "div.SVJrMe a" },
]
published = [
    { css = "div[class*='SVJrMe'] time" },
    { css = "time" },
    { css = "div.kvVbwb" },
]
next-page = [
    { css = "a[class*='VfPpkd-BIzmGd']", attr = "href" },
    { css = "a[class*='jKHa4e']", attr = "href" },
    { css = "a[jsname='sCfAK'][role='menuitem']", attr = "href" },
]
redirect-param = "url"
default-publisher = "Google News"
default-published = "Recent"
"#;

#[derive(Deserialize)]
struct LayoutFile {
    layout: Vec<LayoutDef>,
}

/// Configured layouts followed by the built-in ones
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    layouts: Vec<Arc<Layout>>,
}

impl LayoutRegistry {
    /// Built-in layouts only
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::with_overrides(&[])
    }

    /// Configured layouts take precedence; a configured layout sharing a
    /// built-in's name replaces it
    pub fn with_overrides(configured: &[LayoutDef]) -> Result<Self, ConfigError> {
        let builtins: LayoutFile = toml::from_str(BUILTIN_LAYOUTS)?;

        let mut layouts = Vec::with_capacity(configured.len() + builtins.layout.len());
        for def in configured {
            if def.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Layout name cannot be empty".to_string(),
                ));
            }
            layouts.push(Arc::new(Layout::compile(def)?));
        }

        for def in builtins
            .layout
            .iter()
            .filter(|def| !configured.iter().any(|c| c.name == def.name))
        {
            layouts.push(Arc::new(Layout::compile(def)?));
        }

        Ok(Self { layouts })
    }

    /// Selects the first layout whose domain patterns match `host`
    pub fn resolve(&self, host: &str) -> Option<Arc<Layout>> {
        self.layouts
            .iter()
            .find(|layout| layout.matches_host(host))
            .cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<Layout>> {
        self.layouts
            .iter()
            .find(|layout| layout.name == name)
            .cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layouts.iter().map(|layout| layout.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LayoutRegistry {
        LayoutRegistry::builtin().unwrap()
    }

    fn base(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_builtins_compile_and_resolve() {
        let registry = registry();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["times-of-india", "the-hindu", "google-news"]);

        assert_eq!(
            registry.resolve("timesofindia.indiatimes.com").unwrap().name,
            "times-of-india"
        );
        assert_eq!(registry.resolve("www.thehindu.com").unwrap().name, "the-hindu");
        assert!(registry.resolve("example.com").is_none());
    }

    #[test]
    fn test_listing_items_with_summary_fallback() {
        let layout = registry().by_name("the-hindu").unwrap();
        let html = Html::parse_document(
            r#"<html><body>
            <div class="story-card"><h3><a href="/news/a">Rains lash Chennai</a></h3>
                <p class="intro">Heavy rain floods roads</p></div>
            <div class="story-card"><h3><a href="/news/b">Metro line opens</a></h3></div>
            <div class="story-card"><p class="intro">No headline here</p></div>
            </body></html>"#,
        );

        let items = layout.extract_items(&html, &base("https://www.thehindu.com/news/"));
        assert_eq!(items.len(), 3);

        let ItemOutcome::Valid(first) = &items[0] else {
            panic!("first item should be valid");
        };
        assert_eq!(first.title, "Rains lash Chennai");
        assert_eq!(first.summary, "Heavy rain floods roads");
        assert_eq!(first.url.as_str(), "https://www.thehindu.com/news/a");

        let ItemOutcome::Valid(second) = &items[1] else {
            panic!("second item should be valid");
        };
        assert_eq!(second.summary, "Metro line opens");

        assert_eq!(items[2], ItemOutcome::Incomplete { missing: "title" });
    }

    #[test]
    fn test_search_layout_defaults_and_redirects() {
        let layout = registry().by_name("google-news").unwrap();
        let html = Html::parse_document(
            r#"<html><body>
            <article class="IBr9hb">
                <a class="DY5T1d" href="./read?url=https%3A%2F%2Fpaper.example%2Fa">Budget reactions</a>
            </article>
            <article class="UwIKyb">
                <h4><a href="./articles/CBMiXyz?url=https%3A%2F%2Fx.example">Chip fab deal</a></h4>
                <div class="UOVeFe">Mint</div>
                <time>2 hours ago</time>
            </article>
            </body></html>"#,
        );

        let items = layout.extract_items(&html, &base("https://news.google.com/search?q=budget"));
        assert_eq!(items.len(), 2);

        let ItemOutcome::Valid(first) = &items[0] else {
            panic!("first item should be valid");
        };
        assert_eq!(first.url.as_str(), "https://paper.example/a");
        assert_eq!(first.publisher.as_deref(), Some("Google News"));
        assert_eq!(first.published.as_deref(), Some("Recent"));

        let ItemOutcome::Valid(second) = &items[1] else {
            panic!("second item should be valid");
        };
        assert!(second.url.path().starts_with("/articles/"));
        assert_eq!(second.publisher.as_deref(), Some("Mint"));
        assert_eq!(second.published.as_deref(), Some("2 hours ago"));
    }

    #[test]
    fn test_next_page_link() {
        let layout = registry().by_name("google-news").unwrap();
        let html = Html::parse_document(
            r#"<a class="xx VfPpkd-BIzmGd" href="/search?q=budget&start=10">Next</a>"#,
        );
        let next = layout
            .next_page(&html, &base("https://news.google.com/search?q=budget"))
            .unwrap();
        assert_eq!(next.as_str(), "https://news.google.com/search?q=budget&start=10");

        let listing = registry().by_name("the-hindu").unwrap();
        assert!(listing
            .next_page(&html, &base("https://www.thehindu.com/"))
            .is_none());
    }

    #[test]
    fn test_configured_layout_overrides_builtin() {
        let def = LayoutDef {
            name: "the-hindu".to_string(),
            domains: vec!["*.thehindu.com".to_string()],
            family: SourceFamily::HeadlineSummary,
            item: vec!["li.headline".to_string()],
            title: vec![StrategyDef::text("a")],
            summary: vec![],
            url: vec![StrategyDef::attr("a", "href")],
            publisher: vec![],
            published: vec![],
            next_page: vec![],
            redirect_param: None,
            default_publisher: None,
            default_published: None,
        };
        let registry = LayoutRegistry::with_overrides(&[def]).unwrap();
        assert_eq!(registry.names().filter(|n| *n == "the-hindu").count(), 1);

        let layout = registry.resolve("www.thehindu.com").unwrap();
        let html = Html::parse_document(r#"<ul><li class="headline"><a href="/x">X</a></li></ul>"#);
        assert_eq!(layout.extract_items(&html, &base("https://www.thehindu.com/")).len(), 1);
    }

    #[test]
    fn test_family_aliases() {
        let def: LayoutDef = toml::from_str(
            r#"
name = "feed"
family = "search"
item = ["li"]
title = [{ css = "a" }]
url = [{ css = "a", attr = "href" }]
"#,
        )
        .unwrap();
        assert_eq!(def.family, SourceFamily::TitleUrl);
        assert_eq!(def.family.scheme(), FingerprintScheme::TitleUrl);
    }
}
