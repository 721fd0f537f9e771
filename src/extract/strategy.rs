//! Typed extraction strategies and per-field fallback ladders

use crate::url::{resolve_href, unwrap_redirect};
use crate::ConfigError;
use scraper::{ElementRef, Selector};
use serde::Deserialize;
use url::Url;

/// One extraction rule as written in configuration
///
/// Without `attr` the matched element's text is taken; with it, the named
/// attribute's value.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StrategyDef {
    pub css: String,
    #[serde(default)]
    pub attr: Option<String>,
}

impl StrategyDef {
    pub fn text(css: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: None,
        }
    }

    pub fn attr(css: &str, attr: &str) -> Self {
        Self {
            css: css.to_string(),
            attr: Some(attr.to_string()),
        }
    }
}

/// Result of applying a field's ladder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<T = String> {
    Found(T),
    Absent,
}

impl<T> Extracted<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(value) => Some(value),
            Self::Absent => None,
        }
    }
}

/// A compiled extraction strategy
#[derive(Debug, Clone)]
pub enum Strategy {
    Text(Selector),
    Attribute(Selector, String),
}

impl Strategy {
    /// Compiles a strategy, naming the layout in the error on a bad selector
    pub fn compile(def: &StrategyDef, layout: &str) -> Result<Self, ConfigError> {
        let selector = compile_selector(&def.css, layout)?;
        Ok(match &def.attr {
            Some(attr) => Self::Attribute(selector, attr.clone()),
            None => Self::Text(selector),
        })
    }

    /// Returns the first non-empty value among the elements this strategy matches
    pub fn attempt(&self, scope: ElementRef<'_>) -> Option<String> {
        match self {
            Self::Text(selector) => scope
                .select(selector)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .find(|text| !text.is_empty()),
            Self::Attribute(selector, attr) => scope
                .select(selector)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(str::to_string),
        }
    }
}

/// An ordered ladder of strategies for one field
#[derive(Debug, Clone, Default)]
pub struct FieldSpec {
    strategies: Vec<Strategy>,
}

impl FieldSpec {
    pub fn compile(defs: &[StrategyDef], layout: &str) -> Result<Self, ConfigError> {
        let strategies = defs
            .iter()
            .map(|def| Strategy::compile(def, layout))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { strategies })
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Tries each strategy in order and returns the first success
    pub fn extract(&self, scope: ElementRef<'_>) -> Extracted {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.attempt(scope))
            .map_or(Extracted::Absent, Extracted::Found)
    }

    /// Like [`FieldSpec::extract`], but only accepts values that resolve to an
    /// absolute http(s) URL against `base`
    ///
    /// With `redirect_param` set, wrapper links carrying the destination in
    /// that query parameter are unwrapped.
    pub fn extract_url(
        &self,
        scope: ElementRef<'_>,
        base: &Url,
        redirect_param: Option<&str>,
    ) -> Extracted<Url> {
        let found = self.strategies.iter().find_map(|strategy| {
            let raw = strategy.attempt(scope)?;
            resolve_href(base, &raw)
        });

        match (found, redirect_param) {
            (Some(url), Some(param)) => Extracted::Found(unwrap_redirect(url, param)),
            (Some(url), None) => Extracted::Found(url),
            (None, _) => Extracted::Absent,
        }
    }
}

pub(crate) fn compile_selector(css: &str, layout: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|_| ConfigError::InvalidSelector {
        layout: layout.to_string(),
        selector: css.to_string(),
    })
}
