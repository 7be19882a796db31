//! Strategy selection by entry URL shape.

use regex_lite::Regex;

use crate::config::ResolverConfig;

use super::error::ResolveError;

/// How an entry URL is turned into a transfer URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// The entry URL is the transfer URL.
    Direct,
    /// The entry URL leads to a viewer that announces the stream over the network.
    Indirect,
}

impl StrategyKind {
    pub fn for_url(url: &str, patterns: &Patterns) -> Self {
        if patterns.is_viewer(url) || patterns.is_landing(url) {
            Self::Indirect
        } else {
            Self::Direct
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
        }
    }
}

/// Resolver patterns compiled once per run.
#[derive(Debug, Clone)]
pub struct Patterns {
    viewer: Regex,
    placeholder: Regex,
    landing: Vec<String>,
}

impl Patterns {
    pub fn compile(config: &ResolverConfig) -> Result<Self, ResolveError> {
        Ok(Self {
            viewer: compile(&config.viewer_pattern)?,
            placeholder: compile(&config.placeholder_pattern)?,
            landing: config.landing_patterns.clone(),
        })
    }

    pub fn is_viewer(&self, url: &str) -> bool {
        self.viewer.is_match(url)
    }

    pub fn is_landing(&self, url: &str) -> bool {
        self.landing.iter().any(|p| !p.is_empty() && url.contains(p.as_str()))
    }

    /// Whether a listing title is a generic placeholder rather than a name.
    pub fn is_placeholder(&self, title: &str) -> bool {
        self.placeholder.is_match(title)
    }
}

fn compile(pattern: &str) -> Result<Regex, ResolveError> {
    Regex::new(pattern).map_err(|e| ResolveError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}
