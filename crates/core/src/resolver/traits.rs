//! Trait definitions for the resolver module.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::config::ResolverConfig;
use crate::session::SessionBroker;

use super::error::ResolveError;
use super::strategy::{Patterns, StrategyKind};
use super::types::{ResolvedTransfer, ResourceRef};
use super::{direct, indirect};

/// Turns an entry URL into something the transfer engine can fetch.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, resource: &ResourceRef) -> Result<ResolvedTransfer, ResolveError>;
}

/// Resolver that drives the shared browser session.
pub struct BrowserResolver {
    broker: Arc<SessionBroker>,
    config: ResolverConfig,
    patterns: Patterns,
}

impl BrowserResolver {
    /// Fails only if a configured pattern does not compile.
    pub fn new(broker: Arc<SessionBroker>, config: &ResolverConfig) -> Result<Self, ResolveError> {
        Ok(Self {
            broker,
            patterns: Patterns::compile(config)?,
            config: config.clone(),
        })
    }

    pub fn strategy_for(&self, url: &str) -> StrategyKind {
        StrategyKind::for_url(url, &self.patterns)
    }
}

#[async_trait]
impl Resolver for BrowserResolver {
    async fn resolve(&self, resource: &ResourceRef) -> Result<ResolvedTransfer, ResolveError> {
        let strategy = self.strategy_for(&resource.entry_url);
        debug!(
            strategy = strategy.as_str(),
            url = %resource.entry_url,
            "Resolving resource"
        );

        match strategy {
            StrategyKind::Direct => {
                direct::resolve(&self.broker, &self.config, &self.patterns, resource).await
            }
            StrategyKind::Indirect => {
                indirect::resolve(&self.broker, &self.config, &self.patterns, resource).await
            }
        }
    }
}
