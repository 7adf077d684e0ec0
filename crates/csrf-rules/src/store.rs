use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::OnceCell;
use tracing::info;

use crate::loader::{load_rules, ConfigProvider};
use crate::model::CsrfRuleSet;

static GLOBAL_RULES: OnceCell<Arc<CsrfRuleStore>> = OnceCell::new();

/// Process-wide holder of the current rule snapshot.
///
/// Readers take a cheap `Arc` of the snapshot; `reload` builds a fresh set
/// off to the side and publishes it with a single atomic swap.
pub struct CsrfRuleStore {
    current: ArcSwap<CsrfRuleSet>,
    revision: AtomicU64,
}

impl CsrfRuleStore {
    pub fn new(rules: CsrfRuleSet) -> Self {
        Self {
            current: ArcSwap::from_pointee(rules),
            revision: AtomicU64::new(1),
        }
    }

    pub fn from_provider(provider: &dyn ConfigProvider) -> Self {
        Self::new(load_rules(provider))
    }

    pub fn global() -> Arc<CsrfRuleStore> {
        Arc::clone(GLOBAL_RULES.get_or_init(|| Arc::new(CsrfRuleStore::new(CsrfRuleSet::new()))))
    }

    pub fn snapshot(&self) -> Arc<CsrfRuleSet> {
        self.current.load_full()
    }

    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn is_exempt(&self, url: &str) -> bool {
        self.current.load().is_exempt(url)
    }

    /// Publishes a fully built rule set and returns the new revision.
    pub fn replace(&self, rules: CsrfRuleSet) -> u64 {
        let count = rules.len();
        self.current.store(Arc::new(rules));
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        info!(revision, rules = count, "csrf rule snapshot published");
        revision
    }

    pub fn reload(&self, provider: &dyn ConfigProvider) -> u64 {
        self.replace(load_rules(provider))
    }
}

impl Default for CsrfRuleStore {
    fn default() -> Self {
        Self::new(CsrfRuleSet::new())
    }
}
