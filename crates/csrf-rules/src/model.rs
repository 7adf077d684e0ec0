use std::fmt;

use glob::Pattern;
use serde::Serialize;

/// Exclusion filter attached to a rule.
#[derive(Clone, Debug, PartialEq)]
pub enum UrlFilter {
    Contains(String),
    Wildcard(WildcardPattern),
}

impl UrlFilter {
    pub fn contains(needle: impl Into<String>) -> Self {
        UrlFilter::Contains(needle.into())
    }

    /// Returns `None` when the pattern cannot be compiled.
    pub fn wildcard(raw: &str) -> Option<Self> {
        WildcardPattern::compile(raw).map(UrlFilter::Wildcard)
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlFilter::Contains(needle) => url.contains(needle.as_str()),
            UrlFilter::Wildcard(pattern) => pattern.matches(url),
        }
    }
}

impl fmt::Display for UrlFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlFilter::Contains(needle) => write!(f, "contains:{needle}"),
            UrlFilter::Wildcard(pattern) => write!(f, "wildcard:{}", pattern.raw),
        }
    }
}

/// Glob with `*` and `?` as the only metacharacters.
#[derive(Clone, Debug, PartialEq)]
pub struct WildcardPattern {
    raw: String,
    compiled: Pattern,
}

impl WildcardPattern {
    pub fn compile(raw: &str) -> Option<Self> {
        // brackets are literal in URLs; keep them out of glob character classes.
        // A run of `*` means the same as one `*`, and glob's `**` is a path-segment token.
        let mut escaped = String::with_capacity(raw.len());
        for ch in raw.chars() {
            match ch {
                '[' => escaped.push_str("[[]"),
                ']' => escaped.push_str("[]]"),
                '*' if escaped.ends_with('*') => {}
                other => escaped.push(other),
            }
        }
        let compiled = Pattern::new(&escaped).ok()?;
        Some(Self {
            raw: raw.to_string(),
            compiled,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, url: &str) -> bool {
        self.compiled.matches(url)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CsrfRule {
    pub name: String,
    pub url_prefix: String,
    pub filters: Vec<UrlFilter>,
}

impl CsrfRule {
    pub fn new(name: impl Into<String>, url_prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_prefix: url_prefix.into(),
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: UrlFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// True when the URL is under this rule's prefix and one filter matches.
    pub fn exempts(&self, url: &str) -> bool {
        url.starts_with(&self.url_prefix) && self.filters.iter().any(|filter| filter.matches(url))
    }
}

/// Immutable collection of rules keyed by URL prefix.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CsrfRuleSet {
    rules: Vec<CsrfRule>,
}

impl CsrfRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule, merging its filters into an existing rule with the same prefix.
    pub fn insert(&mut self, rule: CsrfRule) {
        match self
            .rules
            .iter_mut()
            .find(|existing| existing.url_prefix == rule.url_prefix)
        {
            Some(existing) => existing.filters.extend(rule.filters),
            None => self.rules.push(rule),
        }
    }

    pub(crate) fn rule_mut(&mut self, name: &str, url_prefix: &str) -> &mut CsrfRule {
        let position = match self
            .rules
            .iter()
            .position(|rule| rule.url_prefix == url_prefix)
        {
            Some(position) => position,
            None => {
                self.rules.push(CsrfRule::new(name, url_prefix));
                self.rules.len() - 1
            }
        };
        &mut self.rules[position]
    }

    pub fn rules(&self) -> &[CsrfRule] {
        &self.rules
    }

    pub fn get(&self, url_prefix: &str) -> Option<&CsrfRule> {
        self.rules.iter().find(|rule| rule.url_prefix == url_prefix)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Logical OR of every rule's match predicate.
    pub fn is_exempt(&self, url: &str) -> bool {
        self.rules.iter().any(|rule| rule.exempts(url))
    }

    pub fn matching_rules<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a CsrfRule> + 'a {
        self.rules.iter().filter(move |rule| rule.exempts(url))
    }

    pub fn summary(&self) -> Vec<RuleSummary> {
        self.rules
            .iter()
            .map(|rule| RuleSummary {
                name: rule.name.clone(),
                url_prefix: rule.url_prefix.clone(),
                filters: rule.filters.iter().map(ToString::to_string).collect(),
            })
            .collect()
    }
}

/// Serializable view used by diagnostics.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub name: String,
    pub url_prefix: String,
    pub filters: Vec<String>,
}
