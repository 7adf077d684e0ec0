use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::CsrfConfigError;
use crate::model::{CsrfRuleSet, UrlFilter};

/// Name of the configuration section holding the rule definitions.
pub const ANTI_CSRF_SECTION: &str = "anti_csrf";

/// Supplies named configuration trees.
pub trait ConfigProvider: Send + Sync {
    fn section(&self, name: &str) -> Option<Value>;
}

impl ConfigProvider for Value {
    fn section(&self, name: &str) -> Option<Value> {
        self.as_object()
            .and_then(|map| field(map, name))
            .cloned()
    }
}

/// Builds the rule set from the provider's anti-CSRF section.
///
/// A missing section yields an empty set.
pub fn load_rules(provider: &dyn ConfigProvider) -> CsrfRuleSet {
    match provider.section(ANTI_CSRF_SECTION) {
        Some(section) => parse_section(&section),
        None => {
            debug!("anti-csrf section absent; no exemption rules loaded");
            CsrfRuleSet::new()
        }
    }
}

/// Reads a YAML or JSON document and builds the rule set from it.
pub fn load_file(path: &Path) -> Result<CsrfRuleSet, CsrfConfigError> {
    let content = fs::read_to_string(path).map_err(|err| CsrfConfigError::Io(format!("{}", err)))?;
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|err| CsrfConfigError::Invalid(format!("{}", err)))?;
    let tree = serde_json::to_value(yaml_value)
        .map_err(|err| CsrfConfigError::Invalid(format!("{}", err)))?;
    Ok(load_rules(&tree))
}

/// Parses one anti-CSRF section. Malformed nodes are skipped.
pub fn parse_section(section: &Value) -> CsrfRuleSet {
    let mut set = CsrfRuleSet::new();
    let Some(section) = section.as_object() else {
        debug!("anti-csrf section is not an object; ignoring");
        return set;
    };

    let definitions: Vec<(Option<&str>, &Value)> = match field(section, "rules") {
        Some(Value::Array(items)) => items.iter().map(|item| (None, item)).collect(),
        Some(Value::Object(named)) => named
            .iter()
            .map(|(key, item)| (Some(key.as_str()), item))
            .collect(),
        _ => Vec::new(),
    };

    for (key, definition) in definitions {
        let Some(definition) = definition.as_object() else {
            debug!("skipping non-object csrf rule definition");
            continue;
        };
        let Some(url_prefix) = non_empty_str(definition, "urlPrefix") else {
            debug!(rule = ?key, "skipping csrf rule without url prefix");
            continue;
        };
        let name = non_empty_str(definition, "name")
            .or(key)
            .unwrap_or(url_prefix)
            .to_string();

        let rule = set.rule_mut(&name, url_prefix);
        for entry in ignore_entries(definition) {
            if let Some(filter) = filter_from_entry(entry) {
                rule.filters.push(filter);
            }
        }
    }

    set
}

fn ignore_entries(definition: &Map<String, Value>) -> Vec<&Value> {
    match field(definition, "ignore") {
        Some(Value::Array(entries)) => entries.iter().collect(),
        Some(entry @ Value::Object(_)) => vec![entry],
        _ => Vec::new(),
    }
}

fn filter_from_entry(entry: &Value) -> Option<UrlFilter> {
    let entry = entry.as_object()?;
    if let Some(needle) = non_empty_str(entry, "contains") {
        return Some(UrlFilter::contains(needle));
    }
    let raw = non_empty_str(entry, "wildcard")?;
    let filter = UrlFilter::wildcard(raw);
    if filter.is_none() {
        debug!(wildcard = raw, "skipping csrf filter with invalid wildcard");
    }
    filter
}

/// Reads a non-empty string setting from a configuration section.
pub fn section_str<'a>(section: &'a Value, name: &str) -> Option<&'a str> {
    section.as_object().and_then(|map| non_empty_str(map, name))
}

fn non_empty_str<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    field(map, name)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}

/// Case-insensitive lookup that also ignores `_` and `-`.
fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let wanted = normalize_key(name);
    map.iter()
        .find(|(key, _)| normalize_key(key) == wanted)
        .map(|(_, value)| value)
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|ch| *ch != '_' && *ch != '-')
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}
