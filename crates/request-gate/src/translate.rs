use std::collections::HashMap;

use crate::ports::Translator;

/// Static dictionary of localized texts; unknown keys come back unchanged.
#[derive(Clone, Debug, Default)]
pub struct DictionaryTranslator {
    entries: HashMap<String, String>,
}

impl DictionaryTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.entries.insert(key.into(), text.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for DictionaryTranslator
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(key, text)| (key.into(), text.into()))
                .collect(),
        }
    }
}

impl Translator for DictionaryTranslator {
    fn translate(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_key() {
        let translator: DictionaryTranslator =
            [("An error occurred.", "Ein Fehler ist aufgetreten.")].into_iter().collect();
        assert_eq!(
            translator.translate("An error occurred."),
            "Ein Fehler ist aufgetreten."
        );
        assert_eq!(translator.translate("Unknown"), "Unknown");
    }
}
