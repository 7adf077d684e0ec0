pub mod errors;
pub mod loader;
pub mod model;
pub mod store;

pub use errors::CsrfConfigError;
pub use loader::{load_file, load_rules, parse_section, section_str, ConfigProvider, ANTI_CSRF_SECTION};
pub use model::{CsrfRule, CsrfRuleSet, RuleSummary, UrlFilter};
pub use store::CsrfRuleStore;
