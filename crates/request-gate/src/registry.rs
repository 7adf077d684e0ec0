use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::RwLock;
use speak_core_types::{AccessRight, Caller, ItemRef, RequestArgs};

use crate::errors::HandlerResult;
use crate::ports::RequestRepository;

/// Method invoked when a request names a type but no method.
pub const DEFAULT_METHOD: &str = "ProcessRequest";

pub type InvokeFn = Arc<dyn Fn(RequestArgs) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Role gate declared on a method.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleRequirement {
    pub roles: Vec<String>,
    pub admins_only: bool,
}

impl RoleRequirement {
    pub fn any_of<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            admins_only: false,
        }
    }

    pub fn admins_only() -> Self {
        Self {
            roles: Vec::new(),
            admins_only: true,
        }
    }

    pub fn is_satisfied_by(&self, caller: &Caller) -> bool {
        if caller.is_administrator {
            return true;
        }
        if self.admins_only {
            return false;
        }
        if self.roles.is_empty() {
            return !caller.is_anonymous();
        }
        self.roles.iter().any(|role| caller.is_in_role(role))
    }

    /// Human readable list of what would have been accepted.
    pub fn describe(&self) -> String {
        if self.admins_only {
            "administrators".to_string()
        } else if self.roles.is_empty() {
            "any authenticated user".to_string()
        } else {
            self.roles.join(", ")
        }
    }
}

/// Item right declared on a method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemPermission {
    pub item: ItemRef,
    pub right: AccessRight,
}

/// Authorization requirements of one method; both parts are optional.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthzPolicy {
    pub role: Option<RoleRequirement>,
    pub item: Option<ItemPermission>,
}

impl AuthzPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::none().with_role(RoleRequirement::any_of(roles))
    }

    pub fn admins_only() -> Self {
        Self::none().with_role(RoleRequirement::admins_only())
    }

    pub fn item(path: impl Into<String>, id: impl Into<String>, right: AccessRight) -> Self {
        Self::none().with_item(path, id, right)
    }

    pub fn with_role(mut self, requirement: RoleRequirement) -> Self {
        self.role = Some(requirement);
        self
    }

    pub fn with_item(
        mut self,
        path: impl Into<String>,
        id: impl Into<String>,
        right: AccessRight,
    ) -> Self {
        self.item = Some(ItemPermission {
            item: ItemRef::new(path, id),
            right,
        });
        self
    }

    pub fn is_open(&self) -> bool {
        self.role.is_none() && self.item.is_none()
    }
}

#[derive(Clone)]
pub struct MethodDescriptor {
    name: String,
    qualified_name: String,
    policy: AuthzPolicy,
    invoke: InvokeFn,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Type.Method`, used in diagnostics.
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn policy(&self) -> &AuthzPolicy {
        &self.policy
    }

    pub async fn invoke(&self, args: RequestArgs) -> HandlerResult {
        (self.invoke)(args).await
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("qualified_name", &self.qualified_name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// A registered request type and its callable methods.
#[derive(Clone, Debug)]
pub struct HandlerEntry {
    type_name: String,
    methods: HashMap<String, MethodDescriptor>,
}

impl HandlerEntry {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            methods: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Explicit routing table from type name to handler entry.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<HandlerEntry>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) one method of a request type.
    pub fn register<F, Fut>(
        &self,
        type_name: &str,
        method: &str,
        policy: AuthzPolicy,
        handler: F,
    ) -> &Self
    where
        F: Fn(RequestArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let invoke: InvokeFn = Arc::new(move |args| handler(args).boxed());
        let descriptor = MethodDescriptor {
            name: method.to_string(),
            qualified_name: format!("{type_name}.{method}"),
            policy,
            invoke,
        };

        let mut guard = self.handlers.write();
        let entry = guard
            .entry(type_name.to_string())
            .or_insert_with(|| Arc::new(HandlerEntry::new(type_name)));
        Arc::make_mut(entry)
            .methods
            .insert(method.to_string(), descriptor);
        self
    }

    pub fn unregister(&self, type_name: &str) -> bool {
        self.handlers.write().remove(type_name).is_some()
    }

    pub fn lookup(&self, type_name: &str) -> Option<Arc<HandlerEntry>> {
        self.handlers.read().get(type_name).cloned()
    }

    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl RequestRepository for HandlerRegistry {
    fn get(&self, args: &RequestArgs) -> Option<Arc<HandlerEntry>> {
        self.lookup(&args.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speak_core_types::Response;

    #[test]
    fn role_requirement_admits_administrators_and_listed_roles() {
        let requirement = RoleRequirement::any_of(["sitecore\\Designer", "sitecore\\Author"]);
        let author = Caller::new("sitecore\\jane").with_roles(["sitecore\\author"]);
        let visitor = Caller::new("sitecore\\bob").with_roles(["sitecore\\Analytics"]);
        let admin = Caller::new("sitecore\\admin").administrator();
        assert!(requirement.is_satisfied_by(&author));
        assert!(!requirement.is_satisfied_by(&visitor));
        assert!(requirement.is_satisfied_by(&admin));
        assert_eq!(requirement.describe(), "sitecore\\Designer, sitecore\\Author");
    }

    #[test]
    fn admins_only_rejects_role_holders() {
        let requirement = RoleRequirement::admins_only();
        let developer = Caller::new("sitecore\\dev").with_roles(["sitecore\\Developer"]);
        assert!(!requirement.is_satisfied_by(&developer));
        assert!(requirement.is_satisfied_by(&Caller::new("sitecore\\admin").administrator()));
    }

    #[test]
    fn empty_role_list_requires_authenticated_caller() {
        let requirement = RoleRequirement::default();
        assert!(!requirement.is_satisfied_by(&Caller::anonymous()));
        assert!(requirement.is_satisfied_by(&Caller::new("sitecore\\jane")));
    }

    #[tokio::test]
    async fn register_merges_methods_under_one_type() {
        let registry = HandlerRegistry::new();
        registry
            .register("PageEditor", "Save", AuthzPolicy::none(), |_args| async {
                Ok(Response::ok().with_value("saved", serde_json::json!(true)))
            })
            .register("PageEditor", "Lock", AuthzPolicy::admins_only(), |_args| async {
                Ok(Response::ok())
            });

        let entry = registry.get(&RequestArgs::new("PageEditor", "Save")).unwrap();
        assert_eq!(entry.method_names(), vec!["Lock", "Save"]);
        let save = entry.method("Save").unwrap();
        assert_eq!(save.qualified_name(), "PageEditor.Save");
        assert!(save.policy().is_open());
        assert!(!entry.method("Lock").unwrap().policy().is_open());

        let response = save.invoke(RequestArgs::new("PageEditor", "Save")).await.unwrap();
        assert_eq!(response.payload["saved"], serde_json::json!(true));
    }

    #[test]
    fn unknown_type_is_not_resolved() {
        let registry = HandlerRegistry::new();
        assert!(registry.get(&RequestArgs::new("Missing", "Run")).is_none());
        assert!(!registry.unregister("Missing"));
    }
}
