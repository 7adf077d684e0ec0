use std::sync::Arc;

use speak_core_types::Caller;
use tracing::debug;

use crate::ports::ItemPermissions;
use crate::registry::{ItemPermission, MethodDescriptor, RoleRequirement};

/// Outcome of evaluating a method's declared policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthResult {
    Allowed,
    /// Carries the diagnostic line to log. It never reaches the caller.
    Denied(String),
}

impl AuthResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AuthResult::Allowed)
    }
}

/// Checks the role requirement first, then the item requirement.
///
/// A failed role check short-circuits; the item store is not consulted.
pub struct AuthorizationGate {
    items: Arc<dyn ItemPermissions>,
}

impl AuthorizationGate {
    pub fn new(items: Arc<dyn ItemPermissions>) -> Self {
        Self { items }
    }

    pub async fn authorize(&self, caller: &Caller, method: &MethodDescriptor) -> AuthResult {
        let policy = method.policy();
        if let Some(requirement) = &policy.role {
            if let AuthResult::Denied(reason) = check_role(caller, method, requirement) {
                return AuthResult::Denied(reason);
            }
        }
        if let Some(permission) = &policy.item {
            return self.check_item(caller, permission).await;
        }
        AuthResult::Allowed
    }

    async fn check_item(&self, caller: &Caller, permission: &ItemPermission) -> AuthResult {
        let ItemPermission { item, right } = permission;
        if self.items.has_access(caller, item, *right).await {
            debug!(user = %caller, item = %item, right = %right, "item access granted");
            AuthResult::Allowed
        } else {
            AuthResult::Denied(format!(
                "User {} does not have enough rights to item {} {}.",
                caller.name, item.path, item.id
            ))
        }
    }
}

fn check_role(caller: &Caller, method: &MethodDescriptor, requirement: &RoleRequirement) -> AuthResult {
    if requirement.is_satisfied_by(caller) {
        return AuthResult::Allowed;
    }
    AuthResult::Denied(format!(
        "User {} does not have enough rights to run {}. Roles that allow running this method: {}.",
        caller.name,
        method.qualified_name(),
        requirement.describe()
    ))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use speak_core_types::{AccessRight, ItemRef, Response};

    use super::*;
    use crate::registry::{AuthzPolicy, HandlerRegistry};

    struct CountingItems {
        grant: bool,
        calls: AtomicUsize,
    }

    impl CountingItems {
        fn new(grant: bool) -> Arc<Self> {
            Arc::new(Self {
                grant,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ItemPermissions for CountingItems {
        async fn has_access(&self, _caller: &Caller, _item: &ItemRef, _right: AccessRight) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.grant
        }
    }

    fn method(policy: AuthzPolicy) -> MethodDescriptor {
        let registry = HandlerRegistry::new();
        registry.register("PageEditor", "Save", policy, |_args| async { Ok(Response::ok()) });
        registry
            .lookup("PageEditor")
            .and_then(|entry| entry.method("Save").cloned())
            .unwrap()
    }

    fn both() -> AuthzPolicy {
        AuthzPolicy::roles(["sitecore\\Author"]).with_item(
            "/sitecore/content/Home",
            "{110D559F-DEA5-42EA-9C1C-8A5DF7E70EF9}",
            AccessRight::Write,
        )
    }

    #[tokio::test]
    async fn open_method_is_allowed_for_anonymous() {
        let items = CountingItems::new(false);
        let gate = AuthorizationGate::new(items.clone());
        let result = gate.authorize(&Caller::anonymous(), &method(AuthzPolicy::none())).await;
        assert_eq!(result, AuthResult::Allowed);
        assert_eq!(items.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn role_denial_skips_item_check() {
        let items = CountingItems::new(true);
        let gate = AuthorizationGate::new(items.clone());
        let caller = Caller::new("sitecore\\bob").with_roles(["sitecore\\Analytics"]);
        let result = gate.authorize(&caller, &method(both())).await;
        assert_eq!(
            result,
            AuthResult::Denied(
                "User sitecore\\bob does not have enough rights to run PageEditor.Save. \
                 Roles that allow running this method: sitecore\\Author."
                    .to_string()
            )
        );
        assert_eq!(items.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn item_denial_names_path_and_id() {
        let items = CountingItems::new(false);
        let gate = AuthorizationGate::new(items.clone());
        let caller = Caller::new("sitecore\\jane").with_roles(["sitecore\\Author"]);
        let result = gate.authorize(&caller, &method(both())).await;
        assert_eq!(
            result,
            AuthResult::Denied(
                "User sitecore\\jane does not have enough rights to item \
                 /sitecore/content/Home {110D559F-DEA5-42EA-9C1C-8A5DF7E70EF9}."
                    .to_string()
            )
        );
        assert_eq!(items.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn both_checks_passing_allows() {
        let gate = AuthorizationGate::new(CountingItems::new(true));
        let caller = Caller::new("sitecore\\jane").with_roles(["sitecore\\author"]);
        assert!(gate.authorize(&caller, &method(both())).await.is_allowed());
    }
}
