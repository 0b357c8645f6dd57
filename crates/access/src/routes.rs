//! Navigation path to required-permission resolution.
//!
//! Most screens live at fixed paths and are declared up front in a static
//! route table. Clinical modules are loaded dynamically and mount under
//! `/clinical/modules/{slug}`; their requirements come from an external
//! module registry, with a conservative fallback requirement when the
//! registry has no entry for a slug.

use crate::PermissionSet;
use std::collections::HashMap;

/// Dynamic clinical modules mount below this prefix.
const CLINICAL_MODULE_PREFIX: &str = "/clinical/modules/";

/// Requirement applied to a clinical module the registry does not know.
const FALLBACK_PERMISSION: &str = "clinical.read";

/// Lookup of dynamically-registered clinical modules.
///
/// Implemented by whatever component owns the module catalogue; keyed by the
/// module slug as it appears in the path.
pub trait ModuleRegistry {
    /// Returns the permissions required to view the module, or `None` when
    /// the slug is not registered.
    fn required_permissions(&self, slug: &str) -> Option<Vec<String>>;
}

/// An empty registry: every slug is unknown.
impl ModuleRegistry for () {
    fn required_permissions(&self, _slug: &str) -> Option<Vec<String>> {
        None
    }
}

impl ModuleRegistry for HashMap<String, Vec<String>> {
    fn required_permissions(&self, slug: &str) -> Option<Vec<String>> {
        self.get(slug).cloned()
    }
}

/// Where a resolved requirement came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessSource {
    /// Declared in the static route table.
    Route,
    /// Supplied by the module registry for a dynamic clinical module.
    Module,
    /// Registry had no entry; the fallback requirement applies.
    Fallback,
}

/// The access requirements resolved for one pathname.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteAccess {
    /// Permissions of which *any one* grants access.
    pub required_permissions: Vec<String>,
    /// Provenance of the requirement.
    pub source: AccessSource,
}

/// Resolves navigation paths to their viewing requirements.
#[derive(Clone, Debug)]
pub struct RouteAccessResolver<R> {
    routes: HashMap<String, Vec<String>>,
    registry: R,
}

impl<R: ModuleRegistry> RouteAccessResolver<R> {
    /// Creates a resolver with an empty route table over the given registry.
    pub fn new(registry: R) -> Self {
        Self {
            routes: HashMap::new(),
            registry,
        }
    }

    /// Declares a static route and the permissions required to view it.
    pub fn with_route(
        mut self,
        pathname: impl Into<String>,
        required: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.routes
            .insert(pathname.into(), required.into_iter().map(Into::into).collect());
        self
    }

    /// Resolves the requirements for a pathname.
    ///
    /// Returns `None` for paths with no declared requirements: unknown
    /// static paths, and malformed module paths (empty or nested slugs).
    pub fn resolve(&self, pathname: &str) -> Option<RouteAccess> {
        if let Some(required) = self.routes.get(pathname) {
            return Some(RouteAccess {
                required_permissions: required.clone(),
                source: AccessSource::Route,
            });
        }

        let slug = pathname.strip_prefix(CLINICAL_MODULE_PREFIX)?;
        let slug = slug.trim_end_matches('/');
        if slug.is_empty() || slug.contains('/') {
            return None;
        }

        match self.registry.required_permissions(slug) {
            Some(required) => Some(RouteAccess {
                required_permissions: required,
                source: AccessSource::Module,
            }),
            None => {
                tracing::debug!(slug, "module not registered, applying fallback requirement");
                Some(RouteAccess {
                    required_permissions: vec![FALLBACK_PERMISSION.to_string()],
                    source: AccessSource::Fallback,
                })
            }
        }
    }

    /// Decides whether a session with the given grants may view a path.
    ///
    /// Paths with no requirements are open; otherwise any single required
    /// permission matching via [`PermissionSet::grants`] is enough.
    pub fn can_access(&self, pathname: &str, granted: &PermissionSet) -> bool {
        match self.resolve(pathname) {
            None => true,
            Some(access) if access.required_permissions.is_empty() => true,
            Some(access) => access
                .required_permissions
                .iter()
                .any(|required| granted.grants(required)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> RouteAccessResolver<HashMap<String, Vec<String>>> {
        let mut registry = HashMap::new();
        registry.insert(
            "medications".to_string(),
            vec!["clinical.medications.read".to_string()],
        );

        RouteAccessResolver::new(registry)
            .with_route("/ward/dashboard", ["ward.dashboard"])
            .with_route(
                "/discharge",
                ["discharge.read", "discharge.manage"],
            )
            .with_route("/about", Vec::<String>::new())
    }

    #[test]
    fn static_routes_resolve_from_the_table() {
        let access = resolver()
            .resolve("/ward/dashboard")
            .expect("declared route should resolve");
        assert_eq!(access.source, AccessSource::Route);
        assert_eq!(access.required_permissions, vec!["ward.dashboard"]);
    }

    #[test]
    fn unknown_paths_resolve_to_none_and_are_open() {
        let resolver = resolver();
        assert!(resolver.resolve("/nowhere").is_none());
        assert!(resolver.can_access("/nowhere", &PermissionSet::default()));
    }

    #[test]
    fn registered_modules_use_the_registry() {
        let access = resolver()
            .resolve("/clinical/modules/medications")
            .expect("registered module should resolve");
        assert_eq!(access.source, AccessSource::Module);
        assert_eq!(
            access.required_permissions,
            vec!["clinical.medications.read"]
        );
    }

    #[test]
    fn unregistered_modules_fall_back_to_clinical_read() {
        let access = resolver()
            .resolve("/clinical/modules/imaging")
            .expect("unknown module should fall back");
        assert_eq!(access.source, AccessSource::Fallback);
        assert_eq!(access.required_permissions, vec!["clinical.read"]);
    }

    #[test]
    fn malformed_module_paths_do_not_resolve() {
        let resolver = resolver();
        assert!(resolver.resolve("/clinical/modules/").is_none());
        assert!(resolver.resolve("/clinical/modules/a/b").is_none());
    }

    #[test]
    fn any_single_required_permission_grants_access() {
        let resolver = resolver();
        let granted = PermissionSet::new(["discharge.manage"]);
        assert!(resolver.can_access("/discharge", &granted));

        let unrelated = PermissionSet::new(["ward.dashboard"]);
        assert!(!resolver.can_access("/discharge", &unrelated));
    }

    #[test]
    fn requirement_free_routes_are_open() {
        assert!(resolver().can_access("/about", &PermissionSet::default()));
    }

    #[test]
    fn wildcard_grants_cover_module_fallback() {
        let resolver = resolver();
        let granted = PermissionSet::new(["clinical.*"]);
        assert!(resolver.can_access("/clinical/modules/imaging", &granted));
    }
}
