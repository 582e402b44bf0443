use ahash::AHashMap;
use axum::{Router, routing::MethodRouter};
use std::sync::{Arc, PoisonError, RwLock};

/// Collects the routes one backend registers during its mount call.
///
/// Paths are relative to the module prefix: `route("/items", ..)` serves `/mod/<slug>/items`.
/// Only the root path answers with and without a trailing slash; `/items/` stays a 404.
pub struct RouteRegistrar {
    prefix: String,
    router: Router,
    root: Option<MethodRouter>,
    registered: usize,
}

impl RouteRegistrar {
    pub(crate) fn new(prefix: String) -> Self {
        Self {
            prefix,
            router: Router::new(),
            root: None,
            registered: 0,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Registers `path` under the module prefix. `route("/", ..)` serves both `/mod/<slug>` and
    /// `/mod/<slug>/`.
    pub fn route(&mut self, path: &str, method_router: MethodRouter) -> &mut Self {
        if path == "/" {
            self.root = Some(method_router.clone());
        }
        let router = std::mem::replace(&mut self.router, Router::new());
        self.router = router.route(path, method_router);
        self.registered += 1;
        self
    }

    /// Adds a prebuilt router, e.g. one carrying its own middleware layers.
    pub fn merge(&mut self, other: Router) -> &mut Self {
        let router = std::mem::replace(&mut self.router, Router::new());
        self.router = router.merge(other);
        self.registered += 1;
        self
    }

    pub fn registered(&self) -> usize {
        self.registered
    }

    /// The collected routes nested under the prefix, or `None` if nothing was registered.
    pub(crate) fn into_router(self) -> Option<Router> {
        if self.registered == 0 {
            return None;
        }
        let nested = Router::new().nest(&self.prefix, self.router);
        Some(match self.root {
            Some(root) => nested.route(&format!("{}/", self.prefix), root),
            None => nested,
        })
    }
}

/// Live table of mounted route sets, keyed by slug.
///
/// Runtime-only; rebuilt from the registry at every boot.
#[derive(Clone, Default)]
pub struct MountedRoutes {
    inner: Arc<RwLock<AHashMap<String, Router>>>,
}

impl MountedRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs (or replaces) the route set of `slug`.
    pub fn install(&self, slug: &str, router: Router) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slug.to_string(), router);
    }

    /// Drops the route set of `slug`; `true` if one existed.
    pub fn remove(&self, slug: &str) -> bool {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(slug)
            .is_some()
    }

    pub fn get(&self, slug: &str) -> Option<Router> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slug)
            .cloned()
    }

    pub fn is_mounted(&self, slug: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(slug)
    }

    pub fn slugs(&self) -> Vec<String> {
        let mut slugs: Vec<String> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        slugs.sort();
        slugs
    }
}
