//! Measurement-scope configuration
//!
//! The namespace selection is built once from the input flags and passed
//! explicitly into the snapshot collector; nothing here is mutated after
//! construction.

use std::collections::HashMap;

/// Category label for application pods.
pub const CATEGORY_APPLICATION: &str = "application";
/// Category label for mesh control-plane pods.
pub const CATEGORY_MESH_CONTROL_PLANE: &str = "istio-control-plane";
/// Category label for Kubernetes system pods.
pub const CATEGORY_KUBE_SYSTEM: &str = "kubernetes-system";

/// Immutable mapping from namespace to classification category.
///
/// A pod is collected only if its namespace appears here; everything else is
/// filtered out at snapshot time.
#[derive(Debug, Clone)]
pub struct NamespacePolicy {
    categories: HashMap<String, String>,
}

impl NamespacePolicy {
    /// Application namespaces only (the default measurement scope).
    pub fn application_only() -> Self {
        let mut categories = HashMap::new();
        categories.insert("default".to_string(), CATEGORY_APPLICATION.to_string());
        categories.insert("hotel-res".to_string(), CATEGORY_APPLICATION.to_string());
        Self { categories }
    }

    /// Application namespaces plus the mesh control plane and kube-system.
    pub fn all_namespaces() -> Self {
        let mut policy = Self::application_only();
        policy.categories.insert(
            "istio-system".to_string(),
            CATEGORY_MESH_CONTROL_PLANE.to_string(),
        );
        policy.categories.insert(
            "kube-system".to_string(),
            CATEGORY_KUBE_SYSTEM.to_string(),
        );
        policy
    }

    /// Build from the CLI flag, once, at startup.
    pub fn from_flags(include_all: bool) -> Self {
        if include_all {
            Self::all_namespaces()
        } else {
            Self::application_only()
        }
    }

    /// Build a custom policy from explicit (namespace, category) pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            categories: pairs
                .into_iter()
                .map(|(ns, cat)| (ns.into(), cat.into()))
                .collect(),
        }
    }

    /// Category for a namespace, or `None` if the namespace is not measured.
    pub fn category(&self, namespace: &str) -> Option<&str> {
        self.categories.get(namespace).map(String::as_str)
    }

    pub fn includes(&self, namespace: &str) -> bool {
        self.categories.contains_key(namespace)
    }

    /// Measured namespaces, sorted for stable logging.
    pub fn namespaces(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.categories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
