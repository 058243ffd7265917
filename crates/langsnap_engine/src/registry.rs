//! Ordered plugin catalogues.

use crate::error::{TransferError, TransferResult};
use crate::mapper::{IdAllocation, IdMappers};
use crate::plugin::ResourcePlugin;
use std::collections::HashSet;

/// The ordered plugins of one domain.
///
/// Order is authored by hand and checked by [`validate_catalogue`]: every
/// plugin must come after the plugins it references. Resources owned by
/// other systems (users, say) are declared as externals together with the
/// policy used to resolve their keys on Import.
pub struct PluginRegistry {
    domain: &'static str,
    scope: &'static str,
    plugins: Vec<Box<dyn ResourcePlugin>>,
    externals: Vec<(&'static str, IdAllocation)>,
}

impl PluginRegistry {
    /// Creates an empty registry for `domain`, partitioned by the `scope`
    /// resource.
    pub fn new(domain: &'static str, scope: &'static str) -> Self {
        Self {
            domain,
            scope,
            plugins: Vec::new(),
            externals: Vec::new(),
        }
    }

    /// Appends a plugin.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl ResourcePlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Declares an externally owned resource.
    #[must_use]
    pub fn with_external(mut self, resource: &'static str, allocation: IdAllocation) -> Self {
        self.externals.push((resource, allocation));
        self
    }

    /// Returns the domain name.
    pub fn domain(&self) -> &'static str {
        self.domain
    }

    /// Returns the resource the registry is partitioned by.
    pub fn scope_resource(&self) -> &'static str {
        self.scope
    }

    /// Returns the plugins in run order.
    pub fn plugins(&self) -> impl Iterator<Item = &dyn ResourcePlugin> {
        self.plugins.iter().map(|p| p.as_ref())
    }

    /// Looks up a plugin by resource name.
    pub fn get(&self, name: &str) -> Option<&dyn ResourcePlugin> {
        self.plugins().find(|p| p.name() == name)
    }

    /// Returns the resource names in run order.
    pub fn names(&self) -> Vec<&'static str> {
        self.plugins().map(|p| p.name()).collect()
    }

    /// Returns the number of plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns true if the registry has no plugins.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Registers the mappers an Import through this registry needs.
    pub fn register_mappers(&self, mappers: &mut IdMappers) {
        for plugin in self.plugins() {
            if let Some(allocation) = plugin.identity() {
                mappers.register(plugin.name(), allocation);
            }
        }
        for (resource, allocation) in &self.externals {
            mappers.register(resource, *allocation);
        }
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("domain", &self.domain)
            .field("scope", &self.scope)
            .field("plugins", &self.names())
            .field("externals", &self.externals)
            .finish()
    }
}

/// Checks that registries can run in the given order.
///
/// Resource names must be unique across the catalogue, every registry must
/// share one scope resource that some registry owns, and every reference
/// must point at an external or at an owned resource that runs earlier.
/// Returns the scope resource.
///
/// # Errors
///
/// Returns [`TransferError::Configuration`] describing the first problem.
pub fn validate_catalogue(registries: &[PluginRegistry]) -> TransferResult<&'static str> {
    let Some(first) = registries.first() else {
        return Err(TransferError::Configuration("no registries to run".into()));
    };
    let scope = first.scope_resource();

    let externals: HashSet<&str> = registries
        .iter()
        .flat_map(|r| r.externals.iter().map(|(name, _)| *name))
        .collect();
    let owned: HashSet<&str> = registries.iter().flat_map(|r| r.plugins()).map(|p| p.name()).collect();

    let mut seen = HashSet::new();
    for registry in registries {
        if registry.scope_resource() != scope {
            return Err(TransferError::Configuration(format!(
                "registry {} is scoped by {}, expected {scope}",
                registry.domain(),
                registry.scope_resource()
            )));
        }
        for plugin in registry.plugins() {
            let name = plugin.name();
            if !seen.insert(name) {
                return Err(TransferError::Configuration(format!("duplicate resource {name}")));
            }
            for dep in plugin.dependencies() {
                if externals.contains(dep) {
                    continue;
                }
                if !owned.contains(dep) {
                    return Err(TransferError::Configuration(format!(
                        "{name} references unknown resource {dep}"
                    )));
                }
                if !seen.contains(dep) {
                    return Err(TransferError::Configuration(format!(
                        "{name} runs before its dependency {dep}"
                    )));
                }
            }
        }
    }

    if !owned.contains(scope) {
        return Err(TransferError::Configuration(format!("scope resource {scope} has no plugin")));
    }
    Ok(scope)
}
