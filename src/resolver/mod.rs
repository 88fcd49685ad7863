//! Dependency Resolver: the ordered strategy chain `dependency(name,
//! ...)` walks. Overrides registered via
//! `meson.override_dependency(name, dep)` are consulted first and
//! never re-run a strategy; the remaining strategies are owned by
//! [`strategies`]. The fallback-subproject strategy is deliberately
//! **not** implemented here: entering a subproject needs the
//! interpreter's own scope/evaluator, so `interpreter::builtins`
//! drives that step itself after this resolver reports not-found.

pub mod strategies;
pub mod types;

pub use types::{DependencySpec, IncludeType, Machine, RequiredSpec};

use crate::environment::Environment;
use crate::graph::Dependency;
use indexmap::IndexMap;
use strategies::Strategy;

#[derive(Debug, Default)]
pub struct Resolver {
    overrides: IndexMap<String, Dependency>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn override_dependency(&mut self, name: impl Into<String>, dep: Dependency) {
        self.overrides.insert(name.into(), dep);
    }

    /// Walks override -> package-info -> framework -> cmake -> system,
    /// stopping at the first strategy that finds something, or
    /// honoring `method:` if the spec pins the chain to exactly one.
    pub async fn resolve(&self, spec: &DependencySpec, env: &Environment) -> Option<Dependency> {
        if let Some(dep) = self.overrides.get(&spec.name) {
            return Some(dep.clone());
        }

        let chain: Vec<Box<dyn Strategy>> = vec![
            Box::new(strategies::PackageInfoStrategy),
            Box::new(strategies::FrameworkStrategy),
            Box::new(strategies::CmakeExportStrategy),
            Box::new(strategies::SystemStrategy),
        ];

        for strategy in &chain {
            if let Some(method) = &spec.method {
                if strategy.name() != method {
                    continue;
                }
            }
            if let Some(dep) = strategy.try_resolve(spec, env).await {
                return Some(dep);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MachineInfo;

    fn env() -> Environment {
        Environment::native(MachineInfo::host_native())
    }

    #[tokio::test]
    async fn override_short_circuits_the_chain() {
        let mut resolver = Resolver::new();
        resolver.override_dependency("foo", Dependency::found("foo", "1.0", vec![], vec![]));
        let spec = DependencySpec::new("foo");
        let dep = resolver.resolve(&spec, &env()).await.unwrap();
        assert_eq!(dep.name, "foo");
        assert!(dep.found);
    }

    #[tokio::test]
    async fn unknown_dependency_with_no_override_is_not_found() {
        let resolver = Resolver::new();
        let spec = DependencySpec::new("definitely-not-a-real-package-xyz");
        assert!(resolver.resolve(&spec, &env()).await.is_none());
    }

    #[tokio::test]
    async fn method_pins_to_a_single_strategy() {
        let resolver = Resolver::new();
        let mut spec = DependencySpec::new("foo");
        spec.method = Some("cmake".to_string());
        assert!(resolver.resolve(&spec, &env()).await.is_none());
    }
}
