//! Typed option store: built-in/project/subproject options, scoped
//! per-machine via a `build.` prefix, with a defined precedence chain
//! (persisted file -> command line -> environment) and reconfiguration
//! semantics. Grounded in the flat name/getter table style of
//! `legacy_src/interpreter/helpers/shellopts.rs`, generalized from a
//! fixed bash-option set to an open, project-declared option set.

mod feature;
mod types;

pub use feature::{FeatureState, FeatureValue};
pub use types::{Machine, Option, OptionEnvPolicy, OptionError, OptionSource, OptionSpec, OptionType, OptionValue};

use crate::value::{HolderRef, Value};
use indexmap::IndexMap;

/// Every option is declared once, shared by both machines. A
/// `build.`-prefixed name routes to a separate build-machine override
/// table: until a cross build explicitly sets `build.<name>`, reading
/// it falls back to the shared declared value, but once set the two
/// are tracked independently so `build.c_args` and `c_args` can hold
/// distinct values at once.
#[derive(Debug, Default)]
pub struct OptionStore {
    options: IndexMap<String, Option>,
    build_overrides: IndexMap<String, Option>,
}

impl OptionStore {
    pub fn new() -> Self {
        Self { options: IndexMap::new(), build_overrides: IndexMap::new() }
    }

    /// Register a project- or built-in-declared option with its type
    /// and default. Re-registering an existing name is an error:
    /// projects declare each option exactly once.
    pub fn declare(&mut self, spec: OptionSpec) -> Result<(), OptionError> {
        if self.options.contains_key(&spec.name) {
            return Err(OptionError::AlreadyDeclared(spec.name));
        }
        let value = spec.default.clone();
        self.options.insert(
            spec.name.clone(),
            Option {
                name: spec.name,
                ty: spec.ty,
                value,
                source: OptionSource::Default,
                env_policy: spec.env_policy,
                description: spec.description,
            },
        );
        Ok(())
    }

    /// Apply a persisted option snapshot from a previous configure,
    /// loaded before command-line/environment overlays so that
    /// `-Doption=value` and first-configuration env vars still win.
    /// Keys previously persisted under a `build.` prefix are restored
    /// into the build-machine override table, not the shared map.
    pub fn load_persisted(&mut self, persisted: IndexMap<String, OptionValue>) {
        for (name, value) in persisted {
            let (bare, machine) = self.resolve_name(&name);
            match machine {
                Machine::Host => {
                    if let Some(opt) = self.options.get_mut(bare) {
                        opt.value = value;
                        opt.source = OptionSource::ReconfigurePreserved;
                    }
                }
                Machine::Build => {
                    if let Some(base) = self.options.get(bare) {
                        let mut opt = base.clone();
                        opt.value = value;
                        opt.source = OptionSource::ReconfigurePreserved;
                        self.build_overrides.insert(bare.to_string(), opt);
                    }
                }
            }
        }
    }

    /// `-Dname=value` command-line overrides, including
    /// `-Dbuild.name=value` for cross builds, which is stored as a
    /// build-machine override distinct from the host value. Per the
    /// Open Question resolution in DESIGN.md: single-valued built-ins
    /// are replaced outright; list-valued (`string-array`) options are
    /// replaced when the flag targets the global name and appended to
    /// when it targets a target-local flag-style alias (the latter is
    /// routed through `set_target_local_append` by the interpreter,
    /// not this method, since the store has no notion of "which
    /// target").
    pub fn set_from_cli(&mut self, name: &str, raw: &str) -> Result<(), OptionError> {
        self.set_typed(name, raw, OptionSource::CommandLine, None)
    }

    /// Environment-derived option seeding. Only consulted on the
    /// initial configuration unless the option's [`types::OptionEnvPolicy`]
    /// is `Always` (e.g. `DESTDIR`); `CC`/`CFLAGS`-style compiler
    /// options are `InitialOnly` so a later bare reconfigure does not
    /// silently pick up a changed shell environment.
    pub fn set_from_env(&mut self, name: &str, raw: &str, is_initial_configure: bool) -> Result<(), OptionError> {
        self.set_typed(name, raw, OptionSource::Environment, Some(is_initial_configure))
    }

    fn set_typed(
        &mut self,
        name: &str,
        raw: &str,
        source: OptionSource,
        is_initial_configure: std::option::Option<bool>,
    ) -> Result<(), OptionError> {
        let (bare, machine) = self.resolve_name(name);
        let bare = bare.to_string();
        let declared =
            self.options.get(&bare).ok_or_else(|| OptionError::UnknownOption(name.to_string()))?.clone();
        if let Some(is_initial) = is_initial_configure {
            if !is_initial && declared.env_policy == types::OptionEnvPolicy::InitialOnly {
                return Ok(());
            }
        }
        let value = declared.ty.parse(raw).map_err(|e| OptionError::InvalidValue(name.to_string(), e))?;
        match machine {
            Machine::Host => {
                let opt = self.options.get_mut(&bare).expect("checked above");
                opt.value = value;
                opt.source = source;
            }
            Machine::Build => {
                let mut opt = declared;
                opt.value = value;
                opt.source = source;
                self.build_overrides.insert(bare, opt);
            }
        }
        Ok(())
    }

    /// Splits a `build.`-prefixed name into its bare form and the
    /// machine it targets.
    fn resolve_name<'a>(&self, name: &'a str) -> (&'a str, Machine) {
        match name.strip_prefix("build.") {
            Some(rest) => (rest, Machine::Build),
            None => (name, Machine::Host),
        }
    }

    /// `get_option(name)` as called from DSL code: returns the typed
    /// `Value`, or for `feature`-typed options a tri-state holder.
    /// `build.<name>` reads the build-machine override if one has been
    /// set, falling back to the shared declared value otherwise.
    pub fn get_option(&self, name: &str) -> Result<Value, OptionError> {
        let opt = self.get(name).ok_or_else(|| OptionError::UnknownOption(name.to_string()))?;
        Ok(match &opt.value {
            OptionValue::Feature(state) => Value::Holder(HolderRef::new(FeatureValue::new(*state))),
            other => other.to_value(),
        })
    }

    pub fn get(&self, name: &str) -> std::option::Option<&Option> {
        let (bare, machine) = self.resolve_name(name);
        match machine {
            Machine::Host => self.options.get(bare),
            Machine::Build => self.build_overrides.get(bare).or_else(|| self.options.get(bare)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Option> {
        self.options.values()
    }

    /// Snapshot suitable for atomic persistence to the build directory
    /// at the end of a successful configure. Build-machine overrides
    /// are persisted under their `build.`-prefixed key alongside the
    /// host entries.
    pub fn snapshot(&self) -> IndexMap<String, OptionValue> {
        let mut out: IndexMap<String, OptionValue> =
            self.options.iter().map(|(k, v)| (k.clone(), v.value.clone())).collect();
        for (k, v) in &self.build_overrides {
            out.insert(format!("build.{k}"), v.value.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bool_spec(name: &str, default: bool) -> OptionSpec {
        OptionSpec {
            name: name.to_string(),
            ty: OptionType::Bool,
            default: OptionValue::Bool(default),
            env_policy: types::OptionEnvPolicy::Always,
            description: String::new(),
        }
    }

    #[test]
    fn declare_then_get() {
        let mut store = OptionStore::new();
        store.declare(bool_spec("werror", false)).unwrap();
        assert_eq!(store.get_option("werror").unwrap(), Value::Bool(false));
    }

    #[test]
    fn duplicate_declare_errors() {
        let mut store = OptionStore::new();
        store.declare(bool_spec("werror", false)).unwrap();
        assert!(matches!(store.declare(bool_spec("werror", true)), Err(OptionError::AlreadyDeclared(_))));
    }

    #[test]
    fn cli_override_wins_over_default() {
        let mut store = OptionStore::new();
        store.declare(bool_spec("werror", false)).unwrap();
        store.set_from_cli("werror", "true").unwrap();
        assert_eq!(store.get_option("werror").unwrap(), Value::Bool(true));
        assert_eq!(store.get("werror").unwrap().source, OptionSource::CommandLine);
    }

    #[test]
    fn build_prefix_override_is_distinct_from_host_value() {
        let mut store = OptionStore::new();
        store.declare(OptionSpec {
            name: "c_args".to_string(),
            ty: OptionType::StringArray,
            default: OptionValue::StringArray(Vec::new()),
            env_policy: types::OptionEnvPolicy::InitialOnly,
            description: String::new(),
        })
        .unwrap();
        store.set_from_cli("c_args", "-DFOR_HOST").unwrap();
        store.set_from_cli("build.c_args", "-DFOR_BUILD").unwrap();
        assert_eq!(store.get_option("c_args").unwrap(), Value::List(vec![Value::Str("-DFOR_HOST".to_string())]));
        assert_eq!(
            store.get_option("build.c_args").unwrap(),
            Value::List(vec![Value::Str("-DFOR_BUILD".to_string())])
        );
    }

    #[test]
    fn build_prefix_falls_back_to_host_value_until_overridden() {
        let mut store = OptionStore::new();
        store.declare(bool_spec("werror", false)).unwrap();
        store.set_from_cli("werror", "true").unwrap();
        assert_eq!(store.get_option("build.werror").unwrap(), Value::Bool(true));
    }

    #[test]
    fn unknown_option_errors() {
        let store = OptionStore::new();
        assert!(matches!(store.get_option("nope"), Err(OptionError::UnknownOption(_))));
    }

    #[test]
    fn initial_only_env_policy_skips_on_reconfigure() {
        let mut store = OptionStore::new();
        store.declare(OptionSpec {
            name: "cc_extra".to_string(),
            ty: OptionType::Str,
            default: OptionValue::Str(String::new()),
            env_policy: types::OptionEnvPolicy::InitialOnly,
            description: String::new(),
        })
        .unwrap();
        store.set_from_env("cc_extra", "-O3", false).unwrap();
        assert_eq!(store.get_option("cc_extra").unwrap(), Value::Str(String::new()));
        store.set_from_env("cc_extra", "-O3", true).unwrap();
        assert_eq!(store.get_option("cc_extra").unwrap(), Value::Str("-O3".to_string()));
    }
}
