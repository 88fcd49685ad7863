//! Opaque holder objects: reference-like runtime handles to build
//! primitives. `HolderRef` is a cheap `Rc<RefCell<dyn HolderObject>>`
//! clone; two `Value::Holder`s compare equal iff they point at the
//! same underlying object, so storing the same dependency in two
//! variables must not fork it into two dependencies.

use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HolderKind {
    Compiler,
    Dependency,
    Target,
    CustomTarget,
    Generator,
    GeneratedList,
    ConfigurationData,
    Environment,
    IncludeDirs,
    FileRef,
    Subproject,
    OptionValue,
    MachineInfo,
    Module,
}

impl HolderKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            HolderKind::Compiler => "compiler",
            HolderKind::Dependency => "dep",
            HolderKind::Target => "target",
            HolderKind::CustomTarget => "custom_tgt",
            HolderKind::Generator => "generator",
            HolderKind::GeneratedList => "generated_list",
            HolderKind::ConfigurationData => "cfg_data",
            HolderKind::Environment => "env",
            HolderKind::IncludeDirs => "inc",
            HolderKind::FileRef => "file",
            HolderKind::Subproject => "subproject",
            HolderKind::OptionValue => "feature",
            HolderKind::MachineInfo => "machine",
            HolderKind::Module => "module",
        }
    }
}

/// A call error raised by a holder's method table: unknown method
/// name, or argument-schema mismatch caught inside the method body
/// rather than by the interpreter's generic schema checker.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodError(pub String);

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MethodError {}

/// Implemented by every concrete holder type (targets, dependencies,
/// compilers, ...). Lives in `graph`/`environment`/`toolchain` so this
/// module stays free of a dependency on those.
pub trait HolderObject: fmt::Debug {
    fn kind(&self) -> HolderKind;

    /// Dispatch a method call. `args` are already schema-checked
    /// positionally by the interpreter's calling convention layer for
    /// methods that registered a schema; holders that need ad hoc
    /// validation (e.g. `configuration_data().get(key, default?)`)
    /// do it here. `named` carries keyword arguments (e.g.
    /// `error_message:`) separately since positional/named are
    /// distinct in the DSL's calling convention.
    fn call_method(&self, method: &str, args: &[Value], named: &IndexMap<String, Value>) -> Result<Value, MethodError>;
}

#[derive(Clone)]
pub struct HolderRef(Rc<RefCell<dyn HolderObject>>);

impl HolderRef {
    pub fn new(obj: impl HolderObject + 'static) -> Self {
        HolderRef(Rc::new(RefCell::new(obj)))
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    pub fn kind(&self) -> HolderKind {
        self.0.borrow().kind()
    }

    pub fn call_method(&self, method: &str, args: &[Value], named: &IndexMap<String, Value>) -> Result<Value, MethodError> {
        self.0.borrow().call_method(method, args, named)
    }

    pub fn with<R>(&self, f: impl FnOnce(&dyn HolderObject) -> R) -> R {
        f(&*self.0.borrow())
    }
}

impl fmt::Debug for HolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HolderRef({:?}#{})", self.kind(), self.id())
    }
}

/// Re-exported for holder implementations that want a short alias.
pub type Holder = dyn HolderObject;
