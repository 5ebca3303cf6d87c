use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::rc::Rc;

use ecow::EcoString;
use tracing::debug;

use crate::eval::EvalError;
use crate::value::Value;

/// State of a name inside a single frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
  /// Declared by the first step of `define`, not assigned yet.
  Unassigned,
  Assigned(Value),
}

/// One frame of the lexical scope chain.
///
/// Frames are shared through `Rc`: every closure created while a frame is
/// current keeps it alive and sees later mutations made through it.
pub struct Environment {
  bindings: RefCell<HashMap<EcoString, Binding>>,
  parent: Option<Rc<Environment>>,
}

impl Environment {
  /// Create a root frame with no parent.
  pub fn new() -> Rc<Self> {
    Rc::new(Self {
      bindings: RefCell::new(HashMap::new()),
      parent: None,
    })
  }

  pub fn parent(&self) -> Option<&Rc<Environment>> {
    self.parent.as_ref()
  }

  /// Resolve `name` in this frame or the nearest enclosing frame that binds it.
  pub fn lookup(&self, name: &str) -> Result<Value, EvalError> {
    match self.bindings.borrow().get(name) {
      Some(Binding::Assigned(value)) => return Ok(value.clone()),
      Some(Binding::Unassigned) => return Err(EvalError::UnassignedSymbol(name.into())),
      None => {}
    }

    match &self.parent {
      Some(parent) => parent.lookup(name),
      None => Err(EvalError::UnboundSymbol(name.into())),
    }
  }

  /// Bind `name` in this frame. Shadowing a parent binding is fine,
  /// rebinding a name of this frame is not.
  pub fn define(&self, name: impl Into<EcoString>, value: Value) -> Result<(), EvalError> {
    self.bind(name.into(), Binding::Assigned(value))
  }

  /// Bind `name` in this frame without a value.
  pub fn declare(&self, name: impl Into<EcoString>) -> Result<(), EvalError> {
    self.bind(name.into(), Binding::Unassigned)
  }

  /// Drop the placeholder `declare` left for `name`. Assigned bindings stay.
  pub fn undeclare(&self, name: &str) {
    let mut bindings = self.bindings.borrow_mut();
    if matches!(bindings.get(name), Some(Binding::Unassigned)) {
      bindings.remove(name);
    }
  }

  fn bind(&self, name: EcoString, binding: Binding) -> Result<(), EvalError> {
    match self.bindings.borrow_mut().entry(name) {
      Entry::Occupied(entry) => Err(EvalError::DuplicateDefinition(entry.key().clone())),
      Entry::Vacant(entry) => {
        debug!(name = %entry.key(), "define");
        entry.insert(binding);
        Ok(())
      }
    }
  }

  /// Overwrite the nearest existing binding of `name`. Never creates one.
  pub fn mutate(&self, name: &str, value: Value) -> Result<(), EvalError> {
    if let Some(slot) = self.bindings.borrow_mut().get_mut(name) {
      *slot = Binding::Assigned(value);
      return Ok(());
    }

    match &self.parent {
      Some(parent) => parent.mutate(name, value),
      None => Err(EvalError::UnboundSymbol(name.into())),
    }
  }

  /// Create an empty child frame of `self`.
  pub fn child(self: &Rc<Self>) -> Rc<Environment> {
    Rc::new(Self {
      bindings: RefCell::new(HashMap::new()),
      parent: Some(Rc::clone(self)),
    })
  }

  /// Create a child frame of `self` holding `bindings`.
  pub fn extend(
    self: &Rc<Self>,
    bindings: impl IntoIterator<Item = (EcoString, Value)>,
  ) -> Result<Rc<Environment>, EvalError> {
    let child = self.child();

    for (name, value) in bindings {
      child.define(name, value)?;
    }

    Ok(child)
  }

  pub fn is_defined_locally(&self, name: &str) -> bool {
    self.bindings.borrow().contains_key(name)
  }

  /// Names bound in this frame, sorted.
  pub fn names(&self) -> Vec<EcoString> {
    let mut names: Vec<EcoString> = self.bindings.borrow().keys().cloned().collect();
    names.sort();
    names
  }
}

impl fmt::Debug for Environment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Environment")
      .field("names", &self.names())
      .field("has_parent", &self.parent.is_some())
      .finish()
  }
}
