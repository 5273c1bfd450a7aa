use crate::{
    barrier::{Accessor, Callback},
    svc, Args, InjectError, InjectResult, Svc,
};
use std::{
    cell::RefCell,
    fmt::{Debug, Formatter},
    rc::Rc,
};
use tracing::debug;

/// The reserved dependency name through which a deferred factory receives its
/// completion handle ([`Done`]). It is special-cased only for
/// [`InjectionKind::Deferred`] descriptors.
pub const DONE: &str = "done";

/// A factory callable. It receives its resolved dependencies in declared
/// order and either produces a value or reports an error.
pub type Factory = Rc<dyn Fn(Args) -> InjectResult<Svc>>;

/// How a named definition is classified by the registry.
///
/// The kind is an explicit tag carried by the [`Definition`]; it is never
/// inferred from how the factory happens to be written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum InjectionKind {
    /// A plain value, complete as soon as it is registered.
    Data,

    /// A synchronous factory whose return value is its result.
    Factory,

    /// A factory that completes later through its [`Done`] handle rather
    /// than through its return value.
    Deferred,

    /// A one-shot task run at registration time for its side effects, never
    /// stored by name.
    Task,
}

/// A named definition handed to the registry: a plain value or a factory
/// tagged with its kind and its explicit, ordered dependency names.
#[derive(Clone)]
pub enum Definition {
    /// A plain value.
    Data(Svc),

    /// A synchronous factory.
    Factory {
        /// The ordered names this factory depends on.
        dependencies: Vec<String>,

        /// The callable invoked with the resolved dependencies.
        factory: Factory,
    },

    /// A deferred factory. Its dependency list usually includes the reserved
    /// [`DONE`] name so the factory can signal its own completion.
    Deferred {
        /// The ordered names this factory depends on.
        dependencies: Vec<String>,

        /// The callable invoked with the resolved dependencies.
        factory: Factory,
    },

    /// A one-shot executable task.
    Task {
        /// The ordered names this task depends on.
        dependencies: Vec<String>,

        /// The callable invoked with the resolved dependencies.
        factory: Factory,
    },
}

impl Definition {
    /// Creates a plain value definition.
    pub fn data(value: impl crate::Service) -> Self {
        Definition::Data(svc(value))
    }

    /// Creates a synchronous factory definition with an explicit dependency
    /// list.
    pub fn factory<F>(dependencies: &[&str], factory: F) -> Self
    where
        F: Fn(Args) -> InjectResult<Svc> + 'static,
    {
        Definition::Factory {
            dependencies: owned(dependencies),
            factory: Rc::new(factory),
        }
    }

    /// Creates a deferred factory definition. Include [`DONE`] in the
    /// dependency list to receive the completion handle.
    pub fn deferred<F>(dependencies: &[&str], factory: F) -> Self
    where
        F: Fn(Args) -> InjectResult<Svc> + 'static,
    {
        Definition::Deferred {
            dependencies: owned(dependencies),
            factory: Rc::new(factory),
        }
    }

    /// Creates an executable task definition.
    pub fn task<F>(dependencies: &[&str], factory: F) -> Self
    where
        F: Fn(Args) -> InjectResult<Svc> + 'static,
    {
        Definition::Task {
            dependencies: owned(dependencies),
            factory: Rc::new(factory),
        }
    }

    /// The kind this definition is classified as.
    #[must_use]
    pub fn kind(&self) -> InjectionKind {
        match self {
            Definition::Data(_) => InjectionKind::Data,
            Definition::Factory { .. } => InjectionKind::Factory,
            Definition::Deferred { .. } => InjectionKind::Deferred,
            Definition::Task { .. } => InjectionKind::Task,
        }
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

struct InjectionState {
    result: Option<InjectResult<Svc>>,
    waiters: Vec<Callback>,
    started: bool,
}

/// The registry's record for one named injectable thing.
///
/// A descriptor owns a promise-like result cell: it transitions from
/// incomplete to completed at most once, the stored result (value or error)
/// is immutable once set, and any number of independent waiters observe the
/// result exactly once each, in registration order.
pub struct Injection {
    name: String,
    kind: InjectionKind,
    dependencies: Vec<String>,
    factory: Option<Factory>,
    state: RefCell<InjectionState>,
}

impl Injection {
    pub(crate) fn new(name: impl Into<String>, definition: Definition) -> Self {
        let name = name.into();
        let kind = definition.kind();
        let (dependencies, factory, result) = match definition {
            Definition::Data(value) => (Vec::new(), None, Some(Ok(value))),
            Definition::Factory {
                dependencies,
                factory,
            }
            | Definition::Deferred {
                dependencies,
                factory,
            }
            | Definition::Task {
                dependencies,
                factory,
            } => (dependencies, Some(factory), None),
        };

        Injection {
            name,
            kind,
            dependencies,
            factory,
            state: RefCell::new(InjectionState {
                started: result.is_some(),
                result,
                waiters: Vec::new(),
            }),
        }
    }

    /// The unique name this descriptor is registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind this descriptor was classified as.
    #[must_use]
    pub fn kind(&self) -> InjectionKind {
        self.kind
    }

    /// The ordered dependency names declared by the factory. Empty for
    /// [`InjectionKind::Data`].
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether the descriptor's result (value or error) has been produced.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state.borrow().result.is_some()
    }

    pub(crate) fn factory(&self) -> Option<Factory> {
        self.factory.clone()
    }

    /// Marks the descriptor's resolution as begun. Returns `false` if it had
    /// already begun, which is how the engine guarantees a factory runs at
    /// most once.
    pub(crate) fn mark_started(&self) -> bool {
        let mut state = self.state.borrow_mut();
        if state.started {
            false
        } else {
            state.started = true;
            true
        }
    }

    /// Completes the descriptor, notifying every current waiter in
    /// registration order. Completion is monotone: a second attempt is
    /// ignored and logged.
    pub(crate) fn complete(&self, result: InjectResult<Svc>) {
        let waiters = {
            let mut state = self.state.borrow_mut();
            if state.result.is_some() {
                drop(state);
                debug!(
                    name = %self.name,
                    "descriptor completed more than once; keeping the first result"
                );
                return;
            }
            state.started = true;
            state.result = Some(result.clone());
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            waiter(result.clone());
        }
    }

    /// Registers a continuation to fire once the descriptor completes. Fires
    /// synchronously if it already has.
    pub(crate) fn on_ready(&self, callback: Callback) {
        let ready = self.state.borrow().result.clone();
        match ready {
            Some(result) => callback(result),
            None => self.state.borrow_mut().waiters.push(callback),
        }
    }

    /// An accessor that delivers this descriptor's result to a continuation
    /// once it is available.
    pub(crate) fn ready_accessor(self: &Rc<Self>) -> Accessor {
        let injection = Rc::clone(self);
        Box::new(move |callback| injection.on_ready(callback))
    }

    /// The current contents of the result cell: `Ok(Some(_))` when complete,
    /// `Ok(None)` while still pending, `Err(_)` when resolution failed.
    pub(crate) fn try_result(&self) -> InjectResult<Option<Svc>> {
        match &self.state.borrow().result {
            None => Ok(None),
            Some(Ok(value)) => Ok(Some(value.clone())),
            Some(Err(error)) => Err(error.clone()),
        }
    }
}

impl Debug for Injection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Injection")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("dependencies", &self.dependencies)
            .field("completed", &self.is_completed())
            .finish_non_exhaustive()
    }
}

/// The completion handle handed to a deferred factory through the reserved
/// [`DONE`] dependency. Calling it completes the descriptor the factory was
/// registered under; only the first call has any effect.
#[derive(Clone, Debug)]
pub struct Done {
    injection: Rc<Injection>,
}

impl Done {
    pub(crate) fn new(injection: Rc<Injection>) -> Self {
        Done { injection }
    }

    /// Completes the descriptor with a value.
    pub fn succeed(&self, value: Svc) {
        self.injection.complete(Ok(value));
    }

    /// Completes the descriptor with an error. The error is fatal to every
    /// resolution chain waiting on this descriptor; there is no retry.
    pub fn fail(&self, error: impl std::error::Error + 'static) {
        self.injection.complete(Err(InjectError::activation_failed(
            self.injection.name(),
            error,
        )));
    }
}
