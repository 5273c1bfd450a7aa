use crate::{
    barrier::{self, Accessor},
    scope::ScopeStore,
    svc,
    wrappers::{self, WrapperRegistry},
    Args, Definition, Done, InjectError, InjectResult, Injection,
    InjectionKind, InjectorBuilder, Module, Scope, ScopedLogger, Svc, Wrapper,
    DONE,
};
use std::{cell::RefCell, collections::HashMap, rc::Rc};

struct InjectorInner {
    injections: RefCell<HashMap<String, Rc<Injection>>>,
    wrappers: RefCell<WrapperRegistry>,
    scopes: ScopeStore,
    logger: ScopedLogger,
    // Synthetic caller context for top-level wrapper lookups.
    root: Rc<Injection>,
}

/// A runtime dependency injection registry keyed by names. It holds the
/// descriptor map, the wrapper map, and the scope store, and orchestrates
/// registration, dependency resolution, invocation, and circular-dependency
/// mitigation.
///
/// Cloning the injector does not clone its registrations. Both handles share
/// the same maps, which is how the built-in `"injector"` wrapper can hand a
/// working handle to factories.
///
/// The registry is intended as process-wide state: created once at startup
/// (see [`Injector::builder()`]), populated during a load phase, then queried
/// on demand for the remainder of the process lifetime. There is no teardown.
///
/// Execution is single-threaded and cooperative. A deferred factory does not
/// run concurrently; it may merely return before producing its result and
/// complete later through its [`Done`] handle, while dependents wait through
/// registered one-shot continuations rather than by blocking.
#[derive(Clone)]
pub struct Injector {
    inner: Rc<InjectorInner>,
}

impl Injector {
    /// Creates a builder for this injector. This is the preferred way of
    /// creating an injector.
    #[must_use]
    pub fn builder() -> InjectorBuilder {
        InjectorBuilder::default()
    }

    /// Creates an empty injector with its built-in wrappers (`"logger"`,
    /// `"injector"`, `"scope"`) already installed. Prefer
    /// [`Injector::builder()`].
    #[must_use]
    pub fn with_name(name: &str) -> Self {
        let logger = ScopedLogger::new(name);
        let mut wrapper_registry = WrapperRegistry::new(logger.clone());
        wrappers::install_builtins(&mut wrapper_registry);

        Injector {
            inner: Rc::new(InjectorInner {
                injections: RefCell::new(HashMap::new()),
                wrappers: RefCell::new(wrapper_registry),
                scopes: ScopeStore::default(),
                logger,
                root: Rc::new(Injection::new(name, Definition::data(()))),
            }),
        }
    }

    /// The injector's root logging handle. Wrapper-provided loggers are
    /// children of this one.
    #[must_use]
    pub fn logger(&self) -> &ScopedLogger {
        &self.inner.logger
    }

    /// Returns the persistent bag for `name`, creating an empty one on first
    /// access.
    #[must_use]
    pub fn scope(&self, name: &str) -> Scope {
        self.inner.scopes.get(name)
    }

    /// Binds this injector to a caller context. The built-in `"injector"`
    /// wrapper uses this to give factories a handle that resolves further
    /// names at call time.
    #[must_use]
    pub fn bind(&self, context: Rc<Injection>) -> BoundInjector {
        BoundInjector {
            injector: self.clone(),
            context,
        }
    }

    /// Registers a resolver under a wrapper name. The wrapper namespace is
    /// append-only and first-write-wins: a duplicate registration is logged,
    /// ignored, and reported as `false`. Registration behavior for the name
    /// is unchanged by the rejected attempt.
    pub fn register_wrapper<F>(&self, name: &str, wrapper: F) -> bool
    where
        F: Fn(&Injector, &Rc<Injection>) -> InjectResult<Svc> + 'static,
    {
        self.register_wrapper_rc(name, Rc::new(wrapper))
    }

    pub(crate) fn register_wrapper_rc(
        &self,
        name: &str,
        wrapper: Wrapper,
    ) -> bool {
        self.inner.wrappers.borrow_mut().register(name, wrapper)
    }

    /// Registers every definition in a module, then runs the module's tasks.
    ///
    /// Data values and factories are stored into the descriptor map under
    /// their names, available for later lookup. Registering a duplicate name
    /// replaces the previous descriptor (last write wins; the replacement is
    /// logged). Tasks are not stored; once the whole batch is classified they
    /// are invoked in the order they appeared, for side effects only. The
    /// first task resolution error aborts registration with that error.
    pub fn register(&self, module: Module) -> InjectResult<()> {
        let mut exec_queue = Vec::new();
        for (name, definition) in module {
            let injection = Rc::new(Injection::new(name, definition));
            match injection.kind() {
                InjectionKind::Task => exec_queue.push(injection),
                _ => {
                    let replaced = self
                        .inner
                        .injections
                        .borrow_mut()
                        .insert(injection.name().to_owned(), injection);
                    if let Some(previous) = replaced {
                        self.inner.logger.warn(&format!(
                            "descriptor \"{}\" registered twice; the last registration wins",
                            previous.name()
                        ));
                    }
                }
            }
        }

        for task in exec_queue {
            self.invoke(&task, &[])?;
            // Tasks have no outward consumer, so a synchronously failed task
            // would otherwise go unnoticed.
            task.try_result()?;
        }
        Ok(())
    }

    /// Resolves a name registered in the injector.
    ///
    /// A wrapper registered under the name takes priority: it is called with
    /// a synthetic top-level context and its value returned. Otherwise the
    /// named descriptor is invoked (running its factory if it has never run
    /// before) and its memoized result returned: `Ok(Some(_))` once complete,
    /// `Ok(None)` while a deferred completion is still pending, or the error
    /// that failed its resolution. Names with neither a wrapper nor a
    /// descriptor fail with [`InjectError::UnknownName`].
    ///
    /// ## Example
    ///
    /// ```
    /// use named_injector::{cast, define_module, svc, Injector};
    ///
    /// let mut builder = Injector::builder();
    /// builder.add_module(define_module! {
    ///     greeting = data("hi".to_string()),
    ///     shout = factory(["greeting"], |args| {
    ///         let greeting = args.get::<String>(0)?;
    ///         Ok(svc(format!("{}!", greeting.to_uppercase())))
    ///     }),
    /// });
    ///
    /// let injector = builder.build().unwrap();
    /// let shout = injector.lookup("shout").unwrap().unwrap();
    /// assert_eq!("HI!", cast::<String>(&shout).unwrap().as_str());
    /// ```
    pub fn lookup(&self, name: &str) -> InjectResult<Option<Svc>> {
        self.lookup_from(&self.inner.root, name)
    }

    /// Registers a continuation to fire with the resolved value (or the
    /// error that prevented it) once `name` resolves. The continuation fires
    /// synchronously if the name already resolves immediately; a deferred
    /// descriptor fires it on completion. Each continuation fires exactly
    /// once.
    pub fn on_ready<F>(&self, name: &str, continuation: F) -> InjectResult<()>
    where
        F: FnOnce(InjectResult<Svc>) + 'static,
    {
        let wrapper = self.inner.wrappers.borrow().get(name);
        if let Some(wrapper) = wrapper {
            continuation(wrapper(self, &self.inner.root));
            return Ok(());
        }

        let injection = self.descriptor(name).ok_or_else(|| {
            InjectError::UnknownName {
                name: name.to_owned(),
            }
        })?;
        self.invoke(&injection, &[])?;
        injection.on_ready(Box::new(continuation));
        Ok(())
    }

    pub(crate) fn lookup_from(
        &self,
        caller: &Rc<Injection>,
        name: &str,
    ) -> InjectResult<Option<Svc>> {
        let wrapper = self.inner.wrappers.borrow().get(name);
        if let Some(wrapper) = wrapper {
            return wrapper(self, caller).map(Some);
        }

        let injection = self.descriptor(name).ok_or_else(|| {
            InjectError::UnknownName {
                name: name.to_owned(),
            }
        })?;
        // The caller's own dependency list seeds the ancestry so that a
        // lookup made from inside a factory still detects cycles through it.
        let ancestry = caller.dependencies().to_vec();
        self.invoke(&injection, &ancestry)?;
        injection.try_result()
    }

    fn descriptor(&self, name: &str) -> Option<Rc<Injection>> {
        self.inner.injections.borrow().get(name).cloned()
    }

    /// The core resolution algorithm. `ancestry` is the sequence of
    /// descriptor names currently being resolved on the call stack.
    fn invoke(
        &self,
        injection: &Rc<Injection>,
        ancestry: &[String],
    ) -> InjectResult<()> {
        // Memoization: a factory runs at most once for the lifetime of the
        // registry, even while its deferred completion is still pending.
        if !injection.mark_started() {
            return Ok(());
        }

        let mut accessors = Vec::with_capacity(injection.dependencies().len());
        for dependency in injection.dependencies() {
            match self.accessor_for(injection, dependency, ancestry) {
                Ok(accessor) => accessors.push(accessor),
                Err(error) => {
                    injection.complete(Err(error.clone()));
                    return Err(error);
                }
            }
        }

        let Some(factory) = injection.factory() else {
            // Data descriptors are complete at construction and never get
            // here; a missing factory on any other kind is a bug.
            let error = InjectError::InternalError(format!(
                "descriptor \"{}\" has no factory",
                injection.name()
            ));
            injection.complete(Err(error.clone()));
            return Err(error);
        };

        let injection = Rc::clone(injection);
        barrier::join(accessors, move |arguments| match arguments {
            Err(error) => injection.complete(Err(error)),
            Ok(values) => {
                let outcome = factory(Args::new(values));
                match outcome {
                    // A deferred factory completes through its `Done` handle
                    // instead; its return value is discarded.
                    Ok(_) if injection.kind() == InjectionKind::Deferred => {}
                    result => injection.complete(result),
                }
            }
        });
        Ok(())
    }

    /// Resolves one declared dependency name into an accessor.
    fn accessor_for(
        &self,
        current: &Rc<Injection>,
        dependency: &str,
        ancestry: &[String],
    ) -> InjectResult<Accessor> {
        // Deferred factories receive their completion handle through the
        // reserved name.
        if current.kind() == InjectionKind::Deferred && dependency == DONE {
            let done = svc(Done::new(Rc::clone(current)));
            return Ok(Box::new(move |callback| callback(Ok(done))));
        }

        let wrapper = self.inner.wrappers.borrow().get(dependency);
        if let Some(wrapper) = wrapper {
            let injector = self.clone();
            let context = Rc::clone(current);
            return Ok(Box::new(move |callback| {
                callback(wrapper(&injector, &context));
            }));
        }

        let target = self.descriptor(dependency).ok_or_else(|| {
            InjectError::MissingDependency {
                dependency: dependency.to_owned(),
                requester: current.name().to_owned(),
            }
        })?;

        if ancestry.iter().any(|name| name == target.name()) {
            // A cycle. Fall back to waiting on the target without
            // re-invoking it. This avoids unbounded recursion but does not
            // guarantee the cycle ever resolves; a genuine cycle among
            // factories that all need each other's results stays pending.
            self.inner.logger.error(&format!(
                "circular dependency detected: \"{}\" -> \"{}\"",
                current.name(),
                target.name()
            ));
            return Ok(target.ready_accessor());
        }

        let mut extended = ancestry.to_vec();
        extended.push(current.name().to_owned());
        self.invoke(&target, &extended)?;
        Ok(target.ready_accessor())
    }
}

/// An injector handle pre-bound to a caller context, produced by the
/// built-in `"injector"` wrapper. It lets a factory pull further named
/// dependencies at call time rather than through its declared list.
#[derive(Clone)]
pub struct BoundInjector {
    injector: Injector,
    context: Rc<Injection>,
}

impl BoundInjector {
    /// Resolves a name, extending cycle-detection ancestry from the bound
    /// caller context. See [`Injector::lookup`].
    pub fn lookup(&self, name: &str) -> InjectResult<Option<Svc>> {
        self.injector.lookup_from(&self.context, name)
    }

    /// The descriptor this handle was bound to.
    #[must_use]
    pub fn context(&self) -> &Rc<Injection> {
        &self.context
    }
}
