use crate::{svc, InjectResult, Injection, Injector, ScopedLogger, Svc};
use std::{collections::HashMap, rc::Rc};

/// A privileged resolver consulted before named descriptors.
///
/// Wrappers provide framework capabilities (contextual logger, recursive
/// injector handle, scoped storage) and are called synchronously with the
/// descriptor currently being resolved as context.
pub type Wrapper = Rc<dyn Fn(&Injector, &Rc<Injection>) -> InjectResult<Svc>>;

/// The wrapper namespace: append-only, first-write-wins.
pub(crate) struct WrapperRegistry {
    wrappers: HashMap<String, Wrapper>,
    logger: ScopedLogger,
}

impl WrapperRegistry {
    pub fn new(logger: ScopedLogger) -> Self {
        WrapperRegistry {
            wrappers: HashMap::new(),
            logger,
        }
    }

    /// Stores `wrapper` under `name` unless one is already present. A
    /// duplicate registration is logged and ignored; `false` reports the
    /// rejection.
    pub fn register(&mut self, name: &str, wrapper: Wrapper) -> bool {
        if self.wrappers.contains_key(name) {
            self.logger
                .error(&format!("wrapper \"{name}\" already registered"));
            false
        } else {
            self.wrappers.insert(name.to_owned(), wrapper);
            true
        }
    }

    pub fn get(&self, name: &str) -> Option<Wrapper> {
        self.wrappers.get(name).cloned()
    }
}

/// Installs the built-in wrappers. This runs before any user wrapper or
/// descriptor registration, so user code can never shadow a capability and a
/// duplicate attempt is reported instead.
pub(crate) fn install_builtins(registry: &mut WrapperRegistry) {
    registry.register(
        "logger",
        Rc::new(|injector: &Injector, context: &Rc<Injection>| {
            Ok(svc(injector.logger().child(context.name())))
        }),
    );

    registry.register(
        "injector",
        Rc::new(|injector: &Injector, context: &Rc<Injection>| {
            Ok(svc(injector.bind(Rc::clone(context))))
        }),
    );

    registry.register(
        "scope",
        Rc::new(|injector: &Injector, context: &Rc<Injection>| {
            Ok(svc(injector.scope(context.name())))
        }),
    );
}
