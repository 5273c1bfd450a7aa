use crate::{InjectResult, Injection, Injector, Module, Svc, Wrapper};
use std::rc::Rc;

/// A builder for an [`Injector`].
///
/// The builder fixes the initialization order the registry relies on: when
/// [`build`](InjectorBuilder::build) runs, the built-in wrappers are
/// installed first, then user wrappers, and only then are the collected
/// modules registered (which runs their tasks). Every wrapper is therefore
/// registered before any lookup can happen.
#[derive(Default)]
pub struct InjectorBuilder {
    name: Option<String>,
    modules: Vec<Module>,
    wrappers: Vec<(String, Wrapper)>,
}

impl InjectorBuilder {
    /// Names the injector. The name becomes the root logging scope and the
    /// name of the synthetic top-level caller context. Defaults to `"main"`.
    pub fn with_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a module's definitions. Modules are registered in the order they
    /// were added.
    pub fn add_module(&mut self, module: Module) {
        self.modules.push(module);
    }

    /// Queues a wrapper registration. Duplicate names follow the wrapper
    /// namespace rules: first write wins, later attempts are logged and
    /// ignored.
    pub fn provide_wrapper<F>(&mut self, name: impl Into<String>, wrapper: F)
    where
        F: Fn(&Injector, &Rc<Injection>) -> InjectResult<Svc> + 'static,
    {
        self.wrappers.push((name.into(), Rc::new(wrapper)));
    }

    /// Builds the injector, installing wrappers and registering modules in
    /// the documented order. Fails if a module's tasks fail to resolve.
    pub fn build(self) -> InjectResult<Injector> {
        let name = self.name.as_deref().unwrap_or("main");
        let injector = Injector::with_name(name);
        for (wrapper_name, wrapper) in self.wrappers {
            injector.register_wrapper_rc(&wrapper_name, wrapper);
        }
        for module in self.modules {
            injector.register(module)?;
        }
        Ok(injector)
    }
}
