use crate::{Args, Definition, InjectResult, Service, Svc};

/// An ordered collection of named definitions registered all at once.
///
/// A module is the unit an external loader hands to
/// [`Injector::register`](crate::Injector::register): one definition source's
/// exported mapping of name to value or tagged factory. Order matters for
/// tasks, which run in the order they appear in the module.
///
/// For creating a module easily via a domain specific language, see
/// [`define_module!`].
#[derive(Default)]
pub struct Module {
    definitions: Vec<(String, Definition)>,
}

impl Module {
    /// Adds a definition under a name.
    pub fn insert(&mut self, name: impl Into<String>, definition: Definition) {
        self.definitions.push((name.into(), definition));
    }

    /// Adds a plain value.
    pub fn data(&mut self, name: impl Into<String>, value: impl Service) {
        self.insert(name, Definition::data(value));
    }

    /// Adds a synchronous factory with an explicit dependency list.
    pub fn factory<F>(
        &mut self,
        name: impl Into<String>,
        dependencies: &[&str],
        factory: F,
    ) where
        F: Fn(Args) -> InjectResult<Svc> + 'static,
    {
        self.insert(name, Definition::factory(dependencies, factory));
    }

    /// Adds a deferred factory. Include [`DONE`](crate::DONE) in the
    /// dependency list to receive the completion handle.
    pub fn deferred<F>(
        &mut self,
        name: impl Into<String>,
        dependencies: &[&str],
        factory: F,
    ) where
        F: Fn(Args) -> InjectResult<Svc> + 'static,
    {
        self.insert(name, Definition::deferred(dependencies, factory));
    }

    /// Adds an executable task. It runs once, at registration time, after
    /// the whole module has been classified.
    pub fn task<F>(
        &mut self,
        name: impl Into<String>,
        dependencies: &[&str],
        factory: F,
    ) where
        F: Fn(Args) -> InjectResult<Svc> + 'static,
    {
        self.insert(name, Definition::task(dependencies, factory));
    }

    /// The number of definitions in the module.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the module has no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl IntoIterator for Module {
    type Item = (String, Definition);
    type IntoIter = std::vec::IntoIter<(String, Definition)>;

    fn into_iter(self) -> Self::IntoIter {
        self.definitions.into_iter()
    }
}

impl Extend<(String, Definition)> for Module {
    fn extend<I: IntoIterator<Item = (String, Definition)>>(
        &mut self,
        iter: I,
    ) {
        self.definitions.extend(iter);
    }
}

impl FromIterator<(String, Definition)> for Module {
    fn from_iter<I: IntoIterator<Item = (String, Definition)>>(
        iter: I,
    ) -> Self {
        Module {
            definitions: iter.into_iter().collect(),
        }
    }
}

/// Defines a new module using a domain specific language.
///
/// Each entry is `name = kind(...)` where `kind` is one of `data(value)`,
/// `factory([deps], closure)`, `deferred([deps], closure)`, or
/// `task([deps], closure)`.
///
/// ## Example
///
/// ```
/// use named_injector::{cast, define_module, svc, Injector};
///
/// let module = define_module! {
///     greeting = data("hi".to_string()),
///     shout = factory(["greeting"], |args| {
///         let greeting = args.get::<String>(0)?;
///         Ok(svc(format!("{}!", greeting.to_uppercase())))
///     }),
/// };
///
/// let mut builder = Injector::builder();
/// builder.add_module(module);
/// let injector = builder.build().unwrap();
///
/// let shout = injector.lookup("shout").unwrap().unwrap();
/// assert_eq!("HI!", cast::<String>(&shout).unwrap().as_str());
/// ```
#[macro_export]
macro_rules! define_module {
    {
        $($name:ident = $kind:ident ( $($def:tt)* )),* $(,)?
    } => {{
        #[allow(unused_mut)]
        let mut module = <$crate::Module as ::std::default::Default>::default();
        $($crate::define_module!(@def module, $name, $kind, $($def)*);)*
        module
    }};
    (@def $module:ident, $name:ident, data, $value:expr) => {
        $module.insert(
            ::std::stringify!($name),
            $crate::Definition::data($value),
        );
    };
    (@def $module:ident, $name:ident, factory, [$($dep:expr),* $(,)?], $f:expr) => {
        $module.insert(
            ::std::stringify!($name),
            $crate::Definition::factory(&[$($dep),*], $f),
        );
    };
    (@def $module:ident, $name:ident, deferred, [$($dep:expr),* $(,)?], $f:expr) => {
        $module.insert(
            ::std::stringify!($name),
            $crate::Definition::deferred(&[$($dep),*], $f),
        );
    };
    (@def $module:ident, $name:ident, task, [$($dep:expr),* $(,)?], $f:expr) => {
        $module.insert(
            ::std::stringify!($name),
            $crate::Definition::task(&[$($dep),*], $f),
        );
    };
}
