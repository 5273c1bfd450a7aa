use downcast_rs::{impl_downcast, Downcast};
use std::{
    error::Error,
    fmt::{Display, Formatter},
    rc::Rc,
};

use crate::Done;

/// Implemented automatically on types that are capable of being injected.
///
/// Injected values are keyed by name rather than by type, so they are stored
/// type-erased. Anything that can be downcast at runtime qualifies.
pub trait Service: Downcast {}
impl<T: ?Sized + Downcast> Service for T {}

impl_downcast!(Service);

impl std::fmt::Debug for dyn Service {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("<service>")
    }
}

/// A reference-counted pointer holding an injected value.
///
/// Use [`cast`] (or [`Args::get`]) to recover the concrete type.
pub type Svc = Rc<dyn Service>;

/// Wraps a concrete value into a service pointer.
///
/// ## Example
///
/// ```
/// use named_injector::{cast, svc, Svc};
///
/// let value: Svc = svc(42i32);
/// assert_eq!(42, *cast::<i32>(&value).unwrap());
/// ```
pub fn svc<T: Service>(value: T) -> Svc {
    Rc::new(value)
}

/// Attempts to downcast a service pointer to a concrete type, returning
/// [`None`] if the value has a different type.
#[must_use]
pub fn cast<T: Service>(value: &Svc) -> Option<Rc<T>> {
    value.clone().downcast_rc().ok()
}

/// The resolved arguments passed to a factory, in the order the factory
/// declared its dependencies.
pub struct Args {
    values: Vec<Svc>,
}

impl Args {
    pub(crate) fn new(values: Vec<Svc>) -> Self {
        Args { values }
    }

    /// The number of resolved arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the factory declared no dependencies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets the argument at `index` without downcasting it.
    pub fn get_svc(&self, index: usize) -> InjectResult<Svc> {
        self.values.get(index).cloned().ok_or_else(|| {
            InjectError::InternalError(format!(
                "argument {index} was requested but only {} were resolved",
                self.values.len()
            ))
        })
    }

    /// Gets the argument at `index` downcast to a concrete type.
    pub fn get<T: Service>(&self, index: usize) -> InjectResult<Rc<T>> {
        let value = self.get_svc(index)?;
        value.downcast_rc().map_err(|_| InjectError::InvalidArgument {
            index,
            expected: std::any::type_name::<T>(),
        })
    }

    /// Gets the completion handle at `index`. Deferred factories receive
    /// their handle through the reserved [`DONE`](crate::DONE) dependency.
    pub fn done(&self, index: usize) -> InjectResult<Done> {
        self.get::<Done>(index).map(|done| (*done).clone())
    }
}

/// A result from resolving a named injection.
pub type InjectResult<T> = Result<T, InjectError>;

/// An error that has occurred during resolution of a named injection.
///
/// The error is cheaply cloneable so that a memoized failure can be delivered
/// to any number of waiters on the same descriptor.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum InjectError {
    /// A factory declared a dependency name with no matching wrapper or
    /// descriptor.
    MissingDependency {
        /// The name that could not be resolved.
        dependency: String,

        /// The descriptor that declared the dependency.
        requester: String,
    },

    /// A lookup was performed on a name that is neither a wrapper nor a
    /// descriptor.
    UnknownName {
        /// The name that was requested.
        name: String,
    },

    /// A factory reported an error, either by returning it or through its
    /// completion handle.
    ActivationFailed {
        /// The descriptor whose factory failed.
        name: String,

        /// The error the factory reported.
        inner: Rc<dyn Error + 'static>,
    },

    /// A resolved argument had a different type than the factory requested.
    InvalidArgument {
        /// The position of the argument in the declared dependency list.
        index: usize,

        /// The type the factory requested.
        expected: &'static str,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    InternalError(String),
}

impl InjectError {
    /// Wraps a factory-reported error for the named descriptor.
    pub fn activation_failed(
        name: impl Into<String>,
        inner: impl Error + 'static,
    ) -> Self {
        InjectError::ActivationFailed {
            name: name.into(),
            inner: Rc::new(inner),
        }
    }
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::ActivationFailed { inner, .. } => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl Display for InjectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "an error occurred during injection: ")?;
        match self {
            InjectError::MissingDependency {
                dependency,
                requester,
            } => {
                write!(
                    f,
                    "\"{dependency}\" has no wrapper or descriptor (required by \"{requester}\")"
                )
            }
            InjectError::UnknownName { name } => {
                write!(f, "\"{name}\" is not a registered wrapper or descriptor")
            }
            InjectError::ActivationFailed { name, inner } => {
                write!(f, "the factory for \"{name}\" failed: {inner}")
            }
            InjectError::InvalidArgument { index, expected } => {
                write!(
                    f,
                    "the argument at position {index} is not of type {expected}"
                )
            }
            InjectError::InternalError(message) => {
                write!(f, "an unexpected error occurred: {message}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Typed access recovers the value that was wrapped.
    #[test]
    fn args_get_downcasts_values() {
        let args = Args::new(vec![svc(1i32), svc("two".to_string())]);
        assert_eq!(1, *args.get::<i32>(0).unwrap());
        assert_eq!("two", args.get::<String>(1).unwrap().as_str());
    }

    /// A mismatched downcast names the expected type.
    #[test]
    fn args_get_rejects_wrong_type() {
        let args = Args::new(vec![svc(1i32)]);
        match args.get::<String>(0) {
            Err(InjectError::InvalidArgument { index: 0, expected }) => {
                assert!(expected.contains("String"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    /// Requesting past the end is an internal error, not a panic.
    #[test]
    fn args_get_rejects_out_of_range_index() {
        let args = Args::new(Vec::new());
        assert!(matches!(args.get_svc(0), Err(InjectError::InternalError(_))));
    }
}
