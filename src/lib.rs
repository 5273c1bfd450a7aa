//! # Runtime dependency injection keyed by names.
//!
//! Most dependency injection containers in Rust resolve services by type.
//! This crate instead resolves them by *name*: each definition is registered
//! under a string key, and a factory declares which other names it needs as
//! an explicit, ordered dependency list. The registry wires them together at
//! runtime, invokes every factory at most once, and memoizes its result for
//! the lifetime of the registry.
//!
//! Definitions come in four kinds, tagged explicitly when they are created:
//!
//! - **Data:** a plain value, complete as soon as it is registered.
//! - **Factory:** a synchronous factory whose return value is its result.
//! - **Deferred:** a factory that may return before producing its result and
//!   completes later through a completion handle ([`Done`]), which it
//!   receives through the reserved [`DONE`] dependency name. Dependents are
//!   suspended by registering one-shot continuations, never by blocking;
//!   nothing runs concurrently.
//! - **Task:** a one-shot callable run at registration time for its side
//!   effects. Tasks are not stored by name and run in registration order.
//!
//! Alongside ordinary descriptors there are *wrappers*: privileged resolvers
//! consulted before the descriptor map. The built-in wrappers provide a
//! contextual logging handle (`"logger"`), a recursive injector handle bound
//! to the requesting descriptor (`"injector"`), and a persistent per-name
//! key/value bag (`"scope"`). Custom wrappers can be registered too; the
//! wrapper namespace is first-write-wins.
//!
//! ## Example
//!
//! ```
//! use named_injector::{cast, define_module, svc, Injector};
//!
//! let module = define_module! {
//!     greeting = data("hi".to_string()),
//!
//!     // Dependencies are declared explicitly by name and arrive in the
//!     // declared order.
//!     shout = factory(["greeting"], |args| {
//!         let greeting = args.get::<String>(0)?;
//!         Ok(svc(format!("{}!", greeting.to_uppercase())))
//!     }),
//!
//!     // A deferred factory completes through its handle rather than its
//!     // return value. Here it completes immediately, but it could just as
//!     // well stash the handle and complete later.
//!     both = deferred(["greeting", "shout", "done"], |args| {
//!         let greeting = args.get::<String>(0)?;
//!         let shout = args.get::<String>(1)?;
//!         let done = args.done(2)?;
//!         done.succeed(svc(format!("{greeting} {shout}")));
//!         Ok(svc(()))
//!     }),
//! };
//!
//! let mut builder = Injector::builder();
//! builder.add_module(module);
//! let injector = builder.build().unwrap();
//!
//! let both = injector.lookup("both").unwrap().unwrap();
//! assert_eq!("hi HI!", cast::<String>(&both).unwrap().as_str());
//!
//! // Factories run at most once; the memoized value is returned afterwards.
//! let again = injector.lookup("both").unwrap().unwrap();
//! assert!(std::rc::Rc::ptr_eq(&both, &again));
//! ```
//!
//! ## Errors and failure locality
//!
//! Unresolvable names fail fast: a factory that declares an unknown
//! dependency fails with [`InjectError::MissingDependency`] naming both
//! sides, and a lookup on an unregistered name fails with
//! [`InjectError::UnknownName`]. A factory-reported error is memoized like a
//! value and delivered to every waiter; it aborts only the resolution chains
//! that depend on it, and the registry stays usable for unrelated names.
//!
//! Circular dependencies are detected during resolution and logged rather
//! than raised. The resolution terminates, but a genuine cycle among
//! factories that all need each other's results stays pending forever.
//!
//! ## Logging
//!
//! The registry logs through the [`tracing`] facade and hands factories
//! [`ScopedLogger`] handles scoped to their descriptor name. Install any
//! `tracing` subscriber to see cycle reports, duplicate-wrapper rejections,
//! and descriptor replacements.

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::doc_markdown
)]

mod barrier;
mod builder;
mod injection;
mod injector;
mod logger;
mod module;
mod scope;
mod services;
mod wrappers;

pub use builder::*;
pub use injection::*;
pub use injector::*;
pub use logger::*;
pub use module::*;
pub use scope::*;
pub use services::*;
pub use wrappers::Wrapper;

#[cfg(test)]
mod tests;
