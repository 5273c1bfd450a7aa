use crate::{
    cast, define_module, svc, BoundInjector, Done, InjectError, Injector,
    Module, Scope, ScopedLogger,
};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

fn injector_with(module: Module) -> Injector {
    let mut builder = Injector::builder();
    builder.add_module(module);
    builder.build().unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            "named_injector=debug",
        ))
        .try_init();
}

/// A data descriptor resolves to the exact value registered, on the first
/// and every subsequent call.
#[test]
fn data_lookup_returns_registered_value() {
    let mut module = Module::default();
    module.data("greeting", "hi".to_string());
    let injector = injector_with(module);

    let first = injector.lookup("greeting").unwrap().unwrap();
    let second = injector.lookup("greeting").unwrap().unwrap();
    assert_eq!("hi", cast::<String>(&first).unwrap().as_str());
    assert!(Rc::ptr_eq(&first, &second));
}

/// The factory for a name runs exactly once; repeated lookups return the
/// identical cached value.
#[test]
fn factory_is_memoized() {
    let calls = Rc::new(Cell::new(0usize));
    let counted = Rc::clone(&calls);

    let mut module = Module::default();
    module.data("greeting", "hi".to_string());
    module.factory("shout", &["greeting"], move |args| {
        counted.set(counted.get() + 1);
        let greeting = args.get::<String>(0)?;
        Ok(svc(format!("{}!", greeting.to_uppercase())))
    });
    let injector = injector_with(module);

    let first = injector.lookup("shout").unwrap().unwrap();
    let second = injector.lookup("shout").unwrap().unwrap();
    assert_eq!("HI!", cast::<String>(&first).unwrap().as_str());
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(1, calls.get());
}

/// A lookup on a name with no wrapper and no descriptor fails rather than
/// silently resolving to nothing.
#[test]
fn unknown_lookup_fails() {
    let injector = injector_with(Module::default());
    match injector.lookup("missing") {
        Err(InjectError::UnknownName { name }) => assert_eq!("missing", name),
        other => panic!("unexpected result: {other:?}"),
    }
}

/// A factory declaring an unresolvable dependency fails naming both the
/// missing name and the requester.
#[test]
fn missing_dependency_names_both_sides() {
    let mut module = Module::default();
    module.factory("orphan", &["nowhere"], |args| args.get_svc(0));
    let injector = injector_with(module);

    match injector.lookup("orphan") {
        Err(InjectError::MissingDependency {
            dependency,
            requester,
        }) => {
            assert_eq!("nowhere", dependency);
            assert_eq!("orphan", requester);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

/// A failed resolution is local to its descriptor; the registry keeps
/// serving unrelated names, and the failure itself is memoized.
#[test]
fn failures_are_local_and_memoized() {
    let calls = Rc::new(Cell::new(0usize));
    let counted = Rc::clone(&calls);

    let mut module = Module::default();
    module.data("fine", 1i32);
    module.factory("broken", &[], move |_| {
        counted.set(counted.get() + 1);
        Err(InjectError::activation_failed(
            "broken",
            std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        ))
    });
    let injector = injector_with(module);

    assert!(matches!(
        injector.lookup("broken"),
        Err(InjectError::ActivationFailed { .. })
    ));
    assert!(matches!(
        injector.lookup("broken"),
        Err(InjectError::ActivationFailed { .. })
    ));
    assert_eq!(1, calls.get());

    let fine = injector.lookup("fine").unwrap().unwrap();
    assert_eq!(1, *cast::<i32>(&fine).unwrap());
}

/// Tasks run in registration order relative to each other, no matter how
/// many other definitions are registered alongside them.
#[test]
fn tasks_run_in_registration_order() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut module = Module::default();
    for name in ["a", "b", "c"] {
        let order = Rc::clone(&order);
        module.task(name, &[], move |_| {
            order.borrow_mut().push(name);
            Ok(svc(()))
        });
        module.data(format!("filler_{name}"), 0i32);
    }

    let _injector = injector_with(module);
    assert_eq!(&["a", "b", "c"], order.borrow().as_slice());
}

/// Tasks are execution-only: they are not retrievable by name afterwards.
#[test]
fn tasks_are_not_stored_by_name() {
    let mut module = Module::default();
    module.task("fire_and_forget", &[], |_| Ok(svc(())));
    let injector = injector_with(module);

    assert!(matches!(
        injector.lookup("fire_and_forget"),
        Err(InjectError::UnknownName { .. })
    ));
}

/// A task that fails synchronously aborts registration with its error.
#[test]
fn failing_task_aborts_registration() {
    let mut module = Module::default();
    module.task("doomed", &["nowhere"], |args| args.get_svc(0));

    let mut builder = Injector::builder();
    builder.add_module(module);
    assert!(matches!(
        builder.build(),
        Err(InjectError::MissingDependency { .. })
    ));
}

/// A deferred factory that completes during its own invocation resolves
/// like a synchronous one.
#[test]
fn deferred_factory_may_complete_synchronously() {
    let mut module = Module::default();
    module.deferred("eager", &["done"], |args| {
        let done = args.done(0)?;
        done.succeed(svc(1i32));
        Ok(svc(()))
    });
    let injector = injector_with(module);

    let value = injector.lookup("eager").unwrap().unwrap();
    assert_eq!(1, *cast::<i32>(&value).unwrap());
}

/// Waiters registered before and after a deferred completion each observe
/// the value exactly once, and dependents stay suspended until the handle
/// fires.
#[test]
fn deferred_completion_notifies_all_waiters() {
    let slot: Rc<RefCell<Option<Done>>> = Rc::new(RefCell::new(None));
    let stash = Rc::clone(&slot);

    let mut module = Module::default();
    module.deferred("delayed", &["done"], move |args| {
        *stash.borrow_mut() = Some(args.done(0)?);
        Ok(svc(()))
    });
    module.factory("dependent", &["delayed"], |args| {
        let delayed = args.get::<i32>(0)?;
        Ok(svc(*delayed + 1))
    });
    let injector = injector_with(module);

    // Still pending: the factory returned without completing.
    assert!(injector.lookup("delayed").unwrap().is_none());
    assert!(injector.lookup("dependent").unwrap().is_none());

    let seen = Rc::new(RefCell::new(Vec::new()));
    let early = Rc::clone(&seen);
    injector
        .on_ready("delayed", move |result| {
            early
                .borrow_mut()
                .push(*cast::<i32>(&result.unwrap()).unwrap());
        })
        .unwrap();
    assert!(seen.borrow().is_empty());

    let done = slot.borrow_mut().take().unwrap();
    done.succeed(svc(5i32));

    let late = Rc::clone(&seen);
    injector
        .on_ready("delayed", move |result| {
            late.borrow_mut()
                .push(*cast::<i32>(&result.unwrap()).unwrap());
        })
        .unwrap();
    assert_eq!(&[5, 5], seen.borrow().as_slice());

    // The suspended dependent resumed when the handle fired.
    let dependent = injector.lookup("dependent").unwrap().unwrap();
    assert_eq!(6, *cast::<i32>(&dependent).unwrap());
}

/// An error reported through the completion handle is fatal to every chain
/// waiting on the descriptor.
#[test]
fn deferred_failure_propagates_to_dependents() {
    let slot: Rc<RefCell<Option<Done>>> = Rc::new(RefCell::new(None));
    let stash = Rc::clone(&slot);

    let mut module = Module::default();
    module.deferred("flaky", &["done"], move |args| {
        *stash.borrow_mut() = Some(args.done(0)?);
        Ok(svc(()))
    });
    module.factory("dependent", &["flaky"], |args| args.get_svc(0));
    let injector = injector_with(module);

    assert!(injector.lookup("dependent").unwrap().is_none());

    let done = slot.borrow_mut().take().unwrap();
    done.fail(std::io::Error::new(
        std::io::ErrorKind::Other,
        "connection reset",
    ));

    assert!(matches!(
        injector.lookup("flaky"),
        Err(InjectError::ActivationFailed { .. })
    ));
    assert!(matches!(
        injector.lookup("dependent"),
        Err(InjectError::ActivationFailed { .. })
    ));
}

/// Two factories that need each other terminate through the cycle fallback
/// instead of recursing unboundedly. The pair stays pending; nothing
/// crashes.
#[test]
fn cycle_terminates_without_crash() {
    init_tracing();

    let mut module = Module::default();
    module.factory("x", &["y"], |args| args.get_svc(0));
    module.factory("y", &["x"], |args| args.get_svc(0));
    let injector = injector_with(module);

    assert!(injector.lookup("x").unwrap().is_none());
    assert!(injector.lookup("y").unwrap().is_none());

    // Unrelated names still resolve afterwards.
    let mut module = Module::default();
    module.data("fine", 1i32);
    injector.register(module).unwrap();
    assert!(injector.lookup("fine").unwrap().is_some());
}

/// Registering a second wrapper under an existing name keeps the first and
/// observably rejects the second without an error.
#[test]
fn duplicate_wrapper_keeps_first() {
    let injector = injector_with(Module::default());

    assert!(injector.register_wrapper("marker", |_, _| Ok(svc(1i32))));
    assert!(!injector.register_wrapper("marker", |_, _| Ok(svc(2i32))));

    let value = injector.lookup("marker").unwrap().unwrap();
    assert_eq!(1, *cast::<i32>(&value).unwrap());

    // Built-ins were installed first, so they can't be shadowed either.
    assert!(!injector.register_wrapper("logger", |_, _| Ok(svc(()))));
}

/// Wrappers take priority over descriptors registered under the same name.
#[test]
fn wrappers_shadow_descriptors() {
    let mut module = Module::default();
    module.data("flavor", "pepper".to_string());
    let injector = injector_with(module);
    injector.register_wrapper("flavor", |_, _| Ok(svc("salt".to_string())));

    let value = injector.lookup("flavor").unwrap().unwrap();
    assert_eq!("salt", cast::<String>(&value).unwrap().as_str());
}

/// Registering two descriptors under one name keeps the last.
#[test]
fn duplicate_descriptor_last_registration_wins() {
    init_tracing();

    let mut module = Module::default();
    module.data("value", 1i32);
    module.data("value", 2i32);
    let injector = injector_with(module);

    let value = injector.lookup("value").unwrap().unwrap();
    assert_eq!(2, *cast::<i32>(&value).unwrap());
}

/// The contextual logger is scoped to the descriptor being resolved.
#[test]
fn logger_wrapper_scopes_to_descriptor() {
    let mut module = Module::default();
    module.factory("named", &["logger"], |args| {
        let logger = args.get::<ScopedLogger>(0)?;
        Ok(svc(logger.scope().to_string()))
    });
    let injector = injector_with(module);

    let scope = injector.lookup("named").unwrap().unwrap();
    assert_eq!("main.named", cast::<String>(&scope).unwrap().as_str());

    // A top-level lookup gets a handle scoped to the synthetic root context.
    let root = injector.lookup("logger").unwrap().unwrap();
    assert_eq!(
        "main.main",
        cast::<ScopedLogger>(&root).unwrap().scope()
    );
}

/// The recursive injector handle resolves further names at call time, bound
/// to the requesting descriptor.
#[test]
fn injector_wrapper_resolves_at_call_time() {
    let mut module = Module::default();
    module.data("greeting", "hi".to_string());
    module.factory("indirect", &["injector"], |args| {
        let injector = args.get::<BoundInjector>(0)?;
        let greeting = injector.lookup("greeting")?.ok_or_else(|| {
            InjectError::InternalError("greeting is pending".to_owned())
        })?;
        assert_eq!("indirect", injector.context().name());
        Ok(greeting)
    });
    let injector = injector_with(module);

    let value = injector.lookup("indirect").unwrap().unwrap();
    assert_eq!("hi", cast::<String>(&value).unwrap().as_str());
}

/// Scope bags are keyed by consumer name: the same name always sees the
/// same bag, different names see different bags.
#[test]
fn scope_wrapper_is_persistent_per_name() {
    let mut module = Module::default();
    module.factory("left", &["scope"], |args| args.get_svc(0));
    module.factory("right", &["scope"], |args| args.get_svc(0));
    let injector = injector_with(module);

    let left = injector.lookup("left").unwrap().unwrap();
    let left = cast::<Scope>(&left).unwrap();
    let right = injector.lookup("right").unwrap().unwrap();
    let right = cast::<Scope>(&right).unwrap();
    assert!(!left.ptr_eq(&right));
    assert!(left.ptr_eq(&injector.scope("left")));

    // Top-level accesses share the root bag, and mutations through one
    // handle are visible through the other.
    let first = injector.lookup("scope").unwrap().unwrap();
    let first = cast::<Scope>(&first).unwrap();
    let second = injector.lookup("scope").unwrap().unwrap();
    let second = cast::<Scope>(&second).unwrap();
    assert!(first.ptr_eq(&second));
    first.insert("count", svc(3i32));
    let seen = second.get("count").unwrap();
    assert_eq!(3, *cast::<i32>(&seen).unwrap());
}

/// The module macro, a deferred chain, and wrappers compose end to end.
#[test]
fn module_macro_composes_with_wrappers() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let task_log = Rc::clone(&log);

    let mut builder = Injector::builder();
    builder.with_name("svc");
    builder.add_module(define_module! {
        user = data("john".to_string()),
        posts = deferred(["user", "done"], |args| {
            let user = args.get::<String>(0)?;
            let done = args.done(1)?;
            done.succeed(svc(format!("posts of {user}")));
            Ok(svc(()))
        }),
        report = factory(["user", "posts", "logger"], |args| {
            let user = args.get::<String>(0)?;
            let posts = args.get::<String>(1)?;
            let logger = args.get::<ScopedLogger>(2)?;
            logger.info("report assembled");
            Ok(svc(format!("{user}: {posts}")))
        }),
    });
    let injector = builder.build().unwrap();

    let mut module = Module::default();
    module.task("print_report", &["report"], move |args| {
        task_log.borrow_mut().push(args.get::<String>(0)?.to_string());
        Ok(svc(()))
    });
    injector.register(module).unwrap();

    assert_eq!(&["john: posts of john"], log.borrow().as_slice());
    let report = injector.lookup("report").unwrap().unwrap();
    assert_eq!(
        "john: posts of john",
        cast::<String>(&report).unwrap().as_str()
    );
}
