use crate::{InjectResult, Svc};
use std::{cell::RefCell, rc::Rc};

/// A one-shot continuation receiving a resolved value (or the error that
/// prevented it from resolving).
pub(crate) type Callback = Box<dyn FnOnce(InjectResult<Svc>)>;

/// A deferred value source. It invokes its continuation exactly once,
/// possibly after control has returned to the caller.
pub(crate) type Accessor = Box<dyn FnOnce(Callback)>;

struct JoinState {
    remaining: usize,
    slots: Vec<Option<Svc>>,
    on_complete: Option<Box<dyn FnOnce(InjectResult<Vec<Svc>>)>>,
}

/// Joins an ordered list of accessors into an ordered argument list.
///
/// `on_complete` fires exactly once: with the full list once every accessor
/// has produced a value, or with the first error reported by any accessor.
/// Zero accessors complete immediately with an empty list. Accessors whose
/// completion is deferred keep the join alive until they deliver.
pub(crate) fn join<F>(accessors: Vec<Accessor>, on_complete: F)
where
    F: FnOnce(InjectResult<Vec<Svc>>) + 'static,
{
    if accessors.is_empty() {
        return on_complete(Ok(Vec::new()));
    }

    let state = Rc::new(RefCell::new(JoinState {
        remaining: accessors.len(),
        slots: vec![None; accessors.len()],
        on_complete: Some(Box::new(on_complete)),
    }));

    for (index, accessor) in accessors.into_iter().enumerate() {
        let state = Rc::clone(&state);
        accessor(Box::new(move |result| deliver(&state, index, result)));
    }
}

fn deliver(
    state: &Rc<RefCell<JoinState>>,
    index: usize,
    result: InjectResult<Svc>,
) {
    let ready = {
        let mut state = state.borrow_mut();
        if state.on_complete.is_none() {
            // The join already fired (a sibling accessor failed).
            return;
        }
        match result {
            Err(error) => {
                let on_complete = state.on_complete.take();
                drop(state);
                if let Some(on_complete) = on_complete {
                    on_complete(Err(error));
                }
                return;
            }
            Ok(value) => {
                if state.slots[index].is_none() {
                    state.remaining -= 1;
                }
                state.slots[index] = Some(value);
                state.remaining == 0
            }
        }
    };

    if ready {
        let (on_complete, slots) = {
            let mut state = state.borrow_mut();
            (state.on_complete.take(), std::mem::take(&mut state.slots))
        };
        if let Some(on_complete) = on_complete {
            on_complete(Ok(slots.into_iter().flatten().collect()));
        }
    }
}
