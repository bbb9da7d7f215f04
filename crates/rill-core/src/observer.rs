//! Observer contract
//!
//! An observer receives zero or more `next` notifications followed by at
//! most one terminal notification (`error` xor `complete`). Every method
//! defaults to a no-op so partial observers can be written directly.

use crate::StreamError;

/// Three-callback consumer interface driven by a producer
pub trait Observer<T> {
    /// A value was produced
    fn next(&mut self, _value: T) {}

    /// The activation failed (terminal)
    fn error(&mut self, _err: StreamError) {}

    /// The activation finished (terminal)
    fn complete(&mut self) {}
}

impl<T, O: Observer<T> + ?Sized> Observer<T> for Box<O> {
    fn next(&mut self, value: T) {
        (**self).next(value)
    }

    fn error(&mut self, err: StreamError) {
        (**self).error(err)
    }

    fn complete(&mut self) {
        (**self).complete()
    }
}

type NextFn<T> = Box<dyn FnMut(T)>;
type ErrorFn = Box<dyn FnMut(StreamError)>;
type CompleteFn = Box<dyn FnMut()>;

/// Observer assembled from optional closures
///
/// ```
/// use rill_core::{FnObserver, Observable};
///
/// let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// Observable::of(vec![1, 2, 3]).subscribe(FnObserver::on_next(move |v| sink.borrow_mut().push(v)));
/// assert_eq!(*seen.borrow(), vec![1, 2, 3]);
/// ```
pub struct FnObserver<T> {
    next: Option<NextFn<T>>,
    error: Option<ErrorFn>,
    complete: Option<CompleteFn>,
}

impl<T> FnObserver<T> {
    /// Observer that ignores every notification
    pub fn new() -> Self {
        FnObserver {
            next: None,
            error: None,
            complete: None,
        }
    }

    /// Observer with only a `next` callback
    pub fn on_next(f: impl FnMut(T) + 'static) -> Self {
        Self::new().with_next(f)
    }

    pub fn with_next(mut self, f: impl FnMut(T) + 'static) -> Self {
        self.next = Some(Box::new(f));
        self
    }

    pub fn with_error(mut self, f: impl FnMut(StreamError) + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    pub fn with_complete(mut self, f: impl FnMut() + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

impl<T> Default for FnObserver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Observer<T> for FnObserver<T> {
    fn next(&mut self, value: T) {
        if let Some(f) = self.next.as_mut() {
            f(value);
        }
    }

    fn error(&mut self, err: StreamError) {
        if let Some(f) = self.error.as_mut() {
            f(err);
        }
    }

    fn complete(&mut self) {
        if let Some(f) = self.complete.as_mut() {
            f();
        }
    }
}
