//! Instance operators: map and filter
//!
//! Both wrap the source's subscription with a forwarding observer. User
//! code runs inside a failure boundary: `try_*` variants route `Err` into
//! the error channel, the plain variants route panics there. Any failure,
//! user-side or upstream, tears the upstream activation down.

use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::panic_message;
use crate::{Observable, Observer, SerialSubscription, StreamError, StreamResult, Subscriber};

struct MapObserver<U, F> {
    downstream: Subscriber<U>,
    upstream: SerialSubscription,
    project: F,
}

impl<T, U, F> Observer<T> for MapObserver<U, F>
where
    F: Fn(T) -> StreamResult<U>,
{
    fn next(&mut self, value: T) {
        if self.upstream.is_closed() {
            return;
        }
        match (self.project)(value) {
            Ok(mapped) => self.downstream.next(mapped),
            Err(err) => {
                tracing::debug!(error = %err, "map projection failed");
                self.downstream.error(err);
                self.upstream.unsubscribe();
            }
        }
    }

    fn error(&mut self, err: StreamError) {
        self.downstream.error(err);
        self.upstream.unsubscribe();
    }

    fn complete(&mut self) {
        self.downstream.complete();
    }
}

struct FilterObserver<T, F> {
    downstream: Subscriber<T>,
    upstream: SerialSubscription,
    test: F,
    _item: PhantomData<fn(T)>,
}

impl<T, F> Observer<T> for FilterObserver<T, F>
where
    F: Fn(&T) -> StreamResult<bool>,
{
    fn next(&mut self, value: T) {
        if self.upstream.is_closed() {
            return;
        }
        match (self.test)(&value) {
            Ok(true) => self.downstream.next(value),
            Ok(false) => {}
            Err(err) => {
                tracing::debug!(error = %err, "filter predicate failed");
                self.downstream.error(err);
                self.upstream.unsubscribe();
            }
        }
    }

    fn error(&mut self, err: StreamError) {
        self.downstream.error(err);
        self.upstream.unsubscribe();
    }

    fn complete(&mut self) {
        self.downstream.complete();
    }
}

impl<T: 'static> Observable<T> {
    /// Transform every value with `projection`
    ///
    /// A panic inside `projection` suppresses that value and becomes
    /// `StreamError::ProjectionPanicked` on the downstream error channel.
    pub fn map<U: 'static>(&self, projection: impl Fn(T) -> U + 'static) -> Observable<U> {
        self.try_map(move |value| {
            catch_unwind(AssertUnwindSafe(|| projection(value)))
                .map_err(|payload| StreamError::ProjectionPanicked(panic_message(payload)))
        })
    }

    /// Transform every value with a fallible `projection`
    pub fn try_map<U, E, F>(&self, projection: F) -> Observable<U>
    where
        U: 'static,
        E: Into<StreamError>,
        F: Fn(T) -> Result<U, E> + 'static,
    {
        let source = self.clone();
        let projection = Rc::new(projection);
        Observable::new(move |downstream| {
            let upstream = SerialSubscription::new();
            let epoch = upstream.begin();
            let projection = Rc::clone(&projection);
            let subscription = source.subscribe(MapObserver {
                downstream,
                upstream: upstream.clone(),
                project: move |value: T| -> StreamResult<U> {
                    projection(value).map_err(Into::into)
                },
            });
            upstream.assign(epoch, subscription);
            upstream.into()
        })
    }

    /// Forward only the values for which `predicate` holds
    ///
    /// Guarded like `map`: a panic becomes `StreamError::PredicatePanicked`.
    pub fn filter(&self, predicate: impl Fn(&T) -> bool + 'static) -> Observable<T> {
        self.try_filter(move |value: &T| {
            catch_unwind(AssertUnwindSafe(|| predicate(value)))
                .map_err(|payload| StreamError::PredicatePanicked(panic_message(payload)))
        })
    }

    /// Forward only the values for which a fallible `predicate` holds
    pub fn try_filter<E, F>(&self, predicate: F) -> Observable<T>
    where
        E: Into<StreamError>,
        F: Fn(&T) -> Result<bool, E> + 'static,
    {
        let source = self.clone();
        let predicate = Rc::new(predicate);
        Observable::new(move |downstream| {
            let upstream = SerialSubscription::new();
            let epoch = upstream.begin();
            let predicate = Rc::clone(&predicate);
            let subscription = source.subscribe(FilterObserver {
                downstream,
                upstream: upstream.clone(),
                test: move |value: &T| -> StreamResult<bool> {
                    predicate(value).map_err(Into::into)
                },
                _item: PhantomData,
            });
            upstream.assign(epoch, subscription);
            upstream.into()
        })
    }
}
