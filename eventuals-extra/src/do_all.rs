//! `do_all`: heterogeneous fan-out/join, the fixed-arity sibling of
//! [`eventuals::fork_join`]'s homogeneous `N`-copies fan-out. Where
//! `fork_join` runs `N` copies of *one* builder over a shared value,
//! `do_all` runs a fixed *tuple* of differently-typed builders concurrently
//! and joins them into a tuple of their values.
//!
//! Error types across the tuple rarely unify through `From` the way a single
//! pipeline's chain does; `do_all` instead boxes every child's own error
//! into [`eventuals_core::BoxError`] right in its join slot, so the joined
//! eventual's `DownstreamError` is always `BoxError` regardless of what each
//! child produces.
//!
//! Join policy mirrors `fork_join`: any `Stopped` slot dominates; otherwise
//! the first error by tuple position wins; otherwise every slot's value is
//! collected into the output tuple. Implemented by hand for tuples of 2 and
//! 3 builders, the arities actually needed by callers so far; a new arity is
//! a mechanical copy of an existing one.

use std::error::Error as StdError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use eventuals::{reschedule, Eventual};
use eventuals_core::{BoxError, Context, Continuation, Interrupt};

/// Why a `do_all` slot didn't produce a value.
enum Failure {
    Failed(BoxError),
    Stopped,
}

fn box_error<E>(error: E) -> BoxError
where
    E: StdError + Send + Sync + 'static,
{
    Box::new(error)
}

fn child_context(parent: &Arc<Context>, index: usize) -> Arc<Context> {
    parent.child(format!("{} [DoAll - {}]", parent.name(), index))
}

/// Wires an outer interrupt (if any) to fire every child interrupt, handling
/// the install-after-trigger race the same way `fork_join` does.
fn interrupt_children(
    outer: &Option<Interrupt>,
    children: Vec<Interrupt>,
) -> Arc<dyn Fn() + Send + Sync> {
    let interrupter: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
        for child in &children {
            child.trigger();
        }
    });
    if let Some(outer) = outer {
        let fire = interrupter.clone();
        if !outer.install(move || fire()) {
            interrupter();
        }
    }
    interrupter
}

// ---------------------------------------------------------------------
// Arity 2
// ---------------------------------------------------------------------

struct JoinState2<VA, VB> {
    a: Mutex<Option<Result<VA, Failure>>>,
    b: Mutex<Option<Result<VB, Failure>>>,
    remaining: AtomicUsize,
}

fn finish2<VA, VB, K>(state: &JoinState2<VA, VB>, downstream: K)
where
    K: Continuation<(VA, VB), Error = BoxError>,
{
    let a = state.a.lock().expect("do_all slot poisoned").take();
    let b = state.b.lock().expect("do_all slot poisoned").take();

    if matches!(a, Some(Err(Failure::Stopped))) || matches!(b, Some(Err(Failure::Stopped))) {
        downstream.stop();
        return;
    }
    if let Some(Err(Failure::Failed(error))) = a {
        downstream.fail(error);
        return;
    }
    if let Some(Err(Failure::Failed(error))) = b {
        downstream.fail(error);
        return;
    }

    let a = a.expect("do_all slot never written").expect("checked above");
    let b = b.expect("do_all slot never written").expect("checked above");
    downstream.start((a, b));
}

struct SlotA2<VA, VB, EA, K> {
    state: Arc<JoinState2<VA, VB>>,
    downstream: Arc<Mutex<Option<K>>>,
    interrupter: Arc<dyn Fn() + Send + Sync>,
    _error: std::marker::PhantomData<fn(EA)>,
}

impl<VA, VB, EA, K> Continuation<VA> for SlotA2<VA, VB, EA, K>
where
    VA: Send + 'static,
    VB: Send + 'static,
    EA: StdError + Send + Sync + 'static,
    K: Continuation<(VA, VB), Error = BoxError> + Send + 'static,
{
    type Error = EA;

    fn start(self, value: VA) {
        self.complete(Ok(value));
    }

    fn fail(self, error: EA) {
        self.complete(Err(Failure::Failed(box_error(error))));
    }

    fn stop(self) {
        self.complete(Err(Failure::Stopped));
    }

    fn register(&mut self, _interrupt: &Interrupt) {}
}

impl<VA: Send + 'static, VB: Send + 'static, EA, K> SlotA2<VA, VB, EA, K>
where
    K: Continuation<(VA, VB), Error = BoxError> + Send + 'static,
{
    fn complete(self, result: Result<VA, Failure>) {
        let failed_or_stopped = result.is_err();
        *self.state.a.lock().expect("do_all slot poisoned") = Some(result);
        let remaining = self.state.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            let downstream = self
                .downstream
                .lock()
                .expect("do_all downstream poisoned")
                .take()
                .expect("do_all downstream consumed twice");
            finish2(&self.state, downstream);
        } else if failed_or_stopped {
            (self.interrupter)();
        }
    }
}

struct SlotB2<VA, VB, EB, K> {
    state: Arc<JoinState2<VA, VB>>,
    downstream: Arc<Mutex<Option<K>>>,
    interrupter: Arc<dyn Fn() + Send + Sync>,
    _error: std::marker::PhantomData<fn(EB)>,
}

impl<VA, VB, EB, K> Continuation<VB> for SlotB2<VA, VB, EB, K>
where
    VA: Send + 'static,
    VB: Send + 'static,
    EB: StdError + Send + Sync + 'static,
    K: Continuation<(VA, VB), Error = BoxError> + Send + 'static,
{
    type Error = EB;

    fn start(self, value: VB) {
        self.complete(Ok(value));
    }

    fn fail(self, error: EB) {
        self.complete(Err(Failure::Failed(box_error(error))));
    }

    fn stop(self) {
        self.complete(Err(Failure::Stopped));
    }

    fn register(&mut self, _interrupt: &Interrupt) {}
}

impl<VA: Send + 'static, VB: Send + 'static, EB, K> SlotB2<VA, VB, EB, K>
where
    K: Continuation<(VA, VB), Error = BoxError> + Send + 'static,
{
    fn complete(self, result: Result<VB, Failure>) {
        let failed_or_stopped = result.is_err();
        *self.state.b.lock().expect("do_all slot poisoned") = Some(result);
        let remaining = self.state.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            let downstream = self
                .downstream
                .lock()
                .expect("do_all downstream poisoned")
                .take()
                .expect("do_all downstream consumed twice");
            finish2(&self.state, downstream);
        } else if failed_or_stopped {
            (self.interrupter)();
        }
    }
}

pub struct DoAll2<A, B> {
    a: A,
    b: B,
}

/// Runs two differently-typed builders concurrently and joins their values
/// into a `(A::Value, B::Value)` pair.
pub fn do_all2<A, B>(a: A, b: B) -> DoAll2<A, B> {
    DoAll2 { a, b }
}

pub struct DoAll2Continuation<K, A, B> {
    a: A,
    b: B,
    downstream: K,
    interrupt: Option<Interrupt>,
}

impl<A, B, K> Continuation<()> for DoAll2Continuation<K, A, B>
where
    A: Eventual<()> + Send + 'static,
    B: Eventual<()> + Send + 'static,
    A::Value: Send + 'static,
    B::Value: Send + 'static,
    A::DownstreamError: StdError + Send + Sync + 'static,
    B::DownstreamError: StdError + Send + Sync + 'static,
    K: Continuation<(A::Value, B::Value), Error = BoxError> + Send + 'static,
{
    type Error = BoxError;

    fn start(self, (): ()) {
        let DoAll2Continuation {
            a,
            b,
            downstream,
            interrupt,
        } = self;

        if let Some(outer) = &interrupt {
            if outer.is_triggered() {
                downstream.stop();
                return;
            }
        }

        let parent_context = Context::current();
        let state = Arc::new(JoinState2 {
            a: Mutex::new(None),
            b: Mutex::new(None),
            remaining: AtomicUsize::new(2),
        });
        let downstream = Arc::new(Mutex::new(Some(downstream)));

        let child_interrupts = vec![Interrupt::new(), Interrupt::new()];
        let interrupter = interrupt_children(&interrupt, child_interrupts.clone());

        let context_a = child_context(&parent_context, 0);
        let sink_a: SlotA2<A::Value, B::Value, A::DownstreamError, K> = SlotA2 {
            state: state.clone(),
            downstream: downstream.clone(),
            interrupter: interrupter.clone(),
            _error: std::marker::PhantomData,
        };
        let reentry_a = reschedule(parent_context.clone()).k(sink_a);
        let mut continuation_a = a.k(reentry_a);
        continuation_a.register(&child_interrupts[0]);
        context_a.continue_with(move || continuation_a.start(()));

        let context_b = child_context(&parent_context, 1);
        let sink_b: SlotB2<A::Value, B::Value, B::DownstreamError, K> = SlotB2 {
            state: state.clone(),
            downstream: downstream.clone(),
            interrupter: interrupter.clone(),
            _error: std::marker::PhantomData,
        };
        let reentry_b = reschedule(parent_context.clone()).k(sink_b);
        let mut continuation_b = b.k(reentry_b);
        continuation_b.register(&child_interrupts[1]);
        context_b.continue_with(move || continuation_b.start(()));
    }

    fn fail(self, error: BoxError) {
        self.downstream.fail(error);
    }

    fn stop(self) {
        self.downstream.stop();
    }

    fn register(&mut self, interrupt: &Interrupt) {
        self.interrupt = Some(interrupt.clone());
    }
}

impl<A, B> Eventual<()> for DoAll2<A, B>
where
    A: Eventual<()> + Send + 'static,
    B: Eventual<()> + Send + 'static,
    A::Value: Send + 'static,
    B::Value: Send + 'static,
    A::DownstreamError: StdError + Send + Sync + 'static,
    B::DownstreamError: StdError + Send + Sync + 'static,
{
    type Value = (A::Value, B::Value);
    type Error = BoxError;
    type DownstreamError = BoxError;
    type Continuation<K>
        = DoAll2Continuation<K, A, B>
    where
        K: Continuation<(A::Value, B::Value), Error = BoxError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<(A::Value, B::Value), Error = BoxError>,
    {
        DoAll2Continuation {
            a: self.a,
            b: self.b,
            downstream,
            interrupt: None,
        }
    }
}

// ---------------------------------------------------------------------
// Arity 3
// ---------------------------------------------------------------------

struct JoinState3<VA, VB, VC> {
    a: Mutex<Option<Result<VA, Failure>>>,
    b: Mutex<Option<Result<VB, Failure>>>,
    c: Mutex<Option<Result<VC, Failure>>>,
    remaining: AtomicUsize,
}

fn finish3<VA, VB, VC, K>(state: &JoinState3<VA, VB, VC>, downstream: K)
where
    K: Continuation<(VA, VB, VC), Error = BoxError>,
{
    let a = state.a.lock().expect("do_all slot poisoned").take();
    let b = state.b.lock().expect("do_all slot poisoned").take();
    let c = state.c.lock().expect("do_all slot poisoned").take();

    let any_stopped = matches!(a, Some(Err(Failure::Stopped)))
        || matches!(b, Some(Err(Failure::Stopped)))
        || matches!(c, Some(Err(Failure::Stopped)));
    if any_stopped {
        downstream.stop();
        return;
    }
    if let Some(Err(Failure::Failed(error))) = a {
        downstream.fail(error);
        return;
    }
    if let Some(Err(Failure::Failed(error))) = b {
        downstream.fail(error);
        return;
    }
    if let Some(Err(Failure::Failed(error))) = c {
        downstream.fail(error);
        return;
    }

    let a = a.expect("do_all slot never written").expect("checked above");
    let b = b.expect("do_all slot never written").expect("checked above");
    let c = c.expect("do_all slot never written").expect("checked above");
    downstream.start((a, b, c));
}

struct SlotA3<VA, VB, VC, EA, K> {
    state: Arc<JoinState3<VA, VB, VC>>,
    downstream: Arc<Mutex<Option<K>>>,
    interrupter: Arc<dyn Fn() + Send + Sync>,
    _error: std::marker::PhantomData<fn(EA)>,
}

impl<VA, VB, VC, EA, K> Continuation<VA> for SlotA3<VA, VB, VC, EA, K>
where
    VA: Send + 'static,
    VB: Send + 'static,
    VC: Send + 'static,
    EA: StdError + Send + Sync + 'static,
    K: Continuation<(VA, VB, VC), Error = BoxError> + Send + 'static,
{
    type Error = EA;

    fn start(self, value: VA) {
        self.complete(Ok(value));
    }

    fn fail(self, error: EA) {
        self.complete(Err(Failure::Failed(box_error(error))));
    }

    fn stop(self) {
        self.complete(Err(Failure::Stopped));
    }

    fn register(&mut self, _interrupt: &Interrupt) {}
}

impl<VA: Send + 'static, VB: Send + 'static, VC: Send + 'static, EA, K> SlotA3<VA, VB, VC, EA, K>
where
    K: Continuation<(VA, VB, VC), Error = BoxError> + Send + 'static,
{
    fn complete(self, result: Result<VA, Failure>) {
        let failed_or_stopped = result.is_err();
        *self.state.a.lock().expect("do_all slot poisoned") = Some(result);
        let remaining = self.state.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            let downstream = self
                .downstream
                .lock()
                .expect("do_all downstream poisoned")
                .take()
                .expect("do_all downstream consumed twice");
            finish3(&self.state, downstream);
        } else if failed_or_stopped {
            (self.interrupter)();
        }
    }
}

struct SlotB3<VA, VB, VC, EB, K> {
    state: Arc<JoinState3<VA, VB, VC>>,
    downstream: Arc<Mutex<Option<K>>>,
    interrupter: Arc<dyn Fn() + Send + Sync>,
    _error: std::marker::PhantomData<fn(EB)>,
}

impl<VA, VB, VC, EB, K> Continuation<VB> for SlotB3<VA, VB, VC, EB, K>
where
    VA: Send + 'static,
    VB: Send + 'static,
    VC: Send + 'static,
    EB: StdError + Send + Sync + 'static,
    K: Continuation<(VA, VB, VC), Error = BoxError> + Send + 'static,
{
    type Error = EB;

    fn start(self, value: VB) {
        self.complete(Ok(value));
    }

    fn fail(self, error: EB) {
        self.complete(Err(Failure::Failed(box_error(error))));
    }

    fn stop(self) {
        self.complete(Err(Failure::Stopped));
    }

    fn register(&mut self, _interrupt: &Interrupt) {}
}

impl<VA: Send + 'static, VB: Send + 'static, VC: Send + 'static, EB, K> SlotB3<VA, VB, VC, EB, K>
where
    K: Continuation<(VA, VB, VC), Error = BoxError> + Send + 'static,
{
    fn complete(self, result: Result<VB, Failure>) {
        let failed_or_stopped = result.is_err();
        *self.state.b.lock().expect("do_all slot poisoned") = Some(result);
        let remaining = self.state.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            let downstream = self
                .downstream
                .lock()
                .expect("do_all downstream poisoned")
                .take()
                .expect("do_all downstream consumed twice");
            finish3(&self.state, downstream);
        } else if failed_or_stopped {
            (self.interrupter)();
        }
    }
}

struct SlotC3<VA, VB, VC, EC, K> {
    state: Arc<JoinState3<VA, VB, VC>>,
    downstream: Arc<Mutex<Option<K>>>,
    interrupter: Arc<dyn Fn() + Send + Sync>,
    _error: std::marker::PhantomData<fn(EC)>,
}

impl<VA, VB, VC, EC, K> Continuation<VC> for SlotC3<VA, VB, VC, EC, K>
where
    VA: Send + 'static,
    VB: Send + 'static,
    VC: Send + 'static,
    EC: StdError + Send + Sync + 'static,
    K: Continuation<(VA, VB, VC), Error = BoxError> + Send + 'static,
{
    type Error = EC;

    fn start(self, value: VC) {
        self.complete(Ok(value));
    }

    fn fail(self, error: EC) {
        self.complete(Err(Failure::Failed(box_error(error))));
    }

    fn stop(self) {
        self.complete(Err(Failure::Stopped));
    }

    fn register(&mut self, _interrupt: &Interrupt) {}
}

impl<VA: Send + 'static, VB: Send + 'static, VC: Send + 'static, EC, K> SlotC3<VA, VB, VC, EC, K>
where
    K: Continuation<(VA, VB, VC), Error = BoxError> + Send + 'static,
{
    fn complete(self, result: Result<VC, Failure>) {
        let failed_or_stopped = result.is_err();
        *self.state.c.lock().expect("do_all slot poisoned") = Some(result);
        let remaining = self.state.remaining.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining == 0 {
            let downstream = self
                .downstream
                .lock()
                .expect("do_all downstream poisoned")
                .take()
                .expect("do_all downstream consumed twice");
            finish3(&self.state, downstream);
        } else if failed_or_stopped {
            (self.interrupter)();
        }
    }
}

pub struct DoAll3<A, B, C> {
    a: A,
    b: B,
    c: C,
}

/// Runs three differently-typed builders concurrently and joins their values
/// into an `(A::Value, B::Value, C::Value)` triple.
pub fn do_all3<A, B, C>(a: A, b: B, c: C) -> DoAll3<A, B, C> {
    DoAll3 { a, b, c }
}

pub struct DoAll3Continuation<K, A, B, C> {
    a: A,
    b: B,
    c: C,
    downstream: K,
    interrupt: Option<Interrupt>,
}

impl<A, B, C, K> Continuation<()> for DoAll3Continuation<K, A, B, C>
where
    A: Eventual<()> + Send + 'static,
    B: Eventual<()> + Send + 'static,
    C: Eventual<()> + Send + 'static,
    A::Value: Send + 'static,
    B::Value: Send + 'static,
    C::Value: Send + 'static,
    A::DownstreamError: StdError + Send + Sync + 'static,
    B::DownstreamError: StdError + Send + Sync + 'static,
    C::DownstreamError: StdError + Send + Sync + 'static,
    K: Continuation<(A::Value, B::Value, C::Value), Error = BoxError> + Send + 'static,
{
    type Error = BoxError;

    fn start(self, (): ()) {
        let DoAll3Continuation {
            a,
            b,
            c,
            downstream,
            interrupt,
        } = self;

        if let Some(outer) = &interrupt {
            if outer.is_triggered() {
                downstream.stop();
                return;
            }
        }

        let parent_context = Context::current();
        let state = Arc::new(JoinState3 {
            a: Mutex::new(None),
            b: Mutex::new(None),
            c: Mutex::new(None),
            remaining: AtomicUsize::new(3),
        });
        let downstream = Arc::new(Mutex::new(Some(downstream)));

        let child_interrupts = vec![Interrupt::new(), Interrupt::new(), Interrupt::new()];
        let interrupter = interrupt_children(&interrupt, child_interrupts.clone());

        let context_a = child_context(&parent_context, 0);
        let sink_a: SlotA3<A::Value, B::Value, C::Value, A::DownstreamError, K> = SlotA3 {
            state: state.clone(),
            downstream: downstream.clone(),
            interrupter: interrupter.clone(),
            _error: std::marker::PhantomData,
        };
        let reentry_a = reschedule(parent_context.clone()).k(sink_a);
        let mut continuation_a = a.k(reentry_a);
        continuation_a.register(&child_interrupts[0]);
        context_a.continue_with(move || continuation_a.start(()));

        let context_b = child_context(&parent_context, 1);
        let sink_b: SlotB3<A::Value, B::Value, C::Value, B::DownstreamError, K> = SlotB3 {
            state: state.clone(),
            downstream: downstream.clone(),
            interrupter: interrupter.clone(),
            _error: std::marker::PhantomData,
        };
        let reentry_b = reschedule(parent_context.clone()).k(sink_b);
        let mut continuation_b = b.k(reentry_b);
        continuation_b.register(&child_interrupts[1]);
        context_b.continue_with(move || continuation_b.start(()));

        let context_c = child_context(&parent_context, 2);
        let sink_c: SlotC3<A::Value, B::Value, C::Value, C::DownstreamError, K> = SlotC3 {
            state: state.clone(),
            downstream: downstream.clone(),
            interrupter: interrupter.clone(),
            _error: std::marker::PhantomData,
        };
        let reentry_c = reschedule(parent_context.clone()).k(sink_c);
        let mut continuation_c = c.k(reentry_c);
        continuation_c.register(&child_interrupts[2]);
        context_c.continue_with(move || continuation_c.start(()));
    }

    fn fail(self, error: BoxError) {
        self.downstream.fail(error);
    }

    fn stop(self) {
        self.downstream.stop();
    }

    fn register(&mut self, interrupt: &Interrupt) {
        self.interrupt = Some(interrupt.clone());
    }
}

impl<A, B, C> Eventual<()> for DoAll3<A, B, C>
where
    A: Eventual<()> + Send + 'static,
    B: Eventual<()> + Send + 'static,
    C: Eventual<()> + Send + 'static,
    A::Value: Send + 'static,
    B::Value: Send + 'static,
    C::Value: Send + 'static,
    A::DownstreamError: StdError + Send + Sync + 'static,
    B::DownstreamError: StdError + Send + Sync + 'static,
    C::DownstreamError: StdError + Send + Sync + 'static,
{
    type Value = (A::Value, B::Value, C::Value);
    type Error = BoxError;
    type DownstreamError = BoxError;
    type Continuation<K>
        = DoAll3Continuation<K, A, B, C>
    where
        K: Continuation<(A::Value, B::Value, C::Value), Error = BoxError>;

    fn k<K>(self, downstream: K) -> Self::Continuation<K>
    where
        K: Continuation<(A::Value, B::Value, C::Value), Error = BoxError>,
    {
        DoAll3Continuation {
            a: self.a,
            b: self.b,
            c: self.c,
            downstream,
            interrupt: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventuals::{just, RunBlocking};

    #[test]
    fn joins_two_values_in_order() {
        let joined = do_all2(
            just::<_, std::convert::Infallible>(1),
            just::<_, std::convert::Infallible>("two"),
        )
        .run_blocking()
        .expect("both children succeed");
        assert_eq!(joined, (1, "two"));
    }

    #[test]
    fn joins_three_values_in_order() {
        let joined = do_all3(
            just::<_, std::convert::Infallible>(1),
            just::<_, std::convert::Infallible>("two"),
            just::<_, std::convert::Infallible>(3.0),
        )
        .run_blocking()
        .expect("all three children succeed");
        assert_eq!(joined, (1, "two", 3.0));
    }
}
