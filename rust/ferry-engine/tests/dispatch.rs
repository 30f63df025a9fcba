//! Async dispatch through a real worker pool and the realm's job queue.

use ferry_core::{ArgSlot, CallError, TypedResult};
use ferry_engine::{AwaitError, PromiseState, Realm, Value};
use ferry_runtime::{
    job_queue, HostObject, HostObjectBuilder, JobQueue, Work, WorkerExecutor, WorkerPool,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

struct Harness {
    realm: Realm,
    queue: JobQueue<Realm>,
    pool: Arc<WorkerPool>,
    math: Value,
}

fn math_object(pool: Arc<WorkerPool>, queue: &JobQueue<Realm>) -> HostObject<Realm> {
    let mut builder = HostObjectBuilder::<Realm>::new("math");
    builder
        .with_async(pool, Arc::new(queue.sender()))
        .asynchronous("double", 1, |args| Ok((args.num(0)? * 2.0).into()))
        .asynchronous("fail", 0, |_| Err(CallError::failed("deliberate failure")))
        .asynchronous("explode", 0, |_| panic!("worker panic"))
        .asynchronous("echoBytes", 1, |args| Ok(args.buffer(0)?.to_vec().into()))
        .asynchronous("sleepThen", 2, |args| {
            thread::sleep(Duration::from_millis(args.num(0)? as u64));
            Ok(args.str(0)?.into())
        })
        .asynchronous("describe", 0, |args| {
            Ok(TypedResult::map([
                ("strings", args.strings.clone().into()),
                ("numbers", args.numbers.len().into()),
                ("bools", args.bools.len().into()),
                ("buffers", args.buffers.len().into()),
                ("positions", args.arg_count().into()),
                (
                    "group",
                    args.text_list(1)
                        .map(|g| g.to_vec().into())
                        .unwrap_or(TypedResult::Unit),
                ),
            ]))
        })
        .asynchronous("nested", 0, |_| {
            Ok(TypedResult::map([
                ("list", vec![1.into(), "two".into(), TypedResult::Unit].into()),
                ("inner", TypedResult::map([("ok", true.into())])),
            ]))
        });
    builder.build().unwrap()
}

fn harness() -> Harness {
    let mut realm = Realm::new();
    let (_tx, queue) = job_queue::<Realm>();
    let pool = Arc::new(WorkerPool::new(4).unwrap());
    let math = realm.install(math_object(Arc::clone(&pool), &queue));
    Harness {
        realm,
        queue,
        pool,
        math,
    }
}

impl Harness {
    fn call(&mut self, name: &str, args: &[Value]) -> Value {
        self.realm.call_method(&self.math, name, args).unwrap()
    }

    fn await_value(&mut self, promise: &Value) -> Result<Value, AwaitError> {
        self.realm.block_on(&self.queue, promise, WAIT)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

#[test]
fn double_21_resolves_to_42() {
    let mut h = harness();
    let promise = h.call("double", &[Value::Number(21.0)]);
    assert_eq!(h.await_value(&promise).unwrap(), Value::Number(42.0));
}

#[test]
fn async_call_returns_pending_promise_until_engine_pumps() {
    let mut h = harness();
    let promise = h.call("double", &[Value::Number(1.0)]);
    assert!(matches!(promise.promise_state(), Some(PromiseState::Pending)));

    // The worker finishes on its own, but settlement waits for the engine.
    h.pool.wait_for_completion(1, WAIT);
    assert!(promise.promise_state().unwrap().is_pending());

    assert!(h.queue.run_next(&mut h.realm, WAIT));
    assert!(matches!(
        promise.promise_state(),
        Some(PromiseState::Fulfilled(Value::Number(n))) if n == 2.0
    ));
}

#[test]
fn nested_results_materialize_depth_first() {
    let mut h = harness();
    let promise = h.call("nested", &[]);
    let value = h.await_value(&promise).unwrap();
    let list = value.get("list").unwrap();
    assert_eq!(list.length(), Some(3));
    assert_eq!(list.index(0), Some(Value::Number(1.0)));
    assert_eq!(list.index(1).unwrap().as_str(), Some("two"));
    assert!(list.index(2).unwrap().is_undefined());
    assert_eq!(value.get("inner").unwrap().get("ok"), Some(Value::Bool(true)));
}

// ---------------------------------------------------------------------------
// Rejection
// ---------------------------------------------------------------------------

#[test]
fn handler_error_rejects_with_its_message() {
    let mut h = harness();
    let promise = h.call("fail", &[]);
    assert_eq!(
        h.await_value(&promise).unwrap_err(),
        AwaitError::Rejected("deliberate failure".into())
    );
}

#[test]
fn rejection_reason_is_an_engine_error_value() {
    let mut h = harness();
    let promise = h.call("fail", &[]);
    let _ = h.await_value(&promise);
    match promise.promise_state() {
        Some(PromiseState::Rejected(reason)) => {
            assert_eq!(reason.error_message(), Some("deliberate failure"))
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn worker_panic_rejects_instead_of_unwinding() {
    let mut h = harness();
    let promise = h.call("explode", &[]);
    assert_eq!(
        h.await_value(&promise).unwrap_err(),
        AwaitError::Rejected("panic: worker panic".into())
    );

    // The pool is still usable afterwards.
    let promise = h.call("double", &[Value::Number(4.0)]);
    assert_eq!(h.await_value(&promise).unwrap(), Value::Number(8.0));
}

#[test]
fn missing_argument_rejects() {
    let mut h = harness();
    let promise = h.call("double", &[]);
    assert_eq!(
        h.await_value(&promise).unwrap_err(),
        AwaitError::Rejected("missing number argument at position 0".into())
    );
}

// ---------------------------------------------------------------------------
// Exactly-once settlement and independence
// ---------------------------------------------------------------------------

#[test]
fn every_call_settles_exactly_once() {
    let mut h = harness();
    let promises: Vec<Value> = (0..20)
        .map(|i| {
            if i % 3 == 0 {
                h.call("fail", &[])
            } else {
                h.call("double", &[Value::Number(i as f64)])
            }
        })
        .collect();
    assert_eq!(h.realm.pending_promises(), 20);

    for promise in &promises {
        let _ = h.await_value(promise);
    }
    assert_eq!(h.realm.pending_promises(), 0);

    // Nothing is left to deliver; a later pump changes no state.
    h.pool.wait_for_completion(20, WAIT);
    assert_eq!(h.queue.run_pending(&mut h.realm), 0);
    for (i, promise) in promises.iter().enumerate() {
        let state = promise.promise_state().unwrap();
        if i % 3 == 0 {
            assert!(matches!(state, PromiseState::Rejected(_)));
        } else {
            assert!(matches!(state, PromiseState::Fulfilled(Value::Number(n)) if n == 2.0 * i as f64));
        }
    }
}

#[test]
fn concurrent_calls_of_the_same_method_are_independent() {
    let mut h = harness();
    let slow = h.call("sleepThen", &[Value::Number(50.0), Value::string("slow")]);
    let fast = h.call("sleepThen", &[Value::Number(1.0), Value::string("fast")]);
    let failing = h.call("fail", &[]);

    assert_eq!(h.await_value(&fast).unwrap().as_str(), Some("fast"));
    assert!(h.await_value(&failing).is_err());
    assert_eq!(h.await_value(&slow).unwrap().as_str(), Some("slow"));
}

#[test]
fn calls_from_many_batches_all_resolve() {
    let mut h = harness();
    let promises: Vec<Value> = (0..100)
        .map(|i| h.call("double", &[Value::Number(i as f64)]))
        .collect();
    // Await in reverse to exercise out-of-order settlement.
    for (i, promise) in promises.iter().enumerate().rev() {
        assert_eq!(h.await_value(promise).unwrap(), Value::Number(2.0 * i as f64));
    }
    assert_eq!(h.realm.pending_promises(), 0);
}

// ---------------------------------------------------------------------------
// Bytes
// ---------------------------------------------------------------------------

#[test]
fn bytes_round_trip_preserves_length_and_content() {
    let mut h = harness();
    for n in [0usize, 1, 4096] {
        let data: Vec<u8> = (0..n).map(|i| (i % 251) as u8).collect();
        let promise = h.call("echoBytes", &[Value::buffer(data.clone())]);
        let value = h.await_value(&promise).unwrap();
        assert_eq!(value.length(), Some(n), "length for n = {}", n);
        assert_eq!(value.to_bytes().unwrap(), data, "content for n = {}", n);
    }
}

#[test]
fn returned_buffer_is_a_fresh_allocation() {
    let mut h = harness();
    let input = Value::buffer(vec![9, 9]);
    let promise = h.call("echoBytes", &[input.clone()]);
    let output = h.await_value(&promise).unwrap();
    assert_ne!(input, output);
    assert_eq!(output.to_bytes(), Some(vec![9, 9]));
}

// ---------------------------------------------------------------------------
// Argument extraction
// ---------------------------------------------------------------------------

#[test]
fn string_arrays_flatten_after_preceding_strings() {
    let mut h = harness();
    let promise = h.call(
        "describe",
        &[
            Value::string("a"),
            Value::array(vec![
                Value::string("b"),
                Value::Number(1.0),
                Value::string("c"),
            ]),
            Value::Number(2.0),
            Value::Bool(true),
            Value::buffer(vec![1]),
            Value::Undefined,
            Value::string("d"),
        ],
    );
    let value = h.await_value(&promise).unwrap();

    let strings = value.get("strings").unwrap();
    let strings: Vec<String> = (0..strings.length().unwrap())
        .map(|i| strings.index(i).unwrap().as_str().unwrap().to_string())
        .collect();
    assert_eq!(strings, vec!["a", "b", "c", "d"]);

    // The non-string array element is dropped, not moved to the number bucket.
    assert_eq!(value.get("numbers"), Some(Value::Number(1.0)));
    assert_eq!(value.get("bools"), Some(Value::Number(1.0)));
    assert_eq!(value.get("buffers"), Some(Value::Number(1.0)));
    assert_eq!(value.get("positions"), Some(Value::Number(7.0)));

    let group = value.get("group").unwrap();
    assert_eq!(group.length(), Some(2));
    assert_eq!(group.index(1).unwrap().as_str(), Some("c"));
}

#[test]
fn extraction_records_slots_per_position() {
    let realm = Realm::new();
    let args = ferry_core::AsyncArgs::extract(
        &realm,
        &[
            Value::Number(3.0),
            Value::array(vec![Value::string("x")]),
            Value::object(Vec::new()),
            Value::string("y"),
        ],
    );
    assert_eq!(
        args.slots,
        vec![
            ArgSlot::Number(0),
            ArgSlot::TextList { start: 0, len: 1 },
            ArgSlot::Skipped,
            ArgSlot::Text(1),
        ]
    );
    assert_eq!(args.strings, vec!["x", "y"]);
}

// ---------------------------------------------------------------------------
// Engine identity
// ---------------------------------------------------------------------------

#[test]
fn settlement_delivered_to_another_engine_is_dropped() {
    let mut h = harness();
    let host = h.math.clone();

    // A second realm shares the host object, but settlements still flow
    // through the first realm's queue.
    let mut other = Realm::new();
    other.set_global("math", host.clone());
    let promise = other.call_method(&host, "double", &[Value::Number(5.0)]).unwrap();

    h.pool.wait_for_completion(1, WAIT);
    assert!(h.queue.run_next(&mut h.realm, WAIT));

    assert!(promise.promise_state().unwrap().is_pending());
    assert_eq!(other.pending_promises(), 1);
    assert_eq!(h.realm.pending_promises(), 0);
}

// ---------------------------------------------------------------------------
// Executor loss
// ---------------------------------------------------------------------------

struct Discard;

impl WorkerExecutor for Discard {
    fn execute(&self, work: Work) {
        drop(work);
    }
}

fn double_on(executor: Arc<dyn WorkerExecutor>, queue: &JobQueue<Realm>) -> HostObject<Realm> {
    let mut builder = HostObjectBuilder::<Realm>::new("math");
    builder
        .with_async(executor, Arc::new(queue.sender()))
        .asynchronous("double", 1, |args| Ok((args.num(0)? * 2.0).into()));
    builder.build().unwrap()
}

#[test]
fn work_dropped_by_the_executor_rejects() {
    let mut realm = Realm::new();
    let (_tx, queue) = job_queue::<Realm>();
    let math = realm.install(double_on(Arc::new(Discard), &queue));

    let promise = realm.call_method(&math, "double", &[Value::Number(21.0)]).unwrap();
    let err = realm.block_on(&queue, &promise, WAIT).unwrap_err();
    assert_eq!(
        err,
        AwaitError::Rejected("worker executor dropped the call".into())
    );
    assert_eq!(realm.pending_promises(), 0);
}

#[test]
fn calls_after_pool_shutdown_still_settle() {
    let mut pool = WorkerPool::new(1).unwrap();
    pool.shutdown();
    let mut realm = Realm::new();
    let (_tx, queue) = job_queue::<Realm>();
    let math = realm.install(double_on(Arc::new(pool), &queue));

    let promise = realm.call_method(&math, "double", &[Value::Number(21.0)]).unwrap();
    let err = realm
        .block_on(&queue, &promise, Duration::from_millis(500))
        .unwrap_err();
    assert!(matches!(err, AwaitError::Rejected(_)));
    assert_eq!(realm.pending_promises(), 0);
}
