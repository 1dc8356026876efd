mod _validator;

use std::convert::Infallible;

use eventuals::{
    finally, fork_join, foreach, just, then, unpack, Eventual, Outcome, RunBlocking,
};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

#[test]
fn finally_value_pass_through() {
    let result = just::<i32, Infallible>(5)
        .then_eventual(finally(|r: Result<i32, _>| r.map_or(-1, |v| v)))
        .run_blocking()
        .expect("finally never fails downstream");
    assert_eq!(result, 5);
}

#[test]
fn finally_on_stop() {
    let stopping = eventuals::eventual(|(): ()| -> Outcome<i32, Infallible> { Outcome::Stop });
    let result = stopping
        .then_eventual(finally(|r: Result<i32, _>| r.is_err()))
        .run_blocking()
        .expect("finally never fails downstream");
    assert!(result);
}

#[test]
fn fork_join_success_is_ordered_by_index() {
    let values = just::<Vec<i32>, TestError>(vec![1, 2, 3, 4])
        .then_eventual(fork_join("fj", 4, |i, v: &Vec<i32>| {
            just::<i32, TestError>(v[i] + 1)
        }))
        .run_blocking()
        .expect("every fork succeeds");
    assert_eq!(values, vec![2, 3, 4, 5]);
}

#[test]
fn fork_join_first_error_wins() {
    let result = just::<(), TestError>(())
        .then_eventual(fork_join("fj", 4, |i, (): &()| {
            eventuals::eventual(move |(): ()| -> Outcome<String, TestError> {
                if i == 3 {
                    Outcome::Fail(TestError("e".to_string()))
                } else {
                    Outcome::Start(i.to_string())
                }
            })
        }))
        .run_blocking();

    match result {
        Err(eventuals::PromiseError::Failed(TestError(message))) => assert_eq!(message, "e"),
        other => panic!("expected the lone fork's error, got {other:?}"),
    }
}

#[test]
fn fork_join_stop_dominates_error() {
    let result = just::<(), TestError>(())
        .then_eventual(fork_join("fj", 3, |i, (): &()| {
            eventuals::eventual(move |(): ()| -> Outcome<i32, TestError> {
                match i {
                    0 => Outcome::Stop,
                    1 => Outcome::Fail(TestError("e".to_string())),
                    _ => Outcome::Start(i as i32),
                }
            })
        }))
        .run_blocking();

    assert!(matches!(
        result,
        Err(eventuals::PromiseError::Stopped(_))
    ));
}

#[test]
fn foreach_over_range_collects_in_order() {
    let mut collected = Vec::new();
    let result = eventuals::iterate::<_, Infallible>(0..5)
        .then_eventual(then(move |values: Vec<usize>| {
            collected.extend(values);
            collected
        }))
        .run_blocking()
        .expect("iterate never fails");
    assert_eq!(result, vec![0, 1, 2, 3, 4]);
}

#[test]
fn foreach_pushes_every_element() {
    let pushed = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let pushed_for_closure = pushed.clone();
    foreach::<_, _, Infallible>(0..5, move |v| pushed_for_closure.lock().unwrap().push(v))
        .run_blocking()
        .expect("foreach never fails");
    assert_eq!(*pushed.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn unpack_feeds_a_tuple_to_a_two_argument_closure() {
    let result = just::<(i32, &str), Infallible>((4, "2"))
        .then_eventual(then(unpack(|i: i32, s: &str| format!("{i}{s}"))))
        .run_blocking()
        .expect("just never fails");
    assert_eq!(result, "42");
}
