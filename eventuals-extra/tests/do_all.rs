use eventuals::{Outcome, RunBlocking};
use eventuals_core::BoxError;
use eventuals_extra::{do_all2, do_all3};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

#[test]
fn do_all2_joins_differently_typed_children() {
    let joined = do_all2(
        eventuals::just::<i32, TestError>(1),
        eventuals::just::<&str, TestError>("two"),
    )
    .run_blocking()
    .expect("both children succeed");
    assert_eq!(joined, (1, "two"));
}

#[test]
fn do_all3_first_error_by_position_wins() {
    let result = do_all3(
        eventuals::eventual(|(): ()| -> Outcome<i32, TestError> {
            Outcome::Fail(TestError("a failed".to_string()))
        }),
        eventuals::just::<&str, TestError>("b"),
        eventuals::eventual(|(): ()| -> Outcome<f64, TestError> {
            Outcome::Fail(TestError("c failed".to_string()))
        }),
    )
    .run_blocking();

    match result {
        Err(eventuals::PromiseError::Failed(error)) => {
            let error: BoxError = error;
            assert_eq!(error.to_string(), "a failed");
        }
        other => panic!("expected the lowest-indexed child's error, got {other:?}"),
    }
}

#[test]
fn do_all2_stop_dominates_a_sibling_error() {
    let result = do_all2(
        eventuals::eventual(|(): ()| -> Outcome<i32, TestError> { Outcome::Stop }),
        eventuals::eventual(|(): ()| -> Outcome<&str, TestError> {
            Outcome::Fail(TestError("never reported".to_string()))
        }),
    )
    .run_blocking();

    assert!(matches!(result, Err(eventuals::PromiseError::Stopped(_))));
}
