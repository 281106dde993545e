use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use quota_ledger::domain::types::ConsumeContext;
use quota_ledger::error::LedgerServiceError;
use quota_ledger::usecase::ledger::RetryPolicy;
use quota_ledger::usecase::metered::{Metered, MeteredWorkUseCase};

use crate::helpers::{MockLedger, ledger, seed, setup_db, test_code, usage_count};

fn retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff: Duration::from_millis(10),
    }
}

#[tokio::test]
async fn should_return_artifact_after_consuming() {
    let mock = MockLedger::new(vec![test_code("RENDER", 2)]);
    let codes = mock.codes_handle();
    let usecase = MeteredWorkUseCase {
        ledger: mock,
        retry: retry(3),
    };

    let metered = usecase
        .execute("RENDER", ConsumeContext::default(), || async {
            Ok::<_, LedgerServiceError>("chart.png".to_owned())
        })
        .await
        .unwrap();
    assert_eq!(
        metered,
        Metered {
            artifact: "chart.png".to_owned(),
            remaining_usage: 1,
        }
    );
    assert_eq!(codes.lock().unwrap()[0].usage_count, 1);
}

#[tokio::test]
async fn should_skip_work_for_unusable_code() {
    let mut exhausted = test_code("SPENT", 1);
    exhausted.usage_count = 1;
    let mock = MockLedger::new(vec![exhausted]);
    let calls = mock.calls_handle();
    let usecase = MeteredWorkUseCase {
        ledger: mock,
        retry: retry(3),
    };
    let ran = Arc::new(AtomicBool::new(false));

    let ran_in_work = Arc::clone(&ran);
    let result = usecase
        .execute("SPENT", ConsumeContext::default(), || async move {
            ran_in_work.store(true, Ordering::SeqCst);
            Ok::<_, LedgerServiceError>(())
        })
        .await;
    assert!(
        matches!(result, Err(LedgerServiceError::AccessCodeExhausted)),
        "expected AccessCodeExhausted, got {result:?}"
    );
    assert!(!ran.load(Ordering::SeqCst), "work must not run");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn should_report_unknown_code_as_not_found() {
    let usecase = MeteredWorkUseCase {
        ledger: MockLedger::new(vec![]),
        retry: retry(3),
    };
    let result = usecase
        .execute("NOPE", ConsumeContext::default(), || async {
            Ok::<_, LedgerServiceError>(())
        })
        .await;
    assert!(
        matches!(result, Err(LedgerServiceError::AccessCodeNotFound)),
        "expected AccessCodeNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_consume_when_work_fails() {
    let mock = MockLedger::new(vec![test_code("FRAGILE", 2)]);
    let codes = mock.codes_handle();
    let calls = mock.calls_handle();
    let usecase = MeteredWorkUseCase {
        ledger: mock,
        retry: retry(3),
    };

    let result: Result<Metered<()>, _> = usecase
        .execute("FRAGILE", ConsumeContext::default(), || async {
            Err(LedgerServiceError::Internal(anyhow::anyhow!(
                "renderer crashed"
            )))
        })
        .await;
    assert!(
        matches!(result, Err(LedgerServiceError::Internal(_))),
        "expected Internal, got {result:?}"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(codes.lock().unwrap()[0].usage_count, 0);
}

#[tokio::test]
async fn should_discard_artifact_when_race_is_lost() {
    let mock = MockLedger::new(vec![test_code("ONE", 1)]);
    let codes = mock.codes_handle();
    let usecase = MeteredWorkUseCase {
        ledger: mock,
        retry: retry(3),
    };

    // A competing caller takes the last unit while our work is running.
    let competitor = Arc::clone(&codes);
    let result = usecase
        .execute("ONE", ConsumeContext::default(), || async move {
            competitor.lock().unwrap()[0].usage_count = 1;
            Ok::<_, LedgerServiceError>("wasted.png")
        })
        .await;
    assert!(
        matches!(result, Err(LedgerServiceError::AccessCodeExhausted)),
        "expected AccessCodeExhausted, got {result:?}"
    );
    assert_eq!(codes.lock().unwrap()[0].usage_count, 1);
}

#[tokio::test(start_paused = true)]
async fn should_retry_busy_ledger_after_work() {
    let mock = MockLedger::new(vec![test_code("SLOW", 3)]).busy_for(2);
    let calls = mock.calls_handle();
    let usecase = MeteredWorkUseCase {
        ledger: mock,
        retry: retry(3),
    };

    let metered = usecase
        .execute("SLOW", ConsumeContext::default(), || async {
            Ok::<_, LedgerServiceError>(7)
        })
        .await
        .unwrap();
    assert_eq!(metered.artifact, 7);
    assert_eq!(metered.remaining_usage, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn should_surface_busy_not_exhausted_when_retries_run_out() {
    let mock = MockLedger::new(vec![test_code("JAM", 3)]).busy_for(10);
    let codes = mock.codes_handle();
    let usecase = MeteredWorkUseCase {
        ledger: mock,
        retry: retry(2),
    };

    let result = usecase
        .execute("JAM", ConsumeContext::default(), || async {
            Ok::<_, LedgerServiceError>(())
        })
        .await;
    assert!(
        matches!(result, Err(LedgerServiceError::LedgerBusy)),
        "expected LedgerBusy, got {result:?}"
    );
    assert_eq!(codes.lock().unwrap()[0].usage_count, 0);
}

#[tokio::test]
async fn should_meter_against_database_ledger() {
    let db = setup_db().await;
    let code = seed(&db, test_code("DBWORK", 1)).await;
    let usecase = MeteredWorkUseCase {
        ledger: ledger(&db),
        retry: retry(3),
    };

    let first = usecase
        .execute("DBWORK", ConsumeContext::default(), || async {
            Ok::<_, LedgerServiceError>("first")
        })
        .await
        .unwrap();
    assert_eq!(first.remaining_usage, 0);

    let second = usecase
        .execute("DBWORK", ConsumeContext::default(), || async {
            Ok::<_, LedgerServiceError>("second")
        })
        .await;
    assert!(
        matches!(second, Err(LedgerServiceError::AccessCodeExhausted)),
        "expected AccessCodeExhausted, got {second:?}"
    );
    assert_eq!(usage_count(&db, code.id).await, 1);
}
