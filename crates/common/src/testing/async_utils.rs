//! Async testing utilities
//!
//! Timeouts and polling for tests that observe spawned work.

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Assert that an async condition becomes true within a timeout
///
/// The condition expression is re-evaluated (and awaited) every 10ms.
///
/// # Examples
///
/// ```no_run
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[tokio::test(flavor = "multi_thread")]
/// async fn test_eventually() {
///     let flag = Arc::new(AtomicBool::new(false));
///     let setter = flag.clone();
///
///     tokio::spawn(async move {
///         tokio::time::sleep(Duration::from_millis(100)).await;
///         setter.store(true, Ordering::SeqCst);
///     });
///
///     keeper_common::assert_eventually_async!(Duration::from_secs(1), async {
///         flag.load(Ordering::SeqCst)
///     });
/// }
/// ```
#[macro_export]
macro_rules! assert_eventually_async {
    ($timeout:expr, $fut:expr) => {{
        let timeout_duration = $timeout;
        let result = tokio::time::timeout(timeout_duration, async {
            loop {
                if $fut.await {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;

        assert!(result.is_ok(), "Condition did not become true within {:?}", timeout_duration);
    }};
}

/// Await `fut`, failing with `Elapsed` if it takes longer than `duration`
///
/// Useful for awaiting a repeater's completion stream without letting a
/// broken run hang the test suite.
///
/// ```no_run
/// use std::time::Duration;
///
/// use keeper_common::resilience::repeater::{Context, Repeater};
/// use keeper_common::testing::timeout_ok;
///
/// # async fn demo() {
/// let repeater = Repeater::<(), u8, std::io::Error>::new()
///     .with_operation(|_ctx: Context, ()| async { Ok(1) });
/// let (done, _retries) = repeater.run(&Context::background(), ());
///
/// let event = timeout_ok(Duration::from_secs(1), done).await.unwrap().unwrap();
/// assert!(event.is_success());
/// # }
/// ```
pub async fn timeout_ok<F, T>(duration: Duration, fut: F) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut).await
}

/// Poll an async condition every `interval` until it holds or `timeout`
/// passes. Returns whether the condition held.
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;

    while Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }

    false
}
