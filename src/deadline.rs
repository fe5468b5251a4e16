use crate::error::Error;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// A single deadline covering connect + send + receive for one agent call.
///
/// Adapted from `hreq`'s own `Deadline` (`deadline.rs`), which races a
/// future against a runtime-agnostic delay. Since this crate commits to
/// `tokio` alone (see `DESIGN.md`), the race collapses to `tokio::time::timeout`.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Deadline {
    budget: Duration,
}

impl Deadline {
    pub fn new(budget: Duration) -> Self {
        Deadline { budget }
    }

    /// Run `f` to completion, or fail with [`Error::Timeout`] once the
    /// deadline elapses. One fewer layer of indirection than a
    /// multi-runtime race, since there is only one runtime here.
    pub async fn race<T, F, E>(&self, f: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<Error>,
    {
        match timeout(self.budget, f).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => Err(Error::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_within_budget() {
        let d = Deadline::new(Duration::from_millis(50));
        let got: Result<u32, Error> = d.race(async { Ok::<_, Error>(7) }).await;
        assert_eq!(got.unwrap(), 7);
    }

    #[tokio::test]
    async fn times_out_past_budget() {
        let d = Deadline::new(Duration::from_millis(5));
        let got: Result<u32, Error> = d
            .race(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok::<_, Error>(7)
            })
            .await;
        assert!(matches!(got, Err(Error::Timeout)));
    }
}
