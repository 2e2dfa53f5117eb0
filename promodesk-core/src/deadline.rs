// SPDX-License-Identifier: MIT

use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::RequestError;

/// Deadlines of mutating calls, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub single_secs: u64,
    pub batch_secs: u64,
    pub file_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            single_secs: 10,
            batch_secs: 15,
            file_secs: 30,
        }
    }
}

impl Timeouts {
    pub fn single(&self) -> Duration {
        Duration::from_secs(self.single_secs)
    }

    pub fn batch(&self) -> Duration {
        Duration::from_secs(self.batch_secs)
    }

    pub fn file(&self) -> Duration {
        Duration::from_secs(self.file_secs)
    }
}

/// Runs `fut` until it settles, the deadline passes or `cancel` fires.
pub async fn with_deadline<T, Fut>(
    deadline: Duration,
    cancel: Option<CancellationToken>,
    fut: Fut,
) -> Result<T, RequestError>
where
    Fut: Future<Output = Result<T, RequestError>>,
{
    let cancelled = async {
        match &cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancelled => Err(RequestError::Aborted),
        r = tokio::time::timeout(deadline, fut) => r.unwrap_or(Err(RequestError::TimedOut)),
    }
}
