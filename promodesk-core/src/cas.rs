// SPDX-License-Identifier: MIT

use std::{sync::Arc, time::Duration};

use tokio::task::JoinSet;

use crate::{
    Error, RequestError,
    backend::Backend,
    chunk::{Chunk, TimeInterval, chunk},
    deadline::with_deadline,
    model::CreateAction,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ChunkOutcome {
    NotSent,
    Created(String),
    Failed(RequestError),
}

#[derive(Debug, Default)]
pub struct CasReport {
    pub total: usize,
    pub created: usize,
    /// 1-based ordinals of the chunks that are still missing on the server.
    pub failed: Vec<(usize, RequestError)>,
}

impl CasReport {
    pub fn is_success(&self) -> bool {
        self.created == self.total
    }
}

/// Turns one action window into several CAS actions, one per chunk.
///
/// Every chunk keeps its own outcome, so a second `send` re-sends only the chunks
/// that were not created yet.
pub struct CasExport {
    id_shop: String,
    name: String,
    chunks: Vec<Chunk>,
    outcomes: Vec<ChunkOutcome>,
}

impl CasExport {
    pub fn new(id_shop: &str, name: &str, interval: &TimeInterval, max_hours: f64) -> Result<Self, Error> {
        if id_shop.trim().is_empty() {
            return Err(Error::MissingField("idShop"));
        }

        let chunks = chunk(interval, max_hours)?;
        let outcomes = vec![ChunkOutcome::NotSent; chunks.len()];
        Ok(Self {
            id_shop: id_shop.to_string(),
            name: name.to_string(),
            chunks,
            outcomes,
        })
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn outcomes(&self) -> &[ChunkOutcome] {
        &self.outcomes
    }

    pub fn requests(&self) -> Vec<CreateAction> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(i, c)| CreateAction::from_chunk(&self.id_shop, i + 1, &self.name, c))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| matches!(o, ChunkOutcome::Created(_)))
    }

    /// Sends every chunk that is not created yet, all at once.
    #[tracing::instrument(level = "info", target = "cas_export", skip(self, backend), fields(name = %self.name))]
    pub async fn send(&mut self, backend: Arc<dyn Backend>, deadline: Duration) -> CasReport {
        let mut set = JoinSet::new();
        let mut sent = Vec::new();
        for (i, r) in self.requests().into_iter().enumerate() {
            if matches!(self.outcomes[i], ChunkOutcome::Created(_)) {
                continue;
            }

            sent.push(i);
            self.outcomes[i] = ChunkOutcome::NotSent;
            let backend = backend.clone();
            set.spawn(async move {
                let result = with_deadline(deadline, None, async { backend.create_action(&r).await }).await;
                (i, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((i, Ok(message))) => self.outcomes[i] = ChunkOutcome::Created(message),
                Ok((i, Err(e))) => {
                    tracing::error!(target: "cas_export", ordinal=i + 1, error=?e, "Create the chunk action");
                    self.outcomes[i] = ChunkOutcome::Failed(e);
                }
                Err(e) => tracing::error!(target: "cas_export", error=?e, "Join the create request"),
            }
        }

        for i in sent {
            if self.outcomes[i] == ChunkOutcome::NotSent {
                self.outcomes[i] = ChunkOutcome::Failed(RequestError::Transport("the request was lost".to_string()));
            }
        }

        self.report()
    }

    pub async fn retry_failed(&mut self, backend: Arc<dyn Backend>, deadline: Duration) -> CasReport {
        tracing::info!(target: "cas_export", name=self.name, "Retry the failed chunks");
        self.send(backend, deadline).await
    }

    pub fn report(&self) -> CasReport {
        let mut report = CasReport {
            total: self.outcomes.len(),
            ..CasReport::default()
        };
        for (i, o) in self.outcomes.iter().enumerate() {
            match o {
                ChunkOutcome::Created(_) => report.created += 1,
                ChunkOutcome::Failed(e) => report.failed.push((i + 1, e.clone())),
                ChunkOutcome::NotSent => {}
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{ActionStatus, Brandmaster, Shop},
        time::combine_date_time,
    };
    use async_trait::async_trait;
    use std::{collections::HashSet, sync::Mutex};
    use tokio_util::sync::CancellationToken;

    #[derive(Debug, Default)]
    struct FakeBackend {
        created: Mutex<Vec<CreateAction>>,
        failing: Mutex<HashSet<String>>,
    }

    impl FakeBackend {
        fn created_names(&self) -> Vec<String> {
            let mut names = self
                .created
                .lock()
                .unwrap()
                .iter()
                .filter_map(|r| r.action_name.clone())
                .collect::<Vec<String>>();
            names.sort();
            names
        }
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn create_action(&self, r: &CreateAction) -> Result<String, RequestError> {
            let name = r.action_name.clone().unwrap_or_default();
            if self.failing.lock().unwrap().contains(&name) {
                return Err(RequestError::server(500, None));
            }
            self.created.lock().unwrap().push(r.clone());
            Ok(format!("Created {name}"))
        }

        async fn set_action_status(&self, _: &str, _: ActionStatus) -> Result<String, RequestError> {
            Err(RequestError::Transport("unused".to_string()))
        }

        async fn shops(&self, _: CancellationToken) -> Result<Vec<Shop>, RequestError> {
            Ok(Vec::new())
        }

        async fn delete_shop(&self, _: &str) -> Result<String, RequestError> {
            Err(RequestError::Transport("unused".to_string()))
        }

        async fn brandmasters(&self, _: CancellationToken) -> Result<Vec<Brandmaster>, RequestError> {
            Ok(Vec::new())
        }

        async fn add_brandmasters(&self, _: &[Brandmaster]) -> Result<Vec<String>, RequestError> {
            Err(RequestError::Transport("unused".to_string()))
        }
    }

    fn working_day() -> TimeInterval {
        TimeInterval::new(
            combine_date_time(Some("2025-03-10"), Some("08:00")).unwrap(),
            combine_date_time(Some("2025-03-10"), Some("17:30")).unwrap(),
        )
        .unwrap()
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn requests_are_labelled() {
        let export = CasExport::new("12", "Degustacja", &working_day(), 4.0).unwrap();
        let requests = export.requests();

        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].action_name.as_deref(), Some("[1] Degustacja"));
        assert_eq!(requests[2].action_name.as_deref(), Some("[3] Degustacja"));
        assert_eq!(requests[2].since_system, "2025-03-10T15:00:00.000Z");
        assert_eq!(requests[2].until_system, "2025-03-10T16:30:00.000Z");
        assert!(requests.iter().all(|r| r.id_shop == "12"));
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn shop_is_required() {
        assert!(matches!(
            CasExport::new(" ", "Degustacja", &working_day(), 4.0),
            Err(Error::MissingField("idShop"))
        ));
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore)]
    async fn only_failed_chunks_are_retried() {
        let backend = Arc::new(FakeBackend::default());
        backend.failing.lock().unwrap().insert("[2] Degustacja".to_string());

        let mut export = CasExport::new("12", "Degustacja", &working_day(), 4.0).unwrap();
        let report = export.send(backend.clone(), Duration::from_secs(15)).await;

        assert!(!report.is_success());
        assert_eq!(report.created, 2);
        assert_eq!(report.failed, vec![(2, RequestError::server(500, None))]);
        assert!(!export.is_complete());

        backend.failing.lock().unwrap().clear();
        let report = export.retry_failed(backend.clone(), Duration::from_secs(15)).await;

        assert!(report.is_success());
        assert!(export.is_complete());
        assert_eq!(
            backend.created_names(),
            vec!["[1] Degustacja", "[2] Degustacja", "[3] Degustacja"]
        );
    }
}
