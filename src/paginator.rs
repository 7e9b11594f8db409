use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    api::PatientApi,
    config::PaginationConfig,
    error::FetchError,
    fetcher::BackoffFetcher,
    reliability::{Sleeper, TokioSleeper},
    types::{PageEnvelope, PatientRecord},
};

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("failed to fetch page {page}: {source}")]
    Fetch {
        page: u32,
        #[source]
        source: FetchError,
    },
    #[error("source still reports more pages after the {max_pages}-page limit")]
    PageLimitExceeded { max_pages: u32 },
}

/// Walks `GET /patients` page by page until the source reports no next page.
pub struct Paginator {
    fetcher: Arc<BackoffFetcher>,
    api: PatientApi,
    config: PaginationConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl Paginator {
    pub fn new(fetcher: Arc<BackoffFetcher>, api: PatientApi, config: PaginationConfig) -> Self {
        Self {
            fetcher,
            api,
            config,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub async fn fetch_all(&self) -> Result<Vec<PatientRecord>, PaginationError> {
        let page_delay = Duration::from_millis(self.config.page_delay_ms);
        let max_pages = self.config.max_pages.max(1);
        let mut records = Vec::new();
        let mut page = 1_u32;

        loop {
            let request = self.api.list_patients(page, self.config.page_size);
            let envelope: PageEnvelope = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|source| PaginationError::Fetch { page, source })?;

            let has_next = envelope.has_next();
            let page_records = envelope.data.unwrap_or_default();
            tracing::info!(
                target: "paginator",
                page = page,
                records = page_records.len(),
                has_next = has_next,
                total = ?envelope.pagination.as_ref().and_then(|p| p.total),
                total_pages = ?envelope.pagination.as_ref().and_then(|p| p.total_pages),
                "page_fetched"
            );
            records.extend(page_records);

            if !has_next {
                break;
            }
            if page >= max_pages {
                tracing::error!(
                    target: "paginator",
                    max_pages = max_pages,
                    records = records.len(),
                    "page_limit_exceeded"
                );
                return Err(PaginationError::PageLimitExceeded { max_pages });
            }

            self.sleeper.sleep(page_delay).await;
            page += 1;
        }

        tracing::info!(
            target: "paginator",
            pages = page,
            records = records.len(),
            "pagination_completed"
        );
        Ok(records)
    }
}
