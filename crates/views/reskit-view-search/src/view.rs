//! Search view state

use reskit_core::{Paper, ResearchApi, ReskitError, Result, SearchCategory, SearchResponse};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Finished search request
#[derive(Debug)]
pub struct SearchUpdate {
    /// Sequence number the request was issued with
    pub seq: u64,
    /// Service reply
    pub result: Result<SearchResponse>,
}

/// Query, category and the results of the latest request
pub struct SearchView {
    api: Arc<dyn ResearchApi>,
    updates: mpsc::UnboundedSender<SearchUpdate>,
    query: String,
    category: SearchCategory,
    results: Vec<Paper>,
    loading: bool,
    error: Option<String>,
    issued: u64,
}

impl SearchView {
    /// Empty view
    pub fn new(api: Arc<dyn ResearchApi>, updates: mpsc::UnboundedSender<SearchUpdate>) -> Self {
        Self {
            api,
            updates,
            query: String::new(),
            category: SearchCategory::default(),
            results: Vec::new(),
            loading: false,
            error: None,
            issued: 0,
        }
    }

    /// Current query text
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replace the query text
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Selected category
    pub fn category(&self) -> SearchCategory {
        self.category
    }

    /// Select a category
    pub fn set_category(&mut self, category: SearchCategory) {
        self.category = category;
    }

    /// Results of the latest applied request
    pub fn results(&self) -> &[Paper] {
        &self.results
    }

    /// A request is outstanding
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// `Search failed: ...` after a failed request
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Issue the query in the background
    ///
    /// Returns the request's sequence number, or `None` for a blank query.
    pub fn submit(&mut self) -> Option<u64> {
        let seq = self.begin()?;
        let api = self.api.clone();
        let updates = self.updates.clone();
        let query = self.query.clone();
        let category = self.category;
        tokio::spawn(async move {
            let result = api.search(&query, category).await;
            let _ = updates.send(SearchUpdate { seq, result });
        });
        Some(seq)
    }

    /// Issue the query and wait for it
    ///
    /// Returns `false` for a blank query; otherwise the outcome is in
    /// [`SearchView::results`] and [`SearchView::error`].
    pub async fn search_now(&mut self) -> bool {
        let Some(seq) = self.begin() else {
            return false;
        };
        let result = self.api.search(&self.query, self.category).await;
        self.apply(SearchUpdate { seq, result })
    }

    /// Apply a finished request; stale ones are ignored
    pub fn apply(&mut self, update: SearchUpdate) -> bool {
        if update.seq != self.issued {
            debug!(seq = update.seq, latest = self.issued, "Discarding stale search result");
            return false;
        }
        self.loading = false;
        match update.result {
            Ok(response) => {
                info!(count = response.results.len(), "Search results");
                self.results = response.results;
                self.error = None;
            }
            Err(e) => {
                warn!(error = %e, "Search failed");
                self.results.clear();
                self.error = Some(format!("Search failed: {}", failure_text(&e)));
            }
        }
        true
    }

    fn begin(&mut self) -> Option<u64> {
        if self.query.trim().is_empty() {
            return None;
        }
        self.issued += 1;
        self.loading = true;
        self.error = None;
        debug!(seq = self.issued, query = %self.query, category = %self.category, "Searching");
        Some(self.issued)
    }
}

fn failure_text(error: &ReskitError) -> String {
    match error {
        ReskitError::Api { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
