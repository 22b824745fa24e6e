use async_trait::async_trait;
use chrono::NaiveDateTime;
use mockall::mock;
use reskit_core::*;
use reskit_view_search::{SearchUpdate, SearchView};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

mock! {
    pub Api {}

    #[async_trait]
    impl ResearchApi for Api {
        async fn profile(&self) -> Result<User>;
        async fn login(&self, request: LoginRequest) -> Result<AuthResponse>;
        async fn register(&self, request: RegisterRequest) -> Result<AuthResponse>;
        async fn logout(&self) -> Result<()>;
        async fn projects(&self) -> Result<Vec<Project>>;
        async fn project(&self, id: &ProjectId) -> Result<Project>;
        async fn create_project(&self, name: &str) -> Result<Project>;
        async fn search(&self, query: &str, category: SearchCategory) -> Result<SearchResponse>;
        async fn upload(&self, project: &ProjectId, file: FileUpload) -> Result<UploadReceipt>;
        async fn send_message(&self, request: SendMessageRequest) -> Result<SendReceipt>;
        async fn read_messages(
            &self,
            project: &ProjectId,
            after: Option<NaiveDateTime>,
        ) -> Result<Vec<Message>>;
    }
}

fn titled(title: &str) -> SearchResponse {
    SearchResponse {
        results: vec![Paper {
            title: title.to_string(),
            ..Default::default()
        }],
    }
}

fn view_with(api: MockApi) -> (SearchView, mpsc::UnboundedReceiver<SearchUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SearchView::new(Arc::new(api), tx), rx)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<SearchUpdate>) -> SearchUpdate {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("update in time")
        .expect("channel open")
}

fn titles(view: &SearchView) -> Vec<&str> {
    view.results().iter().map(|p| p.title.as_str()).collect()
}

#[tokio::test]
async fn test_stale_response_never_overwrites_newer() {
    let mut api = MockApi::new();
    api.expect_search().returning(|q, _| Ok(titled(q)));
    let (mut view, mut rx) = view_with(api);

    view.set_query("first");
    let first = view.submit().unwrap();
    view.set_query("second");
    let second = view.submit().unwrap();
    assert!(second > first);

    let mut updates = vec![next(&mut rx).await, next(&mut rx).await];
    // deliver the newer response first, then the older one
    updates.sort_by_key(|u| std::cmp::Reverse(u.seq));
    let applied: Vec<bool> = updates.into_iter().map(|u| view.apply(u)).collect();

    assert_eq!(applied, vec![true, false]);
    assert_eq!(titles(&view), vec!["second"]);
    assert!(!view.is_loading());
}

#[tokio::test]
async fn test_repeated_search_replaces_results() {
    let mut api = MockApi::new();
    api.expect_search()
        .withf(|q, c| q == "transformers" && *c == SearchCategory::Papers)
        .times(2)
        .returning(|q, _| Ok(titled(q)));
    let (mut view, _rx) = view_with(api);
    view.set_query("transformers");
    view.set_category(SearchCategory::Papers);

    assert!(view.search_now().await);
    assert!(view.search_now().await);
    assert_eq!(titles(&view), vec!["transformers"]);
}

#[tokio::test]
async fn test_blank_query_issues_nothing() {
    let mut api = MockApi::new();
    api.expect_search().never();
    let (mut view, _rx) = view_with(api);

    view.set_query("   ");
    assert!(view.submit().is_none());
    assert!(!view.search_now().await);
    assert!(!view.is_loading());
}

#[tokio::test]
async fn test_failure_sets_message_and_clears_results() {
    let mut api = MockApi::new();
    api.expect_search()
        .withf(|q, _| q == "ok")
        .returning(|q, _| Ok(titled(q)));
    api.expect_search()
        .withf(|q, _| q == "broken")
        .returning(|_, _| Err(ReskitError::api(500, "index offline")));
    let (mut view, _rx) = view_with(api);

    view.set_query("ok");
    view.search_now().await;
    assert_eq!(titles(&view), vec!["ok"]);

    view.set_query("broken");
    view.search_now().await;
    assert!(view.results().is_empty());
    assert_eq!(view.error(), Some("Search failed: index offline"));

    view.set_query("ok");
    view.search_now().await;
    assert_eq!(view.error(), None);
}

#[tokio::test]
async fn test_loading_while_outstanding() {
    let mut api = MockApi::new();
    api.expect_search().returning(|q, _| Ok(titled(q)));
    let (mut view, mut rx) = view_with(api);

    view.set_query("graphs");
    view.submit();
    assert!(view.is_loading());
    let update = next(&mut rx).await;
    view.apply(update);
    assert!(!view.is_loading());
}
