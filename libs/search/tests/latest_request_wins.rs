//! Out-of-order responses against a single search session
//!
//! Requests run as independent tasks while the session stays usable; their
//! outcomes are fed back in the order they actually finish.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::error::ApiResult;
use search::{
    Completion, PatientFilters, PendingSearch, QueryCache, SearchBackend, SearchRequest,
    SearchSession, SearchState,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Answers every request after a delay chosen from the `name` filter
struct SlowBackend;

#[async_trait]
impl SearchBackend for SlowBackend {
    async fn fetch(&self, request: &SearchRequest) -> ApiResult<Value> {
        let name = request.get("name").unwrap_or("").to_string();
        let delay = if name == "slow" { 150 } else { 10 };
        tokio::time::sleep(Duration::from_millis(delay)).await;

        Ok(json!({
            "items": [{
                "id": 1,
                "name": name,
                "phone": "0803555000",
                "age": 40,
                "sex": "male",
                "patient_type": "regular",
                "status": "active",
                "facility_id": 1,
                "created_at": "2024-01-01T00:00:00Z"
            }],
            "total_count": 1,
            "page": 1,
            "page_size": 20,
            "total_pages": 1,
            "has_next": false,
            "has_previous": false
        }))
    }
}

fn dispatch(
    backend: Arc<SlowBackend>,
    pending: PendingSearch,
    done: mpsc::UnboundedSender<(PendingSearch, ApiResult<Value>)>,
) {
    tokio::spawn(async move {
        let outcome = pending.execute(backend.as_ref()).await;
        let _ = done.send((pending, outcome));
    });
}

#[tokio::test]
async fn test_late_response_for_abandoned_filters_is_discarded() {
    let backend = Arc::new(SlowBackend);
    let cache = QueryCache::new();
    let mut session = SearchSession::new(PatientFilters::default(), cache.clone());
    let (done, mut finished) = mpsc::unbounded_channel();

    session.update_filters(|f| f.name = Some("slow".to_string()));
    dispatch(backend.clone(), session.begin_search().expect("A"), done.clone());

    session.update_filters(|f| f.name = Some("fast".to_string()));
    dispatch(backend.clone(), session.begin_search().expect("B"), done.clone());
    assert_eq!(session.state(), SearchState::Loading);

    let mut completions = Vec::new();
    for _ in 0..2 {
        let (pending, outcome) = finished.recv().await.expect("outcome");
        let name = pending.request().get("name").unwrap_or("").to_string();
        let completion = session.complete(pending, outcome).await.expect("complete");
        completions.push((name, completion));
    }

    assert_eq!(
        completions,
        vec![
            ("fast".to_string(), Completion::Applied),
            ("slow".to_string(), Completion::Stale),
        ]
    );
    assert_eq!(session.state(), SearchState::Ready);
    assert_eq!(
        session.last_page().map(|p| p.items[0].name.as_str()),
        Some("fast")
    );

    // Both responses still land in their own cache slots
    assert_eq!(cache.len().await, 2);
}

#[tokio::test]
async fn test_rapid_paging_keeps_the_latest_page_request() {
    let backend = Arc::new(SlowBackend);
    let mut session = SearchSession::new(PatientFilters::default(), QueryCache::new());
    let (done, mut finished) = mpsc::unbounded_channel();

    session.update_filters(|f| f.name = Some("slow".to_string()));
    dispatch(backend.clone(), session.begin_page_change(2).expect("page 2"), done.clone());
    session.update_filters(|f| f.name = Some("fast".to_string()));
    dispatch(backend.clone(), session.begin_page_change(3).expect("page 3"), done.clone());

    let mut applied = 0;
    for _ in 0..2 {
        let (pending, outcome) = finished.recv().await.expect("outcome");
        if session.complete(pending, outcome).await.expect("complete") == Completion::Applied {
            applied += 1;
        }
    }

    assert_eq!(applied, 1);
    assert_eq!(
        session.last_page().map(|p| p.items[0].name.as_str()),
        Some("fast")
    );
}
