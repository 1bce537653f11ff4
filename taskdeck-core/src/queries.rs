use std::sync::Arc;

use crate::cache::{CacheOptions, QueryCache, QueryState};
use crate::types::{
    ApiError, PagedResponse, Task, TaskCreateRequest, TaskGateway, TaskQueryParams,
    TaskUpdateRequest,
};

/// Cached reads and invalidating writes over a [`TaskGateway`].
///
/// List pages are keyed by their parameters and single tasks by id; together
/// they form the `tasks` family that every successful mutation invalidates.
/// Reads retry per [`CacheOptions::retry`]; mutations never retry.
pub struct TaskQueries {
    gateway: Arc<dyn TaskGateway>,
    lists: QueryCache<TaskQueryParams, PagedResponse<Task>>,
    details: QueryCache<i64, Task>,
}

impl TaskQueries {
    pub fn new(gateway: Arc<dyn TaskGateway>, options: CacheOptions) -> Self {
        Self {
            gateway,
            lists: QueryCache::new(options),
            details: QueryCache::new(options),
        }
    }

    // ─── Reads ───────────────────────────────────────────────────────────

    pub async fn tasks(&self, params: &TaskQueryParams) -> Result<PagedResponse<Task>, ApiError> {
        let fetcher = self.list_fetcher(params);
        self.lists.fetch(params.clone(), fetcher).await
    }

    /// Fetch again regardless of freshness, as the list's "Try again" does.
    pub async fn refetch_tasks(
        &self,
        params: &TaskQueryParams,
    ) -> Result<PagedResponse<Task>, ApiError> {
        let fetcher = self.list_fetcher(params);
        self.lists.refetch(params.clone(), fetcher).await
    }

    /// Only positive ids are fetched; anything else stays idle.
    pub async fn task(&self, id: i64) -> QueryState<Task> {
        if id <= 0 {
            return QueryState::Idle;
        }
        let gateway = Arc::clone(&self.gateway);
        let result = self
            .details
            .fetch(id, move || {
                let gateway = Arc::clone(&gateway);
                async move { gateway.get_by_id(id).await }
            })
            .await;
        QueryState::from_result(result)
    }

    fn list_fetcher(
        &self,
        params: &TaskQueryParams,
    ) -> impl Fn() -> futures::future::BoxFuture<'static, Result<PagedResponse<Task>, ApiError>>
           + Send
           + Sync
           + 'static {
        use futures::FutureExt;

        let gateway = Arc::clone(&self.gateway);
        let params = params.clone();
        move || {
            let gateway = Arc::clone(&gateway);
            let params = params.clone();
            async move { gateway.list(&params).await }.boxed()
        }
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    pub async fn create_task(&self, request: &TaskCreateRequest) -> Result<Task, ApiError> {
        let task = self.gateway.create(request).await?;
        tracing::info!(id = task.id, "task created");
        self.invalidate_tasks();
        Ok(task)
    }

    pub async fn update_task(
        &self,
        id: i64,
        request: &TaskUpdateRequest,
    ) -> Result<Task, ApiError> {
        let task = self.gateway.update(id, request).await?;
        tracing::info!(id, "task updated");
        self.invalidate_tasks();
        Ok(task)
    }

    pub async fn toggle_task(&self, id: i64) -> Result<Task, ApiError> {
        let task = self.gateway.toggle(id).await?;
        tracing::info!(id, completed = task.is_completed, "task toggled");
        self.invalidate_tasks();
        Ok(task)
    }

    pub async fn delete_task(&self, id: i64) -> Result<(), ApiError> {
        self.gateway.delete(id).await?;
        tracing::info!(id, "task deleted");
        self.invalidate_tasks();
        Ok(())
    }

    /// Invalidate every cached list page and task.
    fn invalidate_tasks(&self) {
        self.lists.invalidate_all();
        self.details.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_gateway::MemoryTaskGateway;
    use crate::query::default_list_params;

    fn setup() -> (Arc<MemoryTaskGateway>, TaskQueries) {
        let gateway = Arc::new(MemoryTaskGateway::new());
        let queries = TaskQueries::new(gateway.clone(), CacheOptions::default());
        (gateway, queries)
    }

    fn request(title: &str) -> TaskCreateRequest {
        TaskCreateRequest {
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn repeated_list_reads_hit_the_cache() {
        let (gateway, queries) = setup();
        let params = default_list_params(10);

        queries.tasks(&params).await.unwrap();
        queries.tasks(&params).await.unwrap();
        assert_eq!(gateway.call_count("list"), 1);
    }

    #[tokio::test]
    async fn create_invalidates_list() {
        let (gateway, queries) = setup();
        let params = default_list_params(10);

        assert!(queries.tasks(&params).await.unwrap().is_empty());
        queries.create_task(&request("Fresh")).await.unwrap();

        let page = queries.tasks(&params).await.unwrap();
        assert_eq!(page.content.len(), 1);
        assert_eq!(page.content[0].title, "Fresh");
        assert_eq!(gateway.call_count("list"), 2);
    }

    #[tokio::test]
    async fn non_positive_id_is_never_fetched() {
        let (gateway, queries) = setup();
        assert_eq!(queries.task(0).await, QueryState::Idle);
        assert_eq!(queries.task(-4).await, QueryState::Idle);
        assert_eq!(gateway.call_count("get"), 0);
    }

    #[tokio::test]
    async fn missing_task_is_not_found_after_retry() {
        let (gateway, queries) = setup();
        let state = queries.task(99).await;
        assert!(matches!(state, QueryState::Error(err) if err.is_not_found()));
        assert_eq!(gateway.call_count("get"), 2);
    }

    #[tokio::test]
    async fn mutations_do_not_retry() {
        let (gateway, queries) = setup();
        gateway.fail_next("create", ApiError::new(500, "boom"));

        let err = queries.create_task(&request("Nope")).await.unwrap_err();
        assert_eq!(err.status, 500);
        assert_eq!(gateway.call_count("create"), 1);
    }

    #[tokio::test]
    async fn failed_mutation_keeps_cache() {
        let (gateway, queries) = setup();
        let params = default_list_params(10);
        queries.tasks(&params).await.unwrap();

        gateway.fail_next("toggle", ApiError::network());
        assert!(queries.toggle_task(1).await.is_err());

        queries.tasks(&params).await.unwrap();
        assert_eq!(gateway.call_count("list"), 1);
    }

    #[tokio::test]
    async fn toggle_is_visible_in_next_detail_read() {
        let (_gateway, queries) = setup();
        let task = queries.create_task(&request("Flip me")).await.unwrap();
        assert!(matches!(queries.task(task.id).await, QueryState::Success(t) if !t.is_completed));

        queries.toggle_task(task.id).await.unwrap();
        assert!(matches!(queries.task(task.id).await, QueryState::Success(t) if t.is_completed));
    }
}
