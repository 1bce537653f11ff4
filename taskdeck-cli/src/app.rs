use std::sync::Arc;

use taskdeck_core::{
    apply_update, default_list_params, validate, ApiError, CacheOptions, ConfirmDialog, FormField,
    Navigator, ParamsUpdate, QueryState, Route, TaskFormValues, TaskGateway, TaskQueries,
    TaskQueryParams, ViewGuard,
};

use crate::error::AppError;
use crate::views::{DetailView, FormMode, FormView, ListView, Screen, View};

#[derive(Debug, Clone, Copy)]
pub struct AppOptions {
    pub page_size: u32,
    pub cache: CacheOptions,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            page_size: taskdeck_core::query::DEFAULT_PAGE_SIZE,
            cache: CacheOptions::default(),
        }
    }
}

/// The client application: current route, the page it shows, list controls
/// and the delete confirmation.
///
/// Data loads are split into [`App::begin_load`] and [`App::apply`] so a
/// result that resolves after the user moved on is dropped instead of
/// overwriting the page they are now on.
pub struct App {
    queries: Arc<TaskQueries>,
    nav: Navigator,
    list_params: TaskQueryParams,
    dialog: ConfirmDialog<i64>,
    view: View,
    notice: Option<String>,
}

/// A data load started for one route.
pub struct PendingLoad {
    guard: ViewGuard,
    route: Route,
    params: TaskQueryParams,
    force: bool,
    queries: Arc<TaskQueries>,
}

/// A resolved load, not yet applied.
pub struct LoadedView {
    guard: ViewGuard,
    view: View,
}

impl PendingLoad {
    pub fn route(&self) -> Route {
        self.route
    }

    pub async fn resolve(self) -> LoadedView {
        let view = match self.route {
            Route::TaskList => {
                let outcome = if self.force {
                    self.queries.refetch_tasks(&self.params).await
                } else {
                    self.queries.tasks(&self.params).await
                };
                View::List(ListView {
                    params: self.params,
                    outcome,
                })
            }
            Route::TaskCreate => View::Form(FormView::create()),
            Route::TaskDetail(id) => match self.queries.task(id).await {
                QueryState::Success(task) => View::Detail(DetailView { task }),
                other => failure_view(other),
            },
            Route::TaskEdit(id) => match self.queries.task(id).await {
                QueryState::Success(task) => View::Form(FormView::new(
                    FormMode::Edit(task.id),
                    TaskFormValues::from_task(&task),
                )),
                other => failure_view(other),
            },
        };
        LoadedView {
            guard: self.guard,
            view,
        }
    }
}

/// Idle reads and 404s both mean there is no such task.
fn failure_view<T>(state: QueryState<T>) -> View {
    match state {
        QueryState::Error(err) if !err.is_not_found() => View::Failed(err),
        _ => View::NotFound,
    }
}

impl App {
    pub fn new(gateway: Arc<dyn TaskGateway>, options: AppOptions) -> Self {
        Self {
            queries: Arc::new(TaskQueries::new(gateway, options.cache)),
            nav: Navigator::default(),
            list_params: default_list_params(options.page_size),
            dialog: ConfirmDialog::new(),
            view: View::Loading(Route::TaskList),
            notice: None,
        }
    }

    /// Adjust the list controls before the first load.
    pub fn preset(&mut self, updates: impl IntoIterator<Item = ParamsUpdate>) {
        for update in updates {
            self.list_params = apply_update(&self.list_params, update);
        }
    }

    /// Load the initial page.
    pub async fn start(&mut self) {
        self.load(false).await;
    }

    // ─── State ───────────────────────────────────────────────────────────

    pub fn route(&self) -> Route {
        self.nav.current()
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn list_params(&self) -> &TaskQueryParams {
        &self.list_params
    }

    pub fn dialog_open(&self) -> bool {
        self.dialog.is_open()
    }

    pub fn pending_delete(&self) -> Option<i64> {
        self.dialog.pending().copied()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn queries(&self) -> &Arc<TaskQueries> {
        &self.queries
    }

    pub fn render(&self) -> String {
        Screen {
            route: self.route(),
            view: &self.view,
            notice: self.notice.as_deref(),
            dialog_open: self.dialog.is_open(),
        }
        .to_string()
    }

    // ─── Loading ─────────────────────────────────────────────────────────

    /// Start loading the current route. The caller resolves the returned
    /// load and hands it to [`App::apply`].
    pub fn begin_load(&mut self, force: bool) -> PendingLoad {
        let route = self.route();
        if self.view_route() != Some(route) {
            self.view = View::Loading(route);
        }
        PendingLoad {
            guard: self.nav.guard(),
            route,
            params: self.list_params.clone(),
            force,
            queries: Arc::clone(&self.queries),
        }
    }

    /// Show a resolved load. Returns `false` if the user navigated since it
    /// began and the result was dropped.
    pub fn apply(&mut self, loaded: LoadedView) -> bool {
        match loaded.guard.apply(loaded.view) {
            Some(view) => {
                self.view = view;
                true
            }
            None => false,
        }
    }

    /// Reload the current route through the cache.
    pub async fn refresh(&mut self) {
        self.load(false).await;
    }

    async fn load(&mut self, force: bool) {
        let loaded = self.begin_load(force).resolve().await;
        self.apply(loaded);
    }

    /// Route the current page was loaded for, if it shows fetched data that
    /// can stay visible while it reloads.
    fn view_route(&self) -> Option<Route> {
        match &self.view {
            View::List(_) => Some(Route::TaskList),
            View::Detail(detail) => Some(Route::TaskDetail(detail.task.id)),
            _ => None,
        }
    }

    // ─── Navigation ──────────────────────────────────────────────────────

    pub async fn navigate(&mut self, route: Route) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        self.nav.navigate(route);
        self.notice = None;
        self.load(false).await;
        Ok(())
    }

    /// Navigate to a path such as `/tasks/3/edit`.
    pub async fn open(&mut self, path: &str) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        let route = Route::parse(path)?;
        self.navigate(route).await
    }

    pub async fn back(&mut self) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        self.nav.back().ok_or(AppError::Unavailable("no earlier page"))?;
        self.notice = None;
        self.load(false).await;
        Ok(())
    }

    pub async fn forward(&mut self) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        self.nav.forward().ok_or(AppError::Unavailable("no later page"))?;
        self.notice = None;
        self.load(false).await;
        Ok(())
    }

    // ─── List controls ───────────────────────────────────────────────────

    pub async fn update_params(&mut self, update: ParamsUpdate) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        self.ensure_route(Route::TaskList, "list controls only apply to the task list")?;
        self.list_params = apply_update(&self.list_params, update);
        tracing::debug!(params = ?self.list_params, "list parameters changed");
        self.load(false).await;
        Ok(())
    }

    pub async fn next_page(&mut self) -> Result<(), AppError> {
        let next = self.pagination()?.next_page();
        let page = next.ok_or(AppError::Unavailable("already on the last page"))?;
        self.update_params(ParamsUpdate::Page(page)).await
    }

    pub async fn prev_page(&mut self) -> Result<(), AppError> {
        let prev = self.pagination()?.previous_page();
        let page = prev.ok_or(AppError::Unavailable("already on the first page"))?;
        self.update_params(ParamsUpdate::Page(page)).await
    }

    fn pagination(&self) -> Result<taskdeck_core::Pagination, AppError> {
        match &self.view {
            View::List(list) => list
                .pagination()
                .ok_or(AppError::Unavailable("the list has a single page")),
            _ => Err(AppError::Unavailable("paging only applies to the task list")),
        }
    }

    /// Fetch the current page again, bypassing the cache.
    pub async fn retry(&mut self) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        self.notice = None;
        self.load(true).await;
        Ok(())
    }

    // ─── Actions ─────────────────────────────────────────────────────────

    /// Flip completion of `id`, or of the task on screen.
    pub async fn toggle(&mut self, id: Option<i64>) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        self.ensure_task_actions()?;
        let id = self.target(id)?;
        match self.queries.toggle_task(id).await {
            Ok(_) => {
                self.notice = None;
                self.refresh().await;
                Ok(())
            }
            Err(err) => Err(self.surface(err)),
        }
    }

    /// Ask for confirmation before deleting `id`, or the task on screen.
    pub fn request_delete(&mut self, id: Option<i64>) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        self.ensure_task_actions()?;
        let id = self.target(id)?;
        self.dialog.open(id);
        Ok(())
    }

    pub async fn confirm_delete(&mut self) -> Result<(), AppError> {
        let id = self.dialog.confirm().ok_or(AppError::NothingPending)?;
        match self.queries.delete_task(id).await {
            Ok(()) => {
                self.notice = None;
                if self.route().task_id() == Some(id) {
                    self.navigate(Route::TaskList).await
                } else {
                    self.refresh().await;
                    Ok(())
                }
            }
            Err(err) => Err(self.surface(err)),
        }
    }

    pub fn cancel_delete(&mut self) -> Result<(), AppError> {
        if self.dialog.cancel() {
            Ok(())
        } else {
            Err(AppError::NothingPending)
        }
    }

    // ─── Form ────────────────────────────────────────────────────────────

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        let form = self.form_mut()?;
        form.values.set(field, value);
        Ok(())
    }

    /// Validate and send the form. Invalid input never reaches the network;
    /// a rejected submission keeps every entered value.
    pub async fn submit(&mut self) -> Result<(), AppError> {
        self.ensure_dialog_closed()?;
        let form = self.form_mut()?;
        let validated = match validate(&form.values) {
            Ok(validated) => validated,
            Err(errors) => {
                let count = errors.len();
                form.errors = errors;
                form.form_error = None;
                return Err(AppError::InvalidForm(count));
            }
        };
        form.errors = Default::default();
        form.form_error = None;
        form.submitting = true;
        let mode = form.mode;

        let result = match mode {
            FormMode::Create => self.queries.create_task(&validated.into_create_request()).await,
            FormMode::Edit(id) => {
                self.queries
                    .update_task(id, &validated.into_update_request())
                    .await
            }
        };

        match result {
            Ok(task) => match mode {
                FormMode::Create => self.navigate(Route::TaskList).await,
                FormMode::Edit(_) => self.navigate(Route::TaskDetail(task.id)).await,
            },
            Err(err) => {
                if let View::Form(form) = &mut self.view {
                    form.submitting = false;
                    form.errors.merge_server(&err);
                    if form.errors.is_empty() {
                        form.form_error = Some(err.message.clone());
                    }
                }
                tracing::warn!(status = err.status, error = %err, "submission rejected");
                Err(AppError::Api(err))
            }
        }
    }

    fn form_mut(&mut self) -> Result<&mut FormView, AppError> {
        match &mut self.view {
            View::Form(form) => Ok(form),
            _ => Err(AppError::Unavailable("no form on this page")),
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────────

    fn ensure_dialog_closed(&self) -> Result<(), AppError> {
        if self.dialog.is_open() {
            return Err(AppError::DialogOpen);
        }
        Ok(())
    }

    fn ensure_route(&self, route: Route, reason: &'static str) -> Result<(), AppError> {
        if self.route() != route {
            return Err(AppError::Unavailable(reason));
        }
        Ok(())
    }

    /// Toggle and delete buttons live on the list and the detail page only.
    fn ensure_task_actions(&self) -> Result<(), AppError> {
        match self.route() {
            Route::TaskList | Route::TaskDetail(_) => Ok(()),
            _ => Err(AppError::Unavailable(
                "toggle and delete are only offered on the list or a task's page",
            )),
        }
    }

    fn target(&self, id: Option<i64>) -> Result<i64, AppError> {
        id.or_else(|| self.route().task_id())
            .ok_or(AppError::NoTaskSelected)
    }

    /// Show a failed action on screen and hand it back to the caller.
    fn surface(&mut self, err: ApiError) -> AppError {
        tracing::warn!(status = err.status, error = %err, "action failed");
        self.notice = Some(err.message.clone());
        AppError::Api(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck_core::{MemoryTaskGateway, TaskCreateRequest};

    async fn app_with(titles: &[&str]) -> (App, Arc<MemoryTaskGateway>) {
        let gateway = Arc::new(MemoryTaskGateway::new());
        for title in titles {
            gateway
                .create(&TaskCreateRequest {
                    title: title.to_string(),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        let mut app = App::new(gateway.clone(), AppOptions::default());
        app.start().await;
        (app, gateway)
    }

    #[tokio::test]
    async fn starts_on_list() {
        let (app, _) = app_with(&["one"]).await;
        assert_eq!(app.route(), Route::TaskList);
        assert!(matches!(app.view(), View::List(list) if list.contains_task(1)));
    }

    #[tokio::test]
    async fn dialog_blocks_other_actions() {
        let (mut app, _) = app_with(&["one"]).await;
        app.request_delete(Some(1)).unwrap();
        assert!(matches!(app.navigate(Route::TaskCreate).await, Err(AppError::DialogOpen)));
        assert!(matches!(app.toggle(Some(1)).await, Err(AppError::DialogOpen)));
        assert!(matches!(app.request_delete(Some(1)), Err(AppError::DialogOpen)));
        app.cancel_delete().unwrap();
        assert!(matches!(app.cancel_delete(), Err(AppError::NothingPending)));
    }

    #[tokio::test]
    async fn delete_and_toggle_are_not_offered_on_forms() {
        let (mut app, gateway) = app_with(&["one"]).await;
        for route in [Route::TaskCreate, Route::TaskEdit(1)] {
            app.navigate(route).await.unwrap();
            assert!(matches!(app.request_delete(Some(1)), Err(AppError::Unavailable(_))));
            assert!(!app.dialog_open());
            assert!(matches!(app.toggle(Some(1)).await, Err(AppError::Unavailable(_))));
        }
        assert_eq!(gateway.call_count("toggle"), 0);
        assert!(!gateway.get_by_id(1).await.unwrap().is_completed);
    }

    #[tokio::test]
    async fn toggle_without_task_on_screen_needs_an_id() {
        let (mut app, _) = app_with(&[]).await;
        assert!(matches!(app.toggle(None).await, Err(AppError::NoTaskSelected)));
    }

    #[tokio::test]
    async fn list_controls_require_list_route() {
        let (mut app, _) = app_with(&["one"]).await;
        app.navigate(Route::TaskCreate).await.unwrap();
        let result = app
            .update_params(ParamsUpdate::SortBy(taskdeck_core::SortBy::Title))
            .await;
        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn set_field_requires_form() {
        let (mut app, _) = app_with(&[]).await;
        assert!(app.set_field(FormField::Title, "x").is_err());
        app.navigate(Route::TaskCreate).await.unwrap();
        app.set_field(FormField::Title, "x").unwrap();
        assert!(matches!(app.view(), View::Form(form) if form.values.title == "x"));
    }

    #[tokio::test]
    async fn back_without_history_is_unavailable() {
        let (mut app, _) = app_with(&[]).await;
        assert!(matches!(app.back().await, Err(AppError::Unavailable(_))));
    }
}
