//! Sortable, page-by-page list loading.
//!
//! [`PageMachine`] holds the list state and decides every transition; it is
//! synchronous and does no I/O. [`Paginator`] drives a machine from a tokio
//! runtime: it runs the injected [`PageLoader`] on a spawned task, feeds the
//! completion back through the same transition function, and pushes each new
//! state to subscribers in order.
//!
//! At most one load is outstanding per session. A sort change starts a new
//! session; completions that belong to an older session are dropped.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

pub const FIRST_PAGE: u32 = 1;

#[async_trait]
pub trait PageLoader<T, S>: Send + Sync {
    async fn load(&self, sort: &S, page: u32) -> anyhow::Result<Vec<T>>;
}

/// Loader failure as stored in [`PageState::Failed`]. Cheap to clone.
#[derive(Clone)]
pub struct LoadError(Arc<anyhow::Error>);

impl LoadError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for LoadError {
    fn from(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }
}

impl fmt::Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadError({:#})", self.0)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#}", self.0)
    }
}

impl std::error::Error for LoadError {}

impl PartialEq for LoadError {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.to_string() == other.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageState<T> {
    Idle,
    Loading { items: Arc<Vec<T>>, page: u32 },
    Loaded { items: Arc<Vec<T>>, has_more: bool },
    Failed { items: Arc<Vec<T>>, error: LoadError },
}

impl<T> PageState<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Self::Idle => &[],
            Self::Loading { items, .. } | Self::Loaded { items, .. } | Self::Failed { items, .. } => {
                items.as_slice()
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    fn take_items(&mut self) -> Arc<Vec<T>> {
        match std::mem::replace(self, Self::Idle) {
            Self::Idle => Arc::new(Vec::new()),
            Self::Loading { items, .. } | Self::Loaded { items, .. } | Self::Failed { items, .. } => {
                items
            }
        }
    }
}

#[derive(Debug)]
pub enum PageEvent<T, S> {
    SetSort(S),
    LoadNextPage,
    Retry,
    Completed {
        generation: u64,
        page: u32,
        result: Result<Vec<T>, LoadError>,
    },
}

/// A page the caller must fetch and report back as [`PageEvent::Completed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest<S> {
    pub generation: u64,
    pub sort: S,
    pub page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition<S> {
    Unchanged,
    Updated,
    Fetch(LoadRequest<S>),
}

#[derive(Debug)]
pub struct PageMachine<T, S> {
    state: PageState<T>,
    sort: Option<S>,
    generation: u64,
    page: u32,
}

impl<T, S> PageMachine<T, S>
where
    T: Clone,
    S: Clone + PartialEq + fmt::Debug,
{
    /// A machine in `Idle`. With `default_sort`, the first
    /// [`PageEvent::LoadNextPage`] fetches page one under it.
    pub fn new(default_sort: Option<S>) -> Self {
        Self {
            state: PageState::Idle,
            sort: default_sort,
            generation: 0,
            page: 0,
        }
    }

    pub fn state(&self) -> &PageState<T> {
        &self.state
    }

    pub fn sort(&self) -> Option<&S> {
        self.sort.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn handle(&mut self, event: PageEvent<T, S>) -> Transition<S> {
        match event {
            PageEvent::SetSort(sort) => self.set_sort(sort),
            PageEvent::LoadNextPage => self.load_next_page(),
            PageEvent::Retry => self.retry(),
            PageEvent::Completed {
                generation,
                page,
                result,
            } => self.complete(generation, page, result),
        }
    }

    fn set_sort(&mut self, sort: S) -> Transition<S> {
        let idle = matches!(self.state, PageState::Idle);
        if !idle && self.sort.as_ref() == Some(&sort) {
            return Transition::Unchanged;
        }
        self.sort = Some(sort);
        self.start_session()
    }

    fn start_session(&mut self) -> Transition<S> {
        self.generation += 1;
        self.page = FIRST_PAGE;
        self.state = PageState::Loading {
            items: Arc::new(Vec::new()),
            page: FIRST_PAGE,
        };
        self.fetch_current_page()
    }

    fn load_next_page(&mut self) -> Transition<S> {
        match self.state {
            PageState::Idle if self.sort.is_some() => self.start_session(),
            PageState::Loaded { has_more: true, .. } => {
                let items = self.state.take_items();
                self.page += 1;
                self.state = PageState::Loading {
                    items,
                    page: self.page,
                };
                self.fetch_current_page()
            }
            _ => Transition::Unchanged,
        }
    }

    fn retry(&mut self) -> Transition<S> {
        if !matches!(self.state, PageState::Failed { .. }) {
            return Transition::Unchanged;
        }
        let items = self.state.take_items();
        self.state = PageState::Loading {
            items,
            page: self.page,
        };
        self.fetch_current_page()
    }

    fn complete(
        &mut self,
        generation: u64,
        page: u32,
        result: Result<Vec<T>, LoadError>,
    ) -> Transition<S> {
        let awaited = matches!(self.state, PageState::Loading { page: p, .. } if p == page);
        if generation != self.generation || !awaited {
            tracing::debug!(
                generation,
                page,
                current_generation = self.generation,
                "discarding stale page completion"
            );
            return Transition::Unchanged;
        }

        let mut items = self.state.take_items();
        self.state = match result {
            Ok(page_items) if page_items.is_empty() => PageState::Loaded {
                items,
                has_more: false,
            },
            Ok(page_items) => {
                Arc::make_mut(&mut items).extend(page_items);
                PageState::Loaded {
                    items,
                    has_more: true,
                }
            }
            Err(error) => {
                tracing::warn!(page, %error, "page load failed");
                PageState::Failed { items, error }
            }
        };
        Transition::Updated
    }

    fn fetch_current_page(&self) -> Transition<S> {
        match &self.sort {
            Some(sort) => Transition::Fetch(LoadRequest {
                generation: self.generation,
                sort: sort.clone(),
                page: self.page,
            }),
            None => Transition::Updated,
        }
    }
}

/// Runs a [`PageMachine`] against a [`PageLoader`] on the current tokio
/// runtime. Methods must be called from within a runtime.
pub struct Paginator<T, S> {
    shared: Arc<Shared<T, S>>,
}

impl<T, S> Clone for Paginator<T, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T, S> {
    loader: Arc<dyn PageLoader<T, S>>,
    core: Mutex<Core<T, S>>,
}

struct Core<T, S> {
    machine: PageMachine<T, S>,
    subscribers: Vec<mpsc::UnboundedSender<PageState<T>>>,
}

impl<T, S> Core<T, S>
where
    T: Clone,
{
    fn publish(&mut self, state: &PageState<T>) {
        self.subscribers
            .retain(|subscriber| subscriber.send(state.clone()).is_ok());
    }
}

impl<T, S> Paginator<T, S>
where
    T: Clone + Send + Sync + 'static,
    S: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    pub fn new(loader: Arc<dyn PageLoader<T, S>>) -> Self {
        Self::from_machine(loader, PageMachine::new(None))
    }

    pub fn with_default_sort(loader: Arc<dyn PageLoader<T, S>>, sort: S) -> Self {
        Self::from_machine(loader, PageMachine::new(Some(sort)))
    }

    fn from_machine(loader: Arc<dyn PageLoader<T, S>>, machine: PageMachine<T, S>) -> Self {
        Self {
            shared: Arc::new(Shared {
                loader,
                core: Mutex::new(Core {
                    machine,
                    subscribers: Vec::new(),
                }),
            }),
        }
    }

    /// Current state followed by every later transition, in order.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PageState<T>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut core = self.shared.lock();
        if tx.send(core.machine.state().clone()).is_ok() {
            core.subscribers.push(tx);
        }
        rx
    }

    pub fn state(&self) -> PageState<T> {
        self.shared.lock().machine.state().clone()
    }

    pub fn sort(&self) -> Option<S> {
        self.shared.lock().machine.sort().cloned()
    }

    pub fn set_sort(&self, sort: S) {
        dispatch(&self.shared, PageEvent::SetSort(sort));
    }

    pub fn load_next_page(&self) {
        dispatch(&self.shared, PageEvent::LoadNextPage);
    }

    pub fn retry(&self) {
        dispatch(&self.shared, PageEvent::Retry);
    }
}

impl<T, S> Shared<T, S> {
    fn lock(&self) -> MutexGuard<'_, Core<T, S>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn dispatch<T, S>(shared: &Arc<Shared<T, S>>, event: PageEvent<T, S>)
where
    T: Clone + Send + Sync + 'static,
    S: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    let request = {
        let mut core = shared.lock();
        let request = match core.machine.handle(event) {
            Transition::Unchanged => return,
            Transition::Updated => None,
            Transition::Fetch(request) => Some(request),
        };
        let state = core.machine.state().clone();
        core.publish(&state);
        request
    };

    if let Some(request) = request {
        spawn_load(Arc::clone(shared), request);
    }
}

fn spawn_load<T, S>(shared: Arc<Shared<T, S>>, request: LoadRequest<S>)
where
    T: Clone + Send + Sync + 'static,
    S: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    tracing::debug!(sort = ?request.sort, page = request.page, "loading page");
    tokio::spawn(async move {
        let result = shared
            .loader
            .load(&request.sort, request.page)
            .await
            .map_err(LoadError::from);
        dispatch(
            &shared,
            PageEvent::Completed {
                generation: request.generation,
                page: request.page,
                result,
            },
        );
    });
}
