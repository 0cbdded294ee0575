// System
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

// Third Party
use clap::ValueEnum;
use futures::{future::try_join_all, stream, StreamExt};
use k8s_openapi::api::core::v1::{ConfigMap, Event};
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    core::ObjectList,
    error::ErrorResponse,
    Client, ResourceExt,
};
use tracing::{debug, info, warn};

// Local
use crate::{
    counters::Counters,
    resource::{Batch, ChurnResource, ResourceKind},
    utils::DEFAULT_NAMESPACE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Generate `resource_count` objects.
    Create,
    /// Page through every object, from every worker.
    List,
    /// Delete every object in the namespace.
    Clean,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::List => "list",
            Action::Clean => "clean",
        }
    }
}

/// Fans bulk create, list and delete calls out over a fixed number of workers against a single
/// namespace, counting the outcome of every call.
pub struct Driver {
    client: Client,
    namespace: String,
    concurrency: usize,
    list_limit: u32,
    counters: Arc<Counters>,
}

impl Driver {
    pub fn new(client: &Client, concurrency: usize, list_limit: u32) -> Self {
        Self {
            client: client.clone(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            concurrency: concurrency.max(1),
            list_limit: list_limit.max(1),
            counters: Arc::new(Counters::new()),
        }
    }

    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    fn api<K: ChurnResource>(&self) -> Api<K> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    /// Dispatch `action` to the concrete Kubernetes type behind `kind`.
    pub async fn run(
        &self,
        action: Action,
        kind: ResourceKind,
        batch: &Batch,
    ) -> Result<(), anyhow::Error> {
        info!(
            "Running {} on {}s in namespace {} with {} workers...",
            action.name(),
            kind.name(),
            self.namespace,
            self.concurrency
        );
        match kind {
            ResourceKind::Event => self.run_for::<Event>(action, batch).await,
            ResourceKind::ConfigMap => self.run_for::<ConfigMap>(action, batch).await,
        }
    }

    async fn run_for<K: ChurnResource>(
        &self,
        action: Action,
        batch: &Batch,
    ) -> Result<(), anyhow::Error> {
        match action {
            Action::Create => self.create::<K>(batch).await,
            Action::List => self.list::<K>().await,
            Action::Clean => self.clean::<K>().await,
        }
    }

    /// Split `batch.resource_count` evenly over the workers and create that many objects from
    /// each. The remainder of the division is not created.
    pub async fn create<K: ChurnResource>(&self, batch: &Batch) -> Result<(), anyhow::Error> {
        let per_worker = batch.resource_count / self.concurrency;
        let remainder = batch.resource_count % self.concurrency;
        if remainder != 0 {
            warn!(
                "{} objects do not divide evenly over {} workers, creating {} instead",
                batch.resource_count,
                self.concurrency,
                per_worker * self.concurrency
            );
        }

        let handles = (0..self.concurrency).map(|worker| {
            tokio::spawn(Self::create_worker::<K>(
                self.api::<K>(),
                self.counters.clone(),
                batch.worker_prefix(worker),
                per_worker,
                batch.payload.clone(),
            ))
        });
        try_join_all(handles).await?;
        Ok(())
    }

    async fn create_worker<K: ChurnResource>(
        api: Api<K>,
        counters: Arc<Counters>,
        name_prefix: String,
        count: usize,
        payload: Arc<str>,
    ) {
        let post_params = PostParams::default();
        let mut object = K::generate(&name_prefix, &payload);
        for i in 0..count {
            let name = format!("{}-{}", name_prefix, i);
            object.meta_mut().name = Some(name);
            let result = api.create(&post_params, &object).await;
            if let Err(error) = &result {
                debug!("Failed to create {}-{}: {}", name_prefix, i, error);
            }
            counters.record(&result);
        }
    }

    /// Every worker pages through the whole namespace. One page is one counted call.
    pub async fn list<K: ChurnResource>(&self) -> Result<(), anyhow::Error> {
        let handles = (0..self.concurrency).map(|_| {
            let api = self.api::<K>();
            let counters = self.counters.clone();
            let list_limit = self.list_limit;
            tokio::spawn(async move {
                let mut continue_token: Option<String> = None;
                loop {
                    let params = page_params(list_limit, continue_token.as_deref());
                    let result = api.list(&params).await;
                    counters.record(&result);
                    let page = match result {
                        Ok(page) => page,
                        Err(error) => {
                            // Without a page there is no token to continue from
                            debug!("Failed to list: {}", error);
                            return;
                        }
                    };
                    if page.items.is_empty() {
                        return;
                    }
                    match next_continue_token(&page) {
                        Some(token) => continue_token = Some(token),
                        None => return,
                    }
                }
            })
        });
        try_join_all(handles).await?;
        Ok(())
    }

    /// Delete every object in the namespace, page by page. Objects the cluster manages itself
    /// (see [`ChurnResource::is_protected`]) are left alone.
    pub async fn clean<K: ChurnResource>(&self) -> Result<(), anyhow::Error> {
        let api = self.api::<K>();
        let mut continue_token: Option<String> = None;
        let mut found_in_pass = 0;
        let mut deleted_in_pass = 0;
        loop {
            let params = page_params(self.list_limit, continue_token.as_deref());
            let page = match api.list(&params).await {
                Ok(page) => page,
                // 410 Gone: the token expired after a compaction, start over from the beginning
                Err(kube::Error::Api(ErrorResponse { code, .. }))
                    if code == 410 && continue_token.is_some() =>
                {
                    warn!("Continue token expired, restarting listing from the beginning");
                    continue_token = None;
                    continue;
                }
                Err(error) => {
                    return Err(anyhow::Error::new(error)
                        .context(format!("Failed to list {}", K::plural(&()))));
                }
            };
            if page.items.is_empty() {
                info!("No {} left in namespace {}", K::plural(&()), self.namespace);
                return Ok(());
            }
            let next_token = next_continue_token(&page);
            let deletable: Vec<K> = page
                .items
                .into_iter()
                .filter(|object| !object.is_protected())
                .collect();
            found_in_pass += deletable.len();
            deleted_in_pass += self.delete_page(&api, deletable).await;

            continue_token = match next_token {
                Some(token) => Some(token),
                None if found_in_pass == 0 => {
                    info!("No {} left in namespace {}", K::plural(&()), self.namespace);
                    return Ok(());
                }
                None if deleted_in_pass == 0 => {
                    warn!(
                        "Could not delete any of the remaining {} in namespace {}, giving up",
                        K::plural(&()),
                        self.namespace
                    );
                    return Ok(());
                }
                None => {
                    // Restart from the beginning to pick up whatever the last pass missed
                    found_in_pass = 0;
                    deleted_in_pass = 0;
                    None
                }
            };
        }
    }

    /// Delete `objects` with at most `concurrency` calls in flight. Returns how many succeeded.
    async fn delete_page<K: ChurnResource>(&self, api: &Api<K>, objects: Vec<K>) -> usize {
        let deleted = AtomicUsize::new(0);
        let delete_params = DeleteParams::default();
        stream::iter(objects)
            .for_each_concurrent(self.concurrency, |object| {
                let deleted = &deleted;
                let delete_params = &delete_params;
                async move {
                    let name = object.name_any();
                    let result = api.delete(&name, delete_params).await;
                    self.counters.record(&result);
                    match result {
                        Ok(_) => {
                            deleted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(error) => debug!("Failed to delete {}: {}", name, error),
                    }
                }
            })
            .await;
        deleted.into_inner()
    }
}

/// List calls are bounded by the client's read timeout; kube only sends `timeoutSeconds` on
/// watches.
fn page_params(list_limit: u32, continue_token: Option<&str>) -> ListParams {
    let params = ListParams::default().limit(list_limit);
    match continue_token {
        Some(token) => params.continue_token(token),
        None => params,
    }
}

/// The token for the next page, if the server handed out a non-empty one.
fn next_continue_token<K: Clone>(page: &ObjectList<K>) -> Option<String> {
    page.metadata
        .continue_
        .as_ref()
        .filter(|token| !token.is_empty())
        .cloned()
}
