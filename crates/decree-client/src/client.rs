//! The query execution client.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use decree_schema::{decode, Operation, OperationKind, SchemaMismatchError, ValidationError};

use crate::cache::{CacheKey, DocumentCache, NormalizedCache};
use crate::error::{ExecutionError, QueryError, TransportError};
use crate::state::QueryState;
use crate::transport::{Transport, TransportBuilder};
use crate::wire::WireRequest;

/// Rule governing whether an execution consults cache, network, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPolicy {
    /// Resolve from the document cache when possible; hit the network only
    /// on a miss.
    #[default]
    CacheFirst,
    /// Always hit the network; never read the cache (results are still
    /// written back).
    NetworkOnly,
    /// Resolve from the cache immediately when possible, then refresh from
    /// the network.
    CacheAndNetwork,
}

/// What a successful mutation does to the client's caches.
///
/// The read path alone does not pin this down, so it is configuration, not
/// inference: `KeepCached` leaves cached data untouched, `EvictAll` clears
/// both caches so affected queries refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationCachePolicy {
    #[default]
    KeepCached,
    EvictAll,
}

/// Per-execution options.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Bypass the memoized result and any identical in-flight request.
    pub skip_cache: bool,
    /// Re-issue the operation on a timer until every handle is dropped.
    pub poll_interval: Option<Duration>,
    pub fetch_policy: FetchPolicy,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }
}

/// One observable execution: a watch channel plus a flight guard.
///
/// The channel has exactly one sender, so state transitions for a slot are
/// linearized: no observer sees a stale `Ready` after a newer one. The
/// guard keeps at most one fetch on the wire per slot.
struct Slot<T> {
    tx: watch::Sender<QueryState<Arc<T>>>,
    fetching: AtomicBool,
}

impl<T> Slot<T> {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(QueryState::Idle);
        Self {
            tx,
            fetching: AtomicBool::new(false),
        }
    }

    fn publish(&self, state: QueryState<Arc<T>>) {
        // send_replace delivers regardless of receiver count: a fetch
        // whose observers all left still completes the state machine.
        self.tx.send_replace(state);
    }

    fn subscribe(&self) -> watch::Receiver<QueryState<Arc<T>>> {
        self.tx.subscribe()
    }

    fn observers(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Builder for creating a [`QueryClient`].
pub struct QueryClientBuilder {
    endpoint: String,
    transport: Option<Transport>,
    transport_builder: Option<TransportBuilder>,
    normalized: Option<NormalizedCache>,
    mutation_cache_policy: MutationCachePolicy,
}

impl QueryClientBuilder {
    /// Create a new builder for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport: None,
            transport_builder: None,
            normalized: None,
            mutation_cache_policy: MutationCachePolicy::default(),
        }
    }

    /// Use an existing transport (the endpoint given to [`Self::new`] is
    /// ignored).
    pub fn transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom transport builder.
    pub fn transport_builder(mut self, builder: TransportBuilder) -> Self {
        self.transport_builder = Some(builder);
        self
    }

    /// Attach a normalized entity cache.
    ///
    /// The cache is an explicitly scoped object: pass a clone of the same
    /// cache to several clients to share entity snapshots between them.
    pub fn normalized_cache(mut self, cache: NormalizedCache) -> Self {
        self.normalized = Some(cache);
        self
    }

    /// What a successful mutation does to cached data.
    pub fn mutation_cache_policy(mut self, policy: MutationCachePolicy) -> Self {
        self.mutation_cache_policy = policy;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<QueryClient, TransportError> {
        let transport = if let Some(transport) = self.transport {
            transport
        } else if let Some(builder) = self.transport_builder {
            builder.build()?
        } else {
            Transport::new(self.endpoint)?
        };

        Ok(QueryClient {
            inner: Arc::new(ClientInner {
                transport,
                documents: DocumentCache::new(),
                normalized: self.normalized,
                inflight: Mutex::new(HashMap::new()),
                mutation_cache_policy: self.mutation_cache_policy,
            }),
        })
    }
}

struct ClientInner {
    transport: Transport,
    documents: DocumentCache,
    normalized: Option<NormalizedCache>,
    /// Cache key -> the `Arc<Slot<Op::Data>>` of the execution currently
    /// on the wire, type-erased. Entries live only while a request is in
    /// flight.
    inflight: Mutex<HashMap<CacheKey, Box<dyn Any + Send + Sync>>>,
    mutation_cache_policy: MutationCachePolicy,
}

/// Executes typed operations and exposes each execution as an observable
/// [`QueryState`].
///
/// Cloning is cheap and shares the transport, caches, and in-flight
/// registry. Must be used within a tokio runtime: executions are spawned
/// as tasks and suspend only at the network I/O boundary.
///
/// # Example
///
/// ```ignore
/// use decree_client::{FetchPolicy, QueryClient, QueryOptions};
/// use decree_schema::operations::{ListRules, ListRulesVariables};
///
/// let client = QueryClient::builder("https://api.example.com/query").build()?;
///
/// let mut handle = client.execute::<ListRules>(ListRulesVariables::new(20));
/// let state = handle.settled().await;
///
/// // Identical concurrent calls share one network request.
/// let again = client.execute::<ListRules>(ListRulesVariables::new(20));
/// ```
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

impl QueryClient {
    /// Create a client for the given endpoint with default configuration.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TransportError> {
        QueryClientBuilder::new(endpoint).build()
    }

    /// Create a builder for custom configuration.
    pub fn builder(endpoint: impl Into<String>) -> QueryClientBuilder {
        QueryClientBuilder::new(endpoint)
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    /// The document cache.
    pub fn documents(&self) -> &DocumentCache {
        &self.inner.documents
    }

    /// The normalized entity cache, when one was attached.
    pub fn normalized_cache(&self) -> Option<&NormalizedCache> {
        self.inner.normalized.as_ref()
    }

    /// Execute a query with default options.
    pub fn execute<Op: Operation>(&self, variables: Op::Variables) -> QueryHandle<Op> {
        self.execute_with::<Op>(variables, QueryOptions::default())
    }

    /// Execute a query.
    ///
    /// Returns immediately with a handle whose state moves through
    /// `Pending` and settles as `Ready` or `Failed`. Malformed variables
    /// settle as `Failed(Validation)` without any network activity.
    ///
    /// Unless `skip_cache` is set, a call whose cache key matches a
    /// request already on the wire joins it instead of issuing another.
    pub fn execute_with<Op: Operation>(
        &self,
        variables: Op::Variables,
        options: QueryOptions,
    ) -> QueryHandle<Op> {
        if Op::KIND != OperationKind::Query {
            return QueryHandle::rejected(ValidationError::new(
                Op::NAME,
                "execute() accepts queries; use mutate() for mutations",
            ));
        }
        if let Err(err) = Op::validate(&variables) {
            return QueryHandle::rejected(err);
        }
        let variables = match serde_json::to_value(&variables) {
            Ok(value) => value,
            Err(err) => {
                return QueryHandle::rejected(ValidationError::new(
                    Op::NAME,
                    format!("variables failed to serialize: {err}"),
                ));
            }
        };
        let key = CacheKey::new(Op::NAME, &variables);

        let slot: Arc<Slot<Op::Data>>;
        let mut cached: Option<Arc<Op::Data>> = None;
        let mut start_network = false;

        {
            // Join-or-register must be atomic, or two simultaneous calls
            // could both miss and both fetch.
            let mut inflight = self.inner.inflight.lock();
            let joined = if options.skip_cache {
                None
            } else {
                inflight
                    .get(&key)
                    .and_then(|entry| entry.downcast_ref::<Arc<Slot<Op::Data>>>())
                    .cloned()
            };

            if let Some(existing) = joined {
                tracing::debug!(
                    target: "decree_client::query",
                    operation = Op::NAME,
                    "joined identical in-flight request"
                );
                slot = existing;
            } else {
                slot = Arc::new(Slot::new());
                slot.publish(QueryState::Pending);

                if !options.skip_cache && options.fetch_policy != FetchPolicy::NetworkOnly {
                    cached = self.inner.documents.get::<Op>(&key);
                }
                start_network =
                    cached.is_none() || options.fetch_policy == FetchPolicy::CacheAndNetwork;
                if start_network && !options.skip_cache {
                    inflight.insert(key.clone(), Box::new(slot.clone()));
                }
            }
        }

        let refreshing = cached.is_some() && start_network;
        if let Some(data) = cached {
            tracing::debug!(
                target: "decree_client::cache",
                operation = Op::NAME,
                "document cache hit"
            );
            slot.publish(QueryState::Ready(data));
        }

        if start_network {
            // When cached data was already published, keep it visible for
            // the whole network wait: the refresh announces its Pending
            // only when it is about to settle.
            self.spawn_fetch_announcing::<Op>(
                key.clone(),
                slot.clone(),
                variables.clone(),
                !options.skip_cache,
                refreshing,
            );
        }

        if let Some(period) = options.poll_interval {
            self.spawn_poll::<Op>(key.clone(), slot.clone(), variables.clone(), period);
        }

        QueryHandle::attached(self.clone(), slot, key, variables)
    }

    /// Lazy variant of [`Self::execute`]: returns a callable that performs
    /// the execution only when invoked, for fetches triggered by a user
    /// action rather than on mount.
    pub fn prepare<Op: Operation>(&self) -> PreparedQuery<Op> {
        PreparedQuery {
            client: self.clone(),
            options: QueryOptions::default(),
            _operation: PhantomData,
        }
    }

    /// Execute a mutation and wait for its typed result.
    ///
    /// Mutations are never coalesced and never read the cache; what a
    /// successful one does to cached data follows the client's
    /// [`MutationCachePolicy`].
    pub async fn mutate<Op: Operation>(
        &self,
        variables: Op::Variables,
    ) -> Result<Op::Data, QueryError> {
        if Op::KIND != OperationKind::Mutation {
            return Err(ValidationError::new(
                Op::NAME,
                "mutate() accepts mutations; use execute() for queries",
            )
            .into());
        }
        Op::validate(&variables)?;
        let variables = serde_json::to_value(&variables).map_err(|err| {
            ValidationError::new(Op::NAME, format!("variables failed to serialize: {err}"))
        })?;

        let data = self.send_operation::<Op>(variables).await?;
        let decoded = decode::<Op::Data>(Op::NAME, data)?;

        if self.inner.mutation_cache_policy == MutationCachePolicy::EvictAll {
            self.inner.documents.clear();
            if let Some(cache) = &self.inner.normalized {
                cache.clear();
            }
            tracing::debug!(
                target: "decree_client::cache",
                operation = Op::NAME,
                "evicted caches after mutation"
            );
        }
        Ok(decoded)
    }

    /// One wire exchange: send, classify the envelope, return raw data.
    async fn send_operation<Op: Operation>(&self, variables: Value) -> Result<Value, QueryError> {
        let request = WireRequest {
            query: Op::DOCUMENT,
            variables: Some(variables),
            operation_name: Some(Op::NAME),
        };
        tracing::debug!(target: "decree_client::query", operation = Op::NAME, "sending operation");

        let response = self.inner.transport.send(&request).await.map_err(|err| match err {
            // A success status with a malformed envelope is version skew,
            // not a connection problem.
            TransportError::InvalidBody(detail) => QueryError::SchemaMismatch(
                SchemaMismatchError::new(
                    Op::NAME,
                    format!("response body is not a valid envelope: {detail}"),
                ),
            ),
            other => QueryError::Transport(other),
        })?;

        if response.has_errors() {
            return Err(ExecutionError {
                errors: response.errors,
                partial_data: response.data,
            }
            .into());
        }
        response.data.ok_or_else(|| {
            QueryError::SchemaMismatch(SchemaMismatchError::new(
                Op::NAME,
                "response carried neither data nor errors",
            ))
        })
    }

    async fn fetch_once<Op: Operation>(
        &self,
        variables: &Value,
        write_cache: bool,
    ) -> Result<Arc<Op::Data>, QueryError> {
        let data = self.send_operation::<Op>(variables.clone()).await?;
        if write_cache && let Some(cache) = &self.inner.normalized {
            cache.merge_response(&data);
        }
        Ok(Arc::new(decode::<Op::Data>(Op::NAME, data)?))
    }

    /// Put one fetch for this slot on the wire, unless one already is.
    ///
    /// `registered` marks the execution as the owner of the in-flight
    /// registry entry for its key and enables cache writes.
    fn spawn_fetch<Op: Operation>(
        &self,
        key: CacheKey,
        slot: Arc<Slot<Op::Data>>,
        variables: Value,
        registered: bool,
    ) {
        self.spawn_fetch_announcing::<Op>(key, slot, variables, registered, false);
    }

    /// [`Self::spawn_fetch`], optionally publishing `Pending` just before
    /// the terminal state instead of relying on the caller to have done
    /// so. Used when previously published data should stay visible during
    /// the network wait.
    fn spawn_fetch_announcing<Op: Operation>(
        &self,
        key: CacheKey,
        slot: Arc<Slot<Op::Data>>,
        variables: Value,
        registered: bool,
        announce: bool,
    ) {
        if slot.fetching.swap(true, Ordering::AcqRel) {
            return;
        }
        let client = self.clone();
        tokio::spawn(async move {
            let result = client.fetch_once::<Op>(&variables, registered).await;

            // Memoize before deregistering so a caller arriving in between
            // finds the result in the document cache.
            if registered {
                if let Ok(ref data) = result {
                    client.inner.documents.insert::<Op>(key.clone(), data.clone());
                }
                let mut inflight = client.inner.inflight.lock();
                let owned = inflight
                    .get(&key)
                    .and_then(|entry| entry.downcast_ref::<Arc<Slot<Op::Data>>>())
                    .is_some_and(|registered_slot| Arc::ptr_eq(registered_slot, &slot));
                if owned {
                    inflight.remove(&key);
                }
            }

            // Publish before releasing the flight guard so a racing
            // refetch cannot interleave a stale terminal state.
            if announce {
                slot.publish(QueryState::Pending);
            }
            match result {
                Ok(data) => slot.publish(QueryState::Ready(data)),
                Err(err) => {
                    tracing::debug!(
                        target: "decree_client::query",
                        operation = Op::NAME,
                        kind = err.kind(),
                        "operation failed: {err}"
                    );
                    slot.publish(QueryState::Failed(err));
                }
            }
            slot.fetching.store(false, Ordering::Release);
        });
    }

    fn spawn_poll<Op: Operation>(
        &self,
        key: CacheKey,
        slot: Arc<Slot<Op::Data>>,
        variables: Value,
        period: Duration,
    ) {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; the initial fetch covers it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if slot.observers() == 0 {
                    break;
                }
                slot.publish(QueryState::Pending);
                client.spawn_fetch::<Op>(key.clone(), slot.clone(), variables.clone(), false);
            }
            tracing::debug!(
                target: "decree_client::query",
                operation = Op::NAME,
                "poll stopped, all handles dropped"
            );
        });
    }
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("endpoint", self.inner.transport.endpoint())
            .field("documents", &self.inner.documents)
            .field("normalized", &self.inner.normalized)
            .finish()
    }
}

enum HandleCtx<Op: Operation> {
    /// Variables were rejected before any network activity; the slot is
    /// kept only so the channel stays open.
    Rejected { _slot: Arc<Slot<Op::Data>> },
    Active {
        client: QueryClient,
        slot: Arc<Slot<Op::Data>>,
        key: CacheKey,
        variables: Value,
    },
}

/// A live subscription to one execution.
///
/// Dropping every handle for an execution cancels interest only: the
/// underlying request still completes and populates the caches, but no
/// longer notifies anyone.
pub struct QueryHandle<Op: Operation> {
    rx: watch::Receiver<QueryState<Arc<Op::Data>>>,
    ctx: Arc<HandleCtx<Op>>,
}

impl<Op: Operation> QueryHandle<Op> {
    fn rejected(err: ValidationError) -> Self {
        let slot: Arc<Slot<Op::Data>> = Arc::new(Slot::new());
        let rx = slot.subscribe();
        slot.publish(QueryState::Pending);
        slot.publish(QueryState::Failed(err.into()));
        Self {
            rx,
            ctx: Arc::new(HandleCtx::Rejected { _slot: slot }),
        }
    }

    fn attached(client: QueryClient, slot: Arc<Slot<Op::Data>>, key: CacheKey, variables: Value) -> Self {
        let rx = slot.subscribe();
        Self {
            rx,
            ctx: Arc::new(HandleCtx::Active {
                client,
                slot,
                key,
                variables,
            }),
        }
    }

    /// The current state. `Ready` payloads are shared: every observer of
    /// one execution sees the same allocation.
    pub fn state(&self) -> QueryState<Arc<Op::Data>> {
        self.rx.borrow().clone()
    }

    /// Wait for the next state transition.
    ///
    /// Rapid transitions coalesce: only the latest state is observed.
    /// Returns `None` if the execution's channel closed.
    pub async fn changed(&mut self) -> Option<QueryState<Arc<Op::Data>>> {
        self.rx.changed().await.ok()?;
        Some(self.state())
    }

    /// Wait until the execution settles as `Ready` or `Failed`.
    pub async fn settled(&mut self) -> QueryState<Arc<Op::Data>> {
        loop {
            let state = self.state();
            if state.is_settled() {
                return state;
            }
            if self.rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Re-issue the operation over the network.
    ///
    /// The state moves back to `Pending` and settles again; a refetch that
    /// races an in-flight fetch for the same execution joins it.
    pub fn refetch(&self) {
        if let HandleCtx::Active {
            client,
            slot,
            key,
            variables,
        } = self.ctx.as_ref()
        {
            slot.publish(QueryState::Pending);
            client.spawn_fetch::<Op>(key.clone(), slot.clone(), variables.clone(), false);
        }
    }
}

impl<Op: Operation> Clone for QueryHandle<Op> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
            ctx: self.ctx.clone(),
        }
    }
}

impl<Op: Operation> fmt::Debug for QueryHandle<Op> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryHandle")
            .field("operation", &Op::NAME)
            .finish()
    }
}

/// A lazily executable operation, from [`QueryClient::prepare`].
pub struct PreparedQuery<Op: Operation> {
    client: QueryClient,
    options: QueryOptions,
    _operation: PhantomData<fn() -> Op>,
}

impl<Op: Operation> PreparedQuery<Op> {
    /// Options applied to every execution of this prepared query.
    pub fn options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Perform the execution now.
    pub fn execute(&self, variables: Op::Variables) -> QueryHandle<Op> {
        self.client.execute_with::<Op>(variables, self.options.clone())
    }
}

impl<Op: Operation> Clone for PreparedQuery<Op> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            options: self.options.clone(),
            _operation: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decree_schema::operations::{ListRules, ListRulesVariables};

    #[test]
    fn options_compose() {
        let options = QueryOptions::new()
            .skip_cache()
            .poll_interval(Duration::from_secs(5))
            .fetch_policy(FetchPolicy::NetworkOnly);
        assert!(options.skip_cache);
        assert_eq!(options.poll_interval, Some(Duration::from_secs(5)));
        assert_eq!(options.fetch_policy, FetchPolicy::NetworkOnly);
    }

    #[test]
    fn default_policy_is_cache_first() {
        assert_eq!(FetchPolicy::default(), FetchPolicy::CacheFirst);
        assert_eq!(
            MutationCachePolicy::default(),
            MutationCachePolicy::KeepCached
        );
    }

    #[tokio::test]
    async fn invalid_variables_settle_without_network() {
        // Unroutable endpoint: reaching the network would fail loudly.
        let client = QueryClient::new("http://127.0.0.1:9/query").unwrap();
        let mut handle = client.execute::<ListRules>(ListRulesVariables::new(0));

        let state = handle.settled().await;
        match state {
            QueryState::Failed(QueryError::Validation(err)) => {
                assert_eq!(err.operation, "RulesList");
            }
            other => panic!("expected a validation failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mutate_rejects_query_operations() {
        let client = QueryClient::new("http://127.0.0.1:9/query").unwrap();
        let err = client
            .mutate::<ListRules>(ListRulesVariables::new(20))
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }
}
