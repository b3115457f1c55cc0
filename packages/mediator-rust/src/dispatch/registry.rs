use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use courier_core::{
    message_name, Command, CommandHandler, MediatorError, Notification, NotificationHandler,
    OpenBehavior, PipelineBehavior, Request, RequestHandler, RequestPostProcessor,
    RequestPreProcessor,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::warn;

/// Registry entry with its concrete capability type erased.
///
/// Always holds an `Arc<dyn Capability<M>>` for the message type `M` it is
/// keyed by; [`downcast_entry`] recovers it.
type ErasedEntry = Arc<dyn Any + Send + Sync>;

// ---------------------------------------------------------------------------
// PipelineStage
// ---------------------------------------------------------------------------

/// One resolved link of a request pipeline.
pub enum PipelineStage<R: Request> {
    /// Behavior registered for this request type only.
    Typed(Arc<dyn PipelineBehavior<R>>),
    /// Behavior registered for every request type.
    Open(Arc<dyn OpenBehavior>),
}

impl<R: Request> PipelineStage<R> {
    /// Name of the wrapped behavior.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Typed(behavior) => behavior.name(),
            Self::Open(behavior) => behavior.name(),
        }
    }
}

impl<R: Request> Clone for PipelineStage<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Typed(behavior) => Self::Typed(Arc::clone(behavior)),
            Self::Open(behavior) => Self::Open(Arc::clone(behavior)),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver traits
// ---------------------------------------------------------------------------

/// Handler lookup consumed by the mediator.
///
/// `Ok(None)` from the single-handler lookups means "no handler registered"
/// and is turned into `HandlerNotFound`; an empty `Vec` from the collection
/// lookups is a valid result. `Err` is reserved for entries that do not have
/// the capability shape their key promises.
pub trait HandlerResolver: Send + Sync {
    /// The unique handler for request type `R`.
    ///
    /// # Errors
    ///
    /// Returns `MediatorError::InvalidArgument` on a type-erasure mismatch.
    fn request_handler<R: Request>(
        &self,
    ) -> Result<Option<Arc<dyn RequestHandler<R>>>, MediatorError>;

    /// The unique handler for command type `C`.
    ///
    /// # Errors
    ///
    /// Returns `MediatorError::InvalidArgument` on a type-erasure mismatch.
    fn command_handler<C: Command>(
        &self,
    ) -> Result<Option<Arc<dyn CommandHandler<C>>>, MediatorError>;

    /// Every handler for notification type `N`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns `MediatorError::InvalidArgument` on a type-erasure mismatch.
    fn notification_handlers<N: Notification>(
        &self,
    ) -> Result<Vec<Arc<dyn NotificationHandler<N>>>, MediatorError>;

    /// Pre-processors for request type `R`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns `MediatorError::InvalidArgument` on a type-erasure mismatch.
    fn pre_processors<R: Request>(
        &self,
    ) -> Result<Vec<Arc<dyn RequestPreProcessor<R>>>, MediatorError>;

    /// Post-processors for request type `R`, in registration order.
    ///
    /// # Errors
    ///
    /// Returns `MediatorError::InvalidArgument` on a type-erasure mismatch.
    fn post_processors<R: Request>(
        &self,
    ) -> Result<Vec<Arc<dyn RequestPostProcessor<R>>>, MediatorError>;
}

/// Pipeline lookup consumed by the mediator.
pub trait BehaviorResolver: Send + Sync {
    /// Behaviors applying to request type `R`, in registration order.
    ///
    /// The mediator reverses this order when composing the chain.
    ///
    /// # Errors
    ///
    /// Returns `MediatorError::InvalidArgument` on a type-erasure mismatch.
    fn behaviors<R: Request>(&self) -> Result<Vec<PipelineStage<R>>, MediatorError>;
}

// ---------------------------------------------------------------------------
// HandlerRegistry
// ---------------------------------------------------------------------------

/// Explicit registration table for handlers, behaviors and processors.
///
/// Every map is keyed by the `TypeId` of the message type. Request and command
/// handlers are unique per key (re-registering replaces); notification
/// handlers, typed behaviors and processors accumulate in registration order.
/// Typed and open behaviors share one sequence counter so their relative
/// registration order survives the merge in [`BehaviorResolver::behaviors`].
///
/// Registration and resolution are safe from concurrent tasks.
pub struct HandlerRegistry {
    requests: DashMap<TypeId, ErasedEntry>,
    commands: DashMap<TypeId, ErasedEntry>,
    notifications: DashMap<TypeId, Vec<ErasedEntry>>,
    behaviors: DashMap<TypeId, Vec<(u64, ErasedEntry)>>,
    open_behaviors: RwLock<Vec<(u64, Arc<dyn OpenBehavior>)>>,
    pre_processors: DashMap<TypeId, Vec<ErasedEntry>>,
    post_processors: DashMap<TypeId, Vec<ErasedEntry>>,
    sequence: AtomicU64,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            requests: DashMap::new(),
            commands: DashMap::new(),
            notifications: DashMap::new(),
            behaviors: DashMap::new(),
            open_behaviors: RwLock::new(Vec::new()),
            pre_processors: DashMap::new(),
            post_processors: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Register the handler for request type `R`, replacing any previous one.
    pub fn register_request_handler<R, H>(&self, handler: H)
    where
        R: Request,
        H: RequestHandler<R> + 'static,
    {
        let handler: Arc<dyn RequestHandler<R>> = Arc::new(handler);
        if self
            .requests
            .insert(TypeId::of::<R>(), Arc::new(handler))
            .is_some()
        {
            warn!(
                request_type = message_name::<R>(),
                "replaced previously registered request handler"
            );
        }
    }

    /// Register the handler for command type `C`, replacing any previous one.
    pub fn register_command_handler<C, H>(&self, handler: H)
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let handler: Arc<dyn CommandHandler<C>> = Arc::new(handler);
        if self
            .commands
            .insert(TypeId::of::<C>(), Arc::new(handler))
            .is_some()
        {
            warn!(
                command_type = message_name::<C>(),
                "replaced previously registered command handler"
            );
        }
    }

    /// Add a handler for notification type `N`.
    pub fn register_notification_handler<N, H>(&self, handler: H)
    where
        N: Notification,
        H: NotificationHandler<N> + 'static,
    {
        let handler: Arc<dyn NotificationHandler<N>> = Arc::new(handler);
        self.notifications
            .entry(TypeId::of::<N>())
            .or_default()
            .push(Arc::new(handler));
    }

    /// Add a behavior applying to request type `R` only.
    pub fn register_behavior<R, B>(&self, behavior: B)
    where
        R: Request,
        B: PipelineBehavior<R> + 'static,
    {
        let behavior: Arc<dyn PipelineBehavior<R>> = Arc::new(behavior);
        let entry: ErasedEntry = Arc::new(behavior);
        let seq = self.next_sequence();
        self.behaviors
            .entry(TypeId::of::<R>())
            .or_default()
            .push((seq, entry));
    }

    /// Add a behavior applying to every request type.
    pub fn register_open_behavior<B>(&self, behavior: B)
    where
        B: OpenBehavior + 'static,
    {
        let seq = self.next_sequence();
        self.open_behaviors.write().push((seq, Arc::new(behavior)));
    }

    /// Add a pre-processor for request type `R`.
    pub fn register_pre_processor<R, P>(&self, processor: P)
    where
        R: Request,
        P: RequestPreProcessor<R> + 'static,
    {
        let processor: Arc<dyn RequestPreProcessor<R>> = Arc::new(processor);
        self.pre_processors
            .entry(TypeId::of::<R>())
            .or_default()
            .push(Arc::new(processor));
    }

    /// Add a post-processor for request type `R`.
    pub fn register_post_processor<R, P>(&self, processor: P)
    where
        R: Request,
        P: RequestPostProcessor<R> + 'static,
    {
        let processor: Arc<dyn RequestPostProcessor<R>> = Arc::new(processor);
        self.post_processors
            .entry(TypeId::of::<R>())
            .or_default()
            .push(Arc::new(processor));
    }

    /// Returns `true` if a handler is registered for request type `R`.
    #[must_use]
    pub fn has_request_handler<R: Request>(&self) -> bool {
        self.requests.contains_key(&TypeId::of::<R>())
    }

    /// Returns `true` if a handler is registered for command type `C`.
    #[must_use]
    pub fn has_command_handler<C: Command>(&self) -> bool {
        self.commands.contains_key(&TypeId::of::<C>())
    }

    /// Number of handlers registered for notification type `N`.
    #[must_use]
    pub fn notification_handler_count<N: Notification>(&self) -> usize {
        self.notifications
            .get(&TypeId::of::<N>())
            .map_or(0, |entry| entry.value().len())
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Recover `Arc<T>` from an entry stored as `Arc<Arc<T>>`.
fn downcast_entry<T, M>(entry: &ErasedEntry) -> Result<Arc<T>, MediatorError>
where
    T: ?Sized + Send + Sync + 'static,
    M: ?Sized,
{
    Arc::clone(entry)
        .downcast::<Arc<T>>()
        .map(|outer| Arc::clone(&*outer))
        .map_err(|_| {
            MediatorError::invalid_argument(format!(
                "registry entry for {} does not implement {}",
                message_name::<M>(),
                message_name::<T>()
            ))
        })
}

fn downcast_all<T, M>(entries: Option<&Vec<ErasedEntry>>) -> Result<Vec<Arc<T>>, MediatorError>
where
    T: ?Sized + Send + Sync + 'static,
    M: ?Sized,
{
    entries
        .map(|entries| entries.iter().map(downcast_entry::<T, M>).collect())
        .unwrap_or_else(|| Ok(Vec::new()))
}

impl HandlerResolver for HandlerRegistry {
    fn request_handler<R: Request>(
        &self,
    ) -> Result<Option<Arc<dyn RequestHandler<R>>>, MediatorError> {
        self.requests
            .get(&TypeId::of::<R>())
            .map(|entry| downcast_entry::<dyn RequestHandler<R>, R>(entry.value()))
            .transpose()
    }

    fn command_handler<C: Command>(
        &self,
    ) -> Result<Option<Arc<dyn CommandHandler<C>>>, MediatorError> {
        self.commands
            .get(&TypeId::of::<C>())
            .map(|entry| downcast_entry::<dyn CommandHandler<C>, C>(entry.value()))
            .transpose()
    }

    fn notification_handlers<N: Notification>(
        &self,
    ) -> Result<Vec<Arc<dyn NotificationHandler<N>>>, MediatorError> {
        let entries = self.notifications.get(&TypeId::of::<N>());
        downcast_all::<dyn NotificationHandler<N>, N>(entries.as_deref())
    }

    fn pre_processors<R: Request>(
        &self,
    ) -> Result<Vec<Arc<dyn RequestPreProcessor<R>>>, MediatorError> {
        let entries = self.pre_processors.get(&TypeId::of::<R>());
        downcast_all::<dyn RequestPreProcessor<R>, R>(entries.as_deref())
    }

    fn post_processors<R: Request>(
        &self,
    ) -> Result<Vec<Arc<dyn RequestPostProcessor<R>>>, MediatorError> {
        let entries = self.post_processors.get(&TypeId::of::<R>());
        downcast_all::<dyn RequestPostProcessor<R>, R>(entries.as_deref())
    }
}

impl BehaviorResolver for HandlerRegistry {
    fn behaviors<R: Request>(&self) -> Result<Vec<PipelineStage<R>>, MediatorError> {
        let mut ordered: Vec<(u64, PipelineStage<R>)> = Vec::new();

        if let Some(entries) = self.behaviors.get(&TypeId::of::<R>()) {
            for (seq, entry) in entries.value() {
                let behavior = downcast_entry::<dyn PipelineBehavior<R>, R>(entry)?;
                ordered.push((*seq, PipelineStage::Typed(behavior)));
            }
        }
        for (seq, behavior) in self.open_behaviors.read().iter() {
            ordered.push((*seq, PipelineStage::Open(Arc::clone(behavior))));
        }

        ordered.sort_by_key(|(seq, _)| *seq);
        Ok(ordered.into_iter().map(|(_, stage)| stage).collect())
    }
}

impl<T: HandlerResolver + ?Sized> HandlerResolver for Arc<T> {
    fn request_handler<R: Request>(
        &self,
    ) -> Result<Option<Arc<dyn RequestHandler<R>>>, MediatorError> {
        (**self).request_handler::<R>()
    }

    fn command_handler<C: Command>(
        &self,
    ) -> Result<Option<Arc<dyn CommandHandler<C>>>, MediatorError> {
        (**self).command_handler::<C>()
    }

    fn notification_handlers<N: Notification>(
        &self,
    ) -> Result<Vec<Arc<dyn NotificationHandler<N>>>, MediatorError> {
        (**self).notification_handlers::<N>()
    }

    fn pre_processors<R: Request>(
        &self,
    ) -> Result<Vec<Arc<dyn RequestPreProcessor<R>>>, MediatorError> {
        (**self).pre_processors::<R>()
    }

    fn post_processors<R: Request>(
        &self,
    ) -> Result<Vec<Arc<dyn RequestPostProcessor<R>>>, MediatorError> {
        (**self).post_processors::<R>()
    }
}

impl<T: BehaviorResolver + ?Sized> BehaviorResolver for Arc<T> {
    fn behaviors<R: Request>(&self) -> Result<Vec<PipelineStage<R>>, MediatorError> {
        (**self).behaviors::<R>()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use courier_core::{CancellationToken, ErasedResponse, Next, RequestEnvelope};

    use super::*;

    struct Ping;

    impl Request for Ping {
        type Response = &'static str;
    }

    struct Other;

    impl Request for Other {
        type Response = u32;
    }

    struct Flush;

    impl Command for Flush {}

    struct Tick;

    impl Notification for Tick {}

    struct Pong(&'static str);

    #[async_trait]
    impl RequestHandler<Ping> for Pong {
        async fn handle(
            &self,
            _request: &Ping,
            _cancellation: &CancellationToken,
        ) -> anyhow::Result<&'static str> {
            Ok(self.0)
        }
    }

    struct Flusher;

    #[async_trait]
    impl CommandHandler<Flush> for Flusher {
        async fn handle(&self, _command: &Flush, _cancellation: &CancellationToken) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct TickListener;

    #[async_trait]
    impl NotificationHandler<Tick> for TickListener {
        async fn handle(&self, _notification: &Tick, _cancellation: &CancellationToken) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Typed behavior carrying a label so resolution order is observable.
    struct Labeled(&'static str);

    #[async_trait]
    impl<R: Request> PipelineBehavior<R> for Labeled {
        async fn handle(
            &self,
            _request: &R,
            next: Next<'_, R::Response>,
            _cancellation: &CancellationToken,
        ) -> anyhow::Result<R::Response> {
            Ok(next.run().await?)
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    struct OpenLabeled(&'static str);

    #[async_trait]
    impl OpenBehavior for OpenLabeled {
        async fn handle(
            &self,
            _request: RequestEnvelope<'_>,
            next: Next<'_, ErasedResponse>,
            _cancellation: &CancellationToken,
        ) -> anyhow::Result<ErasedResponse> {
            Ok(next.run().await?)
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    fn stage_names<R: Request>(registry: &HandlerRegistry) -> Vec<&'static str> {
        registry
            .behaviors::<R>()
            .unwrap()
            .iter()
            .map(PipelineStage::name)
            .collect()
    }

    #[tokio::test]
    async fn register_and_resolve_request_handler() {
        let registry = HandlerRegistry::new();
        registry.register_request_handler::<Ping, _>(Pong("pong"));

        let handler = registry.request_handler::<Ping>().unwrap().unwrap();
        let response = handler.handle(&Ping, &CancellationToken::new()).await.unwrap();
        assert_eq!(response, "pong");
        assert!(registry.has_request_handler::<Ping>());
    }

    #[test]
    fn unregistered_request_handler_resolves_to_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.request_handler::<Ping>().unwrap().is_none());
        assert!(!registry.has_request_handler::<Ping>());
    }

    #[tokio::test]
    async fn re_registering_replaces_handler() {
        let registry = HandlerRegistry::new();
        registry.register_request_handler::<Ping, _>(Pong("first"));
        registry.register_request_handler::<Ping, _>(Pong("second"));

        let handler = registry.request_handler::<Ping>().unwrap().unwrap();
        let response = handler.handle(&Ping, &CancellationToken::new()).await.unwrap();
        assert_eq!(response, "second");
    }

    #[test]
    fn command_handler_lookup() {
        let registry = HandlerRegistry::new();
        assert!(registry.command_handler::<Flush>().unwrap().is_none());
        registry.register_command_handler::<Flush, _>(Flusher);
        assert!(registry.command_handler::<Flush>().unwrap().is_some());
        assert!(registry.has_command_handler::<Flush>());
    }

    #[test]
    fn notification_handlers_accumulate() {
        let registry = HandlerRegistry::new();
        assert!(registry.notification_handlers::<Tick>().unwrap().is_empty());

        registry.register_notification_handler::<Tick, _>(TickListener);
        registry.register_notification_handler::<Tick, _>(TickListener);

        assert_eq!(registry.notification_handlers::<Tick>().unwrap().len(), 2);
        assert_eq!(registry.notification_handler_count::<Tick>(), 2);
    }

    #[test]
    fn behaviors_are_scoped_to_their_request_type() {
        let registry = HandlerRegistry::new();
        registry.register_behavior::<Ping, _>(Labeled("ping-only"));

        assert_eq!(stage_names::<Ping>(&registry), vec!["ping-only"]);
        assert!(stage_names::<Other>(&registry).is_empty());
    }

    #[test]
    fn typed_and_open_behaviors_merge_in_registration_order() {
        let registry = HandlerRegistry::new();
        registry.register_open_behavior(OpenLabeled("open-1"));
        registry.register_behavior::<Ping, _>(Labeled("typed-2"));
        registry.register_open_behavior(OpenLabeled("open-3"));
        registry.register_behavior::<Other, _>(Labeled("other-4"));

        assert_eq!(
            stage_names::<Ping>(&registry),
            vec!["open-1", "typed-2", "open-3"]
        );
        assert_eq!(
            stage_names::<Other>(&registry),
            vec!["open-1", "open-3", "other-4"]
        );
    }

    #[test]
    fn mismatched_entry_is_invalid_argument() {
        let registry = HandlerRegistry::new();
        // Key Ping but store a handler shaped for a different request type.
        let wrong: Arc<dyn CommandHandler<Flush>> = Arc::new(Flusher);
        registry.requests.insert(TypeId::of::<Ping>(), Arc::new(wrong));

        let err = registry.request_handler::<Ping>().err().unwrap();
        assert!(matches!(err, MediatorError::InvalidArgument { .. }));
        assert!(err.to_string().contains("Ping"));
    }

    #[test]
    fn resolver_through_arc() {
        let registry = Arc::new(HandlerRegistry::new());
        registry.register_request_handler::<Ping, _>(Pong("pong"));
        assert!(HandlerResolver::request_handler::<Ping>(&registry).unwrap().is_some());
    }
}
