//! Entry point of the pipeline (application-level orchestration).
//!
//! The `Dispatcher` turns "please regenerate artifact `code`" into a durable
//! domain event and, on request, drives both consumers:
//!
//! ```text
//! submit(code)
//!   ↓
//! 1. Validate code against the projector registry (nothing enqueued on failure)
//!   ↓
//! 2. Read the current data version from the data pool
//!   ↓
//! 3. Append `artifact-update-requested` to the domain-event queue
//!   ↓
//! process_queues()
//!   ↓
//! 4. Drain the command queue, then the domain-event queue (one pass each)
//! ```
//!
//! Commands produced in step 4 stay queued until the next `process_queues`
//! call; [`Dispatcher::process_until_idle`] repeats passes until nothing is left.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use catalog_core::{DataVersion, DomainError, MessageId};
use catalog_events::{
    Command, DataPoolError, DataPoolReader, DomainEvent, DrainSummary, MessageQueue, QueueError,
};

use crate::consumer::{CommandConsumer, DomainEventConsumer};
use crate::registry::{CommandHandlerRegistry, ProjectorRegistry};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The requested code is not registered. Nothing was enqueued.
    #[error("invalid projector code \"{code}\"; valid codes are: {}", .valid.join(", "))]
    InvalidArgument { code: String, valid: Vec<String> },

    /// The data pool handed out an unusable version token.
    #[error(transparent)]
    InvalidVersion(#[from] DomainError),

    #[error(transparent)]
    DataPool(#[from] DataPoolError),

    /// The domain-event queue rejected the event. Nothing was persisted.
    #[error("could not enqueue domain event: {0}")]
    Enqueue(#[source] QueueError),

    /// A queue backend became unavailable mid-drain.
    #[error("queue drain aborted: {0}")]
    Drain(#[source] QueueError),
}

/// Result of one `process_queues` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessReport {
    pub commands: DrainSummary,
    pub events: DrainSummary,
}

impl ProcessReport {
    /// True when neither queue had anything pending at its snapshot.
    pub fn is_idle(&self) -> bool {
        self.commands.attempted == 0 && self.events.attempted == 0
    }

    pub fn failed(&self) -> usize {
        self.commands.failed() + self.events.failed()
    }
}

/// Queue about to be drained by a `process_queues` pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Commands,
    DomainEvents,
}

/// Wires the data pool, both queues, both registries and both consumers.
pub struct Dispatcher<D, E, C> {
    data_pool: D,
    events: E,
    projectors: Arc<ProjectorRegistry>,
    command_consumer: CommandConsumer<C>,
    event_consumer: DomainEventConsumer<E, C>,
}

impl<D, E, C> Dispatcher<D, E, C>
where
    D: DataPoolReader,
    E: MessageQueue<DomainEvent> + Clone,
    C: MessageQueue<Command> + Clone,
{
    pub fn new(
        data_pool: D,
        events: E,
        commands: C,
        projectors: Arc<ProjectorRegistry>,
        handlers: Arc<CommandHandlerRegistry>,
    ) -> Self {
        Self {
            data_pool,
            command_consumer: CommandConsumer::new(commands.clone(), handlers),
            event_consumer: DomainEventConsumer::new(events.clone(), commands, projectors.clone()),
            events,
            projectors,
        }
    }

    /// Codes a caller may submit, sorted.
    pub fn registered_codes(&self) -> Vec<String> {
        self.projectors.registered_codes().into_iter().collect()
    }

    /// Validate `code`, stamp the current data version and enqueue the event.
    #[instrument(name = "dispatcher.submit", skip(self, payload), err)]
    pub fn submit(&self, code: &str, payload: impl Into<String>) -> Result<MessageId, DispatchError> {
        if !self.projectors.is_registered(code) {
            return Err(DispatchError::InvalidArgument {
                code: code.to_string(),
                valid: self.registered_codes(),
            });
        }

        let data_version = DataVersion::from_version_string(self.data_pool.current_data_version()?)?;
        let event = DomainEvent::artifact_update_requested(code, payload, data_version);
        let message_id = self.events.add(event).map_err(DispatchError::Enqueue)?;

        info!(%message_id, projector_code = code, "domain event enqueued");
        Ok(message_id)
    }

    /// Drain the command queue, then the domain-event queue, once each.
    ///
    /// Commands first: anything left over from earlier runs is flushed before new
    /// events are projected.
    pub fn process_queues(&self) -> Result<ProcessReport, DispatchError> {
        self.process_queues_with(&mut |_| {})
    }

    /// [`process_queues`](Self::process_queues), calling `on_stage` right
    /// before each queue is drained.
    #[instrument(name = "dispatcher.process_queues", skip(self, on_stage), err)]
    pub fn process_queues_with(
        &self,
        on_stage: &mut dyn FnMut(Stage),
    ) -> Result<ProcessReport, DispatchError> {
        on_stage(Stage::Commands);
        let commands = self.command_consumer.process_all().map_err(DispatchError::Drain)?;
        on_stage(Stage::DomainEvents);
        let events = self.event_consumer.process_all().map_err(DispatchError::Drain)?;

        info!(
            commands = commands.attempted,
            events = events.attempted,
            failed = commands.failed() + events.failed(),
            "queues processed"
        );
        Ok(ProcessReport { commands, events })
    }

    /// Submit and immediately run one `process_queues` pass.
    pub fn submit_and_process(
        &self,
        code: &str,
        payload: impl Into<String>,
    ) -> Result<(MessageId, ProcessReport), DispatchError> {
        let id = self.submit(code, payload)?;
        let report = self.process_queues()?;
        Ok((id, report))
    }

    /// Repeat `process_queues` until a pass finds nothing to do, at most
    /// `max_passes` times. Returns every pass that did work.
    pub fn process_until_idle(&self, max_passes: usize) -> Result<Vec<ProcessReport>, DispatchError> {
        let mut passes = Vec::new();
        for _ in 0..max_passes {
            let report = self.process_queues()?;
            if report.is_idle() {
                break;
            }
            passes.push(report);
        }
        Ok(passes)
    }

    pub fn command_consumer(&self) -> &CommandConsumer<C> {
        &self.command_consumer
    }

    pub fn event_consumer(&self) -> &DomainEventConsumer<E, C> {
        &self.event_consumer
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use catalog_events::{
        CommandError, CommandHandler, Envelope, InMemoryDataPool, InMemoryQueue, ProjectionError,
        Projector, ARTIFACT_UPDATE_REQUESTED,
    };

    use super::*;

    struct Template(&'static str);

    impl Projector for Template {
        fn code(&self) -> &str {
            self.0
        }

        fn event_type(&self) -> &str {
            ARTIFACT_UPDATE_REQUESTED
        }

        fn project(&self, event: &DomainEvent) -> Result<Vec<Command>, ProjectionError> {
            Ok(vec![Command::new(
                "write-file",
                json!({ "file": self.0, "data_version": event.data_version().as_str() }),
            )])
        }
    }

    struct Sink;

    impl CommandHandler for Sink {
        fn command_type(&self) -> &str {
            "write-file"
        }

        fn handle(&self, _command: &Command) -> Result<(), CommandError> {
            Ok(())
        }
    }

    /// Queue whose backend refuses every write.
    struct Refusing;

    impl MessageQueue<DomainEvent> for Refusing {
        fn add(&self, _message: DomainEvent) -> Result<MessageId, QueueError> {
            Err(QueueError::Enqueue("disk full".into()))
        }

        fn len(&self) -> Result<usize, QueueError> {
            Ok(0)
        }

        fn pop(&self) -> Result<Option<Envelope<DomainEvent>>, QueueError> {
            Ok(None)
        }
    }

    type Events = Arc<InMemoryQueue<DomainEvent>>;
    type Commands = Arc<InMemoryQueue<Command>>;

    fn registries() -> (Arc<ProjectorRegistry>, Arc<CommandHandlerRegistry>) {
        let projectors = ProjectorRegistry::builder()
            .register(Template("header"))
            .unwrap()
            .register(Template("footer"))
            .unwrap()
            .build();
        let handlers = CommandHandlerRegistry::builder().register(Sink).unwrap().build();
        (Arc::new(projectors), Arc::new(handlers))
    }

    fn setup(version: &str) -> (Dispatcher<Arc<InMemoryDataPool>, Events, Commands>, Arc<InMemoryDataPool>, Events, Commands) {
        let (projectors, handlers) = registries();
        let pool = Arc::new(InMemoryDataPool::new(version));
        let events: Events = Arc::new(InMemoryQueue::new());
        let commands: Commands = Arc::new(InMemoryQueue::new());
        let dispatcher = Dispatcher::new(pool.clone(), events.clone(), commands.clone(), projectors, handlers);
        (dispatcher, pool, events, commands)
    }

    #[test]
    fn submitting_a_valid_code_enqueues_one_stamped_event() {
        let (dispatcher, pool, events, _) = setup("17");

        for code in dispatcher.registered_codes() {
            dispatcher.submit(&code, "").unwrap();
        }
        pool.set_current_data_version("18").unwrap();
        dispatcher.submit("header", "").unwrap();

        let pending = events.pending().unwrap();
        assert_eq!(pending.len(), 3);
        assert_eq!(pending[0], DomainEvent::artifact_update_requested("footer", "", DataVersion::from_version_string("17").unwrap()));
        assert_eq!(pending[1].target(), Some("header"));
        assert_eq!(pending[2].data_version().as_str(), "18");
    }

    #[test]
    fn unknown_code_is_rejected_before_anything_is_enqueued() {
        let (dispatcher, _, events, commands) = setup("17");

        let err = dispatcher.submit("does-not-exist", "").unwrap_err();

        match &err {
            DispatchError::InvalidArgument { code, valid } => {
                assert_eq!(code, "does-not-exist");
                assert_eq!(valid, &vec!["footer".to_string(), "header".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(
            err.to_string(),
            "invalid projector code \"does-not-exist\"; valid codes are: footer, header"
        );
        assert_eq!(events.len().unwrap(), 0);
        assert_eq!(commands.len().unwrap(), 0);
    }

    #[test]
    fn malformed_data_version_is_fatal_and_enqueues_nothing() {
        let (dispatcher, _, events, _) = setup("");

        let err = dispatcher.submit("header", "").unwrap_err();

        assert!(matches!(err, DispatchError::InvalidVersion(DomainError::InvalidVersion(_))));
        assert!(events.is_empty().unwrap());
    }

    #[test]
    fn enqueue_failure_surfaces_to_the_caller() {
        let (projectors, handlers) = registries();
        let dispatcher = Dispatcher::new(
            InMemoryDataPool::new("1"),
            Arc::new(Refusing),
            Arc::new(InMemoryQueue::<Command>::new()),
            projectors,
            handlers,
        );

        let err = dispatcher.submit("header", "").unwrap_err();
        assert!(matches!(err, DispatchError::Enqueue(QueueError::Enqueue(_))));
    }

    #[test]
    fn process_queues_is_a_single_pass_per_queue() {
        let (dispatcher, _, events, commands) = setup("5");

        let (_, first) = dispatcher.submit_and_process("header", "").unwrap();
        assert_eq!(first.commands.attempted, 0);
        assert_eq!(first.events.attempted, 1);
        assert_eq!(first.events.follow_ups, 1);
        assert!(events.is_empty().unwrap());
        assert_eq!(commands.len().unwrap(), 1);

        let second = dispatcher.process_queues().unwrap();
        assert_eq!(second.commands.succeeded, 1);
        assert!(commands.is_empty().unwrap());
    }

    #[test]
    fn process_until_idle_reaches_a_fixed_point() {
        let (dispatcher, _, events, commands) = setup("5");
        dispatcher.submit("header", "").unwrap();
        dispatcher.submit("footer", "").unwrap();

        let passes = dispatcher.process_until_idle(10).unwrap();

        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].events.attempted, 2);
        assert_eq!(passes[1].commands.attempted, 2);
        assert!(events.is_empty().unwrap());
        assert!(commands.is_empty().unwrap());
    }

    #[test]
    fn process_queues_with_reports_commands_before_domain_events() {
        let (dispatcher, _, _, _) = setup("5");
        let mut stages = Vec::new();

        dispatcher.process_queues_with(&mut |stage| stages.push(stage)).unwrap();

        assert_eq!(stages, vec![Stage::Commands, Stage::DomainEvents]);
    }

    /// Command queue whose backend cannot be reached.
    struct Unreachable;

    impl MessageQueue<Command> for Unreachable {
        fn add(&self, _message: Command) -> Result<MessageId, QueueError> {
            Err(QueueError::Unavailable("connection refused".into()))
        }

        fn len(&self) -> Result<usize, QueueError> {
            Ok(0)
        }

        fn pop(&self) -> Result<Option<Envelope<Command>>, QueueError> {
            Ok(None)
        }
    }

    #[test]
    fn unavailable_command_queue_aborts_the_pass_and_keeps_the_event() {
        let (projectors, handlers) = registries();
        let events: Events = Arc::new(InMemoryQueue::new());
        let dispatcher = Dispatcher::new(
            InMemoryDataPool::new("1"),
            events.clone(),
            Arc::new(Unreachable),
            projectors,
            handlers,
        );
        dispatcher.submit("header", "").unwrap();

        let err = dispatcher.process_queues().unwrap_err();

        assert!(matches!(err, DispatchError::Drain(QueueError::Unavailable(_))));
        assert_eq!(events.len().unwrap(), 1);
    }
}
