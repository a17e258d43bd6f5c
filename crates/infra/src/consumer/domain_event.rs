use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use catalog_core::MessageId;
use catalog_events::{
    Command, DomainEvent, DrainSummary, Envelope, HandlerError, HandlingError, HandlingFailure,
    MessageQueue, Projector, QueueError,
};

use crate::registry::ProjectorRegistry;

/// Drains the domain-event queue through the projectors registered per event type.
///
/// For each event, in enqueue order:
///
/// 1. select the projectors registered for `event_type` (zero is a no-op);
/// 2. if the event carries a target code, keep only that projector, recording
///    [`HandlingError::UnknownProjectorCode`] when none matches;
/// 3. invoke each projector and append the commands it returns to the command
///    queue.
///
/// A failing projector is recorded and the next projector (and the next event)
/// still runs. A command queue that rejects a command is recorded the same way.
/// A command queue that is unavailable stops the drain with `Err`; the event
/// being handled is put back on the event queue first.
pub struct DomainEventConsumer<E, C> {
    events: E,
    commands: C,
    projectors: Arc<ProjectorRegistry>,
}

impl<E, C> DomainEventConsumer<E, C>
where
    E: MessageQueue<DomainEvent>,
    C: MessageQueue<Command>,
{
    pub fn new(events: E, commands: C, projectors: Arc<ProjectorRegistry>) -> Self {
        Self {
            events,
            commands,
            projectors,
        }
    }

    /// Drain every event pending at call time.
    ///
    /// Commands enqueued here are **not** drained by this call.
    #[instrument(name = "domain_event_consumer.process_all", skip(self), err)]
    pub fn process_all(&self) -> Result<DrainSummary, QueueError> {
        let mut invocations = 0usize;
        let mut follow_ups = 0usize;

        let mut summary = self.events.consume_all(&mut |envelope| {
            self.handle(envelope, &mut invocations, &mut follow_ups)
        })?;

        summary.invocations = invocations;
        summary.follow_ups = follow_ups;
        debug!(
            attempted = summary.attempted,
            failed = summary.failed(),
            invocations,
            follow_ups,
            "domain event queue drained"
        );
        Ok(summary)
    }

    fn handle(
        &self,
        envelope: Envelope<DomainEvent>,
        invocations: &mut usize,
        follow_ups: &mut usize,
    ) -> Result<(), HandlerError> {
        let message_id = envelope.message_id();
        let event = envelope.into_message();
        let candidates = self.projectors.projectors_for(event.event_type());

        let selected: Vec<&Arc<dyn Projector>> = match event.target() {
            Some(code) => {
                let matching: Vec<_> = candidates.iter().filter(|p| p.code() == code).collect();
                if matching.is_empty() {
                    return Err(HandlingError::UnknownProjectorCode {
                        code: code.to_string(),
                        event_type: event.event_type().to_string(),
                    }
                    .into());
                }
                matching
            }
            None => candidates.iter().collect(),
        };

        if selected.is_empty() {
            debug!(%message_id, event_type = event.event_type(), "no projectors for event type");
        }

        let mut failure = HandlingFailure::new();
        for projector in selected {
            *invocations += 1;
            let code = projector.code();

            let commands = match projector.project(&event) {
                Ok(commands) => commands,
                Err(error) => {
                    warn!(
                        %message_id,
                        projector_code = code,
                        data_version = %event.data_version(),
                        error = %error,
                        "projector failed"
                    );
                    failure.push(HandlingError::ProjectorExecution {
                        code: code.to_string(),
                        error,
                    });
                    continue;
                }
            };

            let total = commands.len();
            for (index, command) in commands.into_iter().enumerate() {
                match self.commands.add(command) {
                    Ok(_) => *follow_ups += 1,
                    Err(error @ QueueError::Enqueue(_)) => {
                        let dropped = total - index;
                        warn!(
                            %message_id,
                            projector_code = code,
                            dropped,
                            error = %error,
                            "follow-up command rejected"
                        );
                        failure.push(HandlingError::FollowUpEnqueue {
                            code: code.to_string(),
                            dropped,
                            error,
                        });
                        break;
                    }
                    Err(error) => {
                        self.return_to_queue(message_id, event);
                        return Err(HandlerError::Abort(error));
                    }
                }
            }
        }

        failure.into_result().map_err(HandlerError::from)
    }

    /// Put an event back after the command queue became unavailable mid-event.
    ///
    /// Commands this event already produced stay queued, so a later pass may
    /// deliver some of them twice.
    fn return_to_queue(&self, message_id: MessageId, event: DomainEvent) {
        match self.events.add(event) {
            Ok(requeued_as) => {
                warn!(%message_id, %requeued_as, "command queue unavailable; event returned to the queue");
            }
            Err(err) => {
                error!(%message_id, error = %err, "command queue unavailable and event could not be returned; event lost");
            }
        }
    }
}
