//! Wires configuration, queues, registries and the dispatcher for the binary.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use catalog_events::{Command, DomainEvent, InMemoryQueue, MessageQueue};
use catalog_infra::queue::SqliteQueue;
use catalog_infra::{
    CommandHandlerRegistry, Dispatcher, FileDataPoolReader, LoggingCommandHandler,
    LoggingProjector, LoggingQueue, PipelineConfig, ProjectorRegistry, QueueBackend,
};

use crate::templates::{self, WriteFileHandler};

pub type EventQueue = Arc<dyn MessageQueue<DomainEvent>>;
pub type CommandQueue = Arc<dyn MessageQueue<Command>>;
pub type CatalogDispatcher = Dispatcher<FileDataPoolReader, EventQueue, CommandQueue>;

/// Build the dispatcher for the configured backend.
///
/// `templates` holds one file per projector; `output` receives what the
/// `write-file` handler renders.
pub fn dispatcher(
    config: &PipelineConfig,
    templates: &Path,
    output: &Path,
) -> anyhow::Result<CatalogDispatcher> {
    let (events, commands) = open_queues(config)?;
    let projectors = projector_registry(config, templates)?;
    let handlers = handler_registry(config, output)?;

    info!(
        backend = ?config.queue_backend,
        projectors = projectors.len(),
        debug_logging = config.debug_logging,
        "pipeline ready"
    );

    Ok(Dispatcher::new(
        FileDataPoolReader::new(&config.data_version_file),
        events,
        commands,
        Arc::new(projectors),
        Arc::new(handlers),
    ))
}

fn open_queues(config: &PipelineConfig) -> anyhow::Result<(EventQueue, CommandQueue)> {
    let (events, commands) = match config.queue_backend {
        QueueBackend::Memory => (
            Arc::new(InMemoryQueue::<DomainEvent>::new()) as EventQueue,
            Arc::new(InMemoryQueue::<Command>::new()) as CommandQueue,
        ),
        QueueBackend::Sqlite => {
            let events = SqliteQueue::<DomainEvent>::open(
                &config.queue_path,
                config.event_queue.as_str(),
                config.backend_timeout,
            )
            .with_context(|| format!("opening queue file {}", config.queue_path.display()))?;
            let commands = events.sibling::<Command>(config.command_queue.as_str());
            (Arc::new(events) as EventQueue, Arc::new(commands) as CommandQueue)
        }
        QueueBackend::Redis => redis_queues(config)?,
    };

    if !config.debug_logging {
        return Ok((events, commands));
    }
    let events = Arc::new(LoggingQueue::new("domain_events", events)) as EventQueue;
    let commands = Arc::new(LoggingQueue::new("commands", commands)) as CommandQueue;
    Ok((events, commands))
}

#[cfg(feature = "redis")]
fn redis_queues(config: &PipelineConfig) -> anyhow::Result<(EventQueue, CommandQueue)> {
    use catalog_infra::queue::RedisListQueue;

    let events = RedisListQueue::<DomainEvent>::new(
        &config.redis_url,
        &config.event_queue,
        config.backend_timeout,
    )
    .context("connecting to redis")?;
    let commands = events.sibling::<Command>(&config.command_queue);
    Ok((Arc::new(events) as EventQueue, Arc::new(commands) as CommandQueue))
}

#[cfg(not(feature = "redis"))]
fn redis_queues(_config: &PipelineConfig) -> anyhow::Result<(EventQueue, CommandQueue)> {
    anyhow::bail!("the redis queue backend requires building with the `redis` feature")
}

/// Template IDs available under `templates`, sorted. Touches no queue.
pub fn template_codes(config: &PipelineConfig, templates: &Path) -> anyhow::Result<Vec<String>> {
    let registry = projector_registry(config, templates)?;
    Ok(registry.registered_codes().into_iter().collect())
}

fn projector_registry(config: &PipelineConfig, dir: &Path) -> anyhow::Result<ProjectorRegistry> {
    let mut builder = ProjectorRegistry::builder();
    for projector in templates::discover(dir)? {
        builder = if config.debug_logging {
            builder.register(LoggingProjector::new(projector))?
        } else {
            builder.register(projector)?
        };
    }
    Ok(builder.build())
}

fn handler_registry(config: &PipelineConfig, output: &Path) -> anyhow::Result<CommandHandlerRegistry> {
    let writer = WriteFileHandler::new(output);
    let builder = CommandHandlerRegistry::builder();
    let builder = if config.debug_logging {
        builder.register(LoggingCommandHandler::new(writer))?
    } else {
        builder.register(writer)?
    };
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config(dir: &Path, debug_logging: bool) -> PipelineConfig {
        let data_version_file = dir.join("data-version");
        std::fs::write(&data_version_file, "1700000000\n").unwrap();
        PipelineConfig {
            queue_backend: QueueBackend::Memory,
            data_version_file,
            debug_logging,
            ..PipelineConfig::default()
        }
    }

    fn template_dir(dir: &Path) -> std::path::PathBuf {
        let templates = dir.join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::write(templates.join("header.html"), "<h1>{{payload}}</h1>").unwrap();
        std::fs::write(templates.join("footer.html"), "<footer/>").unwrap();
        templates
    }

    #[test]
    fn template_files_become_registered_codes() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(
            &memory_config(dir.path(), false),
            &template_dir(dir.path()),
            &dir.path().join("out"),
        )
        .unwrap();

        assert_eq!(dispatcher.registered_codes(), vec!["footer", "header"]);
    }

    #[test]
    fn listing_codes_never_opens_the_queue_backend() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("plain-file");
        std::fs::write(&not_a_dir, "").unwrap();
        let config = PipelineConfig {
            queue_backend: QueueBackend::Sqlite,
            queue_path: not_a_dir.join("queue.sqlite3"),
            ..memory_config(dir.path(), false)
        };
        let templates = template_dir(dir.path());

        assert_eq!(template_codes(&config, &templates).unwrap(), vec!["footer", "header"]);
        assert!(dispatcher(&config, &templates, &dir.path().join("out")).is_err());
    }

    #[test]
    fn triggering_a_template_renders_it_after_two_passes() {
        for debug_logging in [false, true] {
            let dir = tempfile::tempdir().unwrap();
            let output = dir.path().join("out");
            let dispatcher = dispatcher(
                &memory_config(dir.path(), debug_logging),
                &template_dir(dir.path()),
                &output,
            )
            .unwrap();

            dispatcher.submit("header", "Catalog").unwrap();
            dispatcher.process_queues().unwrap();
            assert!(!output.join("header.html").exists());

            dispatcher.process_queues().unwrap();
            let rendered = std::fs::read_to_string(output.join("header.html")).unwrap();
            assert_eq!(rendered, "<h1>Catalog</h1>");
        }
    }

    #[test]
    fn sqlite_backend_persists_between_dispatchers() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let templates = template_dir(dir.path());
        let config = PipelineConfig {
            queue_backend: QueueBackend::Sqlite,
            queue_path: dir.path().join("queue.sqlite3"),
            ..memory_config(dir.path(), false)
        };

        dispatcher(&config, &templates, &output)
            .unwrap()
            .submit("footer", "")
            .unwrap();

        let reopened = dispatcher(&config, &templates, &output).unwrap();
        reopened.process_until_idle(5).unwrap();
        assert_eq!(
            std::fs::read_to_string(output.join("footer.html")).unwrap(),
            "<footer/>"
        );
    }

    #[cfg(not(feature = "redis"))]
    #[test]
    fn redis_backend_needs_the_feature() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            queue_backend: QueueBackend::Redis,
            ..memory_config(dir.path(), false)
        };
        assert!(dispatcher(&config, &template_dir(dir.path()), dir.path()).is_err());
    }
}
