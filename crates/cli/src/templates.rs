//! File-based templates: one projector per template file, plus the handler
//! that writes rendered output.

use std::path::{Component, Path, PathBuf};

use serde_json::json;
use thiserror::Error;
use tracing::info;

use catalog_events::{
    ARTIFACT_UPDATE_REQUESTED, Command, CommandError, CommandHandler, DomainEvent,
    ProjectionError, Projector,
};

pub const WRITE_FILE: &str = "write-file";

const PAYLOAD_PLACEHOLDER: &str = "{{payload}}";
const DATA_VERSION_PLACEHOLDER: &str = "{{data_version}}";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("cannot read template directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Projects an artifact request by rendering one template file.
///
/// The template is read at projection time, so edits are picked up without a
/// restart. `{{payload}}` and `{{data_version}}` are substituted.
#[derive(Debug, Clone)]
pub struct TemplateProjector {
    code: String,
    source: PathBuf,
}

impl TemplateProjector {
    pub fn new(code: impl Into<String>, source: impl Into<PathBuf>) -> Self {
        Self {
            code: code.into(),
            source: source.into(),
        }
    }

    fn output_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.code.clone())
    }
}

impl Projector for TemplateProjector {
    fn code(&self) -> &str {
        &self.code
    }

    fn event_type(&self) -> &str {
        ARTIFACT_UPDATE_REQUESTED
    }

    fn project(&self, event: &DomainEvent) -> Result<Vec<Command>, ProjectionError> {
        let template = std::fs::read_to_string(&self.source).map_err(|e| {
            ProjectionError::failed(format!("cannot read template {}: {e}", self.source.display()))
        })?;
        let contents = template
            .replace(PAYLOAD_PLACEHOLDER, event.payload())
            .replace(DATA_VERSION_PLACEHOLDER, event.data_version().as_str());

        Ok(vec![Command::new(
            WRITE_FILE,
            json!({
                "file": self.output_name(),
                "contents": contents,
                "data_version": event.data_version().as_str(),
            }),
        )])
    }
}

/// One projector per regular file in `dir`, sorted by code.
pub fn discover(dir: &Path) -> Result<Vec<TemplateProjector>, TemplateError> {
    let entries = std::fs::read_dir(dir).map_err(|source| TemplateError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut projectors = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| TemplateError::Directory {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(code) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if code.is_empty() || code.starts_with('.') {
            continue;
        }
        projectors.push(TemplateProjector::new(code, &path));
    }

    projectors.sort_by(|a, b| a.code.cmp(&b.code));
    Ok(projectors)
}

/// Writes `write-file` commands below a fixed output directory.
#[derive(Debug, Clone)]
pub struct WriteFileHandler {
    output_dir: PathBuf,
}

impl WriteFileHandler {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn resolve(&self, file: &str) -> Result<PathBuf, CommandError> {
        let relative = Path::new(file);
        let escapes = relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(CommandError::invalid_parameters(format!(
                "file \"{file}\" must be a relative path inside the output directory"
            )));
        }
        Ok(self.output_dir.join(relative))
    }
}

impl CommandHandler for WriteFileHandler {
    fn command_type(&self) -> &str {
        WRITE_FILE
    }

    fn handle(&self, command: &Command) -> Result<(), CommandError> {
        let params = command.parameters();
        let field = |name: &str| {
            params
                .get(name)
                .and_then(|v| v.as_str())
                .ok_or_else(|| CommandError::invalid_parameters(format!("missing string field \"{name}\"")))
        };
        let file = field("file")?;
        let contents = field("contents")?;
        let data_version = field("data_version")?;

        let target = self.resolve(file)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CommandError::failed(format!("cannot create {}: {e}", parent.display())))?;
        }
        std::fs::write(&target, contents)
            .map_err(|e| CommandError::failed(format!("cannot write {}: {e}", target.display())))?;

        info!(path = %target.display(), data_version, "artifact written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(code: &str, payload: &str) -> DomainEvent {
        DomainEvent::artifact_update_requested(
            code,
            payload,
            "1700000000".parse().unwrap(),
        )
    }

    #[test]
    fn discovers_one_projector_per_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("header.html"), "<h1/>").unwrap();
        std::fs::write(dir.path().join("footer.html"), "<footer/>").unwrap();
        std::fs::write(dir.path().join(".hidden"), "").unwrap();
        std::fs::create_dir(dir.path().join("partials")).unwrap();

        let codes: Vec<String> = discover(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.code().to_string())
            .collect();
        assert_eq!(codes, vec!["footer", "header"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover(&dir.path().join("absent")).is_err());
    }

    #[test]
    fn projection_renders_placeholders_into_one_write_command() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("header.html");
        std::fs::write(&source, "<h1>{{payload}}</h1><!-- {{data_version}} -->").unwrap();

        let commands = TemplateProjector::new("header", &source)
            .project(&event("header", "Catalog"))
            .unwrap();

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].command_type(), WRITE_FILE);
        assert_eq!(
            commands[0].parameters(),
            &json!({
                "file": "header.html",
                "contents": "<h1>Catalog</h1><!-- 1700000000 -->",
                "data_version": "1700000000",
            })
        );
    }

    #[test]
    fn projection_fails_when_the_template_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let err = TemplateProjector::new("header", dir.path().join("header.html"))
            .project(&event("header", ""))
            .unwrap_err();
        assert!(matches!(err, ProjectionError::Failed(_)));
    }

    #[test]
    fn write_file_writes_below_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let handler = WriteFileHandler::new(dir.path());

        handler
            .handle(&Command::new(
                WRITE_FILE,
                json!({"file": "nested/header.html", "contents": "hi", "data_version": "1"}),
            ))
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("nested/header.html")).unwrap();
        assert_eq!(written, "hi");
    }

    #[test]
    fn write_file_rejects_paths_outside_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let handler = WriteFileHandler::new(dir.path().join("out"));

        for file in ["../escape.html", "/etc/passwd", ""] {
            let err = handler
                .handle(&Command::new(
                    WRITE_FILE,
                    json!({"file": file, "contents": "x", "data_version": "1"}),
                ))
                .unwrap_err();
            assert!(matches!(err, CommandError::InvalidParameters(_)), "{file}");
        }
        assert!(!dir.path().join("escape.html").exists());
    }

    #[test]
    fn write_file_requires_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let err = WriteFileHandler::new(dir.path())
            .handle(&Command::new(WRITE_FILE, json!({"file": "a.html"})))
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidParameters(_)));
    }
}
