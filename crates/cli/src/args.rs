use std::path::PathBuf;

use clap::Parser;

/// Request regeneration of a template artifact through the import pipeline.
///
/// Queue backend, data-version file and logging are configured through the
/// `CATALOG_*` environment variables.
#[derive(Debug, Parser)]
#[command(name = "trigger-projection")]
#[command(version)]
#[command(about = "Enqueue a template projection and optionally process the queues")]
pub struct Args {
    /// List available template IDs
    #[arg(short, long)]
    pub list: bool,

    /// Process the command queue and then the domain event queue once each
    #[arg(short = 'p', long = "process-queues")]
    pub process_queues: bool,

    /// Source data handed to the projector
    #[arg(long, default_value = "")]
    pub payload: String,

    /// Directory whose files are the available templates (ID = file stem)
    #[arg(long, env = "CATALOG_TEMPLATE_DIR", default_value = "templates")]
    pub templates: PathBuf,

    /// Directory rendered templates are written to
    #[arg(long, env = "CATALOG_OUTPUT_DIR", default_value = "var/output")]
    pub output: PathBuf,

    /// Template ID
    #[arg(value_name = "TEMPLATE_ID", required_unless_present = "list")]
    pub template_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_short_flags_and_template_id() {
        let args = Args::try_parse_from(["trigger-projection", "-p", "header"]).unwrap();
        assert!(args.process_queues);
        assert!(!args.list);
        assert_eq!(args.template_id.as_deref(), Some("header"));
        assert_eq!(args.payload, "");
    }

    #[test]
    fn list_does_not_need_a_template_id() {
        let args = Args::try_parse_from(["trigger-projection", "--list"]).unwrap();
        assert!(args.list);
        assert!(args.template_id.is_none());
    }

    #[test]
    fn template_id_is_required_otherwise() {
        assert!(Args::try_parse_from(["trigger-projection", "--process-queues"]).is_err());
    }
}
