// Local crates
use crate::{
    helpers::errors::{ClientError, ClientResult},
    render::templates::Template,
};

// External crates
use minijinja::{Environment, Value};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use tracing::instrument;

/// Renders named templates into an output sink.
///
/// Each render goes to an in-memory buffer first; the sink only sees complete
/// output, so a failed render never leaves half a table on the terminal.
pub struct Renderer<W> {
    env: Environment<'static>,
    sink: W,
}

impl<W> fmt::Debug for Renderer<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer").finish_non_exhaustive()
    }
}

impl<W: Write> Renderer<W> {
    pub fn new(sink: W) -> ClientResult<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_keep_trailing_newline(true);
        env.add_filter("pad", pad);

        for template in Template::ALL {
            env.add_template(template.name(), template.source())
                .map_err(|source| ClientError::Render {
                    template: template.name(),
                    source,
                })?;
        }

        Ok(Self { env, sink })
    }

    #[instrument(
        name = "backupctl_renderer::render",
        target = "render::renderer",
        skip(self, ctx),
        level = "debug"
    )]
    pub fn render<S: Serialize>(&mut self, template: Template, ctx: S) -> ClientResult<()> {
        let render_error = |source| ClientError::Render {
            template: template.name(),
            source,
        };

        let output = self
            .env
            .get_template(template.name())
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(render_error)?;

        self.sink.write_all(output.as_bytes())?;
        self.sink.flush()?;
        Ok(())
    }

    /// Write a single line of plain text, bypassing templates.
    pub fn message(&mut self, line: &str) -> ClientResult<()> {
        writeln!(self.sink, "{line}")?;
        self.sink.flush()?;
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// `{{ value|pad(20) }}`: left-align in a column of `width` characters.
fn pad(value: Value, width: usize) -> String {
    format!("{:<width$}", value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::models::AgentRecord;
    use minijinja::context;

    fn agent(node_name: &str, status: &str) -> AgentRecord {
        AgentRecord {
            node_name: node_name.to_string(),
            id: format!("id-{node_name}"),
            version: "1.0.0".to_string(),
            node_type: "mongod".to_string(),
            cluster_id: "c1".to_string(),
            replicaset_name: "rs0".to_string(),
            replicaset_id: "rs0-id".to_string(),
            status: status.to_string(),
            last_command_sent: "ping".to_string(),
            last_seen: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn all_templates_compile() {
        assert!(Renderer::new(Vec::new()).is_ok());
    }

    #[test]
    fn nodes_table_has_one_row_per_agent() {
        let mut renderer = Renderer::new(Vec::new()).unwrap();
        let clients = vec![agent("node-a", "ok"), agent("node-b", "down")];

        renderer
            .render(Template::ConnectedNodes, context! { clients => clients })
            .unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Node Name "));
        assert!(lines[1].starts_with("node-a"));
        assert!(lines[1].ends_with(" ok"));
        assert!(lines[2].starts_with("node-b"));
        assert_eq!(&lines[1][..31], format!("{:<30} ", "node-a"));
    }

    #[test]
    fn verbose_nodes_list_every_field() {
        let mut renderer = Renderer::new(Vec::new()).unwrap();
        renderer
            .render(
                Template::ConnectedNodesVerbose,
                context! { clients => vec![agent("node-a", "ok")] },
            )
            .unwrap();

        let out = String::from_utf8(renderer.into_inner()).unwrap();
        assert!(out.contains("Node ID           : id-node-a\n"));
        assert!(out.contains("Last Seen         : 2024-01-01T00:00:00Z\n"));
    }

    #[test]
    fn failed_render_writes_nothing() {
        let mut renderer = Renderer::new(Vec::new()).unwrap();

        let err = renderer
            .render(Template::ConnectedNodes, context! { clients => 42 })
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Render {
                template: "connected_nodes",
                ..
            }
        ));
        assert!(renderer.into_inner().is_empty());
    }

    #[test]
    fn message_is_a_plain_line() {
        let mut renderer = Renderer::new(Vec::new()).unwrap();
        renderer.message("No backups found").unwrap();
        assert_eq!(renderer.into_inner(), b"No backups found\n");
    }
}
