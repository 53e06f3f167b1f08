// Interactive selector session
//
// A line-oriented stand-in for the query editor: each command is a user
// gesture (pick a value, clear a field, use a library panel) and every chain
// or panel notification is printed as it happens. Fetch completions are
// applied on this task between commands, so a slow answer can land while
// the user is typing and a superseded one shows up as a dropped result.
//
// Commands:
//   show                 field values, phases and option counts
//   options <field>      loaded options (plus template variables)
//   set <field> <value>  select a value
//   clear <field>        clear a value
//   wait                 apply every outstanding fetch and panel restore
//   query | save <path>  print or save the query as JSON
//   context              resolved values as the controller sees them
//   panels | use <uid>   list library panels, use one instead of the panel
//   panel                print the panel model
//   logs [n] | logs clear
//   help | quit

use crate::azure::AzureMonitorQuery;
use crate::cascade::{ChainController, FetchCompletion, FieldPhase};
use crate::events::{ChainEvent, PanelEvent};
use crate::library_panel::{LibraryPanel, PanelSwapper};
use crate::logging::{LogBuffer, LogLevel};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "\
Commands:
  show                 field values, phases and option counts
  options <field>      loaded options for a field
  set <field> <value>  select a value (fields: see `show`)
  clear <field>        clear a value
  wait                 apply every outstanding fetch and panel restore
  query                print the current query as JSON
  save <path>          write the current query as JSON
  context              resolved field values as JSON
  panels               list library panels
  use <uid>            use a library panel instead of the current panel
  panel                print the current panel model
  logs [n]             show the last n log lines (default 20)
  logs clear           forget captured log lines
  help                 this text
  quit                 leave";

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show,
    Options(String),
    Set { field: String, value: String },
    Clear(String),
    Wait,
    Query,
    Save(PathBuf),
    Context,
    Panels,
    Use(String),
    Panel,
    Logs(usize),
    ClearLogs,
    Help,
    Quit,
}

impl Command {
    /// Parse a line; `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let arg = |name: &str| {
            if rest.is_empty() {
                Err(format!("usage: {} <{}>", word, name))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match word {
            "show" | "s" => Self::Show,
            "options" | "o" => Self::Options(arg("field")?),
            "set" => {
                let Some((field, value)) = rest.split_once(char::is_whitespace) else {
                    return Err("usage: set <field> <value>".to_string());
                };
                Self::Set {
                    field: field.to_string(),
                    value: value.trim().to_string(),
                }
            }
            "clear" => Self::Clear(arg("field")?),
            "wait" | "w" => Self::Wait,
            "query" => Self::Query,
            "save" => Self::Save(PathBuf::from(arg("path")?)),
            "context" => Self::Context,
            "panels" => Self::Panels,
            "use" => Self::Use(arg("uid")?),
            "panel" => Self::Panel,
            "logs" if rest == "clear" => Self::ClearLogs,
            "logs" => Self::Logs(if rest.is_empty() {
                20
            } else {
                rest.parse()
                    .map_err(|_| format!("not a number: {}", rest))?
            }),
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => return Err(format!("unknown command: {} (try `help`)", other)),
        };
        Ok(Some(command))
    }
}

/// What the loop should do after a command
#[derive(Debug)]
pub enum Reply {
    Text(String),
    Quit,
}

enum Step {
    Input(Option<String>),
    Fetched(FetchCompletion),
    Swapped,
}

/// Everything one interactive session owns
pub struct Session {
    controller: ChainController,
    chain_events: mpsc::UnboundedReceiver<ChainEvent>,
    swapper: PanelSwapper,
    panel_events: mpsc::UnboundedReceiver<PanelEvent>,
    query: AzureMonitorQuery,
    library: Vec<LibraryPanel>,
    variables: Vec<String>,
    logs: LogBuffer,
}

/// Parts a session is assembled from
pub struct SessionParts {
    pub controller: ChainController,
    pub swapper: PanelSwapper,
    pub query: AzureMonitorQuery,
    pub library: Vec<LibraryPanel>,
    pub variables: Vec<String>,
    pub logs: LogBuffer,
}

impl Session {
    /// Wire up event channels and mount the chain from the saved query
    pub fn new(parts: SessionParts) -> Self {
        let (chain_tx, chain_events) = mpsc::unbounded_channel();
        let (panel_tx, panel_events) = mpsc::unbounded_channel();

        let mut controller = parts.controller.with_events(chain_tx);
        controller.mount(&parts.query.context());

        Self {
            controller,
            chain_events,
            swapper: parts.swapper.with_events(panel_tx),
            panel_events,
            query: parts.query,
            library: parts.library,
            variables: parts.variables,
            logs: parts.logs,
        }
    }

    #[cfg(test)]
    pub fn query(&self) -> &AzureMonitorQuery {
        &self.query
    }

    #[cfg(test)]
    pub fn controller(&self) -> &ChainController {
        &self.controller
    }

    #[cfg(test)]
    pub fn swapper(&self) -> &PanelSwapper {
        &self.swapper
    }

    /// Read commands from stdin until `quit` or end of input
    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("{}", self.render_fields());
        println!("Type `help` for commands.");
        self.print_events();
        prompt()?;

        loop {
            // Branches only pick the next step; state is touched after select!
            let step = tokio::select! {
                line = lines.next_line() => Step::Input(line.context("Failed to read stdin")?),
                Some(completion) = self.controller.next_completion() => Step::Fetched(completion),
                Some(_) = self.swapper.next_swap() => Step::Swapped,
            };

            match step {
                Step::Input(None) => break,
                Step::Input(Some(line)) => {
                    let reply = match Command::parse(&line) {
                        Ok(Some(command)) => self.execute(command).await,
                        Ok(None) => Reply::Text(String::new()),
                        Err(message) => Reply::Text(message),
                    };
                    self.print_events();
                    match reply {
                        Reply::Quit => break,
                        Reply::Text(text) if !text.is_empty() => println!("{}", text),
                        Reply::Text(_) => {}
                    }
                    prompt()?;
                }
                Step::Fetched(completion) => {
                    self.controller.commit(completion);
                    self.print_events();
                }
                Step::Swapped => self.print_events(),
            }
        }

        tracing::info!(
            in_flight = self.controller.in_flight(),
            pending_swaps = self.swapper.pending(),
            "Session ended"
        );
        Ok(())
    }

    /// Run one command against session state
    pub async fn execute(&mut self, command: Command) -> Reply {
        let text = match command {
            Command::Show => self.render_fields(),
            Command::Options(field) => self.render_options(&field),
            Command::Set { field, value } => self.select(&field, Some(value)),
            Command::Clear(field) => self.select(&field, None),
            Command::Wait => {
                let fetched = self.controller.settle().await;
                let swapped = self.swapper.settle().await.len();
                format!(
                    "settled {} fetch(es), {} panel restore(s)\n{}",
                    fetched,
                    swapped,
                    self.render_fields()
                )
            }
            Command::Query => self.query_json(),
            Command::Context => {
                let context = self.controller.context();
                if context.is_empty() {
                    "(no values)".to_string()
                } else {
                    serde_json::to_string_pretty(&context)
                        .unwrap_or_else(|e| format!("failed to render context: {}", e))
                }
            }
            Command::Save(path) => match std::fs::write(&path, self.query_json()) {
                Ok(()) => format!("saved {}", path.display()),
                Err(e) => format!("failed to write {}: {}", path.display(), e),
            },
            Command::Panels => self.render_library(),
            Command::Use(uid) => match self.library.iter().find(|p| p.uid == uid) {
                Some(library) => {
                    self.swapper.use_library_panel(library);
                    format!("using {} ({})", library.name, library.uid)
                }
                None => format!("no library panel {:?} (see `panels`)", uid),
            },
            Command::Panel => serde_json::to_string_pretty(self.swapper.panel())
                .unwrap_or_else(|e| format!("failed to render panel: {}", e)),
            Command::Logs(n) => {
                let lines: Vec<String> = self
                    .logs
                    .recent(n, LogLevel::Trace)
                    .iter()
                    .map(|e| e.render())
                    .collect();
                if lines.is_empty() {
                    "(no log lines)".to_string()
                } else {
                    lines.join("\n")
                }
            }
            Command::ClearLogs => {
                self.logs.clear();
                "log buffer cleared".to_string()
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Reply::Quit,
        };
        Reply::Text(text)
    }

    fn select(&mut self, field: &str, value: Option<String>) -> String {
        let known = match (self.controller.choices(field, &self.variables), &value) {
            (Some(choices), Some(v)) => choices.find(v).is_some(),
            _ => true,
        };
        match self.controller.set_value(field, value) {
            Ok(true) if !known => "set (value is not among the loaded options)".to_string(),
            Ok(true) => String::new(),
            Ok(false) => "unchanged".to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Drain pending notifications, fold chain events into the query
    pub fn drain_events(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(event) = self.chain_events.try_recv() {
            if self.query.apply(&event) {
                tracing::trace!(field = %event.field(), "Query updated");
            }
            lines.push(format!("  · {}", event.summary()));
        }
        while let Ok(event) = self.panel_events.try_recv() {
            lines.push(format!("  ▪ {}", panel_summary(&event)));
        }
        lines
    }

    fn print_events(&mut self) {
        for line in self.drain_events() {
            println!("{}", line);
        }
    }

    fn render_fields(&self) -> String {
        let mut out = String::new();
        for field in self.controller.fields() {
            let phase = match field.phase() {
                FieldPhase::Loading => "loading…",
                phase => phase.as_str(),
            };
            let value = match (field.value(), field.selected()) {
                (Some(value), Some(option)) if option.label != value => {
                    format!("{} ({})", value, option.label)
                }
                (Some(value), _) => value.to_string(),
                (None, _) => "-".to_string(),
            };
            let _ = write!(
                out,
                "{:<18} {:<18} {:<9} {:>3} option(s) {:>3} fetch(es) #{:<3} {}",
                field.label(),
                field.key(),
                phase,
                field.options().len(),
                field.fetches_issued(),
                field.sequence(),
                value,
            );
            if let Some(error) = field.last_error() {
                let _ = write!(out, "  [last fetch failed: {}]", error);
            }
            out.push('\n');
        }
        out.pop();
        out
    }

    fn render_options(&self, field: &str) -> String {
        let Some(choices) = self.controller.choices(field, &self.variables) else {
            return format!("unknown field: {}", field);
        };
        if choices.is_empty() {
            return "(no options)".to_string();
        }
        let mut out = String::new();
        for option in &choices.options {
            let _ = writeln!(out, "  {:<40} {}", option.value, option.label);
        }
        for group in &choices.groups {
            let _ = writeln!(out, "  {}:", group.label);
            for option in &group.options {
                let _ = writeln!(out, "    {}", option.value);
            }
        }
        out.pop();
        out
    }

    fn render_library(&self) -> String {
        if self.library.is_empty() {
            return "(no library panels)".to_string();
        }
        self.library
            .iter()
            .map(|p| {
                format!(
                    "  {:<16} {:<24} v{} {}",
                    p.uid,
                    p.name,
                    p.version,
                    p.panel_type().unwrap_or("?")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn query_json(&self) -> String {
        serde_json::to_string_pretty(&self.query)
            .unwrap_or_else(|e| format!("failed to render query: {}", e))
    }
}

fn panel_summary(event: &PanelEvent) -> String {
    match event {
        PanelEvent::PluginChanged { from, to, .. } => format!("plugin {} -> {}", from, to),
        PanelEvent::SwapSuperseded { library_uid, .. } => {
            format!("restore of {} superseded", library_uid)
        }
        PanelEvent::Restored { library_uid, .. } => format!("restored {}", library_uid),
        PanelEvent::Refreshed { .. } => "panel refreshed".to_string(),
        PanelEvent::QueriesChanged { .. } => "queries changed".to_string(),
        PanelEvent::OptionsChanged { .. } => "options changed".to_string(),
    }
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::{self, METRIC_DEFINITION, RESOURCE_GROUP, SUBSCRIPTION};
    use crate::fixture::{FixtureFile, FixtureSource};
    use crate::library_panel::PanelModel;
    use std::sync::Arc;
    use std::time::Duration;

    const FIXTURE: &str = r#"
[[entry]]
field = "subscription"
options = [{ value = "sub1", label = "Production" }]

[[entry]]
field = "resource_group"
ancestors = ["sub1"]
options = [{ value = "rg1", label = "rg1" }, { value = "rg2", label = "rg2" }]

[[entry]]
field = "metric_definition"
ancestors = ["sub1", "rg1"]
options = [{ value = "Microsoft.Compute/virtualMachines", label = "Virtual machines" }]

[[library_panels]]
uid = "vm-cpu"
name = "VM CPU"
model = { type = "stat", title = "VM CPU" }
"#;

    fn session(query: AzureMonitorQuery) -> Session {
        let file = FixtureFile::parse(FIXTURE).unwrap();
        let controller = ChainController::new(
            azure::metrics_chain().unwrap(),
            Arc::new(FixtureSource::new(&file)),
        );
        Session::new(SessionParts {
            controller,
            swapper: PanelSwapper::new(
                PanelModel::new(1, "timeseries", "New panel"),
                Duration::from_millis(5),
            ),
            query,
            library: file.library_panels,
            variables: vec!["$sub".to_string()],
            logs: LogBuffer::new(),
        })
    }

    async fn run(session: &mut Session, line: &str) -> String {
        match session.execute(Command::parse(line).unwrap().unwrap()).await {
            Reply::Text(text) => text,
            Reply::Quit => "<quit>".to_string(),
        }
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("set resource_name web vm 01").unwrap(),
            Some(Command::Set {
                field: "resource_name".to_string(),
                value: "web vm 01".to_string()
            })
        );
        assert_eq!(Command::parse("  ").unwrap(), None);
        assert_eq!(Command::parse("logs").unwrap(), Some(Command::Logs(20)));
        assert_eq!(Command::parse("logs clear").unwrap(), Some(Command::ClearLogs));
        assert!(Command::parse("set subscription").is_err());
        assert!(Command::parse("logs many").is_err());
        assert!(Command::parse("frobnicate").is_err());
    }

    #[tokio::test]
    async fn test_selections_flow_into_query() {
        let mut session = session(AzureMonitorQuery::default());
        run(&mut session, "wait").await;

        run(&mut session, "set subscription sub1").await;
        run(&mut session, "wait").await;
        run(&mut session, "set resource_group rg1").await;
        run(&mut session, "wait").await;
        let lines = session.drain_events();

        assert!(lines.iter().any(|l| l.contains("resource_group = rg1")));
        assert_eq!(session.query().subscription.as_deref(), Some("sub1"));
        assert_eq!(session.query().resource_group.as_deref(), Some("rg1"));
        assert_eq!(
            session
                .controller()
                .field(METRIC_DEFINITION)
                .unwrap()
                .options()
                .len(),
            1
        );

        run(&mut session, "clear subscription").await;
        session.drain_events();
        assert_eq!(session.query().subscription, None);
        assert_eq!(session.query().resource_group, None);
    }

    #[tokio::test]
    async fn test_mounts_from_saved_query() {
        let query = AzureMonitorQuery {
            subscription: Some("sub1".to_string()),
            resource_group: Some("rg1".to_string()),
            ..Default::default()
        };
        let mut session = session(query);
        run(&mut session, "wait").await;

        let shown = run(&mut session, "show").await;
        assert!(shown.contains("rg1"));
        assert!(shown.contains("sub1 (Production)"), "selected label shown");
        let context = run(&mut session, "context").await;
        assert!(context.contains("\"resource_group\": \"rg1\""));
        let options = run(&mut session, &format!("options {}", RESOURCE_GROUP)).await;
        assert!(options.contains("rg2"));
        assert!(options.contains("$sub"), "template variables listed");
    }

    #[tokio::test]
    async fn test_reports_unknown_and_unlisted_values() {
        let mut session = session(AzureMonitorQuery::default());
        run(&mut session, "wait").await;

        assert!(run(&mut session, "set colour blue").await.contains("colour"));
        assert!(run(&mut session, &format!("set {} sub9", SUBSCRIPTION))
            .await
            .contains("not among the loaded options"));
        assert_eq!(run(&mut session, "set subscription sub9").await, "unchanged");
        assert_eq!(run(&mut session, "set subscription $sub").await, "");
    }

    #[tokio::test]
    async fn test_use_library_panel() {
        let mut session = session(AzureMonitorQuery::default());

        assert!(run(&mut session, "use missing").await.contains("no library panel"));
        assert!(run(&mut session, "use vm-cpu").await.contains("VM CPU"));
        run(&mut session, "wait").await;

        let lines = session.drain_events();
        assert!(lines.iter().any(|l| l.contains("plugin timeseries -> stat")));
        assert!(lines.iter().any(|l| l.contains("restored vm-cpu")));
        assert_eq!(session.swapper().panel().title, "VM CPU");
        assert_eq!(session.swapper().panel().id, 1);
    }

    #[tokio::test]
    async fn test_quit() {
        let mut session = session(AzureMonitorQuery::default());
        assert_eq!(run(&mut session, "quit").await, "<quit>");
    }
}
