use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use defaults_core::registry::{self, Backend, RegistryConfig};
use defaults_core::{lens, ChangeEvent, ChangeKind, ChangeStream, Defaults, Key, WriteOutcome};
use defaults_raw::{FileStoreConfig, InMemoryRawStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cli::*;
use crate::keys::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    if matches!(cli.command, Command::WatchDemo) {
        return cmd_watch_demo(cli.format);
    }

    registry::configure(RegistryConfig {
        backend: Backend::File {
            path: cli.file.clone(),
            config: FileStoreConfig::default(),
        },
        ..RegistryConfig::default()
    })?;
    let store = registry::standard();
    debug!(file = %cli.file.display(), "using defaults file");

    match cli.command {
        Command::Get(args) => cmd_get(store, args, cli.format),
        Command::Set(args) => cmd_set(store, args),
        Command::Unset(args) => cmd_unset(store, args),
        Command::List => cmd_list(store, cli.format),
        Command::Reset => cmd_reset(store),
        Command::WatchDemo => unreachable!("handled above"),
    }
}

/// One setting as shown to the user.
#[derive(Debug, Serialize)]
pub struct Entry {
    pub key: &'static str,
    pub value: serde_json::Value,
    pub customized: bool,
}

impl Entry {
    fn print(&self) {
        let marker = if self.customized {
            "customized".yellow()
        } else {
            "default".dimmed()
        };
        println!("{} = {} ({})", self.key.bold(), self.value, marker);
    }
}

struct Show<'s>(&'s Defaults);

impl KeyVisitor for Show<'_> {
    type Output = anyhow::Result<Entry>;

    fn visit<K>(self) -> Self::Output
    where
        K: Key,
        K::Value: Serialize + DeserializeOwned,
    {
        let value = self.0.try_get::<K>()?;
        Ok(Entry {
            key: K::name(),
            value: serde_json::to_value(&value)?,
            customized: self.0.is_customized::<K>()?,
        })
    }
}

struct Assign<'s, 'i> {
    store: &'s Defaults,
    input: &'i str,
}

impl KeyVisitor for Assign<'_, '_> {
    type Output = anyhow::Result<WriteOutcome>;

    fn visit<K>(self) -> Self::Output
    where
        K: Key,
        K::Value: Serialize + DeserializeOwned,
    {
        let value: K::Value = parse_value(self.input)
            .with_context(|| format!("invalid value for {}", K::name()))?;
        Ok(self.store.try_set::<K>(value)?)
    }
}

struct Unset<'s>(&'s Defaults);

impl KeyVisitor for Unset<'_> {
    type Output = anyhow::Result<bool>;

    fn visit<K>(self) -> Self::Output
    where
        K: Key,
        K::Value: Serialize + DeserializeOwned,
    {
        Ok(self.0.remove::<K>()?)
    }
}

/// Parse `input` as JSON, falling back to treating it as a bare string.
pub fn parse_value<T: DeserializeOwned>(input: &str) -> anyhow::Result<T> {
    match serde_json::from_str(input) {
        Ok(value) => Ok(value),
        Err(json_err) => serde_json::from_value(serde_json::Value::String(input.to_string()))
            .map_err(|_| json_err)
            .with_context(|| format!("cannot parse {input:?}")),
    }
}

pub fn show(store: &Defaults, key: KeyName) -> anyhow::Result<Entry> {
    key.accept(Show(store))
}

pub fn assign(store: &Defaults, key: KeyName, input: &str) -> anyhow::Result<WriteOutcome> {
    key.accept(Assign { store, input })
}

pub fn list(store: &Defaults) -> anyhow::Result<Vec<Entry>> {
    KeyName::ALL.iter().map(|key| show(store, *key)).collect()
}

fn cmd_get(store: &Defaults, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let entry = show(store, args.key)?;
    match format {
        OutputFormat::Text => entry.print(),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entry)?),
    }
    Ok(())
}

fn cmd_set(store: &Defaults, args: SetArgs) -> anyhow::Result<()> {
    match assign(store, args.key, &args.value)? {
        WriteOutcome::Stored => println!("{} Stored {:?}.", "✓".green().bold(), args.key),
        WriteOutcome::Removed => println!(
            "{} {:?} is back to its default.",
            "✓".green().bold(),
            args.key
        ),
        WriteOutcome::Skipped => println!("{} {:?} unchanged.", "-".dimmed(), args.key),
    }
    Ok(())
}

fn cmd_unset(store: &Defaults, args: UnsetArgs) -> anyhow::Result<()> {
    if args.key.accept(Unset(store))? {
        println!("{} Removed {:?}.", "✓".green().bold(), args.key);
    } else {
        println!("{:?} was not set.", args.key);
    }
    Ok(())
}

fn cmd_list(store: &Defaults, format: OutputFormat) -> anyhow::Result<()> {
    let entries = list(store)?;
    match format {
        OutputFormat::Text => entries.iter().for_each(Entry::print),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

fn cmd_reset(store: &Defaults) -> anyhow::Result<()> {
    let removed = store.reset()?;
    println!("{} Reset: {} entries removed.", "✓".green().bold(), removed);
    Ok(())
}

/// What one scripted write did, and what subscribers heard.
#[derive(Debug, Serialize)]
pub struct DemoStep {
    pub action: &'static str,
    pub outcome: String,
    pub events: Vec<String>,
}

fn describe(event: &ChangeEvent) -> String {
    let kind = match event.kind {
        ChangeKind::Stored => "stored",
        ChangeKind::Removed => "removed",
        ChangeKind::Reset => "reset",
    };
    match &event.key {
        Some(key) => format!("{kind} {key}"),
        None => kind.to_string(),
    }
}

fn drain(rx: &mut ChangeStream) -> Vec<String> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(describe(&event));
    }
    events
}

/// Run the scripted writes against a private in-memory store.
pub fn watch_demo() -> anyhow::Result<Vec<DemoStep>> {
    let store = Defaults::observable(Arc::new(InMemoryRawStore::new()));
    let mut rx = store
        .subscribe()
        .context("observable store has no change channel")?;

    let launches = store.setting::<LaunchCount>();
    let greeting = store.setting::<Greeting>();
    let width = store
        .setting::<WindowFrameKey>()
        .project(lens!(WindowFrame, width));

    let mut steps = Vec::new();
    let mut record = |action: &'static str, outcome: WriteOutcome| {
        steps.push(DemoStep {
            action,
            outcome: format!("{outcome:?}").to_lowercase(),
            events: drain(&mut rx),
        });
    };

    record("launch_count += 1", launches.update(|n| *n += 1));
    record("launch_count = 0", launches.set(0));
    record("greeting = \"Hello!\"", greeting.set(Some("Hello!".into())));
    record("greeting = \"Hello!\"", greeting.set(Some("Hello!".into())));
    record("greeting = null", greeting.set(None));
    record("window_frame.width = 1024", width.set(1024));
    record("window_frame.width = 800", width.set(800));

    store.reset()?;
    steps.push(DemoStep {
        action: "reset",
        outcome: "removed".into(),
        events: drain(&mut rx),
    });
    Ok(steps)
}

fn cmd_watch_demo(format: OutputFormat) -> anyhow::Result<()> {
    let steps = watch_demo()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&steps)?),
        OutputFormat::Text => {
            for step in &steps {
                println!("{} {}", step.action.bold(), format!("[{}]", step.outcome).as_str().cyan());
                if step.events.is_empty() {
                    println!("    {}", "no notification".dimmed());
                }
                for event in &step.events {
                    println!("    {} {}", "→".green(), event);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_accepts_json_and_bare_strings() {
        assert_eq!(parse_value::<i64>("42").unwrap(), 42);
        assert!(!parse_value::<bool>("false").unwrap());
        assert_eq!(
            parse_value::<Option<String>>("Hello!").unwrap(),
            Some("Hello!".to_string())
        );
        assert_eq!(parse_value::<Option<String>>("null").unwrap(), None);
        assert_eq!(parse_value::<Theme>("dark").unwrap(), Theme::Dark);
        assert!(parse_value::<i64>("many").is_err());
    }

    #[test]
    fn assign_and_show() {
        let store = Defaults::in_memory();
        assert_eq!(
            assign(&store, KeyName::Greeting, "Hi").unwrap(),
            WriteOutcome::Stored
        );
        let entry = show(&store, KeyName::Greeting).unwrap();
        assert_eq!(entry.key, "greeting");
        assert_eq!(entry.value, serde_json::json!("Hi"));
        assert!(entry.customized);

        assert_eq!(
            assign(&store, KeyName::Greeting, "null").unwrap(),
            WriteOutcome::Removed
        );
        assert!(!show(&store, KeyName::Greeting).unwrap().customized);
    }

    #[test]
    fn assign_structured_values() {
        let store = Defaults::in_memory();
        assign(
            &store,
            KeyName::WindowFrame,
            r#"{"x":10,"y":20,"width":1280,"height":720}"#,
        )
        .unwrap();
        assert_eq!(store.get::<WindowFrameKey>().width, 1280);

        assign(&store, KeyName::Profile, r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(store.get::<ProfileKey>().name, "Ada");
    }

    #[test]
    fn assign_rejects_bad_input() {
        let store = Defaults::in_memory();
        assert!(assign(&store, KeyName::LaunchCount, "lots").is_err());
        assert!(assign(&store, KeyName::WindowFrame, "{}").is_err());
    }

    #[test]
    fn list_covers_every_key() {
        let store = Defaults::in_memory();
        let entries = list(&store).unwrap();
        assert_eq!(entries.len(), KeyName::ALL.len());
        assert!(entries.iter().all(|entry| !entry.customized));
    }

    #[test]
    fn watch_demo_reports_only_effective_writes() {
        let steps = watch_demo().unwrap();
        let outcomes: Vec<_> = steps.iter().map(|s| s.outcome.as_str()).collect();
        assert_eq!(
            outcomes,
            [
                "stored", "skipped", "stored", "skipped", "removed", "stored", "removed",
                "removed"
            ]
        );
        assert_eq!(steps[0].events, ["stored launch_count"]);
        assert!(steps[1].events.is_empty());
        assert!(steps[3].events.is_empty());
        assert_eq!(steps[4].events, ["removed greeting"]);
        assert_eq!(steps[7].events, ["reset"]);
    }
}
