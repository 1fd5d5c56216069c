//! Command dispatch

use std::io;
use std::path::Path;
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::application::services::{copy_between, get_all, get_one, set_one, set_values};
use crate::application::{
    ApplicationError, FieldSetEvent, Options, SetAllEvent, SetObserver,
};
use crate::cli::args::{Cli, Commands, ConfigCommands, OptionArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, Settings};
use crate::domain::value::as_rows;
use crate::domain::{Document, DomainError, NodeId};
use crate::infrastructure::document_io::{
    document_to_json, load_document, load_values, save_document, to_json,
};
use crate::infrastructure::traits::NodeTree;
use crate::infrastructure::ServiceContainer;

/// Logs set notifications at info level (`-d`).
struct TraceObserver;

impl SetObserver for TraceObserver {
    fn field_set(&self, tree: &mut dyn NodeTree, event: &FieldSetEvent) {
        info!(
            "set {}[{}/{}] on <{}>: {}",
            event.key,
            event.workspace.index,
            event.workspace.field_count,
            tree.tag(event.node).unwrap_or_default(),
            event.value
        );
    }

    fn set_all(&self, _tree: &mut dyn NodeTree, event: &SetAllEvent) {
        info!(
            "set complete: {} keys on {} roots",
            event.values.len(),
            event.roots.len()
        );
    }
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Completion { shell }) => {
            completion(*shell);
            Ok(())
        }
        Some(Commands::Config { command }) => config_command(cli.config.as_deref(), command),
        Some(command) => {
            let settings = Settings::load(cli.config.as_deref())?;
            let container = ServiceContainer::new(settings);
            run(&container, command)
        }
        None => Err(CliError::Usage(
            "no command given, see --help".to_string(),
        )),
    }
}

fn run(container: &ServiceContainer, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Get {
            document,
            key,
            root,
            options,
        } => cmd_get(container, document, key.as_deref(), root.as_deref(), options),
        Commands::Set {
            document,
            values,
            key,
            root,
            write,
            options,
        } => cmd_set(
            container,
            document,
            values,
            key.as_deref(),
            root.as_deref(),
            *write,
            options,
        ),
        Commands::Copy {
            source,
            target,
            write,
            options,
        } => cmd_copy(container, source, target, *write, options),
        Commands::Tree { document } => cmd_tree(document),
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

/// Settings-based options with the flags applied; an observer is attached
/// when notifications are requested.
fn options_for(container: &ServiceContainer, args: &OptionArgs) -> Options {
    let opts = container.values.options(Some(&args.to_overrides()));
    if opts.emit_set_events || opts.emit_set_all_event {
        opts.with_observer(Arc::new(TraceObserver))
    } else {
        opts
    }
}

/// The document root, or every node whose key attribute equals `root`.
fn select_roots(doc: &Document, root: Option<&str>, opts: &Options) -> CliResult<Vec<NodeId>> {
    match root {
        None => {
            let root = doc
                .root()
                .ok_or(ApplicationError::from(DomainError::EmptyDocument))?;
            Ok(vec![root])
        }
        Some(name) => {
            let found = doc.find_by_attribute(&opts.key_attribute, name);
            if found.is_empty() {
                return Err(ApplicationError::UnknownRoot {
                    key: name.to_string(),
                }
                .into());
            }
            Ok(found)
        }
    }
}

fn finish(doc: &Document, path: &Path, write: bool, pretty: bool) -> CliResult<()> {
    if write {
        save_document(doc, path, pretty)?;
        output::action("Updated", &path.display());
    } else {
        output::info(&document_to_json(doc, pretty)?);
    }
    Ok(())
}

#[instrument(skip(container, options))]
fn cmd_get(
    container: &ServiceContainer,
    document: &Path,
    key: Option<&str>,
    root: Option<&str>,
    options: &OptionArgs,
) -> CliResult<()> {
    let doc = load_document(document)?;
    let opts = options_for(container, options);
    let roots = select_roots(&doc, root, &opts)?;

    let result = match key {
        Some(key) => get_one(&doc, &roots, key, &opts),
        None => Value::Object(get_all(&doc, &roots, &opts)),
    };
    output::info(&to_json(&result, container.settings.pretty)?);
    Ok(())
}

#[instrument(skip(container, options))]
fn cmd_set(
    container: &ServiceContainer,
    document: &Path,
    values: &Path,
    key: Option<&str>,
    root: Option<&str>,
    write: bool,
    options: &OptionArgs,
) -> CliResult<()> {
    let mut doc = load_document(document)?;
    let values = load_values(values)?;
    let opts = options_for(container, options);
    let roots = select_roots(&doc, root, &opts)?;

    match key {
        Some(key) => set_one(&mut doc, &roots, key, &values, &opts),
        None => {
            if !values.is_object() && as_rows(&values).is_none() {
                return Err(CliError::InvalidArgs(
                    "values must be a mapping or an array of mappings (or use --key)".to_string(),
                ));
            }
            set_values(&mut doc, &roots, &values, &opts);
        }
    }
    debug!("cmd_set: document has {} nodes", doc.len());
    finish(&doc, document, write, container.settings.pretty)
}

#[instrument(skip(container, options))]
fn cmd_copy(
    container: &ServiceContainer,
    source: &Path,
    target: &Path,
    write: bool,
    options: &OptionArgs,
) -> CliResult<()> {
    let source_doc = load_document(source)?;
    let mut target_doc = load_document(target)?;
    let opts = options_for(container, options);
    let source_roots = select_roots(&source_doc, None, &opts)?;
    let target_roots = select_roots(&target_doc, None, &opts)?;

    copy_between(&source_doc, &source_roots, &mut target_doc, &target_roots, &opts);
    finish(&target_doc, target, write, container.settings.pretty)
}

#[instrument]
fn cmd_tree(document: &Path) -> CliResult<()> {
    let doc = load_document(document)?;
    output::info(&doc.render_tree());
    Ok(())
}

fn config_command(local: Option<&Path>, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(local)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => match global_config_path() {
            Some(path) => output::info(&path.display()),
            None => output::warning("no config directory available on this platform"),
        },
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

fn completion(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}
