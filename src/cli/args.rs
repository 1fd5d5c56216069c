//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};
use serde_json::Value;

use crate::application::{OptionOverrides, UncheckedPolicy};

/// Extract and inject values between named node trees and JSON mappings
#[derive(Parser, Debug)]
#[command(name = "treevalues")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Local config file, layered over the global one
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the values of a document as JSON
    Get {
        /// Document (JSON node tree)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
        /// Only this key
        #[arg(short, long)]
        key: Option<String>,
        /// Use the nodes named ROOT as roots instead of the document root
        #[arg(long)]
        root: Option<String>,
        #[command(flatten)]
        options: OptionArgs,
    },

    /// Apply a JSON mapping (or array of mappings) to a document
    Set {
        /// Document (JSON node tree)
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
        /// Values file (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        values: PathBuf,
        /// Set only this key, the values file holding its value
        #[arg(short, long)]
        key: Option<String>,
        /// Use the nodes named ROOT as roots instead of the document root
        #[arg(long)]
        root: Option<String>,
        /// Write the result back instead of printing it
        #[arg(short, long)]
        write: bool,
        #[command(flatten)]
        options: OptionArgs,
    },

    /// Copy all values from one document into another
    Copy {
        #[arg(value_hint = ValueHint::FilePath)]
        source: PathBuf,
        #[arg(value_hint = ValueHint::FilePath)]
        target: PathBuf,
        /// Write the target back instead of printing it
        #[arg(short, long)]
        write: bool,
        #[command(flatten)]
        options: OptionArgs,
    },

    /// Show the node tree of a document
    Tree {
        #[arg(value_hint = ValueHint::FilePath)]
        document: PathBuf,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective settings as TOML
    Show,
    /// Print the global config file location
    Path,
    /// Print a commented config template
    Template,
}

/// Per-call option flags; unset flags fall back to the settings.
#[derive(Args, Debug, Clone, Default)]
pub struct OptionArgs {
    /// Attribute holding node keys
    #[arg(long)]
    pub key_attribute: Option<String>,
    /// Drop flat copies of nested keys
    #[arg(long)]
    pub only_nest: bool,
    /// Never nest; flatten nested values
    #[arg(long, conflicts_with = "only_nest")]
    pub only_flat: bool,
    /// Store set values in node data
    #[arg(long)]
    pub mirror_to_data: bool,
    /// Store set values as root attributes
    #[arg(long)]
    pub mirror_to_attribute: bool,
    /// Never clone nodes for surplus array entries
    #[arg(long)]
    pub no_clone: bool,
    /// Read and match choice options by value instead of text
    #[arg(long)]
    pub use_selection_value: bool,
    /// Add per-key match counts to the output
    #[arg(long)]
    pub include_match_counts: bool,
    /// Log every field that is set
    #[arg(long)]
    pub emit_set_events: bool,
    /// Value of unchecked checkboxes: skip, always, or a JSON sentinel
    #[arg(long)]
    pub unchecked_value: Option<String>,
    /// Maximum nesting depth
    #[arg(long)]
    pub max_depth: Option<usize>,
}

impl OptionArgs {
    pub fn to_overrides(&self) -> OptionOverrides {
        let flag = |set: bool| set.then_some(true);
        OptionOverrides {
            key_attribute: self.key_attribute.clone(),
            only_nest: flag(self.only_nest),
            only_flat: flag(self.only_flat),
            mirror_to_data: flag(self.mirror_to_data),
            mirror_to_attribute: flag(self.mirror_to_attribute),
            emit_set_events: flag(self.emit_set_events),
            emit_set_all_event: flag(self.emit_set_events),
            no_clone: flag(self.no_clone),
            unchecked_value: self.unchecked_value.as_deref().map(parse_unchecked_arg),
            use_selection_value: flag(self.use_selection_value),
            include_match_counts: flag(self.include_match_counts),
            max_depth: self.max_depth,
        }
    }
}

/// `skip`, `always`, or a JSON literal (plain words become strings).
fn parse_unchecked_arg(raw: &str) -> UncheckedPolicy {
    match raw {
        "always" => UncheckedPolicy::Always,
        "skip" => UncheckedPolicy::Skip,
        other => UncheckedPolicy::from_value(
            serde_json::from_str(other).unwrap_or_else(|_| Value::String(other.to_string())),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_flags_when_converting_then_only_set_flags_override() {
        let cli = Cli::parse_from([
            "treevalues",
            "get",
            "doc.json",
            "--only-nest",
            "--unchecked-value",
            "0",
        ]);
        let Some(Commands::Get { options, .. }) = cli.command else {
            panic!("expected get");
        };

        let overrides = options.to_overrides();

        assert_eq!(overrides.only_nest, Some(true));
        assert_eq!(overrides.only_flat, None);
        assert_eq!(overrides.unchecked_value, Some(UncheckedPolicy::Sentinel(json!(0))));
    }

    #[test]
    fn given_unchecked_words_when_parsing_then_maps_policies() {
        assert_eq!(parse_unchecked_arg("always"), UncheckedPolicy::Always);
        assert_eq!(parse_unchecked_arg("skip"), UncheckedPolicy::Skip);
        assert_eq!(
            parse_unchecked_arg("false"),
            UncheckedPolicy::Sentinel(json!(false))
        );
        assert_eq!(
            parse_unchecked_arg("off"),
            UncheckedPolicy::Sentinel(json!("off"))
        );
    }
}
