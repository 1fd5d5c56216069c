//! Test support: one-time tracing setup shared by unit and integration tests

use std::env;
use std::sync::Once;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{Document, DocumentBuilder, NodeId, NodeSpec};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "treevalues=trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Third-party crates that log config parsing internals
    let noisy_modules = ["config::", "toml::"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_target(true)
            .with_thread_names(false)
            .with_test_writer()
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Build a document from `spec` and return it with its root id.
///
/// Panics on invalid specs; test-only helper.
pub fn build(spec: NodeSpec) -> (Document, NodeId) {
    let doc = DocumentBuilder::new()
        .build(&spec)
        .expect("test document should build");
    let root = doc.root().expect("built document has a root");
    (doc, root)
}

/// First node whose key attribute `name` equals `value`.
///
/// Panics when there is none; test-only helper.
pub fn named(doc: &Document, value: &str) -> NodeId {
    doc.find_by_attribute("name", value)
        .first()
        .copied()
        .unwrap_or_else(|| panic!("no node named {value}"))
}
