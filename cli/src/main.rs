//! ctxmem CLI
//!
//! Command-line access to the Context Memory API.

mod output;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use ctxmem::{
    ClientConfig, ContextMemory, EntryFilter, EntryOptions, NewNamespace, SearchOptions,
};
use serde_json::Value;
use tracing_subscriber::{fmt, EnvFilter};

/// Persistent memory for AI workflows
#[derive(Parser, Debug)]
#[command(name = "ctxmem")]
#[command(version)]
struct Args {
    /// API key (falls back to CTXMEM_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// API base URL (falls back to CTXMEM_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Request timeout in seconds (falls back to CTXMEM_TIMEOUT)
    #[arg(long, global = true)]
    timeout: Option<f64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage namespaces
    #[command(subcommand)]
    Ns(NsCommands),

    /// Get an entry's value
    Get { namespace: String, key: String },

    /// Store an entry (value is parsed as JSON, else stored as a string)
    Set {
        namespace: String,
        key: String,
        value: String,

        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,

        /// Time to live in seconds
        #[arg(long)]
        ttl: Option<u64>,

        /// Importance score (0-1)
        #[arg(long)]
        importance: Option<f64>,
    },

    /// Delete an entry
    #[command(alias = "rm")]
    Delete { namespace: String, key: String },

    /// List entries in a namespace
    #[command(alias = "ls")]
    List {
        namespace: String,

        /// Filter by tag
        #[arg(short, long)]
        tag: Option<String>,

        /// Limit results
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },

    /// Semantic search across entries
    Search {
        query: String,

        /// Limit to namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Limit results
        #[arg(short, long, default_value = "10")]
        limit: u32,

        /// Similarity threshold (0-1)
        #[arg(long, default_value = "0.7")]
        threshold: f64,

        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// Show account info and usage
    Whoami,
}

#[derive(Subcommand, Debug)]
enum NsCommands {
    /// List namespaces
    List,

    /// Create a namespace
    Create {
        slug: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Description
        #[arg(short, long)]
        desc: Option<String>,
    },

    /// Delete a namespace and all its entries
    Delete { slug: String },
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn connect(args: &Args) -> ctxmem::Result<ContextMemory> {
    let mut builder = ClientConfig::builder();
    if let Some(key) = &args.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(url) = &args.base_url {
        builder = builder.base_url(url.clone());
    }
    if let Some(secs) = args.timeout.filter(|s| s.is_finite() && *s > 0.0) {
        builder = builder.timeout(Duration::from_secs_f64(secs));
    }
    let config = builder.build()?;
    tracing::debug!(base_url = %config.base_url, "connecting");
    Ok(ContextMemory::new(config))
}

fn run(args: Args) -> ctxmem::Result<()> {
    let ctx = connect(&args)?;

    match args.command {
        Commands::Ns(NsCommands::List) => {
            let namespaces = ctx.list_namespaces()?;
            if namespaces.is_empty() {
                println!("No namespaces yet. Create one with: ctxmem ns create <slug>");
            } else {
                print!("{}", output::namespace_table(&namespaces));
            }
        }
        Commands::Ns(NsCommands::Create { slug, name, desc }) => {
            let mut new = NewNamespace::new(slug);
            if let Some(name) = name {
                new = new.name(name);
            }
            if let Some(desc) = desc {
                new = new.description(desc);
            }
            let ns = ctx.create_namespace(&new)?;
            println!("Namespace '{}' created", ns.slug);
        }
        Commands::Ns(NsCommands::Delete { slug }) => {
            ctx.delete_namespace(&slug)?;
            println!("Namespace '{slug}' deleted");
        }
        Commands::Get { namespace, key } => match ctx.get(&namespace, &key)? {
            Some(value) => println!("{}", output::pretty(&value)),
            None => println!("No entry '{key}' in '{namespace}'"),
        },
        Commands::Set {
            namespace,
            key,
            value,
            tags,
            ttl,
            importance,
        } => {
            let mut options = EntryOptions::new();
            if let Some(tags) = tags {
                options = options.tags(output::split_tags(&tags));
            }
            if let Some(ttl) = ttl {
                options = options.ttl_seconds(ttl);
            }
            if let Some(importance) = importance {
                options = options.importance(importance);
            }
            let id = ctx.set(&namespace, &key, parse_value(&value), options)?;
            println!("Entry '{key}' saved ({id})");
        }
        Commands::Delete { namespace, key } => {
            if ctx.delete(&namespace, &key)? {
                println!("Entry '{key}' deleted");
            } else {
                println!("No entry '{key}' in '{namespace}'");
            }
        }
        Commands::List {
            namespace,
            tag,
            limit,
        } => {
            let filter = EntryFilter {
                tag,
                limit: Some(limit),
            };
            let entries = ctx.list_entries(&namespace, &filter)?;
            if entries.is_empty() {
                println!("No entries");
            } else {
                print!("{}", output::entry_table(&entries));
            }
        }
        Commands::Search {
            query,
            namespace,
            limit,
            threshold,
            tags,
        } => {
            let mut options = SearchOptions::new().limit(limit).threshold(threshold);
            if let Some(ns) = namespace {
                options = options.namespace(ns);
            }
            if let Some(tags) = tags {
                options = options.tags(output::split_tags(&tags));
            }
            let result = ctx.search(&query, &options)?;
            if result.results.is_empty() {
                println!("No results found");
            } else {
                print!("{}", output::search_hits(&result.results));
            }
        }
        Commands::Whoami => {
            let account = ctx.account()?;
            println!("{}", output::pretty(&Value::Object(account)));
        }
    }

    ctx.close();
    Ok(())
}

/// JSON if it parses, otherwise the raw string.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
