//! gait CLI: prompt → ontology-mapped GraphQL query → upstream API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use gait::config::{CacheBackendKind, GaitConfig};
use gait::intent::Intent;
use gait::nlu::{FixtureIntentSource, IntentSource};
use gait::pipeline::QueryPipeline;

#[derive(Parser)]
#[command(name = "gait", version, about = "Ontology-mapped GraphQL query bridge")]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/gait/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a prompt's query (cached by prompt text) and send it upstream.
    Run {
        /// Original prompt text; the cache key.
        #[arg(long)]
        prompt: String,

        /// Intent JSON file. Without it a canned intent for --api is used.
        #[arg(long)]
        intent: Option<PathBuf>,

        /// API tag for the canned intent.
        #[arg(long, default_value = "github")]
        api: String,

        /// Only print the compiled query; do not call upstream.
        #[arg(long)]
        dry_run: bool,
    },

    /// Compile an intent and print the query. No cache, no network.
    Compile {
        /// Intent JSON file. Without it a canned intent for --api is used.
        #[arg(long)]
        intent: Option<PathBuf>,

        /// API tag for the canned intent.
        #[arg(long, default_value = "github")]
        api: String,
    },

    /// Look up a concept label in an API's mapping store.
    Resolve {
        /// API tag.
        #[arg(long)]
        api: String,

        /// Concept label, e.g. "user" or "repositories".
        #[arg(long)]
        label: String,

        /// Resolve as a sub-entity instead of a target.
        #[arg(long)]
        sub_entity: bool,

        /// Constraint label joined with a sub-entity lookup.
        #[arg(long)]
        constraint: Option<String>,
    },

    /// Inspect or evict semantic cache records.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show the live record for a prompt.
    Get {
        #[arg(long)]
        prompt: String,
    },
    /// Delete the record for a prompt.
    Delete {
        #[arg(long)]
        prompt: String,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = GaitConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            prompt,
            intent,
            api,
            dry_run,
        } => {
            let pipeline = QueryPipeline::from_config(&config)?;
            let intent_raw = read_intent(intent, &prompt, &api)?;
            if dry_run {
                let prepared = pipeline.prepare(&prompt, &intent_raw)?;
                eprintln!("cache: {}", prepared.cache);
                print!("{}", prepared.compiled_query);
            } else {
                let outcome = pipeline.run(&prompt, &intent_raw)?;
                eprintln!("cache: {}", outcome.cache);
                eprintln!("query:\n{}", outcome.compiled_query);
                println!("{}", outcome.response);
            }
        }

        Commands::Compile { intent, api } => {
            let mut config = config;
            config.cache.backend = CacheBackendKind::Disabled;
            let pipeline = QueryPipeline::from_config(&config)?;
            let intent_raw = read_intent(intent, "", &api)?;
            let intent = Intent::from_json(&intent_raw)?;
            print!("{}", pipeline.compile(&intent)?);
        }

        Commands::Resolve {
            api,
            label,
            sub_entity,
            constraint,
        } => {
            let registry = config.registry()?;
            let resolver = gait::ontology::OntologyResolver::from_registry(&registry);
            if sub_entity || constraint.is_some() {
                let resolved = resolver.resolve_sub_entity(&label, constraint.as_deref(), &api)?;
                println!("field:             {}", resolved.field);
                println!("graphql type:      {}", resolved.graphql_type);
                println!("argument field:    {}", resolved.argument_field);
                println!("ordering field:    {}", resolved.ordering_field);
                println!("default direction: {}", resolved.default_direction);
            } else {
                let resolved = resolver.resolve_target(&label, &api)?;
                println!("field:               {}", resolved.field);
                println!("identifier argument: {}", resolved.identifier_argument);
            }
        }

        Commands::Cache { action } => {
            let pipeline = QueryPipeline::from_config(&config)?;
            let Some(cache) = pipeline.cache() else {
                miette::bail!("caching is disabled in the configuration");
            };
            match action {
                CacheAction::Get { prompt } => match cache.get(&prompt)? {
                    Some(record) => {
                        println!("key:        {}", record.key);
                        println!("created at: {}", record.created_at.to_rfc3339());
                        println!("intent:     {}", record.intent_raw);
                        println!("result:     {}", record.result.as_deref().unwrap_or("(none)"));
                        print!("{}", record.compiled_query);
                    }
                    None => println!("(no live record)"),
                },
                CacheAction::Delete { prompt } => {
                    cache.delete(&prompt)?;
                    println!("Deleted {}", gait::cache::prompt_key(&prompt));
                }
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Intent JSON from a file, or the canned fixture for `api`.
fn read_intent(path: Option<PathBuf>, prompt: &str, api: &str) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(&path).into_diagnostic(),
        None => Ok(FixtureIntentSource.intent_for(prompt, api)),
    }
}
