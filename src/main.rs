use clap::Parser;
use prefixagg::error::AppError;
use prefixagg::prefix::{AddressFamily, Prefix};
use prefixagg::trie::{AggregationTrie, Announcements};
use prefixagg::utils::load_prefixes;
use serde_json::json;
use std::fs;
use std::process::exit;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Address family of every prefix in the lists
    #[clap(
        short,
        long,
        value_enum,
        default_value = "ipv4",
        env = "PREFIXAGG_FAMILY"
    )]
    family: AddressFamily,

    /// File with the routes to add
    #[clap(short, long, value_name = "ADD_PATH", env = "PREFIXAGG_ADD_PATH")]
    add: Option<String>,

    /// File with the routes to withdraw
    #[clap(short, long, value_name = "REMOVE_PATH", env = "PREFIXAGG_REMOVE_PATH")]
    remove: Option<String>,

    /// Entry delimiter of the route files; newline if not set
    #[clap(long, value_name = "DELIMITER", env = "PREFIXAGG_DELIMITER")]
    delimiter: Option<String>,

    /// Writes a Graphviz description of the trie to this file
    #[clap(long, value_name = "DOT_PATH", env = "PREFIXAGG_DOT_PATH")]
    dot: Option<String>,

    /// Prints the result as JSON.
    #[arg(short = 'j', long = "json", action = clap::ArgAction::SetTrue)]
    json: bool,
}

fn render_json(trie: &AggregationTrie, announcements: &Announcements) -> Result<String, AppError> {
    let to_strings = |prefixes: &[Prefix]| -> Vec<String> {
        prefixes.iter().map(ToString::to_string).collect()
    };
    let output = json!({
        "exported": to_strings(&announcements.exported),
        "withdrawn": to_strings(&announcements.withdrawn),
        "aggregates": to_strings(&trie.collect_aggregates()),
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let delimiter = cli.delimiter.as_deref();
    let to_add = load_prefixes(cli.add.as_ref(), delimiter)?;
    let to_remove = load_prefixes(cli.remove.as_ref(), delimiter)?;
    info!(
        "loaded {} routes to add and {} routes to remove",
        to_add.len(),
        to_remove.len()
    );

    let mut trie = AggregationTrie::new(cli.family);
    let announcements = trie.apply(&to_add, &to_remove)?;

    if cli.json {
        println!("{}", render_json(&trie, &announcements)?);
    } else {
        for prefix in &announcements.exported {
            println!("+ {prefix}");
        }
        for prefix in &announcements.withdrawn {
            println!("- {prefix}");
        }
    }

    if let Some(path) = cli.dot.as_ref() {
        fs::write(path, trie.to_dot_graph())?;
        info!("trie graph written to: {}", path);
    }

    Ok(())
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("PREFIXAGG_LOG_LEVEL")
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if cli.add.is_none() && cli.remove.is_none() {
        error!("no route list provided");
        exit(2);
    }

    match run(&cli) {
        Ok(_) => info!("finished"),
        Err(e) => {
            error!("{}", e);
            exit(1);
        }
    }
}
