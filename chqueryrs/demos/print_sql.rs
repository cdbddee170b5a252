use std::{env, fs, path::PathBuf};

use chquery::{prepare_query, ChQueryConfig};
use tracing_subscriber::EnvFilter;

fn usage() {
    eprintln!("Usage: print_sql <query_json> [datasource]");
    eprintln!("Example: RUST_LOG=chquery=debug cargo run --example print_sql -- panel_query.json otel");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }

    let query_path = PathBuf::from(args.remove(0));
    let datasource = args.pop().unwrap_or_default();

    let config = ChQueryConfig::load_default().for_datasource(&datasource);
    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(query_path)?)?;

    let (document, sql) = prepare_query(&doc, &config)?;
    eprintln!("{}", serde_json::to_string_pretty(&document)?);
    println!("{sql}");
    Ok(())
}
