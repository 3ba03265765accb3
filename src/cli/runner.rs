//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands};
use crate::config::ClientConfig;
use crate::decode::{EntityDecoder, Record, RecordDecoder};
use crate::error::{Error, Result};
use crate::fetcher::ListFetcher;
use crate::http::{HttpClient, RestEntityLookup, RestListTransport};
use crate::transport::EntityLookup;
use crate::types::{FetchOptions, JsonValue};
use crate::view::ListView;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

type Decoder = Arc<dyn EntityDecoder<(), JsonValue, Record>>;

/// Options of a `list` invocation
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    /// Collection path template
    pub path: String,
    /// Options sent with the first request
    pub options: FetchOptions,
    /// Follow continuations until the listing is exhausted
    pub all: bool,
    /// Keys printed first
    pub pins: Vec<String>,
}

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let config = self.load_config()?;

        match &self.cli.command {
            Commands::List {
                path,
                filter,
                select,
                top,
                max_items,
                all,
                pins,
            } => {
                let args = ListArgs {
                    path: path.clone(),
                    options: list_options(
                        filter.as_deref(),
                        select.as_deref(),
                        *top,
                        *max_items,
                    ),
                    all: *all,
                    pins: pins.clone(),
                };
                let records = list(&config, self.cli.token.as_deref(), &args).await?;
                write_lines(&mut std::io::stdout().lock(), &records)
            }
            Commands::Get { path, key } => {
                let record = get(&config, self.cli.token.as_deref(), path, key).await?;
                write_lines(&mut std::io::stdout().lock(), std::slice::from_ref(&record))
            }
        }
    }

    fn load_config(&self) -> Result<ClientConfig> {
        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("Config file not specified (use -c flag)"))?;
        ClientConfig::from_file(path)
    }
}

/// Build fetch options from the command line flags
pub fn list_options(
    filter: Option<&str>,
    select: Option<&str>,
    top: Option<u32>,
    max_items: Option<usize>,
) -> FetchOptions {
    let mut options = FetchOptions::new();
    if let Some(filter) = filter {
        options = options.with_filter(filter);
    }
    if let Some(select) = select {
        options = options.with_select(
            select
                .split(',')
                .map(str::trim)
                .filter(|field| !field.is_empty()),
        );
    }
    if let Some(top) = top {
        options = options.with_max_results(top);
    }
    if let Some(max_items) = max_items {
        options = options.with_max_items(max_items);
    }
    options
}

/// List a collection through a `ListView`, pinned keys first
pub async fn list(
    config: &ClientConfig,
    token: Option<&str>,
    args: &ListArgs,
) -> Result<Vec<Record>> {
    let client = Arc::new(config.build_client(token)?);
    let decoder: Decoder = Arc::new(RecordDecoder::new(&config.listing.key_field));

    let mut transport = RestListTransport::<()>::new(client.clone(), &args.path)
        .with_listing(config.listing.clone())
        .with_vars(config.vars());
    if let Some(version) = &config.api_version {
        transport = transport.with_api_version(version);
    }

    let fetcher = ListFetcher::new(Arc::new(transport), decoder.clone(), ())
        .with_options(args.options.clone());
    let view = ListView::with_lookup(fetcher, item_lookup(config, client, &args.path, decoder));
    view.set_fixed_keys(args.pins.iter().cloned()).await;

    let outcome = if args.all {
        view.fetch_all().await.map(|_| ())
    } else {
        view.fetch_next().await.map(|_| ())
    };
    let items = view.items();
    view.dispose();
    outcome?;

    info!(path = %args.path, records = items.len(), "Listed collection");
    Ok(items.as_ref().clone())
}

/// Fetch a single entity by key
pub async fn get(
    config: &ClientConfig,
    token: Option<&str>,
    path: &str,
    key: &str,
) -> Result<Record> {
    let client = Arc::new(config.build_client(token)?);
    let decoder: Decoder = Arc::new(RecordDecoder::new(&config.listing.key_field));
    let lookup = item_lookup(config, client, path, decoder);

    debug!(path, key, "Looking up entity");
    lookup.get(key).await
}

fn item_lookup(
    config: &ClientConfig,
    client: Arc<HttpClient>,
    path: &str,
    decoder: Decoder,
) -> Arc<dyn EntityLookup<Record>> {
    let item_path = format!("{}/{{{{ key }}}}", path.trim_end_matches('/'));
    let mut lookup = RestEntityLookup::new(client, item_path, decoder).with_vars(config.vars());
    if let Some(version) = &config.api_version {
        lookup = lookup.with_api_version(version);
    }
    Arc::new(lookup)
}

fn write_lines(out: &mut impl Write, records: &[Record]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *out, record)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
