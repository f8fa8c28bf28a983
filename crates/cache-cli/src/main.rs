#![cfg_attr(test, allow(unused_crate_dependencies))]

use args::Args;
use cache_client::{Client, ExecuteOptions};
use clap::Parser;
use futures_util::StreamExt;
use normalized_cache::{Cache, ScalarDescriptor, ScalarRegistry};
use runtime_local::NativeFetcher;

mod args;
mod telemetry;

const THREAD_NAME: &str = "normcache";

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.config()?;

    telemetry::init(&args, config.log_level);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(THREAD_NAME)
        .build()?;

    runtime.block_on(async move {
        let documents = args.documents()?;
        tracing::debug!("loaded {} documents", documents.len());

        let scalars = ScalarRegistry::builder()
            .scalar(ScalarDescriptor::timestamp_millis("DateTime"))
            .build();
        let cache = Cache::from_config(&config, scalars);
        let fetcher = NativeFetcher::runtime_fetcher(&config.fetch)?;

        let client = Client::builder(cache, documents, fetcher)
            .config(&config.cache)
            .timeout(config.fetch.timeout)
            .build();

        let mut options = ExecuteOptions::new().variables(args.variables()?);
        if let Some(policy) = args.policy {
            options = options.policy(policy);
        }
        if args.partial {
            options = options.partial(true);
        }

        let mut results = client.execute(&args.operation, options);

        while let Some(result) = results.next().await {
            let result = result?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Ok(())
    })
}
