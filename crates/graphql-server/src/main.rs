use clap::crate_version;
use tokio::runtime;

mod args;
mod config;
mod schema;
mod server;

const THREAD_NAME: &str = "graphql-server";

fn main() -> anyhow::Result<()> {
    let args = self::args::parse();
    let config = args.config()?;

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(THREAD_NAME)
        .build()?;

    runtime.block_on(async move {
        args.init_logging();

        let crate_version = crate_version!();
        tracing::info!("GraphQL server {crate_version}");

        server::serve(args.listen_address(&config), config).await?;

        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}
