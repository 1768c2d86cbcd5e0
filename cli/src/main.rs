use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use meridian_adapters::{
    fetch_blocks, prefetch_token_state, BalanceResolver, BlockSource, BlockTranslator,
    SolanaAdapter, UiConfirmedBlock,
};
use meridian_core::config::{Settings, FETCH_CONCURRENCY_VAR, NETWORK_VAR, RPC_URL_VAR};
use meridian_core::models::{Block, Currency};
use meridian_core::network::native_currency;
use meridian_core::{Network, Taxonomy};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(about = "Translates Solana blocks into canonical ledger operations", long_about = None)]
struct Cli {
    #[arg(long, global = true, env = NETWORK_VAR)]
    network: Option<Network>,

    #[arg(long, global = true, env = RPC_URL_VAR)]
    rpc: Option<String>,

    #[arg(long, global = true, env = FETCH_CONCURRENCY_VAR)]
    concurrency: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints one translated block as JSON.
    Block {
        #[arg(short, long)]
        slot: u64,
    },
    /// Writes every operation in a slot range to CSV.
    Export {
        #[arg(long)]
        start: u64,

        /// Exclusive.
        #[arg(long)]
        end: u64,

        #[arg(short, long, default_value = "ops.csv")]
        output: PathBuf,
    },
    /// Replays a slot range and prints the account's balance change.
    Balance {
        #[arg(short, long)]
        account: String,

        #[arg(long)]
        start: u64,

        /// Exclusive.
        #[arg(long)]
        end: u64,

        /// Token mint; SOL when omitted.
        #[arg(long)]
        mint: Option<String>,
    },
}

#[derive(Serialize)]
struct OperationRow<'a> {
    block_index: u64,
    block_hash: &'a str,
    transaction: &'a str,
    operation_index: u64,
    #[serde(rename = "type")]
    op_type: &'a str,
    status: &'a str,
    account: Option<&'a str>,
    amount: Option<&'a str>,
    currency: Option<&'a str>,
    decimals: Option<u32>,
}

fn rows(block: &Block) -> impl Iterator<Item = OperationRow<'_>> {
    block.operations().map(move |(tx, op)| OperationRow {
        block_index: block.block_identifier.index,
        block_hash: &block.block_identifier.hash,
        transaction: &tx.transaction_identifier.hash,
        operation_index: op.operation_identifier.index,
        op_type: op.op_type.as_str(),
        status: op.status.as_str(),
        account: op.account.as_ref().map(|a| a.address.as_str()),
        amount: op.amount.as_ref().map(|a| a.value.as_str()),
        currency: op.amount.as_ref().map(|a| a.currency.symbol.as_str()),
        decimals: op.amount.as_ref().map(|a| a.currency.decimals),
    })
}

struct Runner {
    adapter: SolanaAdapter,
    network: Network,
    taxonomy: Taxonomy,
    concurrency: usize,
}

impl Runner {
    async fn translate(&self, raw: &UiConfirmedBlock) -> anyhow::Result<Block> {
        let accounts = prefetch_token_state(&self.adapter, raw, self.concurrency).await?;
        Ok(BlockTranslator::new(self.network, &self.taxonomy)
            .with_account_state(&accounts)
            .translate(raw))
    }

    async fn translate_range(&self, start: u64, end: u64) -> anyhow::Result<Vec<Block>> {
        if end <= start {
            bail!("empty slot range {start}..{end}");
        }
        let fetched = fetch_blocks(&self.adapter, start..end, self.concurrency).await?;
        let mut blocks = Vec::with_capacity(fetched.len());
        for (_, raw) in &fetched {
            blocks.push(self.translate(raw).await?);
        }
        info!(start, end, blocks = blocks.len(), "translated range");
        Ok(blocks)
    }

    async fn currency(&self, mint: Option<String>) -> anyhow::Result<Currency> {
        let Some(mint) = mint else {
            return Ok(native_currency());
        };
        let state = self
            .adapter
            .get_account_info(&mint)
            .await?
            .with_context(|| format!("{mint} is not a token mint"))?;
        let decimals = state
            .decimals
            .with_context(|| format!("{mint} is a token account, not a mint"))?;
        Ok(Currency {
            symbol: mint,
            decimals: u32::from(decimals),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    let network = cli.network.unwrap_or(settings.network);
    let rpc_url = match (cli.rpc, cli.network) {
        (Some(url), _) => url,
        (None, Some(network)) => network.default_rpc_url().to_string(),
        (None, None) => settings.rpc_url.clone(),
    };
    let runner = Runner {
        adapter: SolanaAdapter::new(&rpc_url),
        network,
        taxonomy: Taxonomy::solana(),
        concurrency: cli.concurrency.unwrap_or(settings.fetch_concurrency).max(1),
    };
    info!(%network, rpc = %rpc_url, "connected");

    match cli.command {
        Commands::Block { slot } => {
            let raw = runner.adapter.get_confirmed_block(slot).await?;
            let block = runner.translate(&raw).await?;
            println!("{}", serde_json::to_string_pretty(&block)?);
        }
        Commands::Export { start, end, output } => {
            let blocks = runner.translate_range(start, end).await?;

            let mut wtr = csv::Writer::from_path(&output)
                .with_context(|| format!("cannot create {}", output.display()))?;
            let mut written = 0usize;
            for block in &blocks {
                for row in rows(block) {
                    wtr.serialize(row)?;
                    written += 1;
                }
            }
            wtr.flush()?;
            info!(operations = written, output = %output.display(), "export written");
        }
        Commands::Balance {
            account,
            start,
            end,
            mint,
        } => {
            let currency = runner.currency(mint).await?;
            let blocks = runner.translate_range(start, end).await?;

            let mut resolver = BalanceResolver::new(account.clone(), currency);
            for block in &blocks {
                resolver.apply(block)?;
            }
            let balance = resolver.balance();
            println!(
                "{account} {} {} (through block {})",
                balance.value,
                balance.currency.symbol,
                resolver
                    .last_index()
                    .map_or_else(|| "none".to_string(), |index| index.to_string())
            );
        }
    }

    Ok(())
}
