use crate::infra::parse_item_arg;
use clap::Args;
use cost_ledger::config::{AppConfig, ClientConfig};
use cost_ledger::error::AppError;
use cost_ledger::items::{
    normalize, validate, DraftItem, DraftSession, ItemImport, ItemsClient, Stats, StoredItem,
};
use cost_ledger::telemetry;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub(crate) struct ItemSourceArgs {
    /// Item as NAME,PRICE,QUANTITY (repeatable)
    #[arg(long = "item", value_parser = parse_item_arg)]
    pub(crate) items: Vec<DraftItem>,
    /// CSV file with name,price,quantity columns
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct SubmitArgs {
    #[command(flatten)]
    pub(crate) source: ItemSourceArgs,
    /// Override the configured API base URL
    #[arg(long)]
    pub(crate) api_url: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    /// Maximum number of rows to fetch
    #[arg(long, default_value_t = 100)]
    pub(crate) limit: usize,
    /// Override the configured API base URL
    #[arg(long)]
    pub(crate) api_url: Option<String>,
}

pub(crate) fn run_preview(args: ItemSourceArgs) -> Result<(), AppError> {
    let session = DraftSession::with_rows(load_rows(args)?);
    render_rows(session.rows());
    render_stats("Preview (unsaved)", &session.preview());
    Ok(())
}

pub(crate) async fn run_submit(args: SubmitArgs) -> Result<(), AppError> {
    let SubmitArgs { source, api_url } = args;
    let client = connect(api_url)?;

    let mut session = DraftSession::with_rows(load_rows(source)?);
    render_rows(session.rows());
    render_stats("Preview (unsaved)", &session.preview());

    let outcome = session.submit(&client).await?;
    if let Some(notice) = session.last_notice() {
        println!("\n{}", notice.text);
    }
    println!("Server message: {}", outcome.message);
    render_stats("Last save batch", &outcome.batch);
    render_stats("Global (saved)", &outcome.global);
    Ok(())
}

pub(crate) async fn run_list(args: ListArgs) -> Result<(), AppError> {
    let client = connect(args.api_url)?;
    let rows = client.list_items(args.limit).await?;
    render_stored(client.base_url(), &rows);
    Ok(())
}

fn connect(api_url: Option<String>) -> Result<ItemsClient, AppError> {
    let mut config = AppConfig::load()?;
    if let Some(url) = api_url {
        config.client.api_url = ClientConfig::normalize_base_url(&url)?;
    }
    telemetry::init(&config.telemetry)?;
    Ok(ItemsClient::from_config(&config.client)?)
}

fn load_rows(args: ItemSourceArgs) -> Result<Vec<DraftItem>, AppError> {
    let ItemSourceArgs { items, csv } = args;
    let mut rows = match csv {
        Some(path) => ItemImport::from_path(path)?,
        None => Vec::new(),
    };
    rows.extend(items);
    Ok(rows)
}

fn render_rows(rows: &[DraftItem]) {
    println!("Draft items");
    if rows.is_empty() {
        println!("- none");
        return;
    }
    for (index, row) in rows.iter().enumerate() {
        let item = normalize(row);
        match validate(&item) {
            Ok(()) => println!(
                "- #{} {} | {:.2} x {} = {:.2}",
                index + 1,
                item.name,
                item.price,
                item.quantity,
                item.line_cost()
            ),
            Err(reason) => println!("- #{} skipped: {}", index + 1, reason),
        }
    }
}

fn render_stats(title: &str, stats: &Stats) {
    println!("\n{title}");
    println!("- Line items: {}", stats.line_item_count);
    println!("- Total quantity: {}", stats.total_quantity);
    println!("- Total cost: {:.2}", stats.total_cost);
    println!("- Avg unit price: {:.2}", stats.avg_unit_price);
    println!("- Avg line cost: {:.2}", stats.avg_line_cost);
}

fn render_stored(api_url: &str, rows: &[StoredItem]) {
    println!("Saved items ({api_url})");
    if rows.is_empty() {
        println!("- none");
        return;
    }
    for row in rows {
        println!(
            "- [{}] {} | {:.2} x {} | saved {}",
            row.id,
            row.name,
            row.price,
            row.quantity,
            row.created_at.format("%Y-%m-%d %H:%M")
        );
    }
}
