//! `gomarket`: inspect and edit the persisted cart from a terminal.
//!
//! Every invocation opens the cart store over a [`FileStore`], applies at most
//! one mutation, flushes it to disk and prints the resulting cart.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use store::{CartStore, Change, FileStore, LoadOutcome, NewProduct, Product, StoreConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gomarket", version, about = "Manage the GoMarket shopping cart")]
struct Cli {
    /// Config file (default: <config dir>/gomarket/gomarket.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the saved cart; overrides the config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print the cart as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the cart
    List,
    /// Add one unit of a product
    Add {
        #[arg(long)]
        id: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        image_url: String,
        #[arg(long, value_parser = finite_price)]
        price: f64,
    },
    /// Add one more unit of a product already in the cart
    Increment { id: String },
    /// Remove one unit; the line disappears at zero
    Decrement { id: String },
}

fn finite_price(s: &str) -> Result<f64, String> {
    let price: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if price.is_finite() {
        Ok(price)
    } else {
        Err("price must be a finite number".to_string())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = run(cli).await?;
    println!("{output}");
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match cli.config.clone().or_else(StoreConfig::default_path) {
        Some(path) => StoreConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = Some(dir.clone());
    }
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = load_config(&cli)?;
    let data_dir = config.data_dir();
    tracing::debug!(data_dir = %data_dir.display(), key = %config.storage.key, "opening cart");

    let store = CartStore::open(FileStore::new(data_dir), &config).await;
    if store.load_outcome() == LoadOutcome::Malformed {
        tracing::warn!("saved cart could not be read; continuing with an empty cart");
    }

    let cart = store.handle();
    let change = match cli.command {
        Command::List => None,
        Command::Add {
            id,
            title,
            image_url,
            price,
        } => Some(cart.add_to_cart(NewProduct::new(id, title, image_url, price))?),
        Command::Increment { id } => Some(cart.increment(&id)?),
        Command::Decrement { id } => Some(cart.decrement(&id)?),
    };
    if change == Some(Change::Unchanged) {
        tracing::warn!("no cart item with that id");
    }

    let products = cart.products()?;
    store.close().await;

    if cli.json {
        Ok(serde_json::to_string_pretty(&products)?)
    } else {
        Ok(render_table(&products))
    }
}

fn render_table(products: &[Product]) -> String {
    if products.is_empty() {
        return "Cart is empty".to_string();
    }
    let mut lines = Vec::with_capacity(products.len());
    for p in products {
        lines.push(format!("{:>4} x {:<16} {} @ {:.2}", p.quantity, p.id, p.title, p.price));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(data_dir: &std::path::Path, args: &[&str]) -> Cli {
        let config = data_dir.join(StoreConfig::filename());
        let mut argv = vec![
            "gomarket".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--data-dir".to_string(),
            data_dir.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_cart_persists_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let add = ["add", "--id", "a", "--title", "Shoe", "--image-url", "u", "--price", "10"];

        run(cli(dir.path(), &add)).await.unwrap();
        run(cli(dir.path(), &add)).await.unwrap();
        let out = run(cli(dir.path(), &["--json", "list"])).await.unwrap();

        let products: Vec<Product> = serde_json::from_str(&out).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].id, "a");
        assert_eq!(products[0].quantity, 2);

        run(cli(dir.path(), &["decrement", "a"])).await.unwrap();
        let out = run(cli(dir.path(), &["decrement", "a"])).await.unwrap();
        assert_eq!(out, "Cart is empty");
    }

    #[tokio::test]
    async fn test_unknown_id_is_harmless() {
        let dir = tempfile::tempdir().unwrap();

        let out = run(cli(dir.path(), &["increment", "ghost"])).await.unwrap();
        assert_eq!(out, "Cart is empty");
    }

    #[test]
    fn test_non_finite_price_is_refused() {
        for price in ["NaN", "inf", "-inf", "infinity"] {
            let args = ["gomarket", "add", "--id", "a", "--title", "Shoe", "--price", price];
            assert!(Cli::try_parse_from(args).is_err(), "accepted price {price}");
        }
        assert!(Cli::try_parse_from(["gomarket", "add", "--id", "a", "--title", "t", "--price", "9.5"]).is_ok());
    }

    #[test]
    fn test_render_table() {
        let products = vec![NewProduct::new("a", "Shoe", "u", 10.0).with_quantity(2)];
        let table = render_table(&products);
        assert!(table.contains("2 x a"));
        assert!(table.contains("Shoe @ 10.00"));
    }

    #[test]
    fn test_data_dir_flag_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(StoreConfig::filename()),
            "[storage]\ndata_dir = \"/somewhere/else\"\n",
        )
        .unwrap();

        let config = load_config(&cli(dir.path(), &["list"])).unwrap();
        assert_eq!(config.data_dir(), dir.path());
    }
}
