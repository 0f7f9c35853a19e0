//! Bazaar CLI - Command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (the session token is kept in the local store)
//! bazaar login -e mona@example.com -p Secret123
//!
//! # Browse the catalog
//! bazaar products list --sort price-asc --page 2
//! bazaar products search shawl
//!
//! # Work with the cart
//! bazaar cart add 6428ebc6dc1175abc65ca0b9
//! bazaar cart update 6428ebc6dc1175abc65ca0b9 3
//! bazaar checkout cash --details "12 Nile St" --phone 01012345678 --city Cairo
//! ```
//!
//! # Commands
//!
//! - `login`, `register`, `social-login`, `logout`, `whoami` - Session
//! - `password` - Forgot, verify, reset and change password
//! - `cart`, `wishlist` - Synchronized cart and wishlist
//! - `products`, `categories`, `brands` - Catalog reads
//! - `orders`, `checkout`, `addresses` - Order history and checkout
//! - `prefs` - Theme, accent color and history kept in the local store

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use bazaar_storefront::storage::FileBackend;
use bazaar_storefront::{Storefront, StorefrontConfig};
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{
    AddressAction, CartAction, CheckoutAction, PasswordAction, PrefsAction, ProductsAction,
    WishlistAction,
};

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar storefront from the command line")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: String,

        /// Display name (defaults to the email's local part)
        #[arg(short, long, default_value = "")]
        name: String,

        /// Mobile number (`01` followed by 0, 1, 2 or 5 and 8 digits)
        #[arg(long)]
        phone: String,
    },
    /// Sign in with an identity issued by an external provider
    SocialLogin {
        /// Provider-issued user ID
        #[arg(long)]
        uid: String,

        /// Email the provider verified
        #[arg(short, long)]
        email: Option<String>,

        #[arg(short, long)]
        name: Option<String>,
    },
    /// Forget the session token
    Logout,
    /// Show who the session token belongs to
    Whoami,
    /// Recover or change the account password
    Password {
        #[command(subcommand)]
        action: PasswordAction,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show and edit the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// List categories
    Categories,
    /// List brands
    Brands,
    /// Show order history
    Orders,
    /// Place an order for the current cart
    Checkout {
        #[command(subcommand)]
        action: CheckoutAction,
    },
    /// Manage saved addresses
    Addresses {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Local preferences and history
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_storefront=info,bazaar=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let backend = Arc::new(FileBackend::new(config.storage_path.clone()));
    let storefront = Storefront::new(config, backend)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&storefront, &email, password).await?;
        }
        Commands::Register {
            email,
            password,
            name,
            phone,
        } => commands::account::register(&storefront, &name, &email, password, &phone).await?,
        Commands::SocialLogin { uid, email, name } => {
            commands::account::social_login(&storefront, uid, email, name).await?;
        }
        Commands::Logout => commands::account::logout(&storefront)?,
        Commands::Whoami => commands::account::whoami(&storefront).await?,
        Commands::Password { action } => commands::account::password(&storefront, action).await?,
        Commands::Cart { action } => commands::cart::cart(&storefront, action).await?,
        Commands::Wishlist { action } => commands::cart::wishlist(&storefront, action).await?,
        Commands::Products { action } => commands::catalog::products(&storefront, action).await?,
        Commands::Categories => commands::catalog::categories(&storefront).await?,
        Commands::Brands => commands::catalog::brands(&storefront).await?,
        Commands::Orders => commands::orders::history(&storefront).await?,
        Commands::Checkout { action } => commands::orders::checkout(&storefront, action).await?,
        Commands::Addresses { action } => {
            commands::orders::addresses(&storefront, action).await?;
        }
        Commands::Prefs { action } => commands::prefs::prefs(&storefront, action)?,
    }
    Ok(())
}
