//! Order, checkout and address commands.
#![allow(clippy::print_stdout)]

use bazaar_core::{Address, AddressId, NewAddress, Order, ShippingAddress};
use bazaar_storefront::Storefront;
use clap::{Args, Subcommand};

use super::{CommandResult, require_session};

/// Where to ship. Either a saved address or explicit fields.
#[derive(Args)]
pub struct ShippingArgs {
    /// Saved address ID to ship to
    #[arg(long, conflicts_with_all = ["details", "phone", "city"])]
    address: Option<String>,

    #[arg(long, required_unless_present = "address")]
    details: Option<String>,

    #[arg(long, required_unless_present = "address")]
    phone: Option<String>,

    #[arg(long, required_unless_present = "address")]
    city: Option<String>,
}

#[derive(Subcommand)]
pub enum CheckoutAction {
    /// Pay cash on delivery
    Cash {
        #[command(flatten)]
        shipping: ShippingArgs,
    },
    /// Pay by card through a hosted checkout page
    Online {
        #[command(flatten)]
        shipping: ShippingArgs,

        /// Where the checkout page returns to after payment
        #[arg(long, default_value = "http://localhost:3000")]
        return_url: String,
    },
}

#[derive(Subcommand)]
pub enum AddressAction {
    /// List saved addresses
    List,
    /// Save an address
    Add {
        /// Label (e.g., "Home")
        #[arg(long)]
        name: String,

        #[arg(long)]
        details: String,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        city: String,
    },
    /// Delete a saved address
    Remove { address_id: String },
}

pub async fn history(storefront: &Storefront) -> CommandResult {
    require_session(storefront)?;
    let orders = storefront.orders().history().await?;
    if orders.is_empty() {
        println!("No orders yet.");
    }
    for order in &orders {
        print_order(order);
    }
    Ok(())
}

pub async fn checkout(storefront: &Storefront, action: CheckoutAction) -> CommandResult {
    require_session(storefront)?;
    let orders = storefront.orders();

    match action {
        CheckoutAction::Cash { shipping } => {
            let shipping = resolve_shipping(storefront, shipping).await?;
            let order = orders.checkout_cash(&shipping).await?;
            println!("Order placed.");
            print_order(&order);
        }
        CheckoutAction::Online {
            shipping,
            return_url,
        } => {
            let shipping = resolve_shipping(storefront, shipping).await?;
            let session = orders.checkout_online(&shipping, &return_url).await?;
            println!("Complete payment at: {}", session.url);
        }
    }
    Ok(())
}

pub async fn addresses(storefront: &Storefront, action: AddressAction) -> CommandResult {
    require_session(storefront)?;
    let orders = storefront.orders();

    let book = match action {
        AddressAction::List => orders.addresses().await?,
        AddressAction::Add {
            name,
            details,
            phone,
            city,
        } => {
            orders
                .add_address(&NewAddress {
                    name,
                    details,
                    phone,
                    city,
                })
                .await?
        }
        AddressAction::Remove { address_id } => {
            orders.remove_address(&AddressId::new(address_id)).await?
        }
    };

    if book.is_empty() {
        println!("No saved addresses.");
    }
    for address in &book {
        print_address(address);
    }
    Ok(())
}

async fn resolve_shipping(
    storefront: &Storefront,
    args: ShippingArgs,
) -> CommandResult<ShippingAddress> {
    let Some(address_id) = args.address else {
        return Ok(ShippingAddress {
            details: args.details.unwrap_or_default(),
            phone: args.phone.unwrap_or_default(),
            city: args.city.unwrap_or_default(),
        });
    };

    let book = storefront.orders().addresses().await?;
    book.iter()
        .find(|a| a.id.as_str() == address_id)
        .map(ShippingAddress::from)
        .ok_or_else(|| {
            bazaar_storefront::api::ApiError::NotFound(format!("No saved address {address_id}"))
                .into()
        })
}

fn print_order(order: &Order) {
    let number = order
        .number
        .map_or_else(|| order.id.to_string(), |n| format!("#{n}"));
    let placed = order
        .created_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    println!(
        "{number}  {placed}  {}  {} ({})",
        order.total_order_price,
        order.state(),
        order.payment_method_type
    );
    for item in &order.cart_items {
        let label = item
            .product
            .product()
            .map_or_else(|| item.product.id().to_string(), |p| p.title.clone());
        println!("  {:>3} x {label}  @ {}", item.count, item.price);
    }
}

fn print_address(address: &Address) {
    println!(
        "{}  {}: {}, {} ({})",
        address.id, address.name, address.details, address.city, address.phone
    );
}
