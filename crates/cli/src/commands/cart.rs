//! Cart and wishlist commands.
#![allow(clippy::print_stdout)]

use bazaar_core::{CartSnapshot, ProductId, WishlistSnapshot};
use bazaar_storefront::Storefront;
use clap::Subcommand;

use super::{CommandResult, require_session};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add { product_id: String },
    /// Set a line's quantity
    Update { product_id: String, count: u32 },
    /// Remove a line
    Remove { product_id: String },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Add a product
    Add { product_id: String },
    /// Remove a product
    Remove { product_id: String },
}

pub async fn cart(storefront: &Storefront, action: CartAction) -> CommandResult {
    require_session(storefront)?;
    let cart = storefront.cart();

    let snapshot = match action {
        CartAction::Show => cart.get_cart().await?,
        CartAction::Add { product_id } => cart.add_to_cart(&ProductId::new(product_id)).await?,
        CartAction::Update { product_id, count } => {
            cart.update_item(&ProductId::new(product_id), count).await?
        }
        CartAction::Remove { product_id } => {
            cart.remove_specific_item(&ProductId::new(product_id))
                .await?
        }
        CartAction::Clear => {
            cart.remove_all_items().await?;
            None
        }
    };

    match snapshot {
        Some(snapshot) if !snapshot.is_empty() => print_cart(&snapshot),
        _ => println!("Your cart is empty."),
    }
    Ok(())
}

pub async fn wishlist(storefront: &Storefront, action: WishlistAction) -> CommandResult {
    require_session(storefront)?;
    let wishlist = storefront.wishlist();

    // Edits are applied against the loaded snapshot
    wishlist.try_get_wishlist().await?;

    match action {
        WishlistAction::Show => {}
        WishlistAction::Add { product_id } => {
            let product = storefront
                .catalog()
                .get_product(&ProductId::new(product_id))
                .await?;
            let title = product.title.clone();
            if wishlist.add_to_wishlist(product).await? {
                println!("Added {title} to your wishlist.");
            } else {
                println!("{title} is already in your wishlist.");
            }
        }
        WishlistAction::Remove { product_id } => {
            if wishlist
                .remove_from_wishlist(&ProductId::new(product_id.clone()))
                .await?
            {
                println!("Removed {product_id} from your wishlist.");
            } else {
                println!("{product_id} is not in your wishlist.");
            }
        }
    }

    print_wishlist(&wishlist.snapshot());
    Ok(())
}

fn print_cart(cart: &CartSnapshot) {
    println!("Cart {} ({} items)", cart.id, cart.item_count);
    for line in &cart.items {
        let label = line
            .product
            .product()
            .map_or_else(|| line.product.id().to_string(), |p| p.title.clone());
        println!(
            "  {:>3} x {label}  @ {}  [{}]",
            line.quantity,
            line.unit_price,
            line.product.id()
        );
    }
    println!("Total: {}", cart.total_price);
}

fn print_wishlist(wishlist: &WishlistSnapshot) {
    if wishlist.is_empty() {
        println!("Your wishlist is empty.");
        return;
    }
    println!("Wishlist ({} items)", wishlist.len());
    for product in wishlist.items() {
        println!("  {}  {}  [{}]", product.title, product.effective_price(), product.id);
    }
}
