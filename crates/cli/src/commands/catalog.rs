//! Catalog commands.
#![allow(clippy::print_stdout)]

use bazaar_core::{BrandId, CategoryId, Price, Product, ProductId};
use bazaar_storefront::Storefront;
use bazaar_storefront::api::{ProductPage, ProductQuery, ProductSort};
use bazaar_storefront::services::ProductFilter;
use clap::Subcommand;
use rust_decimal::Decimal;

use super::CommandResult;

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List products
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        brand: Option<String>,

        /// price-asc, price-desc, rating, best-selling, newest or title
        #[arg(long)]
        sort: Option<ProductSort>,

        #[arg(long)]
        min_price: Option<Decimal>,

        #[arg(long)]
        max_price: Option<Decimal>,

        /// Hide products rated below this (applied locally)
        #[arg(long)]
        min_rating: Option<f64>,

        /// Hide sold-out products (applied locally)
        #[arg(long)]
        in_stock: bool,
    },
    /// Show one product
    Get { product_id: String },
    /// Search products by keyword
    Search { keyword: String },
    /// Show recently viewed products
    Recent,
}

pub async fn products(storefront: &Storefront, action: ProductsAction) -> CommandResult {
    let catalog = storefront.catalog();
    let prefs = storefront.preferences();

    match action {
        ProductsAction::List {
            page,
            limit,
            category,
            brand,
            sort,
            min_price,
            max_price,
            min_rating,
            in_stock,
        } => {
            let query = ProductQuery {
                page,
                limit,
                keyword: None,
                category: category.map(CategoryId::new),
                brand: brand.map(BrandId::new),
                sort,
                min_price: min_price.map(Price::new),
                max_price: max_price.map(Price::new),
            };
            let mut result = catalog.list_products(&query).await?;

            let filter = ProductFilter {
                min_rating,
                in_stock_only: in_stock,
                ..ProductFilter::default()
            };
            result.products = filter.apply(&result.products);
            print_page(&result);
        }
        ProductsAction::Get { product_id } => {
            let product = catalog.get_product(&ProductId::new(product_id)).await?;
            prefs.add_recently_viewed(&product);
            print_product(&product);
        }
        ProductsAction::Search { keyword } => {
            prefs.add_recent_search(&keyword);
            match catalog.search(&keyword).await? {
                Some(result) => print_page(&result),
                None => println!("Nothing to search for."),
            }
        }
        ProductsAction::Recent => {
            let viewed = prefs.recently_viewed();
            if viewed.is_empty() {
                println!("No recently viewed products.");
            }
            for product in &viewed {
                print_summary(product);
            }
        }
    }
    Ok(())
}

pub async fn categories(storefront: &Storefront) -> CommandResult {
    for category in storefront.catalog().categories().await? {
        println!("{}  {}", category.id, category.name);
    }
    Ok(())
}

pub async fn brands(storefront: &Storefront) -> CommandResult {
    for brand in storefront.catalog().brands().await? {
        println!("{}  {}", brand.id, brand.name);
    }
    Ok(())
}

fn print_page(page: &ProductPage) {
    for product in &page.products {
        print_summary(product);
    }
    println!(
        "Page {} of {} ({} results)",
        page.page, page.total_pages, page.total_results
    );
}

fn print_summary(product: &Product) {
    let price = if product.is_discounted() {
        format!("{} (was {})", product.effective_price(), product.price)
    } else {
        product.price.to_string()
    };
    println!(
        "{}  {}  {price}  {:.1}*",
        product.id, product.title, product.ratings_average
    );
}

fn print_product(product: &Product) {
    print_summary(product);
    if let Some(category) = &product.category {
        println!("Category: {}", category.name);
    }
    if let Some(brand) = &product.brand {
        println!("Brand: {}", brand.name);
    }
    if product.quantity == 0 {
        println!("Sold out");
    } else {
        println!("In stock: {}", product.quantity);
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
}
