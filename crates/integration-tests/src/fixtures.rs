//! Seed catalog served by the fake backend.

use serde_json::{Value, json};

pub const CATEGORY_WOMEN: &str = "6439d58a0049ad0b52b9003f";
pub const CATEGORY_ELECTRONICS: &str = "6439d2d167d9aa4ca970649f";

pub const BRAND_DEFACTO: &str = "64089bbe24b25627a253158b";
pub const BRAND_SONY: &str = "64089fe824b25627a25315d1";

/// Discounted, in stock.
pub const PRODUCT_SHAWL: &str = "6428ebc6dc1175abc65ca0b9";
/// Highest rated and most expensive.
pub const PRODUCT_HEADPHONES: &str = "6428de2adc1175abc65ca05b";
/// Cheapest.
pub const PRODUCT_TSHIRT: &str = "6428e997dc1175abc65ca0a1";
/// Sold out.
pub const PRODUCT_WATCH: &str = "6428e479dc1175abc65ca07f";
pub const PRODUCT_SPEAKER: &str = "6428dfa0dc1175abc65ca067";

pub fn categories() -> Vec<Value> {
    vec![
        category(CATEGORY_WOMEN, "Women's Fashion", "women's-fashion"),
        category(CATEGORY_ELECTRONICS, "Electronics", "electronics"),
    ]
}

pub fn brands() -> Vec<Value> {
    vec![
        brand(BRAND_DEFACTO, "DeFacto", "defacto"),
        brand(BRAND_SONY, "Sony", "sony"),
    ]
}

pub fn products() -> Vec<Value> {
    let women = category(CATEGORY_WOMEN, "Women's Fashion", "women's-fashion");
    let electronics = category(CATEGORY_ELECTRONICS, "Electronics", "electronics");
    let defacto = brand(BRAND_DEFACTO, "DeFacto", "defacto");
    let sony = brand(BRAND_SONY, "Sony", "sony");

    let mut shawl = product(
        PRODUCT_SHAWL,
        "Woman Shawl",
        191,
        (&women, &defacto),
        (4.8, 18, 220, 2_300),
        "2023-04-02T02:49:42.692Z",
    );
    shawl["priceAfterDiscount"] = json!(149);

    vec![
        shawl,
        product(
            PRODUCT_HEADPHONES,
            "Sony WH-1000XM4 Wireless Headphones",
            9_999,
            (&electronics, &sony),
            (4.9, 11, 40, 5_480),
            "2023-04-02T01:49:46.316Z",
        ),
        product(
            PRODUCT_TSHIRT,
            "Woman Basic T-Shirt",
            99,
            (&women, &defacto),
            (4.2, 7, 500, 9_020),
            "2023-04-02T02:39:51.818Z",
        ),
        product(
            PRODUCT_WATCH,
            "Sony Smart Watch",
            4_299,
            (&electronics, &sony),
            (3.9, 4, 0, 130),
            "2023-04-02T02:14:49.131Z",
        ),
        product(
            PRODUCT_SPEAKER,
            "Sony Portable Bluetooth Speaker",
            2_199,
            (&electronics, &sony),
            (4.5, 9, 75, 760),
            "2023-04-02T01:56:16.412Z",
        ),
    ]
}

fn category(id: &str, name: &str, slug: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "slug": slug,
        "image": format!("https://ecommerce.routemisr.com/Route-Academy-categories/{slug}.png"),
        "createdAt": "2023-04-14T22:46:34.894Z",
        "updatedAt": "2023-04-14T22:46:34.894Z"
    })
}

fn brand(id: &str, name: &str, slug: &str) -> Value {
    json!({
        "_id": id,
        "name": name,
        "slug": slug,
        "image": format!("https://ecommerce.routemisr.com/Route-Academy-brands/{slug}.png"),
        "createdAt": "2023-03-08T15:43:56.051Z",
        "updatedAt": "2023-03-08T15:43:56.051Z"
    })
}

fn product(
    id: &str,
    title: &str,
    price: i64,
    (category, brand): (&Value, &Value),
    (ratings_average, ratings_quantity, quantity, sold): (f64, u32, u32, u64),
    created_at: &str,
) -> Value {
    let slug = title.to_lowercase().replace(' ', "-");
    json!({
        "_id": id,
        "id": id,
        "title": title,
        "slug": slug,
        "description": format!("{title}, straight from the seed catalog"),
        "price": price,
        "imageCover": format!("https://ecommerce.routemisr.com/Route-Academy-products/{id}-cover.jpeg"),
        "images": [],
        "category": category,
        "brand": brand,
        "subcategory": [],
        "ratingsAverage": ratings_average,
        "ratingsQuantity": ratings_quantity,
        "quantity": quantity,
        "sold": sold,
        "createdAt": created_at,
        "updatedAt": created_at
    })
}
