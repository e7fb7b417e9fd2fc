//! The fixed catalog used when seed generation fails.

use souk_core::{Category, ImageRef, Price, Product, ProductId, Rating};

struct Entry {
    id: &'static str,
    name: &'static str,
    category: Category,
    price: u32,
    original_price: Option<u32>,
    stars: u8,
    description: &'static str,
}

const ENTRIES: [Entry; 8] = [
    Entry {
        id: "prod-1",
        name: "Classic T-Shirt",
        category: Category::Men,
        price: 250,
        original_price: None,
        stars: 4,
        description: "100% cotton tee with a clean, simple cut for everyday wear.",
    },
    Entry {
        id: "prod-2",
        name: "Summer Dress",
        category: Category::Women,
        price: 450,
        original_price: Some(550),
        stars: 5,
        description: "Light, comfortable floral dress made for hot summer days.",
    },
    Entry {
        id: "prod-3",
        name: "Kids' Jeans",
        category: Category::Kids,
        price: 200,
        original_price: None,
        stars: 4,
        description: "Comfortable, hard-wearing denim for kids in quality fabric.",
    },
    Entry {
        id: "prod-4",
        name: "Formal Shirt",
        category: Category::Men,
        price: 350,
        original_price: None,
        stars: 5,
        description: "Modern tailored shirt for the office and special occasions.",
    },
    Entry {
        id: "prod-5",
        name: "Elegant Blouse",
        category: Category::Women,
        price: 320,
        original_price: None,
        stars: 4,
        description: "Soft blouse with a distinctive design and an elegant drape.",
    },
    Entry {
        id: "prod-6",
        name: "Winter Hoodie",
        category: Category::Men,
        price: 500,
        original_price: Some(600),
        stars: 5,
        description: "Warm lined hoodie that keeps out the cold in modern style.",
    },
    Entry {
        id: "prod-7",
        name: "Kids' Outfit Set",
        category: Category::Kids,
        price: 280,
        original_price: None,
        stars: 5,
        description: "Playful, brightly coloured set that is comfortable for active days.",
    },
    Entry {
        id: "prod-8",
        name: "Short Skirt",
        category: Category::Women,
        price: 290,
        original_price: None,
        stars: 4,
        description: "Contemporary short skirt that pairs easily with any look.",
    },
];

/// The eight built-in products (`prod-1` through `prod-8`).
#[must_use]
pub fn fallback_catalog() -> Vec<Product> {
    ENTRIES
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let image = format!("https://picsum.photos/seed/prod{}/600/900", index + 1);
            Some(Product {
                id: ProductId::new(entry.id),
                name: entry.name.to_owned(),
                category: entry.category,
                price: Price::from_units(entry.price),
                original_price: entry.original_price.map(Price::from_units),
                rating: Rating::stars(entry.stars),
                image_url: ImageRef::parse(&image).ok()?,
                description: entry.description.to_owned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_catalog_is_complete_and_valid() {
        let products = fallback_catalog();
        assert_eq!(products.len(), 8);
        for (index, product) in products.iter().enumerate() {
            assert_eq!(product.id.as_str(), format!("prod-{}", index + 1));
            assert!(product.validate().is_ok());
        }
    }

    #[test]
    fn test_fallback_covers_every_category() {
        let products = fallback_catalog();
        for category in Category::ALL {
            assert!(products.iter().any(|p| p.category == category));
        }
    }

    #[test]
    fn test_fallback_discounts() {
        let discounted: Vec<_> = fallback_catalog()
            .into_iter()
            .filter(|p| p.discount_percent().is_some())
            .map(|p| p.id.to_string())
            .collect();
        assert_eq!(discounted, ["prod-2", "prod-6"]);
    }
}
