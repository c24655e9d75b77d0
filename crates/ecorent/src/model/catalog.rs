//! Rentable categories and priced products.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::contract::RentalModule;
use crate::pricing;

/// A group of products within one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Stable id, e.g. `AUTOS`.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning module.
    pub module: RentalModule,
}

/// A rentable product with its current unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Stable id.
    pub id: String,
    /// Display name, also what contracts store.
    pub name: String,
    /// Owning category id.
    pub category: String,
    /// Current unit price.
    pub price: f64,
    /// Owning module.
    pub module: RentalModule,
}

/// The set of rentable categories and products.
///
/// Products reference categories by id. Categories cannot be removed; the
/// only mutation is a price edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// All categories.
    pub categories: Vec<Category>,
    /// All products.
    pub products: Vec<Product>,
}

impl Default for Catalog {
    fn default() -> Self {
        use RentalModule::{Bike, Tour, Vehicle};

        let categories = [
            ("AUTOS", "Autos", Vehicle),
            ("SCOOTER", "Scooter - Motorbikes", Vehicle),
            ("BIKE_NORMAL", "Normal Bikes", Bike),
            ("BIKE_EB_CITY", "E-Bike City", Bike),
            ("BIKE_EMTB", "E-MTB", Bike),
            ("BIKE_EFAT", "E-FatBIKE", Bike),
            ("TOURS", "Excursions", Tour),
            ("PADDLE", "Paddle Surf", Tour),
            ("BOAT", "Boat Rental", Tour),
        ]
        .into_iter()
        .map(|(id, name, module)| Category {
            id: id.to_string(),
            name: name.to_string(),
            module,
        })
        .collect();

        let products = [
            ("1", "Citroen C3 / Peugeot 208", "AUTOS", 50.0, Vehicle),
            ("2", "NEW Toyota Aygo X BASIC", "AUTOS", 50.0, Vehicle),
            ("3", "Toyota Aygo BASIC", "AUTOS", 45.0, Vehicle),
            ("4", "TOYOTA AYGO OPEN", "AUTOS", 50.0, Vehicle),
            ("5", "Piaggio Liberty 125cc", "SCOOTER", 35.0, Vehicle),
            ("6", "PIAGGIO MEDLEY 125CC", "SCOOTER", 40.0, Vehicle),
            ("7", "City Bike", "BIKE_NORMAL", 6.0, Bike),
            ("8", "E-Bike City Bike", "BIKE_EB_CITY", 15.0, Bike),
            ("9", "E-CITY BIKE Nuevo Modelo", "BIKE_EB_CITY", 20.0, Bike),
            ("10", "E-Mountain Bike EMB", "BIKE_EMTB", 20.0, Bike),
            ("11", "Discovery Tour 2 HOURS", "TOURS", 65.0, Tour),
            ("12", "Tour Catamaran Palma", "TOURS", 35.0, Tour),
            ("13", "Paddle Surf SUP", "PADDLE", 12.0, Tour),
            ("14", "Boat Rental B450 Theia", "BOAT", 200.0, Tour),
        ]
        .into_iter()
        .map(|(id, name, category, price, module)| Product {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            price,
            module,
        })
        .collect();

        Self {
            categories,
            products,
        }
    }
}

impl Catalog {
    /// Categories owned by `module`, in catalog order.
    pub fn categories_for(&self, module: RentalModule) -> impl Iterator<Item = &Category> {
        self.categories.iter().filter(move |c| c.module == module)
    }

    /// Products in the category `category_id`, in catalog order.
    pub fn products_in<'a>(&'a self, category_id: &'a str) -> impl Iterator<Item = &'a Product> {
        self.products.iter().filter(move |p| p.category == category_id)
    }

    /// Look up a category by id.
    #[must_use]
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Look up a product by id.
    #[must_use]
    pub fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Look up a product by id or by case-insensitive name.
    #[must_use]
    pub fn find_product(&self, key: &str) -> Option<&Product> {
        let key = key.trim();
        self.product(key).or_else(|| {
            self.products
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(key))
        })
    }

    /// Price that picking `category_id` seeds the form with: its first product's.
    #[must_use]
    pub fn seed_price(&self, category_id: &str) -> Option<f64> {
        self.products_in(category_id).next().map(|p| p.price)
    }

    /// Overwrite a product's price from raw input.
    ///
    /// Invalid or empty input stores 0. Returns `false` if the product is unknown.
    pub fn set_price(&mut self, product_id: &str, raw_price: &str) -> bool {
        let Some(product) = self.products.iter_mut().find(|p| p.id == product_id) else {
            debug!("No product with id {}, price left untouched", product_id);
            return false;
        };
        let price = pricing::parse_amount(raw_price);
        debug!(
            "Product {} price {} -> {}",
            product.id, product.price, price
        );
        product.price = price;
        true
    }
}
