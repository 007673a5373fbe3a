//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;
use crate::domain::value_objects::{Money, ProductCode, Quantity, Rating};
use crate::EcommerceError;

pub const MAX_IMAGES: usize = 5;
/// Prices are stored to the cent.
pub const PRICE_DECIMALS: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Mobile Phone")] MobilePhone,
    #[serde(rename = "Mobile Accessories")] MobileAccessories,
    #[serde(rename = "Preowned Phones")] PreownedPhones,
    #[serde(rename = "Laptops")] Laptops,
    #[serde(rename = "Phone Covers")] PhoneCovers,
    #[serde(rename = "Chargers")] Chargers,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::MobilePhone, Category::MobileAccessories, Category::PreownedPhones,
        Category::Laptops, Category::PhoneCovers, Category::Chargers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MobilePhone => "Mobile Phone",
            Self::MobileAccessories => "Mobile Accessories",
            Self::PreownedPhones => "Preowned Phones",
            Self::Laptops => "Laptops",
            Self::PhoneCovers => "Phone Covers",
            Self::Chargers => "Chargers",
        }
    }

    /// Accepts the display name, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str().eq_ignore_ascii_case(value.trim()))
    }

    /// Detail keys a product of this category must carry.
    pub fn required_details(&self) -> &'static [&'static str] {
        match self {
            Self::MobilePhone => &["brand", "model", "storage", "ram", "color", "screenSize", "batteryCapacity", "processor", "camera", "operatingSystem"],
            Self::MobileAccessories => &["brand", "type", "compatibility", "color", "material"],
            Self::PreownedPhones => &["brand", "model", "condition", "storage", "ram", "color", "batteryHealth", "warranty"],
            Self::Laptops => &["brand", "model", "processor", "ram", "storage", "display", "graphics", "operatingSystem"],
            Self::PhoneCovers | Self::Chargers => &[],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review { pub user_id: Uuid, pub rating: Rating, pub comment: String, pub date: DateTime<Utc> }

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub code: ProductCode,
    pub name: String,
    pub category: Category,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub description: String,
    pub long_description: Option<String>,
    pub warranty_period: String,
    pub pay_later: bool,
    pub images: Vec<String>,
    pub stock: Quantity,
    pub details: Map<String, Value>,
    pub reviews: Vec<Review>,
    pub rating: f64,
    pub review_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Editable product fields, as submitted by an admin on create or update.
#[derive(Clone, Debug)]
pub struct ProductDraft {
    pub name: String,
    pub category: Category,
    pub price: Money,
    pub discount_price: Option<Money>,
    pub description: String,
    pub long_description: Option<String>,
    pub warranty_period: Option<String>,
    pub pay_later: bool,
    pub images: Vec<String>,
    pub stock: u32,
    pub details: Map<String, Value>,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), ProductError> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() { missing.push("name"); }
        if self.description.trim().is_empty() { missing.push("description"); }
        if !missing.is_empty() { return Err(ProductError::MissingFields(missing)); }
        if !self.price.is_positive() { return Err(ProductError::InvalidPrice); }
        if let Some(discount) = &self.discount_price {
            if !discount.is_positive() || discount.currency() != self.price.currency() { return Err(ProductError::InvalidPrice); }
        }
        let too_precise = |m: &Money| m.amount().normalize().scale() > PRICE_DECIMALS;
        if too_precise(&self.price) || self.discount_price.as_ref().is_some_and(too_precise) { return Err(ProductError::PricePrecision); }
        let images = self.images.iter().filter(|i| !i.trim().is_empty()).count();
        if images == 0 || images > MAX_IMAGES { return Err(ProductError::ImageCount(images)); }
        let missing: Vec<&'static str> = self.category.required_details().iter().copied()
            .filter(|key| !has_value(self.details.get(*key)))
            .collect();
        if !missing.is_empty() { return Err(ProductError::MissingDetails { category: self.category, fields: missing }); }
        Ok(())
    }
}

fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

impl Product {
    pub fn create(code: ProductCode, draft: ProductDraft) -> Result<Self, ProductError> {
        draft.validate()?;
        let now = Utc::now();
        let mut product = Self {
            id: Uuid::now_v7(), code, name: String::new(), category: draft.category, price: draft.price.clone(),
            discount_price: None, description: String::new(), long_description: None, warranty_period: String::new(),
            pay_later: false, images: vec![], stock: Quantity::default(), details: Map::new(), reviews: vec![],
            rating: 0.0, review_count: 0, created_at: now, updated_at: now,
        };
        product.apply(draft);
        Ok(product)
    }

    /// Replaces the editable fields. Returns the images the revision dropped.
    pub fn revise(&mut self, draft: ProductDraft) -> Result<Vec<String>, ProductError> {
        draft.validate()?;
        let dropped = self.images.iter().filter(|old| !draft.images.contains(old)).cloned().collect();
        self.apply(draft);
        self.touch();
        Ok(dropped)
    }

    fn apply(&mut self, draft: ProductDraft) {
        self.name = draft.name.trim().to_string();
        self.category = draft.category;
        self.price = draft.price;
        self.discount_price = draft.discount_price;
        self.description = draft.description;
        self.long_description = draft.long_description.filter(|d| !d.trim().is_empty());
        self.warranty_period = draft.warranty_period.filter(|w| !w.trim().is_empty()).unwrap_or_else(|| "No Warranty".to_string());
        self.pay_later = draft.pay_later;
        self.images = draft.images.into_iter().filter(|i| !i.trim().is_empty()).collect();
        self.stock = Quantity::new(draft.stock);
        self.details = draft.details;
    }

    /// First image, used as the thumbnail on order lines.
    pub fn main_image(&self) -> &str { self.images.first().map(String::as_str).unwrap_or("") }
    pub fn is_in_stock(&self) -> bool { !self.stock.is_zero() }

    pub fn add_review(&mut self, user_id: Uuid, rating: Rating, comment: impl Into<String>) -> Result<(), ProductError> {
        if self.reviews.iter().any(|r| r.user_id == user_id) { return Err(ProductError::AlreadyReviewed); }
        self.reviews.push(Review { user_id, rating, comment: comment.into(), date: Utc::now() });
        self.recalculate_rating();
        self.touch();
        Ok(())
    }

    /// Drops every review written by `user_id`; true when something was removed.
    pub fn strip_reviews_by(&mut self, user_id: Uuid) -> bool {
        let before = self.reviews.len();
        self.reviews.retain(|r| r.user_id != user_id);
        if self.reviews.len() == before { return false; }
        self.recalculate_rating();
        self.touch();
        true
    }

    fn recalculate_rating(&mut self) {
        self.review_count = self.reviews.len() as u32;
        self.rating = if self.reviews.is_empty() { 0.0 } else {
            self.reviews.iter().map(|r| f64::from(r.rating.value())).sum::<f64>() / self.reviews.len() as f64
        };
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProductError {
    MissingFields(Vec<&'static str>),
    InvalidPrice,
    PricePrecision,
    ImageCount(usize),
    MissingDetails { category: Category, fields: Vec<&'static str> },
    AlreadyReviewed,
}
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFields(fields) => write!(f, "Missing required fields: {}", fields.join(", ")),
            Self::InvalidPrice => write!(f, "Price must be positive and in the store currency"),
            Self::PricePrecision => write!(f, "Prices can have at most {PRICE_DECIMALS} decimal places"),
            Self::ImageCount(0) => write!(f, "Product must have at least one image"),
            Self::ImageCount(_) => write!(f, "Product cannot have more than {MAX_IMAGES} images"),
            Self::MissingDetails { category, fields } => write!(f, "Missing required details for {}: {}", category.as_str(), fields.join(", ")),
            Self::AlreadyReviewed => write!(f, "You have already reviewed this product"),
        }
    }
}

impl From<ProductError> for EcommerceError {
    fn from(e: ProductError) -> Self { EcommerceError::Validation(e.to_string()) }
}
