//! Catalog: products, stock views and reviews.

use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use crate::domain::aggregates::{Category, Product, ProductDraft, Review};
use crate::domain::events::{DomainEvent, ProductEvent};
use crate::domain::value_objects::{ProductCode, Rating};
use crate::notify::Dispatcher;
use crate::repository::{ProductFilter, Store};
use crate::{EcommerceError, Result};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    dispatcher: Dispatcher,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, dispatcher: Dispatcher) -> Self { Self { store, dispatcher } }

    #[instrument(skip(self, draft), fields(name = %draft.name, category = draft.category.as_str()))]
    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        let code = ProductCode::generate(&mut rand::thread_rng());
        let product = Product::create(code, draft)?;
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, code = %product.code, "product created");
        Ok(product)
    }

    #[instrument(skip(self, draft))]
    pub async fn update_product(&self, id: Uuid, draft: ProductDraft) -> Result<Product> {
        let mut product = self.get_product(id).await?;
        let dropped = product.revise(draft)?;
        self.store.update_product(&product).await?;
        if !dropped.is_empty() {
            self.dispatcher.publish(DomainEvent::Product(ProductEvent::ImagesDiscarded { product_id: id, urls: dropped }));
        }
        self.get_product(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<()> {
        let product = self.store.delete_product(id).await?.ok_or(EcommerceError::NotFound("Product"))?;
        info!(product_id = %id, "product deleted");
        if !product.images.is_empty() {
            self.dispatcher.publish(DomainEvent::Product(ProductEvent::ImagesDiscarded { product_id: id, urls: product.images }));
        }
        Ok(())
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product> {
        self.store.find_product(id).await?.ok_or(EcommerceError::NotFound("Product"))
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> { self.store.list_products(&ProductFilter::All).await }

    pub async fn list_by_category(&self, category: &str) -> Result<Vec<Product>> {
        let category = Category::parse(category).ok_or_else(|| EcommerceError::Validation(format!("Unknown category: {category}")))?;
        self.store.list_products(&ProductFilter::Category(category)).await
    }

    /// Blank queries match nothing.
    pub async fn search(&self, query: &str) -> Result<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() { return Ok(vec![]); }
        self.store.list_products(&ProductFilter::NameContains(query.to_string())).await
    }

    pub async fn low_stock(&self) -> Result<Vec<Product>> { self.store.list_products(&ProductFilter::LowStock).await }

    pub async fn out_of_stock(&self) -> Result<Vec<Product>> { self.store.list_products(&ProductFilter::OutOfStock).await }

    #[instrument(skip(self, comment))]
    pub async fn add_review(&self, product_id: Uuid, user_id: Uuid, rating: u8, comment: &str) -> Result<Product> {
        let rating = Rating::new(rating).ok_or_else(|| EcommerceError::Validation("Rating must be between 1 and 5".into()))?;
        let mut product = self.get_product(product_id).await?;
        product.add_review(user_id, rating, comment.trim())?;
        self.store.save_reviews(&product).await?;
        Ok(product)
    }

    pub async fn list_reviews(&self, product_id: Uuid) -> Result<Vec<Review>> {
        Ok(self.get_product(product_id).await?.reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::tests::charger_draft;
    use crate::services::testing::harness;
    use rust_decimal_macros::dec;

    fn catalog() -> (CatalogService, crate::services::testing::Harness) {
        let h = harness();
        (CatalogService::new(h.store.clone(), h.dispatcher.clone()), h)
    }

    #[tokio::test]
    async fn test_create_assigns_code() {
        let (catalog, _) = catalog();
        let product = catalog.create_product(charger_draft(dec!(2500), 10)).await.unwrap();
        assert!(product.code.as_str().starts_with("PID-"));
        assert_eq!(catalog.get_product(product.id).await.unwrap().name, "Fast Charger");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (catalog, _) = catalog();
        assert!(matches!(catalog.delete_product(Uuid::new_v4()).await, Err(EcommerceError::NotFound("Product"))));
    }

    #[tokio::test]
    async fn test_search_and_category() {
        let (catalog, h) = catalog();
        h.product("Fast Charger", dec!(10), 3).await;
        h.product("Car charger", dec!(10), 30).await;
        assert!(catalog.search("   ").await.unwrap().is_empty());
        assert_eq!(catalog.search("charger").await.unwrap().len(), 2);
        assert_eq!(catalog.list_by_category("chargers").await.unwrap().len(), 2);
        assert!(catalog.list_by_category("Laptops").await.unwrap().is_empty());
        assert!(matches!(catalog.list_by_category("Tablets").await, Err(EcommerceError::Validation(_))));
        assert_eq!(catalog.low_stock().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_review_once_per_user() {
        let (catalog, h) = catalog();
        let id = h.product("Fast Charger", dec!(10), 3).await;
        let user = Uuid::new_v4();
        let product = catalog.add_review(id, user, 4, " solid ").await.unwrap();
        assert_eq!(product.review_count, 1);
        assert!(matches!(catalog.add_review(id, user, 5, "again").await, Err(EcommerceError::Validation(_))));
        assert!(matches!(catalog.add_review(id, Uuid::new_v4(), 9, "x").await, Err(EcommerceError::Validation(_))));
        assert_eq!(catalog.list_reviews(id).await.unwrap()[0].comment, "solid");
    }

    #[tokio::test]
    async fn test_update_keeps_reviews_written_meanwhile() {
        let (catalog, h) = catalog();
        let id = h.product("Fast Charger", dec!(10), 3).await;
        let mut edited = catalog.get_product(id).await.unwrap();
        catalog.add_review(id, Uuid::new_v4(), 5, "great").await.unwrap();

        edited.revise(charger_draft(dec!(12), 8)).unwrap();
        h.store.update_product(&edited).await.unwrap();
        let stored = catalog.get_product(id).await.unwrap();
        assert_eq!(stored.review_count, 1);
        assert_eq!(stored.reviews.len(), 1);
        assert_eq!(stored.price.amount(), dec!(12));
        assert_eq!(stored.stock.value(), 8);

        let updated = catalog.update_product(id, charger_draft(dec!(15), 8)).await.unwrap();
        assert_eq!(updated.review_count, 1);
    }
}
