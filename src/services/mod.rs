//! Application services
//!
//! Each service owns a handle on the store and the notification dispatcher and is
//! cheap to clone into request handlers.

pub mod accounts;
pub mod catalog;
pub mod checkout;
pub mod fulfillment;

pub use accounts::{AccountService, CartLine, CartView};
pub use catalog::CatalogService;
pub use checkout::{CheckoutService, OrderLineRequest, PlaceOrder};
pub use fulfillment::{FulfillmentService, StatusOutcome};

use crate::domain::value_objects::OrderNumber;

/// Where fresh order numbers come from.
pub trait OrderNumberSource: Send + Sync {
    fn next_number(&self) -> OrderNumber;
}

pub struct RandomOrderNumbers;

impl OrderNumberSource for RandomOrderNumbers {
    fn next_number(&self) -> OrderNumber { OrderNumber::random(&mut rand::thread_rng()) }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use rust_decimal::Decimal;
    use uuid::Uuid;
    use crate::domain::aggregates::product::tests::charger_draft;
    use crate::domain::aggregates::{Product, User};
    use crate::domain::value_objects::ProductCode;
    use crate::notify::{Dispatcher, MemoryNotifier};
    use crate::repository::{MemoryStore, ProductRepository, Store, UserRepository};

    pub(crate) struct Harness {
        pub store: Arc<dyn Store>,
        pub notifier: Arc<MemoryNotifier>,
        pub dispatcher: Dispatcher,
    }

    pub(crate) fn harness() -> Harness {
        let notifier = Arc::new(MemoryNotifier::new());
        let dispatcher = Dispatcher::new(notifier.clone(), "ops@shop.example", None);
        Harness { store: Arc::new(MemoryStore::new()), notifier, dispatcher }
    }

    impl Harness {
        pub async fn product(&self, name: &str, price: Decimal, stock: u32) -> Uuid {
            let mut draft = charger_draft(price, stock);
            draft.name = name.into();
            let product = Product::create(ProductCode::generate(&mut rand::thread_rng()), draft).unwrap();
            self.store.insert_product(&product).await.unwrap();
            product.id
        }

        pub async fn user(&self, name: &str, email: &str) -> User {
            let user = User::register(name, email, "secret1").unwrap();
            self.store.insert_user(&user).await.unwrap();
            user
        }

        pub async fn stock(&self, id: Uuid) -> u32 {
            self.store.find_product(id).await.unwrap().unwrap().stock.value()
        }

        /// Lets spawned notification tasks run.
        pub async fn settle(&self) {
            for _ in 0..10 { tokio::task::yield_now().await; }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}
