//! Listing creation and the owner's edit path.

use std::time::Instant;

use domain::{Product, UnitOfWork};
use event_store::EventStore;

use crate::commands::{ListProduct, UpdateListing};
use crate::engine::{ConsistencyEngine, observe};
use crate::error::{EngineError, PRODUCT};
use crate::retry::AttemptError;
use crate::services::{NotificationEmitter, PartyDirectory};

impl<S, P, N> ConsistencyEngine<S, P, N>
where
    S: EventStore,
    P: PartyDirectory,
    N: NotificationEmitter,
{
    /// Lists a new product for its owner.
    #[tracing::instrument(skip(self, cmd), fields(product_id = %cmd.product_id, owner = %cmd.owner))]
    pub async fn list_product(&self, cmd: ListProduct) -> Result<Product, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = self
            .retry
            .run("list_product", PRODUCT, cmd.product_id.into(), || {
                self.try_list_product(cmd)
            })
            .await;
        observe("list_product", started, &result);

        if let Ok(product) = &result {
            tracing::info!(status = %product.status(), "product listed");
        }
        result
    }

    async fn try_list_product(&self, cmd: &ListProduct) -> Result<Product, AttemptError> {
        self.ensure_party_exists(cmd.owner).await?;

        let mut uow = UnitOfWork::begin(&self.store, "list_product");
        if uow.load::<Product>(cmd.product_id).await?.is_some() {
            return Err(
                EngineError::conflict(PRODUCT, cmd.product_id, "product already listed").into(),
            );
        }

        let mut product = Product::default();
        let events = product
            .list(
                cmd.product_id,
                cmd.owner,
                cmd.title.clone(),
                cmd.status,
                cmd.unit_price,
                cmd.quantity,
                cmd.location,
            )
            .map_err(|e| EngineError::product(cmd.product_id, e))?;
        uow.record(&mut product, events)?;
        uow.commit().await?;

        Ok(product)
    }

    /// Applies an owner edit to a listing.
    ///
    /// The write is versioned like every engine write, so an edit based on a
    /// listing that a resolution has since changed is re-run against the new
    /// state.
    #[tracing::instrument(skip(self, cmd), fields(product_id = %cmd.product_id))]
    pub async fn update_listing(&self, cmd: UpdateListing) -> Result<Product, EngineError> {
        let started = Instant::now();
        let cmd = &cmd;
        let result = self
            .retry
            .run("update_listing", PRODUCT, cmd.product_id.into(), || {
                self.try_update_listing(cmd)
            })
            .await;
        observe("update_listing", started, &result);
        result
    }

    async fn try_update_listing(&self, cmd: &UpdateListing) -> Result<Product, AttemptError> {
        let mut uow = UnitOfWork::begin(&self.store, "update_listing");
        let mut product: Product = uow
            .load(cmd.product_id)
            .await?
            .ok_or_else(|| EngineError::not_found(PRODUCT, cmd.product_id))?;

        let events = product
            .update_listing(
                cmd.acting_party,
                cmd.title.clone(),
                cmd.status,
                cmd.unit_price,
                cmd.quantity,
            )
            .map_err(|e| EngineError::product(cmd.product_id, e))?;
        uow.record(&mut product, events)?;
        uow.commit().await?;

        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use common::PartyId;
    use domain::{Money, ProductStatus};
    use event_store::InMemoryEventStore;

    use crate::error::ErrorKind;
    use crate::services::{InMemoryNotificationEmitter, InMemoryPartyDirectory};

    use super::*;

    type TestEngine =
        ConsistencyEngine<InMemoryEventStore, InMemoryPartyDirectory, InMemoryNotificationEmitter>;

    async fn engine_with_owner() -> (TestEngine, PartyId) {
        let parties = InMemoryPartyDirectory::new();
        let owner = parties.register_new().await;
        let engine = ConsistencyEngine::new(
            InMemoryEventStore::new(),
            parties,
            InMemoryNotificationEmitter::new(),
        );
        (engine, owner)
    }

    #[tokio::test]
    async fn list_and_read_back() {
        let (engine, owner) = engine_with_owner().await;
        let cmd =
            ListProduct::new(owner, "Bike", ProductStatus::ForSale, Money::from_cents(5000), 1);
        let id = cmd.product_id;

        engine.list_product(cmd).await.unwrap();
        let product = engine.get_product(id).await.unwrap().unwrap();
        assert_eq!(product.owner(), owner);
        assert_eq!(product.title(), "Bike");
        assert_eq!(product.quantity_available(), 1);
    }

    #[tokio::test]
    async fn unknown_owner_is_not_found() {
        let (engine, _) = engine_with_owner().await;
        let cmd = ListProduct::new(
            PartyId::new(),
            "Bike",
            ProductStatus::ForSale,
            Money::from_cents(5000),
            1,
        );
        let err = engine.list_product(cmd).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn zero_quantity_needs_unavailable_status() {
        let (engine, owner) = engine_with_owner().await;
        let err = engine
            .list_product(ListProduct::new(
                owner,
                "Lamp",
                ProductStatus::ForSale,
                Money::from_cents(100),
                0,
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        engine
            .list_product(ListProduct::new(
                owner,
                "Lamp",
                ProductStatus::Unavailable,
                Money::from_cents(100),
                0,
            ))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn only_owner_updates_listing() {
        let (engine, owner) = engine_with_owner().await;
        let cmd =
            ListProduct::new(owner, "Chair", ProductStatus::ForSale, Money::from_cents(900), 2);
        let id = cmd.product_id;
        engine.list_product(cmd).await.unwrap();

        let err = engine
            .update_listing(UpdateListing::new(id, PartyId::new()).unit_price(Money::from_cents(1)))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let product = engine
            .update_listing(
                UpdateListing::new(id, owner)
                    .status(ProductStatus::ForExchange)
                    .title("Oak chair"),
            )
            .await
            .unwrap();
        assert_eq!(product.status(), ProductStatus::ForExchange);
        assert_eq!(product.title(), "Oak chair");
        assert_eq!(product.unit_price(), Money::from_cents(900));
    }

    #[tokio::test]
    async fn update_of_missing_product_is_not_found() {
        let (engine, owner) = engine_with_owner().await;
        let err = engine
            .update_listing(UpdateListing::new(common::AggregateId::new(), owner).quantity(3))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
