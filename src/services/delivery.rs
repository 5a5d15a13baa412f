//! Delivery fee calculation: haversine distance times a flat per-km
//! rate, with two process-local TTL caches in front of it.
//!
//! The store-coordinate cache exists because the settings row almost
//! never changes; the per-address fee cache because checkout previews
//! hammer the same addresses. Both are best-effort: the computation is
//! cheap and pure, so losing an entry costs one recomputation.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::entities::{
    self, Address, AddressModel, DeliveryMethod, StoreSettings, SETTINGS_ROW_ID,
};
use crate::errors::ServiceError;

const EARTH_RADIUS_KM: f64 = 6371.0;

pub const NOTE_PICKUP: &str = "Pickup at store; no delivery fee";
pub const NOTE_EXPRESS: &str = "Express delivery is arranged separately; contact us for pricing";
pub const NOTE_PENDING: &str = "Delivery fee will be confirmed after review";

/// The one rounding rule for every currency value the system produces:
/// two decimals, midpoint away from zero.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Distance shown to callers follows the same two-decimal rule.
pub fn round_distance(km: f64) -> f64 {
    (km * 100.0).round() / 100.0
}

/// Great-circle distance in kilometers between two (lat, lng) pairs
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = from;
    let (lat2, lon2) = to;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Fee for a given distance at a given rate, rounded by the central rule
pub fn fee_for_distance(distance_km: f64, rate_per_km: f64) -> Decimal {
    round_currency(Decimal::from_f64(distance_km * rate_per_km).unwrap_or(Decimal::ZERO))
}

/// Quote returned to checkout previews and recorded on placed orders
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryQuote {
    pub fee: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DeliveryQuote {
    fn flat(note: &str) -> Self {
        Self {
            fee: Decimal::ZERO,
            distance_km: None,
            note: Some(note.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    rate_per_km: f64,
    store_coords_ttl: Duration,
    fee_ttl: Duration,
    store_coords: Arc<TtlCache<(), Option<(f64, f64)>>>,
    fees: Arc<TtlCache<Uuid, Decimal>>,
}

impl DeliveryService {
    pub fn new(db: Arc<DatabaseConnection>, config: &AppConfig) -> Self {
        Self {
            db,
            rate_per_km: config.delivery.rate_per_km,
            store_coords_ttl: config.delivery.store_coords_ttl(),
            fee_ttl: config.delivery.fee_ttl(),
            store_coords: Arc::new(TtlCache::unbounded()),
            fees: Arc::new(TtlCache::new(
                config.delivery.fee_cache_capacity,
                config.delivery.fee_cache_evict_batch,
            )),
        }
    }

    /// Store coordinates from the settings row, cached for an hour
    pub async fn store_coordinates(&self) -> Result<Option<(f64, f64)>, ServiceError> {
        if let Some(coords) = self.store_coords.get(&()) {
            return Ok(coords);
        }
        let settings = StoreSettings::find_by_id(SETTINGS_ROW_ID)
            .one(&*self.db)
            .await?;
        let coords = settings.and_then(|s| s.coordinates());
        self.store_coords.insert((), coords, self.store_coords_ttl);
        Ok(coords)
    }

    /// Called when the settings row changes. Every cached fee was
    /// computed against the old store location, so those go too.
    pub fn invalidate_store_coordinates(&self) {
        self.store_coords.clear();
        self.fees.clear();
    }

    /// Called when an address changes or is deleted
    pub fn invalidate_fee(&self, address_id: Uuid) {
        self.fees.remove(&address_id);
    }

    /// Quote for an already-loaded address. The ownership check happens
    /// at the caller, which is the party that loaded the address.
    pub async fn quote_for(
        &self,
        method: DeliveryMethod,
        address: Option<&AddressModel>,
    ) -> Result<DeliveryQuote, ServiceError> {
        match method {
            DeliveryMethod::Pickup => Ok(DeliveryQuote::flat(NOTE_PICKUP)),
            DeliveryMethod::Express => Ok(DeliveryQuote::flat(NOTE_EXPRESS)),
            DeliveryMethod::Standard => {
                let Some(address) = address else {
                    return Ok(DeliveryQuote::flat(NOTE_PENDING));
                };
                self.standard_quote(address).await
            }
        }
    }

    /// Quote for checkout preview, looking the address up by id with an
    /// ownership filter (missing and unowned are both 404).
    #[instrument(skip(self))]
    pub async fn quote(
        &self,
        customer_id: Uuid,
        method: DeliveryMethod,
        address_id: Option<Uuid>,
    ) -> Result<DeliveryQuote, ServiceError> {
        let address = match (method, address_id) {
            (DeliveryMethod::Pickup, _) | (_, None) => None,
            (_, Some(id)) => Some(
                Address::find_by_id(id)
                    .filter(entities::address::Column::CustomerId.eq(customer_id))
                    .one(&*self.db)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("Address {} not found", id)))?,
            ),
        };
        self.quote_for(method, address.as_ref()).await
    }

    async fn standard_quote(&self, address: &AddressModel) -> Result<DeliveryQuote, ServiceError> {
        let store = self.store_coordinates().await?;
        let destination = address.coordinates();
        let (Some(store), Some(destination)) = (store, destination) else {
            return Ok(DeliveryQuote::flat(NOTE_PENDING));
        };

        let distance = haversine_km(store, destination);
        let fee = match self.fees.get(&address.id) {
            Some(fee) => fee,
            None => {
                let fee = fee_for_distance(distance, self.rate_per_km);
                self.fees.insert(address.id, fee, self.fee_ttl);
                debug!(address_id = %address.id, %fee, "delivery fee computed");
                fee
            }
        };

        Ok(DeliveryQuote {
            fee,
            distance_km: Some(round_distance(distance)),
            note: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn service() -> DeliveryService {
        let config = AppConfig::new(
            "sqlite::memory:".into(),
            "x".repeat(64),
            3600,
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        // Disconnected connection: fine for the paths that never hit it.
        DeliveryService::new(Arc::new(DatabaseConnection::default()), &config)
    }

    #[test]
    fn rounding_is_midpoint_away_from_zero() {
        assert_eq!(round_currency(dec!(2.005)), dec!(2.01));
        assert_eq!(round_currency(dec!(-2.005)), dec!(-2.01));
        assert_eq!(round_currency(dec!(2.004)), dec!(2.00));
        assert_eq!(round_currency(dec!(10)), dec!(10.00));
    }

    #[test]
    fn haversine_matches_known_distances() {
        assert!(haversine_km((10.0, 20.0), (10.0, 20.0)).abs() < 1e-9);
        // One degree of longitude at the equator is about 111.19 km.
        let one_degree = haversine_km((0.0, 0.0), (0.0, 1.0));
        assert!((one_degree - 111.19).abs() < 0.01, "got {}", one_degree);
    }

    #[test]
    fn fee_scales_with_distance() {
        assert_eq!(fee_for_distance(0.0, 0.5), dec!(0.00));
        assert_eq!(fee_for_distance(10.0, 0.5), dec!(5.00));
        assert!(fee_for_distance(12.3, 0.5) >= fee_for_distance(12.2, 0.5));
    }

    #[tokio::test]
    async fn pickup_is_always_free() {
        let quote = service()
            .quote_for(DeliveryMethod::Pickup, None)
            .await
            .unwrap();
        assert_eq!(quote.fee, Decimal::ZERO);
        assert_eq!(quote.note.as_deref(), Some(NOTE_PICKUP));
        assert!(quote.distance_km.is_none());
    }

    #[tokio::test]
    async fn express_defers_pricing() {
        let quote = service()
            .quote_for(DeliveryMethod::Express, None)
            .await
            .unwrap();
        assert_eq!(quote.fee, Decimal::ZERO);
        assert_eq!(quote.note.as_deref(), Some(NOTE_EXPRESS));
    }

    #[tokio::test]
    async fn standard_without_address_is_deferred() {
        let quote = service()
            .quote_for(DeliveryMethod::Standard, None)
            .await
            .unwrap();
        assert_eq!(quote.fee, Decimal::ZERO);
        assert_eq!(quote.note.as_deref(), Some(NOTE_PENDING));
    }
}
