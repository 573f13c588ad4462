//! [`AnyBus`]: erases whether the hub is wired to [`RedisBus`] or
//! [`NullBus`] behind one concrete type, so [`crate::state::AppState`]
//! can hold a single `StreamHub<PostgresEventStore, AnyBus>` regardless
//! of whether `REDIS_URL` was configured.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use gridsync_bus_redis::RedisBus;
use gridsync_hub::bus::{Bus, BusError, BusMessage, NullBus};

#[derive(Clone)]
pub struct AnyBus(Arc<dyn Bus>);

impl AnyBus {
    #[must_use]
    pub fn redis(bus: RedisBus) -> Self {
        AnyBus(Arc::new(bus))
    }

    #[must_use]
    pub fn null() -> Self {
        AnyBus(Arc::new(NullBus))
    }
}

#[async_trait]
impl Bus for AnyBus {
    async fn publish(&self, channel: &str, message: BusMessage) -> Result<(), BusError> {
        self.0.publish(channel, message).await
    }

    async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<BoxStream<'static, Result<BusMessage, BusError>>, BusError> {
        self.0.subscribe(channel).await
    }
}
