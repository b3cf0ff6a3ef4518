//! Basic interview

use std::sync::Arc;

use cc_protocol::cc::basic::{current_value_id, duration_value_id, target_value_id};
use cc_protocol::{InterviewKind, ValueMetadata};
use tracing::info;

use crate::api::BasicApi;
use crate::cache::ValueCache;
use crate::driver::DriverHandle;
use crate::endpoint::{Endpoint, EndpointAddress};
use crate::error::ApiError;

pub(super) async fn interview(
    driver: &DriverHandle,
    endpoint: &Arc<Endpoint>,
    kind: InterviewKind,
) -> Result<(), ApiError> {
    let address = endpoint.address();
    if kind == InterviewKind::Complete {
        seed_metadata(driver.cache(), address);
    }

    info!("{}: querying basic state", address);
    BasicApi::new(driver.clone(), endpoint.clone()).get().await?;
    Ok(())
}

fn seed_metadata(cache: &ValueCache, address: EndpointAddress) {
    let node = address.node_id;
    let ep = address.index;

    cache.set_metadata_if_absent(
        node,
        current_value_id(ep),
        ValueMetadata::read_only_number()
            .label("Current value")
            .range(0, 255),
    );
    cache.set_metadata_if_absent(
        node,
        target_value_id(ep),
        ValueMetadata::number().label("Target value").range(0, 255),
    );
    cache.set_metadata_if_absent(
        node,
        duration_value_id(ep),
        ValueMetadata::read_only_duration().label("Remaining duration"),
    );
}
