//! Color Switch interview

use std::sync::Arc;

use cc_protocol::cc::color_switch::{
    current_value_id, supported_value_id, target_value_id, ColorComponent, SupportedColors,
};
use cc_protocol::{InterviewKind, ValueMetadata};
use tracing::{debug, info};

use crate::api::ColorSwitchApi;
use crate::cache::ValueCache;
use crate::driver::DriverHandle;
use crate::endpoint::{Endpoint, EndpointAddress};
use crate::error::ApiError;

/// Complete: seed metadata, query supported colors, read every supported
/// color. Partial: take supported colors from the cache, then read them.
pub(super) async fn interview(
    driver: &DriverHandle,
    endpoint: &Arc<Endpoint>,
    kind: InterviewKind,
) -> Result<(), ApiError> {
    let address = endpoint.address();
    let api = ColorSwitchApi::new(driver.clone(), endpoint.clone());

    let supported = match kind {
        InterviewKind::Complete => {
            let seeded = seed_metadata(driver.cache(), address);
            debug!("{}: seeded metadata for {} color values", address, seeded);

            info!("{}: querying supported colors", address);
            api.get_supported().await?
        }
        InterviewKind::Partial => cached_support(driver.cache(), address),
    };

    info!("{}: querying color states", address);
    for component in supported.components() {
        api.get(component).await?;
    }

    Ok(())
}

/// Store metadata for every color value that has none yet. Returns how
/// many entries were added.
pub(super) fn seed_metadata(cache: &ValueCache, address: EndpointAddress) -> usize {
    let node = address.node_id;
    let ep = address.index;

    ColorComponent::ALL
        .into_iter()
        .map(|component| {
            let key = component.key();
            let entries = [
                (
                    current_value_id(ep, component),
                    ValueMetadata::read_only_number()
                        .label(format!("Color {}", key))
                        .description(format!("The current level of the {} color.", key))
                        .range(0, 255),
                ),
                (
                    target_value_id(ep, component),
                    ValueMetadata::number()
                        .label(format!("Color {}", key))
                        .description(format!("The target level of the {} color.", key))
                        .range(0, 255),
                ),
                (
                    supported_value_id(ep, component),
                    ValueMetadata::read_only_boolean()
                        .label(format!("Supports {}", key))
                        .description(format!(
                            "Whether the endpoint supports setting the {} color.",
                            key
                        )),
                ),
            ];
            entries
                .into_iter()
                .filter(|(id, metadata)| cache.set_metadata_if_absent(node, id.clone(), metadata.clone()))
                .count()
        })
        .sum()
}

/// Supported colors as last cached. A missing flag counts as unsupported.
fn cached_support(cache: &ValueCache, address: EndpointAddress) -> SupportedColors {
    SupportedColors::from_components(ColorComponent::ALL.into_iter().filter(|component| {
        cache
            .get(address.node_id, &supported_value_id(address.index, *component))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }))
}
