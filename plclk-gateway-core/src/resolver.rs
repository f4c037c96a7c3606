//! Pure resolution of a clock locator against a platform-tree snapshot.

use plclk_gateway_error::bind::BindError;
use plclk_gateway_models::{ClockId, ClockLocator, PlatformTree};

/// Resolve `locator` to a provider clock id.
///
/// Direct lookup takes the named node's first associated clock; indexed
/// lookup scans the provider's ordered output-name list for the first exact
/// match and uses its zero-based position as the output index.
pub fn resolve(tree: &PlatformTree, locator: &ClockLocator) -> Result<ClockId, BindError> {
    match locator {
        ClockLocator::Node { name } => {
            let node = tree
                .find_node(name)
                .ok_or_else(|| BindError::NodeNotFound(name.clone()))?;
            let index = node
                .property("clocks")
                .and_then(|p| p.u32s().next())
                .unwrap_or(0);
            let output = node
                .property("clock-output-names")
                .and_then(|p| p.strings().next().map(str::to_string))
                .unwrap_or_else(|| name.clone());
            Ok(ClockId { index, output })
        }
        ClockLocator::Provider { compatible, output } => {
            let node = tree
                .find_compatible(compatible)
                .ok_or_else(|| BindError::NodeNotFound(compatible.clone()))?;
            let index = node
                .property("clock-output-names")
                .and_then(|names| names.strings().position(|s| s == output))
                .ok_or_else(|| BindError::OutputNotFound {
                    provider: compatible.clone(),
                    output: output.clone(),
                })?;
            Ok(ClockId {
                index: index as u32,
                output: output.clone(),
            })
        }
    }
}
