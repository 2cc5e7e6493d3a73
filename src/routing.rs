use std::collections::HashMap;

use serde::Deserialize;

/// Discord channel snowflake.
pub type ChannelId = u64;

/// One configured `source -> target` relay pair. Both ids are non-zero once the config is validated.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ChannelMapping {
    pub source: ChannelId,
    pub target: ChannelId,
}

/// Source channel to ordered fan-out list. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingTable {
    routes: HashMap<ChannelId, Vec<ChannelId>>,
}

impl RoutingTable {
    /// Targets for `source` in the order they were configured.
    pub fn targets(&self, source: ChannelId) -> Option<&[ChannelId]> {
        self.routes.get(&source).map(Vec::as_slice)
    }

    /// Number of distinct source channels.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Group mappings by source, keeping first-seen order and duplicate targets.
pub fn source_to_target_channels(mappings: &[ChannelMapping]) -> RoutingTable {
    let mut routes: HashMap<ChannelId, Vec<ChannelId>> = HashMap::new();
    for mapping in mappings {
        routes.entry(mapping.source).or_default().push(mapping.target);
    }
    RoutingTable { routes }
}
