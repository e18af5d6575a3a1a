use std::collections::{BTreeSet, HashMap};

use eframe::egui::Color32;
use log::info;

use super::color::hsl_to_color;
use super::store::{GraphStore, NodeId};

pub type CommunityId = i64;

const COMMUNITY_SATURATION: f32 = 70.0;
const COMMUNITY_LIGHTNESS: f32 = 50.0;

#[derive(Clone, Debug)]
struct Snapshot {
    revision: u64,
    colors: HashMap<NodeId, Color32>,
}

#[derive(Clone, Debug, Default)]
pub struct CommunityOverlay {
    active: bool,
    snapshot: Option<Snapshot>,
}

pub fn community_palette(community_of: &HashMap<NodeId, CommunityId>) -> HashMap<CommunityId, Color32> {
    let distinct = community_of.values().copied().collect::<BTreeSet<_>>();
    let count = distinct.len().max(1) as f32;
    distinct
        .into_iter()
        .enumerate()
        .map(|(index, community)| {
            let hue = index as f32 * 360.0 / count;
            (
                community,
                hsl_to_color(hue, COMMUNITY_SATURATION, COMMUNITY_LIGHTNESS),
            )
        })
        .collect()
}

impl CommunityOverlay {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.snapshot = None;
    }

    /// Returns `false` when the overlay was already on or the store is empty.
    pub fn toggle_on(
        &mut self,
        store: &mut GraphStore,
        community_of: &HashMap<NodeId, CommunityId>,
    ) -> bool {
        if self.active || !store.is_loaded() {
            return false;
        }

        let stale = self
            .snapshot
            .as_ref()
            .is_none_or(|snapshot| snapshot.revision != store.revision());
        if stale {
            let mut colors = HashMap::with_capacity(store.node_count());
            store.for_each_node(|node| {
                colors.insert(node.id.clone(), node.color);
            });
            self.snapshot = Some(Snapshot {
                revision: store.revision(),
                colors,
            });
        }

        let palette = community_palette(community_of);
        let mut painted = 0usize;
        for id in store.node_ids() {
            if let Some(color) = community_of
                .get(&id)
                .and_then(|community| palette.get(community))
                && store.set_node_color(&id, *color)
            {
                painted += 1;
            }
        }

        info!(
            "community overlay on: {painted} nodes across {} communities",
            palette.len()
        );
        self.active = true;
        true
    }

    pub fn toggle_off(&mut self, store: &mut GraphStore) -> bool {
        if !self.active {
            return false;
        }

        if let Some(snapshot) = &self.snapshot {
            for id in store.node_ids() {
                if let Some(color) = snapshot.colors.get(&id) {
                    store.set_node_color(&id, *color);
                }
            }
        }

        info!("community overlay off");
        self.active = false;
        true
    }
}
