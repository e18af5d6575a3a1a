mod color;
mod community;
mod comparison;
mod filters;
mod matches;
mod selection;
mod store;

pub use color::{
    LABEL_PURPLE, PRESET_COLORS, hsl_to_color, hue_of, parse_hex_color, to_hex,
};
pub use community::{CommunityId, CommunityOverlay};
pub use comparison::{
    ComparisonGraph, ComparisonGraphBuilder, ComparisonInput, ComparisonKey, MAX_K, MIN_K,
    Recommendation, clamp_k,
};
pub use filters::{FilterColor, FilterColorMap};
pub use matches::{TopKAll, apply_recommendation_matches};
pub use selection::{SelectionState, edge_view, node_view};
pub use store::{AttributeValue, Edge, GraphStore, Node, NodeKind, RawGraph};
