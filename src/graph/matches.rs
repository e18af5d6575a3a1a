use std::collections::HashMap;

use super::color::ITEM_GREEN;
use super::store::{GraphStore, NodeId};

pub type TopKAll = HashMap<NodeId, Vec<NodeId>>;

pub fn apply_recommendation_matches(store: &mut GraphStore, top_k: &TopKAll) -> usize {
    let matched = top_k
        .iter()
        .flat_map(|(user, items)| {
            items
                .iter()
                .filter_map(|item| store.edge_between(user, item))
                .map(|edge| edge.id.clone())
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    matched
        .iter()
        .filter(|id| store.set_edge_color(id, ITEM_GREEN))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::color::DEFAULT_EDGE;
    use crate::graph::store::tests::sample_store;

    #[test]
    fn recommended_pairs_turn_green() {
        let mut store = sample_store();
        let top_k = TopKAll::from([
            (
                "user-1".to_owned(),
                vec!["item-2".to_owned(), "item-404".to_owned()],
            ),
            ("user-404".to_owned(), vec!["item-1".to_owned()]),
        ]);

        assert_eq!(apply_recommendation_matches(&mut store, &top_k), 1);
        assert_eq!(store.edge_between("user-1", "item-2").map(|edge| edge.color), Some(ITEM_GREEN));
        assert_eq!(store.edge_between("user-1", "item-1").map(|edge| edge.color), Some(DEFAULT_EDGE));
        assert_eq!(store.edge_between("user-2", "item-2").map(|edge| edge.color), Some(DEFAULT_EDGE));
    }
}
