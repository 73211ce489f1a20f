use super::Shard;
use shardkit_core::types::NodeId;
use std::ops::Index;
use std::sync::Arc;

/// Shards of one mapping, indexed by node id in the mapping's node order.
#[derive(Debug, Clone, Default)]
pub struct ShardCollection {
    shards: Vec<Arc<Shard>>,
}

impl ShardCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a shard. A shard whose node id is already present replaces
    /// the earlier entry in place.
    pub fn push(&mut self, shard: Arc<Shard>) {
        match self.position(shard.node_id()) {
            Some(pos) => self.shards[pos] = shard,
            None => self.shards.push(shard),
        }
    }

    pub fn get(&self, node_id: &NodeId) -> Option<&Arc<Shard>> {
        self.position(node_id).map(|pos| &self.shards[pos])
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.position(node_id).is_some()
    }

    /// Node ids in collection order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.shards.iter().map(|s| s.node_id().clone()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Shard>> {
        self.shards.iter()
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    fn position(&self, node_id: &NodeId) -> Option<usize> {
        self.shards.iter().position(|s| s.node_id() == node_id)
    }
}

impl FromIterator<Arc<Shard>> for ShardCollection {
    fn from_iter<I: IntoIterator<Item = Arc<Shard>>>(iter: I) -> Self {
        let mut collection = Self::new();
        for shard in iter {
            collection.push(shard);
        }
        collection
    }
}

impl IntoIterator for ShardCollection {
    type Item = Arc<Shard>;
    type IntoIter = std::vec::IntoIter<Arc<Shard>>;

    fn into_iter(self) -> Self::IntoIter {
        self.shards.into_iter()
    }
}

impl<'a> IntoIterator for &'a ShardCollection {
    type Item = &'a Arc<Shard>;
    type IntoIter = std::slice::Iter<'a, Arc<Shard>>;

    fn into_iter(self) -> Self::IntoIter {
        self.shards.iter()
    }
}

impl Index<&NodeId> for ShardCollection {
    type Output = Arc<Shard>;

    /// # Panics
    ///
    /// Panics if no shard of that node is in the collection.
    fn index(&self, node_id: &NodeId) -> &Self::Output {
        match self.get(node_id) {
            Some(shard) => shard,
            None => panic!("no shard for node '{}' in collection", node_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::StaticRegistry;

    fn shard(id: &str) -> Arc<Shard> {
        Arc::new(Shard::bare(NodeId::from(id), Arc::new(StaticRegistry::new())))
    }

    #[test]
    fn test_keeps_insertion_order() {
        let collection: ShardCollection =
            ["node3", "node1", "node2"].into_iter().map(shard).collect();
        assert_eq!(
            collection.node_ids(),
            vec![NodeId::from("node3"), NodeId::from("node1"), NodeId::from("node2")]
        );
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn test_lookup_by_node() {
        let collection: ShardCollection = ["node1", "node2"].into_iter().map(shard).collect();
        let node2 = NodeId::from("node2");
        assert!(collection.contains(&node2));
        assert_eq!(collection[&node2].node_id(), &node2);
        assert!(collection.get(&NodeId::from("node9")).is_none());
    }

    #[test]
    fn test_duplicate_replaces_in_place() {
        let mut collection = ShardCollection::new();
        collection.push(shard("a"));
        collection.push(shard("b"));
        let replacement = shard("a");
        collection.push(Arc::clone(&replacement));

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.node_ids()[0], NodeId::from("a"));
        assert!(Arc::ptr_eq(&collection[&NodeId::from("a")], &replacement));
    }

    #[test]
    #[should_panic(expected = "no shard for node 'ghost'")]
    fn test_index_missing_panics() {
        let collection = ShardCollection::new();
        let _ = &collection[&NodeId::from("ghost")];
    }
}
