use std::collections::HashSet;

/// Nodes already emitted during one `split()` call.
///
/// Created by the strategy at the start of a call and handed to each
/// extractor by `&mut`; never stored on a strategy or shared between files.
#[derive(Debug, Default)]
pub struct NodeUsageTracker {
    ids: HashSet<String>,
    spans: Vec<(usize, usize)>,
}

impl NodeUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a node covering `span` (byte range). Returns false if the node
    /// or an overlapping span was already claimed.
    pub fn claim(&mut self, id: &str, span: (usize, usize)) -> bool {
        if self.is_claimed(id, span) {
            return false;
        }
        self.ids.insert(id.to_string());
        self.spans.push(span);
        true
    }

    /// Whether the node itself or any part of its span is already taken
    pub fn is_claimed(&self, id: &str, span: (usize, usize)) -> bool {
        self.ids.contains(id) || self.overlaps(span)
    }

    /// Whether this exact node was claimed
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// True if some claimed span intersects `span`
    pub fn overlaps(&self, (start, end): (usize, usize)) -> bool {
        self.spans
            .iter()
            .any(|&(claimed_start, claimed_end)| start < claimed_end && claimed_start < end)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_once() {
        let mut tracker = NodeUsageTracker::new();
        assert!(tracker.claim("function_item:0-10", (0, 10)));
        assert!(!tracker.claim("function_item:0-10", (0, 10)));
        assert!(tracker.contains_id("function_item:0-10"));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_nested_span_is_claimed_by_parent() {
        let mut tracker = NodeUsageTracker::new();
        assert!(tracker.claim("class:0-100", (0, 100)));
        assert!(tracker.is_claimed("method:20-40", (20, 40)));
        assert!(!tracker.is_claimed("fn:100-120", (100, 120)));
    }

    #[test]
    fn test_parent_overlapping_claimed_child() {
        let mut tracker = NodeUsageTracker::new();
        assert!(tracker.claim("method:20-40", (20, 40)));
        assert!(!tracker.claim("class:0-100", (0, 100)));
    }
}
