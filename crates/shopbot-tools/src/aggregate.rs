//! Reassembles streamed tool-call fragments.

use std::collections::HashMap;

use crate::types::ToolCall;

/// Collects fragments keyed by call id.
///
/// The first fragment for an id fixes its position and name; later ones
/// append their `args` text. Output order is first-seen order.
#[derive(Debug, Default)]
pub struct ToolCallAggregator {
    order: Vec<String>,
    calls: HashMap<String, ToolCall>,
}

impl ToolCallAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: ToolCall) {
        match self.calls.get_mut(&fragment.id) {
            Some(call) => {
                call.args.push_str(&fragment.args);
                if call.name.is_empty() {
                    call.name = fragment.name;
                }
            }
            None => {
                self.order.push(fragment.id.clone());
                self.calls.insert(fragment.id.clone(), fragment);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn finish(mut self) -> Vec<ToolCall> {
        self.order
            .iter()
            .filter_map(|id| self.calls.remove(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_concatenate_per_id() {
        let mut agg = ToolCallAggregator::new();
        agg.push(ToolCall::new("c1", "add_to_cart", r#"{"product_"#));
        agg.push(ToolCall::new("c2", "view_cart", "{}"));
        agg.push(ToolCall::new("c1", "", r#"id":"e001"}"#));

        let calls = agg.finish();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].name, "add_to_cart");
        assert_eq!(calls[0].args, r#"{"product_id":"e001"}"#);
        assert_eq!(calls[1].id, "c2");
    }

    #[test]
    fn test_late_name_fills_blank() {
        let mut agg = ToolCallAggregator::new();
        agg.push(ToolCall::new("c1", "", "{"));
        agg.push(ToolCall::new("c1", "view_cart", "}"));
        let calls = agg.finish();
        assert_eq!(calls[0].name, "view_cart");
        assert_eq!(calls[0].args, "{}");
    }

    #[test]
    fn test_empty() {
        let agg = ToolCallAggregator::new();
        assert!(agg.is_empty());
        assert!(agg.finish().is_empty());
    }
}
