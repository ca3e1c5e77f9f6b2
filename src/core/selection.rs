/// Clips selected on the timeline, shared by every track kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipSelection {
    clip_ids: Vec<String>,
}

impl ClipSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain click replaces the selection. Clicking with the multi-select
    /// modifier toggles membership instead.
    pub fn click(&mut self, id: &str, modifier: bool) {
        if modifier {
            if let Some(index) = self.clip_ids.iter().position(|c| c == id) {
                self.clip_ids.remove(index);
            } else {
                self.clip_ids.push(id.to_string());
            }
        } else {
            self.clip_ids.clear();
            self.clip_ids.push(id.to_string());
        }
    }

    /// Whether a drag-move of `id` may start: exactly one selected item,
    /// being the dragged one, and no modifier held.
    pub fn can_drag(&self, id: &str, modifier: bool) -> bool {
        !modifier && self.clip_ids.len() == 1 && self.clip_ids[0] == id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clip_ids.iter().any(|c| c == id)
    }

    pub fn ids(&self) -> &[String] {
        &self.clip_ids
    }

    pub fn len(&self) -> usize {
        self.clip_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clip_ids.is_empty()
    }

    /// Drop ids that no longer exist
    pub fn retain(&mut self, mut exists: impl FnMut(&str) -> bool) {
        self.clip_ids.retain(|id| exists(id));
    }

    pub fn set(&mut self, ids: Vec<String>) {
        self.clip_ids = ids;
    }

    pub fn reset(&mut self) {
        self.clip_ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_click_replaces() {
        let mut selection = ClipSelection::new();
        selection.click("a", false);
        selection.click("b", false);
        assert_eq!(selection.ids(), ["b".to_string()]);
    }

    #[test]
    fn test_modifier_toggles() {
        let mut selection = ClipSelection::new();
        selection.click("a", false);
        selection.click("b", true);
        assert_eq!(selection.len(), 2);
        selection.click("a", true);
        assert_eq!(selection.ids(), ["b".to_string()]);
    }

    #[test]
    fn test_drag_requires_single_item_without_modifier() {
        let mut selection = ClipSelection::new();
        selection.click("a", false);
        assert!(selection.can_drag("a", false));
        assert!(!selection.can_drag("a", true));
        assert!(!selection.can_drag("b", false));

        selection.click("b", true);
        assert!(!selection.can_drag("a", false));
    }
}
