// Layout reordering: a linear order of widget ids changed by drag gestures.
// Session-only; the order is never persisted.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("index {index} out of bounds for {len} widgets")]
    OutOfBounds { index: usize, len: usize },
}

/// Removes the element at `from` and reinserts it at `to`, shifting the ones in between.
/// This is a splice move, not a swap: `[A,B,C,D]`, `0 -> 2` gives `[B,C,A,D]`.
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Result<Vec<T>, LayoutError> {
    let len = list.len();
    for index in [from, to] {
        if index >= len {
            return Err(LayoutError::OutOfBounds { index, len });
        }
    }
    let mut out = list.to_vec();
    let moved = out.remove(from);
    out.insert(to, moved);
    Ok(out)
}

/// Display order; always a permutation of the registry's id set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    order: Vec<String>,
}

impl Layout {
    pub fn new(ids: Vec<String>) -> Self {
        Self { order: ids }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Moves by position in the full order. Equal indices are a no-op.
    pub fn move_card(&mut self, drag_index: usize, hover_index: usize) -> Result<(), LayoutError> {
        if drag_index == hover_index && drag_index < self.order.len() {
            return Ok(());
        }
        self.order = reorder(&self.order, drag_index, hover_index)?;
        Ok(())
    }

    /// Moves by position in the rendered list. Hidden widgets keep their slots relative to
    /// each other; indices are mapped onto the full order first.
    pub fn move_visible(
        &mut self,
        rendered: &[&str],
        drag_index: usize,
        hover_index: usize,
    ) -> Result<(), LayoutError> {
        let len = rendered.len();
        let (Some(drag_id), Some(hover_id)) =
            (rendered.get(drag_index), rendered.get(hover_index))
        else {
            let index = drag_index.max(hover_index);
            return Err(LayoutError::OutOfBounds { index, len });
        };
        let from = self.position(drag_id).ok_or(LayoutError::OutOfBounds {
            index: drag_index,
            len,
        })?;
        let to = self.position(hover_id).ok_or(LayoutError::OutOfBounds {
            index: hover_index,
            len,
        })?;
        self.move_card(from, to)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|o| o == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(ids: &[&str]) -> Layout {
        Layout::new(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn move_card_same_index_is_noop() {
        let mut l = layout(&["A", "B"]);
        l.move_card(1, 1).unwrap();
        assert_eq!(l.order(), &["A", "B"]);
    }

    #[test]
    fn move_card_out_of_bounds_leaves_order() {
        let mut l = layout(&["A", "B"]);
        assert_eq!(
            l.move_card(0, 2),
            Err(LayoutError::OutOfBounds { index: 2, len: 2 })
        );
        assert_eq!(l.order(), &["A", "B"]);
    }
}
