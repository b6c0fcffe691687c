use serde::{Deserialize, Serialize};

use super::selector::Selector;
use crate::Result;

/// Opaque reference to an element owned by a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub usize);

/// Parsing progress of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    Loading,
    Interactive,
    #[default]
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollBehavior {
    #[default]
    Instant,
    Smooth,
}

/// Axis-aligned rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    #[inline]
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlapping region, or None when the rectangles do not touch
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let top = self.top.max(other.top);
        let left = self.left.max(other.left);
        let bottom = self.bottom().min(other.bottom());
        let right = self.right().min(other.right());
        if bottom < top || right < left {
            return None;
        }
        Some(Rect::new(top, left, right - left, bottom - top))
    }
}

/// Visible window onto the document
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// The viewport in its own coordinate space
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Presentation surface of the page
///
/// Reads are discovery-time lookups; writes are fire-and-forget. All methods
/// take `&self` because the document is shared by every controller on the
/// page. Operations on a disconnected or unknown element are no-ops.
pub trait Document {
    fn ready_state(&self) -> ReadyState;

    fn element_by_id(&self, id: &str) -> Option<ElementId>;

    /// Connected elements matching `selector`, in document order
    fn query_all(&self, selector: &Selector) -> Vec<ElementId>;

    fn is_connected(&self, element: ElementId) -> bool;

    /// Check if `node` is `ancestor` or one of its descendants
    fn contains(&self, ancestor: ElementId, node: ElementId) -> bool;

    fn attribute(&self, element: ElementId, name: &str) -> Option<String>;
    fn set_attribute(&self, element: ElementId, name: &str, value: &str);

    fn has_class(&self, element: ElementId, class: &str) -> bool;
    fn add_class(&self, element: ElementId, class: &str);
    fn remove_class(&self, element: ElementId, class: &str);

    fn style(&self, element: ElementId, property: &str) -> Option<String>;
    fn set_style(&self, element: ElementId, property: &str, value: &str);

    fn text(&self, element: ElementId) -> Option<String>;
    fn set_text(&self, element: ElementId, text: &str);

    /// Distance from the top of the document
    fn offset_top(&self, element: ElementId) -> Option<f64>;
    fn client_height(&self, element: ElementId) -> Option<f64>;

    /// Box relative to the viewport; None when disconnected
    fn bounding_rect(&self, element: ElementId) -> Option<Rect>;

    fn viewport(&self) -> Viewport;
    fn scroll_to(&self, y: f64, behavior: ScrollBehavior);

    /// Parse `selector` and return every match
    fn select(&self, selector: &str) -> Result<Vec<ElementId>> {
        Ok(self.query_all(&Selector::parse(selector)?))
    }

    /// First match for `selector`
    fn select_one(&self, selector: &str) -> Result<Option<ElementId>> {
        Ok(self.select(selector)?.into_iter().next())
    }

    /// Add or remove `class` depending on `on`
    fn toggle_class(&self, element: ElementId, class: &str, on: bool) {
        if on {
            self.add_class(element, class);
        } else {
            self.remove_class(element, class);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 100.0, 100.0);
        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap, Rect::new(50.0, 50.0, 50.0, 50.0));
        assert_eq!(overlap.area(), 2500.0);

        let far = Rect::new(300.0, 0.0, 10.0, 10.0);
        assert!(a.intersection(&far).is_none());
    }

    #[test]
    fn test_touching_edges_intersect_with_zero_area() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 0.0, 100.0, 10.0);
        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap.area(), 0.0);
    }
}
