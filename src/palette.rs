//! Class color allocation.
//!
//! Colors are handed out in the order class indices are first seen, walking a
//! fixed palette (Tableau 10 followed by the 8 base colors, repeated). Indices
//! that arrive after the palette is used up all get [`FALLBACK`].

use std::collections::HashMap;
use std::fmt;

/// 8-bit RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// CSS declaration used to paint a legend cell.
    pub fn css(&self) -> String {
        format!("background-color: rgb({},{},{})", self.0, self.1, self.2)
    }

    pub fn to_image_rgb(self) -> image::Rgb<u8> {
        image::Rgb([self.0, self.1, self.2])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Color given to every class past the end of the palette.
pub const FALLBACK: Rgb = Rgb(255, 0, 0);

/// How many times the base palette is repeated.
pub const PALETTE_REPEAT: usize = 5;

pub const TABLEAU_COLORS: [Rgb; 10] = [
    Rgb(31, 119, 180),  // #1f77b4
    Rgb(255, 127, 14),  // #ff7f0e
    Rgb(44, 160, 44),   // #2ca02c
    Rgb(214, 39, 40),   // #d62728
    Rgb(148, 103, 189), // #9467bd
    Rgb(140, 86, 75),   // #8c564b
    Rgb(227, 119, 194), // #e377c2
    Rgb(127, 127, 127), // #7f7f7f
    Rgb(188, 189, 34),  // #bcbd22
    Rgb(23, 190, 207),  // #17becf
];

// b, g, r, c, m, y, k, w with each channel truncated from channel * 255
pub const BASE_COLORS: [Rgb; 8] = [
    Rgb(0, 0, 255),
    Rgb(0, 127, 0),
    Rgb(255, 0, 0),
    Rgb(0, 191, 191),
    Rgb(191, 0, 191),
    Rgb(191, 191, 0),
    Rgb(0, 0, 0),
    Rgb(255, 255, 255),
];

/// The full palette: Tableau then base colors, repeated [`PALETTE_REPEAT`] times.
pub fn default_palette() -> Vec<Rgb> {
    let base: Vec<Rgb> = TABLEAU_COLORS.iter().chain(BASE_COLORS.iter()).copied().collect();
    base.iter()
        .cycle()
        .take(base.len() * PALETTE_REPEAT)
        .copied()
        .collect()
}

/// Mapping from class index to display color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorAssignment {
    colors: HashMap<usize, Rgb>,
    order: Vec<usize>,
}

impl ColorAssignment {
    pub fn get(&self, class_index: usize) -> Option<Rgb> {
        self.colors.get(&class_index).copied()
    }

    /// Color for `class_index`, or [`FALLBACK`] when the index was never assigned.
    pub fn color_or_fallback(&self, class_index: usize) -> Rgb {
        self.get(class_index).unwrap_or(FALLBACK)
    }

    /// Class indices in assignment order.
    pub fn indices(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ColorAllocator {
    palette: Vec<Rgb>,
}

impl Default for ColorAllocator {
    fn default() -> Self {
        Self::new(default_palette())
    }
}

impl ColorAllocator {
    pub fn new(palette: Vec<Rgb>) -> Self {
        Self { palette }
    }

    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    /// Assign `palette[i]` to the i-th distinct index of `indices`.
    ///
    /// Only the first occurrence of an index counts. The result depends on the
    /// input order: the same indices in another order get different colors.
    pub fn allocate<I>(&self, indices: I) -> ColorAssignment
    where
        I: IntoIterator<Item = usize>,
    {
        let mut assignment = ColorAssignment::default();
        for index in indices {
            if assignment.colors.contains_key(&index) {
                continue;
            }
            let color = self
                .palette
                .get(assignment.order.len())
                .copied()
                .unwrap_or(FALLBACK);
            assignment.colors.insert(index, color);
            assignment.order.push(index);
        }
        assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_palette_layout() {
        let palette = default_palette();
        assert_eq!(palette.len(), 18 * PALETTE_REPEAT);
        assert_eq!(palette[0], Rgb(31, 119, 180));
        assert_eq!(palette[10], Rgb(0, 0, 255));
        assert_eq!(palette[17], Rgb(255, 255, 255));
        assert_eq!(palette[18], palette[0]);
    }

    #[test]
    fn test_two_color_palette_example() {
        let allocator = ColorAllocator::new(vec![Rgb(255, 0, 0), Rgb(0, 255, 0)]);
        let assignment = allocator.allocate([3, 1, 3, 2]);
        assert_eq!(assignment.get(3), Some(Rgb(255, 0, 0)));
        assert_eq!(assignment.get(1), Some(Rgb(0, 255, 0)));
        assert_eq!(assignment.get(2), Some(FALLBACK));
        assert_eq!(assignment.indices(), &[3, 1, 2]);
    }

    #[test]
    fn test_distinct_indices_get_unique_colors_in_order() {
        let allocator = ColorAllocator::default();
        let indices: Vec<usize> = (0..18).rev().collect();
        let assignment = allocator.allocate(indices.iter().copied());
        for (i, index) in indices.iter().enumerate() {
            assert_eq!(assignment.get(*index), Some(allocator.palette()[i]));
        }
    }

    #[test]
    fn test_overflow_uses_fallback() {
        let allocator = ColorAllocator::default();
        let count = allocator.palette().len() + 3;
        let assignment = allocator.allocate(0..count);
        assert_eq!(assignment.len(), count);
        for index in allocator.palette().len()..count {
            assert_eq!(assignment.get(index), Some(FALLBACK));
        }
    }

    #[test]
    fn test_order_sensitive() {
        let allocator = ColorAllocator::default();
        let a = allocator.allocate([1, 2]);
        let b = allocator.allocate([2, 1]);
        assert_ne!(a.get(1), b.get(1));
        assert_eq!(a.get(1), b.get(2));
    }

    #[test]
    fn test_repeated_calls_are_stable() {
        let allocator = ColorAllocator::default();
        assert_eq!(allocator.allocate([5, 9, 0]), allocator.allocate([5, 9, 0]));
    }

    #[test]
    fn test_css_and_display() {
        let color = Rgb(31, 119, 180);
        assert_eq!(color.css(), "background-color: rgb(31,119,180)");
        assert_eq!(color.to_string(), "#1f77b4");
    }

    #[test]
    fn test_empty_input() {
        let assignment = ColorAllocator::default().allocate(std::iter::empty());
        assert!(assignment.is_empty());
        assert_eq!(assignment.color_or_fallback(4), FALLBACK);
    }
}
