//! Field data structures for the fluid grid
//!
//! Levels are stored as a flat `Vec<f32>` in row-major order. Flow through the
//! four walls of each cell is stored alongside in a [`FlowField`].

/// Scalar field stored in row-major order (`y * width + x`)
#[derive(Debug, Clone)]
pub struct FieldData {
    /// Field values in row-major order (y * width + x)
    pub data: Vec<f32>,
    /// Grid width in cells
    pub width: usize,
    /// Grid height in cells
    pub height: usize,
}

impl FieldData {
    /// Create a new field with given dimensions, initialized to zero
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_value(width, height, 0.0)
    }

    /// Create a new field with given dimensions, initialized to a value
    ///
    /// # Arguments
    ///
    /// * `width` - Grid width in cells
    /// * `height` - Grid height in cells
    /// * `value` - Initial value for all cells
    #[must_use]
    pub fn with_value(width: usize, height: usize, value: f32) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Get reference to field data
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Get mutable reference to field data
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Get value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        assert!(
            x < self.width && y < self.height,
            "Coordinates out of bounds"
        );
        self.data[y * self.width + x]
    }

    /// Set value at grid position
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        assert!(
            x < self.width && y < self.height,
            "Coordinates out of bounds"
        );
        self.data[y * self.width + x] = value;
    }

    /// Fill entire field with a value
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Sum of all values, accumulated in f64 to keep large grids exact enough
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| f64::from(v)).sum()
    }

    /// Smallest and largest value, `(0, 0)` for an empty field
    #[must_use]
    pub fn min_max(&self) -> (f32, f32) {
        if self.data.is_empty() {
            return (0.0, 0.0);
        }
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Mean of one row
    ///
    /// # Panics
    ///
    /// Panics if `y` is out of bounds
    #[must_use]
    pub fn row_mean(&self, y: usize) -> f32 {
        assert!(y < self.height, "Row out of bounds");
        let row = &self.data[y * self.width..(y + 1) * self.width];
        row.iter().sum::<f32>() / self.width as f32
    }
}

/// Outflow from one cell through each of its four walls (volume per second).
///
/// Outflows are never negative; the net exchange across a wall is the
/// difference between the two cells' facing outflows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PipeFlow {
    /// Toward `x - 1`
    pub left: f32,
    /// Toward `x + 1`
    pub right: f32,
    /// Toward `y - 1`
    pub up: f32,
    /// Toward `y + 1`
    pub down: f32,
}

impl PipeFlow {
    /// Total outflow through all four walls
    #[inline]
    #[must_use]
    pub fn total(&self) -> f32 {
        self.left + self.right + self.up + self.down
    }

    /// Multiply every outflow by `factor`
    #[inline]
    pub fn scale(&mut self, factor: f32) {
        self.left *= factor;
        self.right *= factor;
        self.up *= factor;
        self.down *= factor;
    }

    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.left.is_finite()
            && self.right.is_finite()
            && self.up.is_finite()
            && self.down.is_finite()
    }

    /// Squared flow magnitude, used as a kinetic energy proxy
    #[inline]
    #[must_use]
    pub fn energy(&self) -> f32 {
        let dx = self.right - self.left;
        let dy = self.down - self.up;
        dx * dx + dy * dy
    }
}

/// Per-cell pipe flows in row-major order
#[derive(Debug, Clone)]
pub struct FlowField {
    pub data: Vec<PipeFlow>,
    pub width: usize,
    pub height: usize,
}

impl FlowField {
    /// Create a quiescent flow field (no flow anywhere)
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![PipeFlow::default(); width * height],
            width,
            height,
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PipeFlow] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [PipeFlow] {
        &mut self.data
    }

    /// Get the flow of one cell
    ///
    /// # Panics
    ///
    /// Panics if coordinates are out of bounds
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> PipeFlow {
        assert!(
            x < self.width && y < self.height,
            "Coordinates out of bounds"
        );
        self.data[y * self.width + x]
    }

    /// Stop all flow
    pub fn clear(&mut self) {
        self.data.fill(PipeFlow::default());
    }

    /// Sum of squared flow magnitudes over the grid
    #[must_use]
    pub fn energy(&self) -> f64 {
        self.data.iter().map(|f| f64::from(f.energy())).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let field = FieldData::new(10, 20);
        assert_eq!(field.width, 10);
        assert_eq!(field.height, 20);
        assert_eq!(field.data.len(), 200);
        assert!(field.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_field_get_set() {
        let mut field = FieldData::new(10, 10);
        field.set(3, 4, 123.45);
        assert_eq!(field.get(3, 4), 123.45);

        // Verify row-major indexing
        let index = 4 * 10 + 3;
        assert_eq!(field.data[index], 123.45);
    }

    #[test]
    fn test_field_statistics() {
        let mut field = FieldData::with_value(4, 2, 1.0);
        field.set(0, 0, 3.0);
        field.set(3, 1, -1.0);
        assert_eq!(field.sum(), 8.0);
        assert_eq!(field.min_max(), (-1.0, 3.0));
        assert_eq!(field.row_mean(0), 1.5);
        assert_eq!(field.row_mean(1), 0.5);
    }

    #[test]
    #[should_panic(expected = "Coordinates out of bounds")]
    fn test_field_bounds_check() {
        let field = FieldData::new(10, 10);
        let _ = field.get(10, 5); // Out of bounds
    }

    #[test]
    fn test_pipe_flow_helpers() {
        let mut flow = PipeFlow {
            left: 1.0,
            right: 3.0,
            up: 0.0,
            down: 2.0,
        };
        assert_eq!(flow.total(), 6.0);
        assert_eq!(flow.energy(), 8.0);

        flow.scale(0.5);
        assert_eq!(flow.total(), 3.0);
        assert!(flow.is_finite());

        flow.up = f32::NAN;
        assert!(!flow.is_finite());
    }

    #[test]
    fn test_flow_field_starts_quiescent() {
        let flows = FlowField::new(3, 3);
        assert_eq!(flows.data.len(), 9);
        assert_eq!(flows.get(2, 2), PipeFlow::default());
        assert_eq!(flows.energy(), 0.0);
    }
}
