use super::Tag;

/// One chordwise strip of a wing, as produced by wing classification.
#[derive(Debug, Clone, PartialEq)]
pub struct WingSection {
    /// Leading-edge curves.
    pub leading_edge: Vec<Tag>,
    /// Trailing-edge curves: one for a sharp edge, three for a truncated one.
    pub trailing_edge: Vec<Tag>,
    /// Mean chord length of the section.
    pub mean_chord: f64,
}

impl WingSection {
    #[must_use]
    pub fn new(leading_edge: Vec<Tag>, trailing_edge: Vec<Tag>, mean_chord: f64) -> Self {
        Self {
            leading_edge,
            trailing_edge,
            mean_chord,
        }
    }

    /// Leading- and trailing-edge curves together, in that order, without repeats.
    #[must_use]
    pub fn edge_curves(&self) -> Vec<Tag> {
        let mut curves = self.leading_edge.clone();
        for tag in &self.trailing_edge {
            if !curves.contains(tag) {
                curves.push(*tag);
            }
        }
        curves
    }

    /// A blunt trailing edge is represented by three curves.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.trailing_edge.len() == 3
    }
}
