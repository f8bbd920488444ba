use geo::{BoundingRect, Coord, Polygon};

/// Four corners of a detected text span, in the coordinates of the image
/// that was handed to the recognizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub top_left: Coord<f32>,
    pub top_right: Coord<f32>,
    pub bottom_right: Coord<f32>,
    pub bottom_left: Coord<f32>,
}

impl Quad {
    pub fn new(
        top_left: Coord<f32>,
        top_right: Coord<f32>,
        bottom_right: Coord<f32>,
        bottom_left: Coord<f32>,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Axis aligned quad spanning `(x0, y0)` to `(x1, y1)`.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::new(
            Coord { x: x0, y: y0 },
            Coord { x: x1, y: y0 },
            Coord { x: x1, y: y1 },
            Coord { x: x0, y: y1 },
        )
    }

    /// Bounding quad of an arbitrary (possibly rotated) polygon.
    pub fn bounding(polygon: &Polygon<f32>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        let (min, max) = (rect.min(), rect.max());
        Some(Self::from_corners(min.x, min.y, max.x, max.y))
    }

    pub fn corners(&self) -> [Coord<f32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }
}

/// One recognized text span.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub quad: Quad,
    pub text: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(quad: Quad, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            quad,
            text: text.into(),
            confidence,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextBox {
    pub score: f32,
    pub rect: Polygon<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct TextLine {
    pub text: String,
    pub character_scores: Vec<f32>,
}

impl TextLine {
    /// Mean of the per character scores, 0 for an empty line.
    pub fn confidence(&self) -> f32 {
        if self.character_scores.is_empty() {
            return 0.0;
        }
        self.character_scores.iter().sum::<f32>() / self.character_scores.len() as f32
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Angle {
    pub index: usize,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use geo::{polygon, Coord};

    use super::*;

    #[test]
    fn bounding_quad_of_rotated_polygon() {
        let poly: Polygon<f32> = polygon![
            (x: 5.0, y: 0.0),
            (x: 10.0, y: 5.0),
            (x: 5.0, y: 10.0),
            (x: 0.0, y: 5.0),
        ];
        let quad = Quad::bounding(&poly).unwrap();
        assert_eq!(
            quad.corners(),
            [
                Coord { x: 0.0, y: 0.0 },
                Coord { x: 10.0, y: 0.0 },
                Coord { x: 10.0, y: 10.0 },
                Coord { x: 0.0, y: 10.0 },
            ]
        );
    }

    #[test]
    fn empty_line_has_zero_confidence() {
        assert_eq!(TextLine::default().confidence(), 0.0);
        let line = TextLine {
            text: "12".into(),
            character_scores: vec![0.5, 1.0],
        };
        assert!((line.confidence() - 0.75).abs() < f32::EPSILON);
    }
}
