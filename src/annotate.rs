//! Maps detections from crop space back onto the frame and draws them.

use geo::Coord;

use crate::{region::CropRect, sanitize::sanitize, Detection, Result};

/// Pixels between a box's top edge and its label baseline.
const LABEL_OFFSET: i32 = 10;

/// How boxes and labels are drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    /// RGB.
    pub color: [u8; 3],
    pub thickness: i32,
    pub font_scale: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            color: [0, 255, 0],
            thickness: 2,
            font_scale: 0.8,
        }
    }
}

/// Something boxes and labels can be drawn on.
pub trait Canvas {
    fn draw_rect(
        &mut self,
        top_left: (i32, i32),
        bottom_right: (i32, i32),
        style: &OverlayStyle,
    ) -> Result<()>;

    /// `origin` is the bottom-left of the text.
    fn draw_label(&mut self, text: &str, origin: (i32, i32), style: &OverlayStyle) -> Result<()>;
}

/// One detection, placed in frame coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub top_left: (i32, i32),
    pub bottom_right: (i32, i32),
    pub label: String,
}

impl Annotation {
    pub fn label_origin(&self) -> (i32, i32) {
        (self.top_left.0, self.top_left.1 - LABEL_OFFSET)
    }

    pub fn draw(&self, canvas: &mut impl Canvas, style: &OverlayStyle) -> Result<()> {
        canvas.draw_rect(self.top_left, self.bottom_right, style)?;
        canvas.draw_label(&self.label, self.label_origin(), style)
    }
}

/// Moves a crop-local point into the frame; coordinates are truncated to
/// whole pixels before the offset is applied.
pub fn translate(point: Coord<f32>, origin: (u32, u32)) -> (i32, i32) {
    (
        point.x as i32 + origin.0 as i32,
        point.y as i32 + origin.1 as i32,
    )
}

pub fn label(detection: &Detection) -> String {
    format!("{} ({:.6})", sanitize(&detection.text), detection.confidence)
}

/// Annotations for every detection found inside `rect`.
pub fn annotate(detections: &[Detection], rect: &CropRect) -> Vec<Annotation> {
    let origin = rect.origin();
    detections
        .iter()
        .map(|detection| Annotation {
            top_left: translate(detection.quad.top_left, origin),
            bottom_right: translate(detection.quad.bottom_right, origin),
            label: label(detection),
        })
        .collect()
}

#[cfg(feature = "highgui")]
mod mat_canvas {
    use opencv::{
        core::{Mat, Point, Scalar},
        imgproc,
    };

    use super::{Canvas, OverlayStyle};
    use crate::Result;

    fn bgr(style: &OverlayStyle) -> Scalar {
        let [r, g, b] = style.color;
        Scalar::new(b as f64, g as f64, r as f64, 0.0)
    }

    impl Canvas for Mat {
        fn draw_rect(
            &mut self,
            top_left: (i32, i32),
            bottom_right: (i32, i32),
            style: &OverlayStyle,
        ) -> Result<()> {
            imgproc::rectangle_points(
                self,
                Point::new(top_left.0, top_left.1),
                Point::new(bottom_right.0, bottom_right.1),
                bgr(style),
                style.thickness,
                imgproc::LINE_8,
                0,
            )?;
            Ok(())
        }

        fn draw_label(
            &mut self,
            text: &str,
            origin: (i32, i32),
            style: &OverlayStyle,
        ) -> Result<()> {
            imgproc::put_text(
                self,
                text,
                Point::new(origin.0, origin.1),
                imgproc::FONT_HERSHEY_SIMPLEX,
                style.font_scale,
                bgr(style),
                style.thickness,
                imgproc::LINE_8,
                false,
            )?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Quad;

    use crate::Error;

    #[derive(Default)]
    struct Recorder {
        rects: Vec<((i32, i32), (i32, i32))>,
        labels: Vec<(String, (i32, i32))>,
        fail_rects: bool,
    }

    impl Canvas for Recorder {
        fn draw_rect(
            &mut self,
            top_left: (i32, i32),
            bottom_right: (i32, i32),
            _: &OverlayStyle,
        ) -> Result<()> {
            if self.fail_rects {
                return Err(Error::UnsupportedFrame("canvas is read only".into()));
            }
            self.rects.push((top_left, bottom_right));
            Ok(())
        }

        fn draw_label(&mut self, text: &str, origin: (i32, i32), _: &OverlayStyle) -> Result<()> {
            self.labels.push((text.to_string(), origin));
            Ok(())
        }
    }

    fn minutes() -> CropRect {
        CropRect::new("minutes", 100..250, 350..475)
    }

    #[test]
    fn translation_adds_crop_origin() {
        assert_eq!(translate(Coord { x: 7.0, y: 3.0 }, (350, 100)), (357, 103));
        assert_eq!(translate(Coord { x: 7.9, y: 3.2 }, (500, 100)), (507, 103));
    }

    #[test]
    fn single_detection_is_placed_on_frame() {
        let detection = Detection::new(Quad::from_corners(0.0, 0.0, 10.0, 5.0), "5", 0.91);
        let annotations = annotate(&[detection], &minutes());
        assert_eq!(
            annotations,
            vec![Annotation {
                top_left: (350, 100),
                bottom_right: (360, 105),
                label: "5 (0.910000)".into(),
            }]
        );

        let mut canvas = Recorder::default();
        annotations[0]
            .draw(&mut canvas, &OverlayStyle::default())
            .unwrap();
        assert_eq!(canvas.rects, vec![((350, 100), (360, 105))]);
        assert_eq!(canvas.labels, vec![("5 (0.910000)".to_string(), (350, 90))]);
    }

    #[test]
    fn label_uses_sanitized_text() {
        let detection = Detection::new(Quad::from_corners(0.0, 0.0, 1.0, 1.0), " 4é ", 0.5);
        assert_eq!(label(&detection), "4 (0.500000)");
    }

    #[test]
    fn draw_failure_is_returned_before_the_label() {
        let annotation = Annotation {
            top_left: (350, 100),
            bottom_right: (360, 105),
            label: "5 (0.910000)".into(),
        };
        let mut canvas = Recorder {
            fail_rects: true,
            ..Recorder::default()
        };
        let result = annotation.draw(&mut canvas, &OverlayStyle::default());
        assert!(matches!(result, Err(Error::UnsupportedFrame(_))));
        assert!(canvas.labels.is_empty());
    }

    #[test]
    fn no_detections_no_annotations() {
        assert!(annotate(&[], &minutes()).is_empty());
    }
}
