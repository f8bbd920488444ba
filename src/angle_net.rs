use std::path::Path;

use float_ord::FloatOrd;
use image::{imageops::FilterType, DynamicImage};
use ndarray::Axis;
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    session::{build_session, ShapeProfile},
    util::subtract_mean_normalize,
    Angle, ExecutionProvider, Result,
};

const DEST_WIDTH: u32 = 192;
const DEST_HEIGHT: u32 = 48;

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

/// Upright / upside-down classifier for text parts.
pub struct AngleNet {
    session: Session,
}

impl AngleNet {
    #[instrument(level = "debug")]
    pub fn init(
        path: &Path,
        num_threads: usize,
        execution_providers: &[ExecutionProvider],
        cache_path: Option<&Path>,
    ) -> ort::Result<Self> {
        let shape = format!("x:1x3x{DEST_HEIGHT}x{DEST_WIDTH}");
        let profile = ShapeProfile {
            min: shape.clone(),
            opt: shape.clone(),
            max: shape,
        };
        let session = build_session(path, num_threads, execution_providers, cache_path, &profile)?;
        Ok(Self { session })
    }

    /// Classifies every part. With `most_angle` the majority vote is applied
    /// to all of them.
    #[instrument(level = "debug", skip(self, images))]
    pub fn get_angles(&self, images: &[DynamicImage], most_angle: bool) -> Result<Vec<Angle>> {
        let mut angles = images
            .iter()
            .map(|image| self.get_angle(image))
            .collect::<Result<Vec<_>>>()?;

        if most_angle {
            apply_majority(&mut angles);
        }

        Ok(angles)
    }

    #[instrument(level = "trace", skip(self, image))]
    fn get_angle(&self, image: &DynamicImage) -> Result<Angle> {
        let image = image.resize_exact(DEST_WIDTH, DEST_HEIGHT, FilterType::Nearest);
        let input =
            subtract_mean_normalize(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => input]?)?;
        let Some((_, output)) = outputs.first_key_value() else {
            return Ok(Angle {
                index: 0,
                score: 0.0,
            });
        };
        let output = output.try_extract_tensor::<f32>()?;

        let angle = output
            .iter()
            .enumerate()
            .max_by_key(|(_, score)| FloatOrd(**score))
            .map(|(index, score)| Angle {
                index,
                score: *score,
            })
            .unwrap_or(Angle {
                index: 0,
                score: 0.0,
            });

        Ok(angle)
    }
}

fn apply_majority(angles: &mut [Angle]) {
    let flipped = angles.iter().filter(|angle| angle.index == 1).count();
    let index = if flipped * 2 < angles.len() { 0 } else { 1 };
    for angle in angles.iter_mut() {
        angle.index = index;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle(index: usize) -> Angle {
        Angle { index, score: 1.0 }
    }

    #[test]
    fn majority_wins() {
        let mut angles = vec![angle(0), angle(1), angle(0)];
        apply_majority(&mut angles);
        assert!(angles.iter().all(|a| a.index == 0));

        let mut angles = vec![angle(1), angle(1), angle(0)];
        apply_majority(&mut angles);
        assert!(angles.iter().all(|a| a.index == 1));
    }
}
