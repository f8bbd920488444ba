use std::path::Path;

use geo::{Coord, MinimumRotatedRect, Scale};
use image::{imageops::FilterType, DynamicImage, GrayImage};
use imageproc::{
    contours::find_contours,
    contrast::{threshold_mut, ThresholdType},
    distance_transform::Norm,
    morphology::dilate_mut,
};
use ndarray::{ArrayView2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    session::{build_session, ShapeProfile},
    util::{
        self, box_score_fast, max_side, subtract_mean_normalize, to_geo_poly, to_luma_image,
        unclip,
    },
    ExecutionProvider, Result, TextBox,
};

const MEAN_VALUES: [f32; 3] = [0.485, 0.456, 0.406];
const NORM_VALUES: [f32; 3] = [1.0 / 0.229, 1.0 / 0.224, 1.0 / 0.225];

const LONG_SIDE_THRESHOLD: f32 = 3.0;
const MAX_CANDIDATES: usize = 1000;

/// Differentiable-binarization text detector.
pub struct DbNet {
    session: Session,
}

impl DbNet {
    #[instrument(level = "debug")]
    pub fn init(
        path: &Path,
        num_threads: usize,
        max_side_len: u32,
        execution_providers: &[ExecutionProvider],
        cache_path: Option<&Path>,
    ) -> ort::Result<Self> {
        let profile = ShapeProfile {
            min: "x:1x3x32x32".into(),
            opt: format!("x:1x3x{max_side_len}x{max_side_len}"),
            max: format!("x:1x3x{max_side_len}x{max_side_len}"),
        };
        let session = build_session(path, num_threads, execution_providers, cache_path, &profile)?;
        Ok(Self { session })
    }

    /// Boxes around text in `image`, in `image` coordinates.
    #[instrument(skip(self, image), level = "debug")]
    pub fn get_text_boxes(
        &self,
        image: &DynamicImage,
        scale: util::Scale,
        box_score_thresh: f32,
        box_thresh: f32,
        unclip_ratio: f32,
    ) -> Result<Vec<TextBox>> {
        let resized =
            image.resize_exact(scale.target_width, scale.target_height, FilterType::Nearest);
        let input_values =
            subtract_mean_normalize(&resized, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => input_values]?)?;
        let Some((_, output)) = outputs.first_key_value() else {
            return Ok(Vec::new());
        };
        let pred_mat = output.try_extract_tensor::<f32>()?;

        // [1, 1, H, W] probability map.
        let height = pred_mat.len_of(Axis(2));
        let width = pred_mat.len_of(Axis(3));
        let pred_data = pred_mat.to_owned().into_shape((height, width))?;

        let mut mask = to_luma_image(pred_data.view());
        threshold_mut(&mut mask, (box_thresh * 255.0) as u8, ThresholdType::Binary);
        dilate_mut(&mut mask, Norm::L1, 2);

        let boxes = find_rs_boxes(pred_data.view(), &mask, scale, box_score_thresh, unclip_ratio);
        log::debug!("DB net found {} text boxes", boxes.len());
        Ok(boxes)
    }
}

#[instrument(skip(pred_data, mask), level = "trace")]
fn find_rs_boxes(
    pred_data: ArrayView2<f32>,
    mask: &GrayImage,
    util::Scale {
        factor_x, factor_y, ..
    }: util::Scale,
    box_score_threshold: f32,
    unclip_ratio: f32,
) -> Vec<TextBox> {
    find_contours::<i32>(mask)
        .into_iter()
        .take(MAX_CANDIDATES)
        .filter(|it| it.points.len() > 2)
        .filter_map(|it| to_geo_poly(&it.points).minimum_rotated_rect())
        .filter(|rect| max_side(rect) >= LONG_SIDE_THRESHOLD)
        .map(|rect| {
            let score = box_score_fast(&rect, pred_data);
            (rect, score)
        })
        .filter(|(_, score)| *score >= box_score_threshold)
        .filter_map(|(rect, score)| Some((unclip(rect, unclip_ratio)?, score)))
        .filter(|(grown, _)| max_side(grown) >= LONG_SIDE_THRESHOLD + 2.0)
        .map(|(rect, score)| TextBox {
            score,
            rect: rect.scale_around_point(factor_x, factor_y, Coord::zero()),
        })
        .collect()
}
