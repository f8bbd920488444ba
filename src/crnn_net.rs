use std::path::Path;

use image::{imageops::FilterType, DynamicImage};
use ndarray::{ArrayView2, Axis};
use ort::{inputs, Session};
use tracing::instrument;

use crate::{
    session::{build_session, ShapeProfile},
    util::subtract_mean_normalize,
    Error, ExecutionProvider, Result, TextLine,
};

const MEAN_VALUES: [f32; 3] = [0.5, 0.5, 0.5];
const NORM_VALUES: [f32; 3] = [2.0, 2.0, 2.0];

const DEST_HEIGHT: u32 = 48;
const BLANK: usize = 0;

/// CTC text line recognizer.
pub struct CrnnNet {
    session: Session,
    keys: Vec<String>,
}

impl CrnnNet {
    #[instrument(level = "debug")]
    pub fn init(
        model_path: &Path,
        keys_path: &Path,
        num_threads: usize,
        execution_providers: &[ExecutionProvider],
        cache_path: Option<&Path>,
    ) -> Result<Self> {
        let profile = ShapeProfile {
            min: format!("x:1x3x{DEST_HEIGHT}x1"),
            opt: format!("x:1x3x{DEST_HEIGHT}x256"),
            max: format!("x:1x3x{DEST_HEIGHT}x{}", u16::MAX),
        };
        let session = build_session(
            model_path,
            num_threads,
            execution_providers,
            cache_path,
            &profile,
        )?;

        let keys = std::fs::read_to_string(keys_path).map_err(|source| Error::KeysFile {
            path: keys_path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            session,
            keys: load_keys(&keys),
        })
    }

    #[instrument(level = "debug", skip(self, images))]
    pub fn get_text_lines(
        &self,
        images: &[DynamicImage],
        allowlist: &str,
    ) -> Result<Vec<TextLine>> {
        let allowed = allowed_indices(&self.keys, allowlist);
        images
            .iter()
            .map(|image| self.get_text_line(image, &allowed))
            .collect()
    }

    #[instrument(level = "trace", skip(self, image, allowed))]
    fn get_text_line(&self, image: &DynamicImage, allowed: &[usize]) -> Result<TextLine> {
        let scale = DEST_HEIGHT as f32 / image.height() as f32;
        let dest_width = ((image.width() as f32 * scale) as u32).clamp(1, u16::MAX as u32);
        let image = image.resize_exact(dest_width, DEST_HEIGHT, FilterType::Triangle);

        let tensor_values =
            subtract_mean_normalize(&image, &MEAN_VALUES, &NORM_VALUES).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["x" => tensor_values]?)?;
        let Some((_, output)) = outputs.first_key_value() else {
            return Ok(TextLine::default());
        };
        let output_tensor = output.try_extract_tensor::<f32>()?;

        // [1, T, classes]
        log::trace!("CRNN output size: {:?}", output_tensor.dim());
        let steps = output_tensor.len_of(Axis(1));
        let classes = output_tensor.len_of(Axis(2));
        let scores = output_tensor.to_owned().into_shape((steps, classes))?;

        Ok(decode_ctc(scores.view(), &self.keys, allowed))
    }
}

/// Keys file lines framed by the CTC blank at index 0 and a trailing space.
fn load_keys(contents: &str) -> Vec<String> {
    ["#".to_string()]
        .into_iter()
        .chain(contents.lines().map(str::to_string))
        .chain([" ".to_string()])
        .collect()
}

/// Class indices the decoder may emit. An empty allowlist permits every key.
fn allowed_indices(keys: &[String], allowlist: &str) -> Vec<usize> {
    keys.iter()
        .enumerate()
        .skip(1)
        .filter(|(_, key)| !key.is_empty())
        .filter(|(_, key)| allowlist.is_empty() || key.chars().all(|c| allowlist.contains(c)))
        .map(|(i, _)| i)
        .collect()
}

/// Greedy CTC decoding restricted to `allowed` classes: per step the best of
/// blank and the allowed classes wins (earliest on ties), repeats collapse and
/// blanks drop out.
fn decode_ctc(data: ArrayView2<f32>, keys: &[String], allowed: &[usize]) -> TextLine {
    let mut line = TextLine::default();
    let mut previous = BLANK;

    for step in data.outer_iter() {
        let (index, score) = std::iter::once(BLANK)
            .chain(allowed.iter().copied())
            .filter(|i| *i < step.len())
            .map(|i| (i, step[i]))
            .reduce(|best, next| if next.1 > best.1 { next } else { best })
            .unwrap_or((BLANK, 0.0));

        if index != BLANK && index != previous {
            if let Some(key) = keys.get(index) {
                line.text.push_str(key);
                line.character_scores.push(score);
            }
        }
        previous = index;
    }

    line
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    fn digit_keys() -> Vec<String> {
        load_keys("0\n1\n2\n3\n4\n5\n6\n7\n8\n9\na\nb")
    }

    fn one_hot(steps: &[(usize, f32)], classes: usize) -> Array2<f32> {
        let mut data = Array2::<f32>::zeros((steps.len(), classes));
        for (t, (class, score)) in steps.iter().enumerate() {
            data[[t, *class]] = *score;
        }
        data
    }

    #[test]
    fn keys_are_framed_by_blank_and_space() {
        let keys = digit_keys();
        assert_eq!(keys.first().map(String::as_str), Some("#"));
        assert_eq!(keys.last().map(String::as_str), Some(" "));
        assert_eq!(keys[1], "0");
    }

    #[test]
    fn collapses_repeats_and_drops_blanks() {
        let keys = digit_keys();
        let allowed = allowed_indices(&keys, "");
        // "1", "1", blank, "1", "2" => "112"
        let data = one_hot(&[(2, 0.9), (2, 0.8), (0, 0.9), (2, 0.7), (3, 0.6)], keys.len());
        let line = decode_ctc(data.view(), &keys, &allowed);
        assert_eq!(line.text, "112");
        assert_eq!(line.character_scores, vec![0.9, 0.7, 0.6]);
    }

    #[test]
    fn allowlist_excludes_other_characters() {
        let keys = digit_keys();
        let allowed = allowed_indices(&keys, "0123456789");
        assert!(!allowed.contains(&11));
        assert!(!allowed.contains(&(keys.len() - 1)));

        let mut data = Array2::<f32>::zeros((2, keys.len()));
        // "a" is the strongest class, "7" the runner up.
        data[[0, 11]] = 0.9;
        data[[0, 8]] = 0.5;
        data[[1, 0]] = 0.9;
        let line = decode_ctc(data.view(), &keys, &allowed);
        assert_eq!(line.text, "7");
        assert_eq!(line.character_scores, vec![0.5]);
    }
}
