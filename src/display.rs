//! Live windows and keyboard polling.

use image::{GrayImage, RgbImage};

use crate::{annotate::Annotation, annotate::OverlayStyle, Result};

/// An image handed to a [`Display`] window.
#[derive(Debug, Clone, Copy)]
pub enum View<'a> {
    Color(&'a RgbImage),
    Gray(&'a GrayImage),
}

impl View<'_> {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            View::Color(image) => image.dimensions(),
            View::Gray(image) => image.dimensions(),
        }
    }
}

pub trait Display {
    /// Shows `view` in the window titled `title`, with `annotations` drawn
    /// on top.
    fn show(
        &mut self,
        title: &str,
        view: View<'_>,
        annotations: &[Annotation],
        style: &OverlayStyle,
    ) -> Result<()>;

    /// Waits up to `wait_ms` for a key press.
    fn poll_key(&mut self, wait_ms: i32) -> Result<Option<char>>;

    /// Closes every window. Calling it twice is harmless.
    fn close(&mut self) -> Result<()>;
}

impl<D: Display + ?Sized> Display for &mut D {
    fn show(
        &mut self,
        title: &str,
        view: View<'_>,
        annotations: &[Annotation],
        style: &OverlayStyle,
    ) -> Result<()> {
        (**self).show(title, view, annotations, style)
    }

    fn poll_key(&mut self, wait_ms: i32) -> Result<Option<char>> {
        (**self).poll_key(wait_ms)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Decodes a raw key code as returned by window toolkits (`-1` for none).
pub fn key_from_code(code: i32) -> Option<char> {
    if code < 0 {
        None
    } else {
        Some(char::from((code & 0xFF) as u8))
    }
}

#[cfg(feature = "highgui")]
pub use gui::HighGui;

#[cfg(feature = "highgui")]
mod gui {
    use std::collections::HashSet;

    use opencv::highgui;

    use super::{key_from_code, Display, View};
    use crate::{
        annotate::{Annotation, OverlayStyle},
        cv::{gray_to_mat, rgb_to_mat},
        Result,
    };

    /// OpenCV highgui windows. Every window is destroyed on drop.
    #[derive(Debug, Default)]
    pub struct HighGui {
        windows: HashSet<String>,
    }

    impl HighGui {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Display for HighGui {
        fn show(
            &mut self,
            title: &str,
            view: View<'_>,
            annotations: &[Annotation],
            style: &OverlayStyle,
        ) -> Result<()> {
            if !self.windows.contains(title) {
                highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
                self.windows.insert(title.to_string());
            }
            let mut mat = match view {
                View::Color(image) => rgb_to_mat(image)?,
                View::Gray(image) => gray_to_mat(image)?,
            };
            for annotation in annotations {
                annotation.draw(&mut mat, style)?;
            }
            highgui::imshow(title, &mat)?;
            Ok(())
        }

        fn poll_key(&mut self, wait_ms: i32) -> Result<Option<char>> {
            Ok(key_from_code(highgui::wait_key(wait_ms)?))
        }

        fn close(&mut self) -> Result<()> {
            if !self.windows.is_empty() {
                highgui::destroy_all_windows()?;
                self.windows.clear();
            }
            Ok(())
        }
    }

    impl Drop for HighGui {
        fn drop(&mut self) {
            if let Err(e) = self.close() {
                log::warn!("Failed to close windows: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_codes_map_to_chars() {
        assert_eq!(key_from_code(-1), None);
        assert_eq!(key_from_code(113), Some('q'));
        // Some backends set modifier bits above the low byte.
        assert_eq!(key_from_code(0x10_0071), Some('q'));
    }
}
