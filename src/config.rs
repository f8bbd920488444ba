use crate::{annotate::OverlayStyle, region::CropRect, DIGITS};

/// Coefficients for [`crate::enhance::enhance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnhanceConfig {
    /// Horizontal stretch applied before anything else; spreads out tightly
    /// packed digits.
    pub resize_factor: f32,
    pub blur_sigma: f32,
    /// Unsharp mask: `frame_weight * frame + blur_weight * blur`.
    pub frame_weight: f32,
    pub blur_weight: f32,
    /// Linear stretch: `contrast_gain * sharpened + contrast_bias`.
    pub contrast_gain: f32,
    pub contrast_bias: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            resize_factor: 1.5,
            blur_sigma: 4.0,
            frame_weight: 1.5,
            blur_weight: -1.1,
            contrast_gain: 4.0,
            contrast_bias: -127.0,
        }
    }
}

/// Everything the control loop needs besides its resources.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capture device index.
    pub device_index: i32,
    pub minutes: CropRect,
    pub seconds: CropRect,
    pub allowlist: String,
    pub quit_key: char,
    /// How long each key poll blocks, in milliseconds.
    pub wait_ms: i32,
    pub enhance: EnhanceConfig,
    pub style: OverlayStyle,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            device_index: 2,
            minutes: CropRect::new("minutes", 100..250, 350..475),
            seconds: CropRect::new("seconds", 100..250, 500..625),
            allowlist: DIGITS.to_string(),
            quit_key: 'q',
            wait_ms: 1,
            enhance: EnhanceConfig::default(),
            style: OverlayStyle::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_device_index(mut self, device_index: i32) -> Self {
        self.device_index = device_index;
        self
    }

    pub fn with_regions(mut self, minutes: CropRect, seconds: CropRect) -> Self {
        self.minutes = minutes;
        self.seconds = seconds;
        self
    }

    pub fn with_allowlist(mut self, allowlist: impl Into<String>) -> Self {
        self.allowlist = allowlist.into();
        self
    }

    pub fn with_quit_key(mut self, quit_key: char) -> Self {
        self.quit_key = quit_key;
        self
    }

    pub fn with_enhance(mut self, enhance: EnhanceConfig) -> Self {
        self.enhance = enhance;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_reference_camera_setup() {
        let config = PipelineConfig::default();
        assert_eq!(config.device_index, 2);
        assert_eq!(config.minutes.origin(), (350, 100));
        assert_eq!(config.seconds.origin(), (500, 100));
        assert_eq!(config.allowlist, DIGITS);
        assert_eq!(config.quit_key, 'q');
        assert_eq!(config.wait_ms, 1);
    }

    #[test]
    fn setters_replace_only_their_field() {
        let enhance = EnhanceConfig {
            blur_sigma: 0.0,
            ..EnhanceConfig::default()
        };
        let config = PipelineConfig::default()
            .with_device_index(0)
            .with_enhance(enhance);

        assert_eq!(config.device_index, 0);
        assert_eq!(config.enhance, enhance);
        assert_eq!(config.enhance.resize_factor, 1.5);
        assert_eq!(config.quit_key, 'q');
        assert_eq!(config.minutes, CropRect::new("minutes", 100..250, 350..475));
    }
}
