//! The per-frame pipeline and the display/control loop around it.

use std::io::Write;

use image::{GrayImage, RgbImage};
use tracing::instrument;

use crate::{
    annotate::{annotate, Annotation},
    capture::FrameSource,
    clock::ClockReading,
    config::PipelineConfig,
    display::{Display, View},
    enhance::{enhance, Enhanced},
    region::crop,
    Detection, Recognizer, Result,
};

pub const VIDEO_WINDOW: &str = "Video";
pub const SHARPENED_WINDOW: &str = "Sharpened";
pub const CONTRAST_WINDOW: &str = "Contrast";
pub const MINUTES_WINDOW: &str = "Minutes";
pub const SECONDS_WINDOW: &str = "Seconds";

/// Everything one frame produced.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub enhanced: Enhanced,
    pub minutes: GrayImage,
    pub seconds: GrayImage,
    pub minute_detections: Vec<Detection>,
    pub second_detections: Vec<Detection>,
    /// Overlay for [`Enhanced::resized`], minute detections first.
    pub annotations: Vec<Annotation>,
}

impl FrameReport {
    /// Raw text of the first minute and first second detection, or an empty
    /// line when either region found nothing.
    pub fn console_line(&self) -> String {
        match (self.minute_detections.first(), self.second_detections.first()) {
            (Some(minutes), Some(seconds)) => format!("{} {}", minutes.text, seconds.text),
            _ => String::new(),
        }
    }

    pub fn clock(&self) -> Option<ClockReading> {
        let minutes = self.minute_detections.first()?;
        let seconds = self.second_detections.first()?;
        ClockReading::from_digits(&minutes.text, &seconds.text)
    }
}

/// Enhances `frame`, crops both regions, recognizes them (minutes first) and
/// lays out the overlay.
#[instrument(level = "debug", skip_all)]
pub fn process_frame<R: Recognizer>(
    frame: &RgbImage,
    recognizer: &mut R,
    config: &PipelineConfig,
) -> Result<FrameReport> {
    let enhanced = enhance(frame, &config.enhance);
    let minutes = crop(&enhanced.contrasted, &config.minutes)?;
    let seconds = crop(&enhanced.contrasted, &config.seconds)?;

    let minute_detections = recognizer.recognize(&minutes, &config.allowlist)?;
    let second_detections = recognizer.recognize(&seconds, &config.allowlist)?;
    log::debug!(
        "{} minute and {} second detections",
        minute_detections.len(),
        second_detections.len()
    );

    let mut annotations = annotate(&minute_detections, &config.minutes);
    annotations.extend(annotate(&second_detections, &config.seconds));

    Ok(FrameReport {
        enhanced,
        minutes,
        seconds,
        minute_detections,
        second_detections,
        annotations,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    QuitKey,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub reason: StopReason,
}

/// Runs the capture loop until the quit key is pressed or the source ends.
///
/// Each frame is fully processed, shown and reported on `out` before the next
/// one is read. Any error stops the loop and is returned; the source and the
/// display are released when they are dropped.
#[instrument(level = "info", skip_all)]
pub fn run<S, R, D, W>(
    mut source: S,
    mut recognizer: R,
    mut display: D,
    config: &PipelineConfig,
    mut out: W,
) -> Result<RunSummary>
where
    S: FrameSource,
    R: Recognizer,
    D: Display,
    W: Write,
{
    let mut frames = 0;
    let reason = loop {
        match step(&mut source, &mut recognizer, &mut display, config, &mut out)? {
            LoopState::Running => frames += 1,
            LoopState::Stopped(StopReason::QuitKey) => {
                frames += 1;
                break StopReason::QuitKey;
            }
            LoopState::Stopped(reason) => break reason,
        }
    };

    display.close()?;
    out.flush()?;

    log::info!("Stopped after {frames} frames ({reason:?})");
    Ok(RunSummary { frames, reason })
}

/// One iteration of the control loop.
fn step<S, R, D, W>(
    source: &mut S,
    recognizer: &mut R,
    display: &mut D,
    config: &PipelineConfig,
    out: &mut W,
) -> Result<LoopState>
where
    S: FrameSource,
    R: Recognizer,
    D: Display,
    W: Write,
{
    let Some(frame) = source.read()? else {
        log::warn!("Frame source has no more frames");
        return Ok(LoopState::Stopped(StopReason::EndOfStream));
    };

    let report = process_frame(&frame, recognizer, config)?;
    show(display, &report, config)?;

    writeln!(out, "{}", report.console_line())?;
    if let Some(clock) = report.clock() {
        log::debug!("Clock reads {clock} ({}s)", clock.total_seconds());
    }

    if display.poll_key(config.wait_ms)? == Some(config.quit_key) {
        return Ok(LoopState::Stopped(StopReason::QuitKey));
    }
    Ok(LoopState::Running)
}

fn show<D: Display>(display: &mut D, report: &FrameReport, config: &PipelineConfig) -> Result<()> {
    let style = &config.style;
    display.show(
        VIDEO_WINDOW,
        View::Color(&report.enhanced.resized),
        &report.annotations,
        style,
    )?;
    display.show(
        SHARPENED_WINDOW,
        View::Color(&report.enhanced.sharpened),
        &[],
        style,
    )?;
    display.show(
        CONTRAST_WINDOW,
        View::Gray(&report.enhanced.contrasted),
        &[],
        style,
    )?;
    display.show(MINUTES_WINDOW, View::Gray(&report.minutes), &[], style)?;
    display.show(SECONDS_WINDOW, View::Gray(&report.seconds), &[], style)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Quad;

    fn report(minutes: &[&str], seconds: &[&str]) -> FrameReport {
        let detections = |texts: &[&str]| {
            texts
                .iter()
                .map(|t| Detection::new(Quad::from_corners(0.0, 0.0, 1.0, 1.0), *t, 0.9))
                .collect::<Vec<_>>()
        };
        FrameReport {
            enhanced: Enhanced {
                resized: RgbImage::new(1, 1),
                sharpened: RgbImage::new(1, 1),
                contrasted: GrayImage::new(1, 1),
            },
            minutes: GrayImage::new(1, 1),
            seconds: GrayImage::new(1, 1),
            minute_detections: detections(minutes),
            second_detections: detections(seconds),
            annotations: Vec::new(),
        }
    }

    #[test]
    fn console_line_uses_first_raw_texts() {
        assert_eq!(report(&["12", "7"], &["3é4"]).console_line(), "12 3é4");
    }

    #[test]
    fn console_line_is_blank_when_a_region_is_empty() {
        assert_eq!(report(&["12"], &[]).console_line(), "");
        assert_eq!(report(&[], &["30"]).console_line(), "");
        assert_eq!(report(&[], &[]).console_line(), "");
    }

    #[test]
    fn clock_comes_from_first_detections() {
        assert_eq!(
            report(&["4", "9"], &["05"]).clock().map(|c| c.to_string()),
            Some("4:05".to_string())
        );
        assert_eq!(report(&["4"], &[]).clock(), None);
    }
}
