//! Overlay rendering

use camera_capture::VideoFrame;
use dms::{AlertLevel, FaceRegion, FrameAnalysis, Point2};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use tracing::{debug, info, trace};

use crate::MonitorError;

/// Annotations for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub sequence: u32,
    pub face_regions: Vec<FaceRegion>,
    /// Both eye contours of every face, in landmark order
    pub eye_contours: Vec<[Point2; 6]>,
    pub alert_level: AlertLevel,
    pub banner: Option<&'static str>,
    /// "EAR: x.xx" per face with a readable eye
    pub labels: Vec<String>,
}

impl Overlay {
    pub fn from_analysis(analysis: &FrameAnalysis) -> Self {
        let mut overlay = Overlay {
            sequence: analysis.sequence,
            alert_level: analysis.alert_level,
            banner: analysis.banner(),
            ..Default::default()
        };

        for face in &analysis.faces {
            overlay.face_regions.push(face.region);
            overlay.eye_contours.push(*face.left_eye.landmarks.points());
            overlay.eye_contours.push(*face.right_eye.landmarks.points());
            overlay.labels.extend(face.openness_label());
        }
        overlay
    }
}

/// Receives every processed frame with its overlay
pub trait RenderSink {
    fn render(&mut self, frame: &VideoFrame, overlay: &Overlay) -> Result<(), MonitorError>;
}

/// Reports overlay text through the log
#[derive(Debug, Default)]
pub struct LogRenderSink {
    last_banner: Option<&'static str>,
}

impl RenderSink for LogRenderSink {
    fn render(&mut self, _frame: &VideoFrame, overlay: &Overlay) -> Result<(), MonitorError> {
        if overlay.banner != self.last_banner {
            match overlay.banner {
                Some(banner) => info!("[frame {}] {}", overlay.sequence, banner),
                None => info!("[frame {}] alert cleared", overlay.sequence),
            }
            self.last_banner = overlay.banner;
        }
        trace!("[frame {}] {}", overlay.sequence, overlay.labels.join(" | "));
        Ok(())
    }
}

/// Draws face boxes and eye contours onto a copy of the frame
#[derive(Debug)]
pub struct ImageRenderSink {
    contour_color: Rgb<u8>,
    face_color: Rgb<u8>,
    alert_color: Rgb<u8>,
    last: Option<RgbImage>,
}

impl Default for ImageRenderSink {
    fn default() -> Self {
        Self {
            contour_color: Rgb([0, 255, 0]),
            face_color: Rgb([255, 255, 255]),
            alert_color: Rgb([255, 0, 0]),
            last: None,
        }
    }
}

impl ImageRenderSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent annotated frame
    pub fn last_frame(&self) -> Option<&RgbImage> {
        self.last.as_ref()
    }
}

impl RenderSink for ImageRenderSink {
    fn render(&mut self, frame: &VideoFrame, overlay: &Overlay) -> Result<(), MonitorError> {
        let mut img = frame
            .to_rgb_image()
            .ok_or_else(|| MonitorError::Render(format!("frame {} has a bad buffer", frame.sequence)))?;

        // Face boxes turn red while an alert is up
        let face_color = if overlay.alert_level.is_alert() {
            self.alert_color
        } else {
            self.face_color
        };
        for region in &overlay.face_regions {
            let (w, h) = (region.width.round() as u32, region.height.round() as u32);
            if w == 0 || h == 0 {
                continue;
            }
            let rect = Rect::at(region.x.round() as i32, region.y.round() as i32).of_size(w, h);
            draw_hollow_rect_mut(&mut img, rect, face_color);
        }

        for contour in &overlay.eye_contours {
            for (i, start) in contour.iter().enumerate() {
                let end = contour[(i + 1) % contour.len()];
                draw_line_segment_mut(&mut img, (start.x, start.y), (end.x, end.y), self.contour_color);
            }
        }

        debug!(
            "Annotated frame {} ({} contours, banner {:?})",
            overlay.sequence,
            overlay.eye_contours.len(),
            overlay.banner
        );
        self.last = Some(img);
        Ok(())
    }
}
