//! Per-frame processing: landmarks -> EAR -> blink state machine.
//!
//! Frames without usable landmarks never reach the blink detector; they are
//! reported as [`FrameOutcome::NoFace`] and the detector state is left as is.

use crate::vision::blink::{BlinkDetector, BlinkDetectorConfig};
use crate::vision::ear::average_ear;
use crate::vision::landmarks::{extract_eyes, LandmarkResult};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    NoFace,
    Face {
        ear: f64,
        is_blinking: bool,
        /// A new blink was counted on this frame.
        blink_started: bool,
        /// The eye reopened on this frame; carries the closed duration in ms.
        blink_ended: Option<i64>,
        total_blinks: u64,
    },
}

impl FrameOutcome {
    pub fn is_face(&self) -> bool {
        matches!(self, Self::Face { .. })
    }

    pub fn blink_started(&self) -> bool {
        matches!(
            self,
            Self::Face {
                blink_started: true,
                ..
            }
        )
    }
}

#[derive(Debug)]
pub struct FrameProcessor {
    detector: BlinkDetector,
    blink_started_at: Option<i64>,
}

impl FrameProcessor {
    pub fn new(config: BlinkDetectorConfig) -> Self {
        Self {
            detector: BlinkDetector::new(config),
            blink_started_at: None,
        }
    }

    pub fn process(
        &mut self,
        result: &LandmarkResult,
        width: f64,
        height: f64,
        timestamp_ms: i64,
    ) -> FrameOutcome {
        let Some((left, right)) = extract_eyes(result, width, height) else {
            return FrameOutcome::NoFace;
        };

        let ear = average_ear(&left, &right);
        let before = self.detector.blink_count();
        let is_blinking = self.detector.detect(ear, timestamp_ms);
        let total_blinks = self.detector.blink_count();

        let blink_started = total_blinks > before;
        if blink_started {
            self.blink_started_at = Some(timestamp_ms);
        }

        let blink_ended = if is_blinking {
            None
        } else {
            self.blink_started_at
                .take()
                .map(|start| timestamp_ms - start)
        };

        FrameOutcome::Face {
            ear,
            is_blinking,
            blink_started,
            blink_ended,
            total_blinks,
        }
    }

    pub fn reset_blink_counter(&mut self) {
        self.detector.reset_blink_counter();
        self.blink_started_at = None;
    }

    pub fn blink_count(&self) -> u64 {
        self.detector.blink_count()
    }

    pub fn detector(&self) -> &BlinkDetector {
        &self.detector
    }

    pub fn dispose(&mut self) {
        self.detector.dispose();
        self.blink_started_at = None;
    }
}
