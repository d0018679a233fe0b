use opencv::{
    core::{Mat, Ptr, Rect},
    prelude::*,
    tracking::{TrackerCSRT, TrackerCSRT_Params, TrackerKCF, TrackerKCF_Params},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bbox::BoundingBox;
use crate::error::Result;

/// Short-term visual tracking capability.
pub trait SubjectTracker {
    /// Start following `bbox` from `frame`, discarding any previous target.
    fn init(&mut self, frame: &Mat, bbox: BoundingBox) -> Result<()>;

    /// Locate the target in a later frame. `None` means the tracker lost it.
    fn update(&mut self, frame: &Mat) -> Result<Option<BoundingBox>>;
}

/// OpenCV tracker algorithm, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    /// Kernelized Correlation Filter: fast, slightly less accurate.
    Kcf,
    /// Discriminative correlation filter with channel reliability: slower, more robust.
    Csrt,
}

enum Backend {
    Kcf(Ptr<TrackerKCF>),
    Csrt(Ptr<TrackerCSRT>),
}

/// Tracking capability backed by OpenCV's contrib trackers.
pub struct OpenCvTracker {
    kind: TrackerKind,
    backend: Option<Backend>,
}

impl OpenCvTracker {
    pub fn new(kind: TrackerKind) -> Self {
        OpenCvTracker { kind, backend: None }
    }

    pub fn kind(&self) -> TrackerKind {
        self.kind
    }

    fn create_backend(&self) -> Result<Backend> {
        let backend = match self.kind {
            TrackerKind::Kcf => {
                let params = TrackerKCF_Params::default()?;
                Backend::Kcf(TrackerKCF::create(params)?)
            }
            TrackerKind::Csrt => {
                let params = TrackerCSRT_Params::default()?;
                Backend::Csrt(TrackerCSRT::create(&params)?)
            }
        };
        Ok(backend)
    }
}

impl SubjectTracker for OpenCvTracker {
    fn init(&mut self, frame: &Mat, bbox: BoundingBox) -> Result<()> {
        // A fresh instance per init: OpenCV trackers cannot be re-targeted.
        self.backend = None;
        let mut backend = self.create_backend()?;
        let rect = Rect::from(bbox);
        match &mut backend {
            Backend::Kcf(t) => t.init(frame, rect)?,
            Backend::Csrt(t) => t.init(frame, rect)?,
        }
        debug!("{:?} tracker initialized on {:?}", self.kind, bbox);
        self.backend = Some(backend);
        Ok(())
    }

    fn update(&mut self, frame: &Mat) -> Result<Option<BoundingBox>> {
        let Some(backend) = self.backend.as_mut() else {
            return Ok(None);
        };
        let mut rect = Rect::default();
        let found = match backend {
            Backend::Kcf(t) => t.update(frame, &mut rect)?,
            Backend::Csrt(t) => t.update(frame, &mut rect)?,
        };
        Ok(self.settle(found, rect))
    }
}

impl OpenCvTracker {
    /// A lost target drops the backend; only a new `init` brings it back.
    fn settle(&mut self, found: bool, rect: Rect) -> Option<BoundingBox> {
        if !found {
            debug!("{:?} tracker lost its target", self.kind);
            self.backend = None;
            return None;
        }
        Some(BoundingBox::from(rect))
    }
}
