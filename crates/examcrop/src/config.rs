//! Run configuration, resolved once from command-line flags and environment
//! variables and passed down explicitly.

use std::path::PathBuf;

use examcrop_core::plan::PlanOptions;
use pdf::crop::{BLANK_HEIGHT, BLANK_WIDTH};

use crate::prelude::*;

pub const DEFAULT_ZOOM: f32 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Raster scale factor applied to page points.
    pub zoom: f32,
    pub blank_width: u32,
    pub blank_height: u32,
    /// Pad every question to ten slots with trailing blanks.
    pub fillers: bool,
    pub output_dir: PathBuf,
    /// Directory holding the pdfium shared library. `None` uses the system
    /// library search path.
    pub pdfium_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            zoom: DEFAULT_ZOOM,
            blank_width: BLANK_WIDTH,
            blank_height: BLANK_HEIGHT,
            fillers: true,
            output_dir: PathBuf::from("output"),
            pdfium_path: None,
        }
    }
}

impl Config {
    pub fn from_global(global: &crate::Global) -> Result<Self> {
        let config = Config {
            zoom: global.zoom,
            blank_width: global.blank_width,
            blank_height: global.blank_height,
            fillers: !global.no_fillers,
            output_dir: global.output_dir.clone(),
            pdfium_path: global.pdfium_path.clone(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            return Err(eyre!("zoom must be a positive number, got {}", self.zoom));
        }
        if self.blank_width == 0 || self.blank_height == 0 {
            return Err(eyre!(
                "blank placeholder size must be non-zero, got {}x{}",
                self.blank_width,
                self.blank_height
            ));
        }
        Ok(())
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            fillers: self.fillers,
        }
    }
}
