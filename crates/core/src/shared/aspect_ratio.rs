use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AspectRatioError {
    #[error("aspect ratio components must be positive, got {width}:{height}")]
    NonPositive { width: u32, height: u32 },
    #[error("aspect ratio must look like W:H (e.g. 4:5), got '{0}'")]
    Malformed(String),
}

/// Required crop proportion `width : height`, both strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AspectRatio {
    width: u32,
    height: u32,
}

impl AspectRatio {
    pub fn new(width: u32, height: u32) -> Result<Self, AspectRatioError> {
        if width == 0 || height == 0 {
            return Err(AspectRatioError::NonPositive { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Prefix prepended to output file names, e.g. `4x5_`.
    pub fn file_prefix(&self) -> String {
        format!("{}x{}_", self.width, self.height)
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            width: 4,
            height: 5,
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = AspectRatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AspectRatioError::Malformed(s.to_string());
        let (w, h) = s.trim().split_once(':').ok_or_else(malformed)?;
        let width = w.trim().parse::<u32>().map_err(|_| malformed())?;
        let height = h.trim().parse::<u32>().map_err(|_| malformed())?;
        Self::new(width, height)
    }
}
