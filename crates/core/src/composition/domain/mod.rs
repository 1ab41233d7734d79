pub mod crop_composer;
pub mod guide_overlay;
