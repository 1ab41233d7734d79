pub mod aspect_ratio;
pub mod bounding_box;
pub mod constants;
pub mod crop_rect;
pub mod frame;
pub mod model_resolver;
pub mod point;
