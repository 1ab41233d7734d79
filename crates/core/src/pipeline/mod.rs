pub mod batch_recompose_use_case;
pub mod pipeline_logger;
pub mod recompose_image_use_case;
