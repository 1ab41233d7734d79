//! Eye-centred portrait recomposition.
//!
//! Finds the eyes in a photo, averages them into a focal point and cuts the
//! largest crop of a chosen aspect ratio that puts that point on the
//! vertical center line, one third of the way down.

pub mod composition;
pub mod detection;
pub mod imaging;
pub mod pipeline;
pub mod shared;
