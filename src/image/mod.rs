pub mod depth;
pub mod f64;
pub mod io;
pub mod traits;

pub use self::depth::DepthImage;
pub use self::f64::ImageF64;
pub use self::traits::{ImageView, ImageViewMut};
