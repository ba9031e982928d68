//! Entry content classification and loading

pub mod classifier;
pub mod dimensions;
pub mod loaders;
pub mod registry;

pub use classifier::{ContentClassifier, ContentType};
pub use dimensions::image_dimensions;
pub use loaders::{ComicInfoLoader, PageImageLoader};
pub use registry::{DispatchOutcome, EntryLoader, EntryLoaderRegistry};
