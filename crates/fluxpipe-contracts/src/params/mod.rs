mod builder;
mod dimensions;
mod flags;
mod fuzzy;
mod request;

pub use builder::{build_request, parse_line, RequestBuild};
pub use dimensions::{
    resolve_shape, snap_dimension, DIMENSION_STEP, MAX_DIMENSION, MIN_DIMENSION,
};
pub use flags::{FlagKind, FlagSpec, FLAG_SPECS};
pub use fuzzy::{fuzzy_match, match_with_threshold, similarity, FuzzyMatch, MIN_SIMILARITY};
pub use request::{
    AspectRatio, GenerationRequest, ImageShape, OutputFormat, ASPECT_RATIO_CHOICES,
    CUSTOM_ASPECT_RATIO, IMAGE_PROMPT_EXTENSIONS, OUTPUT_FORMAT_CHOICES,
};
