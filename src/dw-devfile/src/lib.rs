mod convert;
mod error;
pub mod factory;

pub use convert::*;
pub use error::ConversionError;
pub use factory::prepare_devfile;
pub use factory::DevfileSource;

/// annotation recording where the devfile came from
pub const DEVFILE_SOURCE_ANNOTATION: &str = "che.eclipse.org/devfile-source";

/// annotation recording the editor the workspace was created with
pub const EDITOR_ANNOTATION: &str = "che.eclipse.org/che-editor";

pub const LAST_UPDATED_ANNOTATION: &str = "che.eclipse.org/last-updated-timestamp";
