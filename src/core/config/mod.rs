mod path;
pub mod settings;

pub use path::*;
pub use settings::*;
