pub mod chrome;
pub mod driver;
pub mod scripted;
pub mod types;

pub use chrome::ChromePage;
pub use driver::{PageDriver, read_output_text};
pub use scripted::{OutputModel, OutputRegion, Reactivity, ScriptedPage};
pub use types::{InputEvent, PageError, PageResult};
