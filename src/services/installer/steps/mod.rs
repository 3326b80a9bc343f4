pub mod batch_file;
pub mod composite;
pub mod exception_callback;
pub mod flag_file;
pub mod path_env;
pub mod resource_file;

pub use batch_file::CreateBatchFileStep;
pub use composite::CompositeStep;
pub use exception_callback::{default_exception_handler, ExceptionCallbackStep, ExceptionHandler};
pub use flag_file::InstallationFlagFileStep;
pub use path_env::AddDirectoryToPathStep;
pub use resource_file::{EmbeddedResource, SaveResourceToFileStep};
