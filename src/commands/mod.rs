pub mod dispatcher;
pub mod executor;
pub mod intent;
pub mod replies;

pub use dispatcher::CommandDispatcher;
pub use executor::ActionExecutor;
