pub mod governor;
pub mod probe;
pub mod state;

pub use governor::AlertGovernor;
pub use probe::HealthProbe;
pub use state::SharedAlertState;
