//! Service providers started by the [`SystemCoordinator`](crate::coordinator::SystemCoordinator).

pub mod night_dim;
pub mod traits;
pub mod tsp;
pub mod udfps;

pub use night_dim::NightDimServiceProvider;
pub use traits::ServiceProvider;
pub use tsp::SecTspServiceProvider;
pub use udfps::UdfpsServiceProvider;
