pub mod composite;
pub mod mindicador;
pub mod quotes;
pub mod util;

pub use composite::CompositeSource;
