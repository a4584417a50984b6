pub mod migrate;

pub use migrate::auto_migrate;
