mod tables;

pub use tables::RegistrySchema;
