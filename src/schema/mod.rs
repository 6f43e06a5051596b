/// Parameter declarations and value resolution.
pub mod params;
mod validate;
