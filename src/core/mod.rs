pub mod fields;
pub mod fingerprint;
pub mod record;
