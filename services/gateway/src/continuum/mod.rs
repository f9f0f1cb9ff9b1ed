//! Continuum-backend adapters (spec §4.4, §6 "`/continuum/*` routes").

pub mod direct;
pub mod json;
pub mod status;
pub mod stream;
pub mod submit;
pub mod tx_lookup;
