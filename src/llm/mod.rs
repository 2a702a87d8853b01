pub mod analysis;
pub mod ats;
pub mod embeddings;
pub mod factory;
pub mod providers;
pub mod rephrase;
