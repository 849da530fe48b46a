pub mod config;
pub mod engine;
pub mod events;
pub mod filter;
pub mod meta;
pub mod scan;
pub mod tasks {
    pub mod runner;
}
