mod common;
mod orchestrator;
mod tracker;
