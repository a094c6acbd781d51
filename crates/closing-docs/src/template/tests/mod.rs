mod common;
mod passes;
mod substitution;
