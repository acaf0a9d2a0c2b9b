mod comm;
mod function;
mod material;
mod microstructure;
mod partition;
mod process;
mod slip;
