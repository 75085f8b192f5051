// quant-sweep - sequential bfloat16 / int8 training sweep
// Library exports

pub mod archive; // Remote copy of metrics files
pub mod config;
pub mod errors;
pub mod training; // Run specifications, trainer launch, sweep loop
