pub mod accumulator;
pub mod frame_batch;
pub mod landmark;
pub mod motion;
pub mod sampler;
pub mod stillness;
