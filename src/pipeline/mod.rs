pub mod dimensions;
pub mod fact;
pub mod immigration;
pub mod orchestrator;
pub mod parquet_out;
pub mod quality_gate;
