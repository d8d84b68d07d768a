pub mod result_encoder;
