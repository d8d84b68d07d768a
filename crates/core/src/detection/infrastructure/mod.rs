pub mod math;
pub mod model_cache;
pub mod model_resolver;
pub mod onnx_detector_factory;
pub mod onnx_face_detector;
