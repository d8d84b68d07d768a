use crate::detection::domain::face_record::FaceRecord;

/// Terminal outcome of one detection request.
#[derive(Clone, Debug, PartialEq)]
pub enum ResultMessage {
    Success { faces: Vec<FaceRecord>, callback_id: i32 },
    Failure { error: String, callback_id: i32 },
}

impl ResultMessage {
    pub fn success(callback_id: i32, faces: Vec<FaceRecord>) -> Self {
        Self::Success { faces, callback_id }
    }

    pub fn failure(callback_id: i32, error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            callback_id,
        }
    }
}
