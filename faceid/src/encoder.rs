use std::fmt;

use crate::{Encoding, FaceIdError};

/// Detects faces in an image and encodes each one.
///
/// The image is the raw file content (JPEG or PNG). The result holds one
/// [`Encoding`] per detected face, in a stable order for a given input;
/// an image without faces yields an empty vector, not an error.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use. CPU-bound encoders
/// should move their work off the async runtime (e.g. `spawn_blocking`).
#[async_trait::async_trait]
pub trait Encoder: Send + Sync {
    /// Returns the encodings of every face found in `image`.
    async fn detect_and_encode(&self, image: &[u8]) -> Result<Vec<Encoding>, FaceIdError>;

    /// Tag identifying the encoder variant (e.g. "hog", "cnn").
    /// Encodings from different variants must never be mixed.
    fn model_type(&self) -> &str;

    /// Returns the dimensionality of produced encodings (e.g. 128).
    fn dimension(&self) -> usize;
}

impl fmt::Debug for dyn Encoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Encoder")
            .field("model_type", &self.model_type())
            .field("dimension", &self.dimension())
            .finish()
    }
}
