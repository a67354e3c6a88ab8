use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::encoder::Encoder;
use crate::{Encoding, FaceIdError};

/// Default encoder variant.
pub const DEFAULT_MODEL_TYPE: &str = "hog";

/// Default encoding dimensionality.
pub const DEFAULT_DIMENSION: usize = 128;

/// Connection settings for [`HttpEncoder`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpEncoderConfig {
    /// Service root, e.g. `http://127.0.0.1:9000`.
    #[serde(default)]
    pub base_url: String,

    /// Bearer token (optional).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    /// Detection model requested from the service. Empty uses "hog".
    #[serde(default)]
    pub model_type: String,

    /// Expected dimensionality. Zero uses 128.
    #[serde(default)]
    pub dimension: usize,
}

/// Encoder backed by an external face-encoding service.
///
/// Sends the raw image as `POST {base_url}/encode?model={model_type}` and
/// expects `{"faces": [{"encoding": [...]}, ...]}` in return.
#[derive(Debug)]
pub struct HttpEncoder {
    client: Client,
    base_url: String,
    api_key: String,
    model_type: String,
    dim: usize,
}

#[derive(Deserialize)]
struct EncodeResponse {
    #[serde(default)]
    faces: Vec<EncodedFace>,
}

#[derive(Deserialize)]
struct EncodedFace {
    encoding: Vec<f64>,
}

impl HttpEncoder {
    pub fn new(cfg: HttpEncoderConfig) -> Result<Self, FaceIdError> {
        if cfg.base_url.is_empty() {
            return Err(FaceIdError::Configuration(
                "encoder base_url is required".into(),
            ));
        }
        Ok(Self {
            client: Client::new(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key,
            model_type: if cfg.model_type.is_empty() {
                DEFAULT_MODEL_TYPE.to_string()
            } else {
                cfg.model_type
            },
            dim: if cfg.dimension == 0 {
                DEFAULT_DIMENSION
            } else {
                cfg.dimension
            },
        })
    }
}

#[async_trait::async_trait]
impl Encoder for HttpEncoder {
    async fn detect_and_encode(&self, image: &[u8]) -> Result<Vec<Encoding>, FaceIdError> {
        let url = format!("{}/encode", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .query(&[("model", self.model_type.as_str())])
            .header("Content-Type", "application/octet-stream")
            .body(image.to_vec());
        if !self.api_key.is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FaceIdError::Encoder(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FaceIdError::Encoder(format!("HTTP {status}: {body}")));
        }

        let data: EncodeResponse = resp
            .json()
            .await
            .map_err(|e| FaceIdError::Encoder(e.to_string()))?;

        data.faces
            .into_iter()
            .map(|face| {
                if face.encoding.len() != self.dim {
                    return Err(FaceIdError::DimensionMismatch {
                        expected: self.dim,
                        got: face.encoding.len(),
                    });
                }
                Ok(Encoding::new(
                    face.encoding.iter().map(|&v| v as f32).collect(),
                ))
            })
            .collect()
    }

    fn model_type(&self) -> &str {
        &self.model_type
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied() {
        let enc = HttpEncoder::new(HttpEncoderConfig {
            base_url: "http://127.0.0.1:9000/".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(enc.model_type(), "hog");
        assert_eq!(enc.dimension(), 128);
        assert_eq!(enc.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn missing_url_is_configuration_error() {
        let err = HttpEncoder::new(HttpEncoderConfig::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn response_without_faces_is_empty() {
        let data: EncodeResponse = serde_json::from_str("{}").unwrap();
        assert!(data.faces.is_empty());
        let data: EncodeResponse =
            serde_json::from_str(r#"{"faces":[{"encoding":[0.5,1.5],"location":[1,2,3,4]}]}"#)
                .unwrap();
        assert_eq!(data.faces[0].encoding, vec![0.5, 1.5]);
    }
}
