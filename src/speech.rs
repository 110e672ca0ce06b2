use std::time::Duration;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::config::SpeechConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("no speech API key configured")]
    MissingKey,
    #[error("speech request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("speech API error {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("no speech recognized")]
    NothingRecognized,
}

/// Google Cloud Speech-to-Text v1 request types
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<SpeechResult>,
}

#[derive(Deserialize)]
struct SpeechResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

/// Client for the cloud recognizer. One request per utterance.
pub struct SpeechClient {
    config: SpeechConfig,
    http: reqwest::Client,
}

impl SpeechClient {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Transcribe one utterance of mono WAV audio.
    pub async fn recognize(&self, wav: &[u8], sample_rate: u32) -> Result<String, SpeechError> {
        if self.config.api_key.is_empty() {
            return Err(SpeechError::MissingKey);
        }

        let body = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: sample_rate,
                language_code: &self.config.language,
            },
            audio: RecognitionAudio {
                content: base64::engine::general_purpose::STANDARD.encode(wav),
            },
        };

        log::info!("Submitting {} bytes of audio for recognition", wav.len());
        let resp = self
            .http
            .post(&self.config.api_url)
            .query(&[("key", &self.config.api_key)])
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SpeechError::Status { status, body });
        }

        let parsed: RecognizeResponse = resp.json().await?;
        let transcript = parsed
            .results
            .into_iter()
            .filter_map(|r| r.alternatives.into_iter().next())
            .map(|a| a.transcript.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if transcript.is_empty() {
            return Err(SpeechError::NothingRecognized);
        }
        Ok(transcript)
    }
}

/// Text to insert after a recognized transcript, given whether the input box
/// already holds text. `None` leaves the box untouched.
pub fn transcript_insertion(input_has_text: bool, transcript: &str) -> Option<String> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        None
    } else if input_has_text {
        Some(format!(" {transcript}"))
    } else {
        Some(transcript.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(url: &str, key: &str) -> SpeechClient {
        SpeechClient::new(SpeechConfig {
            api_url: format!("{url}/v1/speech:recognize"),
            api_key: key.into(),
            language: "en-US".into(),
        })
    }

    #[test]
    fn transcript_is_spaced_after_existing_text() {
        assert_eq!(transcript_insertion(false, "hello"), Some("hello".into()));
        assert_eq!(transcript_insertion(true, " hello "), Some(" hello".into()));
        assert_eq!(transcript_insertion(true, "   "), None);
    }

    #[tokio::test]
    async fn joins_first_alternative_of_each_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/speech:recognize")
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "secret".into()))
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "config": {"encoding": "LINEAR16", "sampleRateHertz": 16000, "languageCode": "en-US"},
            })))
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results":[
                    {"alternatives":[{"transcript":"what is","confidence":0.9},{"transcript":"watt is"}]},
                    {"alternatives":[{"transcript":" rust "}]}
                ]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let text = client_for(&server.url(), "secret")
            .recognize(b"RIFF", 16000)
            .await
            .unwrap();
        assert_eq!(text, "what is rust");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_result_is_nothing_recognized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/speech:recognize")
            .match_query(mockito::Matcher::Any)
            .with_body("{}")
            .create_async()
            .await;

        let err = client_for(&server.url(), "secret")
            .recognize(b"RIFF", 16000)
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::NothingRecognized));
    }

    #[tokio::test]
    async fn missing_key_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = client_for(&server.url(), "")
            .recognize(b"RIFF", 16000)
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::MissingKey));
        mock.assert_async().await;
    }
}
