// Google Translate text-to-speech
//
// The service only accepts short texts, so the text is split into chunks
// that are fetched in order and concatenated into one mp3 file.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{speech_file, SpeechSynthesizer};
use crate::config::TtsConfig;
use crate::error::{SpeechError, SpeechResult};

/// Longest text accepted by the service in one request
const MAX_CHUNK_CHARS: usize = 100;

/// Speech synthesizer backed by Google Translate
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
    max_attempts: u32,
}

impl GoogleTts {
    /// Create a synthesizer from configuration
    pub fn new(config: &TtsConfig) -> SpeechResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// Fetch all chunks of `text`, with retries
    async fn fetch_speech(&self, text: &str, lang: &str) -> SpeechResult<Vec<u8>> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let bytes = self.fetch_chunk_with_retry(chunk, lang, idx, chunks.len()).await?;
            audio.extend_from_slice(&bytes);
        }

        if audio.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(audio)
    }

    async fn fetch_chunk_with_retry(
        &self,
        chunk: &str,
        lang: &str,
        idx: usize,
        total: usize,
    ) -> SpeechResult<Vec<u8>> {
        let mut attempts = 0;
        let mut backoff = Duration::from_secs(1);

        loop {
            attempts += 1;

            match self.fetch_chunk(chunk, lang, idx, total).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    if attempts >= self.max_attempts {
                        error!(
                            error = %e,
                            lang = %lang,
                            attempts = attempts,
                            "Speech fetch failed after all retries"
                        );
                        return Err(e);
                    }

                    warn!(
                        error = %e,
                        attempt = attempts,
                        retry_in_secs = backoff.as_secs(),
                        "Speech fetch failed, retrying"
                    );

                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    /// Single request for one chunk
    async fn fetch_chunk(
        &self,
        chunk: &str,
        lang: &str,
        idx: usize,
        total: usize,
    ) -> SpeechResult<Vec<u8>> {
        debug!(lang = %lang, idx = idx, total = total, "Sending speech request");

        let total = total.to_string();
        let idx = idx.to_string();
        let textlen = chunk.chars().count().to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang),
                ("q", chunk),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, lang = %lang, "Speech service returned error status");
            return Err(SpeechError::InvalidResponse(format!("HTTP {}", status)));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(SpeechError::EmptyAudio);
        }
        Ok(bytes.to_vec())
    }
}

impl SpeechSynthesizer for GoogleTts {
    fn synthesize(&self, text: &str, lang: &str, dest_dir: &Path) -> SpeechResult<PathBuf> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let audio = rt.block_on(self.fetch_speech(text, lang))?;

        let mut file = speech_file(dest_dir)?;
        file.write_all(&audio)?;
        file.flush()?;
        let (_, path) = file.keep().map_err(|e| e.error)?;

        info!(lang = %lang, path = %path.display(), bytes = audio.len(), "Speech synthesized");
        Ok(path)
    }
}

/// Split text into chunks of at most `max_chars` characters
///
/// Splits on whitespace where possible; words longer than a chunk are cut.
fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { word_len + 1 };
        if current_len + needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
