//! Ordered playback of streamed speech chunks with barge-in support.
//!
//! The sequencer owns a FIFO of decoded chunks and plays them one at a time
//! through an [`AudioOutput`]. An interruption drops everything queued and
//! ignores new chunks until the next final agent utterance resumes it.

use std::collections::VecDeque;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use shopbot_core::events::AudioChunk;

use crate::error::ClientError;

/// Result of handing one chunk to an output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayStatus {
    /// Playback started; the device reports the end through
    /// [`AudioSequencer::on_playback_ended`].
    Started,
    /// The chunk was consumed synchronously.
    Finished,
}

/// Sink for decoded audio.
pub trait AudioOutput: Send {
    fn play(&mut self, audio: &[u8]) -> Result<PlayStatus, ClientError>;

    /// Stop whatever is currently sounding.
    fn halt(&mut self);
}

/// Output that discards audio immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play(&mut self, _audio: &[u8]) -> Result<PlayStatus, ClientError> {
        Ok(PlayStatus::Finished)
    }

    fn halt(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

pub struct AudioSequencer {
    output: Box<dyn AudioOutput>,
    queue: VecDeque<Vec<u8>>,
    state: PlaybackState,
    interrupted: bool,
}

impl fmt::Debug for AudioSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioSequencer")
            .field("queued", &self.queue.len())
            .field("state", &self.state)
            .field("interrupted", &self.interrupted)
            .finish()
    }
}

impl Default for AudioSequencer {
    fn default() -> Self {
        Self::new(Box::new(NullOutput))
    }
}

impl AudioSequencer {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output,
            queue: VecDeque::new(),
            state: PlaybackState::Idle,
            interrupted: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Decode a wire chunk and queue it. Returns false when the chunk was
    /// dropped because playback is interrupted.
    pub fn enqueue(&mut self, chunk: &AudioChunk) -> Result<bool, ClientError> {
        let bytes = STANDARD
            .decode(chunk.chunk.as_bytes())
            .map_err(|e| ClientError::Audio(format!("invalid base64 audio: {}", e)))?;
        Ok(self.enqueue_bytes(bytes))
    }

    pub fn enqueue_bytes(&mut self, bytes: Vec<u8>) -> bool {
        if self.interrupted {
            tracing::debug!("Dropping audio chunk while interrupted");
            return false;
        }
        self.queue.push_back(bytes);
        if self.state == PlaybackState::Idle {
            self.play_next();
        }
        true
    }

    /// Called by the output device when the current chunk finished.
    pub fn on_playback_ended(&mut self) {
        if self.interrupted {
            self.state = PlaybackState::Idle;
            return;
        }
        self.play_next();
    }

    pub fn interrupt(&mut self) {
        self.interrupted = true;
        self.queue.clear();
        self.output.halt();
        self.state = PlaybackState::Idle;
    }

    pub fn resume(&mut self) {
        self.interrupted = false;
    }

    /// Full reset, used on session teardown.
    pub fn stop(&mut self) {
        self.queue.clear();
        self.output.halt();
        self.state = PlaybackState::Idle;
        self.interrupted = false;
    }

    fn play_next(&mut self) {
        while let Some(chunk) = self.queue.pop_front() {
            self.state = PlaybackState::Playing;
            match self.output.play(&chunk) {
                Ok(PlayStatus::Started) => return,
                Ok(PlayStatus::Finished) => continue,
                Err(e) => {
                    tracing::warn!("Audio chunk failed to play: {}", e);
                    continue;
                }
            }
        }
        self.state = PlaybackState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Device that holds each chunk until the test ends it.
    #[derive(Clone, Default)]
    struct ManualOutput {
        played: Arc<Mutex<Vec<Vec<u8>>>>,
        halts: Arc<Mutex<usize>>,
    }

    impl AudioOutput for ManualOutput {
        fn play(&mut self, audio: &[u8]) -> Result<PlayStatus, ClientError> {
            self.played.lock().unwrap().push(audio.to_vec());
            Ok(PlayStatus::Started)
        }

        fn halt(&mut self) {
            *self.halts.lock().unwrap() += 1;
        }
    }

    fn manual() -> (AudioSequencer, ManualOutput) {
        let output = ManualOutput::default();
        (AudioSequencer::new(Box::new(output.clone())), output)
    }

    #[test]
    fn test_plays_in_order() {
        let (mut seq, out) = manual();
        assert!(seq.enqueue_bytes(vec![1]));
        assert!(seq.enqueue_bytes(vec![2]));
        assert_eq!(seq.state(), PlaybackState::Playing);
        assert_eq!(seq.queued(), 1);
        seq.on_playback_ended();
        seq.on_playback_ended();
        assert_eq!(seq.state(), PlaybackState::Idle);
        assert_eq!(*out.played.lock().unwrap(), vec![vec![1], vec![2]]);
    }

    #[test]
    fn test_interrupt_drops_until_resume() {
        let (mut seq, out) = manual();
        seq.enqueue_bytes(vec![1]);
        seq.enqueue_bytes(vec![2]);
        seq.interrupt();
        assert_eq!(seq.state(), PlaybackState::Idle);
        assert_eq!(seq.queued(), 0);
        assert_eq!(*out.halts.lock().unwrap(), 1);

        assert!(!seq.enqueue_bytes(vec![3]));
        assert_eq!(seq.queued(), 0);

        seq.resume();
        assert!(seq.enqueue_bytes(vec![4]));
        assert_eq!(*out.played.lock().unwrap(), vec![vec![1], vec![4]]);
    }

    #[test]
    fn test_playback_end_while_interrupted_goes_idle() {
        let (mut seq, out) = manual();
        seq.enqueue_bytes(vec![1]);
        seq.interrupt();
        seq.on_playback_ended();
        assert_eq!(seq.state(), PlaybackState::Idle);
        assert_eq!(out.played.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_stop_clears_interrupt() {
        let (mut seq, _out) = manual();
        seq.interrupt();
        seq.stop();
        assert!(!seq.is_interrupted());
        assert!(seq.enqueue_bytes(vec![9]));
    }

    #[test]
    fn test_enqueue_decodes_base64() {
        let (mut seq, out) = manual();
        let chunk = AudioChunk {
            chunk: "UklGRg==".to_string(),
        };
        assert!(seq.enqueue(&chunk).unwrap());
        assert_eq!(out.played.lock().unwrap()[0], b"RIFF".to_vec());

        let bad = AudioChunk {
            chunk: "***".to_string(),
        };
        assert!(matches!(seq.enqueue(&bad), Err(ClientError::Audio(_))));
    }

    #[test]
    fn test_null_output_drains_synchronously() {
        let mut seq = AudioSequencer::default();
        seq.enqueue_bytes(vec![1]);
        seq.enqueue_bytes(vec![2]);
        assert_eq!(seq.state(), PlaybackState::Idle);
        assert_eq!(seq.queued(), 0);
    }
}
