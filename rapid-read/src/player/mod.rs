//! Playback controller: sequences chunks through synthesis, audio
//! playback, and the word display loop.
//!
//! The controller reconciles two independently progressing clocks, the
//! audio position and the display timer, and guarantees that no display
//! tick computed for an old chunk fires after a seek. Every transition
//! that changes the chunk or discards the schedule bumps a session epoch
//! and cancels the pending timers; timer callbacks re-check the epoch
//! under the lock before touching anything.

pub mod device;
pub mod timer;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, Notify};

use crate::schedule::{WordSlot, build_schedule};
use crate::ssml::{SpeechStyle, build_ssml};
use crate::text::Chunk;
use device::{AudioHandle, AudioOutput};
use speech_client::{SpeechError, SpeechProvider};
use timer::TimerToken;

/// Display may run this far ahead of the audio before correction kicks in.
const DRIFT_THRESHOLD_MS: u64 = 100;

/// Words at or below this duration are never shortened for correction.
const MIN_DURATION_FOR_CORRECTION_MS: u64 = 100;

/// Amount the next wait is shortened when drift correction fires.
const CORRECTION_MS: u64 = 100;

#[derive(Error, Debug)]
pub enum PlayerError {
    #[error("document produced no readable text")]
    EmptyDocument,

    #[error("chunk index {index} out of range ({len} chunks)")]
    ChunkOutOfRange { index: usize, len: usize },

    #[error("invalid transition: {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error(transparent)]
    Synthesis(#[from] SpeechError),

    #[error("audio device error: {0}")]
    Device(String),
}

/// Phase of the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Speaking,
    Paused,
    Finished,
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Speaking => "speaking",
            Phase::Paused => "paused",
            Phase::Finished => "finished",
        }
    }
}

/// Callback receiving each word as it is due on screen.
pub type WordCallback = dyn Fn(&WordSlot) + Send + Sync;

/// Mutable session state, guarded by the controller's lock.
struct Session {
    schedule: Vec<WordSlot>,
    chunk_index: usize,
    word_index: usize,
    phase: Phase,
    /// Bumped on every transition that invalidates scheduled work.
    epoch: u64,
    device: Option<Box<dyn AudioHandle>>,
    pending_tick: Option<TimerToken>,
    pending_chunk: Option<TimerToken>,
    /// The in-flight synthesis task, if any. At most one per session.
    pending_synth: Option<tokio::task::AbortHandle>,
}

impl Session {
    fn cancel_pending(&mut self) {
        if let Some(token) = self.pending_tick.take() {
            token.cancel();
        }
        if let Some(token) = self.pending_chunk.take() {
            token.cancel();
        }
        if let Some(handle) = self.pending_synth.take() {
            handle.abort();
        }
    }

    fn release_device(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.stop();
        }
    }
}

/// The playback controller. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Player {
    inner: Arc<Mutex<Session>>,
    chunks: Arc<Vec<Chunk>>,
    provider: Arc<dyn SpeechProvider>,
    output: Arc<dyn AudioOutput>,
    style: SpeechStyle,
    window: usize,
    audio_dir: PathBuf,
    on_word: Arc<WordCallback>,
    done: Arc<Notify>,
}

impl Player {
    /// Create a controller over the given chunks.
    ///
    /// `on_word` is the sole rendering side-channel; it is invoked from
    /// the display loop after the session lock is released and must not
    /// call back into the player.
    pub fn new(
        chunks: Vec<Chunk>,
        provider: Arc<dyn SpeechProvider>,
        output: Arc<dyn AudioOutput>,
        style: SpeechStyle,
        window: usize,
        audio_dir: PathBuf,
        on_word: Arc<WordCallback>,
    ) -> Result<Self, PlayerError> {
        if chunks.is_empty() {
            return Err(PlayerError::EmptyDocument);
        }
        Ok(Self {
            inner: Arc::new(Mutex::new(Session {
                schedule: Vec::new(),
                chunk_index: 0,
                word_index: 0,
                phase: Phase::Idle,
                epoch: 0,
                device: None,
                pending_tick: None,
                pending_chunk: None,
                pending_synth: None,
            })),
            chunks: Arc::new(chunks),
            provider,
            output,
            style,
            window,
            audio_dir,
            on_word,
            done: Arc::new(Notify::new()),
        })
    }

    /// `(chunk_index, preview)` pairs for every chunk, in reading order.
    pub fn table_of_contents(&self) -> Vec<(usize, String)> {
        self.chunks
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.preview().to_string()))
            .collect()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase
    }

    /// Current `(chunk_index, word_index)`.
    pub async fn position(&self) -> (usize, usize) {
        let session = self.inner.lock().await;
        (session.chunk_index, session.word_index)
    }

    /// Begin reading at `chunk_index`.
    pub async fn play_from(&self, chunk_index: usize) -> Result<(), PlayerError> {
        if chunk_index >= self.chunks.len() {
            return Err(PlayerError::ChunkOutOfRange {
                index: chunk_index,
                len: self.chunks.len(),
            });
        }
        self.start(chunk_index).await
    }

    /// Jump to an arbitrary chunk, from any phase.
    pub async fn jump_to(&self, chunk_index: usize) -> Result<(), PlayerError> {
        self.play_from(chunk_index).await
    }

    /// Resume from `Paused`, or begin from `Idle`.
    pub async fn play(&self) -> Result<(), PlayerError> {
        let (phase, chunk_index) = {
            let session = self.inner.lock().await;
            (session.phase, session.chunk_index)
        };
        match phase {
            Phase::Paused => self.resume().await,
            Phase::Idle => self.start(chunk_index).await,
            other => Err(PlayerError::InvalidTransition {
                action: "play",
                state: other.name(),
            }),
        }
    }

    /// Pause audio and the display loop, keeping the current position.
    pub async fn pause(&self) -> Result<(), PlayerError> {
        let mut session = self.inner.lock().await;
        if session.phase != Phase::Speaking {
            return Err(PlayerError::InvalidTransition {
                action: "pause",
                state: session.phase.name(),
            });
        }
        log::info!("pause at chunk {} word {}", session.chunk_index, session.word_index);
        session.cancel_pending();
        if let Some(device) = session.device.as_mut() {
            device.pause();
        }
        session.phase = Phase::Paused;
        Ok(())
    }

    /// Resume audio and re-render the current word before continuing.
    pub async fn resume(&self) -> Result<(), PlayerError> {
        let mut session = self.inner.lock().await;
        if session.phase != Phase::Paused {
            return Err(PlayerError::InvalidTransition {
                action: "resume",
                state: session.phase.name(),
            });
        }
        let chunk_index = session.chunk_index;
        let word_index = session.word_index;
        let Some(device) = session.device.as_mut() else {
            // Paused after a failed load; only restart() can retry.
            return Err(PlayerError::InvalidTransition {
                action: "resume",
                state: "paused without audio",
            });
        };
        log::info!("resume at chunk {} word {}", chunk_index, word_index);
        device.resume();
        session.phase = Phase::Speaking;
        let epoch = session.epoch;
        let word_index = session.word_index;
        session.pending_tick = Some(self.schedule_tick(word_index, 0, epoch));
        Ok(())
    }

    /// Re-synthesize and replay the previous chunk. No-op at chunk 0.
    pub async fn back(&self) -> Result<(), PlayerError> {
        let target = {
            let session = self.inner.lock().await;
            self.require_seekable("back", session.phase)?;
            if session.chunk_index == 0 {
                log::warn!("already at the first chunk");
                return Ok(());
            }
            session.chunk_index - 1
        };
        self.start(target).await
    }

    /// Re-synthesize and replay the current chunk from word 0.
    pub async fn restart(&self) -> Result<(), PlayerError> {
        let target = {
            let session = self.inner.lock().await;
            self.require_seekable("restart", session.phase)?;
            session.chunk_index
        };
        self.start(target).await
    }

    /// Advance to the next chunk; finishes the session at the last one.
    pub async fn skip(&self) -> Result<(), PlayerError> {
        let target = {
            let session = self.inner.lock().await;
            self.require_seekable("skip", session.phase)?;
            session.chunk_index + 1
        };
        self.start(target).await
    }

    /// Resolves once every chunk has been read.
    pub async fn wait_until_finished(&self) {
        loop {
            let notified = self.done.notified();
            if self.inner.lock().await.phase == Phase::Finished {
                return;
            }
            notified.await;
        }
    }

    fn require_seekable(&self, action: &'static str, phase: Phase) -> Result<(), PlayerError> {
        match phase {
            Phase::Speaking | Phase::Paused => Ok(()),
            other => Err(PlayerError::InvalidTransition {
                action,
                state: other.name(),
            }),
        }
    }

    /// Tear down the current chunk and bring up `chunk_index`.
    ///
    /// Cancels pending timers, aborts any in-flight synthesis, and stops
    /// the audio device before mutating anything. The new synthesis runs
    /// in its own task whose abort handle is registered in the session
    /// before the lock is released, so at most one request is ever in
    /// flight; a result arriving after a newer transition (stale epoch)
    /// is discarded.
    async fn start(&self, chunk_index: usize) -> Result<(), PlayerError> {
        let handle = {
            let mut session = self.inner.lock().await;
            session.cancel_pending();
            session.release_device();
            session.epoch += 1;
            session.schedule.clear();
            session.word_index = 0;

            if chunk_index >= self.chunks.len() {
                session.phase = Phase::Finished;
                log::info!("all {} chunks read", self.chunks.len());
                self.done.notify_waiters();
                return Ok(());
            }

            session.chunk_index = chunk_index;
            session.phase = Phase::Loading;
            let chunk = &self.chunks[chunk_index];
            log::info!(
                "loading chunk {} (tokens {}..{})",
                chunk_index,
                chunk.start_token,
                chunk.end_token()
            );
            let ssml = build_ssml(chunk, &self.style);
            let epoch = session.epoch;

            let player = self.clone();
            let handle =
                tokio::spawn(async move { player.load_chunk(chunk_index, ssml, epoch).await });
            session.pending_synth = Some(handle.abort_handle());
            handle
        };

        match handle.await {
            Ok(result) => result,
            // The task only ends early when a newer transition aborted
            // it; that transition owns the session now.
            Err(_) => Ok(()),
        }
    }

    /// Synthesize `chunk_index` and, if the session has not moved on,
    /// install its schedule and begin playback.
    async fn load_chunk(
        &self,
        chunk_index: usize,
        ssml: String,
        epoch: u64,
    ) -> Result<(), PlayerError> {
        let audio_path = self.audio_dir.join(format!("chunk-{chunk_index:04}.mp3"));
        let synth = match self.provider.synthesize(&ssml, &audio_path).await {
            Ok(synth) => synth,
            Err(e) => {
                let mut session = self.inner.lock().await;
                if session.epoch == epoch {
                    // Leave the session resumable: restart() retries this
                    // chunk. No automatic retry.
                    session.phase = Phase::Paused;
                }
                return Err(e.into());
            }
        };

        let mut session = self.inner.lock().await;
        if session.epoch != epoch {
            // A seek arrived while synthesizing; drop this result.
            log::debug!("discarding stale synthesis for chunk {chunk_index}");
            return Ok(());
        }

        let schedule = build_schedule(&synth.word_events, synth.total_duration_ms, self.window);
        if schedule.is_empty() {
            log::warn!("chunk {chunk_index} produced no word events, skipping forward");
            session.pending_chunk = Some(self.schedule_chunk(chunk_index + 1, 0));
            return Ok(());
        }

        let minutes = synth.total_duration_ms as f64 / 60_000.0;
        log::info!(
            "chunk {}: {} words, {} ms audio, {:.0} wpm",
            chunk_index,
            schedule.len(),
            synth.total_duration_ms,
            if minutes > 0.0 {
                schedule.len() as f64 / minutes
            } else {
                0.0
            }
        );

        let mut device = match self.output.load(&synth.audio_path) {
            Ok(device) => device,
            Err(e) => {
                session.phase = Phase::Paused;
                return Err(PlayerError::Device(format!("{e:#}")));
            }
        };
        device.play();
        session.device = Some(device);
        session.schedule = schedule;
        session.phase = Phase::Speaking;
        session.pending_tick = Some(self.schedule_tick(0, 0, epoch));
        Ok(())
    }

    /// Schedule the display tick for `word_index`. Boxed future so the
    /// tick cycle stays finite for the compiler.
    fn schedule_tick(&self, word_index: usize, delay_ms: u64, epoch: u64) -> TimerToken {
        let player = self.clone();
        timer::after(delay_ms, move || {
            Box::pin(async move {
                player.tick(word_index, epoch).await;
            }) as std::pin::Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    /// Schedule a chunk transition, boxed for the same reason.
    fn schedule_chunk(&self, chunk_index: usize, delay_ms: u64) -> TimerToken {
        let player = self.clone();
        timer::after(delay_ms, move || {
            Box::pin(async move {
                if let Err(e) = player.start(chunk_index).await {
                    log::error!("failed to start chunk {chunk_index}: {e}");
                }
            }) as std::pin::Pin<Box<dyn Future<Output = ()> + Send>>
        })
    }

    /// One display tick: render the word at `word_index`, then schedule
    /// the next tick after its duration, shortened if the display has
    /// drifted ahead of the audio.
    async fn tick(&self, word_index: usize, epoch: u64) {
        let slot = {
            let mut session = self.inner.lock().await;
            if session.epoch != epoch || session.phase != Phase::Speaking {
                return;
            }

            if word_index == session.schedule.len() {
                // Chunk finished: stop audio, hand over to the next chunk.
                session.release_device();
                let next = session.chunk_index + 1;
                session.pending_chunk = Some(self.schedule_chunk(next, 0));
                return;
            }

            session.word_index = word_index;
            let slot = session.schedule[word_index].clone();

            let mut delay_ms = slot.duration_ms;
            if let Some(device) = session.device.as_ref() {
                let audio_pos = device.position_ms();
                let nominal_end = slot.offset_ms + slot.duration_ms;
                if audio_pos > nominal_end
                    && audio_pos - nominal_end > DRIFT_THRESHOLD_MS
                    && slot.duration_ms > MIN_DURATION_FOR_CORRECTION_MS
                {
                    log::debug!(
                        "display {} ms ahead of audio at word {}, shortening next wait",
                        audio_pos - nominal_end,
                        word_index
                    );
                    delay_ms = delay_ms.saturating_sub(CORRECTION_MS);
                }
            }

            session.pending_tick = Some(self.schedule_tick(word_index + 1, delay_ms, epoch));
            slot
        };

        (self.on_word)(&slot);
    }

    #[cfg(test)]
    async fn unsettled_timers(&self) -> usize {
        let session = self.inner.lock().await;
        [&session.pending_tick, &session.pending_chunk]
            .into_iter()
            .flatten()
            .filter(|t| !t.is_settled())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{BlockTag, TextBlock, chunk_blocks};
    use speech_client::{MockSpeech, Synthesis};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Fake audio output whose position follows the (paused) tokio clock,
    /// optionally skewed ahead to provoke drift correction.
    struct FakeOutput {
        skew_ms: Arc<AtomicU64>,
    }

    struct FakeHandle {
        loaded_at: Instant,
        skew_ms: Arc<AtomicU64>,
        playing: bool,
    }

    impl AudioOutput for FakeOutput {
        fn load(&self, _path: &std::path::Path) -> anyhow::Result<Box<dyn AudioHandle>> {
            Ok(Box::new(FakeHandle {
                loaded_at: Instant::now(),
                skew_ms: Arc::clone(&self.skew_ms),
                playing: false,
            }))
        }
    }

    impl AudioHandle for FakeHandle {
        fn play(&mut self) {
            self.playing = true;
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn resume(&mut self) {
            self.playing = true;
        }
        fn stop(&mut self) {
            self.playing = false;
        }
        fn position_ms(&self) -> u64 {
            self.loaded_at.elapsed().as_millis() as u64 + self.skew_ms.load(Ordering::SeqCst)
        }
        fn is_playing(&self) -> bool {
            self.playing
        }
    }

    struct Harness {
        player: Player,
        rendered: Arc<StdMutex<Vec<(String, Instant)>>>,
        skew_ms: Arc<AtomicU64>,
        _audio_dir: tempfile::TempDir,
    }

    fn harness_with(provider: Arc<dyn SpeechProvider>, bodies: &[&str]) -> Harness {
        let blocks: Vec<TextBlock> = bodies
            .iter()
            .map(|b| TextBlock::new(BlockTag::Body, *b))
            .collect();
        // One block per chunk keeps each chunk's word list predictable.
        let chunks = chunk_blocks(&blocks, 1);

        let rendered: Arc<StdMutex<Vec<(String, Instant)>>> =
            Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&rendered);
        let skew_ms = Arc::new(AtomicU64::new(0));
        let audio_dir = tempfile::tempdir().unwrap();

        let player = Player::new(
            chunks,
            provider,
            Arc::new(FakeOutput {
                skew_ms: Arc::clone(&skew_ms),
            }),
            SpeechStyle::default(),
            5,
            audio_dir.path().to_path_buf(),
            Arc::new(move |slot: &WordSlot| {
                sink.lock().unwrap().push((slot.word.clone(), Instant::now()));
            }),
        )
        .unwrap();

        Harness {
            player,
            rendered,
            skew_ms,
            _audio_dir: audio_dir,
        }
    }

    fn harness(bodies: &[&str]) -> Harness {
        harness_with(
            Arc::new(MockSpeech::always_succeeds().with_ms_per_word(300)),
            bodies,
        )
    }

    impl Harness {
        fn words(&self) -> Vec<String> {
            self.rendered
                .lock()
                .unwrap()
                .iter()
                .map(|(w, _)| w.clone())
                .collect()
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    #[test]
    fn test_empty_document_rejected() {
        let result = Player::new(
            Vec::new(),
            Arc::new(MockSpeech::always_succeeds()),
            Arc::new(FakeOutput {
                skew_ms: Arc::new(AtomicU64::new(0)),
            }),
            SpeechStyle::default(),
            5,
            PathBuf::from("/tmp"),
            Arc::new(|_: &WordSlot| {}),
        );
        assert!(matches!(result, Err(PlayerError::EmptyDocument)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_words_render_in_order_and_session_finishes() {
        let h = harness(&["alpha beta", "gamma"]);
        h.player.play_from(0).await.unwrap();
        settle().await;
        assert_eq!(h.words(), vec!["alpha"]);

        // Let both chunks play out: 2 * 300ms + 1 * 300ms plus transitions.
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(h.words(), vec!["alpha", "beta", "gamma"]);
        assert_eq!(h.player.phase().await, Phase::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_finished_resolves() {
        let h = harness(&["one"]);
        h.player.play_from(0).await.unwrap();

        let waiter = {
            let player = h.player.clone();
            tokio::spawn(async move { player.wait_until_finished().await })
        };
        tokio::time::sleep(Duration::from_millis(500)).await;
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_then_back_matches_direct_starts() {
        let h = harness(&["one", "two", "three"]);
        h.player.play_from(0).await.unwrap();
        settle().await;

        h.player.skip().await.unwrap();
        settle().await;
        assert_eq!(h.player.position().await, (1, 0));

        h.player.back().await.unwrap();
        settle().await;
        assert_eq!(h.player.position().await, (0, 0));
        assert_eq!(h.player.phase().await, Phase::Speaking);

        // Each seek restarted its chunk from word 0 with a fresh schedule.
        assert_eq!(h.words(), vec!["one", "two", "one"]);
        // Only the live tick may remain pending.
        assert!(h.player.unsettled_timers().await <= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_back_at_first_chunk_is_noop() {
        let h = harness(&["one", "two"]);
        h.player.play_from(0).await.unwrap();
        settle().await;

        h.player.back().await.unwrap();
        settle().await;
        assert_eq!(h.player.position().await, (0, 0));
        assert_eq!(h.player.phase().await, Phase::Speaking);
        // No re-synthesis happened: the word was not rendered again.
        assert_eq!(h.words(), vec!["one"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_at_last_chunk_finishes() {
        let h = harness(&["one", "two"]);
        h.player.play_from(1).await.unwrap();
        settle().await;

        h.player.skip().await.unwrap();
        assert_eq!(h.player.phase().await, Phase::Finished);
        assert_eq!(h.player.unsettled_timers().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replays_current_chunk() {
        let h = harness(&["alpha beta"]);
        h.player.play_from(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(320)).await;
        assert_eq!(h.words(), vec!["alpha", "beta"]);

        h.player.restart().await.unwrap();
        settle().await;
        assert_eq!(h.words(), vec!["alpha", "beta", "alpha"]);
        assert_eq!(h.player.position().await, (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_twice_is_misuse() {
        let h = harness(&["one two three"]);
        h.player.play_from(0).await.unwrap();
        settle().await;

        h.player.pause().await.unwrap();
        let second = h.player.pause().await;
        assert!(matches!(
            second,
            Err(PlayerError::InvalidTransition { action: "pause", .. })
        ));
        // State unchanged by the rejected call.
        assert_eq!(h.player.phase().await, Phase::Paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_display_and_resume_rerenders() {
        let h = harness(&["one two three"]);
        h.player.play_from(0).await.unwrap();
        settle().await;
        assert_eq!(h.words(), vec!["one"]);

        h.player.pause().await.unwrap();
        assert_eq!(h.player.unsettled_timers().await, 0);

        // Nothing renders while paused.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(h.words(), vec!["one"]);

        h.player.resume().await.unwrap();
        settle().await;
        // The current word is re-rendered, then playback continues.
        assert_eq!(h.words(), vec!["one", "one"]);
        tokio::time::sleep(Duration::from_millis(320)).await;
        assert_eq!(h.words(), vec!["one", "one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_while_speaking_is_misuse() {
        let h = harness(&["one two"]);
        h.player.play_from(0).await.unwrap();
        settle().await;
        assert!(h.player.resume().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_failure_leaves_resumable_state() {
        let provider = Arc::new(MockSpeech::fails_then_succeeds(
            1,
            SpeechError::Network("connection reset".to_string()),
        ));
        let h = harness_with(provider, &["one two"]);

        let result = h.player.play_from(0).await;
        assert!(matches!(result, Err(PlayerError::Synthesis(_))));
        assert_eq!(h.player.phase().await, Phase::Paused);

        // restart() retries the same chunk; the second attempt succeeds.
        h.player.restart().await.unwrap();
        settle().await;
        assert_eq!(h.player.phase().await, Phase::Speaking);
        assert_eq!(h.words(), vec!["one"]);
    }

    /// Delays every synthesis call and records how many are in flight
    /// at once.
    struct SlowSpeech {
        inner: MockSpeech,
        delay_ms: u64,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
    }

    struct FlightGuard(Arc<AtomicUsize>);

    impl Drop for FlightGuard {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl SpeechProvider for SlowSpeech {
        async fn synthesize(
            &self,
            ssml: &str,
            output_path: &std::path::Path,
        ) -> speech_client::Result<Synthesis> {
            let n = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(n, Ordering::SeqCst);
            // Decrements on drop, so an aborted call is counted out too.
            let _guard = FlightGuard(Arc::clone(&self.active));
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.inner.synthesize(ssml, output_path).await
        }

        fn name(&self) -> &'static str {
            "slow mock"
        }

        fn is_available(&self) -> speech_client::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_during_synthesis_aborts_inflight_request() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(SlowSpeech {
            inner: MockSpeech::always_succeeds().with_ms_per_word(300),
            delay_ms: 500,
            active: Arc::clone(&active),
            max_active: Arc::clone(&max_active),
        });
        let h = harness_with(provider, &["one", "two"]);

        let first = {
            let player = h.player.clone();
            tokio::spawn(async move { player.play_from(0).await })
        };
        // Let the first request reach its synthesis delay.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(active.load(Ordering::SeqCst), 1);

        // A seek from another clone of the player must abort the
        // in-flight request before issuing its own.
        h.player.jump_to(1).await.unwrap();
        settle().await;

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert_eq!(h.player.position().await, (1, 0));
        assert_eq!(h.words(), vec!["two"]);
        // The superseded caller observes a clean no-op, not an error.
        assert!(first.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drift_correction_shortens_next_wait() {
        let h = harness(&["one two three"]);
        // Audio reports itself 600 ms ahead of where the display thinks
        // it is, well past the correction threshold.
        h.skew_ms.store(600, Ordering::SeqCst);
        h.player.play_from(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        // The 300 ms wait after word one was shortened by the correction,
        // so word two is already up.
        let words = h.words();
        assert_eq!(words, vec!["one", "two"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_correction_without_drift() {
        let h = harness(&["one two three"]);
        h.player.play_from(0).await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        // Without drift the second word waits its full 300 ms.
        assert_eq!(h.words(), vec!["one"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_table_of_contents_previews_chunks() {
        let h = harness(&["one", "two"]);
        let toc = h.player.table_of_contents();
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0], (0, "one".to_string()));
        assert_eq!(toc[1], (1, "two".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_from_out_of_range() {
        let h = harness(&["one"]);
        assert!(matches!(
            h.player.play_from(9).await,
            Err(PlayerError::ChunkOutOfRange { index: 9, len: 1 })
        ));
    }
}
