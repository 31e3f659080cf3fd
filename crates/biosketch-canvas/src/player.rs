//! Illustration player: resolves drawing keys to routines and plays them on the canvas.
//!
//! The canvas and its counters sit behind one async mutex. The lock is taken per
//! step, never across a sleep, so two sequences started together interleave.

use crate::canvas::SvgCanvas;
use crate::error::CanvasResult;
use crate::scene::{build_scene, Scene};
use crate::sketches::sketch;
use biosketch_core::Timeline;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

pub const INITIAL_ACTION: &str = "Ninguna";
pub const CLEARED_ACTION: &str = "Canvas limpiado";

/// Frame rate of exported scene animations.
const SCENE_FPS: u32 = 30;

struct Board {
    canvas: SvgCanvas,
    drawing_count: usize,
    last_action: String,
    scene: Option<Scene>,
}

/// Which files [`IllustrationPlayer::save`] writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs {
    pub svg: bool,
    pub scene: bool,
}

#[derive(Clone)]
pub struct IllustrationPlayer {
    board: Arc<Mutex<Board>>,
    actions: Option<mpsc::UnboundedSender<String>>,
}

impl Default for IllustrationPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl IllustrationPlayer {
    pub fn new() -> Self {
        Self {
            board: Arc::new(Mutex::new(Board {
                canvas: SvgCanvas::new(),
                drawing_count: 0,
                last_action: INITIAL_ACTION.to_string(),
                scene: None,
            })),
            actions: None,
        }
    }

    /// Every action label ("Dibujando: key", "Canvas limpiado") is also sent here.
    pub fn with_actions(mut self, actions: mpsc::UnboundedSender<String>) -> Self {
        self.actions = Some(actions);
        self
    }

    fn set_action(&self, board: &mut Board, action: String) {
        if let Some(tx) = &self.actions {
            let _ = tx.send(action.clone());
        }
        board.last_action = action;
    }

    /// Play the routine for `key`. Unknown keys are logged and ignored; returns whether anything was drawn.
    pub async fn draw(&self, key: &str) -> bool {
        let Some(routine) = sketch(key) else {
            warn!(key, "no illustration for key; skipped");
            return false;
        };
        {
            let mut board = self.board.lock().await;
            board.scene = Some(build_scene(key));
            self.set_action(&mut board, format!("Dibujando: {}", key));
        }
        info!(key, steps = routine.steps.len(), "🎨 drawing");

        let start = Instant::now();
        for step in &routine.steps {
            if !step.at.is_zero() {
                sleep_until(start + step.at).await;
            }
            let mut board = self.board.lock().await;
            for shape in &step.shapes {
                board.canvas.draw(shape);
            }
        }

        let mut board = self.board.lock().await;
        board.drawing_count += 1;
        debug!(key, count = board.drawing_count, "drawing complete");
        true
    }

    /// Wipe the canvas and reset the drawing counter.
    pub async fn clear(&self) {
        let mut board = self.board.lock().await;
        board.canvas.clear();
        board.drawing_count = 0;
        board.scene = None;
        self.set_action(&mut board, CLEARED_ACTION.to_string());
    }

    /// Draw `keys` `step` apart. Returns how many were drawn.
    pub async fn play_sequence<S: AsRef<str>>(&self, keys: &[S], step: Duration) -> usize {
        let timeline = Timeline::stepped(keys.iter().map(|k| k.as_ref().to_string()), step.as_secs_f64());
        self.play_timeline(&timeline).await
    }

    /// Fire each timeline cue at its offset from now. Cues run independently, so a
    /// long composite routine never delays the ones after it. Returns how many were drawn.
    pub async fn play_timeline(&self, timeline: &Timeline) -> usize {
        let start = Instant::now();
        let cues = timeline.events().iter().map(|event| async move {
            let offset = Duration::try_from_secs_f64(event.time).unwrap_or_else(|e| {
                warn!(time = event.time, error = %e, "unusable cue time; drawing now");
                Duration::ZERO
            });
            sleep_until(start + offset).await;
            debug!(
                at = %timeline.readout(start.elapsed().as_secs_f64()),
                markers = timeline.markers_passed(event.time),
                "timeline cue"
            );
            self.draw(&event.drawing).await
        });
        join_all(cues).await.into_iter().filter(|drawn| *drawn).count()
    }

    pub async fn drawing_count(&self) -> usize {
        self.board.lock().await.drawing_count
    }

    pub async fn last_action(&self) -> String {
        self.board.lock().await.last_action.clone()
    }

    /// Scene of the most recent drawing.
    pub async fn current_scene(&self) -> Option<Scene> {
        self.board.lock().await.scene.clone()
    }

    pub async fn svg(&self) -> String {
        self.board.lock().await.canvas.to_svg()
    }

    pub async fn shape_count(&self) -> usize {
        self.board.lock().await.canvas.shape_count()
    }

    /// Write `<stem>.svg` and/or `<stem>.scene.json` under `dir`. The scene animation
    /// is sampled over `duration` seconds.
    pub async fn save(&self, dir: &Path, stem: &str, outputs: Outputs, duration: f64) -> CanvasResult<Vec<PathBuf>> {
        let board = self.board.lock().await;
        let mut written = Vec::new();
        if outputs.svg {
            let path = dir.join(format!("{}.svg", stem));
            board.canvas.save(&path)?;
            written.push(path);
        }
        if outputs.scene {
            if let Some(scene) = &board.scene {
                let path = dir.join(format!("{}.scene.json", stem));
                scene.save(&path, duration, SCENE_FPS)?;
                written.push(path);
            }
        }
        info!(files = written.len(), dir = %dir.display(), "illustrations saved");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biosketch_core::TimelineEvent;

    #[tokio::test]
    async fn starts_empty() {
        let player = IllustrationPlayer::new();
        assert_eq!(player.drawing_count().await, 0);
        assert_eq!(player.last_action().await, "Ninguna");
        assert!(player.current_scene().await.is_none());
    }

    #[tokio::test]
    async fn unknown_key_is_a_no_op() {
        let player = IllustrationPlayer::new();
        assert!(!player.draw("unicornio").await);
        assert_eq!(player.drawing_count().await, 0);
        assert_eq!(player.shape_count().await, 0);
        assert_eq!(player.last_action().await, "Ninguna");
    }

    #[tokio::test]
    async fn draw_counts_and_records_action() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let player = IllustrationPlayer::new().with_actions(tx);
        assert!(player.draw("lactobacilo").await);
        assert_eq!(player.drawing_count().await, 1);
        assert_eq!(player.last_action().await, "Dibujando: lactobacilo");
        assert_eq!(rx.recv().await.unwrap(), "Dibujando: lactobacilo");
        assert!(player.svg().await.contains("lactobacillus"));
    }

    #[tokio::test]
    async fn clear_resets_counter() {
        let player = IllustrationPlayer::new();
        player.draw("intestino").await;
        player.clear().await;
        assert_eq!(player.drawing_count().await, 0);
        assert_eq!(player.shape_count().await, 0);
        assert_eq!(player.last_action().await, "Canvas limpiado");
    }

    #[tokio::test(start_paused = true)]
    async fn composite_takes_its_stagger() {
        let player = IllustrationPlayer::new();
        let start = Instant::now();
        player.draw("digestion").await;
        assert_eq!(start.elapsed(), Duration::from_millis(2000));
        assert_eq!(player.drawing_count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sequence_waits_between_steps_and_skips_unknown() {
        let player = IllustrationPlayer::new();
        let start = Instant::now();
        let drawn = player
            .play_sequence(&["gases", "nada", "alivio"], Duration::from_millis(2000))
            .await;
        assert_eq!(drawn, 2);
        assert_eq!(start.elapsed(), Duration::from_millis(4000));
        assert_eq!(player.last_action().await, "Dibujando: alivio");
    }

    #[tokio::test(start_paused = true)]
    async fn timeline_fires_at_event_times() {
        let player = IllustrationPlayer::new();
        let timeline = Timeline::new(
            vec![TimelineEvent::new(0.0, "probiotico"), TimelineEvent::new(2.0, "intestino")],
            5.0,
        );
        let start = Instant::now();
        assert_eq!(player.play_timeline(&timeline).await, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(player.current_scene().await.unwrap().key, "intestino");
    }

    /// Collect (action, ms since start) for every action the player reports.
    fn record_actions(player: IllustrationPlayer) -> (IllustrationPlayer, tokio::task::JoinHandle<Vec<(String, u128)>>) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let recorder = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(action) = rx.recv().await {
                seen.push((action, start.elapsed().as_millis()));
            }
            seen
        });
        (player.with_actions(tx), recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn composite_does_not_push_back_later_cues() {
        let (player, recorder) = record_actions(IllustrationPlayer::new());
        let timeline = Timeline::stepped(["digestion", "microbiota"], 1.0);
        let start = Instant::now();
        assert_eq!(player.play_timeline(&timeline).await, 2);
        // microbiota starts at 1000 ms and its last bacterium lands 1400 ms later
        assert_eq!(start.elapsed(), Duration::from_millis(2400));
        drop(player);

        let seen = recorder.await.unwrap();
        assert_eq!(
            seen,
            vec![
                ("Dibujando: digestion".to_string(), 0),
                ("Dibujando: microbiota".to_string(), 1000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn runaway_cue_time_does_not_stall() {
        let player = IllustrationPlayer::new();
        let reply = biosketch_core::parse_reply("Hola.\nTIMELINE: 0:probiotico, 1e20:intestino");
        let start = Instant::now();
        assert_eq!(player.play_timeline(&reply.timeline()).await, 2);
        assert!(start.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn save_writes_requested_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let player = IllustrationPlayer::new();
        player.draw("bacterias").await;
        let files = player
            .save(dir.path(), "turn-1", Outputs { svg: true, scene: true }, 1.0)
            .await
            .unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("turn-1.svg"));
        assert!(files[1].ends_with("turn-1.scene.json"));
        assert!(files.iter().all(|f| f.exists()));
    }
}
